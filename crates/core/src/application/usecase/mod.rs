// Use Cases exposed as RPC methods

pub mod success;

pub use success::{SuccessService, SuccessUsecase};
