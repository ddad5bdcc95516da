// Port Layer - Interfaces for external dependencies

pub mod batch_observer;
pub mod id_provider; // For deterministic testing
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use batch_observer::{BatchObserver, BatchSummary};
pub use id_provider::{IdProvider, UuidProvider};
pub use time_provider::{LocalClock, TimeProvider};
pub use transaction::Transaction;
