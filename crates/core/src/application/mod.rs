// Application Layer - Pipeline components and use cases

pub mod assembler;
pub mod cancel;
pub mod classifier;
pub mod context;
pub mod dispatcher;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod supervisor;
pub mod usecase;
pub mod validation;

// Re-exports
pub use assembler::ResponseAssembler;
pub use cancel::{cancel_channel, CancelSignal, CancelSource};
pub use classifier::ErrorClassifier;
pub use context::ExecutionContext;
pub use dispatcher::Dispatcher;
pub use parser::RequestParser;
pub use pipeline::{RpcPipeline, RpcPipelineBuilder, DEFAULT_REQUIRED_HEADER};
pub use registry::{MethodDescriptor, MethodHandler, MethodRegistry, MethodRegistryBuilder, Params};
pub use supervisor::{ExecutionSupervisor, SupervisedBatch};
pub use usecase::{SuccessService, SuccessUsecase};
pub use validation::ValidationError;
