// Transaction port carried through the execution context

use crate::error::Result;
use async_trait::async_trait;

/// Storage transaction opened for one HTTP call
///
/// Handlers reach it through `ExecutionContext::transaction`; a detached
/// context never carries one.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commit the transaction
    async fn commit(&self) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(&self) -> Result<()>;
}
