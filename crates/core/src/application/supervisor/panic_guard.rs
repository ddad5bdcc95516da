// Panic isolation for handler calls
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Result of a panic-guarded execution
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Execution completed
    Success(T),
    /// Execution panicked
    Panicked(String),
}

/// Poll a future with panic isolation
///
/// A panic while polling is caught at this boundary and returned as
/// `PanicGuardResult::Panicked`; it never unwinds into the batch loop.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// use rpcgate_core::application::supervisor::panic_guard::{execute_guarded, PanicGuardResult};
///
/// let result = execute_guarded(async { panic!("boom") }).await;
/// assert!(matches!(result, PanicGuardResult::<()>::Panicked(msg) if msg == "boom"));
/// # });
/// ```
pub async fn execute_guarded<F, T>(future: F) -> PanicGuardResult<T>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => PanicGuardResult::Success(result),
        Err(payload) => {
            let panic_msg = panic_message(payload.as_ref());
            error!(panic_msg = %panic_msg, "Handler panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_passes_through() {
        let result = execute_guarded(async { 42 }).await;
        assert!(matches!(result, PanicGuardResult::Success(42)));
    }

    #[tokio::test]
    async fn test_formatted_panic_message() {
        let id = 7;
        let result: PanicGuardResult<()> =
            execute_guarded(async move { panic!("handler {} failed", id) }).await;
        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "handler 7 failed"),
            PanicGuardResult::Success(_) => panic!("expected panic to be caught"),
        }
    }

    #[tokio::test]
    async fn test_panic_after_await_is_caught() {
        let result: PanicGuardResult<()> = execute_guarded(async {
            tokio::task::yield_now().await;
            std::panic::panic_any(12_u8)
        })
        .await;
        assert!(matches!(result, PanicGuardResult::Panicked(ref m) if m == "Unknown panic"));
    }
}
