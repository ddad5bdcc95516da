// Execution Context - request-scoped values for one HTTP call

use super::cancel::CancelSignal;
use crate::domain::Headers;
use crate::port::Transaction;
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::sync::Arc;

/// Values carried through dispatch for a single HTTP call
///
/// Cloning is cheap; every clone observes the same cancellation signal.
#[derive(Clone)]
pub struct ExecutionContext {
    call_id: Arc<str>,
    client_ip: Option<Arc<str>>,
    headers: Arc<Headers>,
    transaction: Option<Arc<dyn Transaction>>,
    cancel: CancelSignal,
    received_at: DateTime<FixedOffset>,
}

impl ExecutionContext {
    pub fn new(
        call_id: impl Into<Arc<str>>,
        headers: Arc<Headers>,
        cancel: CancelSignal,
        received_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            client_ip: None,
            headers,
            transaction: None,
            cancel,
            received_at,
        }
    }

    /// Context with no headers and no cancellation (tests, background jobs)
    pub fn background() -> Self {
        Self::new(
            "background",
            Arc::new(Headers::new()),
            CancelSignal::never(),
            Utc::now().into(),
        )
    }

    pub fn with_client_ip(mut self, client_ip: Option<String>) -> Self {
        self.client_ip = client_ip.map(Into::into);
        self
    }

    pub fn with_transaction(mut self, transaction: Arc<dyn Transaction>) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    pub fn headers(&self) -> &Arc<Headers> {
        &self.headers
    }

    pub fn transaction(&self) -> Option<&Arc<dyn Transaction>> {
        self.transaction.as_ref()
    }

    pub fn received_at(&self) -> DateTime<FixedOffset> {
        self.received_at
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Same values, no transaction, and a cancellation signal that never fires.
    ///
    /// Work that must outlive the HTTP call runs on this context.
    pub fn detached(&self) -> Self {
        Self {
            call_id: self.call_id.clone(),
            client_ip: self.client_ip.clone(),
            headers: self.headers.clone(),
            transaction: None,
            cancel: CancelSignal::never(),
            received_at: self.received_at,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("call_id", &self.call_id)
            .field("client_ip", &self.client_ip)
            .field("has_transaction", &self.transaction.is_some())
            .field("cancelled", &self.is_cancelled())
            .field("received_at", &self.received_at)
            .finish()
    }
}
