use std::sync::Arc;

use futures_util::stream::BoxStream;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    AnyError(String),
}

impl TransportError {
    pub fn any(error: impl ToString) -> Self {
        TransportError::AnyError(error.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// The execute/subscribe boundary a host hands us. Connection management,
/// authentication and retries all live behind it.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Runs a document once and returns its result payload.
    async fn execute(&self, query: &str, variables: Value) -> TransportResult<Value>;

    /// Opens a live result stream for a subscription document.
    async fn open(
        &self,
        query: &str,
        variables: Value,
    ) -> TransportResult<BoxStream<'static, TransportResult<Value>>>;

    /// Whether [`open`](Transport::open) can actually push results.
    fn supports_push(&self) -> bool;
}

/// A cheaply clonable handle to a shared transport.
#[derive(Clone)]
pub struct TransportClient {
    inner: Arc<dyn Transport>,
}

impl TransportClient {
    pub fn new(transport: impl Transport + 'static) -> TransportClient {
        TransportClient {
            inner: Arc::new(transport),
        }
    }
}

impl std::ops::Deref for TransportClient {
    type Target = dyn Transport;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}
