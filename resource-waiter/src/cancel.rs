//! Cooperative cancellation for waits.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// A cloneable cancellation signal with an optional cause.
///
/// Cancelling is idempotent: only the first cause is kept, and later calls
/// have no further effect. Clones observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<String>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancel_with_cause(&self, cause: impl Into<String>) {
        // The cause is recorded before the token fires so waiters woken by the
        // token always see it.
        if !self.token.is_cancelled() {
            let _ = self.cause.set(cause.into());
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the signal has fired.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.get().map(String::as_str)
    }

    /// The underlying token, for callers that already use `tokio_util`.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl From<CancellationToken> for CancelSignal {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            cause: Arc::default(),
        }
    }
}
