use tokio_util::sync::CancellationToken;

use crate::auth::Caller;
use crate::error::{Error, Result};

/// Per-request context threaded through every engine operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    caller: Caller,
    cancel: CancellationToken,
}

impl RequestContext {
    #[must_use]
    pub fn new(caller: Caller) -> Self {
        Self::with_cancellation(caller, CancellationToken::new())
    }

    #[must_use]
    pub fn with_cancellation(caller: Caller, cancel: CancellationToken) -> Self {
        Self { caller, cancel }
    }

    #[must_use]
    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fails with `Cancelled` once the request has been abandoned. Called
    /// before each collaborator call.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
