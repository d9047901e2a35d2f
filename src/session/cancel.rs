//! Hangup cancellation for mode handlers
//!
//! Every collaborator call in a mode goes through [`Checkpoint::guard`], which
//! re-reads the hook state before and after the call and abandons the wait
//! as soon as the mode's token is cancelled.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::decoder::SharedHook;

/// The handset went down; the mode must stop without further calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interaction aborted: handset replaced")]
pub struct Aborted;

#[derive(Debug, Clone)]
pub struct Checkpoint {
    hook: SharedHook,
    cancel: CancellationToken,
}

impl Checkpoint {
    pub fn new(hook: SharedHook, cancel: CancellationToken) -> Self {
        Self { hook, cancel }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail if the handset is down or the mode was cancelled
    pub fn check(&self) -> Result<(), Aborted> {
        if self.cancel.is_cancelled() || !self.hook.is_lifted() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    /// Run one suspension point under the cancellation contract
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Aborted> {
        self.check()?;
        let output = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Aborted),
            output = fut => output,
        };
        self.check()?;
        Ok(output)
    }
}
