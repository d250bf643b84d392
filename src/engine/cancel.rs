//! Query cancellation and debounce coordination.
//!
//! Each new query supersedes the previous one: issuing a token bumps a
//! shared generation counter, and a token counts as cancelled as soon as
//! it is no longer the latest generation. Cancellation is cooperative —
//! an in-flight provider call is never aborted mid-flight, its result is
//! just never applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Issues cancellation tokens for queries. One coordinator per search
/// surface; the latest issued token is the only live one.
#[derive(Clone, Default)]
pub struct SearchCoordinator {
    current: Arc<AtomicU64>,
}

impl SearchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a new query, superseding all previously issued
    /// tokens.
    pub fn issue(&self) -> CancelToken {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        CancelToken {
            generation,
            current: Arc::clone(&self.current),
        }
    }
}

/// Cancellation token for one query.
#[derive(Clone)]
pub struct CancelToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }

    /// A token that can never be superseded. For one-shot callers that
    /// have no coordinator.
    pub fn detached() -> Self {
        CancelToken {
            generation: 0,
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait out a debounce window. Returns `false` when the token was
    /// superseded while waiting, in which case the caller abandons the
    /// query.
    pub async fn debounce(&self, window: Duration) -> bool {
        if !window.is_zero() {
            tokio::time::sleep(window).await;
        }
        !self.is_cancelled()
    }
}
