//! First-source-wins cancellation.
//!
//! A [`CancelSignal`] watches any number of cancellation sources and resolves
//! with the [`CancelReason`] of whichever fires first. Sources are plain
//! futures, so the signal works with a caller's [`CancellationToken`], a
//! timer, or anything else that eventually resolves.
//!
//! ## Examples
//!
//! ```rust
//! use std::time::Duration;
//! use kyrazo::cancel::{CancelReason, CancelSignal};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let token = CancellationToken::new();
//! token.cancel();
//!
//! let reason = CancelSignal::new()
//!     .with_token(token)
//!     .with_timeout(Duration::from_secs(30))
//!     .fired()
//!     .await;
//! assert_eq!(reason, CancelReason::Cancelled);
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use futures::future::{select_all, BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

/// Why a [`CancelSignal`] fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// An external cancellation source fired.
    Cancelled,
    /// The timeout elapsed.
    TimedOut(Duration),
}

/// Merges several cancellation sources into one.
///
/// Sources are polled in the order they were added, so when two are ready
/// at once the earlier one wins.
#[derive(Default)]
pub struct CancelSignal {
    sources: Vec<BoxFuture<'static, CancelReason>>,
}

impl CancelSignal {
    /// Creates a signal with no sources. It never fires until one is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an arbitrary cancellation source.
    pub fn with_source<F>(mut self, source: F) -> Self
    where
        F: Future<Output = CancelReason> + Send + 'static,
    {
        self.sources.push(source.boxed());
        self
    }

    /// Adds a caller-owned cancellation token.
    pub fn with_token(self, token: CancellationToken) -> Self {
        self.with_source(async move {
            token.cancelled().await;
            CancelReason::Cancelled
        })
    }

    /// Adds a timer that fires after `after`.
    pub fn with_timeout(self, after: Duration) -> Self {
        self.with_source(async move {
            tokio::time::sleep(after).await;
            CancelReason::TimedOut(after)
        })
    }

    /// Number of attached sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` if no source is attached.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Waits for the first source to fire.
    pub async fn fired(self) -> CancelReason {
        if self.sources.is_empty() {
            return std::future::pending().await;
        }
        let (reason, _index, _rest) = select_all(self.sources).await;
        reason
    }
}

impl std::fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelSignal")
            .field("sources", &self.sources.len())
            .finish()
    }
}
