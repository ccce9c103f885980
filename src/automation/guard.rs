use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// What happened to a guarded action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T> {
    Completed(T),
    /// Another run held the guard; the action was not invoked.
    Skipped,
}

/// Single-flight guard: at most one action runs at a time, and callers that
/// arrive while one is running are turned away rather than queued.
///
/// Clones share the same flag. Protection is per process only.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

/// Holding this means the guard is taken; dropping it frees the guard, on
/// success, error, panic or cancellation alike.
struct RunPermit<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Option<RunPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: &self.running,
            })
    }

    /// Runs `action` unless another run is in flight, passing its result
    /// through untouched.
    pub async fn try_run<F, Fut, T, E>(&self, action: F) -> Result<RunOutcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(_permit) = self.acquire() else {
            info!("Run skipped: already in progress");
            return Ok(RunOutcome::Skipped);
        };

        action().await.map(RunOutcome::Completed)
    }
}
