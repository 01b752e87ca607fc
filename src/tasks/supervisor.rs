//! Task Supervisor
//!
//! Panic-isolated host for long-running background tasks. A supervised task
//! that panics is caught, logged, and respawned after a fixed backoff; a task
//! that returns normally ends supervision.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

/// Spawns `make_task` on its own tokio task and keeps it alive.
///
/// Each run executes on a nested task so a panic is confined to that run and
/// surfaces as a `JoinError` here instead of unwinding further. The returned
/// handle aborts the whole supervision loop when dropped via `abort`.
pub fn spawn_supervised<F, Fut>(name: &'static str, backoff: Duration, make_task: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let run = tokio::spawn(make_task());
            match run.await {
                // Normal return means the task decided to stop.
                Ok(()) => break,
                Err(err) if err.is_panic() => {
                    error!(
                        task = name,
                        backoff_ms = backoff.as_millis() as u64,
                        "supervised task panicked, respawning after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                // Cancelled: the runtime is shutting down.
                Err(_) => break,
            }
        }
        info!(task = name, "supervised task finished");
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_supervisor_restarts_panicking_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let handle = spawn_supervised("test-task", Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    panic!("induced failure");
                }
            }
        });

        handle.await.unwrap();
        // Two panicking runs plus the final clean one.
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_supervisor_stops_on_normal_return() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let handle = spawn_supervised("test-task", Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_supervisor_handle_abort() {
        let handle = spawn_supervised("test-task", Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
