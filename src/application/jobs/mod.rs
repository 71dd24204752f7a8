//! Periodic background jobs.
//!
//! Each job runs on its own tokio interval. A failed run is logged and the
//! next tick runs again.

mod cleanup;
mod comments;

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use cleanup::{CleanupJob, run_cleanup};
pub use comments::{CommentRefreshJob, refresh_comment_counts};

const METRIC_JOB_RUN: &str = "quire_job_run_total";

/// Handles of running periodic jobs.
#[derive(Default)]
pub struct JobHandles {
    handles: Vec<JoinHandle<()>>,
}

impl JobHandles {
    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Abort every job and wait for the tasks to finish.
    pub async fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Run `task` every `period`, skipping the immediate first tick.
pub fn spawn_periodic<F, Fut, E>(name: &'static str, period: Duration, mut task: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        info!(
            target = "quire::jobs",
            job = name,
            period_secs = period.as_secs(),
            "Periodic job scheduled"
        );

        loop {
            interval.tick().await;
            match task().await {
                Ok(()) => {
                    counter!(METRIC_JOB_RUN, "job" => name, "outcome" => "ok").increment(1);
                }
                Err(err) => {
                    counter!(METRIC_JOB_RUN, "job" => name, "outcome" => "error").increment(1);
                    error!(target = "quire::jobs", job = name, error = %err, "Periodic job failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn failures_do_not_stop_later_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let handle = spawn_periodic("flaky", Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                    Err("every other run fails")
                } else {
                    Ok(())
                }
            }
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            while runs.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("job keeps running after failures");

        let mut jobs = JobHandles::default();
        jobs.push(handle);
        jobs.shutdown().await;
    }

    #[tokio::test]
    async fn first_tick_is_skipped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let handle = spawn_periodic("hourly", Duration::from_secs(3600), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut jobs = JobHandles::default();
        jobs.push(handle);
        jobs.shutdown().await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
