//! Job scheduler infrastructure for background maintenance tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How often a job runs.
#[derive(Debug, Clone, Copy)]
pub enum JobFrequency {
    /// Run every N minutes.
    Minutes(u64),
    /// Run every N hours.
    Hours(u64),
    /// Run once a day.
    Daily,
}

impl JobFrequency {
    /// The interval between two executions.
    pub fn interval(&self) -> Duration {
        match self {
            JobFrequency::Minutes(mins) => Duration::from_secs(mins * 60),
            JobFrequency::Hours(hours) => Duration::from_secs(hours * 3600),
            JobFrequency::Daily => Duration::from_secs(86_400),
        }
    }
}

/// A background job. Failures are reported, logged, and do not stop the
/// schedule.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// How often the job runs.
    fn frequency(&self) -> JobFrequency;

    /// One execution.
    async fn execute(&self) -> Result<(), String>;
}

/// Runs registered jobs on their intervals until shut down.
pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    /// Spawns one task per registered job. The first tick is skipped so a
    /// freshly started scheduler does not immediately hammer the database.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting job scheduler");

        for job in &self.jobs {
            let job = Arc::clone(job);
            let shutdown_rx = self.shutdown_rx.clone();
            self.handles.push(tokio::spawn(run_job_loop(job, shutdown_rx)));
        }
    }

    /// Signals every job loop to stop after its current iteration.
    pub fn shutdown(&self) {
        info!("Job scheduler shutting down");
        let _ = self.shutdown_tx.send(true);
    }

    /// Waits for all job tasks to finish, up to the timeout.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let join_all = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Job task panicked");
                }
            }
        };

        if tokio::time::timeout(timeout, join_all).await.is_err() {
            warn!(?timeout, "Job shutdown timed out");
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job_loop(job: Arc<dyn Job>, mut shutdown_rx: watch::Receiver<bool>) {
    let name = job.name();
    let mut interval = tokio::time::interval(job.frequency().interval());
    interval.tick().await; // skip the immediate first tick

    info!(job = name, frequency = ?job.frequency(), "Job scheduled");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let start = std::time::Instant::now();
                match job.execute().await {
                    Ok(()) => info!(
                        job = name,
                        elapsed_ms = start.elapsed().as_millis(),
                        "Job completed"
                    ),
                    Err(e) => error!(
                        job = name,
                        elapsed_ms = start.elapsed().as_millis(),
                        error = %e,
                        "Job failed"
                    ),
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!(job = name, "Job stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting_job"
        }

        fn frequency(&self) -> JobFrequency {
            JobFrequency::Minutes(1)
        }

        async fn execute(&self) -> Result<(), String> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_frequency_intervals() {
        assert_eq!(JobFrequency::Minutes(5).interval(), Duration::from_secs(300));
        assert_eq!(JobFrequency::Hours(2).interval(), Duration::from_secs(7200));
        assert_eq!(JobFrequency::Daily.interval(), Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn test_scheduler_starts_and_stops() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        scheduler.register(CountingJob { runs: Arc::clone(&runs) });
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(2)).await;

        // First tick is skipped, so nothing ran in 50ms with a 1m interval.
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_register() {
        let mut scheduler = JobScheduler::new();
        scheduler.register(CountingJob { runs: Arc::new(AtomicUsize::new(0)) });
        assert_eq!(scheduler.jobs.len(), 1);
    }
}
