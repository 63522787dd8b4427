use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use quiz_core::advancement_job_id;
use quiz_persistence::SessionError;
use quiz_persistence::entities::scheduled_jobs;
use quiz_persistence::entities::sea_orm_active_enums::JobKind;
use quiz_persistence::repositories::{FailureOutcome, JobRepository, NewJob};
use quiz_types::SessionId;
use sea_orm::DbErr;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;

/// Work performed when an advancement job fires.
#[async_trait]
pub trait AdvanceHandler: Send + Sync {
    async fn handle_advance(
        &self,
        session_id: SessionId,
        expected_index: i32,
    ) -> Result<(), SessionError>;
}

/// Enqueue side of the scheduler, shared by the session service.
#[derive(Clone)]
pub struct AdvancementQueue {
    jobs: JobRepository,
    notify: Arc<Notify>,
}

impl AdvancementQueue {
    pub fn new(jobs: JobRepository) -> Self {
        Self {
            jobs,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Arms the advancement of `expected_index` after `delay`. Scheduling
    /// the same pair again is a no-op and returns `false`.
    pub async fn schedule_advancement(
        &self,
        session_id: SessionId,
        expected_index: i32,
        delay: Duration,
    ) -> Result<bool, DbErr> {
        let delay = ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::zero());
        let job_id = advancement_job_id(session_id, expected_index);

        let inserted = self
            .jobs
            .enqueue(NewJob {
                job_id: job_id.clone(),
                kind: JobKind::AdvanceNextQuestion,
                session_id,
                expected_index,
                run_at: Utc::now() + delay,
            })
            .await?;

        if inserted {
            debug!("Scheduled {} in {}ms", job_id, delay.num_milliseconds());
            self.notify.notify_waiters();
        } else {
            debug!("Job {} already scheduled", job_id);
        }
        Ok(inserted)
    }
}

/// Pool of workers draining due jobs from the durable queue.
pub struct AdvancementWorkers {
    jobs: JobRepository,
    handler: Arc<dyn AdvanceHandler>,
    notify: Arc<Notify>,
    config: SchedulerConfig,
}

impl AdvancementWorkers {
    pub fn new(
        queue: &AdvancementQueue,
        handler: Arc<dyn AdvanceHandler>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            jobs: queue.jobs.clone(),
            handler,
            notify: queue.notify.clone(),
            config,
        }
    }

    /// Puts jobs orphaned by a crashed process back in the queue. Call once
    /// before spawning workers.
    pub async fn recover(&self) -> Result<u64, DbErr> {
        self.jobs.recover_stalled().await
    }

    pub fn spawn(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.config.workers)
            .map(|worker| {
                let workers = Arc::clone(self);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { workers.worker_loop(worker, shutdown).await })
            })
            .collect()
    }

    async fn worker_loop(&self, worker: usize, mut shutdown: watch::Receiver<bool>) {
        info!("Advancement worker {} started", worker);

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.run_due_jobs().await {
                error!("Worker {} failed to poll jobs: {}", worker, e);
            }

            let wait = self.next_wait().await;
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.notify.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Advancement worker {} stopped", worker);
    }

    async fn next_wait(&self) -> Duration {
        let poll = self.config.poll_interval;
        match self.jobs.next_due_at().await {
            Ok(Some(due)) => (due - Utc::now()).to_std().unwrap_or(Duration::ZERO).min(poll),
            Ok(None) => poll,
            Err(e) => {
                warn!("Failed to read next due job: {}", e);
                poll
            }
        }
    }

    /// Runs every job that is due right now. Returns how many ran.
    pub async fn run_due_jobs(&self) -> Result<usize, DbErr> {
        let mut ran = 0;
        while let Some(job) = self.jobs.claim_next_due(Utc::now()).await? {
            self.run_job(job).await?;
            ran += 1;
        }
        Ok(ran)
    }

    async fn run_job(&self, job: scheduled_jobs::Model) -> Result<(), DbErr> {
        let result = match job.kind {
            JobKind::AdvanceNextQuestion => {
                self.handler
                    .handle_advance(job.game_session_id, job.expected_index)
                    .await
            }
        };

        match result {
            Ok(()) => self.jobs.complete(&job.job_id).await,
            Err(e) => {
                let outcome = self
                    .jobs
                    .fail(
                        &job,
                        &e.to_string(),
                        self.config.max_attempts,
                        self.config.retry_backoff,
                    )
                    .await?;
                match outcome {
                    FailureOutcome::Retrying { run_at } => warn!(
                        "Job {} failed on attempt {}, retrying at {}: {}",
                        job.job_id, job.attempts, run_at, e
                    ),
                    FailureOutcome::Failed => error!(
                        "Job {} failed after {} attempts: {}",
                        job.job_id, job.attempts, e
                    ),
                }
                Ok(())
            }
        }
    }

    /// Deletes finished jobs older than the retention window.
    pub async fn purge_finished(&self) -> Result<u64, DbErr> {
        let retention = ChronoDuration::from_std(self.config.retention)
            .unwrap_or_else(|_| ChronoDuration::hours(24));
        let purged = self.jobs.purge_finished(Utc::now() - retention).await?;
        if purged > 0 {
            info!("Purged {} finished jobs", purged);
        }
        Ok(purged)
    }
}
