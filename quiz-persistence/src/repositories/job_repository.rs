use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use tracing::{debug, warn};

use crate::entities::{
    prelude::*,
    scheduled_jobs,
    sea_orm_active_enums::{JobKind, JobStatus},
};

const CLAIM_CANDIDATES: u64 = 5;

/// A delayed job to persist. The id is deterministic so enqueueing the same
/// work twice collapses into one row.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_id: String,
    pub kind: JobKind,
    pub session_id: i32,
    pub expected_index: i32,
    pub run_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Retrying { run_at: DateTime<Utc> },
    Failed,
}

/// Durable store behind the advancement scheduler.
#[derive(Clone)]
pub struct JobRepository {
    db: DatabaseConnection,
}

impl JobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns `false` when a job with the same id already exists. A job
    /// parked as failed is armed again instead, with a fresh attempt budget.
    pub async fn enqueue(&self, job: NewJob) -> Result<bool, DbErr> {
        let now = Utc::now();
        let job_id = job.job_id.clone();
        let run_at = job.run_at;
        let model = scheduled_jobs::ActiveModel {
            job_id: Set(job.job_id),
            kind: Set(job.kind),
            game_session_id: Set(job.session_id),
            expected_index: Set(job.expected_index),
            run_at: Set(job.run_at),
            status: Set(JobStatus::Pending),
            attempts: Set(0),
            last_error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = ScheduledJobs::insert(model)
            .on_conflict(
                OnConflict::column(scheduled_jobs::Column::JobId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        if inserted > 0 {
            return Ok(true);
        }

        // Pending, running and completed rows stay deduplicated
        let rearmed = ScheduledJobs::update_many()
            .col_expr(scheduled_jobs::Column::Status, Expr::value(JobStatus::Pending))
            .col_expr(scheduled_jobs::Column::RunAt, Expr::value(run_at))
            .col_expr(scheduled_jobs::Column::Attempts, Expr::value(0))
            .col_expr(scheduled_jobs::Column::UpdatedAt, Expr::value(now))
            .filter(scheduled_jobs::Column::JobId.eq(job_id.as_str()))
            .filter(scheduled_jobs::Column::Status.eq(JobStatus::Failed))
            .exec(&self.db)
            .await?;

        if rearmed.rows_affected > 0 {
            warn!("Re-armed failed job {}", job_id);
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn find(&self, job_id: &str) -> Result<Option<scheduled_jobs::Model>, DbErr> {
        ScheduledJobs::find_by_id(job_id.to_string())
            .one(&self.db)
            .await
    }

    /// Claims one due job. The `pending -> running` update is conditional, so
    /// when several workers race for the same row only one of them wins.
    pub async fn claim_next_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<scheduled_jobs::Model>, DbErr> {
        let candidates = ScheduledJobs::find()
            .filter(scheduled_jobs::Column::Status.eq(JobStatus::Pending))
            .filter(scheduled_jobs::Column::RunAt.lte(now))
            .order_by_asc(scheduled_jobs::Column::RunAt)
            .limit(CLAIM_CANDIDATES)
            .all(&self.db)
            .await?;

        for candidate in candidates {
            let claimed = ScheduledJobs::update_many()
                .col_expr(scheduled_jobs::Column::Status, Expr::value(JobStatus::Running))
                .col_expr(
                    scheduled_jobs::Column::Attempts,
                    Expr::col(scheduled_jobs::Column::Attempts).add(1),
                )
                .col_expr(scheduled_jobs::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(scheduled_jobs::Column::JobId.eq(candidate.job_id.as_str()))
                .filter(scheduled_jobs::Column::Status.eq(JobStatus::Pending))
                .exec(&self.db)
                .await?;

            if claimed.rows_affected == 1 {
                return self.find(&candidate.job_id).await;
            }
            debug!("Job {} was claimed by another worker", candidate.job_id);
        }

        Ok(None)
    }

    pub async fn complete(&self, job_id: &str) -> Result<(), DbErr> {
        ScheduledJobs::update_many()
            .col_expr(scheduled_jobs::Column::Status, Expr::value(JobStatus::Completed))
            .col_expr(scheduled_jobs::Column::LastError, Expr::value(Option::<String>::None))
            .col_expr(scheduled_jobs::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(scheduled_jobs::Column::JobId.eq(job_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Records a failed run. Jobs under the attempt limit go back to pending
    /// with a linear backoff; the rest are parked as failed.
    pub async fn fail(
        &self,
        job: &scheduled_jobs::Model,
        error: &str,
        max_attempts: i32,
        backoff: std::time::Duration,
    ) -> Result<FailureOutcome, DbErr> {
        let now = Utc::now();

        let (status, run_at, outcome) = if job.attempts >= max_attempts {
            (JobStatus::Failed, job.run_at, FailureOutcome::Failed)
        } else {
            let delay = ChronoDuration::from_std(backoff * job.attempts.max(1) as u32)
                .unwrap_or_else(|_| ChronoDuration::seconds(1));
            let run_at = now + delay;
            (JobStatus::Pending, run_at, FailureOutcome::Retrying { run_at })
        };

        ScheduledJobs::update_many()
            .col_expr(scheduled_jobs::Column::Status, Expr::value(status))
            .col_expr(scheduled_jobs::Column::RunAt, Expr::value(run_at))
            .col_expr(
                scheduled_jobs::Column::LastError,
                Expr::value(Some(error.to_string())),
            )
            .col_expr(scheduled_jobs::Column::UpdatedAt, Expr::value(now))
            .filter(scheduled_jobs::Column::JobId.eq(job.job_id.as_str()))
            .exec(&self.db)
            .await?;

        Ok(outcome)
    }

    pub async fn next_due_at(&self) -> Result<Option<DateTime<Utc>>, DbErr> {
        let next = ScheduledJobs::find()
            .filter(scheduled_jobs::Column::Status.eq(JobStatus::Pending))
            .order_by_asc(scheduled_jobs::Column::RunAt)
            .one(&self.db)
            .await?;
        Ok(next.map(|job| job.run_at))
    }

    /// Jobs left `running` by a process that died mid-run go back to pending.
    pub async fn recover_stalled(&self) -> Result<u64, DbErr> {
        let result = ScheduledJobs::update_many()
            .col_expr(scheduled_jobs::Column::Status, Expr::value(JobStatus::Pending))
            .col_expr(scheduled_jobs::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(scheduled_jobs::Column::Status.eq(JobStatus::Running))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            warn!("Recovered {} stalled jobs", result.rows_affected);
        }
        Ok(result.rows_affected)
    }

    pub async fn purge_finished(&self, older_than: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = ScheduledJobs::delete_many()
            .filter(
                Condition::any()
                    .add(scheduled_jobs::Column::Status.eq(JobStatus::Completed))
                    .add(scheduled_jobs::Column::Status.eq(JobStatus::Failed)),
            )
            .filter(scheduled_jobs::Column::UpdatedAt.lt(older_than))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use migration::{Migrator, MigratorTrait};
    use std::time::Duration;

    async fn setup_test_db() -> JobRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        JobRepository::new(db)
    }

    fn job(id: &str, run_at: DateTime<Utc>) -> NewJob {
        NewJob {
            job_id: id.to_string(),
            kind: JobKind::AdvanceNextQuestion,
            session_id: 1,
            expected_index: 0,
            run_at,
        }
    }

    #[tokio::test]
    async fn test_enqueue_is_deduplicated() {
        let repo = setup_test_db().await;
        let run_at = Utc::now();

        assert!(repo.enqueue(job("advance_next_question:1:0", run_at)).await.unwrap());
        assert!(!repo
            .enqueue(job("advance_next_question:1:0", run_at + ChronoDuration::seconds(60)))
            .await
            .unwrap());

        let stored = repo.find("advance_next_question:1:0").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.attempts, 0);
    }

    #[tokio::test]
    async fn test_claim_only_due_jobs_once() {
        let repo = setup_test_db().await;
        let now = Utc::now();

        repo.enqueue(job("due", now - ChronoDuration::seconds(1)))
            .await
            .unwrap();
        repo.enqueue(job("later", now + ChronoDuration::seconds(300)))
            .await
            .unwrap();

        let claimed = repo.claim_next_due(now).await.unwrap().unwrap();
        assert_eq!(claimed.job_id, "due");
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.attempts, 1);

        assert!(repo.claim_next_due(now).await.unwrap().is_none());
        assert_eq!(
            repo.next_due_at().await.unwrap().map(|t| t.timestamp()),
            Some((now + ChronoDuration::seconds(300)).timestamp())
        );
    }

    #[tokio::test]
    async fn test_failures_retry_then_park() {
        let repo = setup_test_db().await;
        let now = Utc::now();
        repo.enqueue(job("flaky", now)).await.unwrap();

        let first = repo.claim_next_due(now).await.unwrap().unwrap();
        let outcome = repo
            .fail(&first, "broadcast down", 2, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(matches!(outcome, FailureOutcome::Retrying { .. }));

        let stored = repo.find("flaky").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.last_error.as_deref(), Some("broadcast down"));

        let second = repo
            .claim_next_due(Utc::now() + ChronoDuration::seconds(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.attempts, 2);
        let outcome = repo
            .fail(&second, "still down", 2, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(outcome, FailureOutcome::Failed);

        let parked = repo.find("flaky").await.unwrap().unwrap();
        assert_eq!(parked.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_enqueue_rearms_failed_job() {
        let repo = setup_test_db().await;
        let now = Utc::now();
        repo.enqueue(job("parked", now)).await.unwrap();

        let claimed = repo.claim_next_due(now).await.unwrap().unwrap();
        let outcome = repo
            .fail(&claimed, "db down", 1, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(outcome, FailureOutcome::Failed);

        let later = now + ChronoDuration::seconds(5);
        assert!(repo.enqueue(job("parked", later)).await.unwrap());

        let rearmed = repo.find("parked").await.unwrap().unwrap();
        assert_eq!(rearmed.status, JobStatus::Pending);
        assert_eq!(rearmed.attempts, 0);
        assert_eq!(rearmed.run_at.timestamp(), later.timestamp());

        // Armed again only once
        assert!(!repo.enqueue(job("parked", later)).await.unwrap());

        let claimed = repo.claim_next_due(later).await.unwrap().unwrap();
        repo.complete(&claimed.job_id).await.unwrap();
        assert!(!repo.enqueue(job("parked", later)).await.unwrap());
    }

    #[tokio::test]
    async fn test_recover_and_purge() {
        let repo = setup_test_db().await;
        let now = Utc::now();

        repo.enqueue(job("stalled", now)).await.unwrap();
        repo.claim_next_due(now).await.unwrap().unwrap();
        assert_eq!(repo.recover_stalled().await.unwrap(), 1);
        assert_eq!(
            repo.find("stalled").await.unwrap().unwrap().status,
            JobStatus::Pending
        );

        let claimed = repo.claim_next_due(now).await.unwrap().unwrap();
        repo.complete(&claimed.job_id).await.unwrap();

        // Kept until the retention window passes
        assert_eq!(
            repo.purge_finished(now - ChronoDuration::hours(1)).await.unwrap(),
            0
        );
        assert!(!repo.enqueue(job("stalled", now)).await.unwrap());

        assert_eq!(
            repo.purge_finished(Utc::now() + ChronoDuration::seconds(1))
                .await
                .unwrap(),
            1
        );
        assert!(repo.find("stalled").await.unwrap().is_none());
    }
}
