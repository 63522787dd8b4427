use chrono::Utc;
use quiz_core::{
    advance_decision, ensure_can_cancel, ensure_can_start, generate_session_code,
    normalize_session_code, AdvanceDecision, Caller, SessionConfig, SkipReason,
};
use quiz_types::{CreateSessionRequest, DomainReason, QuestionView, SessionSnapshot, UserId};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::{debug, info};

use crate::entities::{
    game_sessions, prelude::*,
    sea_orm_active_enums::{GameStatus, ViewMode},
};
use crate::error::is_unique_violation;
use crate::mapping::{load_snapshot, question_view};
use crate::repositories::question_repository::{count_for_quiz, find_by_position};
use crate::retry::{with_lock_retry, DEFAULT_LOCK_RETRY_ATTEMPTS};
use crate::SessionError;

const MAX_CODE_ATTEMPTS: u32 = 8;

/// Result of a fired advancement job.
#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    SessionMissing,
    Skipped(SkipReason),
    Advanced(SessionSnapshot),
    Ended(SessionSnapshot),
}

#[derive(Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
    lock_retries: u32,
}

impl SessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            lock_retries: DEFAULT_LOCK_RETRY_ATTEMPTS,
        }
    }

    pub fn with_lock_retries(mut self, attempts: u32) -> Self {
        self.lock_retries = attempts;
        self
    }

    pub async fn create(
        &self,
        host_user_id: UserId,
        request: &CreateSessionRequest,
    ) -> Result<SessionSnapshot, SessionError> {
        let quiz_id = request.quiz_id.trim();
        if quiz_id.is_empty() {
            return Err(SessionError::InvalidInput("quiz_id is required".to_string()));
        }

        let total_questions = i32::try_from(count_for_quiz(&self.db, quiz_id).await?)
            .map_err(|_| SessionError::InvalidInput("quiz has too many questions".to_string()))?;
        let config = SessionConfig::from_request(request, total_questions)?;
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_session_code();
            let now = Utc::now();
            let model = game_sessions::ActiveModel {
                code: Set(code.clone()),
                host_user_id: Set(host_user_id),
                quiz_id: Set(quiz_id.to_string()),
                title: Set(title.clone()),
                status: Set(GameStatus::Lobby),
                max_players: Set(config.max_players),
                time_per_question_seconds: Set(config.time_per_question_seconds),
                points_per_question: Set(config.points_per_question),
                total_questions: Set(config.total_questions),
                player_view_mode: Set(ViewMode::from(config.player_view_mode)),
                current_question_index: Set(0),
                question_started_at: Set(None),
                started_at: Set(None),
                completed_at: Set(None),
                cancelled_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };

            match GameSessions::insert(model).exec(&self.db).await {
                Ok(inserted) => {
                    let session = GameSessions::find_by_id(inserted.last_insert_id)
                        .one(&self.db)
                        .await?
                        .ok_or_else(|| SessionError::not_found("created session"))?;
                    info!(
                        "Created session {} ({}) for host {} with {} questions",
                        session.id, session.code, host_user_id, total_questions
                    );
                    return Ok(load_snapshot(&self.db, session).await?);
                }
                Err(err) if is_unique_violation(&err) => {
                    debug!("Session code {} already in use (attempt {})", code, attempt);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(SessionError::Conflict(
            "could not allocate a unique session code".to_string(),
        ))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<game_sessions::Model>, SessionError> {
        Ok(GameSessions::find_by_id(id).one(&self.db).await?)
    }

    /// Join codes are matched case-insensitively; they are stored uppercase.
    pub async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<game_sessions::Model>, SessionError> {
        Ok(GameSessions::find()
            .filter(game_sessions::Column::Code.eq(normalize_session_code(code)))
            .one(&self.db)
            .await?)
    }

    /// Sessions currently running questions, used to re-arm timers on boot.
    pub async fn live_sessions(&self) -> Result<Vec<game_sessions::Model>, SessionError> {
        Ok(GameSessions::find()
            .filter(game_sessions::Column::Status.eq(GameStatus::Live))
            .all(&self.db)
            .await?)
    }

    pub async fn snapshot(&self, session_id: i32) -> Result<SessionSnapshot, SessionError> {
        let session = self
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| SessionError::not_found(format!("session {}", session_id)))?;
        Ok(load_snapshot(&self.db, session).await?)
    }

    pub async fn start(
        &self,
        session_id: i32,
        caller: &Caller,
    ) -> Result<SessionSnapshot, SessionError> {
        with_lock_retry(self.lock_retries, move || self.try_start(session_id, caller)).await
    }

    async fn try_start(
        &self,
        session_id: i32,
        caller: &Caller,
    ) -> Result<SessionSnapshot, SessionError> {
        let txn = self.db.begin().await?;
        let session = lock_session(&txn, session_id).await?;

        ensure_can_start(
            session.status.into(),
            caller.is_user(session.host_user_id),
            session.total_questions,
        )?;

        let now = Utc::now();
        let mut active: game_sessions::ActiveModel = session.into();
        active.status = Set(GameStatus::Live);
        active.current_question_index = Set(0);
        active.started_at = Set(Some(now));
        active.question_started_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        let snapshot = load_snapshot(&txn, updated).await?;
        txn.commit().await?;

        info!("Session {} is live", session_id);
        Ok(snapshot)
    }

    pub async fn cancel(
        &self,
        session_id: i32,
        caller: &Caller,
    ) -> Result<SessionSnapshot, SessionError> {
        with_lock_retry(self.lock_retries, move || self.try_cancel(session_id, caller)).await
    }

    async fn try_cancel(
        &self,
        session_id: i32,
        caller: &Caller,
    ) -> Result<SessionSnapshot, SessionError> {
        let txn = self.db.begin().await?;
        let session = lock_session(&txn, session_id).await?;

        ensure_can_cancel(session.status.into(), caller.is_user(session.host_user_id))?;

        let now = Utc::now();
        let mut active: game_sessions::ActiveModel = session.into();
        active.status = Set(GameStatus::Cancelled);
        active.cancelled_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        let snapshot = load_snapshot(&txn, updated).await?;
        txn.commit().await?;

        info!("Session {} cancelled by host", session_id);
        Ok(snapshot)
    }

    /// Moves a live session past `expected_index`. Stale and duplicate
    /// triggers leave the row untouched.
    pub async fn advance(
        &self,
        session_id: i32,
        expected_index: i32,
    ) -> Result<AdvanceOutcome, SessionError> {
        with_lock_retry(self.lock_retries, move || {
            self.try_advance(session_id, expected_index)
        })
        .await
    }

    async fn try_advance(
        &self,
        session_id: i32,
        expected_index: i32,
    ) -> Result<AdvanceOutcome, SessionError> {
        let txn = self.db.begin().await?;
        let Some(session) = GameSessions::find_by_id(session_id)
            .lock_exclusive()
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(AdvanceOutcome::SessionMissing);
        };

        let decision = advance_decision(
            session.status.into(),
            session.current_question_index,
            expected_index,
            session.total_questions,
        );

        let now = Utc::now();
        let mut active: game_sessions::ActiveModel = session.into();
        let ended = match decision {
            AdvanceDecision::Skip(reason) => {
                txn.rollback().await?;
                return Ok(AdvanceOutcome::Skipped(reason));
            }
            AdvanceDecision::Advance { next_index } => {
                active.current_question_index = Set(next_index);
                active.question_started_at = Set(Some(now));
                false
            }
            AdvanceDecision::End => {
                active.status = Set(GameStatus::Ended);
                active.completed_at = Set(Some(now));
                true
            }
        };
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        let snapshot = load_snapshot(&txn, updated).await?;
        txn.commit().await?;

        if ended {
            info!("Session {} ended after question {}", session_id, expected_index + 1);
            Ok(AdvanceOutcome::Ended(snapshot))
        } else {
            info!(
                "Session {} advanced to question {}",
                session_id,
                snapshot.current_question_index + 1
            );
            Ok(AdvanceOutcome::Advanced(snapshot))
        }
    }

    /// The open question of a live session, without its answer.
    pub async fn current_question(&self, session_id: i32) -> Result<QuestionView, SessionError> {
        let session = self
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| SessionError::not_found(format!("session {}", session_id)))?;

        if session.status != GameStatus::Live {
            return Err(SessionError::Domain(DomainReason::SessionNotLive));
        }

        let question = find_by_position(&self.db, &session.quiz_id, session.current_question_index)
            .await?
            .ok_or_else(|| {
                SessionError::not_found(format!(
                    "question {} of quiz {}",
                    session.current_question_index, session.quiz_id
                ))
            })?;

        Ok(question_view(question, &session)?)
    }
}

pub(crate) async fn lock_session<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
) -> Result<game_sessions::Model, SessionError> {
    GameSessions::find_by_id(session_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| SessionError::not_found(format!("session {}", session_id)))
}
