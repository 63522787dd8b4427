use chrono::Utc;
use quiz_core::{ensure_question_open, Caller, ScoringEngine};
use quiz_types::{DomainReason, SubmitOutcome, SubmitResponseRequest};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{debug, info};

use crate::entities::{
    game_participants, game_responses, game_sessions, prelude::*, quiz_questions,
    sea_orm_active_enums::GameStatus,
};
use crate::error::is_unique_violation;
use crate::repositories::participant_repository::lock_active_participant;
use crate::retry::{with_lock_retry, DEFAULT_LOCK_RETRY_ATTEMPTS};
use crate::SessionError;

#[derive(Clone)]
pub struct ResponseRepository {
    db: DatabaseConnection,
    lock_retries: u32,
}

impl ResponseRepository {
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

    /// Records a participant's answer and adds its points to their totals.
    /// At most one response per (session, participant, question) ever exists.
    pub async fn submit(
        &self,
        session_id: i32,
        request: &SubmitResponseRequest,
        caller: &Caller,
    ) -> Result<SubmitOutcome, SessionError> {
        with_lock_retry(self.lock_retries, move || {
            self.try_submit(session_id, request, caller)
        })
        .await
    }

    async fn try_submit(
        &self,
        session_id: i32,
        request: &SubmitResponseRequest,
        caller: &Caller,
    ) -> Result<SubmitOutcome, SessionError> {
        let txn = self.db.begin().await?;

        let session = GameSessions::find_by_id(session_id)
            .one(&txn)
            .await?
            .ok_or_else(|| SessionError::not_found(format!("session {}", session_id)))?;
        let participant = lock_active_participant(&txn, session_id, request.participant_id).await?;

        if !caller.owns(participant.user_id, participant.guest_token_hash.as_deref()) {
            return Err(SessionError::Unauthorized(
                "participant belongs to someone else".to_string(),
            ));
        }
        if session.status != GameStatus::Live {
            return Err(SessionError::Domain(DomainReason::SessionNotLive));
        }

        let question = QuizQuestions::find_by_id(request.question_id)
            .one(&txn)
            .await?
            .filter(|q| q.quiz_id == session.quiz_id)
            .ok_or_else(|| {
                SessionError::not_found(format!(
                    "question {} in session {}",
                    request.question_id, session_id
                ))
            })?;
        ensure_question_open(question.position, session.current_question_index)?;

        let existing = GameResponses::find()
            .filter(game_responses::Column::GameSessionId.eq(session_id))
            .filter(game_responses::Column::GameParticipantId.eq(participant.id))
            .filter(game_responses::Column::QuestionId.eq(question.id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(SessionError::Domain(DomainReason::AlreadyAnswered));
        }

        let time_used = request
            .time_used_seconds
            .unwrap_or_else(|| elapsed_on(&session, &question));
        let scored = ScoringEngine::score_submission(
            request.choice.as_deref(),
            &question.answer,
            session.points_per_question,
            session.time_per_question_seconds,
            time_used,
        );

        let now = Utc::now();
        let response = game_responses::ActiveModel {
            game_session_id: Set(session_id),
            game_participant_id: Set(participant.id),
            question_id: Set(question.id),
            answer: Set(request
                .choice
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)),
            is_correct: Set(scored.is_correct()),
            points_earned: Set(scored.points_earned),
            time_used_seconds: Set(scored.time_used_seconds),
            answered_at: Set(now),
            created_at: Set(now),
            ..Default::default()
        };

        let inserted = match GameResponses::insert(response).exec(&txn).await {
            Ok(inserted) => inserted,
            Err(err) if is_unique_violation(&err) => {
                debug!(
                    "Duplicate response from participant {} for question {}",
                    participant.id, question.id
                );
                return Err(SessionError::Domain(DomainReason::AlreadyAnswered));
            }
            Err(err) => return Err(err.into()),
        };

        // Totals build on the values read under the row lock
        let total_score = participant.total_score + scored.points_earned;
        let correct_answers = participant.correct_answers + scored.correct_delta();
        let incorrect_answers = participant.incorrect_answers + scored.incorrect_delta();
        let participant_id = participant.id;

        let mut active: game_participants::ActiveModel = participant.into();
        active.total_score = Set(total_score);
        active.correct_answers = Set(correct_answers);
        active.incorrect_answers = Set(incorrect_answers);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Participant {} answered question {} in session {}: {} points",
            participant_id, question.id, session_id, scored.points_earned
        );
        Ok(SubmitOutcome {
            response_id: inserted.last_insert_id,
            is_correct: scored.is_correct(),
            points_earned: scored.points_earned,
            total_score,
        })
    }

    pub async fn responses_for_participant(
        &self,
        participant_id: i32,
    ) -> Result<Vec<game_responses::Model>, SessionError> {
        Ok(GameResponses::find()
            .filter(game_responses::Column::GameParticipantId.eq(participant_id))
            .order_by_asc(game_responses::Column::Id)
            .all(&self.db)
            .await?)
    }
}

/// Time since the question opened, used when the client does not report it.
/// Answers to earlier questions count as using the whole budget.
fn elapsed_on(session: &game_sessions::Model, question: &quiz_questions::Model) -> f64 {
    let budget = f64::from(session.time_per_question_seconds);
    if question.position != session.current_question_index {
        return budget;
    }
    match session.question_started_at {
        Some(started) => (Utc::now() - started).num_milliseconds() as f64 / 1000.0,
        None => budget,
    }
}
