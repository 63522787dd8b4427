use chrono::Utc;
use quiz_core::{
    issue_guest_token, join_decision, normalize_nickname, normalize_session_code, rank_standings,
    Caller, JoinContext, JoinDecision,
};
use quiz_types::{
    JoinOutcome, JoinSessionRequest, LeaderboardEntry, ParticipantSnapshot, SessionStatus,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::info;

use crate::entities::{
    game_participants, game_sessions, prelude::*, sea_orm_active_enums::ParticipantState,
};
use crate::error::is_unique_violation;
use crate::mapping::{active_participants, participant_snapshot, standing};
use crate::repositories::session_repository::lock_session;
use crate::retry::{with_lock_retry, DEFAULT_LOCK_RETRY_ATTEMPTS};
use crate::SessionError;

/// Outcome of a join plus the created row, which is only present for fresh
/// joins and drives the participant-joined broadcast.
#[derive(Debug, Clone)]
pub struct JoinResult {
    pub outcome: JoinOutcome,
    pub participant: Option<ParticipantSnapshot>,
}

#[derive(Clone)]
pub struct ParticipantRepository {
    db: DatabaseConnection,
    lock_retries: u32,
}

impl ParticipantRepository {
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

    pub async fn find_by_id(&self, id: i32) -> Result<Option<ParticipantSnapshot>, SessionError> {
        let participant = GameParticipants::find_by_id(id).one(&self.db).await?;
        Ok(participant.map(participant_snapshot))
    }

    pub async fn join(
        &self,
        request: &JoinSessionRequest,
        caller: &Caller,
    ) -> Result<JoinResult, SessionError> {
        let nickname = normalize_nickname(&request.nickname)?;
        let code = normalize_session_code(&request.code);
        let avatar_color = request
            .avatar_color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        let (code, nickname, avatar_color) =
            (code.as_str(), nickname.as_str(), avatar_color.as_deref());
        with_lock_retry(self.lock_retries, move || {
            self.try_join(code, nickname, avatar_color, caller)
        })
        .await
    }

    async fn try_join(
        &self,
        code: &str,
        nickname: &str,
        avatar_color: Option<&str>,
        caller: &Caller,
    ) -> Result<JoinResult, SessionError> {
        let txn = self.db.begin().await?;

        let session = GameSessions::find()
            .filter(game_sessions::Column::Code.eq(code))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| SessionError::not_found(format!("session with code {}", code)))?;

        let existing = find_active_for_caller(&txn, session.id, caller).await?;
        let nickname_taken = match existing {
            Some(_) => false,
            None => GameParticipants::find()
                .filter(game_participants::Column::GameSessionId.eq(session.id))
                .filter(game_participants::Column::Status.eq(ParticipantState::Active))
                .filter(game_participants::Column::Nickname.eq(nickname))
                .one(&txn)
                .await?
                .is_some(),
        };
        let active_players = GameParticipants::find()
            .filter(game_participants::Column::GameSessionId.eq(session.id))
            .filter(game_participants::Column::Status.eq(ParticipantState::Active))
            .count(&txn)
            .await?;

        let decision = join_decision(&JoinContext {
            status: SessionStatus::from(session.status),
            active_players,
            max_players: session.max_players,
            existing_participant: existing.as_ref().map(|p| p.id),
            nickname_taken,
        })?;

        match decision {
            JoinDecision::Rejoin {
                participant_id,
                redirect,
            } => {
                txn.commit().await?;
                info!(
                    "Participant {} rejoined session {}",
                    participant_id, session.id
                );
                Ok(JoinResult {
                    outcome: JoinOutcome::Rejoin {
                        session_id: session.id,
                        participant_id,
                        redirect,
                    },
                    participant: None,
                })
            }
            JoinDecision::Create => {
                // Guests keep the token they already hold; first-time guests
                // get a new one and only its hash is stored.
                let (guest_token, guest_token_hash) = match (caller.user_id, caller.guest_token_hash())
                {
                    (Some(_), _) => (None, None),
                    (None, Some(hash)) => (None, Some(hash)),
                    (None, None) => {
                        let issued = issue_guest_token();
                        (Some(issued.token), Some(issued.hash))
                    }
                };

                let now = Utc::now();
                let model = game_participants::ActiveModel {
                    game_session_id: Set(session.id),
                    user_id: Set(caller.user_id),
                    guest_token_hash: Set(guest_token_hash),
                    nickname: Set(nickname.to_string()),
                    avatar_color: Set(avatar_color.map(String::from)),
                    status: Set(ParticipantState::Active),
                    total_score: Set(0),
                    correct_answers: Set(0),
                    incorrect_answers: Set(0),
                    joined_at: Set(now),
                    left_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };

                let inserted = match GameParticipants::insert(model).exec(&txn).await {
                    Ok(inserted) => inserted,
                    Err(err) if is_unique_violation(&err) => {
                        return Err(SessionError::Conflict(
                            "nickname already taken".to_string(),
                        ));
                    }
                    Err(err) => return Err(err.into()),
                };

                let participant = GameParticipants::find_by_id(inserted.last_insert_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| SessionError::not_found("created participant"))?;
                txn.commit().await?;

                info!(
                    "Participant {} ({}) joined session {}",
                    participant.id, participant.nickname, session.id
                );
                Ok(JoinResult {
                    outcome: JoinOutcome::Joined {
                        session_id: session.id,
                        participant_id: participant.id,
                        guest_token,
                    },
                    participant: Some(participant_snapshot(participant)),
                })
            }
        }
    }

    /// Host removes an active participant; the row is kept as `kicked`.
    pub async fn kick(
        &self,
        session_id: i32,
        participant_id: i32,
        caller: &Caller,
    ) -> Result<ParticipantSnapshot, SessionError> {
        with_lock_retry(self.lock_retries, move || {
            self.try_kick(session_id, participant_id, caller)
        })
        .await
    }

    async fn try_kick(
        &self,
        session_id: i32,
        participant_id: i32,
        caller: &Caller,
    ) -> Result<ParticipantSnapshot, SessionError> {
        let txn = self.db.begin().await?;
        let session = lock_session(&txn, session_id).await?;

        if !caller.is_user(session.host_user_id) {
            return Err(SessionError::Unauthorized(
                "only the host can kick participants".to_string(),
            ));
        }

        let participant = lock_active_participant(&txn, session_id, participant_id).await?;
        let updated = deactivate(&txn, participant, ParticipantState::Kicked).await?;
        txn.commit().await?;

        info!(
            "Participant {} kicked from session {}",
            participant_id, session_id
        );
        Ok(participant_snapshot(updated))
    }

    /// A participant leaving on their own.
    pub async fn leave(
        &self,
        session_id: i32,
        participant_id: i32,
        caller: &Caller,
    ) -> Result<ParticipantSnapshot, SessionError> {
        with_lock_retry(self.lock_retries, move || {
            self.try_leave(session_id, participant_id, caller)
        })
        .await
    }

    async fn try_leave(
        &self,
        session_id: i32,
        participant_id: i32,
        caller: &Caller,
    ) -> Result<ParticipantSnapshot, SessionError> {
        let txn = self.db.begin().await?;
        let participant = lock_active_participant(&txn, session_id, participant_id).await?;

        if !caller.owns(participant.user_id, participant.guest_token_hash.as_deref()) {
            return Err(SessionError::Unauthorized(
                "participant belongs to someone else".to_string(),
            ));
        }

        let updated = deactivate(&txn, participant, ParticipantState::Left).await?;
        txn.commit().await?;

        info!("Participant {} left session {}", participant_id, session_id);
        Ok(participant_snapshot(updated))
    }

    pub async fn leaderboard(&self, session_id: i32) -> Result<Vec<LeaderboardEntry>, SessionError> {
        if GameSessions::find_by_id(session_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(SessionError::not_found(format!("session {}", session_id)));
        }

        let standings = active_participants(&self.db, session_id)
            .await?
            .into_iter()
            .map(standing)
            .collect();
        Ok(rank_standings(standings))
    }
}

async fn find_active_for_caller<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
    caller: &Caller,
) -> Result<Option<game_participants::Model>, DbErr> {
    let query = GameParticipants::find()
        .filter(game_participants::Column::GameSessionId.eq(session_id))
        .filter(game_participants::Column::Status.eq(ParticipantState::Active));

    if let Some(user_id) = caller.user_id {
        return query
            .filter(game_participants::Column::UserId.eq(user_id))
            .one(conn)
            .await;
    }

    match caller.guest_token_hash() {
        Some(hash) => {
            query
                .filter(game_participants::Column::GuestTokenHash.eq(hash))
                .one(conn)
                .await
        }
        None => Ok(None),
    }
}

pub(crate) async fn lock_active_participant<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
    participant_id: i32,
) -> Result<game_participants::Model, SessionError> {
    GameParticipants::find_by_id(participant_id)
        .filter(game_participants::Column::GameSessionId.eq(session_id))
        .filter(game_participants::Column::Status.eq(ParticipantState::Active))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| {
            SessionError::not_found(format!(
                "active participant {} in session {}",
                participant_id, session_id
            ))
        })
}

async fn deactivate<C: ConnectionTrait>(
    conn: &C,
    participant: game_participants::Model,
    state: ParticipantState,
) -> Result<game_participants::Model, DbErr> {
    let now = Utc::now();
    let mut active: game_participants::ActiveModel = participant.into();
    active.status = Set(state);
    active.left_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(conn).await
}
