use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use quiz_core::{Caller, SkipReason, participant_channel, session_channel};
use quiz_persistence::SessionError;
use quiz_persistence::entities::game_sessions;
use quiz_persistence::entities::sea_orm_active_enums::GameStatus;
use quiz_persistence::repositories::{
    AdvanceOutcome, ParticipantRepository, ResponseRepository, SessionRepository,
};
use quiz_types::{
    BroadcastEvent, CreateSessionRequest, JoinOutcome, JoinSessionRequest, LeaderboardEntry,
    ParticipantId, ParticipantSnapshot, QuestionView, SessionId, SessionSnapshot, SubmitOutcome,
    SubmitResponseRequest,
};
use sea_orm::DbErr;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::scheduler::{AdvanceHandler, AdvancementQueue};

/// Orchestrates session operations: repositories do the locked writes, then
/// this layer publishes events and arms advancement timers after commit.
pub struct SessionService {
    sessions: SessionRepository,
    participants: ParticipantRepository,
    responses: ResponseRepository,
    broadcaster: Arc<dyn Broadcaster>,
    queue: AdvancementQueue,
    leaderboard_on_answer: bool,
}

impl SessionService {
    pub fn new(
        sessions: SessionRepository,
        participants: ParticipantRepository,
        responses: ResponseRepository,
        broadcaster: Arc<dyn Broadcaster>,
        queue: AdvancementQueue,
    ) -> Self {
        Self {
            sessions,
            participants,
            responses,
            broadcaster,
            queue,
            leaderboard_on_answer: false,
        }
    }

    pub fn with_leaderboard_on_answer(mut self, enabled: bool) -> Self {
        self.leaderboard_on_answer = enabled;
        self
    }

    pub async fn create_session(
        &self,
        caller: &Caller,
        request: &CreateSessionRequest,
    ) -> Result<SessionSnapshot, SessionError> {
        let host = caller.user_id.ok_or_else(|| {
            SessionError::Unauthorized("sign in to host a session".to_string())
        })?;
        let snapshot = self.sessions.create(host, request).await?;
        info!(
            "User {} created session {} ({})",
            host, snapshot.id, snapshot.code
        );
        Ok(snapshot)
    }

    pub async fn snapshot(&self, session_id: SessionId) -> Result<SessionSnapshot, SessionError> {
        self.sessions.snapshot(session_id).await
    }

    pub async fn current_question(
        &self,
        session_id: SessionId,
    ) -> Result<QuestionView, SessionError> {
        self.sessions.current_question(session_id).await
    }

    pub async fn leaderboard(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<LeaderboardEntry>, SessionError> {
        self.participants.leaderboard(session_id).await
    }

    pub async fn start_session(
        &self,
        session_id: SessionId,
        caller: &Caller,
    ) -> Result<SessionSnapshot, SessionError> {
        let snapshot = self.sessions.start(session_id, caller).await?;

        self.publish(
            &session_channel(session_id),
            BroadcastEvent::SessionUpdated {
                session: snapshot.clone(),
            },
        )
        .await;
        self.queue
            .schedule_advancement(
                session_id,
                0,
                question_delay(snapshot.time_per_question_seconds),
            )
            .await?;

        Ok(snapshot)
    }

    pub async fn cancel_session(
        &self,
        session_id: SessionId,
        caller: &Caller,
    ) -> Result<SessionSnapshot, SessionError> {
        let snapshot = self.sessions.cancel(session_id, caller).await?;
        self.publish(
            &session_channel(session_id),
            BroadcastEvent::SessionUpdated {
                session: snapshot.clone(),
            },
        )
        .await;
        Ok(snapshot)
    }

    pub async fn join_session(
        &self,
        request: &JoinSessionRequest,
        caller: &Caller,
    ) -> Result<JoinOutcome, SessionError> {
        let result = self.participants.join(request, caller).await?;

        // Rejoins change nothing, so only fresh rows are announced
        if let Some(participant) = result.participant {
            self.publish(
                &participant_channel(participant.session_id),
                BroadcastEvent::ParticipantChanged { participant },
            )
            .await;
        }

        Ok(result.outcome)
    }

    pub async fn kick_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
        caller: &Caller,
    ) -> Result<ParticipantSnapshot, SessionError> {
        let participant = self
            .participants
            .kick(session_id, participant_id, caller)
            .await?;
        self.announce_departure(&participant).await;
        Ok(participant)
    }

    pub async fn leave_session(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
        caller: &Caller,
    ) -> Result<ParticipantSnapshot, SessionError> {
        let participant = self
            .participants
            .leave(session_id, participant_id, caller)
            .await?;
        self.announce_departure(&participant).await;
        Ok(participant)
    }

    pub async fn submit_response(
        &self,
        session_id: SessionId,
        request: &SubmitResponseRequest,
        caller: &Caller,
    ) -> Result<SubmitOutcome, SessionError> {
        let outcome = self.responses.submit(session_id, request, caller).await?;
        if self.leaderboard_on_answer {
            self.publish_leaderboard(session_id).await;
        }
        Ok(outcome)
    }

    /// Re-arms the timer of every live session. Run at boot so a session
    /// whose job was never written still advances.
    pub async fn rearm_live_sessions(&self) -> Result<usize, SessionError> {
        let mut armed = 0;
        for session in self.sessions.live_sessions().await? {
            if self.rearm(&session).await? {
                armed += 1;
            }
        }
        if armed > 0 {
            info!("Re-armed advancement for {} live sessions", armed);
        }
        Ok(armed)
    }

    async fn rearm(&self, session: &game_sessions::Model) -> Result<bool, DbErr> {
        let budget = ChronoDuration::seconds(i64::from(session.time_per_question_seconds));
        let remaining = session
            .question_started_at
            .map(|started| started + budget - Utc::now())
            .and_then(|left| left.to_std().ok())
            .unwrap_or(Duration::ZERO);

        self.queue
            .schedule_advancement(session.id, session.current_question_index, remaining)
            .await
    }

    async fn announce_departure(&self, participant: &ParticipantSnapshot) {
        self.publish(
            &participant_channel(participant.session_id),
            BroadcastEvent::ParticipantChanged {
                participant: participant.clone(),
            },
        )
        .await;
        self.publish_snapshot(participant.session_id).await;
    }

    async fn publish_snapshot(&self, session_id: SessionId) {
        match self.sessions.snapshot(session_id).await {
            Ok(session) => {
                self.publish(
                    &session_channel(session_id),
                    BroadcastEvent::SessionUpdated { session },
                )
                .await
            }
            Err(e) => warn!("Failed to load snapshot of session {}: {}", session_id, e),
        }
    }

    async fn publish_leaderboard(&self, session_id: SessionId) {
        match self.participants.leaderboard(session_id).await {
            Ok(entries) => {
                self.publish(
                    &session_channel(session_id),
                    BroadcastEvent::LeaderboardUpdated {
                        session_id,
                        entries,
                    },
                )
                .await
            }
            Err(e) => warn!("Failed to load leaderboard of session {}: {}", session_id, e),
        }
    }

    // State is already committed when this runs, so a failed publish is
    // only logged. Clients catch up through the snapshot endpoint.
    async fn publish(&self, channel: &str, event: BroadcastEvent) {
        if let Err(e) = self.broadcaster.broadcast(channel, &event).await {
            warn!("Broadcast on {} failed: {}", channel, e);
        }
    }
}

#[async_trait]
impl AdvanceHandler for SessionService {
    async fn handle_advance(
        &self,
        session_id: SessionId,
        expected_index: i32,
    ) -> Result<(), SessionError> {
        match self.sessions.advance(session_id, expected_index).await? {
            AdvanceOutcome::SessionMissing => {
                debug!("Session {} no longer exists, nothing to advance", session_id);
            }
            AdvanceOutcome::Skipped(reason) => {
                debug!(
                    "Skipping advancement of session {} past {}: {:?}",
                    session_id, expected_index, reason
                );
                // A live session on another index may have lost its timer
                // to a failed schedule; arming it again is a no-op otherwise.
                if let SkipReason::StaleIndex { .. } = reason {
                    if let Some(session) = self.sessions.find_by_id(session_id).await? {
                        if session.status == GameStatus::Live {
                            self.rearm(&session).await?;
                        }
                    }
                }
            }
            AdvanceOutcome::Advanced(snapshot) => {
                let next_index = snapshot.current_question_index;
                let delay = question_delay(snapshot.time_per_question_seconds);
                self.publish(
                    &session_channel(session_id),
                    BroadcastEvent::SessionUpdated { session: snapshot },
                )
                .await;
                self.queue
                    .schedule_advancement(session_id, next_index, delay)
                    .await?;
            }
            AdvanceOutcome::Ended(snapshot) => {
                self.publish(
                    &session_channel(session_id),
                    BroadcastEvent::SessionUpdated { session: snapshot },
                )
                .await;
                self.publish_leaderboard(session_id).await;
            }
        }
        Ok(())
    }
}

fn question_delay(time_per_question_seconds: i32) -> Duration {
    Duration::from_secs(u64::try_from(time_per_question_seconds).unwrap_or(0))
}
