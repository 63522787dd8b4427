use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    LeaderboardEntry, ParticipantId, ParticipantSnapshot, PlayerViewMode, QuestionId, ResponseId,
    SessionId, SessionSnapshot,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSessionRequest {
    pub quiz_id: String,
    pub title: Option<String>,
    pub max_players: Option<i32>,
    pub time_per_question_seconds: Option<i32>,
    pub points_per_question: Option<i32>,
    pub player_view_mode: Option<PlayerViewMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JoinSessionRequest {
    pub code: String,
    pub nickname: String,
    pub avatar_color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RedirectTarget {
    Game,
    Lobby,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export)]
pub enum JoinOutcome {
    Joined {
        session_id: SessionId,
        participant_id: ParticipantId,
        /// Only present for guests on their first join; the server keeps the hash.
        guest_token: Option<String>,
    },
    Rejoin {
        session_id: SessionId,
        participant_id: ParticipantId,
        redirect: RedirectTarget,
    },
}

impl JoinOutcome {
    pub fn is_rejoin(&self) -> bool {
        matches!(self, JoinOutcome::Rejoin { .. })
    }

    pub fn participant_id(&self) -> ParticipantId {
        match self {
            JoinOutcome::Joined { participant_id, .. } => *participant_id,
            JoinOutcome::Rejoin { participant_id, .. } => *participant_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParticipantRequest {
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmitResponseRequest {
    pub question_id: QuestionId,
    pub participant_id: ParticipantId,
    pub choice: Option<String>,
    pub time_used_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmitOutcome {
    pub response_id: ResponseId,
    pub is_correct: bool,
    pub points_earned: i32,
    pub total_score: i32,
}

/// Payload pushed to channel subscribers. Delivery is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum BroadcastEvent {
    SessionUpdated {
        session: SessionSnapshot,
    },
    ParticipantChanged {
        participant: ParticipantSnapshot,
    },
    LeaderboardUpdated {
        session_id: SessionId,
        entries: Vec<LeaderboardEntry>,
    },
}

impl BroadcastEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            BroadcastEvent::SessionUpdated { session } => session.id,
            BroadcastEvent::ParticipantChanged { participant } => participant.session_id,
            BroadcastEvent::LeaderboardUpdated { session_id, .. } => *session_id,
        }
    }
}
