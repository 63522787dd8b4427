use crate::{ParticipantId, QuestionId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SessionStatus {
    Lobby,     // Waiting for the host to start
    Live,      // Questions are being played
    Ended,     // Last question expired
    Cancelled, // Host aborted the session
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Ended | SessionStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Lobby => "lobby",
            SessionStatus::Live => "live",
            SessionStatus::Ended => "ended",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ParticipantStatus {
    Active,
    Left,
    Kicked,
}

/// What the player screen renders while a question is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PlayerViewMode {
    #[default]
    Full,
    Options,
    Answers,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerSummary {
    pub id: ParticipantId,
    pub nickname: String,
    pub avatar_color: Option<String>,
    pub score: i32,
    pub is_host: bool,
    pub status: ParticipantStatus,
}

/// Full session state, used both for channel broadcasts and for the
/// pull-based snapshot a reconnecting client fetches.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub code: String,
    pub title: Option<String>,
    pub quiz_id: String,
    pub host_user_id: UserId,
    pub status: SessionStatus,
    pub current_question_index: i32,
    pub current_question_number: Option<i32>,
    pub total_questions: i32,
    pub max_players: i32,
    pub time_per_question_seconds: i32,
    pub points_per_question: i32,
    pub player_view_mode: PlayerViewMode,
    pub question_started_at: Option<String>, // ISO 8601 string
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
    pub player_count: i32,
    pub players: Vec<PlayerSummary>,
}

impl SessionSnapshot {
    pub fn player(&self, participant_id: ParticipantId) -> Option<&PlayerSummary> {
        self.players.iter().find(|p| p.id == participant_id)
    }
}

/// Single-participant delta sent on join, kick and leave.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub session_id: SessionId,
    pub user_id: Option<UserId>,
    pub nickname: String,
    pub avatar_color: Option<String>,
    pub status: ParticipantStatus,
    pub score: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub joined_at: String,
    pub left_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub participant_id: ParticipantId,
    pub nickname: String,
    pub avatar_color: Option<String>,
    pub score: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
}

/// Question as shown to players: never carries the canonical answer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuestionView {
    pub id: QuestionId,
    pub position: i32,
    pub question: String,
    pub choices: Vec<String>,
    pub question_started_at: Option<String>,
    pub time_per_question_seconds: i32,
    pub player_view_mode: PlayerViewMode,
}
