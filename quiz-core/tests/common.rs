use quiz_core::JoinContext;
use quiz_types::{CreateSessionRequest, SessionStatus};

/// A session request that relies on every server-side default.
pub fn default_request() -> CreateSessionRequest {
    CreateSessionRequest {
        quiz_id: "quiz-basics".to_string(),
        title: Some("Basics".to_string()),
        max_players: None,
        time_per_question_seconds: None,
        points_per_question: None,
        player_view_mode: None,
    }
}

/// Join context for an empty session in the given status.
pub fn empty_session(status: SessionStatus, max_players: i32) -> JoinContext {
    JoinContext {
        status,
        active_players: 0,
        max_players,
        existing_participant: None,
        nickname_taken: false,
    }
}
