use quiz_types::SessionId;

/// Channel carrying full session snapshots.
pub fn session_channel(session_id: SessionId) -> String {
    format!("game_session:{session_id}")
}

/// Channel carrying participant join/kick/leave deltas.
pub fn participant_channel(session_id: SessionId) -> String {
    format!("game_participant:{session_id}:joined")
}

/// Deterministic job identity for an advancement of `expected_index`.
pub fn advancement_job_id(session_id: SessionId, expected_index: i32) -> String {
    format!("advance_next_question:{session_id}:{expected_index}")
}

/// Whether `name` is one of the channels sessions publish on.
pub fn is_known_channel(name: &str) -> bool {
    if let Some(id) = name.strip_prefix("game_session:") {
        return id.parse::<SessionId>().is_ok();
    }
    name.strip_prefix("game_participant:")
        .and_then(|rest| rest.strip_suffix(":joined"))
        .is_some_and(|id| id.parse::<SessionId>().is_ok())
}
