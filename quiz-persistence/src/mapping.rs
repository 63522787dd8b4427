use quiz_core::Standing;
use quiz_types::{
    ParticipantSnapshot, PlayerSummary, QuestionView, SessionSnapshot, SessionStatus,
};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{
    game_participants, game_sessions, prelude::*, quiz_questions,
    sea_orm_active_enums::ParticipantState,
};

pub(crate) fn participant_snapshot(model: game_participants::Model) -> ParticipantSnapshot {
    ParticipantSnapshot {
        id: model.id,
        session_id: model.game_session_id,
        user_id: model.user_id,
        nickname: model.nickname,
        avatar_color: model.avatar_color,
        status: model.status.into(),
        score: model.total_score,
        correct_answers: model.correct_answers,
        incorrect_answers: model.incorrect_answers,
        joined_at: model.joined_at.to_rfc3339(),
        left_at: model.left_at.map(|t| t.to_rfc3339()),
    }
}

pub(crate) fn standing(model: game_participants::Model) -> Standing {
    Standing {
        participant_id: model.id,
        nickname: model.nickname,
        avatar_color: model.avatar_color,
        score: model.total_score,
        correct_answers: model.correct_answers,
        incorrect_answers: model.incorrect_answers,
    }
}

pub(crate) fn session_snapshot(
    session: game_sessions::Model,
    players: Vec<game_participants::Model>,
) -> SessionSnapshot {
    let status: SessionStatus = session.status.into();
    let host_user_id = session.host_user_id;

    let players: Vec<PlayerSummary> = players
        .into_iter()
        .map(|p| PlayerSummary {
            id: p.id,
            is_host: p.user_id == Some(host_user_id),
            nickname: p.nickname,
            avatar_color: p.avatar_color,
            score: p.total_score,
            status: p.status.into(),
        })
        .collect();

    SessionSnapshot {
        id: session.id,
        code: session.code,
        title: session.title,
        quiz_id: session.quiz_id,
        host_user_id,
        status,
        current_question_index: session.current_question_index,
        current_question_number: (status == SessionStatus::Live)
            .then_some(session.current_question_index + 1),
        total_questions: session.total_questions,
        max_players: session.max_players,
        time_per_question_seconds: session.time_per_question_seconds,
        points_per_question: session.points_per_question,
        player_view_mode: session.player_view_mode.into(),
        question_started_at: session.question_started_at.map(|t| t.to_rfc3339()),
        started_at: session.started_at.map(|t| t.to_rfc3339()),
        completed_at: session.completed_at.map(|t| t.to_rfc3339()),
        cancelled_at: session.cancelled_at.map(|t| t.to_rfc3339()),
        created_at: session.created_at.to_rfc3339(),
        player_count: players.len() as i32,
        players,
    }
}

/// Active participants of a session in join order.
pub(crate) async fn active_participants<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
) -> Result<Vec<game_participants::Model>, DbErr> {
    GameParticipants::find()
        .filter(game_participants::Column::GameSessionId.eq(session_id))
        .filter(game_participants::Column::Status.eq(ParticipantState::Active))
        .order_by_asc(game_participants::Column::Id)
        .all(conn)
        .await
}

/// Builds the snapshot on whichever connection the caller holds, so it can
/// run inside an open transaction.
pub(crate) async fn load_snapshot<C: ConnectionTrait>(
    conn: &C,
    session: game_sessions::Model,
) -> Result<SessionSnapshot, DbErr> {
    let players = active_participants(conn, session.id).await?;
    Ok(session_snapshot(session, players))
}

pub(crate) fn question_view(
    question: quiz_questions::Model,
    session: &game_sessions::Model,
) -> Result<QuestionView, DbErr> {
    let choices: Vec<String> = serde_json::from_str(&question.choices).map_err(|e| {
        DbErr::Custom(format!(
            "question {} has malformed choices: {}",
            question.id, e
        ))
    })?;

    Ok(QuestionView {
        id: question.id,
        position: question.position,
        question: question.question,
        choices,
        question_started_at: session.question_started_at.map(|t| t.to_rfc3339()),
        time_per_question_seconds: session.time_per_question_seconds,
        player_view_mode: session.player_view_mode.into(),
    })
}
