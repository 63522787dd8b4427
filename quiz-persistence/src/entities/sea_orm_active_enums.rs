use quiz_types::{ParticipantStatus, PlayerViewMode, SessionStatus};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum GameStatus {
    #[sea_orm(string_value = "lobby")]
    Lobby,
    #[sea_orm(string_value = "live")]
    Live,
    #[sea_orm(string_value = "ended")]
    Ended,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ParticipantState {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "left")]
    Left,
    #[sea_orm(string_value = "kicked")]
    Kicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ViewMode {
    #[sea_orm(string_value = "full")]
    Full,
    #[sea_orm(string_value = "options")]
    Options,
    #[sea_orm(string_value = "answers")]
    Answers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum JobKind {
    #[sea_orm(string_value = "advance_next_question")]
    AdvanceNextQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum JobStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl From<GameStatus> for SessionStatus {
    fn from(status: GameStatus) -> Self {
        match status {
            GameStatus::Lobby => SessionStatus::Lobby,
            GameStatus::Live => SessionStatus::Live,
            GameStatus::Ended => SessionStatus::Ended,
            GameStatus::Cancelled => SessionStatus::Cancelled,
        }
    }
}

impl From<ParticipantState> for ParticipantStatus {
    fn from(state: ParticipantState) -> Self {
        match state {
            ParticipantState::Active => ParticipantStatus::Active,
            ParticipantState::Left => ParticipantStatus::Left,
            ParticipantState::Kicked => ParticipantStatus::Kicked,
        }
    }
}

impl From<ViewMode> for PlayerViewMode {
    fn from(mode: ViewMode) -> Self {
        match mode {
            ViewMode::Full => PlayerViewMode::Full,
            ViewMode::Options => PlayerViewMode::Options,
            ViewMode::Answers => PlayerViewMode::Answers,
        }
    }
}

impl From<PlayerViewMode> for ViewMode {
    fn from(mode: PlayerViewMode) -> Self {
        match mode {
            PlayerViewMode::Full => ViewMode::Full,
            PlayerViewMode::Options => ViewMode::Options,
            PlayerViewMode::Answers => ViewMode::Answers,
        }
    }
}
