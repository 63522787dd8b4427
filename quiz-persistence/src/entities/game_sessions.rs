use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::{GameStatus, ViewMode};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "game_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub host_user_id: i32,
    pub quiz_id: String,
    pub title: Option<String>,
    pub status: GameStatus,
    pub max_players: i32,
    pub time_per_question_seconds: i32,
    pub points_per_question: i32,
    pub total_questions: i32,
    pub player_view_mode: ViewMode,
    pub current_question_index: i32,
    pub question_started_at: Option<DateTimeUtc>,
    pub started_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub cancelled_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::game_participants::Entity")]
    GameParticipants,
    #[sea_orm(has_many = "super::game_responses::Entity")]
    GameResponses,
}

impl Related<super::game_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameParticipants.def()
    }
}

impl Related<super::game_responses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameResponses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
