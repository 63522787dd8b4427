use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::ParticipantState;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "game_participants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub game_session_id: i32,
    pub user_id: Option<i32>,
    pub guest_token_hash: Option<String>,
    pub nickname: String,
    pub avatar_color: Option<String>,
    pub status: ParticipantState,
    pub total_score: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub joined_at: DateTimeUtc,
    pub left_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::game_sessions::Entity",
        from = "Column::GameSessionId",
        to = "super::game_sessions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    GameSessions,
    #[sea_orm(has_many = "super::game_responses::Entity")]
    GameResponses,
}

impl Related<super::game_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameSessions.def()
    }
}

impl Related<super::game_responses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameResponses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
