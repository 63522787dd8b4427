use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "game_responses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub game_session_id: i32,
    pub game_participant_id: i32,
    pub question_id: i32,
    pub answer: Option<String>,
    pub is_correct: bool,
    pub points_earned: i32,
    pub time_used_seconds: f64,
    pub answered_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
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
    #[sea_orm(
        belongs_to = "super::game_participants::Entity",
        from = "Column::GameParticipantId",
        to = "super::game_participants::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    GameParticipants,
    #[sea_orm(
        belongs_to = "super::quiz_questions::Entity",
        from = "Column::QuestionId",
        to = "super::quiz_questions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    QuizQuestions,
}

impl Related<super::game_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameSessions.def()
    }
}

impl Related<super::game_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameParticipants.def()
    }
}

impl Related<super::quiz_questions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuizQuestions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
