use sea_orm::entity::prelude::*;

/// Read-only view of the question bank. `choices` holds a JSON array of
/// strings; `answer` is the canonical answer and never leaves the server.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "quiz_questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub quiz_id: String,
    pub position: i32,
    #[sea_orm(column_type = "Text")]
    pub question: String,
    #[sea_orm(column_type = "Text")]
    pub choices: String,
    #[sea_orm(column_type = "Text")]
    pub answer: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::game_responses::Entity")]
    GameResponses,
}

impl Related<super::game_responses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameResponses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
