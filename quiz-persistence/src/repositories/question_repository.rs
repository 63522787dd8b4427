use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter,
};

use crate::entities::{prelude::*, quiz_questions};

/// Read access to the question bank. Authoring lives outside this service;
/// `insert_question` exists for seeding.
#[derive(Clone)]
pub struct QuestionRepository {
    db: DatabaseConnection,
}

impl QuestionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn count_for_quiz(&self, quiz_id: &str) -> Result<u64, DbErr> {
        count_for_quiz(&self.db, quiz_id).await
    }

    pub async fn find_by_position(
        &self,
        quiz_id: &str,
        position: i32,
    ) -> Result<Option<quiz_questions::Model>, DbErr> {
        find_by_position(&self.db, quiz_id, position).await
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<quiz_questions::Model>, DbErr> {
        QuizQuestions::find_by_id(id).one(&self.db).await
    }

    pub async fn insert_question(
        &self,
        quiz_id: &str,
        position: i32,
        question: &str,
        choices: &[String],
        answer: &str,
    ) -> Result<quiz_questions::Model, DbErr> {
        let choices = serde_json::to_string(choices)
            .map_err(|e| DbErr::Custom(format!("failed to encode choices: {}", e)))?;

        let model = quiz_questions::ActiveModel {
            quiz_id: Set(quiz_id.to_string()),
            position: Set(position),
            question: Set(question.to_string()),
            choices: Set(choices),
            answer: Set(answer.to_string()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let inserted = QuizQuestions::insert(model).exec(&self.db).await?;
        QuizQuestions::find_by_id(inserted.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("inserted question".to_string()))
    }
}

pub(crate) async fn count_for_quiz<C: ConnectionTrait>(
    conn: &C,
    quiz_id: &str,
) -> Result<u64, DbErr> {
    QuizQuestions::find()
        .filter(quiz_questions::Column::QuizId.eq(quiz_id))
        .count(conn)
        .await
}

pub(crate) async fn find_by_position<C: ConnectionTrait>(
    conn: &C,
    quiz_id: &str,
    position: i32,
) -> Result<Option<quiz_questions::Model>, DbErr> {
    QuizQuestions::find()
        .filter(quiz_questions::Column::QuizId.eq(quiz_id))
        .filter(quiz_questions::Column::Position.eq(position))
        .one(conn)
        .await
}
