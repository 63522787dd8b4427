use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QuizQuestions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuizQuestions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuizQuestions::QuizId).string().not_null())
                    .col(ColumnDef::new(QuizQuestions::Position).integer().not_null())
                    .col(ColumnDef::new(QuizQuestions::Question).text().not_null())
                    .col(
                        ColumnDef::new(QuizQuestions::Choices)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(QuizQuestions::Answer).text().not_null())
                    .col(
                        ColumnDef::new(QuizQuestions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_quiz_questions_quiz_position")
                    .table(QuizQuestions::Table)
                    .col(QuizQuestions::QuizId)
                    .col(QuizQuestions::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuizQuestions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QuizQuestions {
    Table,
    Id,
    QuizId,
    Position,
    Question,
    Choices,
    Answer,
    CreatedAt,
}
