use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GameResponses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameResponses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GameResponses::GameSessionId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameResponses::GameParticipantId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GameResponses::QuestionId).integer().not_null())
                    .col(ColumnDef::new(GameResponses::Answer).text().null())
                    .col(ColumnDef::new(GameResponses::IsCorrect).boolean().not_null())
                    .col(
                        ColumnDef::new(GameResponses::PointsEarned)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameResponses::TimeUsedSeconds)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(GameResponses::AnsweredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameResponses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_responses_game_session")
                            .from(GameResponses::Table, GameResponses::GameSessionId)
                            .to(GameSessions::Table, GameSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_responses_game_participant")
                            .from(GameResponses::Table, GameResponses::GameParticipantId)
                            .to(GameParticipants::Table, GameParticipants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_responses_question")
                            .from(GameResponses::Table, GameResponses::QuestionId)
                            .to(QuizQuestions::Table, QuizQuestions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Hard backstop against double scoring
        manager
            .create_index(
                Index::create()
                    .name("ux_game_responses_session_participant_question")
                    .table(GameResponses::Table)
                    .col(GameResponses::GameSessionId)
                    .col(GameResponses::GameParticipantId)
                    .col(GameResponses::QuestionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameResponses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GameSessions {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum GameParticipants {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum QuizQuestions {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum GameResponses {
    Table,
    Id,
    GameSessionId,
    GameParticipantId,
    QuestionId,
    Answer,
    IsCorrect,
    PointsEarned,
    TimeUsedSeconds,
    AnsweredAt,
    CreatedAt,
}
