use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GameSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::Code)
                            .string_len(6)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(GameSessions::HostUserId).integer().not_null())
                    .col(ColumnDef::new(GameSessions::QuizId).string().not_null())
                    .col(ColumnDef::new(GameSessions::Title).string().null())
                    .col(
                        ColumnDef::new(GameSessions::Status)
                            .string_len(16)
                            .not_null()
                            .default("lobby"),
                    )
                    .col(
                        ColumnDef::new(GameSessions::MaxPlayers)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(GameSessions::TimePerQuestionSeconds)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(GameSessions::PointsPerQuestion)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(GameSessions::TotalQuestions)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameSessions::PlayerViewMode)
                            .string_len(16)
                            .not_null()
                            .default("full"),
                    )
                    .col(
                        ColumnDef::new(GameSessions::CurrentQuestionIndex)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameSessions::QuestionStartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::CancelledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GameSessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Hosts list their own sessions
        manager
            .create_index(
                Index::create()
                    .name("idx_game_sessions_host_user_id")
                    .table(GameSessions::Table)
                    .col(GameSessions::HostUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_game_sessions_status")
                    .table(GameSessions::Table)
                    .col(GameSessions::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameSessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GameSessions {
    Table,
    Id,
    Code,
    HostUserId,
    QuizId,
    Title,
    Status,
    MaxPlayers,
    TimePerQuestionSeconds,
    PointsPerQuestion,
    TotalQuestions,
    PlayerViewMode,
    CurrentQuestionIndex,
    QuestionStartedAt,
    StartedAt,
    CompletedAt,
    CancelledAt,
    CreatedAt,
    UpdatedAt,
}
