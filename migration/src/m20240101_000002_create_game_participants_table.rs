use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GameParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameParticipants::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GameParticipants::GameSessionId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GameParticipants::UserId).integer().null())
                    .col(
                        ColumnDef::new(GameParticipants::GuestTokenHash)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(GameParticipants::Nickname).string().not_null())
                    .col(ColumnDef::new(GameParticipants::AvatarColor).string().null())
                    .col(
                        ColumnDef::new(GameParticipants::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(GameParticipants::TotalScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameParticipants::CorrectAnswers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameParticipants::IncorrectAnswers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameParticipants::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameParticipants::LeftAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GameParticipants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GameParticipants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_participants_game_session")
                            .from(GameParticipants::Table, GameParticipants::GameSessionId)
                            .to(GameSessions::Table, GameSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_game_participants_session_status")
                    .table(GameParticipants::Table)
                    .col(GameParticipants::GameSessionId)
                    .col(GameParticipants::Status)
                    .to_owned(),
            )
            .await?;

        // Uniqueness only applies to active rows, so kicked or departed
        // players free their nickname. Partial indexes work on both SQLite
        // and Postgres.
        let db = manager.get_connection();
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_game_participants_active_nickname \
             ON game_participants (game_session_id, nickname) WHERE status = 'active'",
        )
        .await?;
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_game_participants_active_user \
             ON game_participants (game_session_id, user_id) \
             WHERE status = 'active' AND user_id IS NOT NULL",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameParticipants::Table).to_owned())
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
    GameSessionId,
    UserId,
    GuestTokenHash,
    Nickname,
    AvatarColor,
    Status,
    TotalScore,
    CorrectAnswers,
    IncorrectAnswers,
    JoinedAt,
    LeftAt,
    CreatedAt,
    UpdatedAt,
}
