use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Library tables first, associations depend on them
        self.create_channels_table(manager).await?;
        self.create_shows_table(manager).await?;
        self.create_episodes_table(manager).await?;
        self.create_movies_table(manager).await?;
        self.create_channel_shows_table(manager).await?;
        self.create_channel_movies_table(manager).await?;
        self.create_programs_table(manager).await?;
        self.create_settings_table(manager).await?;

        self.create_indexes(manager).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Programs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChannelMovies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChannelShows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Movies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Episodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Shows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Channels::Table).to_owned())
            .await?;

        Ok(())
    }
}

impl Migration {
    async fn create_channels_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Channels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Channels::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Channels::Name).string().not_null())
                    .col(ColumnDef::new(Channels::Number).integer())
                    .col(
                        ColumnDef::new(Channels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_shows_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Shows::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Shows::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Shows::Title).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn create_episodes_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Episodes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Episodes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Episodes::ShowId).uuid().not_null())
                    .col(ColumnDef::new(Episodes::SeasonNumber).integer().not_null())
                    .col(ColumnDef::new(Episodes::EpisodeNumber).integer().not_null())
                    .col(ColumnDef::new(Episodes::Title).string())
                    .col(ColumnDef::new(Episodes::DurationMs).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_episodes_show_id")
                            .from(Episodes::Table, Episodes::ShowId)
                            .to(Shows::Table, Shows::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_movies_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Movies::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Movies::Title).string().not_null())
                    .col(ColumnDef::new(Movies::DurationMs).big_integer())
                    .to_owned(),
            )
            .await
    }

    async fn create_channel_shows_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChannelShows::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChannelShows::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ChannelShows::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(ChannelShows::ShowId).uuid().not_null())
                    .col(
                        ColumnDef::new(ChannelShows::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_channel_shows_channel_id")
                            .from(ChannelShows::Table, ChannelShows::ChannelId)
                            .to(Channels::Table, Channels::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_channel_shows_show_id")
                            .from(ChannelShows::Table, ChannelShows::ShowId)
                            .to(Shows::Table, Shows::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_channel_movies_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChannelMovies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChannelMovies::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ChannelMovies::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(ChannelMovies::MovieId).uuid().not_null())
                    .col(
                        ColumnDef::new(ChannelMovies::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_channel_movies_channel_id")
                            .from(ChannelMovies::Table, ChannelMovies::ChannelId)
                            .to(Channels::Table, Channels::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_channel_movies_movie_id")
                            .from(ChannelMovies::Table, ChannelMovies::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    // Programs reference channels loosely: the lineup may come from an
    // external provider that does not populate the channels table.
    async fn create_programs_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Programs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Programs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Programs::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(Programs::StartTimeMs).big_integer().not_null())
                    .col(ColumnDef::new(Programs::DurationMs).big_integer().not_null())
                    .col(ColumnDef::new(Programs::ContentKind).string().not_null())
                    .col(ColumnDef::new(Programs::ContentId).uuid().not_null())
                    .col(
                        ColumnDef::new(Programs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_settings_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Settings::Key).string().not_null().primary_key())
                    .col(ColumnDef::new(Settings::Value).string().not_null())
                    .col(
                        ColumnDef::new(Settings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_indexes(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_programs_channel_start")
                    .table(Programs::Table)
                    .col(Programs::ChannelId)
                    .col(Programs::StartTimeMs)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_show_id")
                    .table(Episodes::Table)
                    .col(Episodes::ShowId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_channel_shows_channel_id")
                    .table(ChannelShows::Table)
                    .col(ChannelShows::ChannelId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_channel_movies_channel_id")
                    .table(ChannelMovies::Table)
                    .col(ChannelMovies::ChannelId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Channels {
    Table,
    Id,
    Name,
    Number,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Shows {
    Table,
    Id,
    Title,
}

#[derive(DeriveIden)]
enum Episodes {
    Table,
    Id,
    ShowId,
    SeasonNumber,
    EpisodeNumber,
    Title,
    DurationMs,
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    DurationMs,
}

#[derive(DeriveIden)]
enum ChannelShows {
    Table,
    Id,
    ChannelId,
    ShowId,
    SortOrder,
}

#[derive(DeriveIden)]
enum ChannelMovies {
    Table,
    Id,
    ChannelId,
    MovieId,
    SortOrder,
}

#[derive(DeriveIden)]
enum Programs {
    Table,
    Id,
    ChannelId,
    StartTimeMs,
    DurationMs,
    ContentKind,
    ContentId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Key,
    Value,
    UpdatedAt,
}
