use sea_orm_migration::prelude::*;

use crate::m20250601_000001_create_accounts::Profiles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Campaigns::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Campaigns::Title).string().not_null())
                    .col(ColumnDef::new(Campaigns::Description).text().not_null())
                    .col(ColumnDef::new(Campaigns::Category).string().not_null())
                    .col(ColumnDef::new(Campaigns::GoalAmount).big_integer().not_null())
                    // Running total of completed donations, only moved inside the
                    // donation transaction
                    .col(
                        ColumnDef::new(Campaigns::CurrentAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::DonorCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Campaigns::CreatorId).uuid().not_null())
                    .col(ColumnDef::new(Campaigns::ImageUrl).string().null())
                    .col(
                        ColumnDef::new(Campaigns::Moderation)
                            .string_len(16)
                            .not_null()
                            .default("approved"),
                    )
                    .col(
                        ColumnDef::new(Campaigns::EndDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Campaigns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaigns_creator")
                            .from(Campaigns::Table, Campaigns::CreatorId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_campaigns_creator")
                    .table(Campaigns::Table)
                    .col(Campaigns::CreatorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_campaigns_category")
                    .table(Campaigns::Table)
                    .col(Campaigns::Category)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Campaigns {
    Table,
    Id,
    Title,
    Description,
    Category,
    GoalAmount,
    CurrentAmount,
    DonorCount,
    CreatorId,
    ImageUrl,
    Moderation,
    EndDate,
    CreatedAt,
    UpdatedAt,
}
