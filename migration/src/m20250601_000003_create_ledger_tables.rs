use sea_orm_migration::prelude::*;

use crate::m20250601_000002_create_campaigns::Campaigns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Donations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Donations::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Donations::CampaignId).uuid().not_null())
                    .col(ColumnDef::new(Donations::DonorId).uuid().null())
                    .col(ColumnDef::new(Donations::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Donations::DonorName).string().null())
                    .col(ColumnDef::new(Donations::DonorEmail).string().null())
                    .col(
                        ColumnDef::new(Donations::IsAnonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Donations::Message).text().null())
                    .col(
                        ColumnDef::new(Donations::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Donations::PaymentReference).string().null())
                    .col(
                        ColumnDef::new(Donations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Donations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donations_campaign")
                            .from(Donations::Table, Donations::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_donations_campaign_status")
                    .table(Donations::Table)
                    .col(Donations::CampaignId)
                    .col(Donations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Withdrawals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Withdrawals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Withdrawals::CampaignId).uuid().not_null())
                    .col(ColumnDef::new(Withdrawals::RequestedBy).uuid().not_null())
                    .col(ColumnDef::new(Withdrawals::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Withdrawals::PaymentMethod).string().not_null())
                    .col(ColumnDef::new(Withdrawals::PaymentDetails).text().not_null())
                    .col(ColumnDef::new(Withdrawals::Reason).text().null())
                    .col(
                        ColumnDef::new(Withdrawals::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Withdrawals::ReviewNote).text().null())
                    .col(
                        ColumnDef::new(Withdrawals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Withdrawals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdrawals_campaign")
                            .from(Withdrawals::Table, Withdrawals::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_withdrawals_campaign_status")
                    .table(Withdrawals::Table)
                    .col(Withdrawals::CampaignId)
                    .col(Withdrawals::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Withdrawals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Donations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Donations {
    Table,
    Id,
    CampaignId,
    DonorId,
    Amount,
    DonorName,
    DonorEmail,
    IsAnonymous,
    Message,
    Status,
    PaymentReference,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Withdrawals {
    Table,
    Id,
    CampaignId,
    RequestedBy,
    Amount,
    PaymentMethod,
    PaymentDetails,
    Reason,
    Status,
    ReviewNote,
    CreatedAt,
    UpdatedAt,
}
