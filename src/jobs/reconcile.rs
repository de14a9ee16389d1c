//! Repair the denormalized campaign totals.
//!
//! `current_amount` and `donor_count` are only moved inside the donation
//! completion transaction, so in a healthy system this finds nothing. It
//! exists to catch rows edited by hand or written by older clients.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{campaign, donation, Campaign, Donation, DonationStatus};
use crate::error::AppResult;

#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct ReconcileReport {
    pub campaigns_checked: u64,
    pub campaigns_corrected: u64,
    /// Ids of the campaigns whose totals were rewritten.
    pub corrected_ids: Vec<Uuid>,
}

#[tracing::instrument(skip(db))]
pub async fn reconcile_totals(db: &DatabaseConnection) -> AppResult<ReconcileReport> {
    let mut report = ReconcileReport::default();
    let campaign_ids: Vec<Uuid> = Campaign::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    for id in campaign_ids {
        report.campaigns_checked += 1;

        // Recount and rewrite under one transaction so a donation completing
        // mid-pass is either fully in the recount or not at all.
        let txn = db.begin().await?;
        let Some(current) = Campaign::find_by_id(id).one(&txn).await? else {
            continue;
        };
        let completed = Donation::find()
            .filter(donation::Column::CampaignId.eq(id))
            .filter(donation::Column::Status.eq(DonationStatus::Completed))
            .all(&txn)
            .await?;
        let raised: i64 = completed.iter().map(|d| d.amount).sum();
        let donors = completed.len() as i64;

        if raised == current.current_amount && donors == current.donor_count {
            txn.commit().await?;
            continue;
        }

        tracing::warn!(
            campaign_id = %id,
            stored_amount = current.current_amount,
            recounted_amount = raised,
            stored_donors = current.donor_count,
            recounted_donors = donors,
            "campaign totals drifted; correcting"
        );
        Campaign::update_many()
            .col_expr(campaign::Column::CurrentAmount, Expr::value(raised))
            .col_expr(campaign::Column::DonorCount, Expr::value(donors))
            .col_expr(campaign::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(campaign::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        report.campaigns_corrected += 1;
        report.corrected_ids.push(id);
    }

    tracing::info!(
        checked = report.campaigns_checked,
        corrected = report.campaigns_corrected,
        "reconciliation finished"
    );
    Ok(report)
}
