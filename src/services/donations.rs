use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{campaigns, notifications, PageQuery};
use crate::auth::Session;
use crate::entities::{campaign, donation, Campaign, Donation, DonationStatus, Moderation};
use crate::error::{AppError, AppResult};
use crate::ledger::{self, CampaignProgress, CampaignStatus};
use crate::payments::{PaymentGateway, PaymentOutcome};
use crate::validation;

const MESSAGE_MAX: usize = 1_000;

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewDonation {
    /// Minor currency units.
    pub amount: i64,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub message: Option<String>,
}

/// Donation as its donor or an admin sees it.
#[derive(Debug, Serialize, ToSchema)]
pub struct DonationView {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub amount: i64,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    pub is_anonymous: bool,
    pub message: Option<String>,
    pub status: DonationStatus,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<donation::Model> for DonationView {
    fn from(d: donation::Model) -> Self {
        DonationView {
            id: d.id,
            campaign_id: d.campaign_id,
            amount: d.amount,
            donor_name: d.donor_name,
            donor_email: d.donor_email,
            is_anonymous: d.is_anonymous,
            message: d.message,
            status: d.status,
            payment_reference: d.payment_reference,
            created_at: d.created_at,
        }
    }
}

/// Donation on a public campaign page; no contact details.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicDonation {
    pub id: Uuid,
    pub amount: i64,
    /// "Anonymous" when the donor asked not to be named.
    pub donor_name: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<donation::Model> for PublicDonation {
    fn from(d: donation::Model) -> Self {
        let donor_name = match (d.is_anonymous, d.donor_name) {
            (false, Some(name)) => name,
            _ => "Anonymous".to_string(),
        };
        PublicDonation {
            id: d.id,
            amount: d.amount,
            donor_name,
            message: d.message,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DonationReceipt {
    pub donation: DonationView,
    /// Campaign progress after this donation was counted.
    pub campaign: CampaignProgress,
}

/// Flip a pending donation to completed and add it to the campaign totals.
///
/// Both writes share one transaction and the status change is conditional on
/// the row still being pending, so a donation is counted at most once no
/// matter how often this runs. Returns whether this call did the counting.
#[tracing::instrument(skip(db))]
pub async fn complete_donation(
    db: &DatabaseConnection,
    donation_id: Uuid,
    payment_reference: &str,
) -> AppResult<bool> {
    let txn = db.begin().await?;

    let pending = Donation::find_by_id(donation_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("donation {donation_id}")))?;

    let now = Utc::now();
    let flipped = Donation::update_many()
        .col_expr(donation::Column::Status, Expr::value(DonationStatus::Completed.to_value()))
        .col_expr(donation::Column::PaymentReference, Expr::value(payment_reference.to_string()))
        .col_expr(donation::Column::UpdatedAt, Expr::value(now))
        .filter(donation::Column::Id.eq(donation_id))
        .filter(donation::Column::Status.eq(DonationStatus::Pending))
        .exec(&txn)
        .await?;
    if flipped.rows_affected == 0 {
        txn.rollback().await?;
        tracing::debug!(%donation_id, "donation already settled, nothing to count");
        return Ok(false);
    }

    Campaign::update_many()
        .col_expr(
            campaign::Column::CurrentAmount,
            Expr::col(campaign::Column::CurrentAmount).add(pending.amount),
        )
        .col_expr(
            campaign::Column::DonorCount,
            Expr::col(campaign::Column::DonorCount).add(1i64),
        )
        .col_expr(campaign::Column::UpdatedAt, Expr::value(now))
        .filter(campaign::Column::Id.eq(pending.campaign_id))
        .exec(&txn)
        .await?;

    if let Some(target) = Campaign::find_by_id(pending.campaign_id).one(&txn).await? {
        notifications::notify(
            &txn,
            target.creator_id,
            notifications::DONATION_RECEIVED,
            format!("New donation of {} to \"{}\".", pending.amount, target.title),
        )
        .await?;
    }

    txn.commit().await?;
    tracing::info!(%donation_id, amount = pending.amount, "donation completed");
    Ok(true)
}

async fn mark_failed(db: &DatabaseConnection, donation_id: Uuid) -> AppResult<()> {
    Donation::update_many()
        .col_expr(donation::Column::Status, Expr::value(DonationStatus::Failed.to_value()))
        .col_expr(donation::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(donation::Column::Id.eq(donation_id))
        .filter(donation::Column::Status.eq(DonationStatus::Pending))
        .exec(db)
        .await?;
    Ok(())
}

/// Leaves the charge reference on a still-pending row so the payment can be matched later.
async fn keep_reference(db: &DatabaseConnection, donation_id: Uuid, reference: &str) {
    let kept = Donation::update_many()
        .col_expr(donation::Column::PaymentReference, Expr::value(reference.to_string()))
        .col_expr(donation::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(donation::Column::Id.eq(donation_id))
        .filter(donation::Column::Status.eq(DonationStatus::Pending))
        .exec(db)
        .await;
    if let Err(err) = kept {
        tracing::error!(
            %donation_id,
            payment_reference = reference,
            error = %err,
            "could not store payment reference"
        );
    }
}

#[tracing::instrument(skip(db, payments, input, donor), fields(amount = input.amount))]
pub async fn donate(
    db: &DatabaseConnection,
    payments: &dyn PaymentGateway,
    donor: Option<&Session>,
    campaign_id: Uuid,
    input: NewDonation,
    now: DateTime<Utc>,
) -> AppResult<DonationReceipt> {
    let target = campaigns::load_visible(db, campaign_id, donor).await?;
    if target.moderation != Moderation::Approved {
        return Err(AppError::Validation("this campaign is not accepting donations".into()));
    }
    let status =
        ledger::campaign_status(target.end_date, target.current_amount, target.goal_amount, now);
    if status == CampaignStatus::Completed {
        return Err(AppError::Validation("this campaign has ended".into()));
    }

    let amount = validation::positive_amount("amount", input.amount)?;
    let message = validation::optional_text("message", input.message.as_deref(), MESSAGE_MAX)?;
    let (donor_name, donor_email) = if input.is_anonymous {
        (None, None)
    } else {
        let name = validation::optional_text("donor_name", input.donor_name.as_deref(), 120)?;
        let email = match input.donor_email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(raw) => Some(validation::email(raw)?),
            None => donor.map(|s| s.email.clone()),
        };
        (name, email)
    };

    let created = donation::ActiveModel {
        id: Set(Uuid::new_v4()),
        campaign_id: Set(campaign_id),
        donor_id: Set(donor.map(|s| s.user_id)),
        amount: Set(amount),
        donor_name: Set(donor_name),
        donor_email: Set(donor_email),
        is_anonymous: Set(input.is_anonymous),
        message: Set(message),
        status: Set(DonationStatus::Pending),
        payment_reference: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    let outcome = match payments.charge(created.id, amount).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(donation_id = %created.id, error = %err, "payment step failed");
            mark_failed(db, created.id).await?;
            return Err(err);
        }
    };

    match outcome {
        PaymentOutcome::Approved { reference } => {
            if let Err(err) = complete_donation(db, created.id, &reference).await {
                tracing::error!(
                    donation_id = %created.id,
                    payment_reference = %reference,
                    error = %err,
                    "charge approved but donation not recorded"
                );
                keep_reference(db, created.id, &reference).await;
                return Err(err);
            }
        }
        PaymentOutcome::Declined { reason } => {
            mark_failed(db, created.id).await?;
            return Err(AppError::PaymentDeclined(reason));
        }
    }

    let settled = Donation::find_by_id(created.id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("donation {}", created.id)))?;
    let refreshed = campaigns::load(db, campaign_id).await?;
    Ok(DonationReceipt {
        donation: settled.into(),
        campaign: CampaignProgress::derive(&refreshed, now),
    })
}

pub async fn list_for_campaign(
    db: &DatabaseConnection,
    campaign_id: Uuid,
    viewer: Option<&Session>,
    page: &PageQuery,
) -> AppResult<Vec<PublicDonation>> {
    campaigns::load_visible(db, campaign_id, viewer).await?;
    let rows = Donation::find()
        .filter(donation::Column::CampaignId.eq(campaign_id))
        .filter(donation::Column::Status.eq(DonationStatus::Completed))
        .order_by_desc(donation::Column::CreatedAt)
        .limit(page.limit())
        .offset(page.offset())
        .all(db)
        .await?;
    Ok(rows.into_iter().map(PublicDonation::from).collect())
}

pub async fn list_for_donor(
    db: &DatabaseConnection,
    session: &Session,
    page: &PageQuery,
) -> AppResult<Vec<DonationView>> {
    let rows = Donation::find()
        .filter(donation::Column::DonorId.eq(session.user_id))
        .order_by_desc(donation::Column::CreatedAt)
        .limit(page.limit())
        .offset(page.offset())
        .all(db)
        .await?;
    Ok(rows.into_iter().map(DonationView::from).collect())
}

#[derive(Debug, Serialize)]
struct DonationCsvRow<'a> {
    donation_id: Uuid,
    campaign_id: Uuid,
    campaign_title: &'a str,
    amount: i64,
    status: &'a str,
    donor_name: &'a str,
    donor_email: &'a str,
    is_anonymous: bool,
    payment_reference: &'a str,
    created_at: String,
}

/// Every donation as CSV, oldest first (admin).
pub async fn export_csv(db: &DatabaseConnection, session: &Session) -> AppResult<String> {
    session.require_admin()?;
    let rows = Donation::find()
        .find_also_related(Campaign)
        .order_by_asc(donation::Column::CreatedAt)
        .all(db)
        .await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for (d, c) in &rows {
        let status = d.status.to_value();
        writer.serialize(DonationCsvRow {
            donation_id: d.id,
            campaign_id: d.campaign_id,
            campaign_title: c.as_ref().map(|c| c.title.as_str()).unwrap_or(""),
            amount: d.amount,
            status: &status,
            donor_name: d.donor_name.as_deref().unwrap_or(""),
            donor_email: d.donor_email.as_deref().unwrap_or(""),
            is_anonymous: d.is_anonymous,
            payment_reference: d.payment_reference.as_deref().unwrap_or(""),
            created_at: d.created_at.to_rfc3339(),
        })?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}
