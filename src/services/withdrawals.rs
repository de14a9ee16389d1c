use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{campaigns, notifications, PageQuery};
use crate::auth::Session;
use crate::entities::{donation, withdrawal, Campaign, Donation, Withdrawal, WithdrawalStatus};
use crate::error::{AppError, AppResult};
use crate::ledger::{self, FundingLedger, LedgerError};
use crate::validation;

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewWithdrawal {
    /// Minor currency units.
    pub amount: i64,
    /// e.g. `bank_transfer`, `mobile_money`.
    pub payment_method: String,
    pub payment_details: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawalView {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub requested_by: Uuid,
    pub amount: i64,
    pub payment_method: String,
    pub payment_details: String,
    pub reason: Option<String>,
    pub status: WithdrawalStatus,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<withdrawal::Model> for WithdrawalView {
    fn from(w: withdrawal::Model) -> Self {
        WithdrawalView {
            id: w.id,
            campaign_id: w.campaign_id,
            requested_by: w.requested_by,
            amount: w.amount,
            payment_method: w.payment_method,
            payment_details: w.payment_details,
            reason: w.reason,
            status: w.status,
            review_note: w.review_note,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceView {
    pub campaign_id: Uuid,
    /// Denormalized running total kept on the campaign row.
    pub current_amount: i64,
    pub ledger: FundingLedger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Complete,
    Reject,
}

/// Fold a campaign's donation and withdrawal rows into ledger totals.
pub async fn ledger_for<C: ConnectionTrait>(
    conn: &C,
    campaign_id: Uuid,
) -> AppResult<FundingLedger> {
    let donations = Donation::find()
        .filter(donation::Column::CampaignId.eq(campaign_id))
        .all(conn)
        .await?;
    let withdrawals = Withdrawal::find()
        .filter(withdrawal::Column::CampaignId.eq(campaign_id))
        .all(conn)
        .await?;
    Ok(FundingLedger::from_records(
        donations.iter().map(|d| (d.status, d.amount)),
        withdrawals.iter().map(|w| (w.status, w.amount)),
    ))
}

pub async fn balance(
    db: &DatabaseConnection,
    session: &Session,
    campaign_id: Uuid,
) -> AppResult<BalanceView> {
    let target = campaigns::load(db, campaign_id).await?;
    session.require_owner_or_admin(target.creator_id)?;
    Ok(BalanceView {
        campaign_id,
        current_amount: target.current_amount,
        ledger: ledger_for(db, campaign_id).await?,
    })
}

pub async fn list_for_campaign(
    db: &DatabaseConnection,
    session: &Session,
    campaign_id: Uuid,
) -> AppResult<Vec<WithdrawalView>> {
    let target = campaigns::load(db, campaign_id).await?;
    session.require_owner_or_admin(target.creator_id)?;
    let rows = Withdrawal::find()
        .filter(withdrawal::Column::CampaignId.eq(campaign_id))
        .order_by_desc(withdrawal::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(WithdrawalView::from).collect())
}

/// Record a payout request if the campaign can cover it.
///
/// The campaign row is locked for the duration of the transaction (`FOR
/// UPDATE` on PostgreSQL), so two concurrent requests cannot both pass the
/// balance check against the same funds.
#[tracing::instrument(skip(db, input), fields(user_id = %session.user_id, amount = input.amount))]
pub async fn request(
    db: &DatabaseConnection,
    session: &Session,
    campaign_id: Uuid,
    input: NewWithdrawal,
    now: DateTime<Utc>,
) -> AppResult<WithdrawalView> {
    let payment_method = validation::text("payment_method", &input.payment_method, 40)?;
    let payment_details = validation::text("payment_details", &input.payment_details, 500)?;
    let reason = validation::optional_text("reason", input.reason.as_deref(), 1_000)?;

    let txn = db.begin().await?;
    let target = Campaign::find_by_id(campaign_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campaign {campaign_id}")))?;
    if target.creator_id != session.user_id {
        return Err(AppError::Forbidden("only the campaign owner can request withdrawals".into()));
    }

    let funds = ledger_for(&txn, campaign_id).await?;
    ledger::check_withdrawal(input.amount, &funds).map_err(|e| match e {
        LedgerError::NonPositiveAmount => {
            AppError::Validation("amount must be greater than zero".into())
        }
        LedgerError::ExceedsAvailable { .. } => {
            tracing::warn!(available = funds.available, "withdrawal above available balance");
            AppError::Validation(format!("withdrawal {e}"))
        }
    })?;

    let created = withdrawal::ActiveModel {
        id: Set(Uuid::new_v4()),
        campaign_id: Set(campaign_id),
        requested_by: Set(session.user_id),
        amount: Set(input.amount),
        payment_method: Set(payment_method),
        payment_details: Set(payment_details),
        reason: Set(reason),
        status: Set(WithdrawalStatus::Pending),
        review_note: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(withdrawal_id = %created.id, "withdrawal requested");
    Ok(created.into())
}

pub async fn list_by_status(
    db: &DatabaseConnection,
    session: &Session,
    status: Option<WithdrawalStatus>,
    page: &PageQuery,
) -> AppResult<Vec<WithdrawalView>> {
    session.require_admin()?;
    let mut select = Withdrawal::find();
    if let Some(status) = status {
        select = select.filter(withdrawal::Column::Status.eq(status));
    }
    let rows = select
        .order_by_asc(withdrawal::Column::CreatedAt)
        .limit(page.limit())
        .offset(page.offset())
        .all(db)
        .await?;
    Ok(rows.into_iter().map(WithdrawalView::from).collect())
}

/// Settle a pending withdrawal. Completed and rejected requests are final.
#[tracing::instrument(skip(db, note), fields(admin_id = %session.user_id))]
pub async fn review(
    db: &DatabaseConnection,
    session: &Session,
    withdrawal_id: Uuid,
    decision: ReviewDecision,
    note: Option<String>,
) -> AppResult<WithdrawalView> {
    session.require_admin()?;
    let note = validation::optional_text("note", note.as_deref(), 1_000)?;
    let next = match decision {
        ReviewDecision::Complete => WithdrawalStatus::Completed,
        ReviewDecision::Reject => WithdrawalStatus::Rejected,
    };

    let txn = db.begin().await?;
    let settled = Withdrawal::update_many()
        .col_expr(withdrawal::Column::Status, Expr::value(next.to_value()))
        .col_expr(withdrawal::Column::ReviewNote, Expr::value(note.clone()))
        .col_expr(withdrawal::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(withdrawal::Column::Id.eq(withdrawal_id))
        .filter(withdrawal::Column::Status.eq(WithdrawalStatus::Pending))
        .exec(&txn)
        .await?;

    let current = Withdrawal::find_by_id(withdrawal_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {withdrawal_id}")))?;
    if settled.rows_affected == 0 {
        return Err(AppError::Conflict(format!(
            "withdrawal {withdrawal_id} is already {}",
            current.status.to_value()
        )));
    }

    let (kind, message) = match next {
        WithdrawalStatus::Completed => (
            notifications::WITHDRAWAL_COMPLETED,
            format!("Your withdrawal of {} has been paid out.", current.amount),
        ),
        _ => (
            notifications::WITHDRAWAL_REJECTED,
            match &note {
                Some(n) => format!("Your withdrawal of {} was rejected: {n}", current.amount),
                None => format!("Your withdrawal of {} was rejected.", current.amount),
            },
        ),
    };
    notifications::notify(&txn, current.requested_by, kind, message).await?;
    txn.commit().await?;

    tracing::info!(%withdrawal_id, status = %next.to_value(), "withdrawal reviewed");
    Ok(current.into())
}
