//! Campaign funding arithmetic.
//!
//! Every derived number the API shows about a campaign (percent funded, days
//! left, status, available balance) comes from this module so that listing,
//! detail, dashboard and withdrawal pages can never disagree.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::entities::{campaign, DonationStatus, WithdrawalStatus};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Funded,
    Completed,
}

impl CampaignStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "funded" => Some(Self::Funded),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// `min(100, round(raised / goal * 100))`. A non-positive goal reports 0.
pub fn percent_funded(raised: i64, goal: i64) -> u8 {
    if goal <= 0 || raised <= 0 {
        return 0;
    }
    let raised = raised as i128;
    let goal = goal as i128;
    // round-half-up in integer space
    let percent = (raised * 200 + goal) / (goal * 2);
    percent.min(100) as u8
}

/// Whole days remaining until `end_date`, rounded up, never negative.
pub fn days_left(end_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = (end_date - now).num_milliseconds();
    if remaining <= 0 {
        return 0;
    }
    (remaining + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

pub fn campaign_status(
    end_date: DateTime<Utc>,
    raised: i64,
    goal: i64,
    now: DateTime<Utc>,
) -> CampaignStatus {
    if now > end_date {
        CampaignStatus::Completed
    } else if raised >= goal {
        CampaignStatus::Funded
    } else {
        CampaignStatus::Active
    }
}

/// `max(0, completed_donations - completed_withdrawals - pending_withdrawals)`.
pub fn available_balance(
    completed_donations: i64,
    completed_withdrawals: i64,
    pending_withdrawals: i64,
) -> i64 {
    completed_donations
        .saturating_sub(completed_withdrawals)
        .saturating_sub(pending_withdrawals)
        .max(0)
}

/// Totals folded from a campaign's donation and withdrawal records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct FundingLedger {
    pub completed_donations: i64,
    pub pending_donations: i64,
    pub completed_donation_count: i64,
    pub completed_withdrawals: i64,
    pub pending_withdrawals: i64,
    pub available: i64,
}

impl FundingLedger {
    pub fn from_records<D, W>(donations: D, withdrawals: W) -> Self
    where
        D: IntoIterator<Item = (DonationStatus, i64)>,
        W: IntoIterator<Item = (WithdrawalStatus, i64)>,
    {
        let mut ledger = FundingLedger::default();
        for (status, amount) in donations {
            match status {
                DonationStatus::Completed => {
                    ledger.completed_donations = ledger.completed_donations.saturating_add(amount);
                    ledger.completed_donation_count += 1;
                }
                DonationStatus::Pending => {
                    ledger.pending_donations = ledger.pending_donations.saturating_add(amount);
                }
                DonationStatus::Failed => {}
            }
        }
        for (status, amount) in withdrawals {
            match status {
                WithdrawalStatus::Completed => {
                    ledger.completed_withdrawals =
                        ledger.completed_withdrawals.saturating_add(amount);
                }
                WithdrawalStatus::Pending => {
                    ledger.pending_withdrawals = ledger.pending_withdrawals.saturating_add(amount);
                }
                WithdrawalStatus::Rejected => {}
            }
        }
        ledger.available = available_balance(
            ledger.completed_donations,
            ledger.completed_withdrawals,
            ledger.pending_withdrawals,
        );
        ledger
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("withdrawal amount must be positive")]
    NonPositiveAmount,
    #[error("requested {requested} exceeds available balance {available}")]
    ExceedsAvailable { requested: i64, available: i64 },
}

/// Gate applied before a withdrawal request is written.
pub fn check_withdrawal(amount: i64, ledger: &FundingLedger) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::NonPositiveAmount);
    }
    if amount > ledger.available {
        return Err(LedgerError::ExceedsAvailable {
            requested: amount,
            available: ledger.available,
        });
    }
    Ok(())
}

/// View-model fields shown next to every campaign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct CampaignProgress {
    pub raised: i64,
    pub goal: i64,
    pub donor_count: i64,
    pub percent_funded: u8,
    pub days_left: i64,
    pub status: CampaignStatus,
}

impl CampaignProgress {
    pub fn derive(campaign: &campaign::Model, now: DateTime<Utc>) -> Self {
        let raised = campaign.current_amount;
        let goal = campaign.goal_amount;
        CampaignProgress {
            raised,
            goal,
            donor_count: campaign.donor_count,
            percent_funded: percent_funded(raised, goal),
            days_left: days_left(campaign.end_date, now),
            status: campaign_status(campaign.end_date, raised, goal, now),
        }
    }
}
