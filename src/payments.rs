//! Payment step for donations. Only a simulated gateway exists.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved { reference: String },
    Declined { reason: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, donation_id: Uuid, amount: i64) -> AppResult<PaymentOutcome>;
}

/// Approves every charge, optionally declining amounts above a threshold so
/// the failure path can be exercised.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    decline_above: Option<i64>,
}

impl SimulatedGateway {
    pub fn new(decline_above: Option<i64>) -> Self {
        Self { decline_above }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, donation_id: Uuid, amount: i64) -> AppResult<PaymentOutcome> {
        if let Some(limit) = self.decline_above {
            if amount > limit {
                tracing::info!(%donation_id, amount, limit, "simulated payment declined");
                return Ok(PaymentOutcome::Declined {
                    reason: format!("amount above simulated limit of {limit}"),
                });
            }
        }
        Ok(PaymentOutcome::Approved {
            reference: format!("sim_{}", Uuid::new_v4().simple()),
        })
    }
}
