use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::AppResult;
use crate::services::withdrawals::{self, BalanceView, NewWithdrawal, WithdrawalView};
use crate::AppState;

/// Funding ledger and available balance
#[utoipa::path(
    get,
    path = "/campaigns/{id}/balance",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Ledger totals", body = BalanceView),
        (status = 403, description = "Caller does not own the campaign")
    ),
    security(("bearer_auth" = [])),
    tag = "withdrawals"
)]
pub async fn campaign_balance(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BalanceView>> {
    Ok(Json(withdrawals::balance(&state.db, &session, id).await?))
}

#[utoipa::path(
    get,
    path = "/campaigns/{id}/withdrawals",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Withdrawal requests, newest first", body = [WithdrawalView])
    ),
    security(("bearer_auth" = [])),
    tag = "withdrawals"
)]
pub async fn list_withdrawals(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<WithdrawalView>>> {
    Ok(Json(withdrawals::list_for_campaign(&state.db, &session, id).await?))
}

/// Ask for a payout from the available balance
#[utoipa::path(
    post,
    path = "/campaigns/{id}/withdrawals",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = NewWithdrawal,
    responses(
        (status = 201, description = "Withdrawal pending review", body = WithdrawalView),
        (status = 403, description = "Caller does not own the campaign"),
        (status = 422, description = "Amount exceeds the available balance")
    ),
    security(("bearer_auth" = [])),
    tag = "withdrawals"
)]
pub async fn request_withdrawal(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(input): Json<NewWithdrawal>,
) -> AppResult<(StatusCode, Json<WithdrawalView>)> {
    let created = withdrawals::request(&state.db, &session, id, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
