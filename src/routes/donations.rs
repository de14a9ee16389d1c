use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{MaybeSession, Session};
use crate::error::AppResult;
use crate::services::donations::{self, DonationReceipt, DonationView, NewDonation, PublicDonation};
use crate::services::PageQuery;
use crate::AppState;

/// Donate to a campaign. Signing in is optional.
#[utoipa::path(
    post,
    path = "/campaigns/{id}/donations",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = NewDonation,
    responses(
        (status = 201, description = "Donation completed", body = DonationReceipt),
        (status = 402, description = "Payment declined"),
        (status = 404, description = "No such campaign"),
        (status = 422, description = "Invalid amount or campaign closed")
    ),
    tag = "donations"
)]
pub async fn donate(
    State(state): State<AppState>,
    MaybeSession(donor): MaybeSession,
    Path(id): Path<Uuid>,
    Json(input): Json<NewDonation>,
) -> AppResult<(StatusCode, Json<DonationReceipt>)> {
    let receipt = donations::donate(
        &state.db,
        state.payments.as_ref(),
        donor.as_ref(),
        id,
        input,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Completed donations to a campaign, newest first
#[utoipa::path(
    get,
    path = "/campaigns/{id}/donations",
    params(("id" = Uuid, Path, description = "Campaign id"), PageQuery),
    responses((status = 200, description = "Donations", body = [PublicDonation])),
    tag = "donations"
)]
pub async fn list_campaign_donations(
    State(state): State<AppState>,
    MaybeSession(viewer): MaybeSession,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicDonation>>> {
    Ok(Json(
        donations::list_for_campaign(&state.db, id, viewer.as_ref(), &page).await?,
    ))
}

/// Donations made while signed in as the caller
#[utoipa::path(
    get,
    path = "/me/donations",
    params(PageQuery),
    responses((status = 200, description = "Donation history", body = [DonationView])),
    security(("bearer_auth" = [])),
    tag = "donations"
)]
pub async fn my_donations(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<DonationView>>> {
    Ok(Json(donations::list_for_donor(&state.db, &session, &page).await?))
}
