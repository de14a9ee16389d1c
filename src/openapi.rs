use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::SessionResponse;
use crate::entities::{DonationStatus, Moderation, WithdrawalStatus};
use crate::jobs::ReconcileReport;
use crate::ledger::{CampaignProgress, CampaignStatus, FundingLedger};
use crate::routes::{
    admin, auth, campaigns, content, donations, notifications, profile, withdrawals,
};
use crate::services::blog::{BlogPostSummary, BlogPostView, NewBlogPost};
use crate::services::campaigns::{CampaignUpdate, CampaignView, NewCampaign};
use crate::services::donations::{DonationReceipt, DonationView, NewDonation, PublicDonation};
use crate::services::notifications::NotificationView;
use crate::services::profiles::{ProfileUpdate, ProfileView};
use crate::services::withdrawals::{BalanceView, NewWithdrawal, WithdrawalView};

/// Bearer tokens issued by `/auth/signin` or the hosted identity provider.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Session token from /auth/signin"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Crowdfund API",
        version = "0.1.0",
        description = "Community crowdfunding: campaigns, donations, withdrawals and moderation."
    ),
    modifiers(&SecurityAddon),
    paths(
        crate::health_check,
        auth::sign_up,
        auth::sign_in,
        auth::sign_out,
        auth::me,
        profile::get_profile,
        profile::update_profile,
        campaigns::list_campaigns,
        campaigns::create_campaign,
        campaigns::get_campaign,
        campaigns::update_campaign,
        campaigns::upload_image,
        campaigns::my_campaigns,
        campaigns::success_stories,
        donations::donate,
        donations::list_campaign_donations,
        donations::my_donations,
        withdrawals::campaign_balance,
        withdrawals::list_withdrawals,
        withdrawals::request_withdrawal,
        notifications::list_notifications,
        notifications::mark_read,
        content::subscribe,
        content::list_posts,
        content::get_post,
        content::feed,
        admin::list_campaigns,
        admin::moderate_campaign,
        admin::list_withdrawals,
        admin::complete_withdrawal,
        admin::reject_withdrawal,
        admin::list_users,
        admin::export_donations,
        admin::reconcile,
        admin::create_blog_post
    ),
    components(schemas(
        auth::SignUpRequest,
        auth::SignInRequest,
        SessionResponse,
        ProfileView,
        ProfileUpdate,
        CampaignView,
        NewCampaign,
        CampaignUpdate,
        CampaignProgress,
        CampaignStatus,
        Moderation,
        NewDonation,
        DonationView,
        DonationReceipt,
        PublicDonation,
        DonationStatus,
        NewWithdrawal,
        WithdrawalView,
        WithdrawalStatus,
        BalanceView,
        FundingLedger,
        NotificationView,
        content::SubscribeRequest,
        content::SubscribeResponse,
        BlogPostSummary,
        BlogPostView,
        NewBlogPost,
        admin::ModerationRequest,
        admin::ReviewRequest,
        ReconcileReport
    )),
    tags(
        (name = "auth", description = "Sign-up, sign-in and sessions"),
        (name = "campaigns", description = "Campaign lifecycle and derived progress"),
        (name = "donations", description = "Donations and the simulated payment step"),
        (name = "withdrawals", description = "Balances and payout requests"),
        (name = "admin", description = "Moderation and back-office tools"),
        (name = "content", description = "Blog, newsletter and success stories")
    )
)]
pub struct ApiDoc;
