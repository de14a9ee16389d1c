pub mod blog_post;
pub mod campaign;
pub mod donation;
pub mod newsletter_subscriber;
pub mod notification;
pub mod profile;
pub mod user;
pub mod withdrawal;

pub use campaign::Moderation;
pub use donation::DonationStatus;
pub use withdrawal::WithdrawalStatus;

pub use blog_post::Entity as BlogPost;
pub use campaign::Entity as Campaign;
pub use donation::Entity as Donation;
pub use newsletter_subscriber::Entity as NewsletterSubscriber;
pub use notification::Entity as Notification;
pub use profile::Entity as Profile;
pub use user::Entity as User;
pub use withdrawal::Entity as Withdrawal;
