// Export all route modules
pub mod admin;
pub mod auth;
pub mod campaigns;
pub mod content;
pub mod donations;
pub mod notifications;
pub mod profile;
pub mod withdrawals;
