use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::{newsletter_subscriber, NewsletterSubscriber};
use crate::error::AppResult;
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Created,
    AlreadySubscribed,
}

/// Add `email` to the mailing list. Subscribing twice is not an error.
pub async fn subscribe(db: &DatabaseConnection, email: &str) -> AppResult<Subscription> {
    let email = validation::email(email)?;
    let lookup = || {
        NewsletterSubscriber::find()
            .filter(newsletter_subscriber::Column::Email.eq(email.as_str()))
            .one(db)
    };
    if lookup().await?.is_some() {
        return Ok(Subscription::AlreadySubscribed);
    }

    let inserted = newsletter_subscriber::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.clone()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await;

    match inserted {
        Ok(_) => {
            tracing::info!("newsletter subscriber added");
            Ok(Subscription::Created)
        }
        // unique index beat us to it
        Err(err) => match lookup().await? {
            Some(_) => Ok(Subscription::AlreadySubscribed),
            None => Err(err.into()),
        },
    }
}
