use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::domain::preferences::{Preference, SubscriberPreferences};
use crate::domain::subscriber::{NewSubscriber, Subscriber};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;

// The underlying table stores the subscription flag as the literal strings
// "true"/"false" and every query compares against those literals. The rest of
// the application only ever sees a bool; the conversion lives here and
// nowhere else.
const ACTIVE_FLAG: &str = "true";
const INACTIVE_FLAG: &str = "false";

fn active_flag(is_active: bool) -> &'static str {
    if is_active {
        ACTIVE_FLAG
    } else {
        INACTIVE_FLAG
    }
}

const POSTGRES_UNIQUE_VIOLATION: &str = "23505";

#[derive(thiserror::Error, Debug)]
pub enum SubscriberStoreError {
    #[error("{0} is already subscribed")]
    AlreadySubscribed(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct SubscriberStore {
    pool: PgPool,
}

impl SubscriberStore {
    pub fn new(pool: PgPool) -> SubscriberStore {
        SubscriberStore { pool }
    }

    /// Inserts a new subscriber record. The primary key on the normalized
    /// email enforces one record per mailbox; an existing record (active or
    /// not) surfaces as `AlreadySubscribed` and the caller is expected to
    /// resubscribe instead.
    #[tracing::instrument(
        name = "Insert a new subscriber",
        skip(self, new_subscriber),
        fields(subscriber_email = %new_subscriber.email)
    )]
    pub async fn create(
        &self,
        new_subscriber: &NewSubscriber,
    ) -> Result<Subscriber, SubscriberStoreError> {
        let now = Utc::now();

        let subscriber = sqlx::query(
            r#"
            INSERT INTO subscribers
                (email, first_name, last_name, is_active, subscription_date, preferences, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING email, first_name, last_name, is_active, subscription_date, preferences, updated_at
            "#,
        )
        .bind(new_subscriber.email.as_ref())
        .bind(new_subscriber.first_name.as_ref())
        .bind(new_subscriber.last_name.as_ref())
        .bind(ACTIVE_FLAG)
        .bind(now)
        .bind(Json(new_subscriber.preferences))
        .bind(now)
        .map(subscriber_from_row)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let is_duplicate = err
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .map(|code| code == POSTGRES_UNIQUE_VIOLATION)
                .unwrap_or(false);

            if is_duplicate {
                SubscriberStoreError::AlreadySubscribed(new_subscriber.email.as_ref().to_string())
            } else {
                tracing::error!("Failed to execute query: {:?}", err);
                SubscriberStoreError::Database(err)
            }
        })?;

        Ok(subscriber)
    }

    #[tracing::instrument(name = "Fetch a subscriber by email", skip(self))]
    pub async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, sqlx::Error> {
        sqlx::query(
            r#"
            SELECT email, first_name, last_name, is_active, subscription_date, preferences, updated_at
            FROM subscribers
            WHERE email = $1
            "#,
        )
        .bind(email.as_ref())
        .map(subscriber_from_row)
        .fetch_optional(&self.pool)
        .await
    }

    #[tracing::instrument(name = "Fetch all active subscribers", skip(self))]
    pub async fn get_active_subscribers(&self) -> Result<Vec<Subscriber>, sqlx::Error> {
        sqlx::query(
            r#"
            SELECT email, first_name, last_name, is_active, subscription_date, preferences, updated_at
            FROM subscribers
            WHERE is_active = 'true'
            ORDER BY subscription_date
            "#,
        )
        .map(subscriber_from_row)
        .fetch_all(&self.pool)
        .await
    }

    /// Active subscribers whose preference flag for the given topic is on.
    /// Records written before a flag existed count as opted in, matching the
    /// default-everything-on contract for new subscribers.
    #[tracing::instrument(name = "Fetch subscribers by preference", skip(self))]
    pub async fn get_subscribers_by_preference(
        &self,
        preference: Preference,
    ) -> Result<Vec<Subscriber>, sqlx::Error> {
        sqlx::query(
            r#"
            SELECT email, first_name, last_name, is_active, subscription_date, preferences, updated_at
            FROM subscribers
            WHERE is_active = 'true'
              AND COALESCE((preferences ->> $1)::boolean, true)
            ORDER BY subscription_date
            "#,
        )
        .bind(preference.as_ref())
        .map(subscriber_from_row)
        .fetch_all(&self.pool)
        .await
    }

    #[tracing::instrument(name = "Unsubscribe a subscriber", skip(self))]
    pub async fn unsubscribe(&self, email: &SubscriberEmail) -> Result<u64, sqlx::Error> {
        self.set_active(email, false).await
    }

    #[tracing::instrument(name = "Resubscribe a subscriber", skip(self))]
    pub async fn resubscribe(&self, email: &SubscriberEmail) -> Result<u64, sqlx::Error> {
        self.set_active(email, true).await
    }

    async fn set_active(&self, email: &SubscriberEmail, is_active: bool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET is_active = $2, updated_at = $3
            WHERE email = $1
            "#,
        )
        .bind(email.as_ref())
        .bind(active_flag(is_active))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Hard delete, admin only. Unsubscribing is the normal path.
    #[tracing::instrument(name = "Delete a subscriber", skip(self))]
    pub async fn delete(&self, email: &SubscriberEmail) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscribers WHERE email = $1")
            .bind(email.as_ref())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn subscriber_from_row(row: PgRow) -> Subscriber {
    let is_active: String = row.get("is_active");
    let preferences: Json<SubscriberPreferences> = row.get("preferences");

    Subscriber {
        email: SubscriberEmail::parse(row.get("email")).unwrap(),
        first_name: SubscriberName::parse(row.get("first_name")).unwrap(),
        last_name: SubscriberName::parse(row.get("last_name")).unwrap(),
        is_active: is_active == ACTIVE_FLAG,
        subscription_date: row.get("subscription_date"),
        preferences: preferences.0,
        updated_at: row.get("updated_at"),
    }
}
