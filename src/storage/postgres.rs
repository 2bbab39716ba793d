use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashSet;

use crate::domain::audience::AudienceFilter;
use crate::domain::interest::Interests;
use crate::domain::subscriber::{Provenance, Subscriber};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;
use crate::domain::subscriber_status::SubscriberStatus;
use crate::ports::{StoreError, SubscriberStore};

const SUBSCRIBER_COLUMNS: &str = "id, email, name, interests, status, subscribed_at, \
     last_sent_at, send_count, source, ip_address, user_agent";

pub struct PostgresSubscriberStore {
    db_pool: PgPool,
}

impl PostgresSubscriberStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.db_pool).await
    }
}

fn unavailable(context: String) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |source| {
        tracing::error!("Failed to execute query: {:?}", source);
        StoreError::Unavailable { context, source }
    }
}

fn parse_row(row: &PgRow) -> Result<Subscriber, StoreError> {
    let read = |source: sqlx::Error| StoreError::Unavailable {
        context: "Failed to read a subscriber row".to_string(),
        source,
    };
    let tags: Vec<String> = row.try_get("interests").map_err(read)?;

    Ok(Subscriber {
        id: row.try_get("id").map_err(read)?,
        email: SubscriberEmail::parse(row.try_get("email").map_err(read)?)
            .map_err(StoreError::InvalidRecord)?,
        name: row
            .try_get::<Option<String>, _>("name")
            .map_err(read)?
            .map(SubscriberName::parse)
            .transpose()
            .map_err(StoreError::InvalidRecord)?,
        interests: Interests::parse(tags.as_slice())
            .map_err(StoreError::InvalidRecord)?
            .ok_or_else(|| StoreError::InvalidRecord("subscriber without interests".into()))?,
        status: SubscriberStatus::parse(row.try_get("status").map_err(read)?)
            .map_err(StoreError::InvalidRecord)?,
        subscribed_at: row.try_get("subscribed_at").map_err(read)?,
        last_sent_at: row.try_get("last_sent_at").map_err(read)?,
        send_count: row.try_get("send_count").map_err(read)?,
        provenance: Provenance {
            source: row.try_get("source").map_err(read)?,
            ip_address: row.try_get("ip_address").map_err(read)?,
            user_agent: row.try_get("user_agent").map_err(read)?,
        },
    })
}

#[async_trait]
impl SubscriberStore for PostgresSubscriberStore {
    #[tracing::instrument(name = "Fetch a subscriber by email", skip(self), fields(subscriber_email = %email))]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscribers WHERE email = $1",
            SUBSCRIBER_COLUMNS
        ))
        .bind(email.as_ref())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(unavailable(format!("Could not fetch subscriber {}", email)))?;

        row.as_ref().map(parse_row).transpose()
    }

    #[tracing::instrument(
        name = "Upsert a subscriber into the database",
        skip(self, subscriber),
        fields(subscriber_email = %subscriber.email)
    )]
    async fn upsert(&self, subscriber: Subscriber) -> Result<Subscriber, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscribers ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                interests = EXCLUDED.interests,
                status = EXCLUDED.status,
                subscribed_at = EXCLUDED.subscribed_at,
                last_sent_at = GREATEST(subscribers.last_sent_at, EXCLUDED.last_sent_at),
                send_count = GREATEST(subscribers.send_count, EXCLUDED.send_count),
                source = EXCLUDED.source,
                ip_address = EXCLUDED.ip_address,
                user_agent = EXCLUDED.user_agent
            RETURNING {}
            "#,
            SUBSCRIBER_COLUMNS, SUBSCRIBER_COLUMNS
        ))
        .bind(subscriber.id)
        .bind(subscriber.email.as_ref())
        .bind(subscriber.name.as_ref().map(|name| name.as_ref()))
        .bind(subscriber.interests.tags())
        .bind(subscriber.status.as_ref())
        .bind(subscriber.subscribed_at)
        .bind(subscriber.last_sent_at)
        .bind(subscriber.send_count)
        .bind(&subscriber.provenance.source)
        .bind(&subscriber.provenance.ip_address)
        .bind(&subscriber.provenance.user_agent)
        .fetch_one(&self.db_pool)
        .await
        .map_err(unavailable(format!(
            "Could not store subscriber {}",
            subscriber.email
        )))?;

        parse_row(&row)
    }

    #[tracing::instrument(name = "Query active subscribers", skip(self))]
    async fn query_active(&self, filter: &AudienceFilter) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM subscribers
            WHERE status = 'active'
              AND ($1::TEXT IS NULL OR interests && ARRAY[$1, 'all']::TEXT[])
            ORDER BY subscribed_at, email
            "#,
            SUBSCRIBER_COLUMNS
        ))
        .bind(filter.interest().map(|interest| interest.as_ref().to_string()))
        .fetch_all(&self.db_pool)
        .await
        .map_err(unavailable("Could not query active subscribers".to_string()))?;

        rows.iter().map(parse_row).collect()
    }

    #[tracing::instrument(
        name = "Increment send counters",
        skip(self, emails),
        fields(recipients = emails.len())
    )]
    async fn increment_send_counters(
        &self,
        emails: &HashSet<SubscriberEmail>,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let emails: Vec<String> = emails.iter().map(|email| email.to_string()).collect();

        sqlx::query(
            r#"
            UPDATE subscribers
            SET send_count = send_count + 1, last_sent_at = $2
            WHERE email = ANY($1)
            "#,
        )
        .bind(emails)
        .bind(sent_at)
        .execute(&self.db_pool)
        .await
        .map_err(unavailable("Could not update send counters".to_string()))?;

        Ok(())
    }
}
