use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use std::collections::HashSet;

use crate::helpers::configure_database;
use newsletter_service::domain::audience::AudienceFilter;
use newsletter_service::domain::interest::{Interest, Interests};
use newsletter_service::domain::subscriber::{Provenance, Subscriber};
use newsletter_service::domain::subscriber_email::SubscriberEmail;
use newsletter_service::domain::subscriber_name::SubscriberName;
use newsletter_service::domain::subscriber_status::SubscriberStatus;
use newsletter_service::ports::SubscriberStore;
use newsletter_service::storage::PostgresSubscriberStore;

fn email(address: &str) -> SubscriberEmail {
    SubscriberEmail::parse(address.to_string()).expect("Invalid test email.")
}

fn subscriber(
    address: &str,
    interests: &[&str],
    status: SubscriberStatus,
    subscribed_at: DateTime<Utc>,
) -> Subscriber {
    Subscriber {
        id: uuid::Uuid::new_v4(),
        email: email(address),
        name: None,
        interests: Interests::parse(interests)
            .expect("Invalid test interests.")
            .unwrap_or_else(Interests::everything),
        status,
        subscribed_at,
        last_sent_at: None,
        send_count: 0,
        provenance: Provenance {
            source: "website".to_string(),
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: None,
        },
    }
}

async fn rows_for(db_pool: &PgPool, address: &str) -> i64 {
    sqlx::query("SELECT COUNT(*) AS total FROM subscribers WHERE email = $1")
        .bind(address)
        .fetch_one(db_pool)
        .await
        .expect("Failed to count subscribers.")
        .get("total")
}

fn emails(subscribers: &[Subscriber]) -> Vec<&str> {
    subscribers
        .iter()
        .map(|subscriber| subscriber.email.as_ref())
        .collect()
}

#[tokio::test]
async fn upsert_keeps_a_single_row_per_email() {
    let Some(db_pool) = configure_database().await else {
        return;
    };
    let store = PostgresSubscriberStore::new(db_pool.clone());

    let mut first = subscriber("ann@x.com", &["web-development"], SubscriberStatus::Active, Utc::now());
    first.name = Some(SubscriberName::parse("Ann".to_string()).expect("Invalid name."));
    let stored = store.upsert(first).await.expect("Failed to insert.");

    let mut second = subscriber("ann@x.com", &["graphic-design"], SubscriberStatus::Inactive, Utc::now());
    second.name = Some(SubscriberName::parse("Annie".to_string()).expect("Invalid name."));
    let updated = store.upsert(second).await.expect("Failed to update.");

    assert_eq!(rows_for(&db_pool, "ann@x.com").await, 1);
    assert_eq!(updated.id, stored.id);
    assert_eq!(updated.status, SubscriberStatus::Inactive);
    assert_eq!(updated.name.as_ref().map(|name| name.as_ref()), Some("Annie"));
    assert!(updated.interests.contains(Interest::GraphicDesign));
    assert!(!updated.interests.contains(Interest::WebDevelopment));

    let found = store
        .find_by_email(&email("ann@x.com"))
        .await
        .expect("Failed to fetch.")
        .expect("Subscriber is missing.");
    assert_eq!(found.id, stored.id);
    assert_eq!(found.provenance.ip_address.as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn upsert_never_lowers_the_send_counters() {
    let Some(db_pool) = configure_database().await else {
        return;
    };
    let store = PostgresSubscriberStore::new(db_pool);

    let mut sent = subscriber("ann@x.com", &[], SubscriberStatus::Active, Utc::now());
    sent.send_count = 3;
    sent.last_sent_at = Some(Utc::now());
    store.upsert(sent).await.expect("Failed to insert.");

    let stale = subscriber("ann@x.com", &[], SubscriberStatus::Inactive, Utc::now());
    let updated = store.upsert(stale).await.expect("Failed to update.");

    assert_eq!(updated.send_count, 3);
    assert!(updated.last_sent_at.is_some());
}

#[tokio::test]
async fn query_active_matches_the_interest_or_the_wildcard_in_subscription_order() {
    let Some(db_pool) = configure_database().await else {
        return;
    };
    let store = PostgresSubscriberStore::new(db_pool);
    let start = Utc::now() - Duration::hours(1);

    for record in [
        subscriber("web@x.com", &["web-development"], SubscriberStatus::Active, start + Duration::seconds(2)),
        subscriber("everyone@x.com", &["all"], SubscriberStatus::Active, start + Duration::seconds(1)),
        subscriber("design@x.com", &["graphic-design"], SubscriberStatus::Active, start),
        subscriber("art@x.com", &["graphic-design"], SubscriberStatus::Active, start),
        subscriber("gone@x.com", &["web-development"], SubscriberStatus::Inactive, start),
    ] {
        store.upsert(record).await.expect("Failed to insert.");
    }

    let interested = store
        .query_active(&AudienceFilter::Interested(Interest::WebDevelopment))
        .await
        .expect("Failed to query.");
    let everyone = store
        .query_active(&AudienceFilter::EveryActive)
        .await
        .expect("Failed to query.");

    assert_eq!(emails(&interested), vec!["everyone@x.com", "web@x.com"]);
    assert_eq!(
        emails(&everyone),
        vec!["art@x.com", "design@x.com", "everyone@x.com", "web@x.com"]
    );
}

#[tokio::test]
async fn increment_send_counters_only_touches_the_listed_emails() {
    let Some(db_pool) = configure_database().await else {
        return;
    };
    let store = PostgresSubscriberStore::new(db_pool);
    for address in ["a@x.com", "b@x.com", "c@x.com"] {
        store
            .upsert(subscriber(address, &[], SubscriberStatus::Active, Utc::now()))
            .await
            .expect("Failed to insert.");
    }
    let delivered: HashSet<SubscriberEmail> = [email("a@x.com"), email("c@x.com")].into();

    store
        .increment_send_counters(&delivered, Utc::now())
        .await
        .expect("Failed to increment.");
    store
        .increment_send_counters(&delivered, Utc::now())
        .await
        .expect("Failed to increment.");

    for (address, expected_count) in [("a@x.com", 2), ("b@x.com", 0), ("c@x.com", 2)] {
        let stored = store
            .find_by_email(&email(address))
            .await
            .expect("Failed to fetch.")
            .expect("Subscriber is missing.");
        assert_eq!(stored.send_count, expected_count, "send count of {}", address);
        assert_eq!(stored.last_sent_at.is_some(), expected_count > 0);
    }
}
