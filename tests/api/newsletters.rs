use std::time::Duration;
use wiremock::matchers::{any, body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

fn newsletter_request(target: &str, interest: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "target": target,
        "interest": interest,
        "subject": "Monthly digest",
        "content": {
            "html": "<p>Newsletter content</p>"
        }
    })
}

/// Subscribes everyone, then forgets the welcome emails so only newsletter traffic is counted.
async fn create_subscribers(test_app: &TestApp, subscribers: Vec<(&str, Vec<&str>)>) {
    test_app.accept_all_emails().await;
    for (email, interests) in subscribers {
        test_app.subscribe(email, &interests).await;
    }
    test_app.email_server.reset().await;
}

#[tokio::test]
async fn newsletters_are_not_delivered_to_unsubscribed_subscribers() {
    let test_app = TestApp::spawn_app().await;
    create_subscribers(
        &test_app,
        vec![("stays@test.com", vec![]), ("leaves@test.com", vec![])],
    )
    .await;
    test_app.post_unsubscribe("leaves@test.com").await;

    Mock::given(body_string_contains("leaves@test.com"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;
    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_newsletter(newsletter_request("all", None))
        .await;

    assert_eq!(200, response.status().as_u16());
    let report: serde_json::Value = response.json().await.expect("Invalid JSON body.");
    assert_eq!(report["sent"], 1);
    assert_eq!(report["failed"], 0);
}

#[tokio::test]
async fn specific_interest_reaches_matching_and_catch_all_subscribers() {
    let test_app = TestApp::spawn_app().await;
    create_subscribers(
        &test_app,
        vec![
            ("web@test.com", vec!["web-development"]),
            ("design@test.com", vec!["graphic-design"]),
            ("everything@test.com", vec!["all"]),
        ],
    )
    .await;

    Mock::given(body_string_contains("design@test.com"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;
    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_newsletter(newsletter_request(
            "specific-interest",
            Some("web-development"),
        ))
        .await;

    assert_eq!(200, response.status().as_u16());
    let report: serde_json::Value = response.json().await.expect("Invalid JSON body.");
    assert_eq!(report["sent"], 2);
}

#[tokio::test]
async fn a_failed_delivery_does_not_stop_the_broadcast() {
    let test_app = TestApp::spawn_app().await;
    create_subscribers(
        &test_app,
        vec![
            ("ann@test.com", vec![]),
            ("bob@test.com", vec![]),
            ("cat@test.com", vec![]),
        ],
    )
    .await;

    // Mocks are matched in mount order: bob's request hits the failing one first
    Mock::given(body_string_contains("bob@test.com"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&test_app.email_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).insert_header("X-Message-Id", "msg-ok"))
        .expect(2)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_newsletter(newsletter_request("active", None))
        .await;

    assert_eq!(200, response.status().as_u16());
    let report: serde_json::Value = response.json().await.expect("Invalid JSON body.");
    assert_eq!(report["sent"], 2);
    assert_eq!(report["failed"], 1);

    let outcomes = report["outcomes"]
        .as_array()
        .expect("Missing delivery outcomes.");
    let emails: Vec<&str> = outcomes
        .iter()
        .filter_map(|outcome| outcome["email"].as_str())
        .collect();
    assert_eq!(emails, vec!["ann@test.com", "bob@test.com", "cat@test.com"]);
    assert_eq!(outcomes[0]["status"], "delivered");
    assert_eq!(outcomes[0]["message_id"], "msg-ok");
    assert_eq!(outcomes[1]["status"], "failed");
    assert_eq!(outcomes[2]["status"], "delivered");
}

#[tokio::test]
async fn only_delivered_recipients_are_credited() {
    let test_app = TestApp::spawn_app().await;
    create_subscribers(&test_app, vec![("ann@test.com", vec![]), ("bob@test.com", vec![])]).await;

    Mock::given(body_string_contains("bob@test.com"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&test_app.email_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_newsletter(newsletter_request("all", None))
        .await;

    let ann = test_app
        .find_subscriber("ann@test.com")
        .await
        .expect("Missing subscriber.");
    let bob = test_app
        .find_subscriber("bob@test.com")
        .await
        .expect("Missing subscriber.");

    assert_eq!(ann.send_count, 1);
    assert!(ann.last_sent_at.is_some());
    assert_eq!(bob.send_count, 0);
    assert!(bob.last_sent_at.is_none());
}

#[tokio::test]
async fn a_slow_gateway_call_is_reported_as_failed() {
    let test_app = TestApp::spawn_app().await;
    create_subscribers(&test_app, vec![("slow@test.com", vec![]), ("fast@test.com", vec![])]).await;

    Mock::given(body_string_contains("slow@test.com"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&test_app.email_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_newsletter(newsletter_request("all", None))
        .await;

    assert_eq!(200, response.status().as_u16());
    let report: serde_json::Value = response.json().await.expect("Invalid JSON body.");
    assert_eq!(report["sent"], 1);
    assert_eq!(report["outcomes"][0]["email"], "slow@test.com");
    assert_eq!(report["outcomes"][0]["status"], "failed");
    assert_eq!(report["outcomes"][1]["status"], "delivered");
}

#[tokio::test]
async fn newsletters_returns_400_when_nobody_would_receive_it() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_newsletter(newsletter_request("active", None))
        .await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn newsletters_returns_400_when_body_is_invalid() {
    let test_app = TestApp::spawn_app().await;
    create_subscribers(&test_app, vec![("reader@test.com", vec![])]).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let test_cases = vec![
        (
            serde_json::json!({
                "target": "all",
                "content": { "html": "<p>Newsletter content</p>" }
            }),
            "missing subject",
        ),
        (
            serde_json::json!({
                "target": "all",
                "subject": "Hi",
                "content": { "html": "<p>Newsletter content</p>" }
            }),
            "subject too short",
        ),
        (
            serde_json::json!({ "target": "all", "subject": "Monthly digest" }),
            "missing content",
        ),
        (
            newsletter_request("everyone", None),
            "unknown target",
        ),
        (
            newsletter_request("specific-interest", None),
            "specific interest without a tag",
        ),
        (
            newsletter_request("specific-interest", Some("knitting")),
            "unknown interest",
        ),
    ];

    for (body, error_message) in test_cases {
        let response = test_app.post_newsletter(body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );
    }
}

#[tokio::test]
async fn newsletters_require_the_admin_token() {
    let test_app = TestApp::spawn_app().await;

    let missing = test_app
        .api_client
        .post(format!("{}/newsletters", test_app.address))
        .json(&newsletter_request("all", None))
        .send()
        .await
        .expect("Failed to execute request.");
    let wrong = test_app
        .api_client
        .post(format!("{}/newsletters", test_app.address))
        .bearer_auth("not-the-token")
        .json(&newsletter_request("all", None))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, missing.status().as_u16());
    assert!(missing.headers().contains_key("WWW-Authenticate"));
    assert_eq!(401, wrong.status().as_u16());
}

#[tokio::test]
async fn admin_token_is_checked_before_the_payload() {
    let test_app = TestApp::spawn_app().await;

    let malformed_body = test_app
        .api_client
        .post(format!("{}/newsletters", test_app.address))
        .json(&serde_json::json!({ "target": "everyone" }))
        .send()
        .await
        .expect("Failed to execute request.");
    let malformed_query = test_app
        .api_client
        .get(format!("{}/newsletters/audience", test_app.address))
        .query(&[("target", "everyone")])
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, malformed_body.status().as_u16());
    assert_eq!(401, malformed_query.status().as_u16());
}

#[tokio::test]
async fn audience_preview_lists_the_matching_subscribers() {
    let test_app = TestApp::spawn_app().await;
    create_subscribers(
        &test_app,
        vec![
            ("web@test.com", vec!["web-development"]),
            ("design@test.com", vec!["graphic-design"]),
            ("everything@test.com", vec![]),
        ],
    )
    .await;

    let response = test_app
        .get_audience(&[("target", "specific-interest"), ("interest", "graphic-design")])
        .await;

    assert_eq!(200, response.status().as_u16());
    let audience: serde_json::Value = response.json().await.expect("Invalid JSON body.");
    assert_eq!(audience["count"], 2);

    let response = test_app.get_audience(&[("target", "active")]).await;
    let audience: serde_json::Value = response.json().await.expect("Invalid JSON body.");
    assert_eq!(audience["count"], 3);
}

#[tokio::test]
async fn audience_preview_rejects_an_invalid_target() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .get_audience(&[("target", "specific-interest")])
        .await;

    assert_eq!(400, response.status().as_u16());
}
