use sqlx::Row;

use crate::helpers::TestApp;

#[tokio::test]
async fn subscribe_returns_201_for_valid_body() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_subscription(serde_json::json!({
            "email": "alice@example.com",
            "firstName": "Alice",
            "lastName": "Smith"
        }))
        .await;

    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn subscribe_persists_the_subscriber_with_defaults() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    let row = sqlx::query("SELECT email, first_name, is_active, preferences FROM subscribers")
        .fetch_one(&test_app.db_pool)
        .await
        .expect("Failed to fetch saved subscriber.");

    assert_eq!(row.get::<String, _>("email"), "alice@example.com");
    assert_eq!(row.get::<String, _>("first_name"), "");
    // The store keeps the flag as a string, not a boolean
    assert_eq!(row.get::<String, _>("is_active"), "true");

    let preferences: serde_json::Value = row.get("preferences");
    assert_eq!(preferences["events"], true);
    assert_eq!(preferences["stories"], true);
    assert_eq!(preferences["volunteerOpportunities"], true);
    assert_eq!(preferences["donationUpdates"], true);
}

#[tokio::test]
async fn subscribe_normalizes_the_email_to_lowercase() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "Alice@Example.COM" }))
        .await;

    assert_eq!(response.status().as_u16(), 201);

    let row = sqlx::query("SELECT email FROM subscribers")
        .fetch_one(&test_app.db_pool)
        .await
        .expect("Failed to fetch saved subscriber.");

    assert_eq!(row.get::<String, _>("email"), "alice@example.com");
}

#[tokio::test]
async fn subscribing_twice_is_rejected_case_insensitively() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "ALICE@example.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn subscribe_returns_400_for_invalid_payloads() {
    let test_app = TestApp::spawn_app().await;
    let test_cases = vec![
        (serde_json::json!({ "email": "not-an-email" }), "malformed email"),
        (serde_json::json!({ "email": "" }), "empty email"),
        (
            serde_json::json!({ "email": "a@x.com", "firstName": "<script>" }),
            "forbidden characters in name",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_subscription(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
    }
}

#[tokio::test]
async fn unsubscribe_flips_the_subscription_flag() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    let response = test_app
        .post_unsubscribe(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 200);

    let row = sqlx::query("SELECT is_active FROM subscribers")
        .fetch_one(&test_app.db_pool)
        .await
        .expect("Failed to fetch saved subscriber.");

    assert_eq!(row.get::<String, _>("is_active"), "false");
}

#[tokio::test]
async fn unsubscribing_twice_returns_400() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "alice@example.com" }))
        .await;
    test_app
        .post_unsubscribe(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    let response = test_app
        .post_unsubscribe(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn unsubscribing_an_unknown_email_returns_404() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_unsubscribe(serde_json::json!({ "email": "ghost@example.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn resubscribe_reactivates_an_unsubscribed_email() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "alice@example.com" }))
        .await;
    test_app
        .post_unsubscribe(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    let response = test_app
        .post_resubscribe(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 200);

    let row = sqlx::query("SELECT is_active FROM subscribers")
        .fetch_one(&test_app.db_pool)
        .await
        .expect("Failed to fetch saved subscriber.");

    assert_eq!(row.get::<String, _>("is_active"), "true");
}

#[tokio::test]
async fn resubscribing_an_unknown_email_returns_404() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_resubscribe(serde_json::json!({ "email": "ghost@example.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn list_subscribers_only_returns_active_ones() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "active@example.com" }))
        .await;
    test_app
        .post_subscription(serde_json::json!({ "email": "inactive@example.com" }))
        .await;
    test_app
        .post_unsubscribe(serde_json::json!({ "email": "inactive@example.com" }))
        .await;

    let response = test_app.get_subscribers("").await;
    assert_eq!(response.status().as_u16(), 200);

    let subscribers: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["email"], "active@example.com");
    assert_eq!(subscribers[0]["isActive"], true);
}

#[tokio::test]
async fn list_subscribers_filters_by_preference() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "stories@example.com" }))
        .await;
    test_app
        .post_subscription(serde_json::json!({
            "email": "no-stories@example.com",
            "preferences": { "stories": false }
        }))
        .await;

    let response = test_app.get_subscribers("?preference=stories").await;
    assert_eq!(response.status().as_u16(), 200);

    let subscribers: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["email"], "stories@example.com");
}

#[tokio::test]
async fn list_subscribers_rejects_an_unknown_preference() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get_subscribers("?preference=puppies").await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn deleting_a_subscriber_removes_the_record() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "alice@example.com" }))
        .await;

    let response = test_app.delete_subscriber("alice@example.com").await;
    assert_eq!(response.status().as_u16(), 204);

    let repeat = test_app.delete_subscriber("alice@example.com").await;
    assert_eq!(repeat.status().as_u16(), 404);
}
