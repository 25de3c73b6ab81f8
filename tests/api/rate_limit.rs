use std::time::Duration;

use serde_json::Value;

use crate::helper::spawn_app_with;

fn subscription(i: usize) -> String {
    format!(r#"{{"email": "trainer{}@mail.com", "consentGiven": true}}"#, i)
}

#[tokio::test]
async fn sixth_subscription_within_the_window_returns_429() {
    let app = spawn_app_with(|_| {}).await;

    for i in 0..5 {
        let response = app.post_subscribers(&subscription(i)).await;
        assert_eq!(201, response.status().as_u16(), "request {} failed", i + 1);
    }

    let response = app.post_subscribers(&subscription(5)).await;

    assert_eq!(429, response.status().as_u16());
    assert!(response.headers().contains_key("retry-after"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Too many requests. Please try again later.");
    assert_eq!(app.subscribers().await.len(), 5);
}

#[tokio::test]
async fn subscriptions_are_accepted_again_after_the_window() {
    let app = spawn_app_with(|config| config.rate_limit.subscription.window_secs = 2).await;

    for i in 0..5 {
        app.post_subscribers(&subscription(i)).await;
    }
    assert_eq!(429, app.post_subscribers(&subscription(5)).await.status().as_u16());

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(201, app.post_subscribers(&subscription(6)).await.status().as_u16());
}

#[tokio::test]
async fn forwarded_header_does_not_reset_the_limit() {
    let app = spawn_app_with(|config| config.rate_limit.subscription.permit_limit = 1).await;

    app.post_subscribers(&subscription(0)).await;
    let response = app
        .post_subscribers_forwarded_for(&subscription(1), "198.51.100.23")
        .await;

    assert_eq!(429, response.status().as_u16());
}

#[tokio::test]
async fn other_routes_use_the_general_limit() {
    let app = spawn_app_with(|config| config.rate_limit.general.permit_limit = 2).await;

    assert_eq!(200, app.get("/health").await.status().as_u16());
    assert_eq!(200, app.get("/").await.status().as_u16());
    assert_eq!(429, app.get("/health").await.status().as_u16());

    // the subscription budget is separate
    let body = r#"{"email": "bulbasaur@mail.com", "consentGiven": true}"#;
    assert_eq!(201, app.post_subscribers(body).await.status().as_u16());
}
