mod support;

use std::sync::atomic::Ordering;

use axum::http::{StatusCode, header};
use support::TestApp;

#[tokio::test]
async fn about_pages_render() {
    let app = TestApp::new();

    let author = app.get("/about/author/", None).await;
    assert_eq!(author.status, StatusCode::OK);
    assert!(author.body.contains("About the author"));

    let tech = app.get("/about/tech/", None).await;
    assert_eq!(tech.status, StatusCode::OK);
    assert!(tech.body.contains("Technologies"));
}

#[tokio::test]
async fn pages_are_html() {
    let app = TestApp::new();

    let response = app.get("/", None).await;
    let content_type = response
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/html"), "{content_type}");
}

#[tokio::test]
async fn stylesheet_is_served() {
    let app = TestApp::new();

    let response = app.get("/static/css/main.css", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/css"))
    );
}

#[tokio::test]
async fn unknown_routes_render_the_not_found_page() {
    let app = TestApp::new();
    app.create_user("leo").await;
    let cookie = app.login("leo").await;

    let anonymous = app.get("/no/such/page/", None).await;
    assert_eq!(anonymous.status, StatusCode::NOT_FOUND);
    assert!(anonymous.body.contains("Log in"));

    let logged_in = app.get("/no/such/page/", Some(&cookie)).await;
    assert_eq!(logged_in.status, StatusCode::NOT_FOUND);
    assert!(logged_in.body.contains("Signed in as"));
}

#[tokio::test]
async fn missing_media_is_not_found() {
    let app = TestApp::new();

    assert_eq!(
        app.get("/media/posts/2024/01/01/none.gif", None).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get("/media/../Cargo.toml", None).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn database_health_reflects_the_repository() {
    let app = TestApp::new();

    assert_eq!(app.get("/_health/db", None).await.status, StatusCode::NO_CONTENT);

    app.repos.healthy.store(false, Ordering::SeqCst);
    assert_eq!(
        app.get("/_health/db", None).await.status,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn navigation_marks_the_active_section() {
    let app = TestApp::new();

    let response = app.get("/about/tech/", None).await;
    assert!(response.body.contains("class=\"active\" href=\"/about/tech/\""));
    assert!(!response.body.contains("class=\"active\" href=\"/about/author/\""));
}
