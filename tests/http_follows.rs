mod support;

use axum::http::StatusCode;
use support::TestApp;

#[tokio::test]
async fn following_an_author_fills_the_subscription_feed() {
    let app = TestApp::new();
    let leo = app.create_user("leo").await;
    let mia = app.create_user("mia").await;
    let kim = app.create_user("kim").await;
    app.create_post(&mia, "Mia writes", None).await;
    app.create_post(&kim, "Kim writes", None).await;
    let cookie = app.login("leo").await;

    let before = app.get("/follow/", Some(&cookie)).await;
    assert_eq!(before.status, StatusCode::OK);
    assert!(before.body.contains("No posts yet."));

    let response = app.get("/profile/mia/follow/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/profile/mia/"));
    assert!(app.repos.is_following(leo.id, mia.id));

    let feed = app.get("/follow/", Some(&cookie)).await;
    assert!(feed.body.contains("Mia writes"));
    assert!(!feed.body.contains("Kim writes"));
}

#[tokio::test]
async fn non_followers_do_not_see_new_posts() {
    let app = TestApp::new();
    app.create_user("leo").await;
    let mia = app.create_user("mia").await;
    app.create_user("kim").await;
    let leo_cookie = app.login("leo").await;
    let kim_cookie = app.login("kim").await;
    app.get("/profile/mia/follow/", Some(&leo_cookie)).await;

    app.create_post(&mia, "Fresh from mia", None).await;

    let follower = app.get("/follow/", Some(&leo_cookie)).await;
    assert!(follower.body.contains("Fresh from mia"));
    let stranger = app.get("/follow/", Some(&kim_cookie)).await;
    assert!(!stranger.body.contains("Fresh from mia"));
}

#[tokio::test]
async fn following_twice_keeps_one_subscription() {
    let app = TestApp::new();
    let leo = app.create_user("leo").await;
    let mia = app.create_user("mia").await;
    let cookie = app.login("leo").await;

    app.post_form("/profile/mia/follow/", "", Some(&cookie)).await;
    let again = app.get("/profile/mia/follow/", Some(&cookie)).await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
    assert!(app.repos.is_following(leo.id, mia.id));

    let profile = app.get("/profile/mia/", Some(&cookie)).await;
    assert!(profile.body.contains("Unfollow"));
}

#[tokio::test]
async fn following_yourself_is_ignored() {
    let app = TestApp::new();
    let leo = app.create_user("leo").await;
    let cookie = app.login("leo").await;

    let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/profile/leo/"));
    assert!(!app.repos.is_following(leo.id, leo.id));

    let profile = app.get("/profile/leo/", Some(&cookie)).await;
    assert!(!profile.body.contains("/profile/leo/follow/"));
}

#[tokio::test]
async fn unfollow_removes_the_subscription() {
    let app = TestApp::new();
    let leo = app.create_user("leo").await;
    let mia = app.create_user("mia").await;
    let cookie = app.login("leo").await;
    app.get("/profile/mia/follow/", Some(&cookie)).await;

    let response = app.get("/profile/mia/unfollow/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/profile/mia/"));
    assert!(!app.repos.is_following(leo.id, mia.id));

    let again = app.get("/profile/mia/unfollow/", Some(&cookie)).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn following_an_unknown_author_is_not_found() {
    let app = TestApp::new();
    app.create_user("leo").await;
    let cookie = app.login("leo").await;

    let response = app.get("/profile/ghost/follow/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subscriptions_require_login() {
    let app = TestApp::new();
    app.create_user("mia").await;

    let feed = app.get("/follow/", None).await;
    assert_eq!(feed.status, StatusCode::SEE_OTHER);
    assert_eq!(feed.location(), Some("/auth/login/?next=%2Ffollow%2F"));

    let follow = app.get("/profile/mia/follow/", None).await;
    assert_eq!(follow.status, StatusCode::SEE_OTHER);
    assert_eq!(
        follow.location(),
        Some("/auth/login/?next=%2Fprofile%2Fmia%2Ffollow%2F")
    );
}

#[tokio::test]
async fn redirects_to_non_ascii_profiles_are_percent_encoded() {
    let app = TestApp::new();
    let leo = app.create_user("leo").await;
    let author = app.create_user("Тест").await;
    let cookie = app.login("leo").await;
    let profile = "/profile/%D0%A2%D0%B5%D1%81%D1%82/";

    let response = app
        .get(&format!("{profile}follow/"), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some(profile));
    assert!(app.repos.is_following(leo.id, author.id));

    let page = app.get(profile, None).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Тест"));
}
