mod accounts;
mod feed;
mod follows;
mod forms;
mod middleware;
mod posts;
mod public;
mod session;

pub use session::{MaybeViewer, RequireViewer, SessionCookie};

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    application::{
        accounts::AccountService,
        error::{ErrorReport, HttpError},
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{HealthRepo, RepoError},
    },
    cache::{CacheState, response_cache_layer},
    infra::uploads::UploadStorage,
    presentation::views::{LayoutChrome, ViewerView, render_not_found_response},
};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthRepo>,
    pub upload_storage: Arc<UploadStorage>,
    pub cache: Option<CacheState>,
    pub session_cookie: SessionCookie,
    pub upload_limit_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the index page is cached; its key varies with the Cookie header.
    let index_routes = Router::new().route("/", get(feed::index));
    let index_routes = if let Some(cache_state) = state.cache.clone() {
        index_routes.layer(axum_middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        index_routes
    };

    let post_form_routes = Router::new()
        .route("/create/", get(posts::create_form).post(posts::create_submit))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .layer(DefaultBodyLimit::max(state.upload_limit_bytes));

    let routes = Router::new()
        .route("/group/{slug}/", get(feed::group_posts))
        .route("/profile/{username}/", get(feed::profile))
        .route("/posts/{id}/", get(feed::post_detail))
        .route("/follow/", get(feed::follow_index))
        .route("/posts/{id}/delete/", post(posts::delete))
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route(
            "/profile/{username}/follow/",
            get(follows::follow).post(follows::follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(follows::unfollow).post(follows::unfollow),
        )
        .route(
            "/auth/signup/",
            get(accounts::signup_form).post(accounts::signup_submit),
        )
        .route(
            "/auth/login/",
            get(accounts::login_form).post(accounts::login_submit),
        )
        .route("/auth/logout/", get(accounts::logout).post(accounts::logout))
        .route(
            "/auth/password_change/",
            get(accounts::password_change_form).post(accounts::password_change_submit),
        )
        .route(
            "/auth/password_change/done/",
            get(accounts::password_change_done),
        )
        .route("/about/author/", get(public::about_author))
        .route("/about/tech/", get(public::about_tech))
        .route("/media/{*path}", get(public::serve_media))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .route("/_health/db", get(public::db_health));

    index_routes
        .merge(post_form_routes)
        .merge(routes)
        .fallback(public::fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

fn chrome_for(viewer: Option<&crate::application::accounts::Viewer>) -> LayoutChrome {
    LayoutChrome::new(viewer.map(|viewer| ViewerView::from(&viewer.user)))
}

/// Post ids in paths are plain decimal numbers; anything else is a 404.
fn parse_post_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn not_found(chrome: LayoutChrome, source: &'static str, message: &'static str) -> Response {
    let mut response = render_not_found_response(chrome);
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, message).attach(&mut response);
    response
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Render a service error, keeping the site chrome on 404s.
fn error_response(chrome: LayoutChrome, err: impl Into<HttpError>) -> Response {
    let err = err.into();
    if err.status() == StatusCode::NOT_FOUND {
        let mut response = render_not_found_response(chrome);
        let report = err.into_report();
        report.attach(&mut response);
        return response;
    }
    err.into_response()
}
