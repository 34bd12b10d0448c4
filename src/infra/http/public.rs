use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{
    application::error::HttpError,
    infra::assets::{media_response, not_found_response, sanitize_path},
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, LayoutContext, NavSection,
        render_template_response,
    },
};

use super::{HttpState, MaybeViewer, chrome_for, db_health_response, not_found};

const SOURCE: &str = "infra::http::public";

pub async fn about_author(viewer: MaybeViewer) -> Response {
    let chrome = chrome_for(viewer.0.as_ref()).with_active(NavSection::AboutAuthor);
    let view = LayoutContext::new(chrome, "About the author", ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

pub async fn about_tech(viewer: MaybeViewer) -> Response {
    let chrome = chrome_for(viewer.0.as_ref()).with_active(NavSection::AboutTech);
    let view = LayoutContext::new(chrome, "Technologies", ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

pub async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    let Some(stored_path) = sanitize_path(&path) else {
        return not_found_response(SOURCE, "Upload not found");
    };

    match state.upload_storage.read(stored_path).await {
        Ok(bytes) => media_response(bytes, stored_path),
        Err(err) if err.is_missing() => not_found_response(SOURCE, "Upload not found"),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %stored_path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                &err,
            )
            .into_response()
        }
    }
}

pub async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

pub async fn fallback(viewer: MaybeViewer) -> Response {
    not_found(chrome_for(viewer.0.as_ref()), SOURCE, "No route matched")
}
