//! Embedded static assets and stored media responses.

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::Mime;

use crate::application::error::ErrorReport;

static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

const STATIC_CACHE_CONTROL: &str = "public, max-age=86400";
const MEDIA_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Serve a file bundled from the `static/` directory.
pub async fn serve_static(path: Option<Path<String>>) -> Response {
    let captured = path.map(|Path(value)| value).unwrap_or_default();
    let Some(candidate) = sanitize_path(&captured) else {
        return not_found_response("infra::assets::serve_static", "Static asset not found");
    };

    match STATIC_ASSETS.get_file(candidate) {
        Some(file) => file_response(
            Bytes::from_static(file.contents()),
            candidate,
            STATIC_CACHE_CONTROL,
        ),
        None => not_found_response("infra::assets::serve_static", "Static asset not found"),
    }
}

/// Response for an uploaded file read back from storage.
///
/// Stored names are unique per upload, so they can be cached indefinitely.
pub fn media_response(bytes: Bytes, stored_path: &str) -> Response {
    file_response(bytes, stored_path, MEDIA_CACHE_CONTROL)
}

/// Strip a leading slash and reject directory paths and traversal.
pub(crate) fn sanitize_path(raw: &str) -> Option<&str> {
    let candidate = raw.trim_start_matches('/');
    if candidate.is_empty()
        || candidate.ends_with('/')
        || candidate.contains('\\')
        || candidate.split('/').any(|segment| segment == ".." || segment == ".")
    {
        return None;
    }
    Some(candidate)
}

pub(crate) fn not_found_response(source: &'static str, message: &'static str) -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, message).attach(&mut response);
    response
}

fn file_response(bytes: Bytes, path: &str, cache_control: &'static str) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    build_response(bytes, &mime, cache_control)
}

fn build_response(bytes: Bytes, mime: &Mime, cache_control: &'static str) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_traversal_and_directories() {
        assert_eq!(sanitize_path("/css/main.css"), Some("css/main.css"));
        assert_eq!(sanitize_path("css/"), None);
        assert_eq!(sanitize_path(""), None);
        assert_eq!(sanitize_path("../Cargo.toml"), None);
        assert_eq!(sanitize_path("css/../../secret"), None);
        assert_eq!(sanitize_path("css\\main.css"), None);
    }

    #[tokio::test]
    async fn serves_bundled_stylesheet() {
        let response = serve_static(Some(Path("css/main.css".to_string()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css"
        );
    }

    #[tokio::test]
    async fn unknown_asset_is_not_found() {
        let response = serve_static(Some(Path("css/missing.css".to_string()))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
