//! Session cookie handling and the viewer extractors built on it.

use axum::{
    extract::FromRequestParts,
    http::{Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use url::form_urlencoded;

use crate::application::{accounts::Viewer, error::HttpError};
use crate::config::SessionSettings;

use super::{HttpState, middleware::RequestContext};

pub const LOGIN_PATH: &str = "/auth/login/";

/// Name and attributes of the cookie that carries the session token.
#[derive(Clone, Debug)]
pub struct SessionCookie {
    name: String,
    secure: bool,
    max_age: time::Duration,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, secure: bool, max_age: time::Duration) -> Self {
        Self {
            name: name.into(),
            secure,
            max_age,
        }
    }

    pub fn token(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn issue(&self, jar: CookieJar, token: String) -> CookieJar {
        let cookie = Cookie::build((self.name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(self.max_age);
        jar.add(cookie)
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((self.name.clone(), "")).path("/"))
    }
}

impl From<&SessionSettings> for SessionCookie {
    fn from(settings: &SessionSettings) -> Self {
        let max_age = time::Duration::try_from(settings.ttl).unwrap_or(time::Duration::WEEK);
        Self::new(settings.cookie_name.clone(), settings.secure_cookie, max_age)
    }
}

/// The logged-in user, if the request carries a live session.
#[derive(Clone, Debug)]
pub struct MaybeViewer(pub Option<Viewer>);

impl MaybeViewer {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|viewer| viewer.user.id)
    }
}

impl FromRequestParts<HttpState> for MaybeViewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<MaybeViewer>() {
            return Ok(resolved.clone());
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let viewer = match state.session_cookie.token(&jar) {
            Some(token) => state
                .accounts
                .authenticate(&token)
                .await
                .map_err(|err| HttpError::from(err).into_response())?,
            None => None,
        };

        if let (Some(viewer), Some(ctx)) = (&viewer, parts.extensions.get::<RequestContext>()) {
            ctx.record_viewer(viewer.user.id);
        }

        let resolved = Self(viewer);
        parts.extensions.insert(resolved.clone());
        Ok(resolved)
    }
}

/// A logged-in user; anonymous requests are sent to the login page.
#[derive(Clone, Debug)]
pub struct RequireViewer(pub Viewer);

impl FromRequestParts<HttpState> for RequireViewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeViewer(viewer) = MaybeViewer::from_request_parts(parts, state).await?;
        match viewer {
            Some(viewer) => Ok(Self(viewer)),
            None => Err(login_redirect(&parts.uri).into_response()),
        }
    }
}

pub fn login_redirect(uri: &Uri) -> Redirect {
    let next = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or_else(|| uri.path());
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    Redirect::to(&format!("{LOGIN_PATH}?next={encoded}"))
}

/// Accept only same-site absolute paths as a post-login destination.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let is_local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    is_local.then_some(next)
}
