use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    application::accounts::{AccountError, PasswordChangeErrors, SignupForm},
    presentation::views::{
        LayoutChrome, LayoutContext, LoggedOutTemplate, LoginContext, LoginTemplate, NavSection,
        PasswordChangeContext, PasswordChangeDoneTemplate, PasswordChangeTemplate, SignupContext,
        SignupTemplate, render_template_response,
    },
};

use super::{
    HttpState, MaybeViewer, RequireViewer, chrome_for, error_response,
    forms::{LoginPayload, NextQuery, PasswordChangePayload, SignupPayload},
    session::safe_next,
};

pub const INVALID_LOGIN_MESSAGE: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

const PASSWORD_CHANGE_DONE_PATH: &str = "/auth/password_change/done/";

pub async fn signup_form(viewer: MaybeViewer) -> Response {
    let chrome = chrome_for(viewer.0.as_ref()).with_active(NavSection::Signup);
    render_signup(chrome, SignupContext::default())
}

pub async fn signup_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(payload): Form<SignupPayload>,
) -> Response {
    let form = SignupForm::from(payload);

    match state.accounts.signup(form.clone()).await {
        Ok(issued) => {
            let jar = state.session_cookie.issue(jar, issued.token);
            (jar, Redirect::to("/")).into_response()
        }
        Err(AccountError::InvalidSignup(errors)) => {
            let chrome = LayoutChrome::default().with_active(NavSection::Signup);
            render_signup(chrome, SignupContext::from_form(&form, errors))
        }
        Err(err) => error_response(LayoutChrome::default(), err),
    }
}

pub async fn login_form(viewer: MaybeViewer, Query(query): Query<NextQuery>) -> Response {
    let chrome = chrome_for(viewer.0.as_ref()).with_active(NavSection::Login);
    let content = LoginContext {
        next: safe_next(query.next.as_deref())
            .unwrap_or_default()
            .to_string(),
        ..LoginContext::default()
    };
    render_login(chrome, content)
}

pub async fn login_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(payload): Form<LoginPayload>,
) -> Response {
    let next = safe_next(payload.next.as_deref()).map(str::to_string);

    match state
        .accounts
        .login(&payload.username, &payload.password)
        .await
    {
        Ok(issued) => {
            let jar = state.session_cookie.issue(jar, issued.token);
            let target = next.unwrap_or_else(|| "/".to_string());
            (jar, Redirect::to(&target)).into_response()
        }
        Err(AccountError::InvalidCredentials) => {
            let chrome = LayoutChrome::default().with_active(NavSection::Login);
            let content = LoginContext {
                username: payload.username,
                next: next.unwrap_or_default(),
                error: Some(INVALID_LOGIN_MESSAGE.to_string()),
            };
            render_login(chrome, content)
        }
        Err(err) => error_response(LayoutChrome::default(), err),
    }
}

pub async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(token) = state.session_cookie.token(&jar)
        && let Err(err) = state.accounts.logout(&token).await
    {
        return error_response(LayoutChrome::default(), err);
    }

    let jar = state.session_cookie.clear(jar);
    let view = LayoutContext::new(LayoutChrome::default(), "Logged out", ());
    let page = render_template_response(LoggedOutTemplate { view }, StatusCode::OK);
    (jar, page).into_response()
}

pub async fn password_change_form(RequireViewer(viewer): RequireViewer) -> Response {
    let chrome = chrome_for(Some(&viewer)).with_active(NavSection::PasswordChange);
    render_password_change(chrome, PasswordChangeErrors::default())
}

pub async fn password_change_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Form(payload): Form<PasswordChangePayload>,
) -> Response {
    let chrome = chrome_for(Some(&viewer)).with_active(NavSection::PasswordChange);

    match state
        .accounts
        .change_password(&viewer, payload.into())
        .await
    {
        Ok(()) => Redirect::to(PASSWORD_CHANGE_DONE_PATH).into_response(),
        Err(AccountError::InvalidPasswordChange(errors)) => render_password_change(chrome, errors),
        Err(err) => error_response(chrome, err),
    }
}

pub async fn password_change_done(RequireViewer(viewer): RequireViewer) -> Response {
    let chrome = chrome_for(Some(&viewer)).with_active(NavSection::PasswordChange);
    let view = LayoutContext::new(chrome, "Password changed", ());
    render_template_response(PasswordChangeDoneTemplate { view }, StatusCode::OK)
}

fn render_signup(chrome: LayoutChrome, content: SignupContext) -> Response {
    let view = LayoutContext::new(chrome, "Sign up", content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

fn render_login(chrome: LayoutChrome, content: LoginContext) -> Response {
    let view = LayoutContext::new(chrome, "Log in", content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn render_password_change(chrome: LayoutChrome, errors: PasswordChangeErrors) -> Response {
    let view = LayoutContext::new(chrome, "Change password", PasswordChangeContext { errors });
    render_template_response(PasswordChangeTemplate { view }, StatusCode::OK)
}
