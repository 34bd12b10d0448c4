use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;
use url::form_urlencoded;

use crate::{
    application::{
        accounts::Viewer,
        posts::{PostError, PostForm, PostFormErrors},
    },
    domain::entities::PostEntry,
    presentation::views::{
        LayoutChrome, LayoutContext, NavSection, PostFormContext, PostFormTemplate,
        render_template_response,
    },
};

use super::{
    HttpState, RequireViewer, chrome_for, error_response,
    forms::{CommentPayload, read_post_form},
    not_found, parse_post_id,
};

const SOURCE: &str = "infra::http::posts";

pub async fn create_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
) -> Response {
    render_create_form(&state, &viewer, PostForm::default(), PostFormErrors::default()).await
}

pub async fn create_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    mut multipart: Multipart,
) -> Response {
    let form = match read_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let retained = PostForm {
        image: None,
        ..form.clone()
    };

    match state.posts.create(viewer.user.id, form).await {
        Ok(_) => Redirect::to(&profile_path(&viewer.user.username)).into_response(),
        Err(PostError::Invalid(errors)) => {
            render_create_form(&state, &viewer, retained, errors).await
        }
        Err(err) => error_response(chrome_for(Some(&viewer)), err),
    }
}

pub async fn edit_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
) -> Response {
    let chrome = chrome_for(Some(&viewer));
    let Some(id) = parse_post_id(&id) else {
        return not_found(chrome, SOURCE, "Unknown post");
    };

    match state.posts.editable(viewer.user.id, id).await {
        Ok(entry) => {
            let form = PostForm {
                text: entry.post.text.clone(),
                group: entry
                    .post
                    .group_id
                    .map(|group_id| group_id.to_string())
                    .unwrap_or_default(),
                ..PostForm::default()
            };
            render_edit_form(&state, chrome, &entry, form, PostFormErrors::default()).await
        }
        Err(PostError::Forbidden) => Redirect::to(&detail_path(id)).into_response(),
        Err(err) => error_response(chrome, err),
    }
}

pub async fn edit_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let chrome = chrome_for(Some(&viewer));
    let Some(id) = parse_post_id(&id) else {
        return not_found(chrome, SOURCE, "Unknown post");
    };
    let form = match read_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let retained = PostForm {
        image: None,
        ..form.clone()
    };

    match state.posts.update(viewer.user.id, id, form).await {
        Ok(_) => Redirect::to(&detail_path(id)).into_response(),
        Err(PostError::Invalid(errors)) => match state.posts.editable(viewer.user.id, id).await {
            Ok(entry) => render_edit_form(&state, chrome, &entry, retained, errors).await,
            Err(err) => error_response(chrome, err),
        },
        Err(PostError::Forbidden) => Redirect::to(&detail_path(id)).into_response(),
        Err(err) => error_response(chrome, err),
    }
}

pub async fn delete(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
) -> Response {
    let chrome = chrome_for(Some(&viewer));
    let Some(id) = parse_post_id(&id) else {
        return not_found(chrome, SOURCE, "Unknown post");
    };

    match state.posts.delete(viewer.user.id, id).await {
        Ok(entry) => Redirect::to(&profile_path(&entry.author.username)).into_response(),
        Err(PostError::Forbidden) => Redirect::to(&detail_path(id)).into_response(),
        Err(err) => error_response(chrome, err),
    }
}

pub async fn add_comment(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
    Form(payload): Form<CommentPayload>,
) -> Response {
    let chrome = chrome_for(Some(&viewer));
    let Some(id) = parse_post_id(&id) else {
        return not_found(chrome, SOURCE, "Unknown post");
    };

    match state.posts.add_comment(viewer.user.id, id, &payload.text).await {
        Ok(_) | Err(PostError::InvalidComment(_)) => Redirect::to(&detail_path(id)).into_response(),
        Err(err) => error_response(chrome, err),
    }
}

/// Usernames may hold non-ASCII letters, so the segment is percent-encoded.
pub(super) fn profile_path(username: &str) -> String {
    let segment: String = form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{segment}/")
}

pub(super) fn detail_path(id: i64) -> String {
    format!("/posts/{id}/")
}

async fn render_create_form(
    state: &HttpState,
    viewer: &Viewer,
    form: PostForm,
    errors: PostFormErrors,
) -> Response {
    let chrome = chrome_for(Some(viewer)).with_active(NavSection::Create);
    let groups = match state.posts.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return error_response(chrome, err),
    };

    let content = PostFormContext::new(None, form.text, &form.group, &groups, None, errors);
    let view = LayoutContext::new(chrome, "New post", content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

async fn render_edit_form(
    state: &HttpState,
    chrome: LayoutChrome,
    entry: &PostEntry,
    form: PostForm,
    errors: PostFormErrors,
) -> Response {
    let groups = match state.posts.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return error_response(chrome, err),
    };

    let content = PostFormContext::new(
        Some(entry.post.id),
        form.text,
        &form.group,
        &groups,
        Some(entry.post.image.as_str()),
        errors,
    );
    let view = LayoutContext::new(chrome, "Edit post", content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}
