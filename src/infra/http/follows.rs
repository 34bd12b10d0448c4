use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};

use super::{HttpState, RequireViewer, chrome_for, error_response, posts::profile_path};

pub async fn follow(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(viewer.user.id, &username).await {
        Ok(_) => Redirect::to(&profile_path(&username)).into_response(),
        Err(err) => error_response(chrome_for(Some(&viewer)), err),
    }
}

pub async fn unfollow(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(viewer.user.id, &username).await {
        Ok(()) => Redirect::to(&profile_path(&username)).into_response(),
        Err(err) => error_response(chrome_for(Some(&viewer)), err),
    }
}
