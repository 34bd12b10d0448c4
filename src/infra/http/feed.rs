use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};

use crate::presentation::views::{
    FollowTemplate, GroupContext, GroupTemplate, IndexContext, IndexTemplate, LayoutContext,
    NavSection, PostDetailContext, PostDetailTemplate, PostListView, ProfileContext,
    ProfileTemplate, render_template_response,
};

use super::{
    HttpState, MaybeViewer, RequireViewer, chrome_for, error_response, forms::PageQuery,
    not_found, parse_post_id,
};

const SOURCE: &str = "infra::http::feed";

pub const INDEX_HEADING: &str = "Latest updates";
pub const FOLLOW_HEADING: &str = "Your subscriptions";

pub async fn index(
    State(state): State<HttpState>,
    viewer: MaybeViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = chrome_for(viewer.0.as_ref()).with_active(NavSection::Index);

    match state.feed.index(query.page.as_deref()).await {
        Ok(page) => {
            let content = IndexContext {
                heading: INDEX_HEADING,
                list: PostListView::from(&page),
            };
            let view = LayoutContext::new(chrome, INDEX_HEADING, content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(chrome, err),
    }
}

pub async fn group_posts(
    State(state): State<HttpState>,
    viewer: MaybeViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = chrome_for(viewer.0.as_ref());

    match state.feed.group_posts(&slug, query.page.as_deref()).await {
        Ok(Some(feed)) => {
            let content = GroupContext::from(&feed);
            let title = format!("Posts of the group {}", feed.group);
            let view = LayoutContext::new(chrome, title, content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Ok(None) => not_found(chrome, SOURCE, "Unknown group"),
        Err(err) => error_response(chrome, err),
    }
}

pub async fn profile(
    State(state): State<HttpState>,
    viewer: MaybeViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = chrome_for(viewer.0.as_ref());

    match state
        .feed
        .profile(&username, viewer.id(), query.page.as_deref())
        .await
    {
        Ok(Some(feed)) => {
            let content = ProfileContext::new(&feed, viewer.0.is_some());
            let title = format!("Profile of {}", feed.author.display_name());
            let view = LayoutContext::new(chrome, title, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Ok(None) => not_found(chrome, SOURCE, "Unknown author"),
        Err(err) => error_response(chrome, err),
    }
}

pub async fn post_detail(
    State(state): State<HttpState>,
    viewer: MaybeViewer,
    Path(id): Path<String>,
) -> Response {
    let chrome = chrome_for(viewer.0.as_ref());
    let Some(id) = parse_post_id(&id) else {
        return not_found(chrome, SOURCE, "Unknown post");
    };

    match state.feed.post_detail(id).await {
        Ok(Some(detail)) => {
            let title = format!("Post {}", detail.entry.post);
            let content = PostDetailContext::new(&detail, viewer.id());
            let view = LayoutContext::new(chrome, title, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Ok(None) => not_found(chrome, SOURCE, "Unknown post"),
        Err(err) => error_response(chrome, err),
    }
}

pub async fn follow_index(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = chrome_for(Some(&viewer)).with_active(NavSection::Follow);

    match state
        .feed
        .follow_feed(viewer.user.id, query.page.as_deref())
        .await
    {
        Ok(page) => {
            let content = IndexContext {
                heading: FOLLOW_HEADING,
                list: PostListView::from(&page),
            };
            let view = LayoutContext::new(chrome, FOLLOW_HEADING, content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(chrome, err),
    }
}
