use axum::{
    Extension,
    extract::{Path, RawQuery, State},
    http::{StatusCode, Uri},
    response::Response,
};

use crate::{
    application::{auth::Viewer, pagination::page_from_query},
    presentation::views::{FeedView, FollowTemplate, LayoutContext, render_template_response},
};

use super::{
    HttpState, auth_redirect, feed_error_response, follow_error_response, original_target,
    redirect_found,
};

const FOLLOW_PATH: &str = "/follow/";
const FOLLOW_HEADING: &str = "Posts from authors you follow";

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    RawQuery(query): RawQuery,
) -> Response {
    let user = match state.auth.require_user(&viewer, original_target(&uri)) {
        Ok(user) => user,
        Err(rejection) => return auth_redirect(rejection),
    };

    match state.feed.following(user, page_from_query(query.as_deref())).await {
        Ok(page) => {
            let view = LayoutContext::new("Following", FeedView::new(FOLLOW_HEADING, &page));
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    Path(username): Path<String>,
) -> Response {
    let user = match state.auth.require_user(&viewer, original_target(&uri)) {
        Ok(user) => user,
        Err(rejection) => return auth_redirect(rejection),
    };

    match state.follows.follow(user, &username).await {
        Ok(_) => redirect_found(FOLLOW_PATH),
        Err(err) => follow_error_response(err),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    Path(username): Path<String>,
) -> Response {
    let user = match state.auth.require_user(&viewer, original_target(&uri)) {
        Ok(user) => user,
        Err(rejection) => return auth_redirect(rejection),
    };

    match state.follows.unfollow(user, &username).await {
        Ok(()) => redirect_found(FOLLOW_PATH),
        Err(err) => follow_error_response(err),
    }
}
