use std::{io::ErrorKind, sync::Arc};

use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, RawQuery, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use tracing::error;

use crate::{
    application::{
        auth::{AuthGate, Viewer},
        error::HttpError,
        feed::FeedService,
        follows::FollowService,
        pagination::page_from_query,
        posts::PostService,
        repos::UsersRepo,
    },
    cache::{CacheState, index_cache_layer},
    infra::uploads::{UploadStorage, UploadStorageError},
    presentation::views::{
        FeedView, GroupTemplate, GroupView, IndexTemplate, LayoutContext, PostDetailTemplate,
        PostDetailView, ProfileTemplate, ProfileView, render_not_found_response,
        render_template_response,
    },
};

use super::{
    feed_error_response, follows,
    middleware::{log_responses, resolve_viewer, set_request_context},
    parse_post_id, posts,
};

const INDEX_HEADING: &str = "Latest updates";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub users: Arc<dyn UsersRepo>,
    pub auth: Arc<AuthGate>,
    pub session_cookie: Arc<str>,
    pub upload_storage: Arc<UploadStorage>,
    pub cache: Option<CacheState>,
}

pub fn build_router(state: HttpState, upload_body_limit: usize) -> Router {
    // Only the global index is cached.
    let index_routes = Router::new().route("/", get(index));
    let index_routes = if let Some(cache_state) = state.cache.clone() {
        index_routes.route_layer(middleware::from_fn_with_state(
            cache_state,
            index_cache_layer,
        ))
    } else {
        index_routes
    };

    let routes = Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route(
            "/profile/{username}/follow/",
            get(follows::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(follows::profile_unfollow),
        )
        .route("/follow/", get(follows::follow_index))
        .route("/posts/{id}/", get(post_detail))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_post_form).post(posts::edit_post_submit),
        )
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route(
            "/create/",
            get(posts::create_post_form).post(posts::create_post_submit),
        )
        .route("/media/{*path}", get(serve_upload));

    index_routes
        .merge(routes)
        .fallback(not_found)
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(upload_body_limit))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(state, resolve_viewer))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>, RawQuery(query): RawQuery) -> Response {
    match state.feed.index(page_from_query(query.as_deref())).await {
        Ok(page) => {
            let view = LayoutContext::new(INDEX_HEADING, FeedView::new(INDEX_HEADING, &page));
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    match state.feed.group(&slug, page_from_query(query.as_deref())).await {
        Ok(feed) => {
            let content = GroupView::from(&feed);
            let view = LayoutContext::new(content.title.clone(), content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err),
    }
}

async fn profile(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    match state
        .feed
        .profile(&username, &viewer, page_from_query(query.as_deref()))
        .await
    {
        Ok(feed) => {
            let content = ProfileView::new(&feed, viewer.user());
            let view = LayoutContext::new(format!("Profile of {}", content.username), content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response();
    };

    match state.feed.post_detail(post_id).await {
        Ok(detail) => {
            let view = LayoutContext::new(
                PostDetailView::page_title(&detail),
                PostDetailView::new(&detail, viewer.user()),
            );
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err),
    }
}

async fn not_found() -> Response {
    render_not_found_response()
}

async fn serve_upload(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_upload";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_upload_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Upload not found",
            "The requested upload is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Upload not found",
            "The requested upload is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    // Stored names are never reused.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
