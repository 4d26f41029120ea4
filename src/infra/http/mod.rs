mod admin;
mod follows;
mod middleware;
mod posts;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use middleware::RequestContext;
pub use public::{HttpState, build_router};

use axum::http::{HeaderValue, StatusCode, Uri, header::LOCATION};
use axum::response::{IntoResponse, Response};

use crate::application::{
    auth::AuthRejection,
    error::{ErrorReport, HttpError},
    feed::FeedError,
    follows::FollowError,
    repos::RepoError,
};
use crate::presentation::views::render_not_found_response;

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

/// `302 Found` to `location`. Non-ASCII and control bytes are percent-encoded.
fn redirect_found(location: &str) -> Response {
    match HeaderValue::from_str(&encode_location(location)) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(err) => HttpError::from_error(
            "infra::http::redirect_found",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build redirect",
            &err,
        )
        .into_response(),
    }
}

fn encode_location(location: &str) -> String {
    let mut encoded = String::with_capacity(location.len());
    for byte in location.bytes() {
        if byte.is_ascii_graphic() {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn auth_redirect(rejection: AuthRejection) -> Response {
    redirect_found(rejection.location())
}

/// Path plus query string, used as the login `next` target.
fn original_target(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|value| value.as_str())
        .unwrap_or_else(|| uri.path())
}

/// Unparseable ids are treated like unknown ones.
fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn feed_error_response(err: FeedError) -> Response {
    match err {
        FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) | FeedError::UnknownPost(_) => {
            render_not_found_response()
        }
        other => HttpError::from(other).into_response(),
    }
}

fn follow_error_response(err: FollowError) -> Response {
    match err {
        FollowError::UnknownAuthor(_) | FollowError::NotFollowing { .. } => {
            render_not_found_response()
        }
        other => HttpError::from(other).into_response(),
    }
}
