//! Create, edit and comment handlers.

use axum::{
    Extension, Form,
    extract::{
        Multipart, Path, State, multipart::MultipartRejection, rejection::FormRejection,
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    application::{
        auth::{Viewer, post_detail_path, profile_path},
        error::HttpError,
        posts::{CommentOutcome, ImageUpload, PostError, PostFormErrors, PostSubmission},
    },
    domain::entities::{PostListing, PostRecord, UserRecord},
    presentation::views::{
        LayoutContext, PostFormTemplate, PostFormView, render_not_found_response,
        render_template_response,
    },
};

use super::{HttpState, auth_redirect, original_target, parse_post_id, redirect_found};

const CREATE_PATH: &str = "/create/";
const SOURCE: &str = "infra::http::posts";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn create_post_form(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
) -> Response {
    if let Err(rejection) = state.auth.require_user(&viewer, original_target(&uri)) {
        return auth_redirect(rejection);
    }

    render_post_form(
        &state,
        &PostSubmission::default(),
        &PostFormErrors::default(),
        None,
    )
    .await
}

pub(super) async fn create_post_submit(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let user = match state.auth.require_user(&viewer, original_target(&uri)) {
        Ok(user) => user,
        Err(rejection) => return auth_redirect(rejection),
    };

    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(response) => return response,
    };

    match state.posts.create_post(user, submission.clone()).await {
        Ok(_) => redirect_found(&profile_path(&user.username)),
        Err(PostError::Invalid(errors)) => {
            render_post_form(&state, &submission, &errors, None).await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_post_form(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    Path(raw_id): Path<String>,
) -> Response {
    let user = match state.auth.require_user(&viewer, original_target(&uri)) {
        Ok(user) => user,
        Err(rejection) => return auth_redirect(rejection),
    };

    let listing = match load_editable(&state, user, &raw_id).await {
        Ok(listing) => listing,
        Err(response) => return response,
    };

    let submission = PostSubmission::from_post(&listing.post);
    render_post_form(
        &state,
        &submission,
        &PostFormErrors::default(),
        Some(&listing.post),
    )
    .await
}

pub(super) async fn edit_post_submit(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    Path(raw_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let user = match state.auth.require_user(&viewer, original_target(&uri)) {
        Ok(user) => user,
        Err(rejection) => return auth_redirect(rejection),
    };

    let listing = match load_editable(&state, user, &raw_id).await {
        Ok(listing) => listing,
        Err(response) => return response,
    };

    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(response) => return response,
    };

    match state
        .posts
        .update_post(&listing.post, submission.clone())
        .await
    {
        Ok(post) => redirect_found(&post_detail_path(post.id)),
        Err(PostError::Invalid(errors)) => {
            render_post_form(&state, &submission, &errors, Some(&listing.post)).await
        }
        Err(PostError::NotFound(_)) => render_not_found_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    Path(raw_id): Path<String>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> Response {
    let user = match state.auth.require_user(&viewer, original_target(&uri)) {
        Ok(user) => user,
        Err(rejection) => return auth_redirect(rejection),
    };

    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response();
    };

    let text = match form {
        Ok(Form(form)) => form.text,
        Err(rejection) => {
            debug!(
                target = "blogvoyage::http::posts",
                post_id,
                error = %rejection,
                "unreadable comment form treated as blank"
            );
            String::new()
        }
    };

    match state.posts.add_comment(user, post_id, &text).await {
        Ok(CommentOutcome::Created(_) | CommentOutcome::Discarded) => {
            redirect_found(&post_detail_path(post_id))
        }
        Err(PostError::NotFound(_)) => render_not_found_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Resolve the post named in the path and check that `user` may edit it.
async fn load_editable(
    state: &HttpState,
    user: &UserRecord,
    raw_id: &str,
) -> Result<PostListing, Response> {
    let Some(post_id) = parse_post_id(raw_id) else {
        return Err(render_not_found_response());
    };

    let listing = match state.posts.find_post(post_id).await {
        Ok(listing) => listing,
        Err(PostError::NotFound(_)) => return Err(render_not_found_response()),
        Err(err) => return Err(HttpError::from(err).into_response()),
    };

    state
        .auth
        .authorize_edit(user, &listing.post)
        .map_err(auth_redirect)?;

    Ok(listing)
}

async fn read_submission(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PostSubmission, Response> {
    let mut multipart = multipart.map_err(|rejection| {
        HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Expected a multipart form submission",
            &rejection,
        )
        .into_response()
    })?;

    let mut submission = PostSubmission::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Err(HttpError::from_error(
                    SOURCE,
                    StatusCode::BAD_REQUEST,
                    "Malformed form submission",
                    &err,
                )
                .into_response());
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|err| {
            HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Malformed form submission",
                &err,
            )
            .into_response()
        })?;

        match name.as_str() {
            "text" => submission.text = String::from_utf8_lossy(&data).into_owned(),
            "group" => submission.group = Some(String::from_utf8_lossy(&data).into_owned()),
            "image" => {
                let file_name = file_name.unwrap_or_default();
                // Browsers send an empty, unnamed part when no file was chosen.
                if !(file_name.is_empty() && data.is_empty()) {
                    submission.image = Some(ImageUpload {
                        file_name,
                        bytes: data,
                    });
                }
            }
            "image-clear" => submission.clear_image = true,
            _ => {}
        }
    }

    Ok(submission)
}

async fn render_post_form(
    state: &HttpState,
    submission: &PostSubmission,
    errors: &PostFormErrors,
    editing: Option<&PostRecord>,
) -> Response {
    let groups = match state.posts.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let (title, content) = match editing {
        Some(post) => (
            "Edit post",
            PostFormView::new(
                format!("{}edit/", post_detail_path(post.id)),
                submission,
                &groups,
                errors,
            )
            .editing(post.image.as_deref()),
        ),
        None => (
            "New post",
            PostFormView::new(CREATE_PATH, submission, &groups, errors),
        ),
    };

    let view = LayoutContext::new(title, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}
