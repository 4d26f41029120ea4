//! Post and comment mutations.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostListing, PostRecord, UserRecord};
use crate::domain::images::validate_image;
use crate::infra::uploads::{UploadStorage, UploadStorageError};

pub const REQUIRED_FIELD: &str = "This field is required.";
pub const INVALID_GROUP: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// An image file received with a post form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Raw values submitted through the create/edit form.
#[derive(Debug, Clone, Default)]
pub struct PostSubmission {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
    pub clear_image: bool,
}

impl PostSubmission {
    /// Pre-filled values for editing an existing post.
    pub fn from_post(post: &PostRecord) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()),
            image: None,
            clear_image: false,
        }
    }

    pub fn selected_group(&self) -> Option<&str> {
        self.group
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormErrors {
    pub text: Option<&'static str>,
    pub group: Option<&'static str>,
    pub image: Option<&'static str>,
}

impl PostFormErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post form is invalid")]
    Invalid(PostFormErrors),
    #[error("post {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to store image: {0}")]
    Storage(#[from] UploadStorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentOutcome {
    Created(CommentRecord),
    /// Blank comments are discarded without an error.
    Discarded,
}

struct ValidatedPost {
    text: String,
    group_id: Option<i64>,
    image: Option<(ImageUpload, &'static str)>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            comments,
            uploads,
        }
    }

    /// Groups offered in the post form's select box.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn find_post(&self, id: i64) -> Result<PostListing, PostError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound(id))
    }

    pub async fn create_post(
        &self,
        author: &UserRecord,
        submission: PostSubmission,
    ) -> Result<PostRecord, PostError> {
        let validated = self.validate(submission).await?;
        let image = self.store_image(validated.image.as_ref()).await?;

        let params = CreatePostParams {
            author_id: author.id,
            text: validated.text,
            group_id: validated.group_id,
            image: image.clone(),
        };

        match self.writer.create_post(params).await {
            Ok(post) => {
                info!(
                    target = "blogvoyage::application::posts",
                    post_id = post.id,
                    author = %author.username,
                    "post created"
                );
                Ok(post)
            }
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                Err(err.into())
            }
        }
    }

    /// Apply an edit. The caller has already checked that the editor owns `existing`.
    pub async fn update_post(
        &self,
        existing: &PostRecord,
        submission: PostSubmission,
    ) -> Result<PostRecord, PostError> {
        let clear_image = submission.clear_image;
        let validated = self.validate(submission).await?;
        let uploaded = self.store_image(validated.image.as_ref()).await?;

        let image = match (&uploaded, clear_image) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => None,
            (None, false) => existing.image.clone(),
        };

        let params = UpdatePostParams {
            id: existing.id,
            text: validated.text,
            group_id: validated.group_id,
            image: image.clone(),
        };

        let updated = match self.writer.update_post(params).await {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(uploaded.as_deref()).await;
                return Err(match err {
                    RepoError::NotFound => PostError::NotFound(existing.id),
                    other => other.into(),
                });
            }
        };

        if existing.image.is_some() && existing.image != image {
            self.discard_image(existing.image.as_deref()).await;
        }

        Ok(updated)
    }

    pub async fn add_comment(
        &self,
        author: &UserRecord,
        post_id: i64,
        text: &str,
    ) -> Result<CommentOutcome, PostError> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(PostError::NotFound(post_id));
        }

        let text = text.trim();
        if text.is_empty() {
            debug!(
                target = "blogvoyage::application::posts",
                post_id,
                author = %author.username,
                "blank comment discarded"
            );
            return Ok(CommentOutcome::Discarded);
        }

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: author.id,
                text: text.to_string(),
            })
            .await?;
        Ok(CommentOutcome::Created(comment))
    }

    async fn validate(&self, submission: PostSubmission) -> Result<ValidatedPost, PostError> {
        let mut errors = PostFormErrors::default();

        let text = submission.text.trim();
        if text.is_empty() {
            errors.text = Some(REQUIRED_FIELD);
        }

        let group_id = match submission.selected_group() {
            None => None,
            Some(raw) => {
                let known = match raw.parse::<i64>() {
                    Ok(id) => self.groups.find_by_id(id).await?.map(|group| group.id),
                    Err(_) => None,
                };
                if known.is_none() {
                    errors.group = Some(INVALID_GROUP);
                }
                known
            }
        };

        let image = match submission.image {
            Some(upload) => match validate_image(&upload.bytes) {
                Ok(info) => Some((upload, info.extension)),
                Err(err) => {
                    errors.image = Some(err.field_message());
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(PostError::Invalid(errors));
        }

        Ok(ValidatedPost {
            text: text.to_string(),
            group_id,
            image,
        })
    }

    async fn store_image(
        &self,
        image: Option<&(ImageUpload, &'static str)>,
    ) -> Result<Option<String>, PostError> {
        match image {
            Some((upload, extension)) => {
                let stored = self
                    .uploads
                    .store_post_image(&upload.file_name, extension, upload.bytes.clone())
                    .await?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    async fn discard_image(&self, stored_path: Option<&str>) {
        let Some(path) = stored_path else {
            return;
        };
        if let Err(err) = self.uploads.delete(path).await {
            warn!(
                target = "blogvoyage::application::posts",
                path,
                error = %err,
                "failed to remove stored image"
            );
        }
    }
}
