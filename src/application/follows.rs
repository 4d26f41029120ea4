//! Follow and unfollow mutations.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("`{user}` does not follow `{author}`")]
    NotFollowing { user: String, author: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollowIgnored,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        user: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.find_author(username).await?;

        if author.id == user.id {
            debug!(
                target = "blogvoyage::application::follows",
                user = %user.username,
                "self-follow ignored"
            );
            return Ok(FollowOutcome::SelfFollowIgnored);
        }

        if self.follows.is_following(user.id, author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        match self.follows.create_follow(user.id, author.id).await {
            Ok(_) => Ok(FollowOutcome::Created),
            // A concurrent request inserted the same pair first.
            Err(RepoError::Duplicate { .. }) => Ok(FollowOutcome::AlreadyFollowing),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn unfollow(&self, user: &UserRecord, username: &str) -> Result<(), FollowError> {
        let author = self.find_author(username).await?;

        if self.follows.delete_follow(user.id, author.id).await? {
            Ok(())
        } else {
            Err(FollowError::NotFollowing {
                user: user.username.clone(),
                author: author.username,
            })
        }
    }

    async fn find_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
