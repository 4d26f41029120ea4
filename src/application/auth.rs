//! Request identity and the authorization gate for mutating endpoints.
//!
//! Authentication itself (credentials, session issuance) lives outside this
//! service. A request arrives either anonymous or bound to a user whose
//! session cookie resolved, and every mutation asks [`AuthGate`] before it
//! touches storage.

use url::form_urlencoded;

use crate::domain::entities::{PostRecord, UserRecord};

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(UserRecord),
}

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }
}

/// Why a request may not proceed, carrying where it should be sent instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// Anonymous caller; redirect to the login page with a `next` parameter.
    Login { location: String },
    /// Authenticated but not the owner; redirect to the resource.
    NotOwner { location: String },
}

impl AuthRejection {
    pub fn location(&self) -> &str {
        match self {
            AuthRejection::Login { location } | AuthRejection::NotOwner { location } => location,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    login_path: String,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH)
    }
}

impl AuthGate {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// `{login_path}?next={original}` with `original` percent-encoded except `/`.
    pub fn login_location(&self, original: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(original.as_bytes()).collect();
        let encoded = encoded.replace("%2F", "/");
        format!("{}?next={}", self.login_path, encoded)
    }

    pub fn require_user<'a>(
        &self,
        viewer: &'a Viewer,
        original: &str,
    ) -> Result<&'a UserRecord, AuthRejection> {
        viewer.user().ok_or_else(|| AuthRejection::Login {
            location: self.login_location(original),
        })
    }

    /// Only the author may edit a post; everyone else is sent back to it.
    pub fn authorize_edit(
        &self,
        user: &UserRecord,
        post: &PostRecord,
    ) -> Result<(), AuthRejection> {
        if post.author_id == user.id {
            Ok(())
        } else {
            Err(AuthRejection::NotOwner {
                location: post_detail_path(post.id),
            })
        }
    }
}

pub fn post_detail_path(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{username}/")
}
