//! Operator-side group management.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugError, derive_slug, validate_slug};

pub const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group title is required")]
    MissingTitle,
    #[error("group title exceeds {MAX_TITLE_CHARS} characters")]
    TitleTooLong,
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("group slug `{0}` is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { writer }
    }

    pub async fn create_group(&self, input: NewGroup) -> Result<GroupRecord, GroupError> {
        let params = prepare_group(input)?;
        let slug = params.slug.clone();

        let group = self
            .writer
            .create_group(params)
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => GroupError::SlugTaken(slug),
                other => other.into(),
            })?;

        info!(
            target = "blogvoyage::application::groups",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }
}

fn prepare_group(input: NewGroup) -> Result<CreateGroupParams, GroupError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(GroupError::MissingTitle);
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(GroupError::TitleTooLong);
    }

    let slug = match input
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(explicit) => {
            validate_slug(explicit)?;
            explicit.to_string()
        }
        None => derive_slug(title)?,
    };

    Ok(CreateGroupParams {
        title: title.to_string(),
        slug,
        description: input.description.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, slug: Option<&str>) -> NewGroup {
        NewGroup {
            title: title.to_string(),
            slug: slug.map(str::to_string),
            description: " Тестовое описание ".to_string(),
        }
    }

    #[test]
    fn derives_slug_when_missing() {
        let params = prepare_group(input("Тестовая группа", None)).expect("params");
        assert_eq!(params.slug, "testovaia-gruppa");
        assert_eq!(params.description, "Тестовое описание");
    }

    #[test]
    fn keeps_explicit_slug() {
        let params = prepare_group(input("Paginator", Some("Paginator_group"))).expect("params");
        assert_eq!(params.slug, "Paginator_group");
    }

    #[test]
    fn rejects_overlong_titles() {
        let title = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(matches!(
            prepare_group(input(&title, None)),
            Err(GroupError::TitleTooLong)
        ));
    }

    #[test]
    fn rejects_invalid_explicit_slug() {
        assert!(matches!(
            prepare_group(input("Title", Some("has space"))),
            Err(GroupError::Slug(SlugError::InvalidCharacters { .. }))
        ));
    }
}
