//! Group management used by the operator CLI.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugError, derive_slug, validate_slug};

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group title must not be empty")]
    EmptyTitle,
    #[error("group title must be at most {MAX_TITLE_CHARS} characters")]
    TitleTooLong,
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("a group with slug `{0}` already exists")]
    DuplicateSlug(String),
    #[error("group `{0}` not found")]
    UnknownGroup(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupsRepo>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupsRepo>) -> Self {
        Self { groups }
    }

    /// Create a group; the slug is derived from the title when not given.
    pub async fn create(
        &self,
        title: &str,
        slug: Option<&str>,
        description: &str,
    ) -> Result<GroupRecord, GroupError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(GroupError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(GroupError::TitleTooLong);
        }

        let slug = match slug {
            Some(raw) => validate_slug(raw)?,
            None => derive_slug(title)?,
        };

        let group = self
            .groups
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.clone(),
                description: description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => GroupError::DuplicateSlug(slug.clone()),
                other => GroupError::Repo(other),
            })?;

        info!(
            target = "yatube::groups",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn delete(&self, slug: &str) -> Result<GroupRecord, GroupError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| GroupError::UnknownGroup(slug.to_string()))?;
        self.groups.delete_group(group.id).await?;
        info!(
            target = "yatube::groups",
            group_id = group.id,
            slug = %group.slug,
            "group deleted"
        );
        Ok(group)
    }
}
