//! Author subscriptions.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("author not found")]
    UnknownAuthor,
    #[error("not following this author")]
    NotFollowing,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself is silently ignored.
    SelfFollow,
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
        viewer_id: i64,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(username).await?;
        if author.id == viewer_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.follows.follow(viewer_id, author.id).await? {
            info!(
                target = "yatube::follows",
                user_id = viewer_id,
                author_id = author.id,
                "follow created"
            );
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    pub async fn unfollow(&self, viewer_id: i64, username: &str) -> Result<(), FollowError> {
        let author = self.author(username).await?;
        if !self.follows.unfollow(viewer_id, author.id).await? {
            return Err(FollowError::NotFollowing);
        }
        info!(
            target = "yatube::follows",
            user_id = viewer_id,
            author_id = author.id,
            "follow removed"
        );
        Ok(())
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownAuthor)
    }
}
