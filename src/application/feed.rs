//! Read side of the site: every page that lists or shows posts.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{DEFAULT_POSTS_PER_PAGE, Page, PageWindow};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct GroupFeed {
    pub group: GroupRecord,
    pub posts: Page<PostEntry>,
}

pub struct ProfileFeed {
    pub author: UserRecord,
    pub posts: Page<PostEntry>,
    pub posts_count: u64,
    pub following: bool,
    pub is_self: bool,
}

pub struct PostDetail {
    pub entry: PostEntry,
    pub author_posts_count: u64,
    pub comments: Vec<CommentEntry>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    comments: Arc<dyn CommentsRepo>,
    per_page: u32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            comments,
            per_page: DEFAULT_POSTS_PER_PAGE,
        }
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub async fn index(&self, page: Option<&str>) -> Result<Page<PostEntry>, FeedError> {
        self.paginate(PostScope::All, page).await
    }

    pub async fn group_posts(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<Option<GroupFeed>, FeedError> {
        let Some(group) = self.groups.find_group_by_slug(slug).await? else {
            return Ok(None);
        };
        let posts = self.paginate(PostScope::Group(group.id), page).await?;
        Ok(Some(GroupFeed { group, posts }))
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<i64>,
        page: Option<&str>,
    ) -> Result<Option<ProfileFeed>, FeedError> {
        let Some(author) = self.users.find_user_by_username(username).await? else {
            return Ok(None);
        };

        let posts = self.paginate(PostScope::Author(author.id), page).await?;
        let posts_count = posts.total;

        let following = match viewer {
            Some(viewer_id) if viewer_id != author.id => {
                self.follows.is_following(viewer_id, author.id).await?
            }
            _ => false,
        };
        let is_self = viewer == Some(author.id);

        Ok(Some(ProfileFeed {
            author,
            posts,
            posts_count,
            following,
            is_self,
        }))
    }

    pub async fn post_detail(&self, id: i64) -> Result<Option<PostDetail>, FeedError> {
        let Some(entry) = self.posts.find_post(id).await? else {
            return Ok(None);
        };

        let author_posts_count = self
            .posts
            .count_posts(PostScope::Author(entry.author.id))
            .await?;
        let comments = self.comments.list_comments(id).await?;

        Ok(Some(PostDetail {
            entry,
            author_posts_count,
            comments,
        }))
    }

    /// Posts by every author `viewer_id` follows.
    pub async fn follow_feed(
        &self,
        viewer_id: i64,
        page: Option<&str>,
    ) -> Result<Page<PostEntry>, FeedError> {
        self.paginate(PostScope::FollowedBy(viewer_id), page).await
    }

    async fn paginate(
        &self,
        scope: PostScope,
        page: Option<&str>,
    ) -> Result<Page<PostEntry>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let window = PageWindow::resolve(page, total, self.per_page);
        if total == 0 {
            return Ok(window.into_page(Vec::new()));
        }
        let items = self.posts.list_posts(scope, window).await?;
        Ok(window.into_page(items))
    }
}
