//! Write side of posts: authoring, editing, deleting and commenting.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostEntry, PostRecord};
use crate::domain::posts::{validate_comment_text, validate_image, validate_post_text};
use crate::infra::uploads::{UploadStorage, UploadStorageError};

const POST_IMAGE_DIRECTORY: &str = "posts";

/// Image file received with a post form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Raw values submitted through the post form.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Group id as submitted; empty means "no group".
    pub group: String,
    pub image: Option<ImageUpload>,
    pub clear_image: bool,
}

/// Per-field messages for a rejected post form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormErrors {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<String>,
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
    #[error("comment is invalid: {0}")]
    InvalidComment(String),
    #[error("post not found")]
    NotFound,
    #[error("only the author may change this post")]
    Forbidden,
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Storage(#[from] UploadStorageError),
}

struct ValidatedPost {
    text: String,
    group_id: Option<i64>,
    image: Option<ImageUpload>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writes: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    storage: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writes: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        storage: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            writes,
            groups,
            comments,
            storage,
        }
    }

    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        self.groups.list_groups().await.map_err(PostError::from)
    }

    pub async fn create(&self, author_id: i64, form: PostForm) -> Result<PostRecord, PostError> {
        let validated = self.validate(form).await?;

        let image = match validated.image.as_ref() {
            Some(upload) => self.store_image(upload).await?,
            None => String::new(),
        };

        let result = self
            .writes
            .create_post(CreatePostParams {
                author_id,
                text: validated.text,
                group_id: validated.group_id,
                image: image.clone(),
            })
            .await;

        match result {
            Ok(post) => {
                info!(
                    target = "yatube::posts",
                    post_id = post.id,
                    author_id,
                    has_image = post.has_image(),
                    "post created"
                );
                Ok(post)
            }
            Err(err) => {
                self.discard_image(&image).await;
                Err(err.into())
            }
        }
    }

    /// Load a post for editing by `viewer_id`.
    pub async fn editable(&self, viewer_id: i64, id: i64) -> Result<PostEntry, PostError> {
        let entry = self.posts.find_post(id).await?.ok_or(PostError::NotFound)?;
        if entry.author.id != viewer_id {
            return Err(PostError::Forbidden);
        }
        Ok(entry)
    }

    pub async fn update(
        &self,
        viewer_id: i64,
        id: i64,
        form: PostForm,
    ) -> Result<PostRecord, PostError> {
        let current = self.editable(viewer_id, id).await?;
        let clear_image = form.clear_image;
        let validated = self.validate(form).await?;

        let previous_image = current.post.image.clone();
        let (image, replaced) = match validated.image.as_ref() {
            Some(upload) => (self.store_image(upload).await?, true),
            None if clear_image => (String::new(), true),
            None => (previous_image.clone(), false),
        };

        let result = self
            .writes
            .update_post(UpdatePostParams {
                id,
                text: validated.text,
                group_id: validated.group_id,
                image: image.clone(),
            })
            .await;

        match result {
            Ok(post) => {
                if replaced && previous_image != image {
                    self.discard_image(&previous_image).await;
                }
                info!(target = "yatube::posts", post_id = id, "post updated");
                Ok(post)
            }
            Err(err) => {
                if replaced && image != previous_image {
                    self.discard_image(&image).await;
                }
                Err(err.into())
            }
        }
    }

    pub async fn delete(&self, viewer_id: i64, id: i64) -> Result<PostEntry, PostError> {
        let entry = self.editable(viewer_id, id).await?;
        self.writes.delete_post(id).await?;
        self.discard_image(&entry.post.image).await;
        info!(target = "yatube::posts", post_id = id, "post deleted");
        Ok(entry)
    }

    pub async fn add_comment(
        &self,
        author_id: i64,
        post_id: i64,
        text: &str,
    ) -> Result<CommentRecord, PostError> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(PostError::NotFound);
        }
        let text = validate_comment_text(text)
            .map_err(|err| PostError::InvalidComment(err.into_message()))?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text,
            })
            .await?;
        info!(
            target = "yatube::posts",
            post_id,
            comment_id = comment.id,
            "comment added"
        );
        Ok(comment)
    }

    async fn validate(&self, form: PostForm) -> Result<ValidatedPost, PostError> {
        let mut errors = PostFormErrors::default();

        let text = match validate_post_text(&form.text) {
            Ok(text) => text,
            Err(err) => {
                errors.text = Some(err.into_message());
                String::new()
            }
        };

        let group_id = match form.group.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) => match self.groups.find_group_by_id(id).await? {
                    Some(group) => Some(group.id),
                    None => {
                        errors.group = Some(invalid_choice());
                        None
                    }
                },
                Err(_) => {
                    errors.group = Some(invalid_choice());
                    None
                }
            },
        };

        if let Some(upload) = form.image.as_ref()
            && let Err(err) = validate_image(&upload.bytes)
        {
            errors.image = Some(err.into_message());
        }

        if !errors.is_empty() {
            return Err(PostError::Invalid(errors));
        }

        Ok(ValidatedPost {
            text,
            group_id,
            image: form.image,
        })
    }

    async fn store_image(&self, upload: &ImageUpload) -> Result<String, PostError> {
        let stored = self
            .storage
            .store(POST_IMAGE_DIRECTORY, &upload.filename, upload.bytes.clone())
            .await?;
        info!(
            target = "yatube::posts",
            path = %stored.stored_path,
            declared_type = %upload.content_type,
            size_bytes = stored.size_bytes,
            checksum = %stored.checksum,
            "post image stored"
        );
        Ok(stored.stored_path)
    }

    async fn discard_image(&self, stored_path: &str) {
        if stored_path.is_empty() {
            return;
        }
        if let Err(err) = self.storage.delete(stored_path).await {
            warn!(
                target = "yatube::posts",
                path = stored_path,
                error = %err,
                "failed to remove stored image"
            );
        }
    }
}

fn invalid_choice() -> String {
    "Select a valid choice. That choice is not one of the available choices.".to_string()
}
