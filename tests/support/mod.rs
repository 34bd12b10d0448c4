//! Shared harness for the HTTP tests: in-memory repositories behind the real
//! router, with uploads written to a temporary directory.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime, macros::datetime};
use tower::ServiceExt;

use yatube::application::{
    accounts::{AccountService, PasswordService},
    feed::FeedService,
    follows::FollowService,
    pagination::PageWindow,
    posts::PostService,
    repos::{
        CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
        CreateSessionParams, CreateUserParams, FollowsRepo, GroupsRepo, HealthRepo, PostScope,
        PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
    },
};
use yatube::cache::{CacheConfig, CacheState, INDEX_PAGE_PREFIX};
use yatube::domain::entities::{
    AuthorSummary, CommentEntry, CommentRecord, GroupRecord, GroupSummary, PostEntry, PostRecord,
    SessionRecord, UserRecord,
};
use yatube::infra::http::{HttpState, SessionCookie, build_router};
use yatube::infra::uploads::UploadStorage;

pub const PASSWORD: &str = "correct-horse-42";
pub const COOKIE_NAME: &str = "yatube_session";

/// A 2x1 GIF, the smallest payload the image check accepts.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

const EPOCH: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: BTreeSet<(i64, i64)>,
    sessions: Vec<SessionRecord>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps keep "newest first" deterministic.
    fn tick(&mut self) -> OffsetDateTime {
        let id = self.next_id();
        EPOCH + Duration::minutes(id)
    }

    fn entry(&self, post: &PostRecord) -> Option<PostEntry> {
        let author = self.users.iter().find(|user| user.id == post.author_id)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id))
            .map(GroupSummary::from);
        Some(PostEntry {
            post: post.clone(),
            author: AuthorSummary::from(author),
            group,
        })
    }

    fn in_scope(&self, post: &PostRecord, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(id) => post.group_id == Some(id),
            PostScope::Author(id) => post.author_id == id,
            PostScope::FollowedBy(user_id) => self.follows.contains(&(user_id, post.author_id)),
        }
    }
}

/// Every repository trait over one shared in-memory state.
#[derive(Default)]
pub struct MemoryRepos {
    state: Mutex<MemoryState>,
    pub healthy: std::sync::atomic::AtomicBool,
}

impl MemoryRepos {
    pub fn new() -> Arc<Self> {
        let repos = Self::default();
        repos
            .healthy
            .store(true, std::sync::atomic::Ordering::SeqCst);
        Arc::new(repos)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory state lock")
    }

    pub fn post_count(&self) -> usize {
        self.state().posts.len()
    }

    pub fn comment_count(&self) -> usize {
        self.state().comments.len()
    }

    pub fn session_count(&self) -> usize {
        self.state().sessions.len()
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.state().posts.iter().find(|post| post.id == id).cloned()
    }

    pub fn latest_post(&self) -> Option<PostRecord> {
        self.state().posts.iter().max_by_key(|post| post.id).cloned()
    }

    pub fn is_following(&self, user_id: i64, author_id: i64) -> bool {
        self.state().follows.contains(&(user_id, author_id))
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state();
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let date_joined = state.tick();
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            date_joined,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.state().users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepoError> {
        let mut state = self.state();
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepos {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.state().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.state().groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .state()
            .groups
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state();
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "post_groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: state.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_group(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state();
        state.groups.retain(|group| group.id != id);
        for post in state.posts.iter_mut().filter(|post| post.group_id == Some(id)) {
            post.group_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.state();
        Ok(state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .count() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PageWindow,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let state = self.state();
        let mut posts: Vec<&PostRecord> = state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .filter_map(|post| state.entry(post))
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let state = self.state();
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| state.entry(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state();
        let pub_date = state.tick();
        let post = PostRecord {
            id: state.next_id(),
            text: params.text,
            pub_date,
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state();
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state();
        state.posts.retain(|post| post.id != id);
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepos {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentEntry>, RepoError> {
        let state = self.state();
        let mut comments: Vec<CommentEntry> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter_map(|comment| {
                let author = state.users.iter().find(|user| user.id == comment.author_id)?;
                Some(CommentEntry {
                    comment: comment.clone(),
                    author: AuthorSummary::from(author),
                })
            })
            .collect();
        comments.sort_by(|a, b| a.comment.created.cmp(&b.comment.created));
        Ok(comments)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state();
        let created = state.tick();
        let comment = CommentRecord {
            id: state.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepos {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self.state().follows.contains(&(user_id, author_id)))
    }

    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self.state().follows.insert((user_id, author_id)))
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self.state().follows.remove(&(user_id, author_id)))
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepos {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state();
        let session = SessionRecord {
            id: state.next_id(),
            user_id: params.user_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self
            .state()
            .sessions
            .iter()
            .find(|session| session.prefix == prefix)
            .cloned())
    }

    async fn delete_session(&self, id: i64) -> Result<(), RepoError> {
        self.state().sessions.retain(|session| session.id != id);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.state();
        let before = state.sessions.len();
        state.sessions.retain(|session| !session.is_expired(now));
        Ok((before - state.sessions.len()) as u64)
    }

    async fn delete_other_sessions(&self, user_id: i64, keep_id: i64) -> Result<u64, RepoError> {
        let mut state = self.state();
        let before = state.sessions.len();
        state
            .sessions
            .retain(|session| session.user_id != user_id || session.id == keep_id);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepos {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Timeout)
        }
    }
}

/// The full router over in-memory repositories.
pub struct TestApp {
    pub router: Router,
    pub repos: Arc<MemoryRepos>,
    pub accounts: Arc<AccountService>,
    pub cache: Option<CacheState>,
    pub media: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(str::to_string))
            .collect()
    }

    /// `name=value` of the session cookie set by this response.
    pub fn session_cookie(&self) -> Option<String> {
        self.set_cookies().into_iter().find_map(|cookie| {
            let pair = cookie.split(';').next()?.trim().to_string();
            pair.starts_with(&format!("{COOKIE_NAME}=")).then_some(pair)
        })
    }
}

pub struct TestAppBuilder {
    per_page: u32,
    cache: bool,
    upload_limit: usize,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            per_page: 10,
            cache: false,
            upload_limit: 1024 * 1024,
        }
    }
}

impl TestAppBuilder {
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn with_cache(mut self) -> Self {
        self.cache = true;
        self
    }

    pub fn upload_limit(mut self, bytes: usize) -> Self {
        self.upload_limit = bytes;
        self
    }

    pub fn build(self) -> TestApp {
        let repos = MemoryRepos::new();
        let media = tempfile::tempdir().expect("temp media dir");
        let storage =
            Arc::new(UploadStorage::new(media.path().to_path_buf()).expect("upload storage"));

        let feed = FeedService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
        )
        .with_per_page(self.per_page);
        let posts = PostService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            storage.clone(),
        );
        let follows = FollowService::new(repos.clone(), repos.clone());
        let accounts = Arc::new(
            AccountService::new(repos.clone(), repos.clone())
                .with_passwords(PasswordService::with_cost(64, 1).expect("argon2 params")),
        );
        let cache = self
            .cache
            .then(|| CacheState::new(CacheConfig::default(), INDEX_PAGE_PREFIX));

        let state = HttpState {
            feed: Arc::new(feed),
            posts: Arc::new(posts),
            follows: Arc::new(follows),
            accounts: accounts.clone(),
            health: repos.clone(),
            upload_storage: storage,
            cache: cache.clone(),
            session_cookie: SessionCookie::new(COOKIE_NAME, false, Duration::hours(336)),
            upload_limit_bytes: self.upload_limit,
        };

        TestApp {
            router: build_router(state),
            repos,
            accounts,
            cache,
            media,
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        TestAppBuilder::default().build()
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::default()
    }

    pub async fn create_user(&self, username: &str) -> UserRecord {
        self.accounts
            .create_user(username, PASSWORD, "")
            .await
            .expect("user should be created")
    }

    /// Log `username` in and return the `Cookie` header value.
    pub async fn login(&self, username: &str) -> String {
        let issued = self
            .accounts
            .login(username, PASSWORD)
            .await
            .expect("login should succeed");
        format!("{COOKIE_NAME}={}", issued.token)
    }

    pub async fn create_group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: format!("About {title}"),
            })
            .await
            .expect("group should be created")
    }

    pub async fn create_post(&self, author: &UserRecord, text: &str, group: Option<i64>) -> PostRecord {
        self.repos
            .create_post(CreatePostParams {
                author_id: author.id,
                text: text.to_string(),
                group_id: group,
                image: String::new(),
            })
            .await
            .expect("post should be created")
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        read_response(response).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request should build"))
            .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(
            builder
                .body(Body::from(body.to_string()))
                .expect("request should build"),
        )
        .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        form: MultipartBody,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, form.content_type());
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.finish())).expect("request should build"))
            .await
    }
}

async fn read_response(response: Response<Body>) -> TestResponse {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// Minimal `multipart/form-data` encoder for the post form.
pub struct MultipartBody {
    boundary: &'static str,
    body: Vec<u8>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self {
            boundary: "yatube-test-boundary",
            body: Vec::new(),
        }
    }
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}
