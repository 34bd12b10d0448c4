use crate::application::{
    accounts::{PasswordChangeErrors, SignupErrors, SignupForm},
    error::{ErrorReport, HttpError},
    feed::{GroupFeed, PostDetail, ProfileFeed},
    pagination::Page,
    posts::PostFormErrors,
};
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry, UserRecord};
use crate::domain::posts::{format_human_date, format_human_datetime, headline};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

pub const SITE_TITLE: &str = "Yatube";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Navigation entry highlighted in the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NavSection {
    #[default]
    None,
    Index,
    Follow,
    Create,
    AboutAuthor,
    AboutTech,
    Login,
    Signup,
    PasswordChange,
}

impl NavSection {
    pub fn key(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Index => "index",
            Self::Follow => "follow",
            Self::Create => "create",
            Self::AboutAuthor => "about_author",
            Self::AboutTech => "about_tech",
            Self::Login => "login",
            Self::Signup => "signup",
            Self::PasswordChange => "password_change",
        }
    }
}

/// The logged-in user as shown in the header.
#[derive(Clone, Debug)]
pub struct ViewerView {
    pub username: String,
    pub full_name: String,
}

impl From<&UserRecord> for ViewerView {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            full_name: user.display_name(),
        }
    }
}

/// Per-request header state shared by every page.
#[derive(Clone, Debug, Default)]
pub struct LayoutChrome {
    pub viewer: Option<ViewerView>,
    pub active: NavSection,
}

impl LayoutChrome {
    pub fn new(viewer: Option<ViewerView>) -> Self {
        Self {
            viewer,
            active: NavSection::None,
        }
    }

    pub fn with_active(mut self, active: NavSection) -> Self {
        self.active = active;
        self
    }
}

pub struct LayoutContext<T> {
    pub site_title: &'static str,
    pub title: String,
    pub viewer: Option<ViewerView>,
    pub active: NavSection,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, title: impl Into<String>, content: T) -> Self {
        Self {
            site_title: SITE_TITLE,
            title: title.into(),
            viewer: chrome.viewer,
            active: chrome.active,
            content,
        }
    }

    /// CSS class for a header link, `"active"` on the current section.
    pub fn nav_class(&self, key: &str) -> &'static str {
        if self.active.key() == key { "active" } else { "" }
    }
}

/// Public URL of a stored upload.
pub fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

#[derive(Clone, Debug)]
pub struct GroupLinkView {
    pub slug: String,
    pub title: String,
}

#[derive(Clone, Debug)]
pub struct PostCardView {
    pub id: i64,
    pub text: String,
    pub headline: String,
    pub pub_date: String,
    pub iso_date: String,
    pub author_username: String,
    pub author_name: String,
    pub group: Option<GroupLinkView>,
    pub image_url: Option<String>,
}

impl From<&PostEntry> for PostCardView {
    fn from(entry: &PostEntry) -> Self {
        let post = &entry.post;
        Self {
            id: post.id,
            text: post.text.clone(),
            headline: headline(&post.text).to_string(),
            pub_date: format_human_date(post.pub_date),
            iso_date: post
                .pub_date
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            author_username: entry.author.username.clone(),
            author_name: entry.author.full_name.clone(),
            group: entry.group.as_ref().map(|group| GroupLinkView {
                slug: group.slug.clone(),
                title: group.title.clone(),
            }),
            image_url: post.has_image().then(|| media_url(&post.image)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLink {
    pub number: u64,
    pub current: bool,
}

#[derive(Clone, Debug)]
pub struct PaginatorView {
    pub number: u64,
    pub num_pages: u64,
    pub has_other_pages: bool,
    pub previous: Option<u64>,
    pub next: Option<u64>,
    pub pages: Vec<PageLink>,
}

impl<T> From<&Page<T>> for PaginatorView {
    fn from(page: &Page<T>) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages,
            has_other_pages: page.has_other_pages(),
            previous: page.previous_number(),
            next: page.next_number(),
            pages: page
                .page_range()
                .map(|number| PageLink {
                    number,
                    current: number == page.number,
                })
                .collect(),
        }
    }
}

/// Posts of one listing page plus the paginator for it.
pub struct PostListView {
    pub posts: Vec<PostCardView>,
    pub paginator: PaginatorView,
    pub total: u64,
}

impl From<&Page<PostEntry>> for PostListView {
    fn from(page: &Page<PostEntry>) -> Self {
        Self {
            posts: page.items.iter().map(PostCardView::from).collect(),
            paginator: PaginatorView::from(page),
            total: page.total,
        }
    }
}

pub struct IndexContext {
    pub heading: &'static str,
    pub list: PostListView,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<IndexContext>,
}

pub struct GroupContext {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub list: PostListView,
}

impl From<&GroupFeed> for GroupContext {
    fn from(feed: &GroupFeed) -> Self {
        Self {
            title: feed.group.title.clone(),
            slug: feed.group.slug.clone(),
            description: feed.group.description.clone(),
            list: PostListView::from(&feed.posts),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupContext>,
}

pub struct ProfileContext {
    pub username: String,
    pub full_name: String,
    pub posts_count: u64,
    pub following: bool,
    /// Follow controls are shown to logged-in visitors of someone else's profile.
    pub show_follow: bool,
    pub list: PostListView,
}

impl ProfileContext {
    pub fn new(feed: &ProfileFeed, viewer_logged_in: bool) -> Self {
        Self {
            username: feed.author.username.clone(),
            full_name: feed.author.display_name(),
            posts_count: feed.posts_count,
            following: feed.following,
            show_follow: viewer_logged_in && !feed.is_self,
            list: PostListView::from(&feed.posts),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

#[derive(Clone, Debug)]
pub struct CommentView {
    pub author_username: String,
    pub author_name: String,
    pub text: String,
    pub created: String,
}

impl From<&CommentEntry> for CommentView {
    fn from(entry: &CommentEntry) -> Self {
        Self {
            author_username: entry.author.username.clone(),
            author_name: entry.author.full_name.clone(),
            text: entry.comment.text.clone(),
            created: format_human_datetime(entry.comment.created),
        }
    }
}

pub struct PostDetailContext {
    pub post: PostCardView,
    pub author_posts_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

impl PostDetailContext {
    pub fn new(detail: &PostDetail, viewer_id: Option<i64>) -> Self {
        Self {
            post: PostCardView::from(&detail.entry),
            author_posts_count: detail.author_posts_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            can_edit: viewer_id == Some(detail.entry.author.id),
            can_comment: viewer_id.is_some(),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Clone, Debug)]
pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormContext {
    pub is_edit: bool,
    pub post_id: Option<i64>,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub no_group_selected: bool,
    pub current_image: Option<String>,
    pub errors: PostFormErrors,
}

impl PostFormContext {
    /// Form state for create (`post_id` is `None`) or edit.
    pub fn new(
        post_id: Option<i64>,
        text: String,
        selected_group: &str,
        groups: &[GroupRecord],
        current_image: Option<&str>,
        errors: PostFormErrors,
    ) -> Self {
        let selected_group = selected_group.trim();
        let groups: Vec<GroupOption> = groups
            .iter()
            .map(|group| GroupOption {
                id: group.id,
                title: group.title.clone(),
                selected: group.id.to_string() == selected_group,
            })
            .collect();
        let no_group_selected = !groups.iter().any(|group| group.selected);

        Self {
            is_edit: post_id.is_some(),
            post_id,
            text,
            groups,
            no_group_selected,
            current_image: current_image
                .filter(|path| !path.is_empty())
                .map(media_url),
            errors,
        }
    }

    pub fn action(&self) -> String {
        match self.post_id {
            Some(id) => format!("/posts/{id}/edit/"),
            None => "/create/".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

#[derive(Default)]
pub struct SignupContext {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: SignupErrors,
}

impl SignupContext {
    pub fn from_form(form: &SignupForm, errors: SignupErrors) -> Self {
        Self {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            errors,
        }
    }
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

#[derive(Default)]
pub struct LoginContext {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Default)]
pub struct PasswordChangeContext {
    pub errors: PasswordChangeErrors,
}

#[derive(Template)]
#[template(path = "users/password_change_form.html")]
pub struct PasswordChangeTemplate {
    pub view: LayoutContext<PasswordChangeContext>,
}

#[derive(Template)]
#[template(path = "users/password_change_done.html")]
pub struct PasswordChangeDoneTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub heading: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "core/error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
