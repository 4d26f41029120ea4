use crate::application::{
    auth::{post_detail_path, profile_path},
    error::{ErrorReport, HttpError},
    feed::{GroupFeed, PostDetail, ProfileFeed},
    pagination::NumberedPage,
    posts::{PostFormErrors, PostSubmission},
};
use crate::domain::{
    entities::{CommentListing, GroupRecord, PostListing, UserRecord},
    posts::{format_human_date, label, title},
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

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

pub fn render_not_found_response() -> Response {
    let view = LayoutContext::new("Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Page title plus the page-specific content handed to the base layout.
#[derive(Clone)]
pub struct LayoutContext<T> {
    pub page_title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(page_title: impl Into<String>, content: T) -> Self {
        Self {
            page_title: page_title.into(),
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLinkView {
    pub title: String,
    pub href: String,
}

impl From<&GroupRecord> for GroupLinkView {
    fn from(group: &GroupRecord) -> Self {
        Self {
            title: group.title.clone(),
            href: group_path(&group.slug),
        }
    }
}

#[derive(Clone)]
pub struct PostCardView {
    pub id: i64,
    pub text: String,
    pub label: String,
    pub author: String,
    pub author_href: String,
    pub pub_date: String,
    pub group: Option<GroupLinkView>,
    pub image_url: Option<String>,
    pub detail_href: String,
}

impl From<&PostListing> for PostCardView {
    fn from(listing: &PostListing) -> Self {
        let post = &listing.post;
        Self {
            id: post.id,
            text: post.text.clone(),
            label: label(&post.text).to_string(),
            author: listing.author.username.clone(),
            author_href: profile_path(&listing.author.username),
            pub_date: format_human_date(post.pub_date),
            group: listing.group.as_ref().map(GroupLinkView::from),
            image_url: post.image.as_deref().map(media_url),
            detail_href: post_detail_path(post.id),
        }
    }
}

/// Previous/next links for a numbered page. Links carry only the query string
/// so they resolve against whichever list route rendered them.
#[derive(Clone)]
pub struct PaginatorView {
    pub number: u64,
    pub num_pages: u64,
    pub first: Option<String>,
    pub previous: Option<String>,
    pub next: Option<String>,
    pub last: Option<String>,
}

impl PaginatorView {
    pub fn from_page<T>(page: &NumberedPage<T>) -> Self {
        let link = |number: u64| format!("?page={number}");
        Self {
            number: page.number,
            num_pages: page.num_pages,
            first: page.has_previous().then(|| link(1)),
            previous: page.previous_page_number().map(link),
            next: page.next_page_number().map(link),
            last: page.has_next().then(|| link(page.num_pages)),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.num_pages > 1
    }
}

#[derive(Clone)]
pub struct PostListView {
    pub posts: Vec<PostCardView>,
    pub paginator: PaginatorView,
}

impl PostListView {
    pub fn from_page(page: &NumberedPage<PostListing>) -> Self {
        Self {
            posts: page.items.iter().map(PostCardView::from).collect(),
            paginator: PaginatorView::from_page(page),
        }
    }
}

#[derive(Clone)]
pub struct FeedView {
    pub heading: &'static str,
    pub list: PostListView,
}

impl FeedView {
    pub fn new(heading: &'static str, page: &NumberedPage<PostListing>) -> Self {
        Self {
            heading,
            list: PostListView::from_page(page),
        }
    }
}

#[derive(Clone)]
pub struct GroupView {
    pub title: String,
    pub description: String,
    pub list: PostListView,
}

impl From<&GroupFeed> for GroupView {
    fn from(feed: &GroupFeed) -> Self {
        Self {
            title: feed.group.title.clone(),
            description: feed.group.description.clone(),
            list: PostListView::from_page(&feed.page),
        }
    }
}

#[derive(Clone)]
pub struct FollowActionView {
    pub href: String,
    pub label: &'static str,
    pub following: bool,
}

#[derive(Clone)]
pub struct ProfileView {
    pub username: String,
    pub post_count: u64,
    pub follow_action: Option<FollowActionView>,
    pub list: PostListView,
}

impl ProfileView {
    /// The follow toggle is offered to signed-in users looking at someone else.
    pub fn new(feed: &ProfileFeed, viewer: Option<&UserRecord>) -> Self {
        let username = feed.author.username.clone();
        let follow_action = viewer
            .filter(|user| user.id != feed.author.id)
            .map(|_| {
                let base = profile_path(&username);
                if feed.following {
                    FollowActionView {
                        href: format!("{base}unfollow/"),
                        label: "Unfollow",
                        following: true,
                    }
                } else {
                    FollowActionView {
                        href: format!("{base}follow/"),
                        label: "Follow",
                        following: false,
                    }
                }
            });

        Self {
            username,
            post_count: feed.post_count,
            follow_action,
            list: PostListView::from_page(&feed.page),
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author: String,
    pub author_href: String,
    pub created: String,
    pub text: String,
}

impl From<&CommentListing> for CommentView {
    fn from(listing: &CommentListing) -> Self {
        Self {
            author: listing.author.username.clone(),
            author_href: profile_path(&listing.author.username),
            created: format_human_date(listing.comment.created),
            text: listing.comment.text.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PostDetailView {
    pub post: PostCardView,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub edit_href: Option<String>,
    pub comment_action: Option<String>,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, viewer: Option<&UserRecord>) -> Self {
        let post = PostCardView::from(&detail.listing);
        let is_author = viewer.is_some_and(|user| user.id == detail.listing.post.author_id);

        Self {
            edit_href: is_author.then(|| format!("{}edit/", post.detail_href)),
            comment_action: viewer.map(|_| format!("{}comment/", post.detail_href)),
            author_post_count: detail.author_post_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            post,
        }
    }

    pub fn page_title(detail: &PostDetail) -> String {
        title(&detail.listing.post.text).to_string()
    }
}

#[derive(Clone)]
pub struct GroupOptionView {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

#[derive(Clone)]
pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOptionView>,
    pub current_image: Option<String>,
    pub text_error: Option<&'static str>,
    pub group_error: Option<&'static str>,
    pub image_error: Option<&'static str>,
}

impl PostFormView {
    pub fn new(
        action: impl Into<String>,
        submission: &PostSubmission,
        groups: &[GroupRecord],
        errors: &PostFormErrors,
    ) -> Self {
        let selected = submission.selected_group();
        Self {
            is_edit: false,
            action: action.into(),
            text: submission.text.clone(),
            groups: groups
                .iter()
                .map(|group| GroupOptionView {
                    id: group.id,
                    title: group.title.clone(),
                    selected: selected == Some(group.id.to_string().as_str()),
                })
                .collect(),
            current_image: None,
            text_error: errors.text,
            group_error: errors.group,
            image_error: errors.image,
        }
    }

    pub fn editing(mut self, current_image: Option<&str>) -> Self {
        self.is_edit = true;
        self.current_image = current_image.map(media_url);
        self
    }
}

#[derive(Clone)]
pub struct ErrorPageView {
    pub status: u16,
    pub message: &'static str,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND.as_u16(),
            message: "The page you requested does not exist.",
        }
    }
}

pub fn group_path(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
