use std::sync::Arc;

use thiserror::Error;

use crate::application::auth::Viewer;
use crate::application::pagination::{NumberedPage, PageWindow};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostQueryFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentListing, GroupRecord, PostListing, UserRecord};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("post {0} not found")]
    UnknownPost(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: NumberedPage<PostListing>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub post_count: u64,
    pub following: bool,
    pub page: NumberedPage<PostListing>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub listing: PostListing,
    pub author_post_count: u64,
    pub comments: Vec<CommentListing>,
}

/// Read side of the application: list views and the post detail view.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    page_size: u64,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        page_size: u64,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub async fn index(&self, page: u64) -> Result<NumberedPage<PostListing>, FeedError> {
        self.paginate(PostQueryFilter::all(), page).await
    }

    pub async fn group(&self, slug: &str, page: u64) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let page = self.paginate(PostQueryFilter::group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: &Viewer,
        page: u64,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let following = match viewer.user() {
            Some(user) => self.follows.is_following(user.id, author.id).await?,
            None => false,
        };

        let page = self
            .paginate(PostQueryFilter::author(author.id), page)
            .await?;

        Ok(ProfileFeed {
            post_count: page.total,
            author,
            following,
            page,
        })
    }

    /// Posts by authors the user follows.
    pub async fn following(
        &self,
        user: &UserRecord,
        page: u64,
    ) -> Result<NumberedPage<PostListing>, FeedError> {
        self.paginate(PostQueryFilter::followed_by(user.id), page)
            .await
    }

    pub async fn post_detail(&self, post_id: i64) -> Result<PostDetail, FeedError> {
        let listing = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(FeedError::UnknownPost(post_id))?;
        let author_post_count = self
            .posts
            .count_posts(&PostQueryFilter::author(listing.author.id))
            .await?;
        let comments = self.comments.list_for_post(post_id).await?;

        Ok(PostDetail {
            listing,
            author_post_count,
            comments,
        })
    }

    async fn paginate(
        &self,
        filter: PostQueryFilter,
        requested: u64,
    ) -> Result<NumberedPage<PostListing>, FeedError> {
        let total = self.posts.count_posts(&filter).await?;
        let window = PageWindow::resolve(requested, total, self.page_size);
        let items = self
            .posts
            .list_posts(&filter, window.offset(), window.limit())
            .await?;
        Ok(NumberedPage::new(items, window))
    }
}
