//! In-memory repositories and request helpers shared by the HTTP tests.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{
        Request, Response,
        header::{CONTENT_TYPE, COOKIE, LOCATION},
    },
};
use blogvoyage::{
    application::{
        auth::AuthGate,
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, FollowsRepo,
            GroupsRepo, GroupsWriteRepo, HealthRepo, PostQueryFilter, PostsRepo, PostsWriteRepo,
            RepoError, UpdatePostParams, UsersRepo,
        },
    },
    cache::{CacheConfig, CacheState},
    domain::entities::{
        CommentListing, CommentRecord, FollowRecord, GroupRecord, PostListing, PostRecord,
        UserRecord,
    },
    infra::{
        http::{AdminState, HttpState, build_admin_router, build_router},
        uploads::UploadStorage,
    },
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime, macros::datetime};
use tower::ServiceExt;

pub const SESSION_COOKIE: &str = "sessionid";
pub const BOUNDARY: &str = "blogvoyage-test-boundary";

/// 2x1 GIF.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
];

#[derive(Default)]
struct BlogData {
    next_id: i64,
    users: Vec<UserRecord>,
    sessions: HashMap<String, i64>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
}

impl BlogData {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: i64) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.id == id)
    }

    fn listing(&self, post: &PostRecord) -> Option<PostListing> {
        let author = self.user(post.author_id)?.clone();
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id).cloned());
        Some(PostListing {
            post: post.clone(),
            author,
            group,
        })
    }

    fn matches(&self, post: &PostRecord, filter: &PostQueryFilter) -> bool {
        if filter.group_id.is_some() && post.group_id != filter.group_id {
            return false;
        }
        if filter.author_id.is_some_and(|author| post.author_id != author) {
            return false;
        }
        if let Some(user_id) = filter.followed_by {
            let follows = self
                .follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id);
            if !follows {
                return false;
            }
        }
        true
    }

    fn filtered(&self, filter: &PostQueryFilter) -> Vec<&PostRecord> {
        let mut posts: Vec<&PostRecord> = self
            .posts
            .iter()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

/// Thread-safe in-memory store implementing every repository trait.
pub struct MemoryBlog {
    data: Mutex<BlogData>,
    clock: Mutex<OffsetDateTime>,
}

impl Default for MemoryBlog {
    fn default() -> Self {
        Self {
            data: Mutex::new(BlogData::default()),
            clock: Mutex::new(datetime!(2024-01-01 12:00 UTC)),
        }
    }
}

impl MemoryBlog {
    /// Each call returns a strictly later timestamp, so insertion order is
    /// publication order.
    fn tick(&self) -> OffsetDateTime {
        let mut clock = self.clock.lock().expect("clock lock");
        *clock += Duration::minutes(1);
        *clock
    }

    pub fn add_user(&self, username: &str) -> UserRecord {
        let mut data = self.data.lock().expect("data lock");
        let user = UserRecord {
            id: data.allocate_id(),
            username: username.to_string(),
        };
        data.users.push(user.clone());
        user
    }

    /// Issue a session token for `user`, returning the cookie value.
    pub fn login(&self, user: &UserRecord) -> String {
        let token = format!("session-{}", user.username);
        self.data
            .lock()
            .expect("data lock")
            .sessions
            .insert(token.clone(), user.id);
        token
    }

    pub fn add_group(&self, title: &str, slug: &str) -> GroupRecord {
        let mut data = self.data.lock().expect("data lock");
        let group = GroupRecord {
            id: data.allocate_id(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        };
        data.groups.push(group.clone());
        group
    }

    pub fn add_post(
        &self,
        author: &UserRecord,
        text: &str,
        group: Option<&GroupRecord>,
    ) -> PostRecord {
        let pub_date = self.tick();
        let mut data = self.data.lock().expect("data lock");
        let post = PostRecord {
            id: data.allocate_id(),
            text: text.to_string(),
            pub_date,
            author_id: author.id,
            group_id: group.map(|group| group.id),
            image: None,
        };
        data.posts.push(post.clone());
        post
    }

    pub fn remove_post(&self, id: i64) {
        self.data
            .lock()
            .expect("data lock")
            .posts
            .retain(|post| post.id != id);
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.data
            .lock()
            .expect("data lock")
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub fn post_count(&self) -> usize {
        self.data.lock().expect("data lock").posts.len()
    }

    pub fn latest_post(&self) -> Option<PostRecord> {
        let data = self.data.lock().expect("data lock");
        data.posts.iter().max_by_key(|post| post.id).cloned()
    }

    pub fn comments_on(&self, post_id: i64) -> Vec<CommentRecord> {
        self.data
            .lock()
            .expect("data lock")
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect()
    }

    pub fn follow_count(&self, user: &UserRecord, author: &UserRecord) -> usize {
        self.data
            .lock()
            .expect("data lock")
            .follows
            .iter()
            .filter(|f| f.user_id == user.id && f.author_id == author.id)
            .count()
    }

    pub fn add_follow(&self, user: &UserRecord, author: &UserRecord) {
        let mut data = self.data.lock().expect("data lock");
        let record = FollowRecord {
            id: data.allocate_id(),
            user_id: user.id,
            author_id: author.id,
        };
        data.follows.push(record);
    }
}

#[async_trait]
impl UsersRepo for MemoryBlog {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_session(&self, token: &str) -> Result<Option<UserRecord>, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data
            .sessions
            .get(token)
            .and_then(|id| data.user(*id))
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryBlog {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.data.lock().expect("data lock").groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data.groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data.groups.iter().find(|group| group.slug == slug).cloned())
    }
}

#[async_trait]
impl GroupsWriteRepo for MemoryBlog {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut data = self.data.lock().expect("data lock");
        if data.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "post_groups_slug_key".into(),
            });
        }
        let group = GroupRecord {
            id: data.allocate_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        data.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryBlog {
    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data.filtered(filter).len() as u64)
    }

    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostListing>, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data
            .filtered(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|post| data.listing(post))
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostListing>, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data
            .posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| data.listing(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryBlog {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let pub_date = self.tick();
        let mut data = self.data.lock().expect("data lock");
        let post = PostRecord {
            id: data.allocate_id(),
            text: params.text,
            pub_date,
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        data.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut data = self.data.lock().expect("data lock");
        let post = data
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        Ok(post.clone())
    }
}

#[async_trait]
impl CommentsRepo for MemoryBlog {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentListing>, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter_map(|comment| {
                data.user(comment.author_id).map(|author| CommentListing {
                    comment: comment.clone(),
                    author: author.clone(),
                })
            })
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let created = self.tick();
        let mut data = self.data.lock().expect("data lock");
        let comment = CommentRecord {
            id: data.allocate_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created,
        };
        data.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryBlog {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let data = self.data.lock().expect("data lock");
        Ok(data
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn create_follow(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<FollowRecord, RepoError> {
        let mut data = self.data.lock().expect("data lock");
        if data
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Err(RepoError::Duplicate {
                constraint: "follows_user_author_key".into(),
            });
        }
        let record = FollowRecord {
            id: data.allocate_id(),
            user_id,
            author_id,
        };
        data.follows.push(record.clone());
        Ok(record)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut data = self.data.lock().expect("data lock");
        let before = data.follows.len();
        data.follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(data.follows.len() != before)
    }
}

#[async_trait]
impl HealthRepo for MemoryBlog {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// A fully wired public and admin router over one in-memory store.
pub struct TestApp {
    pub blog: Arc<MemoryBlog>,
    pub cache: CacheState,
    pub public: Router,
    pub admin: Router,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_page_size(10)
    }

    pub fn with_page_size(page_size: u64) -> Self {
        Self::build(page_size, CacheConfig::default())
    }

    pub fn build(page_size: u64, cache_config: CacheConfig) -> Self {
        Self::build_with_follows(page_size, cache_config, |blog| blog as Arc<dyn FollowsRepo>)
    }

    /// Wire the app with a custom follows repository layered over the store.
    pub fn build_with_follows(
        page_size: u64,
        cache_config: CacheConfig,
        follows_repo: impl FnOnce(Arc<MemoryBlog>) -> Arc<dyn FollowsRepo>,
    ) -> Self {
        let blog = Arc::new(MemoryBlog::default());
        let uploads = tempfile::tempdir().expect("temp upload dir");
        let storage =
            Arc::new(UploadStorage::new(uploads.path().to_path_buf()).expect("upload storage"));

        let feed = Arc::new(FeedService::new(
            blog.clone(),
            blog.clone(),
            blog.clone(),
            blog.clone(),
            blog.clone(),
            page_size,
        ));
        let posts = Arc::new(PostService::new(
            blog.clone(),
            blog.clone(),
            blog.clone(),
            blog.clone(),
            storage.clone(),
        ));
        let follows = Arc::new(FollowService::new(blog.clone(), follows_repo(blog.clone())));
        let cache = CacheState::in_memory(cache_config);

        let state = HttpState {
            feed,
            posts,
            follows,
            users: blog.clone(),
            auth: Arc::new(AuthGate::default()),
            session_cookie: Arc::from(SESSION_COOKIE),
            upload_storage: storage,
            cache: Some(cache.clone()),
        };
        let admin_state = AdminState {
            db: blog.clone(),
            cache: Some(cache.clone()),
        };

        Self {
            public: build_router(state, 10 * 1024 * 1024),
            admin: build_admin_router(admin_state),
            blog,
            cache,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.public
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn send_admin(&self, request: Request<Body>) -> Response<Body> {
        self.admin
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub fn get(path: &str, session: Option<&str>) -> Request<Body> {
    with_session(Request::get(path), session)
        .body(Body::empty())
        .expect("valid request")
}

pub fn post_form(path: &str, session: Option<&str>, body: &str) -> Request<Body> {
    with_session(Request::post(path), session)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn post_multipart(path: &str, session: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    with_session(Request::post(path), session)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("valid request")
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn with_session(
    builder: axum::http::request::Builder,
    session: Option<&str>,
) -> axum::http::request::Builder {
    match session {
        Some(token) => builder.header(COOKIE, format!("{SESSION_COOKIE}={token}")),
        None => builder,
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect carries a location")
}
