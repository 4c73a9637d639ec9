use std::sync::Arc;

use time::OffsetDateTime;
use tracing::instrument;

use crate::application::concurrency::VersionedWriter;
use crate::application::error::AccessError;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, FeedQuery, PostsRepo,
};
use crate::cache::ReadThrough;
use crate::domain::entities::{
    Comment, POST_CONTENT_MAX_CHARS, POST_TITLE_MAX_CHARS, Post, PostDetail, PostWithMetadata,
};
use crate::domain::error::DomainError;

pub const FEED_MAX_LIMIT: i64 = 20;
const FEED_MAX_SEARCH_CHARS: usize = 100;
const FEED_MAX_TAGS: usize = 5;

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub tags: Vec<String>,
}

/// Partial edit of a post. `version` is the version the caller last saw;
/// when absent the version loaded just before the write is used.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentCommand {
    pub user_id: i64,
    pub content: String,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    reader: ReadThrough<Post>,
    writer: VersionedWriter<Post>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        reader: ReadThrough<Post>,
        writer: VersionedWriter<Post>,
    ) -> Self {
        Self {
            posts,
            comments,
            reader,
            writer,
        }
    }

    pub async fn create(&self, command: CreatePostCommand) -> Result<Post, AccessError> {
        validate_title(&command.title)?;
        validate_content(&command.content)?;

        let post = self
            .posts
            .create_post(CreatePostParams {
                title: command.title,
                content: command.content,
                user_id: command.user_id,
                tags: command.tags,
            })
            .await?;
        Ok(post)
    }

    pub async fn get(&self, id: i64) -> Result<Post, AccessError> {
        self.reader.get(id).await
    }

    pub async fn detail(&self, id: i64) -> Result<PostDetail, AccessError> {
        let post = self.reader.get(id).await?;
        let comments = self.comments.list_for_post(id).await?;
        Ok(PostDetail { post, comments })
    }

    #[instrument(skip(self, command), fields(base_version = ?command.version))]
    pub async fn update(&self, id: i64, command: UpdatePostCommand) -> Result<Post, AccessError> {
        let mut post = self.posts.get_by_id(id).await?;

        if let Some(title) = command.title {
            validate_title(&title)?;
            post.title = title;
        }
        if let Some(content) = command.content {
            validate_content(&content)?;
            post.content = content;
        }
        if let Some(version) = command.version {
            post.version = version;
        }
        post.updated_at = OffsetDateTime::now_utc();

        self.writer
            .update_versioned(&mut post)
            .await
            .map_err(stale_edit_as_conflict)?;
        self.reader.refresh_after_write(&post).await;
        Ok(post)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AccessError> {
        self.posts.delete_post(id).await?;
        self.reader.evict_after_write(id).await;
        Ok(())
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        command: CreateCommentCommand,
    ) -> Result<Comment, AccessError> {
        if command.content.trim().is_empty() {
            return Err(DomainError::validation("comment content is required").into());
        }
        self.reader.get(post_id).await?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                user_id: command.user_id,
                content: command.content,
            })
            .await?;
        Ok(comment)
    }

    pub async fn comments(&self, post_id: i64) -> Result<Vec<Comment>, AccessError> {
        self.reader.get(post_id).await?;
        Ok(self.comments.list_for_post(post_id).await?)
    }

    pub async fn feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<PostWithMetadata>, AccessError> {
        validate_feed_query(query)?;
        Ok(self.posts.user_feed(user_id, query).await?)
    }
}

/// The post was read just before the write, so a write that matched no row
/// lost a race with another writer.
fn stale_edit_as_conflict(err: AccessError) -> AccessError {
    match err {
        AccessError::NotFound => AccessError::Conflict {
            current_version: None,
        },
        other => other,
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title is required"));
    }
    if title.chars().count() > POST_TITLE_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "title must be at most {POST_TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::validation("content is required"));
    }
    if content.chars().count() > POST_CONTENT_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "content must be at most {POST_CONTENT_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_feed_query(query: &FeedQuery) -> Result<(), DomainError> {
    if !(1..=FEED_MAX_LIMIT).contains(&query.limit) {
        return Err(DomainError::validation(format!(
            "limit must be between 1 and {FEED_MAX_LIMIT}"
        )));
    }
    if query.offset < 0 {
        return Err(DomainError::validation("offset must not be negative"));
    }
    if query
        .search
        .as_deref()
        .is_some_and(|search| search.chars().count() > FEED_MAX_SEARCH_CHARS)
    {
        return Err(DomainError::validation(format!(
            "search must be at most {FEED_MAX_SEARCH_CHARS} characters"
        )));
    }
    if query.tags.len() > FEED_MAX_TAGS {
        return Err(DomainError::validation(format!(
            "at most {FEED_MAX_TAGS} tags may be given"
        )));
    }
    Ok(())
}
