//! In-process authoritative store.
//!
//! Implements every repository trait over plain collections behind one lock,
//! with the same contracts as the Postgres adapter: ids start at 1, posts are
//! created at version 0 and the conditional update bumps the version in the
//! same critical section that compares it. Read counters let callers observe
//! how often the cache-aside path reached the store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, EntityStore, FeedQuery, FollowersRepo,
    NewUser, PostsRepo, RepoError, RolesRepo, UsersRepo, VersionedStore,
};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{
    Comment, CommentAuthor, Follower, Post, PostWithMetadata, Role, User,
};
use crate::domain::types::SortDirection;

const SOURCE: &str = "infra::memory";
const DEFAULT_ROLE: &str = "user";

struct Invitation {
    user_id: i64,
    expiry: OffsetDateTime,
}

struct State {
    next_id: i64,
    roles: Vec<Role>,
    users: BTreeMap<i64, User>,
    invitations: HashMap<String, Invitation>,
    posts: BTreeMap<i64, Post>,
    comments: Vec<Comment>,
    followers: Vec<Follower>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn role(&self, name: &str) -> Result<Role, RepoError> {
        self.roles
            .iter()
            .find(|role| role.name == name)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

pub struct InMemoryStore {
    state: RwLock<State>,
    post_reads: AtomicUsize,
    user_reads: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let roles = [
            (1, "user", "A user can create posts and comments", 1),
            (2, "moderator", "A moderator can update other users posts", 2),
            (3, "admin", "An admin can update and delete other users posts", 3),
        ]
        .into_iter()
        .map(|(id, name, description, level)| Role {
            id,
            name: name.to_string(),
            description: description.to_string(),
            level,
        })
        .collect();

        Self {
            state: RwLock::new(State {
                next_id: 0,
                roles,
                users: BTreeMap::new(),
                invitations: HashMap::new(),
                posts: BTreeMap::new(),
                comments: Vec::new(),
                followers: Vec::new(),
            }),
            post_reads: AtomicUsize::new(0),
            user_reads: AtomicUsize::new(0),
        }
    }

    /// Number of `get_by_id` calls served for posts.
    pub fn post_reads(&self) -> usize {
        self.post_reads.load(Ordering::SeqCst)
    }

    /// Number of `get_by_id` calls served for users.
    pub fn user_reads(&self) -> usize {
        self.user_reads.load(Ordering::SeqCst)
    }

    /// Insert an already active user with the default role.
    pub fn seed_user(&self, username: &str, email: &str) -> Result<User, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "seed_user");
        let role = state.role(DEFAULT_ROLE)?;
        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: OffsetDateTime::now_utc(),
            is_active: true,
            role_id: role.id,
            role,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Bump a stored post's version out of band, as a concurrent writer would.
    pub fn touch_post(&self, id: i64) -> Option<i32> {
        let mut state = rw_write(&self.state, SOURCE, "touch_post");
        let post = state.posts.get_mut(&id)?;
        post.version += 1;
        Some(post.version)
    }
}

#[async_trait]
impl EntityStore<Post> for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> Result<Post, RepoError> {
        self.post_reads.fetch_add(1, Ordering::SeqCst);
        rw_read(&self.state, SOURCE, "get_post")
            .posts
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl VersionedStore<Post> for InMemoryStore {
    async fn update_where_version(
        &self,
        entity: &Post,
        expected_version: i32,
    ) -> Result<Option<i32>, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "update_post");
        let Some(stored) = state.posts.get_mut(&entity.id) else {
            return Ok(None);
        };
        if stored.version != expected_version {
            return Ok(None);
        }
        stored.title = entity.title.clone();
        stored.content = entity.content.clone();
        stored.updated_at = entity.updated_at;
        stored.version += 1;
        Ok(Some(stored.version))
    }
}

#[async_trait]
impl PostsRepo for InMemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<Post, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_post");
        if !state.users.contains_key(&params.user_id) {
            return Err(RepoError::InvalidInput {
                message: format!("user {} does not exist", params.user_id),
            });
        }
        let now = OffsetDateTime::now_utc();
        let post = Post {
            id: state.next_id(),
            title: params.title,
            content: params.content,
            user_id: params.user_id,
            tags: params.tags,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "delete_post");
        state.posts.remove(&id).ok_or(RepoError::NotFound)?;
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }

    async fn user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<PostWithMetadata>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "user_feed");
        let followed: HashSet<i64> = state
            .followers
            .iter()
            .filter(|edge| edge.follower_id == user_id)
            .map(|edge| edge.user_id)
            .collect();
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<PostWithMetadata> = state
            .posts
            .values()
            .filter(|post| post.user_id == user_id || followed.contains(&post.user_id))
            .filter(|post| {
                needle.as_ref().is_none_or(|needle| {
                    post.title.to_lowercase().contains(needle)
                        || post.content.to_lowercase().contains(needle)
                })
            })
            .filter(|post| query.tags.iter().all(|tag| post.tags.contains(tag)))
            .map(|post| PostWithMetadata {
                post: post.clone(),
                username: state
                    .users
                    .get(&post.user_id)
                    .map(|user| user.username.clone())
                    .unwrap_or_default(),
                comments_count: state
                    .comments
                    .iter()
                    .filter(|comment| comment.post_id == post.id)
                    .count() as i64,
            })
            .collect();

        rows.sort_by(|a, b| {
            let ordering = (a.post.created_at, a.post.id).cmp(&(b.post.created_at, b.post.id));
            match query.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl EntityStore<User> for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        rw_read(&self.state, SOURCE, "get_user")
            .users
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expires_in: Duration,
    ) -> Result<User, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_and_invite");

        if state.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }

        let role = state.role(user.role_name.as_deref().unwrap_or(DEFAULT_ROLE))?;
        let created = User {
            id: state.next_id(),
            username: user.username,
            email: user.email,
            created_at: OffsetDateTime::now_utc(),
            is_active: false,
            role_id: role.id,
            role,
        };
        state.users.insert(created.id, created.clone());
        state.invitations.insert(
            token_hash.to_string(),
            Invitation {
                user_id: created.id,
                expiry: OffsetDateTime::now_utc() + expires_in,
            },
        );
        Ok(created)
    }

    async fn activate(&self, token_hash: &str) -> Result<i64, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "activate");
        let user_id = match state.invitations.get(token_hash) {
            Some(invitation) if invitation.expiry > OffsetDateTime::now_utc() => {
                invitation.user_id
            }
            _ => return Err(RepoError::NotFound),
        };

        let user = state.users.get_mut(&user_id).ok_or(RepoError::NotFound)?;
        user.is_active = true;
        state
            .invitations
            .retain(|_, invitation| invitation.user_id != user_id);
        Ok(user_id)
    }
}

#[async_trait]
impl CommentsRepo for InMemoryStore {
    async fn create_comment(&self, params: CreateCommentParams) -> Result<Comment, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_comment");
        if !state.posts.contains_key(&params.post_id) {
            return Err(RepoError::InvalidInput {
                message: format!("post {} does not exist", params.post_id),
            });
        }
        let username = state
            .users
            .get(&params.user_id)
            .map(|user| user.username.clone())
            .ok_or_else(|| RepoError::InvalidInput {
                message: format!("user {} does not exist", params.user_id),
            })?;

        let comment = Comment {
            id: state.next_id(),
            post_id: params.post_id,
            user_id: params.user_id,
            content: params.content,
            created_at: OffsetDateTime::now_utc(),
            user: CommentAuthor {
                id: params.user_id,
                username,
            },
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_comments");
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(comments)
    }
}

#[async_trait]
impl FollowersRepo for InMemoryStore {
    async fn follow(&self, follower_id: i64, user_id: i64) -> Result<(), RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "follow");
        if state
            .followers
            .iter()
            .any(|edge| edge.follower_id == follower_id && edge.user_id == user_id)
        {
            return Err(RepoError::Duplicate {
                constraint: "followers_pkey".to_string(),
            });
        }
        state.followers.push(Follower {
            user_id,
            follower_id,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, user_id: i64) -> Result<(), RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "unfollow");
        state
            .followers
            .retain(|edge| !(edge.follower_id == follower_id && edge.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl RolesRepo for InMemoryStore {
    async fn get_by_name(&self, name: &str) -> Result<Role, RepoError> {
        rw_read(&self.state, SOURCE, "get_role").role(name)
    }
}
