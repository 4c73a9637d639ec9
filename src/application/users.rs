use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::error::AccessError;
use crate::application::repos::{FollowersRepo, NewUser, RepoError, RolesRepo, UsersRepo};
use crate::cache::ReadThrough;
use crate::domain::entities::User;
use crate::domain::error::DomainError;

/// Lifetime of an invitation token.
pub const INVITATION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 3);

#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub username: String,
    pub email: String,
    /// Produced by the authentication collaborator; stored as given.
    pub password_hash: Vec<u8>,
    /// Role to grant; the default role when absent.
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user: User,
    /// Plain invitation token. Only its hash is persisted.
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
    followers: Arc<dyn FollowersRepo>,
    roles: Arc<dyn RolesRepo>,
    reader: ReadThrough<User>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        followers: Arc<dyn FollowersRepo>,
        roles: Arc<dyn RolesRepo>,
        reader: ReadThrough<User>,
    ) -> Self {
        Self {
            users,
            followers,
            roles,
            reader,
        }
    }

    pub async fn get(&self, id: i64) -> Result<User, AccessError> {
        self.reader.get(id).await
    }

    #[instrument(skip_all, fields(username = %command.username))]
    pub async fn register(&self, command: RegisterUserCommand) -> Result<Registration, AccessError> {
        if command.username.trim().is_empty() {
            return Err(DomainError::validation("username is required").into());
        }
        if !command.email.contains('@') {
            return Err(DomainError::validation("email is not valid").into());
        }
        if command.password_hash.is_empty() {
            return Err(DomainError::validation("password hash is required").into());
        }
        let role_name = match command.role {
            Some(name) => match self.roles.get_by_name(&name).await {
                Ok(role) => Some(role.name),
                Err(RepoError::NotFound) => {
                    return Err(DomainError::validation(format!("unknown role `{name}`")).into());
                }
                Err(err) => return Err(err.into()),
            },
            None => None,
        };

        let token = Uuid::new_v4().to_string();
        let user = self
            .users
            .create_and_invite(
                NewUser {
                    username: command.username,
                    email: command.email,
                    password_hash: command.password_hash,
                    role_name,
                },
                &hash_token(&token),
                INVITATION_TTL,
            )
            .await?;

        info!(user_id = user.id, "user registered, invitation pending");
        Ok(Registration { user, token })
    }

    #[instrument(skip_all)]
    pub async fn activate(&self, token: &str) -> Result<i64, AccessError> {
        let user_id = self.users.activate(&hash_token(token)).await?;
        self.reader.evict_after_write(user_id).await;
        info!(user_id, "user activated");
        Ok(user_id)
    }

    /// `follower_id` starts following `user_id`.
    pub async fn follow(&self, user_id: i64, follower_id: i64) -> Result<(), AccessError> {
        self.check_pair(user_id, follower_id).await?;
        Ok(self.followers.follow(follower_id, user_id).await?)
    }

    pub async fn unfollow(&self, user_id: i64, follower_id: i64) -> Result<(), AccessError> {
        self.check_pair(user_id, follower_id).await?;
        Ok(self.followers.unfollow(follower_id, user_id).await?)
    }

    async fn check_pair(&self, user_id: i64, follower_id: i64) -> Result<(), AccessError> {
        if user_id == follower_id {
            return Err(AccessError::Conflict {
                current_version: None,
            });
        }
        self.reader.get(user_id).await?;
        Ok(())
    }
}

/// Hex sha256 of an invitation token, as stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
