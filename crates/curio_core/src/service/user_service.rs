//! Account and session use-case service.
//!
//! # Responsibility
//! - Register accounts with salted password hashes.
//! - Verify credentials and mint/revoke session tokens.
//!
//! # Invariants
//! - Plaintext passwords never reach the repository layer.
//! - Session tokens are random uuids with no information content.

use log::info;
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::Write as _;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use crate::clock::now_millis;
use crate::model::user::{User, UserId};
use crate::repo::user_repo::{NewUser, UserRepository};
use crate::repo::RepoError;

#[derive(Debug)]
pub enum UserServiceError {
    UsernameTaken(String),
    InvalidCredentials,
    UserNotFound(UserId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsernameTaken(username) => write!(f, "username already taken: `{username}`"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent user state: {details}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "user", id } => Self::UserNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// User service facade over the repository implementation.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        let username = username.trim();
        if self.repo.get_by_username(username)?.is_some() {
            return Err(UserServiceError::UsernameTaken(username.to_string()));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let user_id = self.repo.create_user(&NewUser {
            username: username.to_string(),
            email: email.trim().to_string(),
            password_hash: hash_password(&salt, password),
            password_salt: salt,
            date_joined: now_millis(),
        })?;

        info!("event=user_register module=service status=ok user_id={user_id}");
        self.repo
            .get_user(user_id)?
            .ok_or(UserServiceError::InconsistentState(
                "registered user not found in read-back",
            ))
    }

    /// Verifies credentials and opens a session.
    pub fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<(User, Uuid), UserServiceError> {
        let credentials = self
            .repo
            .get_credentials(username.trim())?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if hash_password(&credentials.password_salt, password) != credentials.password_hash {
            info!("event=user_login module=service status=denied");
            return Err(UserServiceError::InvalidCredentials);
        }

        let token = self.repo.create_session(credentials.user_id, now_millis())?;
        let user = self
            .repo
            .get_user(credentials.user_id)?
            .ok_or(UserServiceError::InconsistentState(
                "session user not found in read-back",
            ))?;

        info!(
            "event=user_login module=service status=ok user_id={}",
            user.id
        );
        Ok((user, token))
    }

    pub fn logout(&mut self, token: Uuid) -> Result<(), UserServiceError> {
        self.repo.delete_session(token)?;
        info!("event=user_logout module=service status=ok");
        Ok(())
    }

    pub fn session_user(&self, token: Uuid) -> Result<Option<User>, UserServiceError> {
        Ok(self.repo.session_user(token)?)
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::hash_password;

    #[test]
    fn hashes_are_salted_and_stable() {
        let first = hash_password("salt-a", "secret");
        assert_eq!(first, hash_password("salt-a", "secret"));
        assert_ne!(first, hash_password("salt-b", "secret"));
        assert_eq!(first.len(), 64);
    }
}
