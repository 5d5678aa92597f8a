use std::sync::Arc;

use chrono::Utc;
use classifieds_core::credentials::{
    hash_password, validate_login, verify_password, CredentialError, SALT_LEN,
};

use crate::session::Identity;
use crate::store::{StoreError, UserRecord, UserStore};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin2024!";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid login data: {0}")]
    InvalidInput(#[from] CredentialError),

    #[error("unknown user or wrong password")]
    BadCredentials,

    #[error("email {0} is not registered")]
    NotAuthorized(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub trait Authenticator: Send + Sync {
    /// Check a username and password pair from the login form
    fn verify_credentials(&self, username: &str, password: &str) -> Result<Identity, AuthError>;

    /// Accept an email asserted by the single sign-on proxy
    fn authorize_email(&self, email: &str) -> Result<Identity, AuthError>;
}

pub struct UserStoreAuthenticator {
    users: Arc<dyn UserStore>,
}

impl UserStoreAuthenticator {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

impl Authenticator for UserStoreAuthenticator {
    fn verify_credentials(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        validate_login(username, password)?;

        let Some(user) = self.users.find_by_username(username)? else {
            return Err(AuthError::BadCredentials);
        };

        match verify_password(&user.password_hash, password) {
            Ok(true) => Ok(Identity::Username(user.username)),
            Ok(false) => Err(AuthError::BadCredentials),
            Err(e) => {
                log::warn!("Stored password hash for {username} is unusable: {e}");
                Err(AuthError::BadCredentials)
            }
        }
    }

    fn authorize_email(&self, email: &str) -> Result<Identity, AuthError> {
        let email = email.trim();

        if email.is_empty() {
            return Err(AuthError::NotAuthorized(String::new()));
        }

        match self.users.find_by_email(email)? {
            Some(_) => Ok(Identity::Email(email.to_string())),
            None => Err(AuthError::NotAuthorized(email.to_string())),
        }
    }
}

/// Create the development admin account unless it already exists
///
/// Returns whether an account was created.
pub fn ensure_admin(users: &dyn UserStore, password: &str) -> Result<bool, AuthError> {
    if users.find_by_username(ADMIN_USERNAME)?.is_some() {
        return Ok(false);
    }

    let salt: [u8; SALT_LEN] = rand::random();
    users.insert_user(&UserRecord {
        username: ADMIN_USERNAME.to_string(),
        email: Some(ADMIN_EMAIL.to_string()),
        password_hash: hash_password(password, &salt)?,
        role: Some("admin".to_string()),
        created_at: Utc::now(),
    })?;

    Ok(true)
}
