//! Accounts and login sessions.
//!
//! Passwords are stored as argon2 PHC strings. A login issues an opaque
//! token `ys_<prefix>_<secret>`; only the prefix and the SHA-256 of the
//! secret are persisted.

use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo,
};
use crate::domain::entities::{SessionRecord, UserRecord};
use crate::domain::users::{validate_new_password, validate_username};

const TOKEN_PREFIX: &str = "ys";
const MIN_SECRET_LEN: usize = 32;
pub const DEFAULT_SESSION_TTL_HOURS: u32 = 14 * 24;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("signup form is invalid")]
    InvalidSignup(SignupErrors),
    #[error("password change form is invalid")]
    InvalidPasswordChange(PasswordChangeErrors),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user not found")]
    UnknownUser,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupErrors {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SignupErrors {
    fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordChangeErrors {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// A freshly issued login session; `token` is only available here.
#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub user: UserRecord,
    pub session: SessionRecord,
    pub token: String,
}

/// The logged-in user behind a request.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user: UserRecord,
    pub session_id: i64,
}

/// Argon2 password hashing.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hashing with explicit cost parameters; cheap settings keep tests fast.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, AccountError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|err| AccountError::Hashing(err.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, AccountError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AccountError::Hashing(err.to_string()))
    }

    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    passwords: PasswordService,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: Arc<dyn SessionsRepo>) -> Self {
        Self {
            users,
            sessions,
            passwords: PasswordService::new(),
            session_ttl: Duration::hours(i64::from(DEFAULT_SESSION_TTL_HOURS)),
        }
    }

    pub fn with_passwords(mut self, passwords: PasswordService) -> Self {
        self.passwords = passwords;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub async fn signup(&self, form: SignupForm) -> Result<SessionIssued, AccountError> {
        let mut errors = SignupErrors::default();

        let username = match validate_username(&form.username) {
            Ok(username) => Some(username),
            Err(err) => {
                errors.username = Some(err.into_message());
                None
            }
        };
        if let Some(username) = username.as_deref()
            && self.users.find_user_by_username(username).await?.is_some()
        {
            errors.username = Some("A user with that username already exists.".to_string());
        }
        if let Err(err) = validate_new_password(&form.password1, &form.password2) {
            errors.password = Some(err.into_message());
        }

        let username = match username {
            Some(username) if errors.is_empty() => username,
            _ => return Err(AccountError::InvalidSignup(errors)),
        };

        let user = self
            .insert_user(
                username,
                form.first_name.trim().to_string(),
                form.last_name.trim().to_string(),
                form.email.trim().to_string(),
                &form.password1,
            )
            .await
            .map_err(|err| match err {
                AccountError::Repo(RepoError::Duplicate { .. }) => {
                    AccountError::InvalidSignup(SignupErrors {
                        username: Some("A user with that username already exists.".to_string()),
                        password: None,
                    })
                }
                other => other,
            })?;

        self.issue_session(user).await
    }

    /// Create an account without logging in (operator CLI).
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<UserRecord, AccountError> {
        let username = validate_username(username).map_err(|err| {
            AccountError::InvalidSignup(SignupErrors {
                username: Some(err.into_message()),
                password: None,
            })
        })?;
        validate_new_password(password, password).map_err(|err| {
            AccountError::InvalidSignup(SignupErrors {
                username: None,
                password: Some(err.into_message()),
            })
        })?;

        self.insert_user(
            username,
            String::new(),
            String::new(),
            email.trim().to_string(),
            password,
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionIssued, AccountError> {
        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self.passwords.verify(password, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        self.issue_session(user).await
    }

    /// Resolve a session token into the logged-in user, if it is still valid.
    pub async fn authenticate(&self, token: &str) -> Result<Option<Viewer>, AccountError> {
        let Some(parsed) = parse_token(token) else {
            return Ok(None);
        };
        let Some(session) = self.sessions.find_session_by_prefix(&parsed.prefix).await? else {
            return Ok(None);
        };

        let hashed_input = hash_secret(&parsed.secret);
        if session.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Ok(None);
        }

        if session.is_expired(OffsetDateTime::now_utc()) {
            debug!(
                target = "yatube::accounts",
                session_id = session.id,
                "session expired"
            );
            self.sessions.delete_session(session.id).await?;
            return Ok(None);
        }

        let user = self.users.find_user_by_id(session.user_id).await?;
        Ok(user.map(|user| Viewer {
            user,
            session_id: session.id,
        }))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        if let Some(viewer) = self.authenticate(token).await? {
            self.sessions.delete_session(viewer.session_id).await?;
            info!(
                target = "yatube::accounts",
                user_id = viewer.user.id,
                "user logged out"
            );
        }
        Ok(())
    }

    /// Change the viewer's password and sign out their other sessions.
    pub async fn change_password(
        &self,
        viewer: &Viewer,
        form: PasswordChangeForm,
    ) -> Result<(), AccountError> {
        let user = self
            .users
            .find_user_by_id(viewer.user.id)
            .await?
            .ok_or(AccountError::UnknownUser)?;

        let mut errors = PasswordChangeErrors::default();
        if !self.passwords.verify(&form.old_password, &user.password_hash) {
            errors.old_password = Some(
                "Your old password was entered incorrectly. Please enter it again.".to_string(),
            );
        }
        if let Err(err) = validate_new_password(&form.new_password1, &form.new_password2) {
            errors.new_password = Some(err.into_message());
        }
        if errors.old_password.is_some() || errors.new_password.is_some() {
            return Err(AccountError::InvalidPasswordChange(errors));
        }

        let hash = self.passwords.hash(&form.new_password1)?;
        self.users.update_password(user.id, &hash).await?;
        let signed_out = self
            .sessions
            .delete_other_sessions(user.id, viewer.session_id)
            .await?;
        info!(
            target = "yatube::accounts",
            user_id = user.id,
            signed_out,
            "password changed"
        );
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AccountError> {
        let removed = self
            .sessions
            .delete_expired_sessions(OffsetDateTime::now_utc())
            .await?;
        Ok(removed)
    }

    async fn insert_user(
        &self,
        username: String,
        first_name: String,
        last_name: String,
        email: String,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        let password_hash = self.passwords.hash(password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username,
                first_name,
                last_name,
                email,
                password_hash,
            })
            .await?;
        info!(
            target = "yatube::accounts",
            user_id = user.id,
            username = %user.username,
            "user created"
        );
        Ok(user)
    }

    async fn issue_session(&self, user: UserRecord) -> Result<SessionIssued, AccountError> {
        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        let session = self
            .sessions
            .create_session(CreateSessionParams {
                user_id: user.id,
                prefix,
                hashed_secret: hash_secret(&secret),
                expires_at: OffsetDateTime::now_utc() + self.session_ttl,
            })
            .await?;

        info!(
            target = "yatube::accounts",
            user_id = user.id,
            session_id = session.id,
            "session issued"
        );

        Ok(SessionIssued {
            user,
            session,
            token,
        })
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
