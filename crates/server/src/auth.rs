use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use rand_core::OsRng;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::utils::now_secs;

const USERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const SESSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
    /// PHC string; empty for accounts that only sign in through Google.
    pub password_hash: String,
    pub provider: AuthProvider,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: u64,
}

/// The user as exposed over HTTP. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub provider: AuthProvider,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: u64,
}

impl From<&AuthUser> for PublicUser {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            provider: user.provider,
            avatar_url: user.avatar_url.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub user_id: String,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug)]
pub enum AuthError {
    UserNotFound,
    UserExists,
    MissingFields,
    PasswordHash(String),
    DbError(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::UserNotFound => write!(f, "user not found"),
            AuthError::UserExists => write!(f, "username or email already in use"),
            AuthError::MissingFields => write!(f, "username, email and password are required"),
            AuthError::PasswordHash(err) => write!(f, "password hash error: {}", err),
            AuthError::DbError(err) => write!(f, "database error: {}", err),
        }
    }
}

impl std::error::Error for AuthError {}

fn db_err(err: impl Display) -> AuthError {
    AuthError::DbError(err.to_string())
}

#[derive(Clone)]
pub struct AuthStore {
    db: Arc<Database>,
    session_ttl: Duration,
}

impl AuthStore {
    pub fn new(db: Arc<Database>, session_ttl: Duration) -> Self {
        Self { db, session_ttl }
    }

    pub fn init_tables(&self) -> Result<(), AuthError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let _users = write_txn.open_table(USERS_TABLE).map_err(db_err)?;
            let _sessions = write_txn.open_table(SESSIONS_TABLE).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        let user = AuthUser {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            provider: AuthProvider::Local,
            avatar_url: None,
            bio: None,
            created_at: now_secs(),
        };
        self.insert_user(&user)?;
        Ok(user)
    }

    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthUser>, AuthError> {
        let user = match self.find_user(|u| u.username.eq_ignore_ascii_case(username.trim()))? {
            Some(user) => user,
            None => return Ok(None),
        };
        if user.provider != AuthProvider::Local || !verify_password(password, &user.password_hash) {
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Finds the Google account for `email`, refreshing its avatar, or
    /// creates one. A taken display name falls back to the email address.
    pub fn upsert_google_user(
        &self,
        email: &str,
        display_name: &str,
        avatar_url: Option<String>,
    ) -> Result<AuthUser, AuthError> {
        let existing = self.find_user(|u| {
            u.provider == AuthProvider::Google && u.email.eq_ignore_ascii_case(email)
        })?;
        if let Some(mut user) = existing {
            if user.avatar_url != avatar_url {
                user.avatar_url = avatar_url;
                self.put_user(&user)?;
            }
            return Ok(user);
        }

        let name_taken = self
            .find_user(|u| u.username.eq_ignore_ascii_case(display_name))?
            .is_some();
        let username = if display_name.trim().is_empty() || name_taken {
            email.to_string()
        } else {
            display_name.trim().to_string()
        };
        let user = AuthUser {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email: email.to_string(),
            password_hash: String::new(),
            provider: AuthProvider::Google,
            avatar_url,
            bio: None,
            created_at: now_secs(),
        };
        self.insert_user(&user)?;
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<AuthUser>, AuthError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(USERS_TABLE).map_err(db_err)?;
        let result = table.get(id).map_err(db_err)?;
        match result {
            Some(value) => Ok(Some(bincode::deserialize(value.value()).map_err(db_err)?)),
            None => Ok(None),
        }
    }

    pub fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<AuthUser, AuthError> {
        let mut user = self.get_user(id)?.ok_or(AuthError::UserNotFound)?;
        let username = update.username.filter(|value| !value.trim().is_empty());
        let email = update.email.filter(|value| !value.trim().is_empty());

        if username.is_some() || email.is_some() {
            let clash = self.find_user(|other| {
                other.id != user.id
                    && (username
                        .as_deref()
                        .is_some_and(|name| other.username.eq_ignore_ascii_case(name.trim()))
                        || email
                            .as_deref()
                            .is_some_and(|mail| other.email.eq_ignore_ascii_case(mail.trim())))
            })?;
            if clash.is_some() {
                return Err(AuthError::UserExists);
            }
        }

        if let Some(username) = username {
            user.username = username.trim().to_string();
        }
        if let Some(email) = email {
            user.email = email.trim().to_string();
        }
        if update.avatar_url.is_some() {
            user.avatar_url = update.avatar_url;
        }
        if update.bio.is_some() {
            user.bio = update.bio;
        }
        self.put_user(&user)?;
        Ok(user)
    }

    pub fn create_session(&self, user_id: &str) -> Result<SessionToken, AuthError> {
        let session = SessionToken {
            token: generate_token(),
            user_id: user_id.to_string(),
            expires_at: now_secs() + self.session_ttl.as_secs(),
        };
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(SESSIONS_TABLE).map_err(db_err)?;
            let bytes = bincode::serialize(&session).map_err(db_err)?;
            table
                .insert(session.token.as_str(), bytes.as_slice())
                .map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(session)
    }

    pub fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(SESSIONS_TABLE).map_err(db_err)?;
            table.remove(token).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    /// Drops every session whose expiry has passed; returns how many went.
    pub fn purge_expired_sessions(&self) -> Result<usize, AuthError> {
        let now = now_secs();
        let txn = self.db.begin_write().map_err(db_err)?;
        let removed = {
            let mut table = txn.open_table(SESSIONS_TABLE).map_err(db_err)?;
            let mut expired = Vec::new();
            for item in table.iter().map_err(db_err)? {
                let item = item.map_err(db_err)?;
                let session: SessionToken = bincode::deserialize(item.1.value()).map_err(db_err)?;
                if session.expires_at <= now {
                    expired.push(session.token);
                }
            }
            for token in &expired {
                table.remove(token.as_str()).map_err(db_err)?;
            }
            expired.len()
        };
        txn.commit().map_err(db_err)?;
        Ok(removed)
    }

    pub fn user_from_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let sessions = read_txn.open_table(SESSIONS_TABLE).map_err(db_err)?;
        let session: SessionToken = match sessions.get(token).map_err(db_err)? {
            Some(value) => bincode::deserialize(value.value()).map_err(db_err)?,
            None => return Ok(None),
        };
        if session.expires_at <= now_secs() {
            return Ok(None);
        }

        let users = read_txn.open_table(USERS_TABLE).map_err(db_err)?;
        let result = users.get(session.user_id.as_str()).map_err(db_err)?;
        match result {
            Some(value) => Ok(Some(bincode::deserialize(value.value()).map_err(db_err)?)),
            None => Ok(None),
        }
    }

    fn find_user<F>(&self, matches: F) -> Result<Option<AuthUser>, AuthError>
    where
        F: Fn(&AuthUser) -> bool,
    {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(USERS_TABLE).map_err(db_err)?;
        for item in table.iter().map_err(db_err)? {
            let item = item.map_err(db_err)?;
            let user: AuthUser = bincode::deserialize(item.1.value()).map_err(db_err)?;
            if matches(&user) {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    /// Inserts a new user, rejecting a username or email that is already taken.
    fn insert_user(&self, user: &AuthUser) -> Result<(), AuthError> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(USERS_TABLE).map_err(db_err)?;
            for item in table.iter().map_err(db_err)? {
                let item = item.map_err(db_err)?;
                let other: AuthUser = bincode::deserialize(item.1.value()).map_err(db_err)?;
                if other.username.eq_ignore_ascii_case(&user.username)
                    || (other.provider == user.provider
                        && other.email.eq_ignore_ascii_case(&user.email))
                {
                    return Err(AuthError::UserExists);
                }
            }
            let bytes = bincode::serialize(user).map_err(db_err)?;
            table.insert(user.id.as_str(), bytes.as_slice()).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    fn put_user(&self, user: &AuthUser) -> Result<(), AuthError> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(USERS_TABLE).map_err(db_err)?;
            let bytes = bincode::serialize(user).map_err(db_err)?;
            table.insert(user.id.as_str(), bytes.as_slice()).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::PasswordHash(err.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let chars = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    (0..32)
        .map(|_| chars[rng.random_range(0..chars.len())] as char)
        .collect()
}
