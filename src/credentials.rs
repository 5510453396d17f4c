//! File-backed credential store: users, API keys and access tokens.
//!
//! Every mutating operation updates the in-memory cache and persists the
//! affected user's system record to `<db>/sys/users/<username>.json`
//! immediately; there is no write-behind buffering. The public, caller-owned
//! [`UserData`] blob lives separately at `<db>/users/<username>.json` so that
//! application code can read/write it without touching authentication state.

use crate::{limits::CredentialLimits, rest::error::RestError};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{fs, sync::RwLock};
use tracing::instrument;

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 32;

#[inline]
fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect()
}

#[inline]
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[inline]
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// The server-wide key every password hash and signature is derived from.
///
/// Generated once on first startup and persisted at `<db>/sys/sha/master`;
/// every subsequent launch reuses it, so rotating it invalidates every
/// stored password hash, API secret signature and access token signature.
pub(crate) struct MasterKey(Vec<u8>);

impl MasterKey {
    async fn load_or_create(path: &Path) -> std::io::Result<Self> {
        if let Ok(bytes) = fs::read(path).await {
            return Ok(Self(bytes));
        }

        let key: Vec<u8> = rand::thread_rng()
            .sample_iter(&rand::distributions::Standard)
            .take(64)
            .collect();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, &key).await?;
        Ok(Self(key))
    }

    fn hmac_hex(&self, data: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(data);
        hex_encode(&mac.finalize().into_bytes())
    }
}

/// A single issued access token and its expiry, as stored alongside a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccessToken {
    token: String,
    expires_at: u64,
}

/// The system (authentication) record kept for a user.
///
/// Mirrors the original design's `sys_data` object: password hash, API
/// key/secret pairs and live access tokens, all indexed in lockstep.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSysRecord {
    username: String,
    password: String,
    api_keys: Vec<String>,
    api_secrets: Vec<String>,
    access_tokens: Vec<AccessToken>,
}

/// Arbitrary, application-owned data associated with a user.
///
/// Unlike [`UserSysRecord`] this is never read by the credential store
/// itself; it is returned and replaced verbatim on behalf of handlers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserData(pub serde_json::Value);

/// Async, file-backed store of users, API keys and access tokens.
///
/// All operations take `&self`; internal mutability is provided by a
/// [`tokio::sync::RwLock`] guarding an in-memory cache that mirrors the
/// on-disk system records. Reads take the read lock; any operation that
/// changes a user's keys or tokens takes the write lock and re-persists
/// that single user's record.
pub struct CredentialStore {
    sys_dir: PathBuf,
    data_dir: PathBuf,
    master_key: MasterKey,
    users: RwLock<HashMap<String, UserSysRecord>>,
    token_ttl: Duration,
}

impl CredentialStore {
    /// Opens (creating if necessary) a credential store rooted at `db_path`,
    /// using the default [`CredentialLimits`].
    ///
    /// Loads every existing system record from `<db_path>/sys/users/` into
    /// memory, and loads-or-generates the master signing key.
    pub async fn open(db_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        Self::open_with_limits(db_path, CredentialLimits::default()).await
    }

    /// Like [`Self::open`], but with an explicit [`CredentialLimits`]
    /// governing the default access-token lifetime issued by
    /// [`Self::issue_default_access_token`].
    pub async fn open_with_limits(
        db_path: impl Into<PathBuf>,
        limits: CredentialLimits,
    ) -> std::io::Result<Self> {
        let db_path = db_path.into();
        let sys_dir = db_path.join("sys").join("users");
        let data_dir = db_path.join("users");

        fs::create_dir_all(&sys_dir).await?;
        fs::create_dir_all(&data_dir).await?;

        let master_key = MasterKey::load_or_create(&db_path.join("sys").join("sha").join("master")).await?;

        let mut users = HashMap::new();
        let mut entries = fs::read_dir(&sys_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(bytes) = fs::read(entry.path()).await else {
                continue;
            };
            if let Ok(record) = serde_json::from_slice::<UserSysRecord>(&bytes) {
                users.insert(record.username.clone(), record);
            }
        }

        Ok(Self {
            sys_dir,
            data_dir,
            master_key,
            users: RwLock::new(users),
            token_ttl: limits.access_token_ttl,
        })
    }

    fn sys_path(&self, username: &str) -> PathBuf {
        self.sys_dir.join(format!("{username}.json"))
    }

    fn data_path(&self, username: &str) -> PathBuf {
        self.data_dir.join(format!("{username}.json"))
    }

    async fn persist(&self, record: &UserSysRecord) -> Result<(), RestError> {
        let bytes = serde_json::to_vec(record)?;
        fs::write(self.sys_path(&record.username), bytes).await?;
        Ok(())
    }

    /// Creates a new user with the given password and initial application data.
    ///
    /// Rejects usernames containing `+` (used as the key/token separator)
    /// and duplicate usernames.
    #[instrument(skip(self, password, data), level = "debug")]
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        data: serde_json::Value,
    ) -> Result<(), RestError> {
        if username.is_empty() || username.contains('+') {
            return Err(RestError::InvalidUsername);
        }

        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(RestError::DuplicateUsername);
        }

        let record = UserSysRecord {
            username: username.to_string(),
            password: self.master_key.hmac_hex(password.as_bytes()),
            api_keys: Vec::new(),
            api_secrets: Vec::new(),
            access_tokens: Vec::new(),
        };
        self.persist(&record).await?;
        fs::write(self.data_path(username), serde_json::to_vec(&data)?).await?;

        users.insert(username.to_string(), record);
        Ok(())
    }

    /// Deletes a user's system record and application data.
    pub async fn delete_user(&self, username: &str) -> Result<(), RestError> {
        let mut users = self.users.write().await;
        if users.remove(username).is_none() {
            return Err(RestError::UnknownUsername);
        }

        let _ = fs::remove_file(self.sys_path(username)).await;
        let _ = fs::remove_file(self.data_path(username)).await;
        Ok(())
    }

    /// Loads a user's application data.
    pub async fn load_data(&self, username: &str) -> Result<UserData, RestError> {
        if !self.users.read().await.contains_key(username) {
            return Err(RestError::UnknownUsername);
        }
        let bytes = fs::read(self.data_path(username)).await?;
        Ok(UserData(serde_json::from_slice(&bytes)?))
    }

    /// Overwrites a user's application data.
    pub async fn save_data(&self, username: &str, data: &UserData) -> Result<(), RestError> {
        if !self.users.read().await.contains_key(username) {
            return Err(RestError::UnknownUsername);
        }
        fs::write(self.data_path(username), serde_json::to_vec(&data.0)?).await?;
        Ok(())
    }

    /// Generates a new API key and secret for `username`.
    ///
    /// The key is returned as `<username>+<random>` so that the username
    /// can later be recovered from the key alone via [`Self::username_of`].
    pub async fn create_api_key(&self, username: &str) -> Result<(String, String), RestError> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(username)
            .ok_or(RestError::UnknownUsername)?;

        let api_key = format!("{username}+{}", generate_key());
        let api_secret = generate_key();

        record.api_keys.push(api_key.clone());
        record.api_secrets.push(api_secret.clone());
        self.persist(record).await?;

        Ok((api_key, api_secret))
    }

    /// Revokes a previously issued API key (and its paired secret).
    pub async fn delete_api_key(&self, username: &str, api_key: &str) -> Result<(), RestError> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(username)
            .ok_or(RestError::UnknownUsername)?;

        let index = record
            .api_keys
            .iter()
            .position(|k| k == api_key)
            .ok_or(RestError::InvalidApiKey)?;

        record.api_keys.remove(index);
        record.api_secrets.remove(index);
        self.persist(record).await?;
        Ok(())
    }

    /// Issues a new access token for `username`, valid for `expires_in`.
    pub async fn create_access_token(
        &self,
        username: &str,
        expires_in: Duration,
    ) -> Result<String, RestError> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(username)
            .ok_or(RestError::UnknownUsername)?;

        let token = format!("{username}+{}", generate_key());
        record.access_tokens.push(AccessToken {
            token: token.clone(),
            expires_at: now_secs() + expires_in.as_secs(),
        });
        self.persist(record).await?;
        Ok(token)
    }

    /// Issues a new access token for `username` using the store's configured
    /// [`CredentialLimits::access_token_ttl`], rather than a caller-chosen one.
    pub async fn issue_default_access_token(&self, username: &str) -> Result<String, RestError> {
        self.create_access_token(username, self.token_ttl).await
    }

    /// Revokes an access token before its natural expiry.
    pub async fn delete_access_token(
        &self,
        username: &str,
        access_token: &str,
    ) -> Result<(), RestError> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(username)
            .ok_or(RestError::UnknownUsername)?;

        let index = record
            .access_tokens
            .iter()
            .position(|t| t.token == access_token)
            .ok_or(RestError::InvalidAuth)?;

        record.access_tokens.remove(index);
        self.persist(record).await?;
        Ok(())
    }

    /// Verifies a username/password pair.
    pub async fn verify_user(&self, username: &str, password: &str) -> Result<(), RestError> {
        let users = self.users.read().await;
        let record = users.get(username).ok_or(RestError::UnknownUsername)?;

        if record.password == self.master_key.hmac_hex(password.as_bytes()) {
            Ok(())
        } else {
            Err(RestError::InvalidAuth)
        }
    }

    /// Verifies that `api_key` belongs to `username`.
    pub async fn verify_api_key(&self, username: &str, api_key: &str) -> Result<(), RestError> {
        let users = self.users.read().await;
        let record = users.get(username).ok_or(RestError::UnknownUsername)?;

        if record.api_keys.iter().any(|k| k == api_key) {
            Ok(())
        } else {
            Err(RestError::InvalidApiKey)
        }
    }

    /// Verifies an API key together with a caller-supplied signature of `data`,
    /// computed with that key's paired secret (the `KEY+SIGN` auth mode).
    pub async fn verify_signature(
        &self,
        username: &str,
        api_key: &str,
        signature: &str,
        data: &[u8],
    ) -> Result<(), RestError> {
        let users = self.users.read().await;
        let record = users.get(username).ok_or(RestError::UnknownUsername)?;

        let index = record
            .api_keys
            .iter()
            .position(|k| k == api_key)
            .ok_or(RestError::InvalidApiKey)?;

        let expected = hmac_hex_with(record.api_secrets[index].as_bytes(), data);
        if expected == signature {
            Ok(())
        } else {
            Err(RestError::InvalidSignature)
        }
    }

    /// Verifies an access token belonging to `username`.
    ///
    /// Expired tokens are swept (and the record re-persisted) whenever this
    /// runs across one, regardless of whether the requested token matches.
    pub async fn verify_access_token(
        &self,
        username: &str,
        access_token: &str,
    ) -> Result<(), RestError> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(username)
            .ok_or(RestError::UnknownUsername)?;

        let now = now_secs();
        let had_expired = record.access_tokens.iter().any(|t| t.expires_at <= now);
        let verified = record
            .access_tokens
            .iter()
            .any(|t| t.expires_at > now && t.token == access_token);

        if had_expired {
            tracing::trace!(username, "sweeping expired access tokens");
            record.access_tokens.retain(|t| t.expires_at > now);
            self.persist(record).await?;
        }

        if verified {
            Ok(())
        } else {
            Err(RestError::InvalidAuth)
        }
    }

    /// Recovers the username embedded in an API key or access token of the
    /// form `<username>+<random>`, without verifying it against the store.
    pub fn username_of(credential: &str) -> Result<&str, RestError> {
        credential
            .split_once('+')
            .map(|(username, _)| username)
            .ok_or(RestError::InvalidApiKey)
    }

    /// Signs `data` with the secret paired to `api_key`, for use by clients
    /// constructing a `KEY+SIGN` request.
    pub async fn sign(&self, username: &str, api_key: &str, data: &[u8]) -> Result<String, RestError> {
        let users = self.users.read().await;
        let record = users.get(username).ok_or(RestError::UnknownUsername)?;

        let index = record
            .api_keys
            .iter()
            .position(|k| k == api_key)
            .ok_or(RestError::InvalidApiKey)?;

        Ok(hmac_hex_with(record.api_secrets[index].as_bytes(), data))
    }

    /// Raw HMAC-SHA256 over `data` using the store's master key, hex-encoded.
    pub fn hmac(&self, data: &[u8]) -> String {
        self.master_key.hmac_hex(data)
    }
}

fn hmac_hex_with(key: &[u8], data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    hex_encode(&mac.finalize().into_bytes())
}
