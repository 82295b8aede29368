//! Credentials and bearer tokens.
//!
//! Passwords are hashed with Argon2id and stored as PHC strings. Tokens are
//! compact HS256 JWS values (`header.claims.signature`, base64url without
//! padding) carrying the user id and an expiry; there is no server-side
//! session, refresh, or revocation. Expiry is the only lifetime bound.
//!
//! Signing uses HMAC-SHA256 (`hmac` + `sha2` crates).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use docvault_core::models::User;
use docvault_core::store::UserStore;
use docvault_core::{VaultError, VaultResult};

use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

/// Fixed JOSE header: `{"alg":"HS256","typ":"JWT"}`.
const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the authenticated user.
    pub id: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

/// Signing key plus token lifetime.
pub struct TokenKeys {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Reads the secret from the environment variable named in `[auth]`.
    pub fn from_config(config: &AuthConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config.signing_secret()?, config.token_ttl_secs))
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    /// Issues a token for `user_id`, valid from `now` for the configured TTL.
    pub fn issue(&self, user_id: &str, now: DateTime<Utc>) -> VaultResult<String> {
        let iat = now.timestamp();
        let claims = Claims {
            id: user_id.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        let claims_json = serde_json::to_vec(&claims)
            .map_err(|e| VaultError::Internal(format!("failed to encode claims: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(TOKEN_HEADER),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Verifies signature first, then expiry.
    ///
    /// A tampered token is `InvalidToken` even when it is also expired.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> VaultResult<Claims> {
        let mut parts = token.split('.');
        let (header, claims, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(c), Some(s)) if parts.next().is_none() => (h, c, s),
            _ => return Err(VaultError::InvalidToken),
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| VaultError::InvalidToken)?;
        let mut mac = self.mac();
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| VaultError::InvalidToken)?;

        let header_json = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| VaultError::InvalidToken)?;
        let header: serde_json::Value =
            serde_json::from_slice(&header_json).map_err(|_| VaultError::InvalidToken)?;
        if header.get("alg").and_then(|a| a.as_str()) != Some("HS256") {
            return Err(VaultError::InvalidToken);
        }

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| VaultError::InvalidToken)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| VaultError::InvalidToken)?;

        if now.timestamp() >= claims.exp {
            return Err(VaultError::TokenExpired);
        }
        Ok(claims)
    }
}

/// Identity of the caller, injected by the token gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?;
    let mut parts = value.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            (!token.is_empty()).then_some(token)
        }
        _ => None,
    }
}

/// The gate every protected route shares.
///
/// No token → `Unauthorized`; bad signature → `InvalidToken`; past expiry →
/// `TokenExpired`; otherwise the embedded user id becomes the caller.
pub fn authenticate(
    keys: &TokenKeys,
    authorization: Option<&str>,
    now: DateTime<Utc>,
) -> VaultResult<Caller> {
    let token = bearer_token(authorization).ok_or_else(|| {
        VaultError::Unauthorized("Access Denied: No Token Provided!".to_string())
    })?;
    let claims = keys.verify(token, now)?;
    Ok(Caller { user_id: claims.id })
}

/// [`authenticate`], then confirms the token's user still exists.
///
/// A validly signed token for an unknown account is `InvalidToken`.
pub async fn resolve_caller(
    users: &dyn UserStore,
    keys: &TokenKeys,
    authorization: Option<&str>,
    now: DateTime<Utc>,
) -> VaultResult<Caller> {
    let caller = authenticate(keys, authorization, now)?;
    if users.find_user_by_id(&caller.user_id).await?.is_none() {
        warn!(user_id = %caller.user_id, "token for unknown user rejected");
        return Err(VaultError::InvalidToken);
    }
    Ok(caller)
}

pub fn hash_password(password: &str) -> VaultResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| VaultError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Creates a user with a hashed password. No token is issued.
pub async fn register(users: &dyn UserStore, username: &str, password: &str) -> VaultResult<User> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(VaultError::Validation(
            "username and password are required".to_string(),
        ));
    }
    if users.find_user_by_username(username).await?.is_some() {
        return Err(VaultError::Conflict(format!(
            "username already exists: {}",
            username
        )));
    }

    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| VaultError::Internal(format!("hashing task failed: {}", e)))??;

    let user = User::new(username, password_hash);
    users.create_user(&user).await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Successful login: a fresh token plus the account it belongs to.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

pub async fn login(
    users: &dyn UserStore,
    keys: &TokenKeys,
    username: &str,
    password: &str,
) -> VaultResult<LoginOutcome> {
    let user = users
        .find_user_by_username(username.trim())
        .await?
        .ok_or_else(|| {
            VaultError::Unauthorized("Authentication failed. User not found.".to_string())
        })?;

    let password = password.to_string();
    let phc = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &phc))
        .await
        .map_err(|e| VaultError::Internal(format!("verification task failed: {}", e)))?;
    if !matches {
        return Err(VaultError::Unauthorized(
            "Authentication failed. Wrong password.".to_string(),
        ));
    }

    let token = keys.issue(&user.id, Utc::now())?;
    info!(user_id = %user.id, "authentication successful");
    Ok(LoginOutcome { token, user })
}
