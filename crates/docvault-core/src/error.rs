//! Error taxonomy shared by the repositories and the service layer.
//!
//! Every fallible service call returns a [`VaultError`]. The HTTP layer maps
//! each variant to exactly one status code; nothing here is retried.

/// Failure of a docvault operation.
#[derive(Debug)]
pub enum VaultError {
    /// Malformed or missing input (empty filename, unsupported file type, ...).
    Validation(String),
    /// Missing token, unknown user, or wrong password.
    Unauthorized(String),
    /// Token signature is valid but its expiry has passed.
    TokenExpired,
    /// Token is malformed or its signature does not verify.
    InvalidToken,
    /// The addressed record does not exist.
    NotFound(String),
    /// Caller is not the owner of the addressed record.
    Forbidden(String),
    /// Uniqueness violation (username, or filename per owner).
    Conflict(String),
    /// Extraction, conversion, or generative-API failure.
    Upstream(String),
    /// Storage failure or any other unexpected condition.
    Internal(String),
}

pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Stable machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Validation(_) => "bad_request",
            VaultError::Unauthorized(_) => "unauthorized",
            VaultError::TokenExpired => "token_expired",
            VaultError::InvalidToken => "invalid_token",
            VaultError::NotFound(_) => "not_found",
            VaultError::Forbidden(_) => "forbidden",
            VaultError::Conflict(_) => "conflict",
            VaultError::Upstream(_) => "upstream_error",
            VaultError::Internal(_) => "internal",
        }
    }
}

impl std::fmt::Display for VaultError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultError::Validation(msg)
            | VaultError::Unauthorized(msg)
            | VaultError::NotFound(msg)
            | VaultError::Forbidden(msg)
            | VaultError::Conflict(msg)
            | VaultError::Upstream(msg)
            | VaultError::Internal(msg) => f.write_str(msg),
            VaultError::TokenExpired => f.write_str("Token expired"),
            VaultError::InvalidToken => f.write_str("Invalid Token"),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<anyhow::Error> for VaultError {
    fn from(err: anyhow::Error) -> Self {
        VaultError::Internal(format!("{:#}", err))
    }
}
