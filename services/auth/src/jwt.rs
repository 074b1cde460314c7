//! JWT service for bearer token issuance and verification
//!
//! Tokens are HS256-signed with a process-wide secret and carry the user id,
//! email and role. There is no revocation list: rotating the secret
//! invalidates every token issued before.

use anyhow::Result;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Role, User};

/// Default validity window: 30 days
pub const DEFAULT_TOKEN_EXPIRY: u64 = 30 * 24 * 60 * 60;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Symmetric signing secret
    pub secret: String,
    /// Token expiration time in seconds (default: 30 days)
    pub token_expiry: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("token_expiry", &self.token_expiry)
            .finish()
    }
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Signing secret (required, non-empty)
    /// - `JWT_EXPIRY`: Token expiry in seconds (default: 2592000)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let token_expiry = std::env::var("JWT_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_EXPIRY);

        Ok(JwtConfig {
            secret,
            token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub id: Uuid,
    /// Email at issuance time
    pub email: String,
    /// Role at issuance time; authorization always re-reads the record
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// Token verification failures
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

fn now_secs() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TokenError::Encoding(format!("Failed to get current time: {}", e)))
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Issue a token for a stored user
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_for(user.id, &user.email, user.role)
    }

    /// Issue a token for an explicit identity
    pub fn issue_for(&self, id: Uuid, email: &str, role: Role) -> Result<String, TokenError> {
        let now = now_secs()?;
        let claims = Claims {
            id,
            email: email.to_string(),
            role,
            iat: now,
            exp: now + self.config.token_expiry,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Decode claims without checking signature or expiry
    ///
    /// Only for inspection such as logging; never base an access decision
    /// on the result.
    pub fn decode_unverified(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn service(secret: &str, token_expiry: u64) -> JwtService {
        JwtService::new(JwtConfig {
            secret: secret.to_string(),
            token_expiry,
        })
    }

    #[test]
    fn issued_token_verifies_with_identity() {
        let jwt = service("test-secret", DEFAULT_TOKEN_EXPIRY);
        let id = Uuid::new_v4();

        let token = jwt.issue_for(id, "alice@example.com", Role::Manager).unwrap();
        let claims = jwt.verify(&token).unwrap();

        assert_eq!(claims.id, id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_EXPIRY);
    }

    #[test]
    fn rotated_secret_invalidates_tokens() {
        let token = service("old-secret", DEFAULT_TOKEN_EXPIRY)
            .issue_for(Uuid::new_v4(), "a@b.co", Role::User)
            .unwrap();

        let result = service("new-secret", DEFAULT_TOKEN_EXPIRY).verify(&token);
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = service("test-secret", DEFAULT_TOKEN_EXPIRY);
        let now = now_secs().unwrap();
        let claims = Claims {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            role: Role::User,
            iat: now - 120,
            exp: now - 60,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &jwt.encoding_key).unwrap();

        assert!(matches!(jwt.verify(&token), Err(TokenError::Expired)));
        // Inspection still works on an expired token.
        assert_eq!(jwt.decode_unverified(&token).unwrap(), claims);
    }

    #[test]
    fn garbage_is_malformed() {
        let jwt = service("test-secret", DEFAULT_TOKEN_EXPIRY);
        assert!(matches!(jwt.verify("not.a.token"), Err(TokenError::Malformed(_))));
        assert!(jwt.decode_unverified("garbage").is_err());
    }

    #[test]
    #[serial]
    fn config_requires_secret() {
        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_EXPIRY");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("JWT_SECRET", "s3cr3t");
            std::env::set_var("JWT_EXPIRY", "60");
        }
        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.secret, "s3cr3t");
        assert_eq!(config.token_expiry, 60);
        assert!(!format!("{:?}", config).contains("s3cr3t"));

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_EXPIRY");
        }
    }
}
