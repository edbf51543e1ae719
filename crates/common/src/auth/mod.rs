//! Shared-secret authentication for scheduled triggers
//!
//! Provides:
//! - Bearer token extraction
//! - Constant-length secret comparison via SHA-256 digests
//! - The `CronAuth` extractor guarding the cron route

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Proof that the request carried the configured cron secret
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

/// Hash a secret for comparison
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a presented token with the configured secret.
///
/// Both sides are hashed first so the comparison length never depends on
/// the caller's input. An unset or empty secret matches nothing.
pub fn secret_matches(presented: &str, configured: Option<&str>) -> bool {
    match configured {
        Some(secret) if !secret.is_empty() => hash_secret(presented) == hash_secret(secret),
        _ => false,
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for CronAuth
where
    S: Send + Sync,
    Arc<AppConfig>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let config = Arc::<AppConfig>::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing bearer token".to_string(),
            })?;

        if secret_matches(token, config.cron.secret.as_deref()) {
            Ok(CronAuth)
        } else {
            Err(AppError::Unauthorized {
                message: "Invalid cron secret".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer s3cret"), Some("s3cret"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("s3cret"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_secret_matches() {
        assert!(secret_matches("s3cret", Some("s3cret")));
        assert!(!secret_matches("wrong", Some("s3cret")));
        assert!(!secret_matches("anything", None));
        assert!(!secret_matches("", Some("")));
    }

    #[test]
    fn test_hash_secret_is_stable() {
        assert_eq!(hash_secret("a"), hash_secret("a"));
        assert_ne!(hash_secret("a"), hash_secret("b"));
        assert_eq!(hash_secret("a").len(), 64);
    }
}
