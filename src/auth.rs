// ABOUTME: Mock bearer-token authentication producing the caller identity
// ABOUTME: Tokens look like `mock:id=...:email=...:name=...` with URL-encoded values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Authentication
//!
//! Identity comes from a mock bearer token rather than a verified JWT:
//!
//! ```text
//! Authorization: Bearer mock:id=u-1:email=ada%40example.com:name=Ada
//! ```
//!
//! Missing fields fall back to defaults (a fresh UUID id, the mock email and
//! the mock display name). Anything that is not a `mock:` bearer token is
//! rejected.

use std::collections::HashMap;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Email used when a mock token does not carry one
pub const DEFAULT_MOCK_EMAIL: &str = "mock@pixelic.ai";

/// Display name used when a mock token does not carry one
pub const DEFAULT_MOCK_NAME: &str = "Mock User";

const MOCK_TOKEN_PREFIX: &str = "mock:";

/// Decoded identity of the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// User id, matched against the users table
    pub id: String,
    /// Email address
    pub email: String,
    /// Display name
    pub name: String,
}

/// Identity from an `Authorization` header value
///
/// # Errors
///
/// Returns `AUTH_REQUIRED` when the header is absent or not a bearer token,
/// and `AUTH_INVALID` when the token is not a well-formed mock token
pub fn authenticate_header(header: Option<&str>) -> Result<AuthenticatedUser, AppError> {
    let token = header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(AppError::auth_required)?;
    parse_mock_token(token)
}

/// Decode a `mock:key=value:...` token
///
/// Parts without both a key and a value are ignored; unknown keys are ignored.
///
/// # Errors
///
/// Returns `AUTH_INVALID` if the token lacks the `mock:` prefix or a value is
/// not valid percent-encoded UTF-8
pub fn parse_mock_token(token: &str) -> Result<AuthenticatedUser, AppError> {
    let raw = token.strip_prefix(MOCK_TOKEN_PREFIX).ok_or_else(|| {
        AppError::auth_invalid("Invalid mock token format. Must start with 'mock:'")
    })?;

    let mut fields = HashMap::new();
    for part in raw.split(':') {
        let mut pieces = part.split('=');
        let (Some(key), Some(value)) = (pieces.next(), pieces.next()) else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let decoded = urlencoding::decode(value)
            .map_err(|e| AppError::auth_invalid(format!("Malformed mock token value: {e}")))?;
        fields.insert(key, decoded.into_owned());
    }

    Ok(AuthenticatedUser {
        id: fields
            .remove("id")
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        email: fields
            .remove("email")
            .unwrap_or_else(|| DEFAULT_MOCK_EMAIL.to_owned()),
        name: fields
            .remove("name")
            .unwrap_or_else(|| DEFAULT_MOCK_NAME.to_owned()),
    })
}

/// Handlers take the identity the auth middleware stored in request extensions
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(AppError::auth_required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_full_token() {
        let user = parse_mock_token("mock:id=u-1:email=ada%40example.com:name=Ada%20L").unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada L");
    }

    #[test]
    fn test_defaults() {
        let user = parse_mock_token("mock:").unwrap();
        assert_eq!(user.email, DEFAULT_MOCK_EMAIL);
        assert_eq!(user.name, DEFAULT_MOCK_NAME);
        assert!(Uuid::parse_str(&user.id).is_ok());
    }

    #[test]
    fn test_ignores_incomplete_parts() {
        let user = parse_mock_token("mock:id=:email:name=Bo:=x").unwrap();
        assert_eq!(user.name, "Bo");
        assert_eq!(user.email, DEFAULT_MOCK_EMAIL);
        assert_ne!(user.id, "");
    }

    #[test]
    fn test_rejects_non_mock_tokens() {
        let error = parse_mock_token("eyJhbGciOi").unwrap_err();
        assert_eq!(error.code, ErrorCode::AuthInvalid);
        assert!(parse_mock_token("mock").is_err());
    }

    #[test]
    fn test_header_requires_bearer() {
        assert_eq!(
            authenticate_header(None).unwrap_err().code,
            ErrorCode::AuthRequired
        );
        assert_eq!(
            authenticate_header(Some("Basic abc")).unwrap_err().code,
            ErrorCode::AuthRequired
        );
        assert_eq!(
            authenticate_header(Some("Bearer mock:id=7")).unwrap().id,
            "7"
        );
    }
}
