//! Credential helpers
//!
//! Password hashing, session JWTs and one-time (verification / reset) tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::JwtConfig;
use crate::entity::notification_view::Principal;
use crate::error::{AppError, AppResult};

/// Cookie carrying an HR-Admin session
pub const HR_COOKIE: &str = "HRtoken";
/// Cookie carrying an employee session
pub const EMPLOYEE_COOKIE: &str = "EMtoken";

const BCRYPT_COST: u32 = 12;

/// Lifetime of an email verification token
pub const VERIFY_TOKEN_HOURS: i64 = 24;
/// Lifetime of a password reset token
pub const RESET_TOKEN_HOURS: i64 = 1;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Account id inside the principal's table
    pub sub: i64,
    pub principal: Principal,
    /// Organization id
    pub org: i64,
    pub iat: i64,
    pub exp: i64,
}

impl Principal {
    pub fn cookie_name(self) -> &'static str {
        match self {
            Principal::Hr => HR_COOKIE,
            Principal::Employee => EMPLOYEE_COOKIE,
        }
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub fn check_password_strength(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Sign a session token for the given account.
pub fn issue_token(config: &JwtConfig, principal: Principal, id: i64, org: i64) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: id,
        principal,
        org,
        iat: now.timestamp(),
        exp: (now + Duration::hours(config.ttl_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
}

/// Verify signature and expiry of a session token.
pub fn decode_token(config: &JwtConfig, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        AppError::Unauthorized
    })
}

/// A fresh one-time token and the hash to persist for it.
pub fn one_time_token() -> (String, String) {
    let token = uuid::Uuid::new_v4().simple().to_string();
    let hash = hash_token(&token);
    (token, hash)
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Lower-cased, trimmed email; rejects obviously malformed input.
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.contains(char::is_whitespace) {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            ttl_hours: 1,
            secure_cookie: false,
        }
    }

    #[test]
    fn token_round_trip_keeps_identity() {
        let config = jwt_config();
        let token = issue_token(&config, Principal::Employee, 42, 7).unwrap();
        let claims = decode_token(&config, &token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.org, 7);
        assert_eq!(claims.principal, Principal::Employee);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&jwt_config(), Principal::Hr, 1, 1).unwrap();
        let other = JwtConfig {
            secret: "another".to_string(),
            ..jwt_config()
        };
        assert!(matches!(decode_token(&other, &token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = jwt_config();
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: 1,
            principal: Principal::Hr,
            org: 1,
            iat: past.timestamp(),
            exp: past.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_token(&config, &token).is_err());
    }

    #[test]
    fn one_time_token_hash_matches() {
        let (token, hash) = one_time_token();
        assert_eq!(hash_token(&token), hash);
        assert_eq!(hash.len(), 64);
        assert_ne!(token, hash);
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM ").unwrap(), "jane.doe@example.com");
        assert!(normalize_email("jane").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("jane@localhost").is_err());
        assert!(normalize_email("ja ne@example.com").is_err());
    }

    #[test]
    fn cookie_names_per_principal() {
        assert_eq!(Principal::Hr.cookie_name(), "HRtoken");
        assert_eq!(Principal::Employee.cookie_name(), "EMtoken");
    }

    #[test]
    fn password_rules() {
        assert!(check_password_strength("short").is_err());
        assert!(check_password_strength("long enough").is_ok());
        let hash = hash_password("long enough").unwrap();
        assert!(verify_password("long enough", &hash));
        assert!(!verify_password("wrong", &hash));
    }
}
