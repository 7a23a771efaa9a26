//! services/api/src/credentials.rs
//!
//! Password hashing and signed access tokens. The token itself is the
//! session: nothing is stored server-side, and there is no revocation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::ApiError;

/// Name of the cookie that carries the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

//=========================================================================================
// Passwords
//=========================================================================================

/// Hashes a password with Argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

/// Returns false on a mismatch and on a hash that cannot be parsed.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        error!("Stored password hash could not be parsed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

//=========================================================================================
// Tokens
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// The user's email.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, email: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!("Failed to sign token: {:?}", e);
            ApiError::Internal("Failed to sign token".to_string())
        })
    }

    /// Fails closed: any signature, format or expiry problem yields `None`.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256)) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!("Rejected access token: {}", e);
                None
            }
        }
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn session_cookie(&self, token: &str, secure: bool) -> String {
        format!(
            "{}={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}",
            ACCESS_TOKEN_COOKIE,
            token,
            if secure { " Secure;" } else { "" },
            self.ttl.num_seconds()
        )
    }
}

/// `Set-Cookie` value that clears the session.
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        ACCESS_TOKEN_COOKIE
    )
}

/// Finds the access token in a `Cookie` header value.
pub fn token_from_cookie_header(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        c.trim()
            .strip_prefix(ACCESS_TOKEN_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .filter(|token| !token.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn issued_token_verifies_with_the_same_secret() {
        let tokens = TokenService::new("secret", Duration::days(365));
        let token = tokens.issue("a@example.com").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "a@example.com");
        assert_eq!(claims.exp - claims.iat, Duration::days(365).num_seconds());
    }

    #[test]
    fn token_fails_closed() {
        let tokens = TokenService::new("secret", Duration::days(1));
        let token = tokens.issue("a@example.com").unwrap();

        let other = TokenService::new("other-secret", Duration::days(1));
        assert!(other.verify(&token).is_none());
        assert!(tokens.verify("not.a.token").is_none());

        let expired = TokenService::new("secret", Duration::days(-1));
        let stale = expired.issue("a@example.com").unwrap();
        assert!(tokens.verify(&stale).is_none());
    }

    #[test]
    fn cookie_carries_token_and_max_age() {
        let tokens = TokenService::new("secret", Duration::days(365));
        let cookie = tokens.session_cookie("abc", false);
        assert!(cookie.starts_with("access_token=abc; HttpOnly;"));
        assert!(cookie.contains("Max-Age=31536000"));
        assert!(!cookie.contains("Secure"));
        assert!(tokens.session_cookie("abc", true).contains("Secure"));
    }

    #[test]
    fn token_is_found_among_other_cookies() {
        assert_eq!(
            token_from_cookie_header("theme=dark; access_token=abc.def; lang=en"),
            Some("abc.def")
        );
        assert_eq!(token_from_cookie_header("access_token="), None);
        assert_eq!(token_from_cookie_header("access_token_old=zzz"), None);
    }
}
