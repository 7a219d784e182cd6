//! Authentication utilities: JWT token management and password hashing

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::customer_import::SessionKey;
use crate::types::Request;

/// Role allowed to use the admin subjects
pub const ADMIN_ROLE: &str = "admin";

/// Token lifetime: one working day
const TOKEN_TTL_SECS: usize = 8 * 60 * 60;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User email
    pub email: String,
    /// User role
    pub role: String,
    /// Login session ID; survives refresh, new on every login
    pub sid: String,
    /// Issued at (unix timestamp)
    pub iat: usize,
    /// Expiration (unix timestamp)
    pub exp: usize,
}

/// Authentication result from extract_auth
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub user_id: Uuid,
    pub role: String,
    pub session_id: Uuid,
}

impl AuthInfo {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Key of this login session in the import staging store
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            user_id: self.user_id,
            session_id: self.session_id,
        }
    }
}

/// Generate a JWT access token
pub fn generate_token(
    user_id: Uuid,
    email: &str,
    role: &str,
    session_id: Uuid,
    secret: &str,
) -> Result<String> {
    let now = chrono::Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        sid: session_id.to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a JWT token and return claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("Invalid token: {}", e))?;

    Ok(token_data.claims)
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Extract authentication info from a NATS request.
pub fn extract_auth<T>(request: &Request<T>, jwt_secret: &str) -> Result<AuthInfo> {
    let token = request
        .token
        .as_ref()
        .ok_or_else(|| anyhow!("No authentication provided, JWT token is required"))?;

    let claims = validate_token(token, jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|e| anyhow!("Invalid user_id in token: {}", e))?;
    let session_id = Uuid::parse_str(&claims.sid)
        .map_err(|e| anyhow!("Invalid session id in token: {}", e))?;

    Ok(AuthInfo {
        user_id,
        role: claims.role,
        session_id,
    })
}

/// Authenticate a request for an admin subject.
///
/// On failure returns the `(code, message)` pair to reply with.
pub fn require_admin<T>(request: &Request<T>, jwt_secret: &str) -> std::result::Result<AuthInfo, (&'static str, &'static str)> {
    let auth_info = extract_auth(request, jwt_secret)
        .map_err(|_| ("UNAUTHORIZED", "Authentication required"))?;

    if !auth_info.is_admin() {
        return Err(("FORBIDDEN", "Admin access required"));
    }

    Ok(auth_info)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-at-least-32-bytes-long";

    // ---- Password hashing tests ----

    #[test]
    fn test_hash_password_produces_valid_hash() {
        let hash = hash_password("my-secure-password").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() > 50);
    }

    #[test]
    fn test_hash_password_different_each_time() {
        let hash1 = hash_password("same-password").unwrap();
        let hash2 = hash_password("same-password").unwrap();
        assert_ne!(hash1, hash2, "Hashes should differ due to random salt");
    }

    #[test]
    fn test_verify_password_correct() {
        let hash = hash_password("correct-password").unwrap();
        assert!(verify_password("correct-password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("correct-password").unwrap();
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("any-password", "not-a-valid-hash");
        assert!(result.is_err());
    }

    // ---- JWT token tests ----

    #[test]
    fn test_generate_and_validate_token() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let token = generate_token(user_id, "admin@example.com", "admin", session_id, TEST_SECRET).unwrap();

        let claims = validate_token(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "admin@example.com");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.sid, session_id.to_string());
        assert_eq!(claims.exp - claims.iat, 8 * 60 * 60);
    }

    #[test]
    fn test_validate_token_wrong_secret() {
        let token = generate_token(Uuid::new_v4(), "admin@example.com", "admin", Uuid::new_v4(), TEST_SECRET).unwrap();

        let result = validate_token(&token, "wrong-secret");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_token_malformed() {
        let result = validate_token("not.a.valid.token", TEST_SECRET);
        assert!(result.is_err());
    }

    // ---- extract_auth tests ----

    fn make_request_with_token(token: Option<String>) -> Request<serde_json::Value> {
        Request {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            token,
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_extract_auth_with_valid_token() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let token = generate_token(user_id, "admin@example.com", "admin", session_id, TEST_SECRET).unwrap();

        let request = make_request_with_token(Some(token));
        let auth = extract_auth(&request, TEST_SECRET).unwrap();

        assert_eq!(auth.user_id, user_id);
        assert_eq!(auth.session_id, session_id);
        assert!(auth.is_admin());
        assert_eq!(auth.session_key(), SessionKey { user_id, session_id });
    }

    #[test]
    fn test_extract_auth_no_token_fails() {
        let request = make_request_with_token(None);
        assert!(extract_auth(&request, TEST_SECRET).is_err());
    }

    #[test]
    fn test_extract_auth_invalid_token_fails() {
        let request = make_request_with_token(Some("bad-token".to_string()));
        assert!(extract_auth(&request, TEST_SECRET).is_err());
    }

    #[test]
    fn test_require_admin_rejects_other_roles() {
        let token = generate_token(Uuid::new_v4(), "editor@example.com", "editor", Uuid::new_v4(), TEST_SECRET).unwrap();
        let request = make_request_with_token(Some(token));

        let err = require_admin(&request, TEST_SECRET).unwrap_err();
        assert_eq!(err.0, "FORBIDDEN");
    }

    #[test]
    fn test_require_admin_without_token_is_unauthorized() {
        let request = make_request_with_token(None);
        let err = require_admin(&request, TEST_SECRET).unwrap_err();
        assert_eq!(err.0, "UNAUTHORIZED");
    }

    #[test]
    fn test_sessions_of_same_user_get_distinct_keys() {
        let user_id = Uuid::new_v4();
        let first = generate_token(user_id, "admin@example.com", "admin", Uuid::new_v4(), TEST_SECRET).unwrap();
        let second = generate_token(user_id, "admin@example.com", "admin", Uuid::new_v4(), TEST_SECRET).unwrap();

        let a = extract_auth(&make_request_with_token(Some(first)), TEST_SECRET).unwrap();
        let b = extract_auth(&make_request_with_token(Some(second)), TEST_SECRET).unwrap();
        assert_ne!(a.session_key(), b.session_key());
    }
}
