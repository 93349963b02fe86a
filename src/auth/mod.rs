use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            id: user_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub fn generate_jwt(user_id: Uuid, security: &SecurityConfig) -> Result<String, AuthError> {
    let secret = &security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let claims = Claims::new(user_id, security.jwt_expiry_hours);
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    let secret = &security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// bcrypt runs on the blocking pool; it is deliberately slow
pub async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

pub async fn verify_password(password: String, hashed: String) -> Result<bool, AuthError> {
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed)).await??;
    Ok(matches)
}

/// A fresh reset token: the plain value for the email and its sha256 digest for storage
pub fn generate_reset_token() -> (String, String) {
    let token = hex::encode(rand::random::<[u8; 20]>());
    let hashed = hash_reset_token(&token);
    (token, hashed)
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn security() -> SecurityConfig {
        let mut security = AppConfig::development().security;
        security.jwt_secret = "test-secret".to_string();
        security
    }

    #[test]
    fn jwt_round_trip_carries_user_id() {
        let security = security();
        let user_id = Uuid::new_v4();

        let token = generate_jwt(user_id, &security).unwrap();
        let claims = validate_jwt(&token, &security).unwrap();
        assert_eq!(claims.id, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn jwt_rejects_foreign_signature() {
        let security = security();
        let token = generate_jwt(Uuid::new_v4(), &security).unwrap();

        let mut other = security.clone();
        other.jwt_secret = "another-secret".to_string();
        assert!(matches!(validate_jwt(&token, &other), Err(AuthError::InvalidToken(_))));
        assert!(matches!(validate_jwt("garbage", &security), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        let mut security = security();
        security.jwt_secret.clear();
        assert!(matches!(generate_jwt(Uuid::new_v4(), &security), Err(AuthError::InvalidSecret)));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("123456".to_string(), 4).await.unwrap();
        assert_ne!(hashed, "123456");
        assert!(verify_password("123456".to_string(), hashed.clone()).await.unwrap());
        assert!(!verify_password("654321".to_string(), hashed).await.unwrap());
    }

    #[test]
    fn reset_token_is_stored_hashed() {
        let (token, hashed) = generate_reset_token();
        assert_eq!(token.len(), 40);
        assert_eq!(hashed.len(), 64);
        assert_eq!(hash_reset_token(&token), hashed);
        assert_ne!(token, hashed);
    }
}
