//! Bearer-token authentication.
//!
//! Each user holds opaque API tokens: 32 random bytes, handed out once as
//! hex and stored only as a SHA-256 digest. Password and email flows are
//! deliberately absent — this daemon trusts whoever holds a token.

use crate::error::ServiceError;
use crate::storage::{Storage, UserRow};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of a plaintext token — the only form ever persisted.
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Create a user and issue their first token. The plaintext token is
/// returned exactly once.
pub async fn register(
    storage: &Storage,
    email: &str,
    timezone: Option<&str>,
) -> Result<(UserRow, String), ServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::Validation("invalid email address".into()));
    }
    if storage.get_user_by_email(&email).await?.is_some() {
        return Err(ServiceError::Conflict("email already registered".into()));
    }

    let user = storage
        .create_user(&email, timezone.unwrap_or("UTC"))
        .await?;
    let token = generate_token();
    storage.insert_auth_token(&token_hash(&token), &user.id).await?;
    Ok((user, token))
}

/// Replace all of the user's tokens with a fresh one.
pub async fn rotate_token(storage: &Storage, user_id: &str) -> Result<String, ServiceError> {
    storage.delete_auth_tokens_for_user(user_id).await?;
    let token = generate_token();
    storage.insert_auth_token(&token_hash(&token), user_id).await?;
    Ok(token)
}

/// Resolve a bearer token to its owner.
pub async fn authenticate(storage: &Storage, token: &str) -> Result<String, ServiceError> {
    storage
        .user_id_for_token(&token_hash(token))
        .await?
        .ok_or(ServiceError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hash_is_stable_hex() {
        let h = token_hash("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, token_hash("abc"));
        assert_ne!(h, token_hash("abd"));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
        assert_eq!(generate_token().len(), 64);
    }
}
