use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum HashingError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
    #[error("hashing worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Salted argon2 hash with the library's default cost parameters.
pub fn hash_password(plain: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            HashingError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; errors when `hash` is not a usable argon2 hash.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, HashingError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        HashingError::MalformedHash(e.to_string())
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!(error = %e, algorithm = %parsed.algorithm, "argon2 verify error");
            Err(HashingError::MalformedHash(e.to_string()))
        }
    }
}

lazy_static! {
    // Same cost parameters as real hashes; `None` only if hashing itself is broken.
    static ref DUMMY_HASH: Option<String> = hash_password("nickauth-dummy-password").ok();
}

/// Spends one verify's worth of work against a throwaway hash, so a lookup
/// miss takes as long as a wrong password.
pub fn verify_dummy(plain: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plain, hash);
    }
}

pub async fn hash_password_blocking(plain: String) -> Result<String, HashingError> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

pub async fn verify_password_blocking(plain: String, hash: String) -> Result<bool, HashingError> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

pub async fn verify_dummy_blocking(plain: String) -> Result<(), HashingError> {
    tokio::task::spawn_blocking(move || verify_dummy(&plain)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple1!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password1!", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_plaintext_hashes_differently() {
        let a = hash_password("Secret1!").unwrap();
        let b = hash_password("Secret1!").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("Secret1!", &a).unwrap());
        assert!(verify_password("Secret1!", &b).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, HashingError::MalformedHash(_)));
    }

    #[test]
    fn verify_errors_on_foreign_algorithm() {
        let err = verify_password(
            "Secret1!",
            "$pbkdf2-sha256$i=1000$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaA",
        )
        .unwrap_err();
        assert!(matches!(err, HashingError::MalformedHash(_)));
    }

    #[test]
    fn verify_errors_on_out_of_range_params() {
        let err = verify_password(
            "Secret1!",
            "$argon2id$v=19$m=1,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaA",
        )
        .unwrap_err();
        assert!(matches!(err, HashingError::MalformedHash(_)));
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let hash = DUMMY_HASH.as_deref().expect("dummy hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(!verify_password("Secret1!", hash).unwrap());
    }

    #[tokio::test]
    async fn blocking_wrappers_roundtrip() {
        let hash = hash_password_blocking("Secret1!".into()).await.unwrap();
        assert!(verify_password_blocking("Secret1!".into(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("Secret2!".into(), hash).await.unwrap());
    }
}
