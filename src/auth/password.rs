//! Argon2id password hashing.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$digest`) so
//! verification reads every cost parameter back out of the stored value.

use crate::config::PasswordConfig;
use crate::error::AppError;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

const DUMMY_PASSWORD: &str = "careid-unknown-account";

#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    // Hash of DUMMY_PASSWORD under the configured params. Logins for absent
    // accounts verify against it so they cost the same as a wrong password.
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self, AppError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            Some(config.output_len),
        )
        .map_err(|e| AppError::ConfigError(format!("invalid argon2 parameters: {}", e)))?;

        let mut hasher = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        hasher.dummy_hash = Arc::from(hasher.hash(DUMMY_PASSWORD)?);
        Ok(hasher)
    }

    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| AppError::InternalError(format!("entropy source failed: {}", e)))?;
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| AppError::InternalError(format!("salt encoding failed: {}", e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::InternalError(format!("password hashing failed: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Returns `Ok(false)` on a wrong password and `Err` only when
    /// `encoded_hash` cannot be parsed.
    pub fn verify(&self, password: &str, encoded_hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(encoded_hash).map_err(malformed)?;

        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return Err(malformed(format!("unsupported algorithm {}", parsed.algorithm)));
        }
        let version = match parsed.version {
            Some(v) => Version::try_from(v).map_err(malformed)?,
            None => Version::V0x13,
        };
        let expected = parsed.hash.ok_or_else(|| malformed("missing digest"))?;
        let salt = parsed.salt.ok_or_else(|| malformed("missing salt"))?;

        let decimal = |name: &str| {
            parsed
                .params
                .get_decimal(name)
                .ok_or_else(|| malformed(format!("missing parameter {}", name)))
        };
        let params = Params::new(decimal("m")?, decimal("t")?, decimal("p")?, Some(expected.len()))
            .map_err(malformed)?;

        let mut salt_buf = [0u8; 64];
        let salt_bytes = salt.decode_b64(&mut salt_buf).map_err(malformed)?;

        let mut derived = vec![0u8; expected.len()];
        Argon2::new(Algorithm::Argon2id, version, params)
            .hash_password_into(password.as_bytes(), salt_bytes, &mut derived)
            .map_err(|e| AppError::InternalError(format!("password hashing failed: {}", e)))?;

        Ok(derived.ct_eq(expected.as_bytes()).into())
    }

    /// Runs [`PasswordHasher::hash`] on the blocking pool.
    pub async fn hash_async(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::InternalError(format!("password hashing task failed: {}", e)))?
    }

    /// Runs [`PasswordHasher::verify`] on the blocking pool.
    pub async fn verify_async(&self, password: &str, encoded_hash: &str) -> Result<bool, AppError> {
        let hasher = self.clone();
        let password = password.to_string();
        let encoded_hash = encoded_hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &encoded_hash))
            .await
            .map_err(|e| AppError::InternalError(format!("password verification task failed: {}", e)))?
    }

    /// Spends one full verification on `password` and discards the outcome.
    pub async fn verify_dummy_async(&self, password: &str) -> Result<(), AppError> {
        self.verify_async(password, &self.dummy_hash).await.map(|_| ())
    }
}

fn malformed(detail: impl std::fmt::Display) -> AppError {
    AppError::InternalError(format!("malformed password hash: {}", detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
            output_len: 32,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("correct horse!", &hash).unwrap());
        assert!(!hasher.verify("", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_self_describing() {
        let hash = hasher().hash("secret123").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"), "{}", hash);
        assert_eq!(hash.split('$').count(), 6);
    }

    #[test]
    fn test_salts_are_unique() {
        let hasher = hasher();
        let first = hasher.hash("same password").unwrap();
        let second = hasher.hash("same password").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify("same password", &first).unwrap());
        assert!(hasher.verify("same password", &second).unwrap());
    }

    #[test]
    fn test_verify_uses_embedded_parameters() {
        let cheap = hasher();
        let hash = cheap.hash("portable").unwrap();

        // A hasher configured differently still verifies older hashes.
        let other = PasswordHasher::new(&PasswordConfig {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
            output_len: 16,
        })
        .unwrap();
        assert!(other.verify("portable", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let hasher = hasher();
        assert!(matches!(hasher.verify("x", "not-a-hash"), Err(AppError::InternalError(_))));
        assert!(matches!(
            hasher.verify("x", "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA"),
            Err(AppError::InternalError(_))
        ));
    }

    #[test]
    fn test_rejects_other_algorithms() {
        let hash = "$argon2i$v=19$m=1024,t=1,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        assert!(matches!(hasher().verify("x", hash), Err(AppError::InternalError(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = PasswordHasher::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
            output_len: 32,
        });
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_dummy_hash_uses_configured_params() {
        let hasher = hasher();
        assert!(hasher.dummy_hash().starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(!hasher.verify("secret123", hasher.dummy_hash()).unwrap());
    }

    #[tokio::test]
    async fn test_verify_dummy_accepts_any_password() {
        let hasher = hasher();
        assert!(hasher.verify_dummy_async("anything").await.is_ok());
        assert!(hasher.verify_dummy_async("").await.is_ok());
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hasher = hasher();
        let hash = hasher.hash_async("async secret").await.unwrap();
        assert!(hasher.verify_async("async secret", &hash).await.unwrap());
        assert!(!hasher.verify_async("wrong", &hash).await.unwrap());
    }
}
