/// Password hashing and verification using Argon2id
///
/// Cost parameters come from [`PasswordConfig`]; the PHC string stores the
/// salt and parameters alongside the hash, so verification needs nothing else.
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use notes_core::PasswordConfig;
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2id hasher bound to one set of cost parameters
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Build a hasher, rejecting cost parameters Argon2 does not accept
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            config.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string
    ///
    /// A fresh random salt is generated per call, so hashing the same
    /// password twice yields different strings.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC hash
    ///
    /// * `Ok(true)` - password matches
    /// * `Ok(false)` - password does not match
    /// * `Err(PasswordError)` - the stored hash is unreadable
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        // Parameters are read back from the PHC string
        match self.argon2().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hasher = PasswordHasher::new(&light_config()).unwrap();
        let hash = hasher.hash("secret1").expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("secret1", &hash).expect("Verification failed"));
        assert!(!hasher.verify("secret2", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let hasher = PasswordHasher::new(&light_config()).unwrap();

        let hash1 = hasher.hash("same-password").unwrap();
        let hash2 = hasher.hash("same-password").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hasher.verify("same-password", &hash1).unwrap());
        assert!(hasher.verify("same-password", &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let hasher = PasswordHasher::new(&light_config()).unwrap();
        let result = hasher.verify("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_hash_carries_parameters() {
        let config = PasswordConfig {
            memory_cost: 2048,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        };
        let hash = PasswordHasher::new(&config).unwrap().hash("secret1").unwrap();

        assert!(hash.contains("m=2048"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=2"));

        // A hasher with different costs still verifies it
        let other = PasswordHasher::new(&light_config()).unwrap();
        assert!(other.verify("secret1", &hash).unwrap());
    }

    #[test]
    fn test_rejects_invalid_params() {
        let config = PasswordConfig {
            parallelism: 0,
            ..light_config()
        };
        assert!(matches!(
            PasswordHasher::new(&config),
            Err(PasswordError::HashingFailed(_))
        ));
    }
}
