use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("secret hashing failed: {0}")]
    Hash(String),

    #[error("stored hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hashes secret fields before they reach the store.
///
/// One salt is generated at construction and reused for every hash this
/// instance produces; callers must not assume per-record salts. Build one
/// per process and share it.
pub struct SecretHasher {
    salt: SaltString,
    argon2: Argon2<'static>,
}

impl SecretHasher {
    pub fn new() -> Self {
        Self::with_salt(SaltString::generate(&mut OsRng))
    }

    pub fn with_salt(salt: SaltString) -> Self {
        Self {
            salt,
            argon2: Argon2::default(),
        }
    }

    /// Fresh salt with explicit Argon2id cost parameters
    pub fn with_params(params: Params) -> Self {
        Self {
            salt: SaltString::generate(&mut OsRng),
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    pub fn salt(&self) -> &str {
        self.salt.as_str()
    }

    pub fn hash(&self, secret: &str) -> Result<String, HashError> {
        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &self.salt)
            .map_err(|e| HashError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hash).map_err(|e| HashError::MalformedHash(e.to_string()))?;
        Ok(self
            .argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}

impl Default for SecretHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretHasher").finish_non_exhaustive()
    }
}
