//! Password hashing with Argon2id.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use super::AuthError;

/// One-way password hasher.
///
/// Every call to [`hash`](Self::hash) uses a fresh random salt, so hashing the
/// same input twice yields different PHC strings.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    cost: u32,
    memory_kib: u32,
}

impl CredentialHasher {
    /// Create a hasher with the given iteration count and memory cost (KiB).
    ///
    /// # Errors
    ///
    /// Returns error if the parameters are outside Argon2's accepted range.
    pub fn new(cost: u32, memory_kib: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| AuthError::Config(format!("Invalid hash parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            cost,
            memory_kib,
        })
    }

    /// Hash a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns error if the hashing primitive fails.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hashing(format!("Password hashing failed: {e}")))
    }

    /// Check whether `plaintext` produced `hash`.
    ///
    /// Returns `Ok(false)` on mismatch. The comparison is constant-time.
    ///
    /// # Errors
    ///
    /// Returns error if `hash` is not a valid PHC string.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| AuthError::Hashing(format!("Invalid hash: {e}")))?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hashing(format!("Verification failed: {e}"))),
        }
    }

    /// Hash on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns error if hashing fails or the blocking task panics.
    pub async fn hash_async(&self, plaintext: String) -> Result<String, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Hashing(format!("Hashing task failed: {e}")))?
    }

    /// Verify on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns error if the hash is malformed or the blocking task panics.
    pub async fn verify_async(&self, plaintext: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .map_err(|e| AuthError::Hashing(format!("Verification task failed: {e}")))?
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("cost", &self.cost)
            .field("memory_kib", &self.memory_kib)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(1, 64).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("password123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("password123", &hash).unwrap());
        assert!(!hasher.verify("password124", &hash).unwrap());
    }

    #[test]
    fn test_salt_is_random() {
        let hasher = hasher();
        let first = hasher.hash("same").unwrap();
        let second = hasher.hash("same").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("same", &first).unwrap());
        assert!(hasher.verify("same", &second).unwrap());
    }

    #[test]
    fn test_empty_password() {
        let hasher = hasher();
        let hash = hasher.hash("").unwrap();
        assert!(hasher.verify("", &hash).unwrap());
        assert!(!hasher.verify(" ", &hash).unwrap());
    }

    #[test]
    fn test_hash_verifies_across_cost_settings() {
        let hash = CredentialHasher::new(2, 128).unwrap().hash("pw").unwrap();
        assert!(hasher().verify("pw", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        let result = hasher().verify("password", "not-a-phc-string");
        assert!(matches!(result, Err(AuthError::Hashing(_))));
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(
            CredentialHasher::new(0, 64),
            Err(AuthError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hasher = hasher();
        let hash = hasher.hash_async("secret".to_string()).await.unwrap();
        assert!(
            hasher
                .verify_async("secret".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(
            !hasher
                .verify_async("other".to_string(), hash)
                .await
                .unwrap()
        );
    }
}
