use crate::application_port::AuthError;

/// One-way hashing of secrets: user passwords and refresh tokens at rest.
/// Both uses go through the same primitive but always as separate calls
/// with independent salts.
#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    /// Produce a self-describing hash (parameters and salt embedded).
    async fn hash(&self, secret: &str) -> Result<String, AuthError>;

    /// Compare a candidate secret against a stored hash. A malformed hash
    /// verifies to `Ok(false)`, never an error.
    async fn verify(&self, secret: &str, hash: &str) -> Result<bool, AuthError>;
}
