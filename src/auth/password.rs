use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

/// Salted Argon2id PHC string for a plaintext credential.
pub fn hash_credential(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "credential hashing failed");
            anyhow::anyhow!("hash credential: {e}")
        })
}

/// `Ok(false)` on mismatch; `Err` only when the stored value is not a PHC hash.
pub fn verify_credential(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored credential is not a valid hash");
        anyhow::anyhow!("parse stored credential: {e}")
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!(error = %e, "credential verification failed");
            Err(anyhow::anyhow!("verify credential: {e}"))
        }
    }
}
