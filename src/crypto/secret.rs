use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{AppError, Result};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// How a stored credential secret is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretScheme {
    /// Argon2 PHC string.
    Argon2,
    /// Unsalted SHA-256, lowercase hex.
    Sha256,
    /// The password itself.
    Plain,
}

impl SecretScheme {
    /// Infers the scheme from the shape of a stored secret.
    pub fn detect(stored: &str) -> Self {
        if stored.starts_with("$argon2") {
            SecretScheme::Argon2
        } else if stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit()) {
            SecretScheme::Sha256
        } else {
            SecretScheme::Plain
        }
    }

    pub fn is_legacy(&self) -> bool {
        !matches!(self, SecretScheme::Argon2)
    }

    /// Checks `password` against `stored` under this scheme.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match self {
            SecretScheme::Argon2 => verify_password(password, stored).unwrap_or_else(|e| {
                tracing::warn!("❌ Unreadable password hash: {}", e);
                false
            }),
            SecretScheme::Sha256 => {
                let digest = sha256_hex(password);
                digest
                    .as_bytes()
                    .ct_eq(stored.to_ascii_lowercase().as_bytes())
                    .into()
            }
            SecretScheme::Plain => password.as_bytes().ct_eq(stored.as_bytes()).into(),
        }
    }
}

/// Verifies a password against a stored secret of any supported scheme.
///
/// Legacy schemes only verify when `accept_legacy` is set.
pub fn verify_secret(password: &str, stored: &str, accept_legacy: bool) -> bool {
    let scheme = SecretScheme::detect(stored);

    if scheme.is_legacy() {
        if !accept_legacy {
            tracing::warn!("❌ Legacy {:?} secret rejected", scheme);
            return false;
        }
        let ok = scheme.verify(password, stored);
        if ok {
            tracing::warn!("⚠️ Login accepted with a legacy {:?} secret; rehash recommended", scheme);
        }
        return ok;
    }

    scheme.verify(password, stored)
}

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-encoded hash.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Hashing(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Hashing(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Hashing(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Verifies a password against an Argon2 hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Hashing(format!("Hash parse error: {}", e)))?;
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    Ok(result)
}

fn sha256_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_schemes_from_shape() {
        assert_eq!(SecretScheme::detect("$argon2id$v=19$m=19456,t=3,p=6$abc$def"), SecretScheme::Argon2);
        assert_eq!(SecretScheme::detect(&sha256_hex("admin123")), SecretScheme::Sha256);
        assert_eq!(SecretScheme::detect("admin123"), SecretScheme::Plain);
    }

    #[test]
    fn argon2_hash_verifies_only_the_right_password() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_secret("admin123", &hash, false));
        assert!(!verify_secret("admin124", &hash, false));
    }

    #[test]
    fn legacy_secrets_need_opt_in() {
        let digest = sha256_hex("admin123");
        assert!(verify_secret("admin123", &digest, true));
        assert!(!verify_secret("admin123", &digest, false));
        assert!(!verify_secret("wrong", &digest, true));

        assert!(verify_secret("admin123", "admin123", true));
        assert!(!verify_secret("admin123", "admin123", false));
        assert!(!verify_secret("admin12", "admin123", true));
    }

    #[test]
    fn sha256_comparison_ignores_hex_case() {
        let digest = sha256_hex("admin123").to_uppercase();
        assert!(verify_secret("admin123", &digest, true));
    }
}
