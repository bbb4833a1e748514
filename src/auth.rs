use crate::error::EngineError;
use crate::models::Teacher;
use sha2::{Digest, Sha256};

/// Credential checking is a pluggable collaborator: the engine never inspects
/// passwords itself, it only asks a verifier whether the supplied secret
/// matches the account.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, teacher: &Teacher, supplied: &str) -> bool;
}

/// Compares the hex SHA-256 digest of the supplied password against the
/// stored credential.
pub struct Sha256Verifier;

pub fn password_digest(supplied: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(supplied.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

impl CredentialVerifier for Sha256Verifier {
    fn verify(&self, teacher: &Teacher, supplied: &str) -> bool {
        match teacher.password.as_deref() {
            Some(stored) if !stored.is_empty() => stored == password_digest(supplied),
            _ => false,
        }
    }
}

/// Resolves a login attempt against the known teacher list. An unknown
/// username, an account with no password set, or a failed verification all
/// reject without mutating anything.
pub fn authenticate(
    teachers: &[Teacher],
    username: &str,
    password: &str,
    verifier: &dyn CredentialVerifier,
) -> Result<Teacher, EngineError> {
    let account = teachers
        .iter()
        .find(|t| t.username.as_deref() == Some(username) || t.name == username)
        .ok_or_else(|| EngineError::AuthFailure("unknown account".to_string()))?;

    if account.password.as_deref().unwrap_or("").is_empty() {
        return Err(EngineError::AuthFailure(
            "account has no password set".to_string(),
        ));
    }
    if !verifier.verify(account, password) {
        return Err(EngineError::AuthFailure("wrong password".to_string()));
    }
    Ok(account.clone())
}
