//! Password hashing and verification.
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$...`) with a random salt
//! per hash. Verification compares in constant time and collapses every
//! failure, including unparsable digests, into `false`.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;

/// Fixed input for the dummy digest used to equalize sign-in timing.
const DUMMY_SECRET: &str = "notekeeper-timing-equalizer";

#[derive(Debug, Error)]
pub enum HashingError {
    #[error("invalid argon2 parameters")]
    Params,
    #[error("failed to hash password")]
    Hash,
}

/// Hashes and verifies user passwords.
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
    dummy_digest: String,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier").finish_non_exhaustive()
    }
}

impl CredentialVerifier {
    /// Build a verifier with the default Argon2id cost parameters.
    ///
    /// # Errors
    /// Returns an error if the dummy digest cannot be produced.
    pub fn new() -> Result<Self, HashingError> {
        Self::with_params(Params::default())
    }

    /// Build a verifier with explicit Argon2id cost parameters.
    ///
    /// # Errors
    /// Returns an error if the dummy digest cannot be produced.
    pub fn with_params(params: Params) -> Result<Self, HashingError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_digest = hash_with(&argon2, DUMMY_SECRET)?;
        Ok(Self {
            argon2,
            dummy_digest,
        })
    }

    /// Cheapest parameter set Argon2 accepts. Only meant for tests.
    ///
    /// # Errors
    /// Returns an error if the parameters are rejected.
    pub fn insecure_fast() -> Result<Self, HashingError> {
        let params = Params::new(
            Params::MIN_M_COST,
            Params::MIN_T_COST,
            Params::MIN_P_COST,
            None,
        )
        .map_err(|_| HashingError::Params)?;
        Self::with_params(params)
    }

    /// Hash a secret into a PHC string.
    ///
    /// # Errors
    /// Returns an error if salt generation or hashing fails.
    pub fn hash(&self, secret: &str) -> Result<String, HashingError> {
        hash_with(&self.argon2, secret)
    }

    /// Check a secret against a stored digest.
    #[must_use]
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn the same work as a real verification when there is no account.
    pub fn verify_absent(&self, secret: &str) {
        let _ = self.verify(secret, &self.dummy_digest);
    }
}

#[cfg(test)]
impl CredentialVerifier {
    pub(crate) fn dummy_digest_verifies(&self) -> bool {
        self.verify(DUMMY_SECRET, &self.dummy_digest)
    }
}

fn hash_with(argon2: &Argon2<'_>, secret: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| HashingError::Hash)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{CredentialVerifier, DUMMY_SECRET};
    use argon2::{Params, PasswordHash};

    #[test]
    fn hash_and_verify_round_trip() {
        let verifier = CredentialVerifier::insecure_fast().unwrap();
        let digest = verifier.hash("correct horse").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(verifier.verify("correct horse", &digest));
        assert!(!verifier.verify("battery staple", &digest));
    }

    #[test]
    fn same_secret_gets_a_fresh_salt() {
        let verifier = CredentialVerifier::insecure_fast().unwrap();
        let first = verifier.hash("pw1-long-enough").unwrap();
        let second = verifier.hash("pw1-long-enough").unwrap();
        assert_ne!(first, second);
        assert!(verifier.verify("pw1-long-enough", &first));
        assert!(verifier.verify("pw1-long-enough", &second));
    }

    #[test]
    fn malformed_digest_is_a_plain_mismatch() {
        let verifier = CredentialVerifier::insecure_fast().unwrap();
        assert!(!verifier.verify("anything", ""));
        assert!(!verifier.verify("anything", "not-a-phc-string"));
        assert!(!verifier.verify("anything", "$argon2id$v=19$broken"));
    }

    #[test]
    fn digest_does_not_contain_the_secret() {
        let verifier = CredentialVerifier::insecure_fast().unwrap();
        let digest = verifier.hash("plaintext-secret").unwrap();
        assert!(!digest.contains("plaintext-secret"));
    }

    #[test]
    fn debug_output_is_opaque() {
        let verifier = CredentialVerifier::insecure_fast().unwrap();
        let rendered = format!("{verifier:?}");
        assert!(!rendered.contains("argon2id"));
    }

    #[test]
    fn dummy_digest_costs_a_real_verification() {
        let verifier = CredentialVerifier::insecure_fast().unwrap();
        let parsed = PasswordHash::new(&verifier.dummy_digest).unwrap();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        // same cost as account digests, so absent logins take as long
        assert_eq!(
            parsed.params.get_decimal("m"),
            Some(Params::MIN_M_COST)
        );
        assert_eq!(
            parsed.params.get_decimal("t"),
            Some(Params::MIN_T_COST)
        );
        assert!(verifier.verify(DUMMY_SECRET, &verifier.dummy_digest));
        assert!(verifier.dummy_digest_verifies());
        assert!(!verifier.verify("pw1", &verifier.dummy_digest));
    }
}
