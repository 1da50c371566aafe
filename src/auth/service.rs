//! Sign-up, sign-in and refresh flows.

use super::{
    password::{CredentialVerifier, HashingError},
    token::{TokenClass, TokenCodec, TokenError},
    validation::{normalize_login, validate_login, validate_password, PASSWORD_MAX_CHARS},
};
use crate::store::{StoreError, Subject, UserStore};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, instrument};
use uuid::Uuid;

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("login already exists")]
    LoginAlreadyExists,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    Hashing(#[from] HashingError),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Token(TokenError),
}

#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub subject: Subject,
    pub tokens: TokenPair,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    verifier: Arc<CredentialVerifier>,
    codec: Arc<TokenCodec>,
    config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        verifier: Arc<CredentialVerifier>,
        codec: Arc<TokenCodec>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            verifier,
            codec,
            config,
        }
    }

    #[must_use]
    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Create an account and issue its first token pair.
    ///
    /// # Errors
    /// [`AuthError::Validation`] for a bad login or password,
    /// [`AuthError::LoginAlreadyExists`] if the login is taken.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, login: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let login = normalize_login(login);
        validate_login(&login).map_err(AuthError::Validation)?;
        validate_password(password).map_err(AuthError::Validation)?;

        if self
            .users
            .find_by_login(&login)
            .await
            .map_err(AuthError::Store)?
            .is_some()
        {
            return Err(AuthError::LoginAlreadyExists);
        }

        let digest = self.hash_password(password).await?;
        let subject = self
            .users
            .create(&login, &digest)
            .await
            .map_err(|err| match err {
                // lost the race against a concurrent sign-up
                StoreError::Conflict => AuthError::LoginAlreadyExists,
                other => AuthError::Store(other),
            })?;

        let tokens = self.issue_pair(subject.id, &subject.login)?;
        debug!(subject = %subject.id, "account created");
        Ok(SignUpOutcome { subject, tokens })
    }

    /// Exchange a login and password for a token pair.
    ///
    /// # Errors
    /// [`AuthError::NotAuthenticated`] for an unknown login, a wrong or
    /// oversized password; these are indistinguishable. [`AuthError::Hashing`]
    /// if the verification task dies.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, login: &str, password: &str) -> Result<TokenPair, AuthError> {
        if password.chars().count() > PASSWORD_MAX_CHARS {
            debug!("sign-in rejected: password over {PASSWORD_MAX_CHARS} characters");
            return Err(AuthError::NotAuthenticated);
        }

        let login = normalize_login(login);
        let record = self
            .users
            .find_by_login(&login)
            .await
            .map_err(AuthError::Store)?;

        let verifier = Arc::clone(&self.verifier);
        let secret = password.to_string();
        let digest = record.as_ref().map(|r| r.password_hash.clone());
        let matched = blocking_outcome(
            tokio::task::spawn_blocking(move || match digest {
                Some(digest) => verifier.verify(&secret, &digest),
                None => {
                    verifier.verify_absent(&secret);
                    false
                }
            })
            .await,
        )?;

        match record {
            Some(record) if matched => self.issue_pair(record.subject.id, &record.subject.login),
            Some(_) => {
                debug!("sign-in rejected: password mismatch");
                Err(AuthError::NotAuthenticated)
            }
            None => {
                debug!("sign-in rejected: unknown login");
                Err(AuthError::NotAuthenticated)
            }
        }
    }

    /// Exchange a refresh token for a fresh pair bound to the same subject.
    ///
    /// # Errors
    /// [`AuthError::NotAuthenticated`] if the token fails validation or is
    /// not a refresh token.
    #[instrument(skip_all)]
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .codec
            .validate_as(refresh_token, TokenClass::Refresh)
            .map_err(|err| {
                debug!(reason = %err, "refresh rejected");
                AuthError::NotAuthenticated
            })?;
        self.issue_pair(claims.sub, &claims.username)
    }

    /// Hash a password off the async executor.
    ///
    /// # Errors
    /// Returns [`AuthError::Hashing`] if hashing fails.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let verifier = Arc::clone(&self.verifier);
        let secret = password.to_string();
        blocking_outcome(tokio::task::spawn_blocking(move || verifier.hash(&secret)).await)?
            .map_err(AuthError::Hashing)
    }

    fn issue_pair(&self, subject_id: Uuid, login: &str) -> Result<TokenPair, AuthError> {
        let access_token = self
            .codec
            .issue(subject_id, login, TokenClass::Access, self.config.access_ttl)
            .map_err(AuthError::Token)?;
        let refresh_token = self
            .codec
            .issue(subject_id, login, TokenClass::Refresh, self.config.refresh_ttl)
            .map_err(AuthError::Token)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_ttl.as_secs(),
        })
    }
}

/// A panicked or cancelled Argon2 task is an internal failure, never a
/// credential mismatch.
fn blocking_outcome<T>(joined: Result<T, JoinError>) -> Result<T, AuthError> {
    joined.map_err(|err| {
        error!("password hashing task failed: {err}");
        AuthError::Hashing(HashingError::Hash)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use secrecy::SecretString;

    fn service() -> AuthService {
        let codec = TokenCodec::new(&SecretString::from(
            "test-secret-test-secret-test-secret".to_string(),
        ))
        .unwrap();
        AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CredentialVerifier::insecure_fast().unwrap()),
            Arc::new(codec),
            AuthConfig::new(),
        )
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = service();
        let outcome = auth.sign_up("alice", "pw1").await.unwrap();
        assert_eq!(outcome.subject.login, "alice");
        assert_eq!(outcome.tokens.expires_in, DEFAULT_ACCESS_TTL.as_secs());

        let claims = auth
            .codec()
            .validate_as(&outcome.tokens.access_token, TokenClass::Access)
            .unwrap();
        assert_eq!(claims.sub, outcome.subject.id);

        let pair = auth.sign_in("alice", "pw1").await.unwrap();
        let claims = auth
            .codec()
            .validate_as(&pair.access_token, TokenClass::Access)
            .unwrap();
        assert_eq!(claims.sub, outcome.subject.id);
        assert_eq!(claims.username, "alice");
    }

    #[tokio::test]
    async fn duplicate_login_is_rejected() {
        let auth = service();
        auth.sign_up("alice", "pw1").await.unwrap();
        let err = auth.sign_up("alice", "pw2").await.unwrap_err();
        assert!(matches!(err, AuthError::LoginAlreadyExists));
        // trimmed logins collide too
        let err = auth.sign_up("  alice ", "pw2").await.unwrap_err();
        assert!(matches!(err, AuthError::LoginAlreadyExists));
    }

    #[tokio::test]
    async fn invalid_input_is_a_validation_error() {
        let auth = service();
        assert!(matches!(
            auth.sign_up("a", "pw1").await.unwrap_err(),
            AuthError::Validation(_)
        ));
        assert!(matches!(
            auth.sign_up("alice", "").await.unwrap_err(),
            AuthError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_login_look_the_same() {
        let auth = service();
        auth.sign_up("alice", "pw1").await.unwrap();

        let wrong = auth.sign_in("alice", "wrong").await.unwrap_err();
        let unknown = auth.sign_in("nobody", "pw1").await.unwrap_err();
        assert!(matches!(wrong, AuthError::NotAuthenticated));
        assert!(matches!(unknown, AuthError::NotAuthenticated));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn refresh_issues_a_new_pair_for_the_same_subject() {
        let auth = service();
        let outcome = auth.sign_up("alice", "pw1").await.unwrap();

        let pair = auth.refresh(&outcome.tokens.refresh_token).unwrap();
        assert_ne!(pair.refresh_token, outcome.tokens.refresh_token);
        let claims = auth
            .codec()
            .validate_as(&pair.access_token, TokenClass::Access)
            .unwrap();
        assert_eq!(claims.sub, outcome.subject.id);
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens_and_garbage() {
        let auth = service();
        let outcome = auth.sign_up("alice", "pw1").await.unwrap();
        assert!(matches!(
            auth.refresh(&outcome.tokens.access_token).unwrap_err(),
            AuthError::NotAuthenticated
        ));
        assert!(matches!(
            auth.refresh("not.a.token").unwrap_err(),
            AuthError::NotAuthenticated
        ));
    }

    #[tokio::test]
    async fn dead_verification_task_is_an_internal_failure() {
        let joined = tokio::task::spawn_blocking(|| -> bool { panic!("argon2 worker died") }).await;
        assert!(joined.is_err());
        assert!(matches!(
            blocking_outcome(joined).unwrap_err(),
            AuthError::Hashing(HashingError::Hash)
        ));

        let joined = tokio::task::spawn_blocking(|| true).await;
        assert!(blocking_outcome(joined).unwrap());
    }

    #[tokio::test]
    async fn oversized_password_is_rejected_like_a_wrong_one() {
        let auth = service();
        auth.sign_up("alice", "pw1").await.unwrap();

        let oversized = "p".repeat(PASSWORD_MAX_CHARS + 1);
        let err = auth.sign_in("alice", &oversized).await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
        let wrong = auth.sign_in("alice", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), wrong.to_string());

        // the bound itself is still accepted
        let longest = "p".repeat(PASSWORD_MAX_CHARS);
        auth.sign_up("bob", &longest).await.unwrap();
        auth.sign_in("bob", &longest).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_login_still_runs_a_verification() {
        let auth = service();
        let err = auth.sign_in("nobody", "pw1").await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
        assert!(auth.verifier.dummy_digest_verifies());
    }
}
