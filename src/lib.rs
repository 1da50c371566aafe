//! # Notekeeper (Notes API & Token Authority)
//!
//! `notekeeper` is a multi-tenant notes backend. Users sign up with a login and
//! password, receive a pair of signed tokens, and manage their own notes.
//!
//! ## Authentication
//!
//! Passwords are stored only as Argon2id digests. A successful sign-up or
//! sign-in returns two HS256 tokens signed with a single process-wide secret:
//!
//! - **Access tokens** are short lived and authorize API calls through the
//!   `Authorization: Bearer <token>` header.
//! - **Refresh tokens** are longer lived and can only be exchanged for a new
//!   access/refresh pair at `/api/v1/auth/refresh`.
//!
//! Tokens are stateless: validity is decided by signature and expiry alone, so
//! there is no server-side session table and no revocation.
//!
//! ## Authorization
//!
//! Every note has exactly one owner, assigned from the authenticated subject at
//! creation. Handlers check that the target exists (`404 Not Found`) before they
//! compare owners (`403 Forbidden`).

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
