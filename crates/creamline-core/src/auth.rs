//! # Authentication Seam
//!
//! Trait boundary between the login flow and wherever credentials live.
//! The database layer implements [`CredentialStore`] with Argon2 password
//! hashes; tests can swap in an in-memory store.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::User;

/// Abstracts credential lookup and password verification.
///
/// Password hashes never leave the store; callers only see a yes/no.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up an active user by username. Returns `None` for unknown or
    /// deactivated accounts.
    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>>;

    /// Verifies a candidate password against the stored hash.
    async fn verify_password(&self, user: &User, password: &str) -> CoreResult<bool>;
}
