//! Staff logins. Implements the [`CredentialStore`] seam over the `users`
//! table, with argon2 password hashes. Nothing else in the system sees a
//! password or a hash.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::warn;

use creamline_core::auth::CredentialStore;
use creamline_core::validation::validate_name;
use creamline_core::{CoreError, CoreResult, User};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const COLUMNS: &str = "id, username, password_hash, display_name, is_active, created_at";

/// Input for creating a staff login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

/// Repository for staff logins.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a staff login, hashing the password with argon2.
    pub async fn create(&self, input: NewUser) -> DbResult<User> {
        validate_name("username", &input.username).map_err(CoreError::from)?;
        validate_name("displayName", &input.display_name).map_err(CoreError::from)?;
        if input.password.len() < 8 {
            return Err(DbError::Domain(CoreError::InvalidRequest(
                "password must be at least 8 characters".into(),
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User {
            id: new_id(),
            username: input.username.trim().to_string(),
            password_hash,
            display_name: input.display_name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, display_name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Finds an active login by username.
    pub async fn find_active(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE username = ?1 AND is_active = 1",
            COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Deactivates a login. Sales it recorded keep referencing it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for UserRepository {
    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        self.find_active(username)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))
    }

    async fn verify_password(&self, user: &User, password: &str) -> CoreResult<bool> {
        use argon2::{Argon2, PasswordHash, PasswordVerifier};

        let parsed = match PasswordHash::new(&user.password_hash) {
            Ok(hash) => hash,
            Err(e) => {
                // A malformed hash is a data problem, not a wrong password
                warn!(username = %user.username, error = %e, "Stored password hash is malformed");
                return Err(CoreError::StoreUnavailable(
                    "stored credential is unreadable".into(),
                ));
            }
        };

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

fn hash_password(password: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn counter_login() -> NewUser {
        NewUser {
            username: "counter1".into(),
            password: "yogurt-till-9".into(),
            display_name: "Counter One".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_verify_password() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let created = repo.create(counter_login()).await.unwrap();
        assert_ne!(created.password_hash, "yogurt-till-9");

        let found = repo.find_by_username("counter1").await.unwrap().unwrap();
        assert!(repo.verify_password(&found, "yogurt-till-9").await.unwrap());
        assert!(!repo.verify_password(&found, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn test_short_password_and_duplicate_username_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let mut short = counter_login();
        short.password = "short".into();
        assert!(matches!(
            repo.create(short).await.unwrap_err(),
            DbError::Domain(CoreError::InvalidRequest(_))
        ));

        repo.create(counter_login()).await.unwrap();
        assert!(matches!(
            repo.create(counter_login()).await.unwrap_err(),
            DbError::UniqueViolation { .. }
        ));
    }

    #[tokio::test]
    async fn test_deactivated_user_not_found_by_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let created = repo.create(counter_login()).await.unwrap();
        repo.deactivate(&created.id).await.unwrap();

        assert!(repo.find_by_username("counter1").await.unwrap().is_none());
    }
}
