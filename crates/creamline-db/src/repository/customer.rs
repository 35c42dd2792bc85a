//! # Customer Repository
//!
//! Customers plus the two derived balances the spec keeps out of the table:
//!
//! ```text
//! available_credit(c) = Σ returns.refund_cents  − Σ sales.credit_used_cents
//! outstanding(c)      = Σ sales.outstanding_cents over active sales
//! ```
//!
//! Both are computed on demand from the transaction history, never stored,
//! so they can't drift. Available credit is deliberately not clamped at
//! zero; a negative value is information, not an error.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use creamline_core::validation::validate_name;
use creamline_core::{CoreError, Customer};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const COLUMNS: &str = "id, name, phone, shop_name, address, created_at";

/// Input for creating a customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub shop_name: Option<String>,
    pub address: Option<String>,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer.
    pub async fn create(&self, input: NewCustomer) -> DbResult<Customer> {
        validate_name("name", &input.name).map_err(CoreError::from)?;

        let customer = Customer {
            id: new_id(),
            name: input.name.trim().to_string(),
            phone: input.phone,
            shop_name: input.shop_name,
            address: input.address,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, shop_name, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.shop_name)
        .bind(&customer.address)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?1", COLUMNS);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Lists customers sorted by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let sql = format!("SELECT {} FROM customers ORDER BY name LIMIT ?1", COLUMNS);
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Computes the customer's available return credit, in cents.
    ///
    /// Fails with `CustomerNotFound` for unknown ids so a typo'd id is not
    /// reported as zero credit.
    pub async fn available_credit(&self, customer_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?1")
            .bind(customer_id)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            return Err(DbError::Domain(CoreError::CustomerNotFound(
                customer_id.to_string(),
            )));
        }

        let credit = available_credit_on(&mut conn, customer_id).await?;
        debug!(customer_id = %customer_id, credit_cents = credit, "Computed available credit");
        Ok(credit)
    }

    /// Computes the customer's total outstanding balance over active sales.
    pub async fn outstanding_balance(&self, customer_id: &str) -> DbResult<i64> {
        let outstanding: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(outstanding_cents), 0)
            FROM sales
            WHERE customer_id = ?1 AND status = 'active'
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(outstanding)
    }
}

/// Credit aggregation usable inside another repository's transaction.
///
/// `Σ refund − Σ credit_used`; not clamped.
pub(crate) async fn available_credit_on(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<i64> {
    let credit: i64 = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COALESCE(SUM(refund_cents), 0) FROM returns WHERE customer_id = ?1)
          - (SELECT COALESCE(SUM(credit_used_cents), 0) FROM sales WHERE customer_id = ?1)
        "#,
    )
    .bind(customer_id)
    .fetch_one(conn)
    .await?;

    Ok(credit)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = test_db().await;
        let repo = db.customers();

        let created = repo
            .create(NewCustomer {
                name: "Corner Shop".into(),
                phone: Some("0771234567".into()),
                shop_name: Some("Corner Shop Pvt".into()),
                address: None,
            })
            .await
            .unwrap();

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Corner Shop");
        assert_eq!(repo.list(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_credit_for_unknown_customer_is_an_error() {
        let db = test_db().await;
        let err = db.customers().available_credit("nope").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CustomerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fresh_customer_has_zero_credit_and_outstanding() {
        let db = test_db().await;
        let customer = db
            .customers()
            .create(NewCustomer {
                name: "Fresh".into(),
                phone: None,
                shop_name: None,
                address: None,
            })
            .await
            .unwrap();

        assert_eq!(db.customers().available_credit(&customer.id).await.unwrap(), 0);
        assert_eq!(
            db.customers()
                .outstanding_balance(&customer.id)
                .await
                .unwrap(),
            0
        );
    }
}
