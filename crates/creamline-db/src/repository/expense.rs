//! Operating expenses. Recorded against a staff member and rolled into the
//! day-end cash position by the report repository.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use creamline_core::validation::{validate_name, validate_payment_amount};
use creamline_core::{CoreError, Expense};

use crate::error::DbResult;
use crate::repository::new_id;

const COLUMNS: &str = "id, description, amount_cents, category, expense_date, staff_id, created_at";

/// Input for recording an expense.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: String,
    pub amount_cents: i64,
    pub category: Option<String>,
    /// Defaults to now.
    pub expense_date: Option<DateTime<Utc>>,
    pub staff_id: String,
}

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Records an expense.
    pub async fn record(&self, input: NewExpense) -> DbResult<Expense> {
        validate_name("description", &input.description).map_err(CoreError::from)?;
        validate_payment_amount(input.amount_cents).map_err(CoreError::from)?;

        let now = Utc::now();
        let expense = Expense {
            id: new_id(),
            description: input.description.trim().to_string(),
            amount_cents: input.amount_cents,
            category: input.category,
            expense_date: input.expense_date.unwrap_or(now),
            staff_id: input.staff_id,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, description, amount_cents, category, expense_date, staff_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.description)
        .bind(expense.amount_cents)
        .bind(&expense.category)
        .bind(expense.expense_date)
        .bind(&expense.staff_id)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        Ok(expense)
    }

    /// Lists expenses within a date range, newest first.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {} FROM expenses \
             WHERE expense_date >= ?1 AND expense_date < ?2 \
             ORDER BY expense_date DESC LIMIT ?3",
            COLUMNS
        );
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(expenses)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    #[tokio::test]
    async fn test_record_and_list_in_range() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();

        repo.record(NewExpense {
            description: "Fuel for CL-01".into(),
            amount_cents: 5_000,
            category: Some("fuel".into()),
            expense_date: None,
            staff_id: "staff-1".into(),
        })
        .await
        .unwrap();

        let now = Utc::now();
        let today = repo
            .list_between(now - Duration::hours(1), now + Duration::hours(1), 10)
            .await
            .unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].amount_cents, 5_000);

        let yesterday = repo
            .list_between(now - Duration::days(2), now - Duration::days(1), 10)
            .await
            .unwrap();
        assert!(yesterday.is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db
            .expenses()
            .record(NewExpense {
                description: "Nothing".into(),
                amount_cents: 0,
                category: None,
                expense_date: None,
                staff_id: "staff-1".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
