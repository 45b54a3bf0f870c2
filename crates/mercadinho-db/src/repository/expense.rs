//! # Expense Repository
//!
//! Operating expenses feed the net-profit line of cash-flow reports.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use mercadinho_core::Expense;

const EXPENSE_COLUMNS: &str = "id, description, category, amount_cents, incurred_at, created_at";

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        debug!(id = %expense.id, amount_cents = expense.amount_cents, "Inserting expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (id, description, category, amount_cents, incurred_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.description)
        .bind(&expense.category)
        .bind(expense.amount_cents)
        .bind(expense.incurred_at)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Expenses incurred in `[from, to)`, oldest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses \
             WHERE incurred_at >= ?1 AND incurred_at < ?2 \
             ORDER BY incurred_at"
        );
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::generate_id;
    use crate::repository::test_support::test_db;
    use chrono::Duration;

    fn expense(description: &str, amount_cents: i64, incurred_at: DateTime<Utc>) -> Expense {
        Expense {
            id: generate_id(),
            description: description.to_string(),
            category: Some("fixo".to_string()),
            amount_cents,
            incurred_at,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_between_filters_by_incurred_at() {
        let db = test_db().await;
        let now = Utc::now();
        db.expenses()
            .insert(&expense("Aluguel", 150_000, now - Duration::days(40)))
            .await
            .unwrap();
        db.expenses()
            .insert(&expense("Energia", 32_000, now - Duration::days(2)))
            .await
            .unwrap();

        let recent = db
            .expenses()
            .list_between(now - Duration::days(30), now)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].description, "Energia");
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let db = test_db().await;
        let err = db
            .expenses()
            .insert(&expense("Nada", 0, Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
