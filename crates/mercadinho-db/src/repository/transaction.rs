//! # Provider Transaction Repository
//!
//! One row per PIX charge or Point payment intent created at Mercado Pago.
//! A retried card payment produces a second row for the same order.
//!
//! ```text
//! order ──1:N──► mp_transactions (kind, provider_id) UNIQUE
//!                 status: last value seen while polling
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use mercadinho_core::{ProviderTransaction, TransactionKind};

const TRANSACTION_COLUMNS: &str = r#"
    id, order_id, provider_id, kind, status, amount_cents, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Records a freshly created charge/intent.
    pub async fn record(
        &self,
        order_id: &str,
        kind: TransactionKind,
        provider_id: &str,
        status: &str,
        amount_cents: i64,
    ) -> DbResult<ProviderTransaction> {
        let now = Utc::now();
        let tx = ProviderTransaction {
            id: generate_id(),
            order_id: order_id.to_string(),
            provider_id: provider_id.to_string(),
            kind,
            status: status.to_string(),
            amount_cents,
            created_at: now,
            updated_at: now,
        };

        debug!(order_id = %order_id, provider_id = %provider_id, ?kind, "Recording provider transaction");

        sqlx::query(
            r#"
            INSERT INTO mp_transactions (
                id, order_id, provider_id, kind, status, amount_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.order_id)
        .bind(&tx.provider_id)
        .bind(tx.kind)
        .bind(&tx.status)
        .bind(tx.amount_cents)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(tx)
    }

    /// Stores the latest provider status for a charge/intent.
    pub async fn update_status(
        &self,
        kind: TransactionKind,
        provider_id: &str,
        status: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE mp_transactions
            SET status = ?3, updated_at = ?4
            WHERE kind = ?1 AND provider_id = ?2
            "#,
        )
        .bind(kind)
        .bind(provider_id)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Provider transaction", provider_id));
        }

        Ok(())
    }

    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<ProviderTransaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM mp_transactions WHERE order_id = ?1 ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, ProviderTransaction>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
