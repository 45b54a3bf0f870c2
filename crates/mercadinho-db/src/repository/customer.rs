//! # Customer Repository
//!
//! Identified customers live in the `users` table. The storefront
//! identifies a customer by phone number before checkout.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use mercadinho_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, discount_bps, created_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM users WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Looks a customer up by phone, ignoring formatting characters.
    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let digits = normalize_phone(phone);
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM users WHERE phone = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(digits)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Inserts a customer. The phone is stored as digits only.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO users (id, name, phone, email, discount_bps, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(customer.phone.as_deref().map(normalize_phone))
        .bind(&customer.email)
        .bind(customer.discount_bps)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// `(11) 99999-0000` → `11999990000`
fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}
