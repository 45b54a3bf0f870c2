//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutService / route handler                                        │
//! │       │                                                                 │
//! │       │  db.orders().create(&draft)                                     │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── create(&draft)            one transaction: order + items + stock   │
//! │  ├── mark_payment_status(..)   pending → approved | rejected, once      │
//! │  └── list_between(from, to)    for cash-flow reports                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as::<_, T>` and
//! `#[derive(FromRow)]` rows, so the crate builds without a live
//! `DATABASE_URL` or prepared offline data.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Storefront catalogue, stock, costs
//! - [`customer::CustomerRepository`] - Identified customers (`users`)
//! - [`order::OrderRepository`] - Orders and their item snapshots
//! - [`expense::ExpenseRepository`] - Operating expenses
//! - [`transaction::TransactionRepository`] - Mercado Pago charges/intents
//! - [`settings::SettingsRepository`] - JSON key/value settings

pub mod customer;
pub mod expense;
pub mod order;
pub mod product;
pub mod settings;
pub mod transaction;

/// Helper to generate a new entity ID.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use mercadinho_core::Product;

    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn product(name: &str, price_cents: i64, cost_cents: i64, stock: i64) -> Product {
        Product {
            id: super::generate_id(),
            category_id: None,
            name: name.to_string(),
            barcode: None,
            image_url: Some(format!("https://cdn.mercadinho.local/{}.png", name)),
            price_cents,
            cost_cents,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
