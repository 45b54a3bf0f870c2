//! # Order Repository
//!
//! Orders and their line-item snapshots.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE (one transaction)                                            │
//! │     BEGIN                                                               │
//! │       INSERT orders (pending)                                           │
//! │       for each line:                                                    │
//! │         UPDATE products SET stock = stock - qty                         │
//! │           WHERE id = ? AND stock >= qty    ── 0 rows? ROLLBACK          │
//! │         INSERT order_items (snapshot)                                   │
//! │     COMMIT                                                              │
//! │                                                                         │
//! │  2. FINALIZE (exactly once)                                             │
//! │     UPDATE orders SET payment_status = approved|rejected                │
//! │       WHERE id = ? AND payment_status = 'pending'                       │
//! │     0 rows → NotFound("Pending order")                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping a `sqlx::Transaction` without committing rolls it back, so
//! every early `return Err(..)` inside `create` leaves nothing behind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use mercadinho_core::{CartItem, Order, OrderDraft, PaymentStatus};

const ORDER_COLUMNS: &str = r#"
    id, customer_id, subtotal_cents, discount_cents, total_cents,
    payment_method, installments, payment_status, external_payment_id,
    created_at, updated_at
"#;

/// `order_items` row, re-hydrated into a [`CartItem`] for display.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: String,
    product_id: String,
    name_snapshot: String,
    image_snapshot: Option<String>,
    unit_price_cents: i64,
    quantity: i64,
}

impl From<OrderItemRow> for CartItem {
    fn from(row: OrderItemRow) -> Self {
        CartItem {
            product_id: row.product_id,
            name: row.name_snapshot,
            image_url: row.image_snapshot,
            unit_price_cents: row.unit_price_cents,
            quantity: row.quantity,
        }
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a draft as a `pending` order, decrementing stock atomically.
    ///
    /// ## Errors
    /// - `InsufficientStock` if any line cannot be covered; nothing is written
    /// - `NotFound("Product")` if a line references a missing/inactive product
    pub async fn create(&self, draft: &OrderDraft) -> DbResult<Order> {
        let order = draft.clone().into_order(Utc::now());

        debug!(
            order_id = %order.id,
            items = order.items.len(),
            total_cents = order.total_cents,
            "Creating order"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, subtotal_cents, discount_cents, total_cents,
                payment_method, installments, payment_status, external_payment_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.total_cents)
        .bind(order.payment_method)
        .bind(order.installments)
        .bind(order.payment_status)
        .bind(&order.external_payment_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            let decremented = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - ?2, updated_at = ?3
                WHERE id = ?1 AND is_active = 1 AND stock >= ?2
                "#,
            )
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(order.created_at)
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let current: Option<(i64, bool)> =
                    sqlx::query_as("SELECT stock, is_active FROM products WHERE id = ?1")
                        .bind(&item.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                warn!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    requested = item.quantity,
                    "Stock decrement refused, rolling back order"
                );

                return Err(match current {
                    Some((stock, true)) => DbError::InsufficientStock {
                        product_id: item.product_id.clone(),
                        available: stock,
                        requested: item.quantity,
                    },
                    _ => DbError::not_found("Product", item.product_id.clone()),
                });
            }

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, position,
                    name_snapshot, image_snapshot, unit_price_cents, quantity,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(generate_id())
            .bind(&order.id)
            .bind(&item.product_id)
            .bind(position as i64)
            .bind(&item.name)
            .bind(&item.image_url)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(order.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            method = %order.payment_method,
            total_cents = order.total_cents,
            "Order created"
        );

        Ok(order)
    }

    /// Moves a pending order to `approved` or `rejected`, exactly once.
    ///
    /// `external_payment_id`, when given, replaces the stored provider id.
    pub async fn mark_payment_status(
        &self,
        order_id: &str,
        status: PaymentStatus,
        external_payment_id: Option<&str>,
    ) -> DbResult<()> {
        if !status.is_terminal() {
            return Err(DbError::CheckViolation {
                message: format!("order {order_id} cannot move back to {status}"),
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = ?2,
                external_payment_id = COALESCE(?3, external_payment_id),
                updated_at = ?4
            WHERE id = ?1 AND payment_status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(status)
        .bind(external_payment_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pending order", order_id));
        }

        info!(order_id = %order_id, status = %status, "Order payment status updated");
        Ok(())
    }

    /// Records the provider id of the current attempt on a pending order.
    pub async fn set_external_payment_id(
        &self,
        order_id: &str,
        external_payment_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET external_payment_id = ?2, updated_at = ?3
            WHERE id = ?1 AND payment_status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(external_payment_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pending order", order_id));
        }

        Ok(())
    }

    /// Loads an order with its items.
    pub async fn get_by_id(&self, order_id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(mut order) = order else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT order_id, product_id, name_snapshot, image_snapshot,
                   unit_price_cents, quantity
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        order.items = rows.into_iter().map(CartItem::from).collect();
        Ok(Some(order))
    }

    /// Orders created in `[from, to)`, oldest first, with items.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE created_at >= ?1 AND created_at < ?2 \
             ORDER BY created_at"
        );
        let mut orders = sqlx::query_as::<_, Order>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT i.order_id, i.product_id, i.name_snapshot, i.image_snapshot,
                   i.unit_price_cents, i.quantity
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE o.created_at >= ?1 AND o.created_at < ?2
            ORDER BY i.order_id, i.position
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        attach_items(&mut orders, rows);
        Ok(orders)
    }

    /// Most recent orders first, without items (admin list view).
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?1");
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }
}

fn attach_items(orders: &mut [Order], rows: Vec<OrderItemRow>) {
    let mut by_order: HashMap<String, Vec<CartItem>> = HashMap::new();
    for row in rows {
        by_order
            .entry(row.order_id.clone())
            .or_default()
            .push(CartItem::from(row));
    }
    for order in orders.iter_mut() {
        if let Some(items) = by_order.remove(&order.id) {
            order.items = items;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, test_db};
    use crate::Database;
    use chrono::Duration;
    use mercadinho_core::{Cart, PaymentMethod, Product};

    async fn stocked(db: &Database, name: &str, price: i64, stock: i64) -> Product {
        let p = product(name, price, price / 2, stock);
        db.products().insert(&p).await.unwrap();
        p
    }

    fn draft(items: &[(&Product, i64)]) -> OrderDraft {
        let mut cart = Cart::new();
        for (p, qty) in items {
            cart.add_item(p, *qty).unwrap();
        }
        OrderDraft::build(&cart, None, PaymentMethod::Pix, 1).unwrap()
    }

    #[tokio::test]
    async fn test_create_persists_order_items_and_stock() {
        let db = test_db().await;
        let coca = stocked(&db, "Coca", 450, 10).await;
        let agua = stocked(&db, "Agua", 200, 5).await;

        let order = db
            .orders()
            .create(&draft(&[(&coca, 1), (&agua, 1)]))
            .await
            .unwrap();

        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.total_cents, 650);

        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].name, "Coca");
        assert_eq!(loaded.items[1].unit_price_cents, 200);
        assert_eq!(loaded.subtotal_cents, 650);

        let coca_after = db.products().get_by_id(&coca.id).await.unwrap().unwrap();
        assert_eq!(coca_after.stock, 9);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        let coca = stocked(&db, "Coca", 450, 10).await;
        let pao = stocked(&db, "Pao", 100, 50).await;

        // The cart saw 50 in stock; another kiosk sold most of it meanwhile.
        let d = draft(&[(&coca, 2), (&pao, 40)]);
        db.orders().create(&draft(&[(&pao, 45)])).await.unwrap();

        let err = db.orders().create(&d).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 5,
                requested: 40,
                ..
            }
        ));

        // First line's decrement was rolled back, and no order exists.
        let coca_after = db.products().get_by_id(&coca.id).await.unwrap().unwrap();
        assert_eq!(coca_after.stock, 10);
        assert!(db.orders().get_by_id(&d.id).await.unwrap().is_none());
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
    }

    #[tokio::test]
    async fn test_missing_product_fails_creation() {
        let db = test_db().await;
        let ghost = product("Fantasma", 100, 50, 10);

        let err = db.orders().create(&draft(&[(&ghost, 1)])).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_payment_status_transitions_once() {
        let db = test_db().await;
        let coca = stocked(&db, "Coca", 450, 10).await;
        let order = db.orders().create(&draft(&[(&coca, 1)])).await.unwrap();

        db.orders()
            .set_external_payment_id(&order.id, "mp-1")
            .await
            .unwrap();
        db.orders()
            .mark_payment_status(&order.id, PaymentStatus::Approved, Some("mp-2"))
            .await
            .unwrap();

        let err = db
            .orders()
            .mark_payment_status(&order.id, PaymentStatus::Rejected, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.payment_status, PaymentStatus::Approved);
        assert_eq!(loaded.external_payment_id.as_deref(), Some("mp-2"));

        assert!(db
            .orders()
            .mark_payment_status(&order.id, PaymentStatus::Pending, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_list_between_attaches_items() {
        let db = test_db().await;
        let coca = stocked(&db, "Coca", 450, 10).await;
        let first = db.orders().create(&draft(&[(&coca, 1)])).await.unwrap();
        let second = db.orders().create(&draft(&[(&coca, 3)])).await.unwrap();

        let now = Utc::now();
        let orders = db
            .orders()
            .list_between(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(orders.len(), 2);
        let by_id: HashMap<_, _> = orders.iter().map(|o| (o.id.clone(), o)).collect();
        assert_eq!(by_id[&first.id].items[0].quantity, 1);
        assert_eq!(by_id[&second.id].items[0].quantity, 3);

        let none = db
            .orders()
            .list_between(now + Duration::hours(1), now + Duration::hours(2))
            .await
            .unwrap();
        assert!(none.is_empty());

        assert_eq!(db.orders().list_recent(1).await.unwrap().len(), 1);
    }
}
