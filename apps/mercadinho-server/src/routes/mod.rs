//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness + database ping
//!
//! # Products
//! GET    /api/products                         - Active products (storefront grid)
//! GET    /api/products/{id}/pricing            - Cost, price, profit, margin
//!
//! # Cart
//! GET    /api/cart                             - Current session
//! POST   /api/cart/items                       - Add product
//! PUT    /api/cart/items/{product_id}          - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}          - Remove line
//! DELETE /api/cart                             - Empty cart
//!
//! # Customer
//! POST   /api/customer                         - Identify by phone
//! DELETE /api/customer                         - Forget customer
//!
//! # Checkout
//! GET    /api/checkout                         - Session incl. payment state
//! GET    /api/checkout/payment-methods         - Methods offered right now
//! GET    /api/checkout/devices                 - Online card terminals
//! POST   /api/checkout/order                   - Open the pending order
//! POST   /api/checkout/pix                     - Start a PIX attempt
//! POST   /api/checkout/card                    - Start a card attempt
//! POST   /api/checkout/close                   - Close the payment modal
//!
//! # Admin
//! GET    /api/admin/integrations               - Redacted credential status
//! PUT    /api/admin/integrations               - Save one credential set
//! POST   /api/admin/integrations/{set}/toggle  - Switch a set on or off
//! POST   /api/admin/integrations/{set}/test    - Test connection
//! POST   /api/admin/devices/{id}/activate      - Put a terminal in PDV mode
//! GET    /api/admin/expenses                   - Expenses in a period
//! POST   /api/admin/expenses                   - Record an expense
//! GET    /api/admin/reports/cash-flow          - Period + daily rollups
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod reports;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use mercadinho_payments::PaymentProvider;
use serde::Serialize;

use crate::state::AppState;

/// Builds the full application router.
pub fn router<P: PaymentProvider>(state: AppState<P>) -> Router {
    Router::new()
        .route("/health", get(health::<P>))
        .nest("/api", api_routes::<P>())
        .with_state(state)
}

fn api_routes<P: PaymentProvider>() -> Router<AppState<P>> {
    Router::new()
        // Products
        .route("/products", get(products::list::<P>))
        .route("/products/{id}/pricing", get(products::pricing::<P>))
        // Cart
        .route("/cart", get(cart::get::<P>).delete(cart::clear::<P>))
        .route("/cart/items", post(cart::add_item::<P>))
        .route(
            "/cart/items/{product_id}",
            put(cart::update_item::<P>).delete(cart::remove_item::<P>),
        )
        // Customer
        .route(
            "/customer",
            post(cart::identify_customer::<P>).delete(cart::forget_customer::<P>),
        )
        // Checkout
        .route("/checkout", get(checkout::session::<P>))
        .route("/checkout/payment-methods", get(checkout::payment_methods::<P>))
        .route("/checkout/devices", get(checkout::devices::<P>))
        .route("/checkout/order", post(checkout::open_order::<P>))
        .route("/checkout/pix", post(checkout::pay_with_pix::<P>))
        .route("/checkout/card", post(checkout::pay_with_card::<P>))
        .route("/checkout/close", post(checkout::close::<P>))
        // Admin
        .route(
            "/admin/integrations",
            get(admin::integrations::<P>).put(admin::save_integration::<P>),
        )
        .route("/admin/integrations/{set}/toggle", post(admin::toggle::<P>))
        .route("/admin/integrations/{set}/test", post(admin::test_connection::<P>))
        .route("/admin/devices/{id}/activate", post(admin::activate_device::<P>))
        .route(
            "/admin/expenses",
            get(reports::list_expenses::<P>).post(reports::create_expense::<P>),
        )
        .route("/admin/reports/cash-flow", get(reports::cash_flow::<P>))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

/// 200 when the database answers, 503 otherwise.
async fn health<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db().health_check().await;
    let (code, status) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (code, Json(HealthResponse { status, database }))
}
