//! # Checkout Handlers
//!
//! The payment modal talks to these endpoints. Starting a payment returns
//! `202 Accepted` immediately; the SPA then polls `GET /api/checkout` and
//! renders `payment` (QR code and countdown, terminal status, outcome).
//!
//! ```text
//!  POST /checkout/order ──► POST /checkout/pix ──► GET /checkout (poll) ──┐
//!         │                 POST /checkout/card                           │
//!         │                        ▲                                      │
//!         │                        └──── rejected / expired: retry ◄──────┤
//!         │                                                               │
//!         └───────────────► POST /checkout/close ◄──── approved / give up ┘
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use mercadinho_core::{Order, PaymentMethod};
use mercadinho_payments::{CheckoutSession, PaymentProvider, PointDevice};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenOrderRequest {
    pub method: PaymentMethod,
    #[serde(default = "single_installment")]
    pub installments: i64,
    /// Total the SPA displayed; rejected when it differs from ours.
    #[serde(default)]
    pub claimed_total_cents: Option<i64>,
}

fn single_installment() -> i64 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct PixRequest {
    #[serde(default)]
    pub payer_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CardRequest {
    #[serde(default)]
    pub device_id: Option<String>,
}

pub async fn session<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> Json<CheckoutSession> {
    Json(state.checkout().snapshot())
}

pub async fn payment_methods<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> Json<Vec<PaymentMethod>> {
    Json(state.checkout().available_payment_methods().await)
}

pub async fn devices<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> ApiResult<Json<Vec<PointDevice>>> {
    Ok(Json(state.checkout().list_online_devices().await?))
}

pub async fn open_order<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<OpenOrderRequest>,
) -> ApiResult<Json<Order>> {
    let order = state
        .checkout()
        .open_order(
            request.method,
            request.installments,
            request.claimed_total_cents,
        )
        .await?;
    Ok(Json(order))
}

pub async fn pay_with_pix<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<PixRequest>,
) -> ApiResult<(StatusCode, Json<CheckoutSession>)> {
    state.checkout().pay_with_pix(request.payer_email).await?;
    Ok((StatusCode::ACCEPTED, Json(state.checkout().snapshot())))
}

pub async fn pay_with_card<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<CardRequest>,
) -> ApiResult<(StatusCode, Json<CheckoutSession>)> {
    state.checkout().pay_with_card(request.device_id).await?;
    Ok((StatusCode::ACCEPTED, Json(state.checkout().snapshot())))
}

pub async fn close<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> ApiResult<Json<CheckoutSession>> {
    state.checkout().close().await?;
    Ok(Json(state.checkout().snapshot()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use mercadinho_core::PaymentStatus;
    use serde_json::json;

    use crate::routes::test_support::{call, TestApp};

    #[tokio::test]
    async fn test_no_methods_without_integrations() {
        let app = TestApp::new().await;
        let (status, body) =
            call(&app.router, Method::GET, "/api/checkout/payment-methods", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_inactive_point_is_configuration_error() {
        let app = TestApp::new().await;
        let product = app.product("Arroz 5kg", 2500, 1800, 5).await;
        app.add_to_cart(&product.id, 1).await;
        app.save_point(false).await;

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/checkout/order",
            Some(json!({ "method": "credit" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFIGURATION_ERROR");

        assert!(app.state.db().orders().list_recent(10).await.unwrap().is_empty());
        let stock = app.state.db().products().get_by_id(&product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 5);
    }

    #[tokio::test]
    async fn test_pix_checkout_end_to_end() {
        let app = TestApp::new().await;
        let bread = app.product("Pão de queijo", 450, 200, 10).await;
        let juice = app.product("Suco 300ml", 200, 90, 10).await;
        app.add_to_cart(&bread.id, 1).await;
        app.add_to_cart(&juice.id, 1).await;
        app.save_checkout(true).await;

        let (_, methods) =
            call(&app.router, Method::GET, "/api/checkout/payment-methods", None).await;
        assert_eq!(methods, json!(["pix"]));

        let (status, order) = call(
            &app.router,
            Method::POST,
            "/api/checkout/order",
            Some(json!({ "method": "pix", "claimed_total_cents": 650 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["subtotal_cents"], 650);
        assert_eq!(order["discount_cents"], 0);
        assert_eq!(order["total_cents"], 650);
        assert_eq!(order["payment_status"], "pending");
        let order_id = order["id"].as_str().unwrap().to_string();

        let (status, _) =
            call(&app.router, Method::POST, "/api/checkout/pix", Some(json!({}))).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        app.state.checkout().wait_for_payment().await;

        let (_, session) = call(&app.router, Method::GET, "/api/checkout", None).await;
        assert_eq!(session["payment"]["method"], "pix");
        assert_eq!(session["payment"]["status"]["state"], "approved");
        assert_eq!(session["order"]["payment_status"], "approved");
        assert_eq!(session["cart"]["items"].as_array().unwrap().len(), 0);

        let stored = app.state.db().orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Approved);
        assert_eq!(stored.external_payment_id.as_deref(), Some("stub-pix-1"));
    }

    #[tokio::test]
    async fn test_claimed_total_mismatch() {
        let app = TestApp::new().await;
        let bread = app.product("Pão de queijo", 450, 200, 10).await;
        app.add_to_cart(&bread.id, 1).await;
        app.save_checkout(true).await;

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/checkout/order",
            Some(json!({ "method": "pix", "claimed_total_cents": 400 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "BUSINESS_LOGIC");
    }

    #[tokio::test]
    async fn test_card_checkout_end_to_end() {
        let app = TestApp::new().await;
        let coffee = app.product("Café 500g", 1500, 1000, 3).await;
        app.add_to_cart(&coffee.id, 2).await;
        app.save_point(true).await;

        let (_, devices) = call(&app.router, Method::GET, "/api/checkout/devices", None).await;
        assert_eq!(devices[0]["id"], "PAX_A910__SMARTPOS1");

        let (status, _) = call(
            &app.router,
            Method::POST,
            "/api/checkout/order",
            Some(json!({ "method": "debit" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            call(&app.router, Method::POST, "/api/checkout/card", Some(json!({}))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        app.state.checkout().wait_for_payment().await;

        let (_, session) = call(&app.router, Method::GET, "/api/checkout", None).await;
        assert_eq!(session["payment"]["method"], "card");
        assert_eq!(session["payment"]["status"]["state"], "approved");
        assert_eq!(session["order"]["payment_status"], "approved");

        let stock = app.state.db().products().get_by_id(&coffee.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 1);

        let (_, session) = call(&app.router, Method::POST, "/api/checkout/close", None).await;
        assert!(session["order"].is_null());
        assert_eq!(session["payment"]["method"], "idle");
    }

    #[tokio::test]
    async fn test_pix_without_order() {
        let app = TestApp::new().await;
        app.save_checkout(true).await;
        let (status, body) =
            call(&app.router, Method::POST, "/api/checkout/pix", Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CHECKOUT_CONFLICT");
    }
}
