//! # Cart and Customer Handlers
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│  Order   │────►│ Approved │       │
//! │  │  Cart    │     │          │     │ pending  │     │ (cleared)│       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                              │
//! │                   add_item          locked until the                   │
//! │                   update_item       payment modal closes               │
//! │                   remove_item                                           │
//! │                   identify_customer                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every cart handler answers with the whole [`CheckoutSession`] so the SPA
//! can re-render from one value.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mercadinho_core::Customer;
use mercadinho_payments::{CheckoutSession, PaymentProvider};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyCustomerRequest {
    pub phone: String,
}

pub async fn get<P: PaymentProvider>(State(state): State<AppState<P>>) -> Json<CheckoutSession> {
    Json(state.checkout().snapshot())
}

pub async fn add_item<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<Json<CheckoutSession>> {
    debug!(product_id = %request.product_id, quantity = request.quantity, "add_item");
    let session = state
        .checkout()
        .add_item(&request.product_id, request.quantity)
        .await?;
    Ok(Json(session))
}

/// Sets the quantity of a line; `0` removes it.
pub async fn update_item<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Path(product_id): Path<String>,
    Json(request): Json<UpdateQuantityRequest>,
) -> ApiResult<Json<CheckoutSession>> {
    let session = state
        .checkout()
        .update_quantity(&product_id, request.quantity)?;
    Ok(Json(session))
}

pub async fn remove_item<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<CheckoutSession>> {
    Ok(Json(state.checkout().remove_item(&product_id)?))
}

pub async fn clear<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> ApiResult<Json<CheckoutSession>> {
    Ok(Json(state.checkout().clear_cart()?))
}

/// 404 when no customer has the phone; the checkout continues anonymous.
pub async fn identify_customer<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<IdentifyCustomerRequest>,
) -> ApiResult<Json<Customer>> {
    if request.phone.trim().is_empty() {
        return Err(ApiError::validation("phone is required"));
    }
    state
        .checkout()
        .identify_customer(&request.phone)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer", &request.phone))
}

pub async fn forget_customer<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> ApiResult<StatusCode> {
    state.checkout().forget_customer()?;
    Ok(StatusCode::NO_CONTENT)
}
