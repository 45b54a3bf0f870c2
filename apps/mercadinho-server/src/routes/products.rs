//! Product catalog handlers.

use axum::extract::{Path, State};
use axum::Json;
use mercadinho_core::pricing::PricingSummary;
use mercadinho_core::Product;
use mercadinho_payments::PaymentProvider;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upper bound for the storefront grid.
const CATALOG_LIMIT: u32 = 500;

pub async fn list<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state.db().products().list_active(CATALOG_LIMIT).await?;
    debug!(count = products.len(), "Listed products");
    Ok(Json(products))
}

/// Back-office pricing figures for one product.
pub async fn pricing<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PricingSummary>> {
    let product = state
        .db()
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(PricingSummary::new(product.cost(), product.price())))
}
