//! # Integration Admin Handlers
//!
//! Back-office panel for the two Mercado Pago credential sets.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout (PIX)                         Point (card terminal)           │
//! │  ───────────────                        ─────────────────────           │
//! │  access token  ****0001                 access token  ****0002          │
//! │  public key    TEST-pk-0001             device        PAX_A910__...     │
//! │  [x] active    [Testar conexão]         [ ] active    [Testar conexão]  │
//! │  ✓ Conexão OK: 12 formas ...            ✗ Credenciais incompletas       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tokens are only ever returned masked.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mercadinho_payments::{
    ConnectionTestResult, CredentialSet, Credentials, IntegrationStatus, PaymentProvider,
};
use serde::Deserialize;
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub active: bool,
}

pub async fn integrations<P: PaymentProvider>(
    State(state): State<AppState<P>>,
) -> Json<IntegrationStatus> {
    Json(state.integrations().status().await)
}

/// Saves one credential set; the body is tagged with `"set"`.
pub async fn save_integration<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<IntegrationStatus>> {
    let set = credentials.set();
    state.integrations().save(credentials).await?;
    info!(set = %set, "Integration credentials saved from admin panel");
    Ok(Json(state.integrations().status().await))
}

pub async fn toggle<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Path(set): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<Json<IntegrationStatus>> {
    let set: CredentialSet = set.parse()?;
    state.integrations().toggle(set, request.active).await?;
    Ok(Json(state.integrations().status().await))
}

pub async fn test_connection<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Path(set): Path<String>,
) -> ApiResult<Json<ConnectionTestResult>> {
    let set: CredentialSet = set.parse()?;
    Ok(Json(state.integrations().test_connection(set).await?))
}

/// Puts a terminal into PDV mode. Allowed before the Point integration is
/// switched on, so the terminal can be prepared first.
pub async fn activate_device<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Path(device_id): Path<String>,
) -> ApiResult<StatusCode> {
    let credentials = state.integrations().configured_point_credentials().await?;
    state.card().activate_device(&credentials, &device_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
