//! Router test harness: in-memory database, stub provider, JSON helper.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use mercadinho_core::{Customer, Product};
use mercadinho_db::repository::generate_id;
use mercadinho_db::{Database, DbConfig};
use mercadinho_payments::provider::{
    CardIntent, CardIntentRequest, DeviceStatus, IntentStatus, PaymentProvider, PixCharge,
    PixChargeRequest, PixStatus, PointDevice,
};
use mercadinho_payments::{
    CheckoutCredentials, Credentials, Environment, PaymentResult, PaymentsConfig,
    PointCredentials,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::routes::router;
use crate::state::AppState;

pub const DEVICE_ID: &str = "PAX_A910__SMARTPOS1";

/// Provider that approves everything on the first status check.
#[derive(Clone, Default)]
pub struct StubProvider {
    activated: Arc<Mutex<Vec<String>>>,
    charges: Arc<Mutex<u32>>,
}

impl StubProvider {
    pub fn activated(&self) -> Vec<String> {
        self.activated.lock().unwrap().clone()
    }
}

impl PaymentProvider for StubProvider {
    async fn create_pix_charge(
        &self,
        _access_token: &str,
        _request: &PixChargeRequest,
        _idempotency_key: &str,
    ) -> PaymentResult<PixCharge> {
        let mut charges = self.charges.lock().unwrap();
        *charges += 1;
        Ok(PixCharge {
            payment_id: format!("stub-pix-{}", *charges),
            status: PixStatus::Pending,
            qr_code: "00020126580014br.gov.bcb.pix".to_string(),
            qr_code_base64: "iVBORw0KGgo=".to_string(),
            expires_at: None,
        })
    }

    async fn pix_status(&self, _access_token: &str, _payment_id: &str) -> PaymentResult<PixStatus> {
        Ok(PixStatus::Approved)
    }

    async fn list_payment_methods(&self, _access_token: &str) -> PaymentResult<usize> {
        Ok(8)
    }

    async fn list_devices(&self, _access_token: &str) -> PaymentResult<Vec<PointDevice>> {
        Ok(vec![PointDevice {
            id: DEVICE_ID.to_string(),
            name: "Caixa 1".to_string(),
            status: DeviceStatus::Online,
            battery_level: None,
            last_seen: None,
        }])
    }

    async fn create_card_intent(
        &self,
        _access_token: &str,
        request: &CardIntentRequest,
        _idempotency_key: &str,
    ) -> PaymentResult<CardIntent> {
        Ok(CardIntent {
            id: "stub-intent-1".to_string(),
            amount_cents: request.amount.cents(),
            status: IntentStatus::Pending,
            device_id: Some(request.device_id.clone()),
            external_reference: Some(request.external_reference.clone()),
            payment_id: None,
        })
    }

    async fn card_intent(&self, _access_token: &str, intent_id: &str) -> PaymentResult<CardIntent> {
        Ok(CardIntent {
            id: intent_id.to_string(),
            amount_cents: 0,
            status: IntentStatus::Approved,
            device_id: None,
            external_reference: None,
            payment_id: Some("stub-card-payment".to_string()),
        })
    }

    async fn cancel_card_intent(
        &self,
        _access_token: &str,
        _device_id: &str,
        _intent_id: &str,
    ) -> PaymentResult<()> {
        Ok(())
    }

    async fn activate_device(&self, _access_token: &str, device_id: &str) -> PaymentResult<()> {
        self.activated.lock().unwrap().push(device_id.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState<StubProvider>,
    provider: StubProvider,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = PaymentsConfig::default();
        config.pix.poll_interval_ms = 10;
        config.card.poll_interval_ms = 10;

        let provider = StubProvider::default();
        let state = AppState::build(db, &config, provider.clone()).await.unwrap();
        TestApp {
            router: router(state.clone()),
            state,
            provider,
        }
    }

    pub fn provider(&self) -> &StubProvider {
        &self.provider
    }

    pub fn product_value(&self, name: &str, price_cents: i64, cost_cents: i64, stock: i64) -> Product {
        Product {
            id: generate_id(),
            category_id: None,
            name: name.to_string(),
            barcode: None,
            image_url: None,
            price_cents,
            cost_cents,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub async fn product(&self, name: &str, price_cents: i64, cost_cents: i64, stock: i64) -> Product {
        let product = self.product_value(name, price_cents, cost_cents, stock);
        self.state.db().products().insert(&product).await.unwrap();
        product
    }

    pub async fn customer(&self, name: &str, phone: &str, discount_bps: i64) -> Customer {
        let customer = Customer {
            id: generate_id(),
            name: name.to_string(),
            phone: Some(phone.to_string()),
            email: None,
            discount_bps,
            created_at: Utc::now(),
        };
        self.state.db().customers().insert(&customer).await.unwrap();
        customer
    }

    pub async fn add_to_cart(&self, product_id: &str, quantity: i64) {
        self.state
            .checkout()
            .add_item(product_id, quantity)
            .await
            .unwrap();
    }

    pub async fn save_checkout(&self, active: bool) {
        let credentials = CheckoutCredentials {
            access_token: "TEST-checkout-0001".to_string(),
            public_key: "TEST-pk-0001".to_string(),
            environment: Environment::Sandbox,
            is_active: active,
            ..Default::default()
        };
        self.state
            .integrations()
            .save(Credentials::Checkout(credentials))
            .await
            .unwrap();
    }

    pub async fn save_point(&self, active: bool) {
        let credentials = PointCredentials {
            access_token: "TEST-point-0002".to_string(),
            device_id: DEVICE_ID.to_string(),
            user_id: "123456".to_string(),
            environment: Environment::Sandbox,
            is_active: active,
            ..Default::default()
        };
        self.state
            .integrations()
            .save(Credentials::Point(credentials))
            .await
            .unwrap();
    }
}

/// Sends one request through the router; an empty body reads as `null`.
pub async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
