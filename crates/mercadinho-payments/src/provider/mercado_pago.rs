//! Mercado Pago REST client.
//!
//! # API Reference
//!
//! - Base URL: `https://api.mercadopago.com` (configurable)
//! - Authentication: `Authorization: Bearer <access token>`
//! - Mutating calls carry `X-Idempotency-Key: <uuid v4>`

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::wire::{
    AdditionalInfoBody, CreateIntentBody, CreatePaymentBody, DevicesResponse, ErrorBody,
    IntentResponse, OperatingModeBody, PayerBody, PaymentResponse,
};
use super::{
    CardIntent, CardIntentRequest, PaymentProvider, PixCharge, PixChargeRequest, PixStatus,
    PointDevice,
};
use crate::config::ProviderSettings;
use crate::error::{PaymentError, PaymentResult};

const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// Mercado Pago API client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MercadoPagoClient {
    inner: Arc<MercadoPagoClientInner>,
}

#[derive(Debug)]
struct MercadoPagoClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl MercadoPagoClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client fails to build.
    pub fn new(settings: &ProviderSettings) -> PaymentResult<Self> {
        let base_url = Url::parse(&settings.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            inner: Arc::new(MercadoPagoClientInner {
                client,
                base_url: base_url.as_str().trim_end_matches('/').to_string(),
            }),
        })
    }

    fn request(&self, method: Method, path: &str, access_token: &str) -> RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        self.inner
            .client
            .request(method, url)
            .bearer_auth(access_token)
    }

    async fn get<T: DeserializeOwned>(&self, access_token: &str, path: &str) -> PaymentResult<T> {
        debug!(path = %path, "GET");
        let response = self.request(Method::GET, path, access_token).send().await?;
        Self::handle_response(response).await
    }

    /// POST/PATCH with a JSON body and an idempotency key.
    async fn send_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        access_token: &str,
        path: &str,
        body: &B,
        idempotency_key: &str,
    ) -> PaymentResult<T> {
        debug!(%method, path = %path, "Sending");
        let response = self
            .request(method, path, access_token)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Request whose response body is irrelevant.
    async fn send_empty<B: Serialize + Sync>(
        &self,
        method: Method,
        access_token: &str,
        path: &str,
        body: Option<&B>,
    ) -> PaymentResult<()> {
        let mut request = self
            .request(method, path, access_token)
            .header(IDEMPOTENCY_HEADER, Uuid::new_v4().to_string());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> PaymentResult<T> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| PaymentError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    async fn parse_error(response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        PaymentError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

impl PaymentProvider for MercadoPagoClient {
    async fn create_pix_charge(
        &self,
        access_token: &str,
        request: &PixChargeRequest,
        idempotency_key: &str,
    ) -> PaymentResult<PixCharge> {
        let body = CreatePaymentBody {
            transaction_amount: request.amount.to_reais_f64(),
            description: &request.description,
            payment_method_id: "pix",
            payer: PayerBody {
                email: &request.payer_email,
            },
            external_reference: &request.external_reference,
        };

        let response: PaymentResponse = self
            .send_json(Method::POST, access_token, "/v1/payments", &body, idempotency_key)
            .await?;
        let charge = PixCharge::from(response);

        if charge.qr_code.is_empty() {
            return Err(PaymentError::Parse(format!(
                "PIX payment {} returned no QR code",
                charge.payment_id
            )));
        }

        info!(payment_id = %charge.payment_id, "PIX charge created");
        Ok(charge)
    }

    async fn pix_status(&self, access_token: &str, payment_id: &str) -> PaymentResult<PixStatus> {
        let response: PaymentResponse = self
            .get(access_token, &format!("/v1/payments/{payment_id}"))
            .await?;
        Ok(super::wire::pix_status(&response.status))
    }

    async fn list_payment_methods(&self, access_token: &str) -> PaymentResult<usize> {
        let methods: Vec<serde_json::Value> =
            self.get(access_token, "/v1/payment_methods").await?;
        Ok(methods.len())
    }

    async fn list_devices(&self, access_token: &str) -> PaymentResult<Vec<PointDevice>> {
        let response: DevicesResponse = self
            .get(access_token, "/point/integration-api/devices")
            .await?;
        Ok(response.devices.into_iter().map(PointDevice::from).collect())
    }

    async fn create_card_intent(
        &self,
        access_token: &str,
        request: &CardIntentRequest,
        idempotency_key: &str,
    ) -> PaymentResult<CardIntent> {
        let body = CreateIntentBody {
            amount: request.amount.cents(),
            description: &request.description,
            device_id: &request.device_id,
            additional_info: AdditionalInfoBody {
                external_reference: &request.external_reference,
                print_on_terminal: true,
            },
        };

        let response: IntentResponse = self
            .send_json(
                Method::POST,
                access_token,
                "/point/integration-api/payment-intents",
                &body,
                idempotency_key,
            )
            .await?;

        let mut intent = CardIntent::from(response);
        intent.device_id.get_or_insert_with(|| request.device_id.clone());

        info!(intent_id = %intent.id, device_id = %request.device_id, "Card intent created");
        Ok(intent)
    }

    async fn card_intent(&self, access_token: &str, intent_id: &str) -> PaymentResult<CardIntent> {
        let response: IntentResponse = self
            .get(
                access_token,
                &format!("/point/integration-api/payment-intents/{intent_id}"),
            )
            .await?;
        Ok(CardIntent::from(response))
    }

    async fn cancel_card_intent(
        &self,
        access_token: &str,
        device_id: &str,
        intent_id: &str,
    ) -> PaymentResult<()> {
        self.send_empty::<()>(
            Method::DELETE,
            access_token,
            &format!("/point/integration-api/devices/{device_id}/payment-intents/{intent_id}"),
            None,
        )
        .await
    }

    async fn activate_device(&self, access_token: &str, device_id: &str) -> PaymentResult<()> {
        self.send_empty(
            Method::PATCH,
            access_token,
            &format!("/point/integration-api/devices/{device_id}"),
            Some(&OperatingModeBody {
                operating_mode: "PDV",
            }),
        )
        .await
    }
}
