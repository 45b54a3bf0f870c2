//! Mercado Pago JSON bodies and their mapping to domain types.
//!
//! Response structs accept more than one spelling where the APIs are
//! inconsistent (`status` vs `state`, numeric vs string ids, upper vs
//! lower case statuses).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CardIntent, DeviceStatus, IntentStatus, PixCharge, PixStatus, PointDevice};

// =============================================================================
// Shared
// =============================================================================

/// Ids arrive as JSON numbers on `/v1/payments` and as strings elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireId::Number(n) => write!(f, "{n}"),
            WireId::Text(s) => f.write_str(s),
        }
    }
}

/// Error body. Either field may carry the human-readable reason.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .filter(|m| !m.trim().is_empty())
            .or(self.error.filter(|e| !e.trim().is_empty()))
    }
}

// =============================================================================
// Checkout / PIX
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreatePaymentBody<'a> {
    /// Reais, as a decimal number.
    pub transaction_amount: f64,
    pub description: &'a str,
    pub payment_method_id: &'static str,
    pub payer: PayerBody<'a>,
    pub external_reference: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PayerBody<'a> {
    pub email: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PaymentResponse {
    pub id: WireId,
    pub status: String,
    pub date_of_expiration: Option<String>,
    pub point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Debug, Deserialize)]
pub struct PointOfInteraction {
    pub transaction_data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionData {
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
}

/// `approved` → approved; `rejected`/`cancelled` → rejected; anything
/// else (`pending`, `in_process`, `authorized`, ...) is still pending.
pub fn pix_status(raw: &str) -> PixStatus {
    match raw.to_ascii_lowercase().as_str() {
        "approved" => PixStatus::Approved,
        "rejected" | "cancelled" | "canceled" => PixStatus::Rejected,
        _ => PixStatus::Pending,
    }
}

impl From<PaymentResponse> for PixCharge {
    fn from(resp: PaymentResponse) -> Self {
        let data = resp
            .point_of_interaction
            .and_then(|poi| poi.transaction_data);
        let (qr_code, qr_code_base64) = match data {
            Some(d) => (d.qr_code.unwrap_or_default(), d.qr_code_base64.unwrap_or_default()),
            None => (String::new(), String::new()),
        };

        PixCharge {
            payment_id: resp.id.to_string(),
            status: pix_status(&resp.status),
            qr_code,
            qr_code_base64,
            expires_at: resp.date_of_expiration.as_deref().and_then(parse_timestamp),
        }
    }
}

// =============================================================================
// Point
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreateIntentBody<'a> {
    /// Centavos.
    pub amount: i64,
    pub description: &'a str,
    pub device_id: &'a str,
    pub additional_info: AdditionalInfoBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct AdditionalInfoBody<'a> {
    pub external_reference: &'a str,
    pub print_on_terminal: bool,
}

#[derive(Debug, Serialize)]
pub struct OperatingModeBody {
    pub operating_mode: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct IntentResponse {
    pub id: WireId,
    #[serde(alias = "state")]
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub device_id: Option<String>,
    pub additional_info: Option<AdditionalInfo>,
    pub payment: Option<IntentPayment>,
}

#[derive(Debug, Deserialize)]
pub struct AdditionalInfo {
    pub external_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntentPayment {
    pub id: Option<WireId>,
}

/// Case-insensitive mapping of the terminal vocabulary.
pub fn intent_status(raw: &str) -> IntentStatus {
    match raw.to_ascii_lowercase().as_str() {
        "processing" => IntentStatus::Processing,
        "approved" | "finished" | "processed" => IntentStatus::Approved,
        "rejected" | "error" | "abandoned" => IntentStatus::Rejected,
        "cancelled" | "canceled" => IntentStatus::Cancelled,
        _ => IntentStatus::Pending,
    }
}

impl From<IntentResponse> for CardIntent {
    fn from(resp: IntentResponse) -> Self {
        CardIntent {
            id: resp.id.to_string(),
            amount_cents: resp.amount.unwrap_or_default(),
            status: resp
                .status
                .as_deref()
                .map(intent_status)
                .unwrap_or(IntentStatus::Pending),
            device_id: resp.device_id,
            external_reference: resp.additional_info.and_then(|a| a.external_reference),
            payment_id: resp
                .payment
                .and_then(|p| p.id)
                .map(|id| id.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<WireDevice>,
}

#[derive(Debug, Deserialize)]
pub struct WireDevice {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    /// Integer percent in practice, but a float or junk must not sink the
    /// whole listing.
    #[serde(default)]
    pub battery_level: Option<serde_json::Value>,
    pub last_seen: Option<String>,
}

fn battery_percent(raw: Option<&serde_json::Value>) -> Option<u8> {
    raw.and_then(serde_json::Value::as_f64)
        .filter(|b| b.is_finite())
        .map(|b| b.round().clamp(0.0, 100.0) as u8)
}

/// Device listings often omit `status`; a listed device is taken as online.
pub fn device_status(raw: Option<&str>) -> DeviceStatus {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("busy") => DeviceStatus::Busy,
        Some("offline") | Some("disconnected") => DeviceStatus::Offline,
        _ => DeviceStatus::Online,
    }
}

impl From<WireDevice> for PointDevice {
    fn from(d: WireDevice) -> Self {
        PointDevice {
            name: d.name.unwrap_or_else(|| d.id.clone()),
            status: device_status(d.status.as_deref()),
            battery_level: battery_percent(d.battery_level.as_ref()),
            last_seen: d.last_seen.as_deref().and_then(parse_timestamp),
            id: d.id,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_status_vocabulary() {
        assert_eq!(intent_status("OPEN"), IntentStatus::Pending);
        assert_eq!(intent_status("on_terminal"), IntentStatus::Pending);
        assert_eq!(intent_status("PROCESSING"), IntentStatus::Processing);
        assert_eq!(intent_status("FINISHED"), IntentStatus::Approved);
        assert_eq!(intent_status("processed"), IntentStatus::Approved);
        assert_eq!(intent_status("ABANDONED"), IntentStatus::Rejected);
        assert_eq!(intent_status("error"), IntentStatus::Rejected);
        assert_eq!(intent_status("CANCELED"), IntentStatus::Cancelled);
    }

    #[test]
    fn test_pix_status_vocabulary() {
        assert_eq!(pix_status("approved"), PixStatus::Approved);
        assert_eq!(pix_status("cancelled"), PixStatus::Rejected);
        assert_eq!(pix_status("in_process"), PixStatus::Pending);
    }

    #[test]
    fn test_intent_accepts_state_alias() {
        let intent: IntentResponse = serde_json::from_str(
            r#"{"id":"7f3a","state":"FINISHED","amount":650,
                "additional_info":{"external_reference":"order-1"},
                "payment":{"id":123456789}}"#,
        )
        .unwrap();
        let intent = CardIntent::from(intent);

        assert_eq!(intent.status, IntentStatus::Approved);
        assert_eq!(intent.amount_cents, 650);
        assert_eq!(intent.external_reference.as_deref(), Some("order-1"));
        assert_eq!(intent.payment_id.as_deref(), Some("123456789"));
    }

    #[test]
    fn test_payment_response_to_charge() {
        let resp: PaymentResponse = serde_json::from_str(
            r#"{"id":1325,"status":"pending",
                "date_of_expiration":"2026-01-10T12:30:00.000-03:00",
                "point_of_interaction":{"transaction_data":
                    {"qr_code":"00020126...","qr_code_base64":"iVBORw0"}}}"#,
        )
        .unwrap();
        let charge = PixCharge::from(resp);

        assert_eq!(charge.payment_id, "1325");
        assert_eq!(charge.status, PixStatus::Pending);
        assert_eq!(charge.qr_code, "00020126...");
        assert_eq!(
            charge.expires_at.map(|t| t.to_rfc3339()),
            Some("2026-01-10T15:30:00+00:00".to_string())
        );
    }

    #[test]
    fn test_device_defaults() {
        let device = PointDevice::from(WireDevice {
            id: "PAX_A910__SMARTPOS1234".into(),
            name: None,
            status: None,
            battery_level: None,
            last_seen: None,
        });
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.name, "PAX_A910__SMARTPOS1234");
        assert_eq!(device_status(Some("OFFLINE")), DeviceStatus::Offline);
    }

    #[test]
    fn test_device_listing_tolerates_odd_battery_values() {
        let listing: DevicesResponse = serde_json::from_str(
            r#"{"devices":[
                {"id":"PAX_1","battery_level":87},
                {"id":"PAX_2","battery_level":42.6},
                {"id":"PAX_3","battery_level":300},
                {"id":"PAX_4","battery_level":"unknown"},
                {"id":"PAX_5"}
            ]}"#,
        )
        .unwrap();
        let levels: Vec<Option<u8>> = listing
            .devices
            .into_iter()
            .map(|d| PointDevice::from(d).battery_level)
            .collect();

        assert_eq!(levels, vec![Some(87), Some(43), Some(100), None, None]);
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message":"","error":"unauthorized"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("unauthorized"));
    }
}
