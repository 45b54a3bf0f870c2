//! Scripted in-memory provider for workflow tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{PaymentError, PaymentResult};
use crate::provider::{
    CardIntent, CardIntentRequest, DeviceStatus, IntentStatus, PaymentProvider, PixCharge,
    PixChargeRequest, PixStatus, PointDevice,
};

#[derive(Default)]
struct Script {
    pix_statuses: VecDeque<PixStatus>,
    intent_statuses: VecDeque<Result<IntentStatus, String>>,
    devices: Vec<PointDevice>,
    read_error: Option<(u16, String)>,
    pix_requests: Vec<(PixChargeRequest, String)>,
    intent_requests: Vec<(CardIntentRequest, String)>,
    pix_status_calls: u32,
    card_intent_calls: u32,
    cancelled: Vec<(String, String)>,
    activated: Vec<String>,
}

/// Answers from queues; an empty status queue keeps answering `pending`.
#[derive(Default)]
pub struct FakeProvider {
    script: Mutex<Script>,
}

pub fn device(id: &str, status: DeviceStatus) -> PointDevice {
    PointDevice {
        id: id.to_string(),
        name: format!("Maquininha {id}"),
        status,
        battery_level: Some(80),
        last_seen: None,
    }
}

impl FakeProvider {
    pub fn with_devices(devices: Vec<PointDevice>) -> Self {
        let provider = FakeProvider::default();
        provider.script.lock().unwrap().devices = devices;
        provider
    }

    pub fn push_pix_statuses(&self, statuses: impl IntoIterator<Item = PixStatus>) {
        self.script.lock().unwrap().pix_statuses.extend(statuses);
    }

    pub fn push_intent_statuses(&self, statuses: impl IntoIterator<Item = IntentStatus>) {
        self.script
            .lock()
            .unwrap()
            .intent_statuses
            .extend(statuses.into_iter().map(Ok));
    }

    pub fn push_intent_failure(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .intent_statuses
            .push_back(Err(message.to_string()));
    }

    /// Makes the connection-test reads fail with an API error.
    pub fn fail_reads_with(&self, status: u16, message: &str) {
        self.script.lock().unwrap().read_error = Some((status, message.to_string()));
    }

    pub fn pix_status_calls(&self) -> u32 {
        self.script.lock().unwrap().pix_status_calls
    }

    pub fn card_intent_calls(&self) -> u32 {
        self.script.lock().unwrap().card_intent_calls
    }

    pub fn pix_requests(&self) -> Vec<(PixChargeRequest, String)> {
        self.script.lock().unwrap().pix_requests.clone()
    }

    pub fn intent_requests(&self) -> Vec<(CardIntentRequest, String)> {
        self.script.lock().unwrap().intent_requests.clone()
    }

    /// `(device_id, intent_id)` pairs that were cancelled.
    pub fn cancelled(&self) -> Vec<(String, String)> {
        self.script.lock().unwrap().cancelled.clone()
    }

    pub fn activated(&self) -> Vec<String> {
        self.script.lock().unwrap().activated.clone()
    }

    fn read_error(&self) -> Option<PaymentError> {
        self.script
            .lock()
            .unwrap()
            .read_error
            .clone()
            .map(|(status, message)| PaymentError::Api { status, message })
    }
}

impl PaymentProvider for FakeProvider {
    async fn create_pix_charge(
        &self,
        _access_token: &str,
        request: &PixChargeRequest,
        idempotency_key: &str,
    ) -> PaymentResult<PixCharge> {
        let mut script = self.script.lock().unwrap();
        script
            .pix_requests
            .push((request.clone(), idempotency_key.to_string()));
        Ok(PixCharge {
            payment_id: format!("pix-{}", script.pix_requests.len()),
            status: PixStatus::Pending,
            qr_code: "00020126580014br.gov.bcb.pix".to_string(),
            qr_code_base64: "iVBORw0KGgo=".to_string(),
            expires_at: None,
        })
    }

    async fn pix_status(&self, _access_token: &str, _payment_id: &str) -> PaymentResult<PixStatus> {
        let mut script = self.script.lock().unwrap();
        script.pix_status_calls += 1;
        Ok(script.pix_statuses.pop_front().unwrap_or(PixStatus::Pending))
    }

    async fn list_payment_methods(&self, _access_token: &str) -> PaymentResult<usize> {
        match self.read_error() {
            Some(e) => Err(e),
            None => Ok(12),
        }
    }

    async fn list_devices(&self, _access_token: &str) -> PaymentResult<Vec<PointDevice>> {
        match self.read_error() {
            Some(e) => Err(e),
            None => Ok(self.script.lock().unwrap().devices.clone()),
        }
    }

    async fn create_card_intent(
        &self,
        _access_token: &str,
        request: &CardIntentRequest,
        idempotency_key: &str,
    ) -> PaymentResult<CardIntent> {
        let mut script = self.script.lock().unwrap();
        script
            .intent_requests
            .push((request.clone(), idempotency_key.to_string()));
        Ok(CardIntent {
            id: format!("intent-{}", script.intent_requests.len()),
            amount_cents: request.amount.cents(),
            status: IntentStatus::Pending,
            device_id: Some(request.device_id.clone()),
            external_reference: Some(request.external_reference.clone()),
            payment_id: None,
        })
    }

    async fn card_intent(&self, _access_token: &str, intent_id: &str) -> PaymentResult<CardIntent> {
        let mut script = self.script.lock().unwrap();
        script.card_intent_calls += 1;
        let status = match script.intent_statuses.pop_front() {
            Some(Ok(status)) => status,
            Some(Err(message)) => return Err(PaymentError::Api { status: 502, message }),
            None => IntentStatus::Pending,
        };
        Ok(CardIntent {
            id: intent_id.to_string(),
            amount_cents: 0,
            status,
            device_id: None,
            external_reference: None,
            payment_id: (status == IntentStatus::Approved).then(|| format!("pay-{intent_id}")),
        })
    }

    async fn cancel_card_intent(
        &self,
        _access_token: &str,
        device_id: &str,
        intent_id: &str,
    ) -> PaymentResult<()> {
        self.script
            .lock()
            .unwrap()
            .cancelled
            .push((device_id.to_string(), intent_id.to_string()));
        Ok(())
    }

    async fn activate_device(&self, _access_token: &str, device_id: &str) -> PaymentResult<()> {
        self.script
            .lock()
            .unwrap()
            .activated
            .push(device_id.to_string());
        Ok(())
    }
}
