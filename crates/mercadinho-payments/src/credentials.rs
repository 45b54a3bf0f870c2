//! # Integration Credentials
//!
//! Two independent Mercado Pago integrations, each switched on and off by
//! the store admin:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Credentials::Checkout                 Credentials::Point               │
//! │  ─────────────────────                 ──────────────────               │
//! │  access_token, public_key              access_token, device_id, user_id │
//! │  enables: PIX                          enables: credit, debit           │
//! │                                                                         │
//! │  configured = required fields present                                   │
//! │  usable     = configured && is_active                                   │
//! │  sandbox    ⇒ access_token starts with "TEST-"                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`IntegrationManager`] keeps both sets in memory and persists them in
//! the settings table under `integration.checkout` / `integration.point`.
//! Available payment methods are derived from them on every call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mercadinho_core::{PaymentMethod, ValidationError};
use mercadinho_db::SettingsRepository;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use ts_rs::TS;

use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentProvider;

/// Access tokens issued for sandbox accounts carry this prefix.
pub const SANDBOX_TOKEN_PREFIX: &str = "TEST-";

// =============================================================================
// Credential Sets
// =============================================================================

/// Which integration a credential set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSet {
    Checkout,
    Point,
}

impl CredentialSet {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CredentialSet::Checkout => "checkout",
            CredentialSet::Point => "point",
        }
    }

    /// Key in the settings table.
    pub const fn settings_key(&self) -> &'static str {
        match self {
            CredentialSet::Checkout => "integration.checkout",
            CredentialSet::Point => "integration.point",
        }
    }
}

impl fmt::Display for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialSet {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checkout" | "pix" => Ok(CredentialSet::Checkout),
            "point" | "card" => Ok(CredentialSet::Point),
            _ => Err(ValidationError::NotAllowed {
                field: "set".to_string(),
                allowed: vec!["checkout".to_string(), "point".to_string()],
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Success,
    Error,
}

/// Outcome of the last "test connection" click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConnectionTestResult {
    pub status: TestStatus,
    pub message: String,
    #[ts(as = "String")]
    pub tested_at: DateTime<Utc>,
}

impl ConnectionTestResult {
    fn success(message: impl Into<String>) -> Self {
        ConnectionTestResult {
            status: TestStatus::Success,
            message: message.into(),
            tested_at: Utc::now(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        ConnectionTestResult {
            status: TestStatus::Error,
            message: message.into(),
            tested_at: Utc::now(),
        }
    }
}

/// Checkout API credentials (PIX).
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutCredentials {
    pub access_token: String,
    pub public_key: String,
    pub environment: Environment,
    pub is_active: bool,
    pub last_test: Option<ConnectionTestResult>,
}

/// Point API credentials (card terminal).
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointCredentials {
    pub access_token: String,
    pub device_id: String,
    pub user_id: String,
    pub environment: Environment,
    pub is_active: bool,
    pub last_test: Option<ConnectionTestResult>,
}

impl CheckoutCredentials {
    pub fn is_configured(&self) -> bool {
        filled(&self.access_token) && filled(&self.public_key)
    }

    pub fn is_usable(&self) -> bool {
        self.is_configured() && self.is_active
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("access_token", &self.access_token)?;
        require("public_key", &self.public_key)?;
        check_environment(self.environment, &self.access_token)
    }
}

impl PointCredentials {
    pub fn is_configured(&self) -> bool {
        filled(&self.access_token) && filled(&self.device_id) && filled(&self.user_id)
    }

    pub fn is_usable(&self) -> bool {
        self.is_configured() && self.is_active
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("access_token", &self.access_token)?;
        require("device_id", &self.device_id)?;
        require("user_id", &self.user_id)?;
        check_environment(self.environment, &self.access_token)
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if filled(value) {
        Ok(())
    } else {
        Err(ValidationError::required(field))
    }
}

fn check_environment(environment: Environment, access_token: &str) -> Result<(), ValidationError> {
    if environment == Environment::Sandbox && !access_token.starts_with(SANDBOX_TOKEN_PREFIX) {
        return Err(ValidationError::InvalidFormat {
            field: "access_token".to_string(),
            reason: format!("sandbox tokens start with {SANDBOX_TOKEN_PREFIX}"),
        });
    }
    Ok(())
}

/// `APP_USR-1234567890` → `****7890`
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

impl fmt::Debug for CheckoutCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutCredentials")
            .field("access_token", &mask_token(&self.access_token))
            .field("public_key", &mask_token(&self.public_key))
            .field("environment", &self.environment)
            .field("is_active", &self.is_active)
            .finish()
    }
}

impl fmt::Debug for PointCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointCredentials")
            .field("access_token", &mask_token(&self.access_token))
            .field("device_id", &self.device_id)
            .field("user_id", &self.user_id)
            .field("environment", &self.environment)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Either credential set, as submitted by the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "set", rename_all = "snake_case")]
pub enum Credentials {
    Checkout(CheckoutCredentials),
    Point(PointCredentials),
}

impl Credentials {
    pub fn set(&self) -> CredentialSet {
        match self {
            Credentials::Checkout(_) => CredentialSet::Checkout,
            Credentials::Point(_) => CredentialSet::Point,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Credentials::Checkout(c) => c.is_active,
            Credentials::Point(p) => p.is_active,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Credentials::Checkout(c) => c.validate(),
            Credentials::Point(p) => p.validate(),
        }
    }
}

// =============================================================================
// Admin View
// =============================================================================

/// Redacted view of one integration for the admin panel.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct IntegrationSummary {
    pub set: CredentialSet,
    pub configured: bool,
    pub active: bool,
    pub environment: Environment,
    pub access_token: String,
    /// Public key (checkout) or device id (point).
    pub detail: String,
    pub last_test: Option<ConnectionTestResult>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct IntegrationStatus {
    pub checkout: IntegrationSummary,
    pub point: IntegrationSummary,
    pub available_methods: Vec<PaymentMethod>,
}

// =============================================================================
// Integration Manager
// =============================================================================

#[derive(Debug, Default)]
struct IntegrationState {
    checkout: CheckoutCredentials,
    point: PointCredentials,
}

/// Owns both credential sets.
pub struct IntegrationManager<P> {
    provider: Arc<P>,
    settings: SettingsRepository,
    state: RwLock<IntegrationState>,
}

impl<P> fmt::Debug for IntegrationManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationManager")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<P: PaymentProvider> IntegrationManager<P> {
    /// Loads both sets from the settings table. Missing sets start empty.
    pub async fn load(provider: Arc<P>, settings: SettingsRepository) -> PaymentResult<Self> {
        let checkout: CheckoutCredentials = settings
            .get_json(CredentialSet::Checkout.settings_key())
            .await?
            .unwrap_or_default();
        let point: PointCredentials = settings
            .get_json(CredentialSet::Point.settings_key())
            .await?
            .unwrap_or_default();

        info!(
            checkout_usable = checkout.is_usable(),
            point_usable = point.is_usable(),
            "Integrations loaded"
        );

        Ok(IntegrationManager {
            provider,
            settings,
            state: RwLock::new(IntegrationState { checkout, point }),
        })
    }

    /// Replaces a credential set. Active sets must validate.
    ///
    /// The stored connection test result is kept; it can only change
    /// through [`Self::test_connection`].
    pub async fn save(&self, credentials: Credentials) -> PaymentResult<()> {
        if credentials.is_active() {
            credentials.validate()?;
        }

        let mut state = self.state.write().await;
        match credentials {
            Credentials::Checkout(mut c) => {
                c.last_test = state.checkout.last_test.clone();
                self.persist_checkout(&c).await?;
                state.checkout = c;
            }
            Credentials::Point(mut p) => {
                p.last_test = state.point.last_test.clone();
                self.persist_point(&p).await?;
                state.point = p;
            }
        }

        Ok(())
    }

    /// Activates or deactivates a set. Only activation validates.
    pub async fn toggle(&self, set: CredentialSet, active: bool) -> PaymentResult<()> {
        let mut state = self.state.write().await;
        match set {
            CredentialSet::Checkout => {
                if active {
                    state.checkout.validate()?;
                }
                let mut next = state.checkout.clone();
                next.is_active = active;
                self.persist_checkout(&next).await?;
                state.checkout = next;
            }
            CredentialSet::Point => {
                if active {
                    state.point.validate()?;
                }
                let mut next = state.point.clone();
                next.is_active = active;
                self.persist_point(&next).await?;
                state.point = next;
            }
        }

        info!(set = %set, active, "Integration toggled");
        Ok(())
    }

    /// Calls a cheap authenticated endpoint with the stored credentials and
    /// records the result. Provider failures become an `Error` result;
    /// only persistence failures are returned as `Err`.
    pub async fn test_connection(&self, set: CredentialSet) -> PaymentResult<ConnectionTestResult> {
        let (configured, token) = {
            let state = self.state.read().await;
            match set {
                CredentialSet::Checkout => {
                    (state.checkout.is_configured(), state.checkout.access_token.clone())
                }
                CredentialSet::Point => {
                    (state.point.is_configured(), state.point.access_token.clone())
                }
            }
        };

        let result = if !configured {
            ConnectionTestResult::error("Credenciais incompletas")
        } else {
            match set {
                CredentialSet::Checkout => match self.provider.list_payment_methods(&token).await {
                    Ok(count) => ConnectionTestResult::success(format!(
                        "Conexão OK: {count} formas de pagamento disponíveis"
                    )),
                    Err(e) => ConnectionTestResult::error(e.to_string()),
                },
                CredentialSet::Point => match self.provider.list_devices(&token).await {
                    Ok(devices) => ConnectionTestResult::success(format!(
                        "Conexão OK: {} maquininha(s) encontrada(s)",
                        devices.len()
                    )),
                    Err(e) => ConnectionTestResult::error(e.to_string()),
                },
            }
        };

        if result.status == TestStatus::Error {
            warn!(set = %set, message = %result.message, "Connection test failed");
        } else {
            info!(set = %set, "Connection test succeeded");
        }

        let mut state = self.state.write().await;
        match set {
            CredentialSet::Checkout => {
                let mut next = state.checkout.clone();
                next.last_test = Some(result.clone());
                self.persist_checkout(&next).await?;
                state.checkout = next;
            }
            CredentialSet::Point => {
                let mut next = state.point.clone();
                next.last_test = Some(result.clone());
                self.persist_point(&next).await?;
                state.point = next;
            }
        }

        Ok(result)
    }

    /// Methods the storefront may offer right now.
    pub async fn available_payment_methods(&self) -> Vec<PaymentMethod> {
        let state = self.state.read().await;
        let mut methods = Vec::with_capacity(3);
        if state.checkout.is_usable() {
            methods.push(PaymentMethod::Pix);
        }
        if state.point.is_usable() {
            methods.push(PaymentMethod::Credit);
            methods.push(PaymentMethod::Debit);
        }
        methods
    }

    /// Checkout credentials, if configured and active.
    pub async fn checkout_credentials(&self) -> PaymentResult<CheckoutCredentials> {
        let state = self.state.read().await;
        if !state.checkout.is_usable() {
            return Err(PaymentError::NotConfigured {
                set: CredentialSet::Checkout,
            });
        }
        Ok(state.checkout.clone())
    }

    /// Point credentials, if configured and active.
    pub async fn point_credentials(&self) -> PaymentResult<PointCredentials> {
        let state = self.state.read().await;
        if !state.point.is_usable() {
            return Err(PaymentError::NotConfigured {
                set: CredentialSet::Point,
            });
        }
        Ok(state.point.clone())
    }

    /// Point credentials for admin device operations, which are allowed
    /// before the integration is switched on.
    pub async fn configured_point_credentials(&self) -> PaymentResult<PointCredentials> {
        let state = self.state.read().await;
        if !state.point.is_configured() {
            return Err(PaymentError::NotConfigured {
                set: CredentialSet::Point,
            });
        }
        Ok(state.point.clone())
    }

    /// Redacted status for the admin panel.
    pub async fn status(&self) -> IntegrationStatus {
        let available_methods = self.available_payment_methods().await;
        let state = self.state.read().await;

        IntegrationStatus {
            checkout: IntegrationSummary {
                set: CredentialSet::Checkout,
                configured: state.checkout.is_configured(),
                active: state.checkout.is_active,
                environment: state.checkout.environment,
                access_token: mask_token(&state.checkout.access_token),
                detail: state.checkout.public_key.clone(),
                last_test: state.checkout.last_test.clone(),
            },
            point: IntegrationSummary {
                set: CredentialSet::Point,
                configured: state.point.is_configured(),
                active: state.point.is_active,
                environment: state.point.environment,
                access_token: mask_token(&state.point.access_token),
                detail: state.point.device_id.clone(),
                last_test: state.point.last_test.clone(),
            },
            available_methods,
        }
    }

    async fn persist_checkout(&self, credentials: &CheckoutCredentials) -> PaymentResult<()> {
        self.settings
            .put_json(CredentialSet::Checkout.settings_key(), credentials)
            .await?;
        Ok(())
    }

    async fn persist_point(&self, credentials: &PointCredentials) -> PaymentResult<()> {
        self.settings
            .put_json(CredentialSet::Point.settings_key(), credentials)
            .await?;
        Ok(())
    }
}
