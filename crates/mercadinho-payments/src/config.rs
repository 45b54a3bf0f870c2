//! # Payments Configuration
//!
//! Process-level settings: where the database lives, where the server
//! binds, how to reach Mercado Pago, and the polling budgets of the two
//! payment workflows. Integration credentials are NOT here; they are
//! runtime settings kept in the database by
//! [`IntegrationManager`](crate::credentials::IntegrationManager).
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     MERCADINHO_DB_PATH=./data/mercadinho.db                             │
//! │     MERCADINHO_BIND_ADDR=0.0.0.0:3000                                   │
//! │     MERCADINHO_PROVIDER_URL=https://api.mercadopago.com                 │
//! │     MERCADINHO_PAYER_EMAIL=caixa@mercadinho.com.br                      │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/pos/mercadinho.toml (Linux)                               │
//! │     ~/Library/Application Support/br.mercadinho.pos/... (macOS)         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! database_path = "./mercadinho.db"
//! bind_addr = "127.0.0.1:3000"
//! payer_email_fallback = "cliente@mercadinho.local"
//!
//! [provider]
//! base_url = "https://api.mercadopago.com"
//! request_timeout_secs = 15
//!
//! [pix]
//! expiration_secs = 300
//! poll_interval_ms = 3000
//! poll_max_attempts = 100
//!
//! [card]
//! poll_interval_ms = 2000
//! poll_max_attempts = 60
//!
//! [fees]
//! pix_bps = 99
//! debit_bps = 199
//! credit_bps = [498, 939, 1029, 1119, 1209, 1299, 1389, 1479, 1569, 1659]
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use mercadinho_core::validation::{validate_email, validate_rate_bps};
use mercadinho_core::FeeTable;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{PaymentError, PaymentResult};
use crate::poller::PollPolicy;

// =============================================================================
// Provider Settings
// =============================================================================

/// How to reach the Mercado Pago REST APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Workflow Settings
// =============================================================================

/// PIX charge lifetime and status polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixSettings {
    /// Local countdown before the QR code is considered expired.
    #[serde(default = "default_pix_expiration")]
    pub expiration_secs: u64,

    #[serde(default = "default_pix_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_pix_attempts")]
    pub poll_max_attempts: u32,
}

fn default_pix_expiration() -> u64 {
    300
}

fn default_pix_interval() -> u64 {
    3000
}

fn default_pix_attempts() -> u32 {
    100
}

impl Default for PixSettings {
    fn default() -> Self {
        PixSettings {
            expiration_secs: default_pix_expiration(),
            poll_interval_ms: default_pix_interval(),
            poll_max_attempts: default_pix_attempts(),
        }
    }
}

impl PixSettings {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.poll_max_attempts,
        )
    }

    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }
}

/// Point terminal status polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSettings {
    #[serde(default = "default_card_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_card_attempts")]
    pub poll_max_attempts: u32,
}

fn default_card_interval() -> u64 {
    2000
}

fn default_card_attempts() -> u32 {
    60
}

impl Default for CardSettings {
    fn default() -> Self {
        CardSettings {
            poll_interval_ms: default_card_interval(),
            poll_max_attempts: default_card_attempts(),
        }
    }
}

impl CardSettings {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.poll_max_attempts,
        )
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP server bind address.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Payer email sent with PIX charges when the customer gave none.
    #[serde(default = "default_payer_email")]
    pub payer_email_fallback: String,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub pix: PixSettings,

    #[serde(default)]
    pub card: CardSettings,

    /// Payment processing fee rates, used by cash-flow reports.
    #[serde(default)]
    pub fees: FeeTable,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("br", "mercadinho", "pos")
        .map(|dirs| dirs.data_dir().join("mercadinho.db"))
        .unwrap_or_else(|| PathBuf::from("./mercadinho.db"))
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_payer_email() -> String {
    "cliente@mercadinho.local".to_string()
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        PaymentsConfig {
            database_path: default_database_path(),
            bind_addr: default_bind_addr(),
            payer_email_fallback: default_payer_email(),
            provider: ProviderSettings::default(),
            pix: PixSettings::default(),
            card: CardSettings::default(),
            fees: FeeTable::default(),
        }
    }
}

impl PaymentsConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (mercadinho.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> PaymentResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> PaymentResult<()> {
        let url = Url::parse(&self.provider.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PaymentError::Config(format!(
                "provider.base_url must be http(s), got: {}",
                self.provider.base_url
            )));
        }

        self.bind_addr.parse::<SocketAddr>().map_err(|e| {
            PaymentError::Config(format!("invalid bind_addr '{}': {e}", self.bind_addr))
        })?;

        if self.provider.request_timeout_secs == 0 {
            return Err(PaymentError::Config(
                "provider.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.pix.expiration_secs == 0 {
            return Err(PaymentError::Config(
                "pix.expiration_secs must be greater than 0".into(),
            ));
        }
        if self.pix.poll_interval_ms == 0 || self.pix.poll_max_attempts == 0 {
            return Err(PaymentError::Config(
                "pix polling interval and attempts must be greater than 0".into(),
            ));
        }
        if self.card.poll_interval_ms == 0 || self.card.poll_max_attempts == 0 {
            return Err(PaymentError::Config(
                "card polling interval and attempts must be greater than 0".into(),
            ));
        }

        validate_email(&self.payer_email_fallback)?;

        validate_rate_bps("fees.pix_bps", self.fees.pix_bps.bps() as i64)?;
        validate_rate_bps("fees.debit_bps", self.fees.debit_bps.bps() as i64)?;
        for rate in &self.fees.credit_bps {
            validate_rate_bps("fees.credit_bps", rate.bps() as i64)?;
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("MERCADINHO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Some(addr) = lookup("MERCADINHO_BIND_ADDR") {
            debug!(addr = %addr, "Overriding bind address from environment");
            self.bind_addr = addr;
        }

        if let Some(url) = lookup("MERCADINHO_PROVIDER_URL") {
            debug!(url = %url, "Overriding provider URL from environment");
            self.provider.base_url = url;
        }

        if let Some(email) = lookup("MERCADINHO_PAYER_EMAIL") {
            self.payer_email_fallback = email;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("br", "mercadinho", "pos")
            .map(|dirs| dirs.config_dir().join("mercadinho.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PaymentsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pix.expiration_secs, 300);
        assert_eq!(config.pix.poll_policy().max_attempts, 100);
        assert_eq!(config.pix.poll_policy().interval, Duration::from_secs(3));
        assert_eq!(config.card.poll_policy().max_attempts, 60);
        assert_eq!(config.card.poll_policy().interval, Duration::from_secs(2));
        assert_eq!(config.provider.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PaymentsConfig = toml::from_str(
            r#"
            bind_addr = "0.0.0.0:8080"

            [card]
            poll_max_attempts = 30

            [fees]
            pix_bps = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.card.poll_max_attempts, 30);
        assert_eq!(config.card.poll_interval_ms, 2000);
        assert_eq!(config.pix.poll_max_attempts, 100);
        assert_eq!(config.fees.pix_bps.bps(), 50);
        assert_eq!(config.fees.debit_bps.bps(), 199);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = PaymentsConfig::default();
        config.provider.base_url = "ftp://api.mercadopago.com".into();
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));

        let mut config = PaymentsConfig::default();
        config.provider.base_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = PaymentsConfig::default();
        config.bind_addr = "localhost".into();
        assert!(config.validate().is_err());

        let mut config = PaymentsConfig::default();
        config.card.poll_max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = PaymentsConfig::default();
        config.payer_email_fallback = "sem-arroba".into();
        assert!(matches!(config.validate(), Err(PaymentError::Validation(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MERCADINHO_DB_PATH", "/tmp/m.db"),
            ("MERCADINHO_PROVIDER_URL", "http://127.0.0.1:9999"),
        ]);
        let mut config = PaymentsConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path, PathBuf::from("/tmp/m.db"));
        assert_eq!(config.provider.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            PaymentsConfig::load(Some(PathBuf::from("/nonexistent/mercadinho.toml"))).unwrap();
        assert_eq!(config.card.poll_max_attempts, 60);
    }
}
