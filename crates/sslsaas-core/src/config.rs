//! Configuration types for the issuance workflow
//!
//! One [`IssuanceConfig`] is assembled before the workflow starts and passed
//! explicitly to every component. Nothing in this crate reads the environment.

use crate::traits::ValidationMethod;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Cloudflare API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4/";

/// Main issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceConfig {
    /// Managed-CNAME zone that contains the custom hostnames
    pub zone_name: String,

    /// Hostname customers CNAME their vanity hostname to
    ///
    /// This is the fallback host configured for the managed-CNAME zone (or a
    /// name that CNAMEs to it).
    pub fallback_hostname: String,

    /// Customer base domain the candidate hostname is generated under
    pub customer_domain: String,

    /// Provider credentials and endpoint
    pub provider: ProviderConfig,

    /// Certificate validation options
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Status polling options
    #[serde(default)]
    pub poll: PollConfig,

    /// Edge inspection options
    #[serde(default)]
    pub inspect: InspectConfig,
}

impl IssuanceConfig {
    /// Create a configuration with default polling, validation and inspection settings
    pub fn new(
        zone_name: impl Into<String>,
        fallback_hostname: impl Into<String>,
        customer_domain: impl Into<String>,
        provider: ProviderConfig,
    ) -> Self {
        Self {
            zone_name: zone_name.into(),
            fallback_hostname: fallback_hostname.into(),
            customer_domain: customer_domain.into(),
            provider,
            validation: ValidationConfig::default(),
            poll: PollConfig::default(),
            inspect: InspectConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_name.trim().is_empty() {
            return Err(crate::Error::config("Zone name cannot be empty"));
        }
        if self.fallback_hostname.trim().is_empty() {
            return Err(crate::Error::config("Fallback hostname cannot be empty"));
        }
        if self.customer_domain.trim().trim_matches('.').is_empty() {
            return Err(crate::Error::config("Customer domain cannot be empty"));
        }

        self.provider.validate()?;
        self.poll.validate()?;
        self.inspect.validate()?;

        Ok(())
    }
}

/// Provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare SSL for SaaS
    Cloudflare {
        /// Global API key (sent as `X-Auth-Key`)
        api_key: String,
        /// Account email (sent as `X-Auth-Email`)
        api_email: String,
        /// API base URL
        #[serde(default = "default_api_base_url")]
        api_base_url: String,
    },
}

impl ProviderConfig {
    /// Cloudflare configuration against the public API endpoint
    pub fn cloudflare(api_key: impl Into<String>, api_email: impl Into<String>) -> Self {
        ProviderConfig::Cloudflare {
            api_key: api_key.into(),
            api_email: api_email.into(),
            api_base_url: default_api_base_url(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_key,
                api_email,
                api_base_url,
            } => {
                if api_key.is_empty() {
                    return Err(crate::Error::config("Cloudflare API key cannot be empty"));
                }
                if api_email.is_empty() || !api_email.contains('@') {
                    return Err(crate::Error::config(
                        "Cloudflare API email must be a valid email address",
                    ));
                }
                if !api_base_url.starts_with("https://") && !api_base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Cloudflare API base URL must use HTTP or HTTPS scheme. Got: {}",
                        api_base_url
                    )));
                }
                Ok(())
            }
        }
    }
}

// Keeps the API key out of logs and panic messages
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                api_email,
                api_base_url,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_key", &"<REDACTED>")
                .field("api_email", api_email)
                .field("api_base_url", api_base_url)
                .finish(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// Certificate validation options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Domain-control validation method
    #[serde(default)]
    pub method: ValidationMethod,

    /// Route the custom hostname to this origin instead of the zone fallback
    #[serde(default)]
    pub custom_origin_server: Option<String>,
}

/// Status polling options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Fixed delay between status polls (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,

    /// Stop with a timed-out outcome after this many polls
    ///
    /// `None` polls until the certificate is active.
    #[serde(default)]
    pub max_attempts: Option<usize>,

    /// Stop with a timed-out outcome once this much time has passed since the
    /// first poll (in seconds)
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Capacity of the issuance event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl PollConfig {
    /// Poll interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Deadline as a `Duration`, if configured
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Validate the polling configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.max_attempts == Some(0) {
            return Err(crate::Error::config("Maximum poll attempts must be > 0"));
        }
        if self.deadline_secs == Some(0) {
            return Err(crate::Error::config("Poll deadline must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            max_attempts: None,
            deadline_secs: None,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    20
}

fn default_event_channel_capacity() -> usize {
    100
}

/// Edge certificate inspection options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    /// TLS port to connect to
    #[serde(default = "default_tls_port")]
    pub port: u16,

    /// Budget for connect plus handshake (in seconds)
    #[serde(default = "default_inspect_timeout_secs")]
    pub timeout_secs: u64,
}

impl InspectConfig {
    /// Timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the inspection configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.port == 0 {
            return Err(crate::Error::config("Inspection port must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Inspection timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            port: default_tls_port(),
            timeout_secs: default_inspect_timeout_secs(),
        }
    }
}

fn default_tls_port() -> u16 {
    443
}

fn default_inspect_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> IssuanceConfig {
        IssuanceConfig::new(
            "saas.example.com",
            "fallback.saas.example.com",
            "customer.com",
            ProviderConfig::cloudflare("0123456789abcdef", "ops@example.com"),
        )
    }

    #[test]
    fn test_defaults() {
        let config = valid_config();
        assert_eq!(config.poll.interval(), Duration::from_secs(20));
        assert_eq!(config.poll.max_attempts, None);
        assert_eq!(config.inspect.port, 443);
        assert_eq!(config.validation.method, ValidationMethod::Http);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_fields() {
        let mut config = valid_config();
        config.zone_name = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.customer_domain = ".".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.provider = ProviderConfig::cloudflare("", "ops@example.com");
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.provider = ProviderConfig::cloudflare("key", "not-an-email");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_bounds() {
        let mut config = valid_config();
        config.poll.max_attempts = Some(0);
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.poll.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = serde_json::json!({
            "zone_name": "saas.example.com",
            "fallback_hostname": "fallback.saas.example.com",
            "customer_domain": "customer.com",
            "provider": {
                "type": "cloudflare",
                "api_key": "k",
                "api_email": "ops@example.com"
            },
            "poll": { "max_attempts": 5 }
        });

        let config: IssuanceConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.poll.interval_secs, 20);
        assert_eq!(config.poll.max_attempts, Some(5));
        match &config.provider {
            ProviderConfig::Cloudflare { api_base_url, .. } => {
                assert_eq!(api_base_url, DEFAULT_API_BASE_URL)
            }
        }
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let config = ProviderConfig::cloudflare("super_secret_key_123", "ops@example.com");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("super_secret_key_123"));
        assert!(debug_str.contains("ops@example.com"));
    }
}
