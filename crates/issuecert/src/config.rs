//! Environment configuration for `issuecert`

use anyhow::{Context, Result};
use sslsaas_core::config::{DEFAULT_API_BASE_URL, IssuanceConfig, ProviderConfig};
use sslsaas_core::traits::ValidationMethod;
use std::str::FromStr;
use tracing::Level;

/// Application configuration
pub struct Config {
    pub zone_name: String,
    pub fallback_hostname: String,
    pub customer_domain: String,
    pub api_key: String,
    pub api_email: String,
    pub api_base_url: String,
    pub validation_method: ValidationMethod,
    pub custom_origin_server: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub max_attempts: Option<usize>,
    pub deadline_secs: Option<u64>,
    pub log_level: String,
}

// API key stays out of diagnostics
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("zone_name", &self.zone_name)
            .field("fallback_hostname", &self.fallback_hostname)
            .field("customer_domain", &self.customer_domain)
            .field("api_key", &"<REDACTED>")
            .field("api_email", &self.api_email)
            .field("api_base_url", &self.api_base_url)
            .field("validation_method", &self.validation_method)
            .field("custom_origin_server", &self.custom_origin_server)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_attempts", &self.max_attempts)
            .field("deadline_secs", &self.deadline_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str, hint: &str) -> Result<String> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => anyhow::bail!("{} is required. Set it via: export {}={}", name, name, hint),
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional(lookup, name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} must be a number. Got '{}': {}", name, raw, e))
        })
        .transpose()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` (an environment stand-in)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let validation_method = match optional(&lookup, "ISSUECERT_VALIDATION_METHOD") {
            Some(raw) => ValidationMethod::from_str(&raw.to_lowercase())
                .with_context(|| "ISSUECERT_VALIDATION_METHOD must be one of: http, txt, email")?,
            None => ValidationMethod::default(),
        };

        Ok(Self {
            zone_name: required(&lookup, "WHITELABELZONE", "saas.example.com")?,
            fallback_hostname: required(&lookup, "WHITELABELHOST", "fallback.saas.example.com")?,
            customer_domain: required(&lookup, "CUSTOMERDOMAIN", "customer.com")?,
            api_key: required(&lookup, "CF_API_KEY", "your_global_api_key")?,
            api_email: required(&lookup, "CF_API_EMAIL", "you@example.com")?,
            api_base_url: optional(&lookup, "CF_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            validation_method,
            custom_origin_server: optional(&lookup, "ISSUECERT_CUSTOM_ORIGIN"),
            poll_interval_secs: parsed(&lookup, "ISSUECERT_POLL_INTERVAL_SECS")?,
            max_attempts: parsed(&lookup, "ISSUECERT_MAX_ATTEMPTS")?,
            deadline_secs: parsed(&lookup, "ISSUECERT_DEADLINE_SECS")?,
            log_level: optional(&lookup, "ISSUECERT_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_domain_name(&self.zone_name)
            .context("WHITELABELZONE is not a valid domain name")?;
        self.validate_domain_name(&self.fallback_hostname)
            .context("WHITELABELHOST is not a valid domain name")?;
        self.validate_domain_name(self.customer_domain.trim_matches('.'))
            .context("CUSTOMERDOMAIN is not a valid domain name")?;

        // Check for obvious placeholder keys (common mistake)
        let key_lower = self.api_key.to_lowercase();
        if key_lower.contains("your_") || key_lower.contains("replace_me") || key_lower == "key" {
            anyhow::bail!(
                "CF_API_KEY appears to be a placeholder. \
                Use the Global API key from your Cloudflare profile."
            );
        }

        if !self.api_email.contains('@') {
            anyhow::bail!("CF_API_EMAIL must be an email address. Got: {}", self.api_email);
        }

        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            anyhow::bail!(
                "CF_API_BASE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.api_base_url
            );
        }

        if let Some(origin) = &self.custom_origin_server {
            self.validate_domain_name(origin)
                .context("ISSUECERT_CUSTOM_ORIGIN is not a valid domain name")?;
        }

        if let Some(interval) = self.poll_interval_secs
            && !(1..=3600).contains(&interval)
        {
            anyhow::bail!(
                "ISSUECERT_POLL_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                interval
            );
        }

        if self.max_attempts == Some(0) {
            anyhow::bail!("ISSUECERT_MAX_ATTEMPTS must be at least 1");
        }

        if self.deadline_secs == Some(0) {
            anyhow::bail!("ISSUECERT_DEADLINE_SECS must be at least 1");
        }

        if self.log_level().is_none() {
            anyhow::bail!(
                "ISSUECERT_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }

    /// Validate that a string is a valid domain name
    ///
    /// Basic RFC 1035 checks; catches common typos, not every invalid name.
    fn validate_domain_name(&self, domain: &str) -> Result<()> {
        if domain.is_empty() {
            anyhow::bail!("Domain name cannot be empty");
        }

        if domain.len() > 253 {
            anyhow::bail!(
                "Domain name too long: {} chars (max 253). Got: {}",
                domain.len(),
                domain
            );
        }

        for label in domain.split('.') {
            if label.is_empty() {
                anyhow::bail!("Domain name has empty label: '{}'", domain);
            }

            if label.len() > 63 {
                anyhow::bail!(
                    "Domain label too long: {} chars (max 63). Label: '{}'",
                    label.len(),
                    label
                );
            }

            if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
                anyhow::bail!(
                    "Domain label contains invalid characters. Label: '{}'. \
                    Valid: alphanumeric and hyphen only.",
                    label
                );
            }

            if label.starts_with('-') || label.ends_with('-') {
                anyhow::bail!(
                    "Domain label cannot start or end with hyphen. Label: '{}'",
                    label
                );
            }
        }

        Ok(())
    }

    /// Tracing level, `None` if `log_level` is not recognised
    pub fn log_level(&self) -> Option<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }

    /// Build the core issuance configuration
    pub fn to_issuance_config(&self) -> IssuanceConfig {
        let mut config = IssuanceConfig::new(
            self.zone_name.clone(),
            self.fallback_hostname.clone(),
            self.customer_domain.clone(),
            ProviderConfig::Cloudflare {
                api_key: self.api_key.clone(),
                api_email: self.api_email.clone(),
                api_base_url: self.api_base_url.clone(),
            },
        );

        config.validation.method = self.validation_method;
        config.validation.custom_origin_server = self.custom_origin_server.clone();
        if let Some(interval) = self.poll_interval_secs {
            config.poll.interval_secs = interval;
        }
        config.poll.max_attempts = self.max_attempts;
        config.poll.deadline_secs = self.deadline_secs;

        config
    }
}
