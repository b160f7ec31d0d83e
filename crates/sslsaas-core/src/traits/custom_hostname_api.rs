// # Custom Hostname API Trait
//
// Defines the interface to a managed-CNAME TLS provider.
//
// ## Implementations
//
// - Cloudflare: `sslsaas-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use sslsaas_core::{CustomHostnameApi, CustomHostnameRequest};
//
// let zone = api.lookup_zone("saas.example.com").await?.ok_or(...)?;
// let created = api
//     .create_custom_hostname(&zone.id, &CustomHostnameRequest::http_dv("shop.customer.com"))
//     .await?;
// let status = api.get_ssl_status(&zone.id, &created.unwrap().id).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A provider zone. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider zone identifier
    pub id: String,
    /// Zone apex name (e.g., "saas.example.com")
    pub name: String,
}

/// A custom hostname resource as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHostname {
    /// Provider identifier, immutable once created
    pub id: String,
    /// The customer-facing hostname
    pub hostname: String,
    /// SSL status at the time the resource was read
    pub ssl_status: SslStatus,
}

/// Domain-control validation method requested for the certificate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMethod {
    /// HTTP token served by the provider once the CNAME is in place
    #[default]
    Http,
    /// TXT record published by the customer
    Txt,
    /// Approval email to the domain's contacts
    Email,
}

impl ValidationMethod {
    /// The wire value for this method
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMethod::Http => "http",
            ValidationMethod::Txt => "txt",
            ValidationMethod::Email => "email",
        }
    }
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValidationMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ValidationMethod::Http),
            "txt" => Ok(ValidationMethod::Txt),
            "email" => Ok(ValidationMethod::Email),
            other => Err(crate::Error::invalid_input(format!(
                "unknown validation method '{}' (expected http, txt or email)",
                other
            ))),
        }
    }
}

/// Parameters for creating a custom hostname
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHostnameRequest {
    /// Hostname to issue the certificate for
    pub hostname: String,
    /// Validation method (the certificate type is always DV)
    pub method: ValidationMethod,
    /// Origin to route this hostname to instead of the zone's fallback origin
    pub custom_origin_server: Option<String>,
}

impl CustomHostnameRequest {
    /// Request a DV certificate validated over HTTP, using the fallback origin
    pub fn http_dv(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            method: ValidationMethod::Http,
            custom_origin_server: None,
        }
    }

    /// Set the validation method
    pub fn with_method(mut self, method: ValidationMethod) -> Self {
        self.method = method;
        self
    }

    /// Route the hostname to a custom origin server
    pub fn with_custom_origin(mut self, origin: Option<String>) -> Self {
        self.custom_origin_server = origin;
        self
    }
}

/// SSL status of a custom hostname
///
/// Values follow the provider's lifecycle (`initializing` → `pending_validation` →
/// `pending_issuance` → `pending_deployment` → `active`). Only [`SslStatus::Active`]
/// ends polling; statuses the crate does not know are kept verbatim in
/// [`SslStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SslStatus {
    Initializing,
    PendingValidation,
    PendingIssuance,
    PendingDeployment,
    Active,
    PendingDeletion,
    Deleted,
    Expired,
    ValidationTimedOut,
    IssuanceTimedOut,
    DeploymentTimedOut,
    Other(String),
}

impl SslStatus {
    /// The provider's wire value
    pub fn as_str(&self) -> &str {
        match self {
            SslStatus::Initializing => "initializing",
            SslStatus::PendingValidation => "pending_validation",
            SslStatus::PendingIssuance => "pending_issuance",
            SslStatus::PendingDeployment => "pending_deployment",
            SslStatus::Active => "active",
            SslStatus::PendingDeletion => "pending_deletion",
            SslStatus::Deleted => "deleted",
            SslStatus::Expired => "expired",
            SslStatus::ValidationTimedOut => "validation_timed_out",
            SslStatus::IssuanceTimedOut => "issuance_timed_out",
            SslStatus::DeploymentTimedOut => "deployment_timed_out",
            SslStatus::Other(s) => s,
        }
    }

    /// Whether the certificate is issued and deployed
    pub fn is_active(&self) -> bool {
        matches!(self, SslStatus::Active)
    }

    /// Statuses after which the provider will not make progress without operator
    /// action. Polling still continues; callers may surface these as warnings.
    pub fn is_stalled(&self) -> bool {
        matches!(
            self,
            SslStatus::Deleted
                | SslStatus::Expired
                | SslStatus::ValidationTimedOut
                | SslStatus::IssuanceTimedOut
                | SslStatus::DeploymentTimedOut
        )
    }
}

impl From<&str> for SslStatus {
    fn from(s: &str) -> Self {
        match s {
            "initializing" => SslStatus::Initializing,
            "pending_validation" => SslStatus::PendingValidation,
            "pending_issuance" => SslStatus::PendingIssuance,
            "pending_deployment" => SslStatus::PendingDeployment,
            "active" => SslStatus::Active,
            "pending_deletion" => SslStatus::PendingDeletion,
            "deleted" => SslStatus::Deleted,
            "expired" => SslStatus::Expired,
            "validation_timed_out" => SslStatus::ValidationTimedOut,
            "issuance_timed_out" => SslStatus::IssuanceTimedOut,
            "deployment_timed_out" => SslStatus::DeploymentTimedOut,
            other => SslStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for SslStatus {
    fn from(s: String) -> Self {
        SslStatus::from(s.as_str())
    }
}

impl From<SslStatus> for String {
    fn from(status: SslStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SslStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for managed-CNAME provider implementations
///
/// Implementations execute exactly one logical API operation per call and
/// report what the provider said. They do not retry, sleep or poll; that is
/// owned by [`crate::IssuanceStateMachine`].
///
/// # Absence vs. errors
///
/// Every operation returns `Ok(None)` when the provider answered with an
/// unsuccessful response envelope (or, for zone lookup, when no zone matched).
/// `Err` is reserved for failures to talk to the provider at all, or answers
/// that could not be understood.
#[async_trait]
pub trait CustomHostnameApi: Send + Sync {
    /// Find a zone by exact, case-sensitive name
    ///
    /// The first exact match wins if the provider lists duplicates.
    async fn lookup_zone(&self, name: &str) -> Result<Option<Zone>, crate::Error>;

    /// Create a custom hostname in `zone_id` and request a DV certificate for it
    async fn create_custom_hostname(
        &self,
        zone_id: &str,
        request: &CustomHostnameRequest,
    ) -> Result<Option<CustomHostname>, crate::Error>;

    /// Fetch the current SSL status of a custom hostname
    async fn get_ssl_status(
        &self,
        zone_id: &str,
        custom_hostname_id: &str,
    ) -> Result<Option<SslStatus>, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_status_wire_values() {
        assert_eq!(SslStatus::from("active"), SslStatus::Active);
        assert_eq!(SslStatus::from("pending_validation"), SslStatus::PendingValidation);
        assert_eq!(
            SslStatus::from("staging_active"),
            SslStatus::Other("staging_active".to_string())
        );
        assert_eq!(SslStatus::Other("staging_active".into()).as_str(), "staging_active");
    }

    #[test]
    fn test_ssl_status_serde_uses_provider_strings() {
        let status: SslStatus = serde_json::from_str("\"pending_issuance\"").unwrap();
        assert_eq!(status, SslStatus::PendingIssuance);
        assert_eq!(
            serde_json::to_string(&SslStatus::PendingIssuance).unwrap(),
            "\"pending_issuance\""
        );
    }

    #[test]
    fn test_only_active_is_terminal() {
        assert!(SslStatus::Active.is_active());
        assert!(!SslStatus::PendingDeployment.is_active());
        assert!(!SslStatus::ValidationTimedOut.is_active());
        assert!(SslStatus::ValidationTimedOut.is_stalled());
        assert!(!SslStatus::PendingValidation.is_stalled());
    }

    #[test]
    fn test_validation_method_parse() {
        assert_eq!("HTTP".parse::<ValidationMethod>().unwrap(), ValidationMethod::Http);
        assert_eq!("txt".parse::<ValidationMethod>().unwrap(), ValidationMethod::Txt);
        assert!("cname".parse::<ValidationMethod>().is_err());
    }

    #[test]
    fn test_request_builder() {
        let req = CustomHostnameRequest::http_dv("shop.customer.com")
            .with_method(ValidationMethod::Txt)
            .with_custom_origin(Some("origin.example.net".to_string()));
        assert_eq!(req.hostname, "shop.customer.com");
        assert_eq!(req.method, ValidationMethod::Txt);
        assert_eq!(req.custom_origin_server.as_deref(), Some("origin.example.net"));
    }
}
