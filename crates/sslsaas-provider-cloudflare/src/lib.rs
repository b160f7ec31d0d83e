// # Cloudflare SSL for SaaS Provider
//
// Implements `CustomHostnameApi` against the Cloudflare v4 API.
//
// ## Scope
//
// - One HTTP request per trait call (zone lookup may page through results)
// - HTTP status codes mapped to typed errors; the state machine decides what to retry
// - Unsuccessful `{success: false}` envelopes are logged and surface as `Ok(None)`
// - No retry, backoff, caching or background tasks in this crate
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or `Debug` output
// - Redirects are not followed, so credentials are only sent to the configured host
//
// ## API Reference
//
// - List Zones: GET `zones?page=N&per_page=50`
// - Create Custom Hostname: POST `zones/:zone_id/custom_hostnames`
// - Custom Hostname Details: GET `zones/:zone_id/custom_hostnames/:id`

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use sslsaas_core::config::ProviderConfig;
use sslsaas_core::traits::{
    CustomHostname, CustomHostnameApi, CustomHostnameRequest, SslStatus, Zone,
};
use sslsaas_core::{Error, Result};
use std::time::Duration;

/// Provider name used in logs and errors
const PROVIDER: &str = "cloudflare";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Zones requested per page
const ZONES_PER_PAGE: u32 = 50;

const X_AUTH_KEY: HeaderName = HeaderName::from_static("x-auth-key");
const X_AUTH_EMAIL: HeaderName = HeaderName::from_static("x-auth-email");

/// Cloudflare custom hostname provider
///
/// Authenticates with the global API key and account email. The `Debug`
/// implementation does NOT expose the key.
pub struct CloudflareProvider {
    /// Base URL, always ending in `/`
    base_url: String,

    /// Account email (not secret, shown in `Debug`)
    api_email: String,

    /// HTTP client carrying the auth headers
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_key", &"<REDACTED>")
            .field("api_email", &self.api_email)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// `{success, errors, messages, result, result_info}` response wrapper
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CustomHostnameResult {
    id: String,
    hostname: String,
    ssl: SslResult,
}

#[derive(Debug, Deserialize)]
struct SslResult {
    status: SslStatus,
}

impl From<CustomHostnameResult> for CustomHostname {
    fn from(r: CustomHostnameResult) -> Self {
        CustomHostname {
            id: r.id,
            hostname: r.hostname,
            ssl_status: r.ssl.status,
        }
    }
}

fn format_api_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_key`: Global API key (sent as `X-Auth-Key`)
    /// - `api_email`: Account email (sent as `X-Auth-Email`)
    /// - `base_url`: API base, e.g. `https://api.cloudflare.com/client/v4/`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for empty credentials, credentials that are not
    /// valid header values, or a client that cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        api_email: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let api_email = api_email.into();

        if api_key.is_empty() {
            return Err(Error::config("Cloudflare API key cannot be empty"));
        }
        if api_email.is_empty() {
            return Err(Error::config("Cloudflare API email cannot be empty"));
        }

        let mut key_value = HeaderValue::from_str(&api_key)
            .map_err(|_| Error::config("Cloudflare API key contains invalid characters"))?;
        key_value.set_sensitive(true);
        let email_value = HeaderValue::from_str(&api_email)
            .map_err(|_| Error::config("Cloudflare API email contains invalid characters"))?;

        let mut headers = HeaderMap::new();
        headers.insert(X_AUTH_KEY, key_value);
        headers.insert(X_AUTH_EMAIL, email_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            base_url,
            api_email,
            client,
        })
    }

    /// Create a provider from configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        match config {
            ProviderConfig::Cloudflare {
                api_key,
                api_email,
                api_base_url,
            } => Self::new(api_key.clone(), api_email.clone(), api_base_url.clone()),
        }
    }

    /// Perform one API call and unwrap the response envelope
    ///
    /// # Returns
    ///
    /// - `Ok(Some(envelope))`: HTTP success and `success: true`
    /// - `Ok(None)`: the API answered with `success: false` (errors logged)
    /// - `Err(Error)`: transport failure or an HTTP status mapped below
    ///
    /// | Status | Error |
    /// |---|---|
    /// | 401, 403 | `Authentication` |
    /// | 404 | `NotFound` |
    /// | 429 | `RateLimited` (retryable) |
    /// | 5xx | transient `Provider` (retryable) |
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Envelope>> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Cloudflare API request: {} {}", method, path);

        let mut builder = self.client.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(format!("Cloudflare API request timed out: {}", path))
            } else {
                Error::http(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response body: {}", e)))?;

        match status.as_u16() {
            401 | 403 => {
                return Err(Error::auth(format!(
                    "Invalid API key/email or insufficient permissions. Status: {}",
                    status
                )));
            }
            404 => {
                return Err(Error::not_found(format!("Cloudflare resource not found: {}", path)));
            }
            429 => {
                return Err(Error::rate_limited(format!(
                    "Rate limit exceeded. Please retry later. Status: {}",
                    status
                )));
            }
            500..=599 => {
                return Err(Error::provider_transient(
                    PROVIDER,
                    format!("Cloudflare server error (transient): {} - {}", status, text),
                ));
            }
            _ => {}
        }

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) if envelope.success && status.is_success() => Ok(Some(envelope)),
            Ok(envelope) => {
                tracing::warn!(
                    "Cloudflare API call {} was unsuccessful ({}): {}",
                    path,
                    status,
                    format_api_errors(&envelope.errors)
                );
                Ok(None)
            }
            Err(e) if status.is_success() => Err(Error::from(e)),
            Err(_) => Err(Error::provider(
                PROVIDER,
                format!("Unexpected response: {} - {}", status, text),
            )),
        }
    }
}

#[async_trait]
impl CustomHostnameApi for CloudflareProvider {
    async fn lookup_zone(&self, name: &str) -> Result<Option<Zone>> {
        tracing::debug!("Looking up zone: {}", name);

        let mut page: u32 = 1;
        loop {
            let path = format!("zones?page={}&per_page={}", page, ZONES_PER_PAGE);
            let Some(envelope) = self.request(Method::GET, &path, None).await? else {
                return Ok(None);
            };

            let zones: Vec<Zone> = serde_json::from_value(envelope.result)?;
            if let Some(zone) = zones.into_iter().find(|z| z.name == name) {
                tracing::debug!("Found zone {} on page {}", zone.id, page);
                return Ok(Some(zone));
            }

            let total_pages = envelope
                .result_info
                .and_then(|info| info.total_pages)
                .unwrap_or(1);
            if page >= total_pages {
                return Ok(None);
            }
            page += 1;
        }
    }

    async fn create_custom_hostname(
        &self,
        zone_id: &str,
        request: &CustomHostnameRequest,
    ) -> Result<Option<CustomHostname>> {
        let mut payload = json!({
            "hostname": request.hostname,
            "ssl": {
                "method": request.method.as_str(),
                "type": "dv",
            },
        });
        if let Some(origin) = &request.custom_origin_server {
            payload["custom_origin_server"] = json!(origin);
        }

        tracing::info!(
            "Creating custom hostname {} ({} validation)",
            request.hostname,
            request.method
        );

        let path = format!("zones/{}/custom_hostnames", zone_id);
        let Some(envelope) = self.request(Method::POST, &path, Some(&payload)).await? else {
            return Ok(None);
        };

        let created: CustomHostnameResult = serde_json::from_value(envelope.result)?;
        Ok(Some(created.into()))
    }

    async fn get_ssl_status(
        &self,
        zone_id: &str,
        custom_hostname_id: &str,
    ) -> Result<Option<SslStatus>> {
        let path = format!("zones/{}/custom_hostnames/{}", zone_id, custom_hostname_id);
        let Some(envelope) = self.request(Method::GET, &path, None).await? else {
            return Ok(None);
        };

        let current: CustomHostnameResult = serde_json::from_value(envelope.result)?;
        Ok(Some(current.ssl.status))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
