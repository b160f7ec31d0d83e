//! Test doubles shared by the workflow contract tests
//!
//! Minimal doubles that record how the workflow uses them, without any
//! network access or real delays.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sslsaas_core::error::{Error, Result};
use sslsaas_core::traits::{
    Clock, CustomHostname, CustomHostnameApi, CustomHostnameRequest, HostResolver, SslStatus,
    Zone,
};
use sslsaas_core::{IssuanceConfig, ProviderConfig};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider API that answers from a script and counts every call
pub struct ScriptedApi {
    zones: Vec<Zone>,
    created_id: Option<String>,
    creation_status: SslStatus,
    statuses: Mutex<VecDeque<Result<Option<SslStatus>>>>,
    requests: Mutex<Vec<CustomHostnameRequest>>,
    lookup_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    status_calls: Arc<AtomicUsize>,
}

impl ScriptedApi {
    /// Zones to serve, no creation configured yet
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones,
            created_id: None,
            creation_status: SslStatus::Initializing,
            statuses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            lookup_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            status_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Accept creation requests, returning a hostname with `id`
    pub fn creating(mut self, id: &str) -> Self {
        self.created_id = Some(id.to_string());
        self
    }

    /// SSL status reported by the creation response
    pub fn creation_status(mut self, status: SslStatus) -> Self {
        self.creation_status = status;
        self
    }

    /// Successive `get_ssl_status` answers
    ///
    /// Once the script is exhausted the status stays `pending_validation`.
    pub fn with_statuses(self, statuses: Vec<Result<Option<SslStatus>>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Creation requests seen so far
    pub fn requests(&self) -> Vec<CustomHostnameRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CustomHostnameApi for ScriptedApi {
    async fn lookup_zone(&self, name: &str) -> Result<Option<Zone>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.zones.iter().find(|z| z.name == name).cloned())
    }

    async fn create_custom_hostname(
        &self,
        _zone_id: &str,
        request: &CustomHostnameRequest,
    ) -> Result<Option<CustomHostname>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.created_id.as_ref().map(|id| CustomHostname {
            id: id.clone(),
            hostname: request.hostname.clone(),
            ssl_status: self.creation_status.clone(),
        }))
    }

    async fn get_ssl_status(
        &self,
        _zone_id: &str,
        _custom_hostname_id: &str,
    ) -> Result<Option<SslStatus>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Some(SslStatus::PendingValidation)))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Clock that starts at a fixed instant and advances only when slept on
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: AtomicUsize,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: AtomicUsize::new(0),
        }
    }

    /// Midnight UTC on 2024-01-01
    pub fn new_year_2024() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        let step = chrono::Duration::from_std(duration).unwrap();
        *self.now.lock().unwrap() += step;
        tokio::task::yield_now().await;
    }
}

/// Resolver answering from a fixed table; unknown names fail
#[derive(Default)]
pub struct StaticResolver {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, host: &str, addrs: &[&str]) -> Self {
        self.entries.insert(
            host.to_string(),
            addrs.iter().map(|a| a.parse().unwrap()).collect(),
        );
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        self.entries
            .get(host)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no such host: {}", host)))
    }
}

pub fn zone(id: &str, name: &str) -> Zone {
    Zone {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// Configuration for zone `example.com` and customer domain `customer.com`
pub fn minimal_config() -> IssuanceConfig {
    IssuanceConfig::new(
        "example.com",
        "fallback.example.com",
        "customer.com",
        ProviderConfig::cloudflare("test-api-key", "ops@example.com"),
    )
}
