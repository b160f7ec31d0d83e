//! Issuance workflow
//!
//! Sequences one certificate issuance run:
//!
//! 1. Generate a fresh candidate hostname under the customer domain
//! 2. Advisory DNS pointing check against the fallback hostname
//! 3. Look up the managed-CNAME zone
//! 4. Create the custom hostname
//! 5. Poll until the certificate is active (or a bound / shutdown)
//! 6. Optionally inspect the certificate served at the edge
//!
//! Steps 3 and 4 are fatal when the provider yields nothing. Step 2 never is.

use crate::config::IssuanceConfig;
use crate::dns::DnsPointingChecker;
use crate::error::{Error, Result};
use crate::hostname::generate_hostname_with;
use crate::inspect::{CertificateInfo, CertificateInspector};
use crate::issuance::{IssuanceEvent, IssuanceOutcome, IssuanceStateMachine};
use crate::traits::{
    Clock, CustomHostname, CustomHostnameApi, CustomHostnameRequest, HostResolver, Zone,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Everything one run produced
#[derive(Debug)]
pub struct WorkflowReport {
    /// Generated candidate hostname
    pub hostname: String,
    /// Whether the advisory pointing check matched
    pub dns_pointed: bool,
    /// Zone the hostname was created in
    pub zone: Zone,
    /// The custom hostname as returned at creation
    pub custom_hostname: CustomHostname,
    /// How polling ended
    pub outcome: IssuanceOutcome,
    /// Edge inspection result (only when active and an inspector is configured)
    pub certificate: Option<Result<CertificateInfo>>,
}

/// Runs the issuance steps against injected collaborators
pub struct IssuanceWorkflow {
    config: IssuanceConfig,
    api: Arc<dyn CustomHostnameApi>,
    resolver: Arc<dyn HostResolver>,
    clock: Arc<dyn Clock>,
    inspector: Option<CertificateInspector>,
    event_tx: mpsc::Sender<IssuanceEvent>,
}

impl IssuanceWorkflow {
    /// Create a workflow
    ///
    /// Validates `config` and returns the receiving end of the issuance event
    /// channel alongside the workflow.
    pub fn new(
        config: IssuanceConfig,
        api: Arc<dyn CustomHostnameApi>,
        resolver: Arc<dyn HostResolver>,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, mpsc::Receiver<IssuanceEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.poll.event_channel_capacity);

        let workflow = Self {
            config,
            api,
            resolver,
            clock,
            inspector: None,
            event_tx: tx,
        };

        Ok((workflow, rx))
    }

    /// Inspect the edge certificate once the hostname is active
    pub fn with_inspector(mut self, inspector: CertificateInspector) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Run to completion
    pub async fn run(&self) -> Result<WorkflowReport> {
        self.run_with_shutdown(None).await
    }

    /// Run to completion, cancelling polling when `shutdown_rx` fires
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<WorkflowReport> {
        let hostname = generate_hostname_with(self.clock.as_ref(), &self.config.customer_domain);
        info!("Requesting certificate for {}", hostname);

        let dns_pointed = DnsPointingChecker::new(self.resolver.clone())
            .check(&hostname, &self.config.fallback_hostname)
            .await;
        if !dns_pointed {
            warn!(
                "{} does not point at {} yet; continuing (the CNAME may be added later)",
                hostname, self.config.fallback_hostname
            );
        }

        let zone = match self.api.lookup_zone(&self.config.zone_name).await? {
            Some(zone) => zone,
            None => {
                error!("Could not retrieve zone info for zone: {}", self.config.zone_name);
                return Err(Error::ZoneNotFound(self.config.zone_name.clone()));
            }
        };
        info!("Using zone {} ({})", zone.name, zone.id);

        let request = CustomHostnameRequest::http_dv(&hostname)
            .with_method(self.config.validation.method)
            .with_custom_origin(self.config.validation.custom_origin_server.clone());

        let custom_hostname = match self.api.create_custom_hostname(&zone.id, &request).await? {
            Some(created) => created,
            None => {
                error!("Custom hostname creation for {} was rejected", hostname);
                return Err(Error::CreationRejected(hostname));
            }
        };
        info!(
            "Created custom hostname {} (id {}), ssl status {}",
            custom_hostname.hostname, custom_hostname.id, custom_hostname.ssl_status
        );

        let mut machine = IssuanceStateMachine::new(
            self.api.clone(),
            self.clock.clone(),
            zone.id.clone(),
            custom_hostname.clone(),
            self.config.poll.clone(),
        )
        .with_event_sender(self.event_tx.clone());

        let outcome = machine.run_with_shutdown(shutdown_rx).await?;

        let certificate = match (&outcome, &self.inspector) {
            (IssuanceOutcome::Active(active), Some(inspector)) => {
                let result = inspector.inspect(active).await;
                if let Err(e) = &result {
                    warn!("Certificate inspection for {} failed: {}", active.hostname(), e);
                }
                Some(result)
            }
            _ => None,
        };

        Ok(WorkflowReport {
            hostname,
            dns_pointed,
            zone,
            custom_hostname,
            outcome,
            certificate,
        })
    }
}
