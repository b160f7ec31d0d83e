//! Issuance state machine
//!
//! Drives a freshly created custom hostname until the provider reports its
//! certificate as `active`.
//!
//! ## States
//!
//! ```text
//! ┌───────────┐  first tick  ┌─────────┐  status == active  ┌────────┐
//! │ Requested │─────────────▶│ Polling │───────────────────▶│ Active │
//! └───────────┘              └─────────┘                    └────────┘
//!                              │    ▲
//!                              └────┘ any other status, unavailable status,
//!                                     retryable error (sleep interval)
//! ```
//!
//! There is no failure state. A customer that never adds the CNAME keeps the
//! machine in `Polling` until a configured bound is hit (`max_attempts`,
//! `deadline_secs`), the shutdown signal fires, or the process is terminated.
//!
//! ## Error Policy
//!
//! - `Ok(None)` from the provider (unsuccessful envelope): logged, keep polling
//! - Retryable errors ([`crate::Error::is_retryable`]): logged, keep polling
//! - Anything else (e.g. authentication): returned to the caller

use crate::config::PollConfig;
use crate::error::Result;
use crate::traits::{Clock, CustomHostname, CustomHostnameApi, SslStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Position of the custom hostname in the issuance lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceState {
    /// Created, not yet polled
    Requested,
    /// Waiting for the provider to report `active`
    Polling,
    /// Certificate issued and deployed
    Active,
}

/// Events emitted while polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceEvent {
    /// Polling started
    PollingStarted {
        hostname: String,
        custom_hostname_id: String,
        interval: Duration,
    },

    /// A status was read from the provider
    StatusObserved {
        hostname: String,
        attempt: usize,
        status: SslStatus,
    },

    /// No status could be read on this tick; polling continues
    StatusUnavailable {
        hostname: String,
        attempt: usize,
        reason: String,
    },

    /// The certificate is active
    Activated { hostname: String, attempts: usize },

    /// A polling bound was reached before activation
    TimedOut { hostname: String, attempts: usize },

    /// The shutdown signal fired before activation
    Cancelled { hostname: String, attempts: usize },
}

/// Proof that a custom hostname reached `active`
///
/// Only the state machine creates these; certificate inspection requires one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveHostname {
    hostname: String,
    zone_id: String,
    custom_hostname_id: String,
    attempts: usize,
    activated_at: DateTime<Utc>,
}

impl ActiveHostname {
    pub(crate) fn new(
        hostname: impl Into<String>,
        zone_id: impl Into<String>,
        custom_hostname_id: impl Into<String>,
        attempts: usize,
        activated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            zone_id: zone_id.into(),
            custom_hostname_id: custom_hostname_id.into(),
            attempts,
            activated_at,
        }
    }

    /// The hostname now serving the issued certificate
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Zone the custom hostname lives in
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Provider identifier of the custom hostname
    pub fn custom_hostname_id(&self) -> &str {
        &self.custom_hostname_id
    }

    /// Number of status polls it took
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// When `active` was first observed
    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }
}

/// How polling ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceOutcome {
    /// The certificate is active
    Active(ActiveHostname),

    /// `max_attempts` or the deadline was reached first
    TimedOut {
        attempts: usize,
        last_status: Option<SslStatus>,
    },

    /// The shutdown signal fired first
    Cancelled {
        attempts: usize,
        last_status: Option<SslStatus>,
    },
}

impl IssuanceOutcome {
    /// Whether the certificate was issued
    pub fn is_active(&self) -> bool {
        matches!(self, IssuanceOutcome::Active(_))
    }
}

/// Polls one custom hostname until it is active
///
/// ## Lifecycle
///
/// 1. Create with [`IssuanceStateMachine::new()`] right after the custom hostname is created
/// 2. Drive with [`IssuanceStateMachine::run()`] (or [`IssuanceStateMachine::tick()`] manually)
/// 3. Inspect the returned [`IssuanceOutcome`]
pub struct IssuanceStateMachine {
    /// Provider API
    api: Arc<dyn CustomHostnameApi>,

    /// Time source for pacing and deadlines
    clock: Arc<dyn Clock>,

    /// Zone the custom hostname was created in
    zone_id: String,

    /// The resource being polled
    custom_hostname: CustomHostname,

    /// Interval and bounds
    poll: PollConfig,

    state: IssuanceState,

    /// Number of status requests made so far
    attempts: usize,

    /// Last status seen (initially the status returned at creation)
    last_status: Option<SslStatus>,

    /// Time of the first tick
    started_at: Option<DateTime<Utc>>,

    /// When `active` was observed
    activated_at: Option<DateTime<Utc>>,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<IssuanceEvent>>,
}

impl IssuanceStateMachine {
    /// Create a state machine in the `Requested` state
    pub fn new(
        api: Arc<dyn CustomHostnameApi>,
        clock: Arc<dyn Clock>,
        zone_id: impl Into<String>,
        custom_hostname: CustomHostname,
        poll: PollConfig,
    ) -> Self {
        let last_status = Some(custom_hostname.ssl_status.clone());
        Self {
            api,
            clock,
            zone_id: zone_id.into(),
            custom_hostname,
            poll,
            state: IssuanceState::Requested,
            attempts: 0,
            last_status,
            started_at: None,
            activated_at: None,
            event_tx: None,
        }
    }

    /// Emit [`IssuanceEvent`]s on `tx`
    pub fn with_event_sender(mut self, tx: mpsc::Sender<IssuanceEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Current state
    pub fn state(&self) -> IssuanceState {
        self.state
    }

    /// Number of status requests made so far
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Last status seen
    pub fn last_status(&self) -> Option<&SslStatus> {
        self.last_status.as_ref()
    }

    /// Perform one poll
    ///
    /// Once `Active`, further ticks return immediately without calling the provider.
    pub async fn tick(&mut self) -> Result<IssuanceState> {
        if self.state == IssuanceState::Active {
            return Ok(self.state);
        }

        self.state = IssuanceState::Polling;
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now());
        }
        self.attempts += 1;
        let attempt = self.attempts;
        let hostname = self.custom_hostname.hostname.clone();

        match self
            .api
            .get_ssl_status(&self.zone_id, &self.custom_hostname.id)
            .await
        {
            Ok(Some(status)) => {
                info!(
                    "Checking on certificate status of {}.. {}",
                    hostname, status
                );
                if status.is_stalled() {
                    warn!(
                        "{} reports status {}; it will not issue without operator action",
                        hostname, status
                    );
                }
                if status.is_active() {
                    self.state = IssuanceState::Active;
                    self.activated_at = Some(self.clock.now());
                }
                self.emit_event(IssuanceEvent::StatusObserved {
                    hostname,
                    attempt,
                    status: status.clone(),
                });
                self.last_status = Some(status);
            }
            Ok(None) => {
                warn!(
                    "{} did not return a status for {} (attempt {})",
                    self.api.provider_name(),
                    hostname,
                    attempt
                );
                self.emit_event(IssuanceEvent::StatusUnavailable {
                    hostname,
                    attempt,
                    reason: "unsuccessful response".to_string(),
                });
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    "Status poll {} for {} failed, will retry: {}",
                    attempt, hostname, e
                );
                self.emit_event(IssuanceEvent::StatusUnavailable {
                    hostname,
                    attempt,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }

        Ok(self.state)
    }

    /// Poll until active or a configured bound is reached
    pub async fn run(&mut self) -> Result<IssuanceOutcome> {
        self.run_with_shutdown(None).await
    }

    /// Poll until active, a configured bound is reached, or `shutdown_rx` fires
    ///
    /// Dropping the sender counts as a shutdown signal.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<IssuanceOutcome> {
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(shutdown);

        let interval = self.poll.interval();
        info!(
            "Polling on certificate status of {} (will sleep {:?} between calls)",
            self.custom_hostname.hostname, interval
        );
        self.emit_event(IssuanceEvent::PollingStarted {
            hostname: self.custom_hostname.hostname.clone(),
            custom_hostname_id: self.custom_hostname.id.clone(),
            interval,
        });

        loop {
            let ticked = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                result = self.tick() => Some(result),
            };
            let Some(result) = ticked else {
                return Ok(self.cancelled());
            };

            if result? == IssuanceState::Active {
                return Ok(self.activated());
            }

            if self.bound_reached(interval) {
                return Ok(self.timed_out());
            }

            debug!("Sleeping {:?} before next status poll", interval);
            let slept = tokio::select! {
                biased;
                _ = &mut shutdown => false,
                _ = self.clock.sleep(interval) => true,
            };
            if !slept {
                return Ok(self.cancelled());
            }
        }
    }

    /// Whether polling must stop before the next tick
    ///
    /// The deadline is checked against the start of the next poll, so no
    /// status request is ever issued after it.
    fn bound_reached(&self, interval: Duration) -> bool {
        if let Some(max) = self.poll.max_attempts
            && self.attempts >= max
        {
            debug!("Reached maximum of {} status polls", max);
            return true;
        }

        if let (Some(deadline), Some(started)) = (self.poll.deadline(), self.started_at) {
            let elapsed = (self.clock.now() - started).to_std().unwrap_or_default();
            if elapsed + interval > deadline {
                debug!(
                    "Next status poll would start after the {:?} deadline ({:?} elapsed)",
                    deadline, elapsed
                );
                return true;
            }
        }

        false
    }

    fn activated(&self) -> IssuanceOutcome {
        info!(
            "Certificate for {} is active after {} status poll(s)",
            self.custom_hostname.hostname, self.attempts
        );
        self.emit_event(IssuanceEvent::Activated {
            hostname: self.custom_hostname.hostname.clone(),
            attempts: self.attempts,
        });
        IssuanceOutcome::Active(ActiveHostname::new(
            self.custom_hostname.hostname.clone(),
            self.zone_id.clone(),
            self.custom_hostname.id.clone(),
            self.attempts,
            self.activated_at.unwrap_or_else(|| self.clock.now()),
        ))
    }

    fn timed_out(&self) -> IssuanceOutcome {
        warn!(
            "Gave up waiting for {} after {} status poll(s)",
            self.custom_hostname.hostname, self.attempts
        );
        self.emit_event(IssuanceEvent::TimedOut {
            hostname: self.custom_hostname.hostname.clone(),
            attempts: self.attempts,
        });
        IssuanceOutcome::TimedOut {
            attempts: self.attempts,
            last_status: self.last_status.clone(),
        }
    }

    fn cancelled(&self) -> IssuanceOutcome {
        info!(
            "Polling for {} cancelled after {} status poll(s)",
            self.custom_hostname.hostname, self.attempts
        );
        self.emit_event(IssuanceEvent::Cancelled {
            hostname: self.custom_hostname.hostname.clone(),
            attempts: self.attempts,
        });
        IssuanceOutcome::Cancelled {
            attempts: self.attempts,
            last_status: self.last_status.clone(),
        }
    }

    /// Emit an issuance event
    fn emit_event(&self, event: IssuanceEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening any more
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
