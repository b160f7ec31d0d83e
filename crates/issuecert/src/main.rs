// # issuecert - SSL for SaaS certificate issuance
//
// Thin integration layer: all issuance logic lives in sslsaas-core.
//
// The binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Wiring the Cloudflare provider into the issuance workflow
// 4. Translating SIGINT/SIGTERM into workflow cancellation
// 5. Printing the certificate report and choosing the exit code
//
// ## Configuration
//
// ### Required
// - `WHITELABELZONE`: Managed-CNAME zone name
// - `WHITELABELHOST`: Fallback hostname customers CNAME to
// - `CUSTOMERDOMAIN`: Customer base domain
// - `CF_API_KEY`: Cloudflare Global API key
// - `CF_API_EMAIL`: Cloudflare account email
//
// ### Optional
// - `CF_API_BASE_URL`: API base (default `https://api.cloudflare.com/client/v4/`)
// - `ISSUECERT_VALIDATION_METHOD`: `http` (default), `txt` or `email`
// - `ISSUECERT_CUSTOM_ORIGIN`: Custom origin server for the hostname
// - `ISSUECERT_POLL_INTERVAL_SECS`: Delay between status polls (default 20)
// - `ISSUECERT_MAX_ATTEMPTS`: Give up after this many status polls
// - `ISSUECERT_DEADLINE_SECS`: Give up after polling this long
// - `ISSUECERT_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export WHITELABELZONE=saas.example.com
// export WHITELABELHOST=fallback.saas.example.com
// export CUSTOMERDOMAIN=customer.com
// export CF_API_KEY=your_global_api_key
// export CF_API_EMAIL=you@example.com
//
// issuecert
// ```

mod config;
mod report;

use config::Config;
use sslsaas_core::traits::SslStatus;
use sslsaas_core::{
    CertificateInspector, Error, IssuanceEvent, IssuanceOutcome, IssuanceWorkflow, SystemClock,
    SystemResolver,
};
use sslsaas_provider_cloudflare::CloudflareProvider;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for the ways a run can end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IssueExitCode {
    /// Certificate active (even if edge inspection failed)
    Issued = 0,
    /// Configuration or setup failure (including zone lookup and creation)
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
    /// `ISSUECERT_MAX_ATTEMPTS` or `ISSUECERT_DEADLINE_SECS` reached
    BoundReached = 3,
    /// Interrupted by SIGINT/SIGTERM
    Cancelled = 4,
}

impl From<IssueExitCode> for ExitCode {
    fn from(code: IssueExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl IssueExitCode {
    /// Exit code for a workflow error
    fn for_error(error: &Error) -> Self {
        match error {
            Error::Config(_) | Error::ZoneNotFound(_) | Error::CreationRejected(_) => {
                IssueExitCode::ConfigError
            }
            _ => IssueExitCode::RuntimeError,
        }
    }

    /// Exit code for a finished polling run
    fn for_outcome(outcome: &IssuanceOutcome) -> Self {
        match outcome {
            IssuanceOutcome::Active(_) => IssueExitCode::Issued,
            IssuanceOutcome::TimedOut { .. } => IssueExitCode::BoundReached,
            IssuanceOutcome::Cancelled { .. } => IssueExitCode::Cancelled,
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return IssueExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return IssueExitCode::ConfigError.into();
    }

    let log_level = config.log_level().unwrap_or(tracing::Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IssueExitCode::ConfigError.into();
    }

    info!("Starting issuecert");

    // Every step is awaited in sequence; one thread is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IssueExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config)).into()
}

/// Run one issuance and report it
async fn run(config: Config) -> IssueExitCode {
    let issuance_config = config.to_issuance_config();

    let provider = match CloudflareProvider::from_config(&issuance_config.provider) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to set up Cloudflare client: {}", e);
            return IssueExitCode::ConfigError;
        }
    };

    let inspector = match CertificateInspector::new(&issuance_config.inspect) {
        Ok(inspector) => Some(inspector),
        Err(e) => {
            warn!("Edge certificate inspection disabled: {}", e);
            None
        }
    };

    let (workflow, events) = match IssuanceWorkflow::new(
        issuance_config,
        Arc::new(provider),
        Arc::new(SystemResolver),
        Arc::new(SystemClock),
    ) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Invalid issuance configuration: {}", e);
            return IssueExitCode::ConfigError;
        }
    };
    let workflow = match inspector {
        Some(inspector) => workflow.with_inspector(inspector),
        None => workflow,
    };

    let history = tokio::spawn(collect_statuses(events));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signals = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                info!("Received {}, stopping", signal);
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                // Keep the sender alive: dropping it would cancel the run
                warn!("Signal handling unavailable: {}", e);
                let _keep = shutdown_tx;
                std::future::pending::<()>().await;
            }
        }
    });

    let result = workflow.run_with_shutdown(Some(shutdown_rx)).await;
    signals.abort();
    drop(workflow);

    let statuses = history.await.unwrap_or_default();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!("{}", e);
            return IssueExitCode::for_error(&e);
        }
    };

    if !statuses.is_empty() {
        println!("Status progression: {}", report::status_progression(&statuses));
    }

    match &summary.outcome {
        IssuanceOutcome::Active(active) => {
            info!(
                "{} active since {} after {} status poll(s)",
                active.hostname(),
                active.activated_at().to_rfc3339(),
                active.attempts()
            );
            println!(
                "\nCertificate for {} has been issued and is live on Cloudflare's edge:",
                active.hostname()
            );
            match &summary.certificate {
                Some(Ok(info)) => print!("{}", report::certificate_report(info)),
                Some(Err(e)) => error!("Could not read certificate from the edge: {}", e),
                None => {}
            }
        }
        IssuanceOutcome::TimedOut {
            attempts,
            last_status,
        } => {
            warn!(
                "Gave up on {} after {} status poll(s); last status: {}",
                summary.hostname,
                attempts,
                last_status.as_ref().map(SslStatus::as_str).unwrap_or("unknown")
            );
            println!(
                "Custom hostname {} (id {}) was created but is not active yet",
                summary.hostname, summary.custom_hostname.id
            );
        }
        IssuanceOutcome::Cancelled { attempts, .. } => {
            warn!(
                "Cancelled after {} status poll(s); custom hostname {} (id {}) remains",
                attempts, summary.hostname, summary.custom_hostname.id
            );
        }
    }

    IssueExitCode::for_outcome(&summary.outcome)
}

/// Collect every observed status until the workflow drops its sender
async fn collect_statuses(mut events: mpsc::Receiver<IssuanceEvent>) -> Vec<SslStatus> {
    let mut statuses = Vec::new();
    while let Some(event) = events.recv().await {
        if let IssuanceEvent::StatusObserved { status, .. } = event {
            statuses.push(status);
        }
    }
    statuses
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> anyhow::Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_errors_map_to_config_exit() {
        assert_eq!(
            IssueExitCode::for_error(&Error::ZoneNotFound("example.com".into())),
            IssueExitCode::ConfigError
        );
        assert_eq!(
            IssueExitCode::for_error(&Error::CreationRejected("h.customer.com".into())),
            IssueExitCode::ConfigError
        );
    }

    #[test]
    fn test_other_errors_map_to_runtime_exit() {
        assert_eq!(
            IssueExitCode::for_error(&Error::invalid_input("bad id")),
            IssueExitCode::RuntimeError
        );
        assert_eq!(
            IssueExitCode::for_error(&Error::auth("bad key")),
            IssueExitCode::RuntimeError
        );
    }

    #[test]
    fn test_outcomes_map_to_exit_codes() {
        let timed_out = IssuanceOutcome::TimedOut {
            attempts: 3,
            last_status: Some(SslStatus::PendingValidation),
        };
        let cancelled = IssuanceOutcome::Cancelled {
            attempts: 1,
            last_status: None,
        };
        assert_eq!(IssueExitCode::for_outcome(&timed_out), IssueExitCode::BoundReached);
        assert_eq!(IssueExitCode::for_outcome(&cancelled), IssueExitCode::Cancelled);
        assert_eq!(ExitCode::from(IssueExitCode::Cancelled), ExitCode::from(4));
    }

    #[tokio::test]
    async fn test_collect_statuses_keeps_observed_only() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(IssuanceEvent::StatusObserved {
            hostname: "h".into(),
            attempt: 1,
            status: SslStatus::PendingValidation,
        })
        .await
        .unwrap();
        tx.send(IssuanceEvent::StatusUnavailable {
            hostname: "h".into(),
            attempt: 2,
            reason: "timeout".into(),
        })
        .await
        .unwrap();
        tx.send(IssuanceEvent::Activated {
            hostname: "h".into(),
            attempts: 3,
        })
        .await
        .unwrap();
        drop(tx);

        assert_eq!(collect_statuses(rx).await, vec![SslStatus::PendingValidation]);
    }
}
