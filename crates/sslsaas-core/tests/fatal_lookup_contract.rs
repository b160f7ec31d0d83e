//! Architectural Contract Test: Fatal Setup Failures
//!
//! Verifies which provider answers end a run before polling starts.
//!
//! Constraints verified:
//! - An unknown zone ends the run with `ZoneNotFound` and nothing is created
//! - A rejected creation ends the run with `CreationRejected` and nothing is polled
//! - Zone names match exactly; the first matching zone wins
//! - Invalid configuration is rejected at construction

mod common;

use common::*;
use sslsaas_core::traits::SslStatus;
use sslsaas_core::{Error, IssuanceWorkflow};
use std::sync::Arc;

#[tokio::test]
async fn unknown_zone_stops_before_creation() {
    let api = Arc::new(ScriptedApi::new(vec![zone("Z9", "other.com")]).creating("H1"));

    let (workflow, _events) = IssuanceWorkflow::new(
        minimal_config(),
        api.clone(),
        Arc::new(StaticResolver::new()),
        Arc::new(ManualClock::new_year_2024()),
    )
    .unwrap();

    let err = workflow.run().await.unwrap_err();

    match err {
        Error::ZoneNotFound(name) => assert_eq!(name, "example.com"),
        other => panic!("expected ZoneNotFound, got {:?}", other),
    }
    assert_eq!(api.create_calls(), 0);
    assert_eq!(api.status_calls(), 0);
}

#[tokio::test]
async fn zone_match_is_case_sensitive() {
    let api = Arc::new(ScriptedApi::new(vec![zone("Z1", "Example.com")]).creating("H1"));

    let (workflow, _events) = IssuanceWorkflow::new(
        minimal_config(),
        api.clone(),
        Arc::new(StaticResolver::new()),
        Arc::new(ManualClock::new_year_2024()),
    )
    .unwrap();

    assert!(matches!(
        workflow.run().await,
        Err(Error::ZoneNotFound(_))
    ));
    assert_eq!(api.create_calls(), 0);
}

#[tokio::test]
async fn first_matching_zone_is_used() {
    let api = Arc::new(
        ScriptedApi::new(vec![
            zone("Z0", "other.com"),
            zone("Z1", "example.com"),
            zone("Z2", "example.com"),
        ])
        .creating("H1")
        .with_statuses(vec![Ok(Some(SslStatus::Active))]),
    );

    let (workflow, _events) = IssuanceWorkflow::new(
        minimal_config(),
        api,
        Arc::new(StaticResolver::new()),
        Arc::new(ManualClock::new_year_2024()),
    )
    .unwrap();

    let report = workflow.run().await.unwrap();
    assert_eq!(report.zone.id, "Z1");
}

#[tokio::test]
async fn rejected_creation_stops_before_polling() {
    let api = Arc::new(ScriptedApi::new(vec![zone("Z1", "example.com")]));

    let (workflow, _events) = IssuanceWorkflow::new(
        minimal_config(),
        api.clone(),
        Arc::new(StaticResolver::new()),
        Arc::new(ManualClock::new_year_2024()),
    )
    .unwrap();

    let err = workflow.run().await.unwrap_err();

    match err {
        Error::CreationRejected(hostname) => {
            assert_eq!(hostname, "ex2024-01-01-000000.customer.com")
        }
        other => panic!("expected CreationRejected, got {:?}", other),
    }
    assert_eq!(api.create_calls(), 1);
    assert_eq!(api.status_calls(), 0);
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut config = minimal_config();
    config.customer_domain = String::new();

    let result = IssuanceWorkflow::new(
        config,
        Arc::new(ScriptedApi::new(vec![])),
        Arc::new(StaticResolver::new()),
        Arc::new(ManualClock::new_year_2024()),
    );

    assert!(matches!(result, Err(Error::Config(_))));
}
