// # sslsaas-core
//
// Core library for issuing TLS certificates for customer hostnames through a
// managed-CNAME ("SSL for SaaS") provider.
//
// ## Architecture Overview
//
// - **hostname**: Derives a fresh candidate hostname from the customer's base domain
// - **dns**: Advisory check that the candidate resolves like the fallback hostname
// - **CustomHostnameApi**: Trait for the three provider calls the workflow needs
// - **IssuanceStateMachine**: Polls the custom hostname until its SSL status is active
// - **CertificateInspector**: Reads the certificate actually served at the edge
// - **IssuanceWorkflow**: Sequences the steps above for one run
//
// ## Design Principles
//
// 1. **Explicit configuration**: One `IssuanceConfig` is built up front and passed in;
//    nothing in this crate reads the environment
// 2. **Injected time**: Sleeping and wall-clock reads go through `Clock`
// 3. **Provider isolation**: Provider crates only execute single API calls; polling,
//    retry classification and bounds are owned by the state machine
// 4. **Decoupled verification**: Edge inspection never changes the issuance outcome

pub mod traits;
pub mod config;
pub mod error;
pub mod hostname;
pub mod dns;
pub mod issuance;
pub mod inspect;
pub mod workflow;

// Re-export core types for convenience
pub use traits::{Clock, CustomHostnameApi, HostResolver, SystemClock, SystemResolver};
pub use traits::{CustomHostname, CustomHostnameRequest, SslStatus, ValidationMethod, Zone};
pub use config::{IssuanceConfig, PollConfig, ProviderConfig, ValidationConfig, InspectConfig};
pub use error::{Error, Result};
pub use issuance::{ActiveHostname, IssuanceEvent, IssuanceOutcome, IssuanceState, IssuanceStateMachine};
pub use inspect::{CertificateInfo, CertificateInspector};
pub use workflow::{IssuanceWorkflow, WorkflowReport};
