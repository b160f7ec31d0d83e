//! Core traits for the issuance workflow
//!
//! This module defines the abstract interfaces that implementations must follow.
//!
//! - [`CustomHostnameApi`]: The provider calls needed to issue a certificate
//! - [`HostResolver`]: Hostname to address resolution for the pointing check
//! - [`Clock`]: Wall-clock reads and sleeping, injectable for tests

pub mod custom_hostname_api;
pub mod resolver;
pub mod clock;

pub use custom_hostname_api::{
    CustomHostname, CustomHostnameApi, CustomHostnameRequest, SslStatus, ValidationMethod, Zone,
};
pub use resolver::{HostResolver, SystemResolver};
pub use clock::{Clock, SystemClock};
