//! Candidate hostname generation
//!
//! Each run issues a certificate for a brand-new hostname under the customer's
//! domain, derived from the current UTC time at one-second granularity:
//!
//! ```text
//! ex2024-01-01-000000.customer.com
//! ```
//!
//! Two runs within the same second produce the same name.

use crate::traits::Clock;
use chrono::{DateTime, Utc};

/// Label prefix of every generated hostname
pub const HOSTNAME_PREFIX: &str = "ex";

/// `chrono` format for the timestamp part (`yyyy-MM-dd-HHmmss`)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Build the candidate hostname for `base_domain` at time `now`
pub fn generate_hostname(base_domain: &str, now: DateTime<Utc>) -> String {
    let base_domain = base_domain.trim().trim_matches('.');
    format!(
        "{}{}.{}",
        HOSTNAME_PREFIX,
        now.format(TIMESTAMP_FORMAT),
        base_domain
    )
}

/// Build the candidate hostname for `base_domain` using `clock`
pub fn generate_hostname_with(clock: &dyn Clock, base_domain: &str) -> String {
    generate_hostname(base_domain, clock.now())
}
