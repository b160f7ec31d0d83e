//! Advisory DNS pointing check
//!
//! Before requesting a certificate we check whether the candidate hostname
//! already resolves to the same place as the managed fallback hostname. The
//! result is purely informational: the customer's CNAME may legitimately be
//! created after the custom hostname, so a negative result never stops the run.
//!
//! The comparison takes the lowest address of each (sorted) address set. This
//! is a heuristic: it assumes both names land on the same edge address pool.

use crate::traits::HostResolver;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Compares the address sets of two hostnames
pub struct DnsPointingChecker {
    resolver: Arc<dyn HostResolver>,
}

impl DnsPointingChecker {
    /// Create a checker using `resolver`
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self { resolver }
    }

    /// Whether `candidate` resolves to the same leading address as `expected_target`
    ///
    /// Resolution failures of either name are logged and reported as `false`.
    pub async fn check(&self, candidate: &str, expected_target: &str) -> bool {
        let Some(candidate_addr) = self.first_address(candidate).await else {
            return false;
        };
        let Some(target_addr) = self.first_address(expected_target).await else {
            return false;
        };

        debug!(
            "Pointing check: {} -> {}, {} -> {}",
            candidate, candidate_addr, expected_target, target_addr
        );
        candidate_addr == target_addr
    }

    async fn first_address(&self, host: &str) -> Option<IpAddr> {
        match self.resolver.resolve(host).await {
            Ok(mut addrs) => {
                addrs.sort();
                let first = addrs.first().copied();
                if first.is_none() {
                    warn!("{} resolved to an empty address set", host);
                }
                first
            }
            Err(e) => {
                warn!("Unable to resolve {}: {}", host, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, Vec<IpAddr>>);

    #[async_trait]
    impl HostResolver for MapResolver {
        async fn resolve(&self, host: &str) -> crate::Result<Vec<IpAddr>> {
            self.0
                .get(host)
                .cloned()
                .ok_or_else(|| crate::Error::not_found(format!("unknown host {}", host)))
        }
    }

    fn checker(entries: &[(&'static str, Vec<IpAddr>)]) -> DnsPointingChecker {
        DnsPointingChecker::new(Arc::new(MapResolver(entries.iter().cloned().collect())))
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_matching_addresses() {
        let c = checker(&[
            ("ex1.customer.com", vec![ip("104.16.1.1"), ip("104.16.2.2")]),
            ("fallback.saas.com", vec![ip("104.16.2.2"), ip("104.16.1.1")]),
        ]);
        assert!(c.check("ex1.customer.com", "fallback.saas.com").await);
    }

    #[tokio::test]
    async fn test_resolves_target_not_candidate_twice() {
        let c = checker(&[
            ("ex1.customer.com", vec![ip("203.0.113.10")]),
            ("fallback.saas.com", vec![ip("104.16.1.1")]),
        ]);
        assert!(!c.check("ex1.customer.com", "fallback.saas.com").await);
    }

    #[tokio::test]
    async fn test_unresolvable_candidate_is_negative() {
        let c = checker(&[("fallback.saas.com", vec![ip("104.16.1.1")])]);
        assert!(!c.check("ex1.customer.com", "fallback.saas.com").await);
    }

    #[tokio::test]
    async fn test_unresolvable_target_is_negative() {
        let c = checker(&[("ex1.customer.com", vec![ip("104.16.1.1")])]);
        assert!(!c.check("ex1.customer.com", "fallback.saas.com").await);
    }

    #[tokio::test]
    async fn test_empty_address_set_is_negative() {
        let c = checker(&[
            ("ex1.customer.com", vec![]),
            ("fallback.saas.com", vec![ip("104.16.1.1")]),
        ]);
        assert!(!c.check("ex1.customer.com", "fallback.saas.com").await);
    }
}
