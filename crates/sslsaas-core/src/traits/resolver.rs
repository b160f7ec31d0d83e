//! Hostname resolution used by the DNS pointing check

use async_trait::async_trait;
use std::net::IpAddr;

/// Resolves a hostname to its address set
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `host` to every address the resolver returns
    ///
    /// An unknown host is an `Err`; callers decide how much that matters.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, crate::Error>;
}

/// Resolver backed by the operating system (`getaddrinfo`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, crate::Error> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}
