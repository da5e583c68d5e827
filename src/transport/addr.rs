//! Remote relay address with a resolution cache
//!
//! The relay is dialed once per session. Every address a name resolves to
//! is a dial candidate; once one of them connects, only that one is kept
//! for later sessions until a dial fails again.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Address that may have cached resolved addresses
#[derive(Debug, Clone)]
pub struct AddrMaybeCached {
    /// The original `host:port` string
    addr: String,
    /// Cached dial candidates, shared by all clones
    cached: Arc<RwLock<Option<Vec<SocketAddr>>>>,
}

impl AddrMaybeCached {
    /// Create a new address without cached resolution
    pub fn new(addr: &str) -> Self {
        AddrMaybeCached {
            addr: addr.to_string(),
            cached: Arc::new(RwLock::new(addr.parse().ok().map(|a| vec![a]))),
        }
    }

    /// Get the original address string
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Get the cached candidates if available
    pub async fn get_cached(&self) -> Option<Vec<SocketAddr>> {
        self.cached.read().await.clone()
    }

    /// Keep only `working` as the dial candidate
    pub async fn remember(&self, working: SocketAddr) {
        if !self.is_literal() {
            *self.cached.write().await = Some(vec![working]);
        }
    }

    /// Forget the cached candidates
    ///
    /// Literal IP addresses are never forgotten.
    pub async fn clear_cache(&self) {
        if !self.is_literal() {
            *self.cached.write().await = None;
        }
    }

    /// Resolve the address to its dial candidates, using the cache if
    /// available
    pub async fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        if let Some(cached) = self.get_cached().await {
            return Ok(cached);
        }

        let resolved: Vec<SocketAddr> = tokio::net::lookup_host(self.addr.as_str())
            .await?
            .collect();
        if resolved.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {}", self.addr),
            ));
        }

        *self.cached.write().await = Some(resolved.clone());
        tracing::debug!("Resolved {} to {:?}", self.addr, resolved);

        Ok(resolved)
    }

    fn is_literal(&self) -> bool {
        self.addr.parse::<SocketAddr>().is_ok()
    }
}

impl From<SocketAddr> for AddrMaybeCached {
    fn from(addr: SocketAddr) -> Self {
        AddrMaybeCached {
            addr: addr.to_string(),
            cached: Arc::new(RwLock::new(Some(vec![addr]))),
        }
    }
}

impl From<&str> for AddrMaybeCached {
    fn from(addr: &str) -> Self {
        AddrMaybeCached::new(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn test_literal_ip_is_cached_up_front() {
        let addr = AddrMaybeCached::new("127.0.0.1:8388");
        let literal = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8388);
        assert_eq!(addr.addr(), "127.0.0.1:8388");
        assert_eq!(addr.get_cached().await, Some(vec![literal]));

        addr.clear_cache().await;
        assert_eq!(addr.get_cached().await, Some(vec![literal]));

        addr.remember(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 1)).await;
        assert_eq!(addr.get_cached().await, Some(vec![literal]));
    }

    #[tokio::test]
    async fn test_hostname_resolves_and_caches() {
        let addr = AddrMaybeCached::new("localhost:8388");
        assert!(addr.get_cached().await.is_none());

        let resolved = addr.resolve().await.unwrap();
        assert!(!resolved.is_empty());
        assert!(resolved.iter().all(|a| a.ip().is_loopback() && a.port() == 8388));
        assert_eq!(addr.get_cached().await, Some(resolved));

        addr.clear_cache().await;
        assert!(addr.get_cached().await.is_none());
    }

    #[tokio::test]
    async fn test_remember_narrows_candidates() {
        let addr = AddrMaybeCached::new("localhost:8388");
        addr.resolve().await.unwrap();

        let working = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8388);
        addr.remember(working).await;
        assert_eq!(addr.resolve().await.unwrap(), vec![working]);
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let addr = AddrMaybeCached::new("localhost:1");
        let clone = addr.clone();
        addr.resolve().await.unwrap();
        assert!(clone.get_cached().await.is_some());
    }

    #[tokio::test]
    async fn test_from_socket_addr() {
        let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 443);
        let addr: AddrMaybeCached = socket_addr.into();

        assert_eq!(addr.addr(), "10.0.0.1:443");
        assert_eq!(addr.resolve().await.unwrap(), vec![socket_addr]);
    }

    #[tokio::test]
    async fn test_unresolvable_name_fails() {
        let addr = AddrMaybeCached::new("no-such-host.invalid:80");
        assert!(addr.resolve().await.is_err());
    }
}
