use std::net::IpAddr;

use tokio::net::lookup_host;

use crate::error::{NetdashError, Result};

/// Resolve `host` to a single address, preferring IPv4 when both
/// families resolve, matching the classic `gethostbyname` behaviour
/// dashboard clients expect.
pub async fn resolve(host: &str) -> Result<IpAddr> {
    let addrs: Vec<IpAddr> = lookup_host((host, 0u16))
        .await
        .map_err(|_| NetdashError::Unresolvable(host.to_string()))?
        .map(|socket_addr| socket_addr.ip())
        .collect();

    addrs
        .iter()
        .copied()
        .find(IpAddr::is_ipv4)
        .or_else(|| addrs.first().copied())
        .ok_or_else(|| NetdashError::Unresolvable(host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_localhost_to_a_loopback_address() {
        let ip = resolve("localhost").await.unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn unresolvable_host_is_a_typed_error() {
        let err = resolve("does-not-exist.invalid").await.unwrap_err();
        assert!(matches!(err, NetdashError::Unresolvable(_)));
        assert_eq!(
            err.to_string(),
            "Could not resolve hostname: does-not-exist.invalid"
        );
    }
}
