//! Target validation: scheme, host allowlist and public-address checks.

use async_trait::async_trait;
use reqwest::Url;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tracing::debug;

use super::error::ProxyError;

/// Which hosts the proxy may fetch from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPolicy {
    AllowAll,
    /// Lowercased host names, matched exactly.
    Only(Vec<String>),
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl HostPolicy {
    /// Builds the policy from the configured allowlist.
    ///
    /// No list, an empty list or a list containing `*` permit every host.
    pub fn from_allowlist(hosts: Option<&[String]>) -> Self {
        let hosts: Vec<String> = hosts
            .unwrap_or_default()
            .iter()
            .map(|h| normalize_host(h))
            .filter(|h| !h.is_empty())
            .collect();
        if hosts.is_empty() || hosts.iter().any(|h| h == "*") {
            HostPolicy::AllowAll
        } else {
            HostPolicy::Only(hosts)
        }
    }

    pub fn permits(&self, host: &str) -> bool {
        match self {
            HostPolicy::AllowAll => true,
            HostPolicy::Only(hosts) => {
                let host = normalize_host(host);
                hosts.iter().any(|h| *h == host)
            }
        }
    }
}

pub fn is_public_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    !(ip.is_unspecified()
        || a == 0
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        // carrier-grade NAT 100.64.0.0/10
        || (a == 100 && (b & 0xc0) == 64)
        // IETF protocol assignments 192.0.0.0/24
        || (a == 192 && b == 0 && c == 0)
        || ip.is_documentation()
        // benchmarking 198.18.0.0/15
        || (a == 198 && (b & 0xfe) == 18)
        || ip.is_multicast()
        // reserved 240.0.0.0/4, broadcast included
        || a >= 240)
}

pub fn is_public_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_ipv4(v4);
    }
    let segments = ip.segments();
    // NAT64 64:ff9b::/96 embeds an IPv4 destination.
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let [_, _, _, _, _, _, hi, lo] = segments;
        return is_public_ipv4(Ipv4Addr::new(
            (hi >> 8) as u8,
            hi as u8,
            (lo >> 8) as u8,
            lo as u8,
        ));
    }
    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        // unique local fc00::/7
        || (segments[0] & 0xfe00) == 0xfc00
        // link local fe80::/10
        || (segments[0] & 0xffc0) == 0xfe80
        // deprecated site local fec0::/10
        || (segments[0] & 0xffc0) == 0xfec0
        // documentation 2001:db8::/32
        || (segments[0] == 0x2001 && segments[1] == 0x0db8))
}

pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_ipv4(v4),
        IpAddr::V6(v6) => is_public_ipv6(v6),
    }
}

/// Name resolution used to vet a target before it is fetched.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>>;
}

/// [`HostResolver`] backed by the system resolver.
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

/// A validated fetch target with the addresses it was vetted against.
#[derive(Debug, Clone)]
pub struct VettedTarget {
    pub url: Url,
    /// Set for name-based hosts, the connection must go to one of these.
    pub pinned: Option<(String, Vec<SocketAddr>)>,
}

fn check_address(host: &str, ip: IpAddr) -> Result<(), ProxyError> {
    if is_public_ip(ip) {
        Ok(())
    } else {
        Err(ProxyError::BlockedAddress {
            host: host.to_string(),
            address: ip.to_string(),
        })
    }
}

/// Runs every validation step on `url` without fetching anything.
pub async fn validate_target(
    url: &Url,
    policy: &HostPolicy,
    resolver: &dyn HostResolver,
) -> Result<VettedTarget, ProxyError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::InvalidInput(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ProxyError::InvalidInput("url has no host".to_string()))?;

    if !policy.permits(host) {
        return Err(ProxyError::HostNotAllowed(host.to_string()));
    }

    // IPv6 literals keep their brackets in host_str.
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        check_address(host, ip)?;
        return Ok(VettedTarget {
            url: url.clone(),
            pinned: None,
        });
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addresses = resolver
        .resolve(host, port)
        .await
        .map_err(|e| ProxyError::Upstream(format!("could not resolve {}: {}", host, e)))?;
    if addresses.is_empty() {
        return Err(ProxyError::Upstream(format!("{} has no addresses", host)));
    }
    for ip in &addresses {
        check_address(host, *ip)?;
    }
    debug!("Validated {} -> {:?}", host, addresses);

    Ok(VettedTarget {
        url: url.clone(),
        pinned: Some((
            host.to_string(),
            addresses
                .into_iter()
                .map(|ip| SocketAddr::new(ip, port))
                .collect(),
        )),
    })
}
