//! Default candidate probe.

use std::net::IpAddr;

use async_trait::async_trait;
use rio_core::{
    Candidate,
    traits::{Probe, ProbeError},
};
use tokio::net::TcpStream;

/// Default remote shell port.
pub const SSH_PORT: u16 = 22;

/// Probe that opens (and drops) a TCP connection to the SSH port.
///
/// DNS candidates are looked up first and the IP is what gets reported.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    port: u16,
}

impl TcpProbe {
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(SSH_PORT)
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, candidate: &Candidate) -> Result<String, ProbeError> {
        let address = if candidate.requires_dns_resolution() {
            lookup_address(candidate.address(), self.port).await?.to_string()
        } else {
            candidate.address().to_string()
        };

        TcpStream::connect((address.as_str(), self.port))
            .await
            .map_err(|source| ProbeError::Connect {
                endpoint: format!("{address}:{}", self.port),
                source,
            })?;

        tracing::debug!(candidate = %candidate, %address, "Candidate answered");
        Ok(address)
    }
}

/// Look up a hostname with the system resolver, preferring IPv4.
///
/// # Errors
/// Returns error if the lookup fails or yields no address.
pub async fn lookup_address(host: &str, port: u16) -> Result<IpAddr, ProbeError> {
    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| ProbeError::Lookup {
            host: host.to_string(),
            source,
        })?
        .map(|addr| addr.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ProbeError::NoAddress(host.to_string()))
}
