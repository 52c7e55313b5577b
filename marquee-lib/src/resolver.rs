//! Host name resolution for the connection racer.
//!
//! Literal addresses never reach the network. Everything else goes through
//! a [`Resolve`] implementation, [`SystemResolver`] by default, which uses
//! the operating system's resolver via [`tokio::net::lookup_host`].

use std::io;
use std::net::IpAddr;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{ErrorKind, ResolvedAddress, Result};

/// A source of IP addresses for a host name.
#[async_trait]
pub trait Resolve: Send + Sync + 'static {
    /// Look up every address of `host`. Order carries no meaning.
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolves host names with the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        // The port is irrelevant here, the racer attaches its own.
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolve `host` into the set of addresses usable to reach it.
///
/// A literal IP address is returned as-is without a lookup.
///
/// # Errors
///
/// Returns [`ErrorKind::HostNotFound`] if the lookup fails or yields no
/// address and [`ErrorKind::RaceCancelled`] if `cancel` fires first.
pub async fn resolve<R: Resolve + ?Sized>(
    resolver: &R,
    host: &str,
    cancel: &CancellationToken,
) -> Result<Vec<ResolvedAddress>> {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ResolvedAddress::from(ip)]);
    }

    let lookup = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ErrorKind::RaceCancelled),
        lookup = resolver.lookup(host) => lookup,
    };

    match lookup {
        Ok(ips) if !ips.is_empty() => {
            log::debug!("Resolved {host} to {} address(es)", ips.len());
            Ok(ips.into_iter().map(ResolvedAddress::from).collect())
        }
        Ok(_) => Err(ErrorKind::HostNotFound {
            host: host.to_string(),
            source: None,
        }),
        Err(e) => Err(ErrorKind::HostNotFound {
            host: host.to_string(),
            source: Some(e),
        }),
    }
}
