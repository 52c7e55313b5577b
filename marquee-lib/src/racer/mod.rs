//! Happy Eyeballs connection establishment.
//!
//! [`HappyEyeballs`] resolves an [`Endpoint`], orders its addresses with
//! [`interleave`] and races staggered connection attempts against each other
//! as described in [RFC 8305](https://www.rfc-editor.org/rfc/rfc8305).
//! The first attempt to finish its handshake wins; every other attempt is
//! dropped, which cancels pending connects and closes connected sockets,
//! before the race returns.
//!
//! # Implementation Details
//!
//! All attempts are futures inside one [`FuturesUnordered`] that is polled
//! only by the race itself. Completions therefore arrive one at a time on a
//! single stream and the first successful item is the only winner there can
//! be. No flag shared between attempts is needed.

mod connector;

pub use connector::{HappyEyeballsConnector, HttpStream};

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::interleave::interleave;
use crate::resolver::{Resolve, SystemResolver, resolve};
use crate::{AttemptError, Endpoint, ErrorKind, ResolvedAddress, Result};

/// Delay between starting two connection attempts, as recommended by
/// RFC 8305 section 5.
pub const STAGGER_DELAY: Duration = Duration::from_millis(250);

/// Opens a single connection to a socket address.
///
/// The returned stream owns the socket: dropping it closes the socket, and
/// dropping the `dial` future before it resolves abandons the connect.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// The connected stream
    type Stream: Send + 'static;

    /// Connect to `address`
    async fn dial(&self, address: SocketAddr) -> io::Result<Self::Stream>;
}

/// Plain TCP connects with `TCP_NODELAY` set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, address: SocketAddr) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// What the race loop woke up for
enum Step<S> {
    Cancelled,
    Finished(SocketAddr, io::Result<S>),
    Stagger,
}

/// Races connection attempts to all addresses of an endpoint.
#[derive(Debug)]
pub struct HappyEyeballs<R = SystemResolver, D = TcpDialer> {
    resolver: Arc<R>,
    dialer: Arc<D>,
    stagger_delay: Duration,
}

impl<R, D> Clone for HappyEyeballs<R, D> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            dialer: Arc::clone(&self.dialer),
            stagger_delay: self.stagger_delay,
        }
    }
}

impl Default for HappyEyeballs {
    fn default() -> Self {
        Self::new(SystemResolver, TcpDialer)
    }
}

impl<R: Resolve, D: Dialer> HappyEyeballs<R, D> {
    /// Create a racer using the given resolver and dialer and the default
    /// [`STAGGER_DELAY`].
    #[must_use]
    pub fn new(resolver: R, dialer: D) -> Self {
        Self {
            resolver: Arc::new(resolver),
            dialer: Arc::new(dialer),
            stagger_delay: STAGGER_DELAY,
        }
    }

    /// Use a different delay between starting attempts
    #[must_use]
    pub const fn with_stagger_delay(mut self, stagger_delay: Duration) -> Self {
        self.stagger_delay = stagger_delay;
        self
    }

    /// The delay between starting two attempts
    #[must_use]
    pub const fn stagger_delay(&self) -> Duration {
        self.stagger_delay
    }

    /// Resolve `endpoint` and return the first stream that connects.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::HostNotFound`] if the host has no address.
    /// - [`ErrorKind::AllConnectionsFailed`] if no address accepted a
    ///   connection.
    /// - [`ErrorKind::RaceCancelled`] if `cancel` fired before a winner
    ///   emerged.
    pub async fn connect(
        &self,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<D::Stream> {
        let addresses = resolve(&*self.resolver, endpoint.host(), cancel).await?;
        let addresses = interleave(addresses);
        log::debug!(
            "Connecting to {endpoint} via [{}]",
            addresses
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.race(&addresses, endpoint.port(), cancel).await
    }

    /// Race connection attempts to `addresses`, in the given order, on `port`.
    ///
    /// Attempts are started one [`stagger delay`](Self::stagger_delay) apart,
    /// or right away once every started attempt has failed. Whichever attempt
    /// connects first wins, regardless of its position in `addresses`.
    ///
    /// When this returns, the winner is the only socket left open. Dropping
    /// the returned future closes every socket it opened.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AllConnectionsFailed`] with one entry per
    /// attempted address if none connected (an empty list for empty
    /// `addresses`) and [`ErrorKind::RaceCancelled`] on cancellation.
    pub async fn race(
        &self,
        addresses: &[ResolvedAddress],
        port: u16,
        cancel: &CancellationToken,
    ) -> Result<D::Stream> {
        let mut next = 0;
        let mut in_flight = FuturesUnordered::new();
        let mut failures = Vec::new();
        // When the next attempt is due, counted from the last one started
        let mut next_start = Instant::now();

        loop {
            if in_flight.is_empty() {
                let Some(address) = addresses.get(next) else {
                    break;
                };
                in_flight.push(self.attempt(address.with_port(port)));
                next += 1;
                next_start = Instant::now() + self.stagger_delay;
            }
            let untried = next < addresses.len();

            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => Step::Cancelled,
                Some((address, outcome)) = in_flight.next() => Step::Finished(address, outcome),
                () = tokio::time::sleep_until(next_start), if untried => Step::Stagger,
            };

            match step {
                Step::Cancelled => {
                    log::debug!(
                        "Connection race cancelled, dropping {} pending attempt(s)",
                        in_flight.len()
                    );
                    drop(in_flight);
                    return Err(ErrorKind::RaceCancelled);
                }
                Step::Finished(address, Ok(stream)) => {
                    log::debug!(
                        "Connected to {address}, cancelling {} other attempt(s)",
                        in_flight.len()
                    );
                    drop(in_flight);
                    return Ok(stream);
                }
                Step::Finished(address, Err(source)) => {
                    log::debug!("Connection attempt to {address} failed: {source}");
                    failures.push(AttemptError { address, source });
                }
                Step::Stagger => {
                    in_flight.push(self.attempt(addresses[next].with_port(port)));
                    next += 1;
                    next_start = Instant::now() + self.stagger_delay;
                }
            }
        }

        Err(ErrorKind::AllConnectionsFailed(failures))
    }

    fn attempt(&self, address: SocketAddr) -> BoxFuture<'_, (SocketAddr, io::Result<D::Stream>)> {
        log::debug!("Starting connection attempt to {address}");
        let dialer = &*self.dialer;
        async move { (address, dialer.dial(address).await) }.boxed()
    }
}
