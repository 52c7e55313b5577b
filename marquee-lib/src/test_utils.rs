use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER};
use hyper_util::client::legacy::connect::{Connected, Connection};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::racer::Dialer;
use crate::resolver::Resolve;
use crate::transport::Transport;
use crate::{ApiRequest, ApiResponse, ErrorKind, Result};

/// A resolver answering every lookup with the same addresses
#[derive(Debug, Default)]
pub(crate) struct StaticResolver {
    ips: Vec<IpAddr>,
    delay: Option<Duration>,
    fail: bool,
    lookups: AtomicUsize,
}

impl StaticResolver {
    pub(crate) fn new(ips: Vec<IpAddr>) -> Self {
        Self {
            ips,
            ..Self::default()
        }
    }

    /// A resolver whose lookups always fail
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Answer only after `delay`
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many lookups reached this resolver
    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolve for StaticResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(io::Error::other(format!("no such host: {host}")));
        }
        Ok(self.ips.clone())
    }
}

/// What a scripted dial does
#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome {
    /// Complete the handshake after the given time
    Connect(Duration),
    /// Fail with the given error after the given time
    Fail(Duration, io::ErrorKind),
    /// Never complete
    Hang,
}

/// Counts the sockets a [`FakeDialer`] opened and closed.
#[derive(Debug, Default)]
pub(crate) struct SocketTracker {
    opened: AtomicUsize,
    closed: AtomicUsize,
    dialed: Mutex<Vec<SocketAddr>>,
}

impl SocketTracker {
    /// Addresses in the order their attempts started
    pub(crate) fn dialed(&self) -> Vec<SocketAddr> {
        self.dialed.lock().unwrap().clone()
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sockets opened and not closed yet
    pub(crate) fn open(&self) -> usize {
        self.opened() - self.closed()
    }
}

/// Holds a tracked socket open until dropped.
#[derive(Debug)]
struct SocketGuard {
    tracker: Arc<SocketTracker>,
}

impl SocketGuard {
    fn open(tracker: &Arc<SocketTracker>, address: SocketAddr) -> Self {
        tracker.opened.fetch_add(1, Ordering::SeqCst);
        tracker.dialed.lock().unwrap().push(address);
        Self {
            tracker: Arc::clone(tracker),
        }
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        self.tracker.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A connected fake socket. Dropping it closes the socket.
///
/// Reads see the end of the stream and writes are discarded.
#[derive(Debug)]
pub(crate) struct FakeSocket {
    address: SocketAddr,
    _guard: SocketGuard,
}

impl FakeSocket {
    pub(crate) const fn address(&self) -> SocketAddr {
        self.address
    }
}

impl AsyncRead for FakeSocket {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for FakeSocket {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Connection for FakeSocket {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

/// A dialer playing back scripted outcomes in virtual time.
///
/// A socket counts as opened once its dial starts and as closed when the
/// pending dial or the resulting [`FakeSocket`] is dropped. Addresses
/// without a script hang.
#[derive(Debug, Default)]
pub(crate) struct FakeDialer {
    scripts: HashMap<SocketAddr, Outcome>,
    tracker: Arc<SocketTracker>,
}

impl FakeDialer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(mut self, address: SocketAddr, outcome: Outcome) -> Self {
        self.scripts.insert(address, outcome);
        self
    }

    pub(crate) fn tracker(&self) -> Arc<SocketTracker> {
        Arc::clone(&self.tracker)
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    type Stream = FakeSocket;

    async fn dial(&self, address: SocketAddr) -> io::Result<FakeSocket> {
        let guard = SocketGuard::open(&self.tracker, address);
        match self.scripts.get(&address).copied().unwrap_or(Outcome::Hang) {
            Outcome::Connect(after) => {
                tokio::time::sleep(after).await;
                Ok(FakeSocket {
                    address,
                    _guard: guard,
                })
            }
            Outcome::Fail(after, kind) => {
                tokio::time::sleep(after).await;
                Err(io::Error::from(kind))
            }
            Outcome::Hang => futures::future::pending().await,
        }
    }
}

/// A transport playing back queued responses, one per send.
///
/// Once the queue is empty, the last response is repeated.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<ApiResponse>>,
    last: Mutex<Option<ApiResponse>>,
    failure: Mutex<Option<ErrorKind>>,
    sends: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: impl IntoIterator<Item = ApiResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            ..Self::default()
        }
    }

    /// A transport whose next send fails with `error`
    pub(crate) fn failing(error: ErrorKind) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    /// Number of requests sent so far
    pub(crate) fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, _request: ApiRequest) -> Result<ApiResponse> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        let next = self.responses.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(response) = next {
            *last = Some(response);
        }
        Ok(last
            .clone()
            .unwrap_or_else(|| response(StatusCode::OK, "")))
    }
}

pub(crate) fn response(status: StatusCode, body: &'static str) -> ApiResponse {
    ApiResponse::new(status, HeaderMap::new(), Bytes::from_static(body.as_bytes()))
}

/// A `429 Too Many Requests`, with a `Retry-After` header if given
pub(crate) fn too_many_requests(retry_after: Option<&'static str>) -> ApiResponse {
    let mut headers = HeaderMap::new();
    if let Some(value) = retry_after {
        headers.insert(RETRY_AFTER, HeaderValue::from_static(value));
    }
    ApiResponse::new(StatusCode::TOO_MANY_REQUESTS, headers, Bytes::new())
}
