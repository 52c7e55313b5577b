use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use http::Uri;
use hyper_util::client::legacy::connect::Connection;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tower::Service;

use super::{Dialer, HappyEyeballs, TcpDialer};
use crate::resolver::{Resolve, SystemResolver};
use crate::{Endpoint, ErrorKind, Result};

/// A dialed stream the HTTP stack can run a connection over
pub trait HttpStream: AsyncRead + AsyncWrite + Connection + Unpin + Send + 'static {}

impl<T> HttpStream for T where T: AsyncRead + AsyncWrite + Connection + Unpin + Send + 'static {}

/// Outbound connector for `hyper_util`'s client that dials through
/// [`HappyEyeballs`] instead of connecting to the first resolved address.
///
/// Every connection races under a child of the connector's token, so
/// cancelling that token aborts all pending races. A race is also abandoned,
/// with all of its sockets closed, when the HTTP stack drops the connect
/// future.
#[derive(Debug)]
pub struct HappyEyeballsConnector<R = SystemResolver, D = TcpDialer> {
    racer: HappyEyeballs<R, D>,
    cancel: CancellationToken,
}

impl<R, D> Clone for HappyEyeballsConnector<R, D> {
    fn clone(&self) -> Self {
        Self {
            racer: self.racer.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<R: Resolve, D: Dialer> HappyEyeballsConnector<R, D> {
    /// Create a connector from a racer and a shutdown token
    #[must_use]
    pub const fn new(racer: HappyEyeballs<R, D>, cancel: CancellationToken) -> Self {
        Self { racer, cancel }
    }
}

impl<R: Resolve, D: Dialer> Service<Uri> for HappyEyeballsConnector<R, D>
where
    D::Stream: HttpStream,
{
    type Response = TokioIo<D::Stream>;
    type Error = ErrorKind;
    type Future = BoxFuture<'static, Result<Self::Response>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let racer = self.racer.clone();
        let cancel = self.cancel.child_token();
        async move {
            let endpoint = Endpoint::try_from(&dst)?;
            let stream = racer.connect(&endpoint, &cancel).await?;
            Ok(TokioIo::new(stream))
        }
        .boxed()
    }
}
