//! `marquee` is the transport core of a REST API client.
//!
//! It connects with Happy Eyeballs (RFC 8305), racing staggered connection
//! attempts over interleaved IPv6 and IPv4 addresses, and transparently
//! retries requests the server answers with `429 Too Many Requests`,
//! waiting as long as its `Retry-After` header asks.
//!
//! "Hello world" example:
//! ```no_run
//! use marquee_lib::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let response = marquee_lib::get("https://api.themoviedb.org/3/configuration").await?;
//!   println!("{}", response);
//!   Ok(())
//! }
//! ```
//!
//! For more specific use-cases you can build a client yourself,
//! using the `ClientBuilder` which can be used to
//! configure retries, timeouts and default headers:
//!
//! ```no_run
//! use http::{HeaderMap, Method};
//! use marquee_lib::{ClientBuilder, Result};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::builder().max_retry_count(3).build().client()?;
//!   let response = client
//!       .execute(
//!           Method::GET,
//!           "https://api.themoviedb.org/3/movie/550",
//!           HeaderMap::new(),
//!           "",
//!           &CancellationToken::new(),
//!       )
//!       .await?;
//!   assert!(response.is_success());
//!   Ok(())
//! }
//! ```
// #![deny(missing_docs)]

mod client;
mod config;
mod interleave;
mod retry;
mod types;

pub mod executor;
pub mod racer;
pub mod ratelimit;
pub mod resolver;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::{Client, ClientBuilder, DEFAULT_USER_AGENT, get};
pub use config::TransportConfig;
pub use executor::RequestExecutor;
pub use interleave::interleave;
pub use racer::{HappyEyeballs, HappyEyeballsConnector};
pub use types::*;
