#![allow(unreachable_pub)]

mod endpoint;
mod error;
mod request;
mod response;

pub use endpoint::{AddressFamily, Endpoint, ResolvedAddress};
pub use error::{AttemptError, ErrorKind};
pub use request::ApiRequest;
pub use response::ApiResponse;

/// The marquee `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
