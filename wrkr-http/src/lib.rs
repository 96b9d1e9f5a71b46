#![forbid(unsafe_code)]

mod client;
mod error;
mod estimate;
mod types;
mod util;

pub use client::HttpClient;
pub use error::{Error, HttpTransportErrorKind, Result};
pub use estimate::estimate_http_request_bytes;
pub use types::{HttpRequest, HttpResponse};
