//! HTTP surface of the primary pipeline, built on `may_minihttp`.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::parse_request;
pub use response::{status_reason, write_response, ContentTypes};
pub use service::{health_endpoint, metrics_endpoint, AppService};
