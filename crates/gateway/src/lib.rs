//! HTTP gateway for the CSV agent.
//!
//! Routes:
//! - `GET /health`
//! - `POST /v1/query`: CSV text plus the four prompt fields in, rendered
//!   view blocks out.
//! - `POST /v1/query/upload`: the same as a `multipart/form-data` upload,
//!   with the CSV file in the `file` part.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use handlers::{QueryBody, QueryReply};
pub use server::{router, serve, AppState, GatewayConfig};
