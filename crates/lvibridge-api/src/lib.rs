//! Async client for the LVI / Mill heater cloud API.
//!
//! Every endpoint is a `POST` that answers with the same
//! `{ errorCode, message, statusCode, success, data }` envelope. The
//! client strips the envelope and hands back the typed `data` payload,
//! turning non-200 statuses and non-zero error codes into [`Error`]s.

mod auth;
mod devices;
mod homes;

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{DEFAULT_BASE_URL, LviClient};
pub use error::Error;
pub use models::{ControlOperation, DeviceControl, LviDevice, LviHome, LviRoom, LviTokens};
pub use transport::TransportConfig;
