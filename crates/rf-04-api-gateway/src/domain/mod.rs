//! Gateway domain: configuration and errors.

pub mod config;
pub mod error;

pub use config::{CorsConfig, GatewayConfig, GatewayConfigError, HttpConfig, LimitsConfig};
pub use error::{ErrorBody, GatewayError};
