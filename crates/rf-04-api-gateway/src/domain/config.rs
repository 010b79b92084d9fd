//! Listener, body limit and CORS settings for the gateway.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub http: HttpConfig,
    pub limits: LimitsConfig,
    pub cors: CorsConfig,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), GatewayConfigError> {
        if self.limits.max_body_bytes == 0 {
            return Err(GatewayConfigError::InvalidLimit(
                "max_body_bytes must be positive".into(),
            ));
        }

        if !self.cors.enabled {
            return Ok(());
        }
        if self.cors.allowed_origins.is_empty() {
            return Err(GatewayConfigError::InvalidCors(
                "no allowed origins while CORS is enabled".into(),
            ));
        }
        if let Some(bad) = self
            .cors
            .allowed_origins
            .iter()
            .find(|o| o.as_str() != "*" && !o.starts_with("http://") && !o.starts_with("https://"))
        {
            return Err(GatewayConfigError::InvalidCors(format!(
                "origin '{bad}' is not an http(s) origin"
            )));
        }
        Ok(())
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// Listener address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: IpAddr,
    /// 0 picks a free port.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Browser access from the front-end origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Preflight cache lifetime in seconds.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            max_age: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayConfigError {
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
    #[error("Invalid CORS configuration: {0}")]
    InvalidCors(String),
}
