//! # Service Container
//!
//! Configuration plus the wiring of subsystem services onto a platform.

pub mod config;
pub mod services;

pub use config::{
    ConfigError, PlatformConfig, PlatformKind, QrConfig, RuntimeConfig, TelemetryConfig,
};
pub use services::{
    ConcreteDashboardService, ConcreteQrService, Platform, ServiceContainer,
};
