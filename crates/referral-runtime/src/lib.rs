//! # Referral Runtime Library
//!
//! Configuration, platform adapters and wiring behind the `referral-runtime`
//! binary, exposed for integration tests.
//!
//! ```text
//! RuntimeConfig::from_env ─► ReferralRuntime::new
//!                              ├─ InMemoryPlatform | SupabasePlatform
//!                              ├─ ServiceContainer (rf-01 .. rf-03)
//!                              └─ ApiGateway (rf-04)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod runtime;
pub mod telemetry;

pub use adapters::{InMemoryPlatform, MemoryPlatformConfig, ProfileTrigger, SupabasePlatform};
pub use container::{ConfigError, PlatformKind, RuntimeConfig, ServiceContainer};
pub use runtime::{Backend, ReferralRuntime, RuntimeError};
pub use telemetry::{init_tracing, TelemetryError};
