//! # RF-04 API Gateway
//!
//! HTTP interface over the registration, session, QR and dashboard APIs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ApiGateway (axum)                       │
//! │  TraceLayer → CorsLayer → DefaultBodyLimit → routes          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  CallerSession / SignedIn extractors (bearer → SessionApi)   │
//! ├──────────────┬──────────────┬───────────────┬────────────────┤
//! │ Registration │ Session      │ QrProvisioning│ Dashboard      │
//! │ Api          │ Api          │ Api           │ Api            │
//! └──────────────┴──────────────┴───────────────┴────────────────┘
//! ```
//!
//! ## Error Mapping
//!
//! | Error                          | Status |
//! |--------------------------------|--------|
//! | user input                     | 400    |
//! | missing/invalid bearer, login  | 401    |
//! | unknown profile                | 404    |
//! | already signed in              | 409    |
//! | rate limited                   | 429    |
//! | profile provisioning, QR       | 500    |
//! | identity provider              | 502    |
//! | store unavailable              | 503    |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod router;
pub mod service;

pub use domain::{
    CorsConfig, ErrorBody, GatewayConfig, GatewayConfigError, GatewayError, HttpConfig,
    LimitsConfig,
};
pub use router::{routes, AppState};
pub use service::ApiGateway;
