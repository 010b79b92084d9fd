//! # RF-02 QR Provisioning
//!
//! Builds referral and registration links and provisions one QR image per
//! profile.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `LinkBuilder`: `<origin>/register[?ref=<code>]` and share texts
//!   - `QrOptions`: error correction, size, quiet zone, colors
//! - **Ports Layer** (`ports/`)
//!   - `QrProvisioningApi`: Driving port
//!   - `QrEncoder`, `QrCodeStore`: Driven ports
//! - **Service Layer** (`service/`)
//!   - `QrProvisioningService`: memoization and in-flight deduplication
//! - **Adapters Layer** (`adapters/`)
//!   - `SvgQrEncoder`: `qrcode` SVG renderer, base64 data URL
//!
//! ## Guarantees
//!
//! - A stored `qr_code_url` is returned unchanged and never regenerated.
//! - At most one generation per profile runs at a time in this process.
//! - Encoding and storage failures never reach the caller; they are logged
//!   and the result is `None`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::SvgQrEncoder;
pub use domain::{whatsapp_share_url, ErrorCorrection, LinkBuilder, QrOptions};
pub use error::QrError;
pub use ports::{QrCodeStore, QrEncoder, QrProvisioningApi};
pub use service::QrProvisioningService;
