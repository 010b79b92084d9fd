//! Ports Layer
//!
//! - Driving Ports (inbound) - `QrProvisioningApi`
//! - Driven Ports (outbound) - `QrEncoder`, `QrCodeStore`

pub mod inbound;
pub mod outbound;

pub use inbound::QrProvisioningApi;
pub use outbound::{QrCodeStore, QrEncoder};
