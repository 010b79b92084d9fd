//! Domain Layer

pub mod links;
pub mod options;

pub use links::{whatsapp_share_url, LinkBuilder};
pub use options::{ErrorCorrection, QrOptions};
