//! Adapters from subsystem types to HTTP.

pub mod error_conversions;
