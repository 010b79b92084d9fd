//! Ports Layer

pub mod inbound;
pub mod outbound;

pub use inbound::DashboardApi;
pub use outbound::ProfileDirectory;
