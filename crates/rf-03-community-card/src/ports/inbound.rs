//! Inbound Ports (Driving Ports)

use async_trait::async_trait;
use shared_types::UserId;

use crate::domain::{AdminOverview, DashboardView};
use crate::error::DashboardError;

/// Dashboard read API (Driving Port)
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Dashboard of `user`. Ensures the QR image exists; QR failures only
    /// leave `qr_code_url` empty.
    async fn dashboard(&self, user: &UserId) -> Result<DashboardView, DashboardError>;

    /// Statistics over all profiles.
    async fn admin_overview(&self) -> Result<AdminOverview, DashboardError>;
}
