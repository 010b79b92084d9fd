//! Error types for the dashboard read model

use shared_types::{StoreError, UserId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("Profile not found: {0}")]
    ProfileNotFound(UserId),

    #[error("Failed to load profile data: {0}")]
    Store(#[from] StoreError),
}
