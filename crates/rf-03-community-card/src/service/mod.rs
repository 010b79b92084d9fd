//! Service Layer

pub mod dashboard_service;
pub mod mirror;

pub use dashboard_service::DashboardService;
pub use mirror::DashboardMirror;
