//! Service Layer

pub mod provisioning_service;

pub use provisioning_service::QrProvisioningService;
