//! Conversions from subsystem errors into `GatewayError`.

use rf_01_registration::{ReferralLookupUnavailable, RegistrationError, SessionError};
use rf_02_qr_provisioning::QrError;
use rf_03_community_card::DashboardError;
use shared_types::StoreError;

use crate::domain::error::GatewayError;

impl From<RegistrationError> for GatewayError {
    fn from(e: RegistrationError) -> Self {
        let message = e.to_string();
        match e {
            RegistrationError::UserInput(_) => Self::InvalidInput(message),
            RegistrationError::AlreadySignedIn => Self::AlreadySignedIn(message),
            RegistrationError::RateLimited => Self::RateLimited(message),
            RegistrationError::IdentityCreation(_) | RegistrationError::MissingUserId => {
                Self::Upstream(message)
            }
            RegistrationError::ProfileProvisioning { .. } => Self::Internal(message),
        }
    }
}

impl From<SessionError> for GatewayError {
    fn from(e: SessionError) -> Self {
        let message = e.to_string();
        match e {
            SessionError::UserInput(_) => Self::InvalidInput(message),
            SessionError::InvalidCredentials | SessionError::EmailNotConfirmed => {
                Self::Unauthorized(message)
            }
            SessionError::RateLimited => Self::RateLimited(message),
            SessionError::SessionNotEstablished | SessionError::Provider(_) => {
                Self::Upstream(message)
            }
        }
    }
}

impl From<ReferralLookupUnavailable> for GatewayError {
    fn from(e: ReferralLookupUnavailable) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<DashboardError> for GatewayError {
    fn from(e: DashboardError) -> Self {
        let message = e.to_string();
        match e {
            DashboardError::ProfileNotFound(_) => Self::NotFound(message),
            DashboardError::Store(StoreError::Unavailable(_)) => Self::Unavailable(message),
            DashboardError::Store(_) => Self::Internal(message),
        }
    }
}

impl From<QrError> for GatewayError {
    fn from(e: QrError) -> Self {
        Self::Internal(e.to_string())
    }
}
