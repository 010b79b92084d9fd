//! # Service Container
//!
//! Wires every subsystem service onto one platform.
//!
//! ```text
//! platform ──┬── RegistrationService (identity + store)
//!            ├── SessionService      (identity)
//!            ├── QrProvisioningService (SvgQrEncoder + store)
//!            └── DashboardService    (directory + QR service)
//! ```
//!
//! The same platform instance backs all four ports, so a profile written
//! during registration is the one the dashboard reads.

use std::sync::Arc;

use rf_01_registration::{IdentityProvider, ProfileStore, RegistrationService, SessionService};
use rf_02_qr_provisioning::{LinkBuilder, QrCodeStore, QrProvisioningService, SvgQrEncoder};
use rf_03_community_card::{DashboardMirror, DashboardService, ProfileDirectory};
use rf_04_api_gateway::AppState;
use shared_bus::InMemoryEventBus;
use shared_types::UserId;
use tracing::info;

use crate::container::config::{ConfigError, RuntimeConfig};

/// Everything a backend has to provide.
pub trait Platform:
    IdentityProvider + ProfileStore + QrCodeStore + ProfileDirectory + 'static
{
}

impl<T> Platform for T where
    T: IdentityProvider + ProfileStore + QrCodeStore + ProfileDirectory + 'static
{
}

/// QR service over platform `P`.
pub type ConcreteQrService<P> = QrProvisioningService<SvgQrEncoder, P>;

/// Dashboard service over platform `P`.
pub type ConcreteDashboardService<P> = DashboardService<P, ConcreteQrService<P>>;

/// All subsystem services over one platform.
pub struct ServiceContainer<P: Platform> {
    pub platform: Arc<P>,
    pub events: Arc<InMemoryEventBus>,
    pub registration: Arc<RegistrationService<P, P>>,
    pub sessions: Arc<SessionService<P>>,
    pub qr: Arc<ConcreteQrService<P>>,
    pub dashboards: Arc<ConcreteDashboardService<P>>,
}

impl<P: Platform> ServiceContainer<P> {
    /// Build the services. `events` must be the bus the platform publishes on.
    pub fn new(
        platform: Arc<P>,
        events: Arc<InMemoryEventBus>,
        config: &RuntimeConfig,
    ) -> Result<Self, ConfigError> {
        config.registration.validate()?;

        let registration = Arc::new(RegistrationService::with_config(
            platform.clone(),
            platform.clone(),
            config.registration.clone(),
        ));
        let sessions = Arc::new(SessionService::new(platform.clone()));

        let links = LinkBuilder::new(&config.qr.public_origin)?;
        let qr = Arc::new(QrProvisioningService::new(
            Arc::new(SvgQrEncoder::new()),
            platform.clone(),
            links,
            config.qr.options.clone(),
        )?);

        let dashboards = Arc::new(DashboardService::new(platform.clone(), qr.clone()));

        info!(origin = %config.qr.public_origin, "Subsystem services wired");

        Ok(Self {
            platform,
            events,
            registration,
            sessions,
            qr,
            dashboards,
        })
    }

    /// Handler state for the HTTP gateway.
    pub fn app_state(&self) -> AppState {
        AppState {
            registration: self.registration.clone(),
            sessions: self.sessions.clone(),
            qr: self.qr.clone(),
            dashboards: self.dashboards.clone(),
        }
    }

    /// Live dashboard for `user`, not yet started.
    pub fn mirror(&self, user: UserId) -> DashboardMirror<ConcreteDashboardService<P>> {
        DashboardMirror::new(self.dashboards.clone(), user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryPlatform, MemoryPlatformConfig};
    use rf_01_registration::{RegistrationApi, RegistrationForm};
    use rf_03_community_card::DashboardApi;
    use shared_types::SessionState;

    fn container() -> ServiceContainer<InMemoryPlatform> {
        let events = Arc::new(InMemoryEventBus::new());
        let platform = Arc::new(InMemoryPlatform::new(
            MemoryPlatformConfig::default(),
            events.clone(),
        ));
        ServiceContainer::new(platform, events, &RuntimeConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_services_share_platform() {
        let c = container();
        let form = RegistrationForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555".into(),
            password: "secret1".into(),
            referral_code: None,
        };
        let outcome = c
            .registration
            .register(&SessionState::SignedOut, form)
            .await
            .unwrap();

        let view = c.dashboards.dashboard(&outcome.profile.id).await.unwrap();
        assert_eq!(view.profile.id, outcome.profile.id);
        assert!(view
            .qr_code_url
            .as_deref()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_bad_origin_rejected() {
        let events = Arc::new(InMemoryEventBus::new());
        let platform = Arc::new(InMemoryPlatform::new(
            MemoryPlatformConfig::default(),
            events.clone(),
        ));
        let mut config = RuntimeConfig::default();
        config.qr.public_origin = "not a url".into();
        assert!(ServiceContainer::new(platform, events, &config).is_err());
    }
}
