//! The runtime: one platform, its services and the HTTP gateway.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use rf_04_api_gateway::{ApiGateway, AppState};
use shared_bus::InMemoryEventBus;
use thiserror::Error;
use tracing::info;

use crate::adapters::{InMemoryPlatform, SupabaseError, SupabasePlatform};
use crate::container::{ConfigError, PlatformKind, RuntimeConfig, ServiceContainer};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform client setup failed: {0}")]
    Platform(#[from] SupabaseError),
}

/// Services built on the configured backend.
pub enum Backend {
    Memory(ServiceContainer<InMemoryPlatform>),
    Supabase(ServiceContainer<SupabasePlatform>),
}

pub struct ReferralRuntime {
    config: RuntimeConfig,
    backend: Backend,
}

impl ReferralRuntime {
    /// Build the platform named by `config.platform.kind` and wire services on it.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let events = Arc::new(InMemoryEventBus::new());

        let backend = match config.platform.kind {
            PlatformKind::Memory => {
                let platform = Arc::new(InMemoryPlatform::new(
                    config.platform.memory.clone(),
                    events.clone(),
                ));
                info!(trigger = ?config.platform.memory.trigger, "Using in-memory platform");
                Backend::Memory(ServiceContainer::new(platform, events, &config)?)
            }
            PlatformKind::Supabase => {
                let (Some(url), Some(anon_key), Some(service_key)) = (
                    config.platform.supabase_url.as_deref(),
                    config.platform.supabase_anon_key.as_deref(),
                    config.platform.supabase_service_key.as_deref(),
                ) else {
                    return Err(ConfigError::MissingSupabaseCredentials.into());
                };
                let platform = Arc::new(SupabasePlatform::new(
                    url,
                    anon_key,
                    service_key,
                    events.clone(),
                )?);
                info!(url = %url, "Using Supabase platform");
                Backend::Supabase(ServiceContainer::new(platform, events, &config)?)
            }
        };

        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Bus carrying every profile change made through this runtime.
    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        match &self.backend {
            Backend::Memory(c) => &c.events,
            Backend::Supabase(c) => &c.events,
        }
    }

    /// In-memory services, when that backend is active.
    pub fn memory(&self) -> Option<&ServiceContainer<InMemoryPlatform>> {
        match &self.backend {
            Backend::Memory(c) => Some(c),
            Backend::Supabase(_) => None,
        }
    }

    pub fn app_state(&self) -> AppState {
        match &self.backend {
            Backend::Memory(c) => c.app_state(),
            Backend::Supabase(c) => c.app_state(),
        }
    }

    /// HTTP gateway over this runtime's services.
    pub fn gateway(&self) -> Result<ApiGateway> {
        ApiGateway::new(self.config.http.clone(), self.app_state())
            .context("Failed to build API gateway")
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let gateway = self.gateway()?;
        let listener = gateway
            .bind()
            .await
            .with_context(|| format!("Failed to bind {}", self.config.http.http_addr()))?;

        info!("===========================================");
        info!("  Referral Hub Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!(
            addr = %self.config.http.http_addr(),
            origin = %self.config.qr.public_origin,
            "Runtime ready"
        );

        gateway
            .serve(listener, shutdown)
            .await
            .context("HTTP server failed")
    }
}
