//! # Runtime Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Every section has sane defaults. `RuntimeConfig::from_env` overrides them
//! from `RH_*` environment variables and validates the result.
//!
//! | Variable                     | Section                           |
//! |------------------------------|-----------------------------------|
//! | `RH_HTTP_HOST`, `RH_HTTP_PORT` | `http`                          |
//! | `RH_CORS_ORIGINS`            | `http.cors` (comma list, `*`)     |
//! | `RH_PLATFORM`                | `platform.kind` (`memory`/`supabase`) |
//! | `RH_SUPABASE_URL`, `RH_SUPABASE_ANON_KEY` | `platform`           |
//! | `RH_SUPABASE_SERVICE_KEY`    | `platform` (profile reads/writes) |
//! | `RH_MEMORY_TRIGGER_DELAY_MS` | `platform.memory` (`off` disables) |
//! | `RH_MEMORY_CONFIRM_EMAIL`    | `platform.memory`                 |
//! | `RH_PUBLIC_ORIGIN`           | `qr.public_origin`                |
//! | `RH_QR_SIZE`                 | `qr.options.size`                 |
//! | `RH_PROFILE_POLL_DELAYS_MS`  | `registration` (comma list)       |
//! | `RH_MIN_PASSWORD_LEN`        | `registration`                    |
//! | `RH_LOG_LEVEL` / `RUST_LOG`  | `telemetry.log_level`             |
//! | `RH_JSON_LOGS`               | `telemetry.json_logs`             |

use rf_01_registration::{ConfigError as RegistrationConfigError, RegistrationConfig};
use rf_02_qr_provisioning::{LinkBuilder, QrError, QrOptions};
use rf_04_api_gateway::{GatewayConfig, GatewayConfigError};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::memory::{MemoryPlatformConfig, ProfileTrigger};

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// HTTP gateway configuration.
    pub http: GatewayConfig,
    /// Identity provider and profile store backend.
    pub platform: PlatformConfig,
    /// Registration workflow configuration.
    pub registration: RegistrationConfig,
    /// Links and QR rendering.
    pub qr: QrConfig,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
}

/// Which backend implements the platform ports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlatformKind {
    /// Everything in process. Data is lost on exit.
    #[default]
    Memory,
    /// Supabase GoTrue + PostgREST over HTTP.
    Supabase,
}

impl FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "supabase" => Ok(Self::Supabase),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Platform configuration.
#[derive(Debug, Clone, Default)]
pub struct PlatformConfig {
    pub kind: PlatformKind,
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub supabase_url: Option<String>,
    /// Public (anon) API key.
    pub supabase_anon_key: Option<String>,
    /// Service-role key. Profile rows sit behind row-level security, so the
    /// server reads and writes them with this role.
    pub supabase_service_key: Option<String>,
    /// In-memory platform behavior.
    pub memory: MemoryPlatformConfig,
}

/// Links and QR rendering configuration.
#[derive(Debug, Clone)]
pub struct QrConfig {
    /// Origin every referral and registration link starts with.
    pub public_origin: String,
    pub options: QrOptions,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            public_origin: "http://localhost:8080".to_string(),
            options: QrOptions::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive.
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(
        "RH_SUPABASE_URL, RH_SUPABASE_ANON_KEY and RH_SUPABASE_SERVICE_KEY are required for the supabase platform"
    )]
    MissingSupabaseCredentials,

    #[error(transparent)]
    Registration(#[from] RegistrationConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayConfigError),

    #[error(transparent)]
    Qr(#[from] QrError),
}

impl RuntimeConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden through `lookup`, then validated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        };

        if let Some((name, v)) = var("RH_HTTP_HOST") {
            config.http.http.host = parse(name, &v)?;
        }
        if let Some((name, v)) = var("RH_HTTP_PORT") {
            config.http.http.port = parse(name, &v)?;
        }
        if let Some((_, v)) = var("RH_CORS_ORIGINS") {
            config.http.cors.allowed_origins = v
                .split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some((name, v)) = var("RH_PLATFORM") {
            config.platform.kind = v.parse().map_err(|reason| ConfigError::InvalidValue {
                var: name,
                value: v.clone(),
                reason,
            })?;
        }
        config.platform.supabase_url = var("RH_SUPABASE_URL").map(|(_, v)| v);
        config.platform.supabase_anon_key = var("RH_SUPABASE_ANON_KEY").map(|(_, v)| v);
        config.platform.supabase_service_key = var("RH_SUPABASE_SERVICE_KEY").map(|(_, v)| v);
        if let Some((name, v)) = var("RH_MEMORY_TRIGGER_DELAY_MS") {
            config.platform.memory.trigger = if v.eq_ignore_ascii_case("off") {
                ProfileTrigger::Disabled
            } else {
                match parse::<u64>(name, &v)? {
                    0 => ProfileTrigger::Immediate,
                    ms => ProfileTrigger::Delayed(Duration::from_millis(ms)),
                }
            };
        }
        if let Some((name, v)) = var("RH_MEMORY_CONFIRM_EMAIL") {
            config.platform.memory.require_email_confirmation = parse_bool(name, &v)?;
        }

        if let Some((_, v)) = var("RH_PUBLIC_ORIGIN") {
            config.qr.public_origin = v;
        }
        if let Some((name, v)) = var("RH_QR_SIZE") {
            config.qr.options.size = parse(name, &v)?;
        }

        if let Some((name, v)) = var("RH_PROFILE_POLL_DELAYS_MS") {
            let delays = v
                .split(',')
                .map(|part| parse::<u64>(name, part.trim()).map(Duration::from_millis))
                .collect::<Result<Vec<_>, _>>()?;
            config.registration.profile_poll_delays = delays;
        }
        if let Some((name, v)) = var("RH_MIN_PASSWORD_LEN") {
            config.registration.min_password_len = parse(name, &v)?;
        }

        if let Some((_, v)) = var("RH_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            config.telemetry.log_level = v;
        }
        if let Some((name, v)) = var("RH_JSON_LOGS") {
            config.telemetry.json_logs = parse_bool(name, &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http.validate()?;
        self.registration.validate()?;
        self.qr.options.validate()?;
        LinkBuilder::new(&self.qr.public_origin)?;

        if self.platform.kind == PlatformKind::Supabase
            && (self.platform.supabase_url.is_none()
                || self.platform.supabase_anon_key.is_none()
                || self.platform.supabase_service_key.is_none())
        {
            return Err(ConfigError::MissingSupabaseCredentials);
        }
        Ok(())
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
