//! Registration configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use rf_01_registration::domain::RegistrationConfig;
//! use std::time::Duration;
//!
//! let config = RegistrationConfig::default()
//!     .with_poll_delays(vec![Duration::ZERO, Duration::from_millis(250)]);
//! config.validate()?;
//! ```

use crate::error::ConfigError;
use std::time::Duration;

/// Lowest password length the provider accepts.
pub const PROVIDER_MIN_PASSWORD_LEN: usize = 6;

/// Longest single wait allowed in the profile poll.
pub const MAX_POLL_DELAY: Duration = Duration::from_secs(10);

/// Registration workflow configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationConfig {
    /// Wait before each profile check. The first entry is usually zero
    /// (immediate check).
    pub profile_poll_delays: Vec<Duration>,
    /// Minimum password length checked before calling the provider.
    pub min_password_len: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            profile_poll_delays: vec![
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_millis(1000),
            ],
            min_password_len: PROVIDER_MIN_PASSWORD_LEN,
        }
    }
}

impl RegistrationConfig {
    #[must_use]
    pub fn with_poll_delays(mut self, delays: Vec<Duration>) -> Self {
        self.profile_poll_delays = delays;
        self
    }

    #[must_use]
    pub fn with_min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }

    /// Total time spent waiting for the trigger before falling back.
    #[must_use]
    pub fn total_poll_budget(&self) -> Duration {
        self.profile_poll_delays.iter().sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile_poll_delays.is_empty() {
            return Err(ConfigError::EmptyPollSchedule);
        }

        if let Some(delay) = self
            .profile_poll_delays
            .iter()
            .find(|d| **d > MAX_POLL_DELAY)
        {
            return Err(ConfigError::PollDelayTooLong {
                millis: delay.as_millis(),
                max: MAX_POLL_DELAY.as_millis(),
            });
        }

        if self.min_password_len < PROVIDER_MIN_PASSWORD_LEN {
            return Err(ConfigError::PasswordLengthTooShort {
                min: PROVIDER_MIN_PASSWORD_LEN,
                got: self.min_password_len,
            });
        }

        Ok(())
    }
}
