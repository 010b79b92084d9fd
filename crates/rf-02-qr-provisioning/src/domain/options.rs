//! QR rendering options

use serde::{Deserialize, Serialize};

use crate::error::QrError;

/// Error correction level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7% recovery
    L,
    /// ~15% recovery
    #[default]
    M,
    /// ~25% recovery
    Q,
    /// ~30% recovery
    H,
}

/// How a QR image is rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrOptions {
    pub error_correction: ErrorCorrection,
    /// Minimum width and height in pixels.
    pub size: u32,
    /// Draw the quiet zone around the symbol.
    pub quiet_zone: bool,
    /// `#RRGGBB`
    pub dark_color: String,
    /// `#RRGGBB`
    pub light_color: String,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::M,
            size: 400,
            quiet_zone: true,
            dark_color: "#000000".to_string(),
            light_color: "#FFFFFF".to_string(),
        }
    }
}

impl QrOptions {
    pub const MIN_SIZE: u32 = 64;
    pub const MAX_SIZE: u32 = 2048;

    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn validate(&self) -> Result<(), QrError> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&self.size) {
            return Err(QrError::InvalidOptions(format!(
                "size {} outside {}..={}",
                self.size,
                Self::MIN_SIZE,
                Self::MAX_SIZE
            )));
        }
        for color in [&self.dark_color, &self.light_color] {
            if !is_hex_color(color) {
                return Err(QrError::InvalidOptions(format!("bad color {color:?}")));
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
