//! SVG QR encoder backed by the `qrcode` crate.
//!
//! Output is a `data:image/svg+xml;base64,...` URL that can be stored on the
//! profile and used directly as an image source.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

use crate::domain::{ErrorCorrection, QrOptions};
use crate::error::QrError;
use crate::ports::QrEncoder;

const DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

#[derive(Clone, Copy, Debug, Default)]
pub struct SvgQrEncoder;

impl SvgQrEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Raw SVG document for `text`.
    pub fn render_svg(&self, text: &str, options: &QrOptions) -> Result<String, QrError> {
        let code = QrCode::with_error_correction_level(
            text.as_bytes(),
            ec_level(options.error_correction),
        )
        .map_err(|e| QrError::Encoding(e.to_string()))?;

        Ok(code
            .render::<svg::Color<'_>>()
            .min_dimensions(options.size, options.size)
            .quiet_zone(options.quiet_zone)
            .dark_color(svg::Color(&options.dark_color))
            .light_color(svg::Color(&options.light_color))
            .build())
    }
}

fn ec_level(level: ErrorCorrection) -> EcLevel {
    match level {
        ErrorCorrection::L => EcLevel::L,
        ErrorCorrection::M => EcLevel::M,
        ErrorCorrection::Q => EcLevel::Q,
        ErrorCorrection::H => EcLevel::H,
    }
}

impl QrEncoder for SvgQrEncoder {
    fn encode(&self, text: &str, options: &QrOptions) -> Result<String, QrError> {
        let svg = self.render_svg(text, options)?;
        Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(svg)))
    }
}
