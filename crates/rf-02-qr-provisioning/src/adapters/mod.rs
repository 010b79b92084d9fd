//! Adapters Layer

pub mod svg_encoder;

pub use svg_encoder::SvgQrEncoder;
