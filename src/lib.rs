#![forbid(unsafe_code)]

//! # qrtint
//!
//! Styled QR code generation: encode text into a QR Code Model 2 symbol,
//! rasterize it with custom colors, round the image corners, and export
//! the result as PNG.
//!
//! The pipeline has two pure stages. [`encode`] turns text plus sizing
//! parameters into a [`ModuleGrid`], the square dark/light matrix with the
//! quiet zone already applied. [`render`] then maps that grid onto an RGBA
//! pixel buffer, carving the corners through the alpha channel. Nothing is
//! cached between calls; equal inputs always produce identical images.
//!
//! ## Features
//!
//! - Symbol versions 1 to 40 with automatic numeric, alphanumeric, or byte
//!   mode selection and Reed-Solomon error correction.
//! - Mask chosen by the standard penalty score; capacity is checked against
//!   the requested version instead of silently growing the symbol.
//! - Custom fill and background colors, plus rounded-corner transparency.
//! - PNG export and a terminal preview.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qrtint = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! ```rust
//! use qrtint::{encode, render, EncodingRequest, RenderConfig};
//!
//! # fn main() -> qrtint::Result<()> {
//! let request = EncodingRequest {
//!     text: "https://example.com".into(),
//!     version: 5,
//!     box_size: 5,
//!     border: 7,
//! };
//! let grid = encode(&request)?;
//! let image = render(&grid, &RenderConfig::default());
//! assert_eq!(image.width(), grid.side() * 5);
//! # Ok(())
//! # }
//! ```
//!
//! Saving goes through [`save_png`], which writes PNG regardless of the
//! file extension:
//!
//! ```rust,no_run
//! # fn main() -> qrtint::Result<()> {
//! let request = qrtint::EncodingRequest {
//!     text: "hello".into(),
//!     version: 1,
//!     box_size: 4,
//!     border: 4,
//! };
//! let image = qrtint::generate_image(&request, &qrtint::RenderConfig::default())?;
//! qrtint::save_png(&image, std::path::Path::new("qr.png"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`encode`]: Text to quiet-zone-padded module grid.
//! - [`render`]: Module grid to styled RGBA image, PNG export, preview.
//! - [`error`]: The error type shared by both stages.

pub mod encode;
pub mod error;
pub mod render;
mod symbol;

pub use encode::{encode, EncodingRequest, ModuleGrid};
pub use error::{QrError, Result};
pub use render::{console_preview, parse_hex_color, render, save_png, RasterImage, RenderConfig};

/// Runs the full pipeline in one call: encode, then render.
///
/// Convenient when the caller has no use for the intermediate grid; the
/// result is identical to calling [`encode`] and [`render`] separately.
pub fn generate_image(request: &EncodingRequest, config: &RenderConfig) -> Result<RasterImage> {
    let grid = encode(request)?;
    Ok(render(&grid, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_image_default_styling() {
        let request = EncodingRequest {
            text: "https://example.com".into(),
            version: 5,
            box_size: 5,
            border: 7,
        };
        let image = generate_image(&request, &RenderConfig::default()).unwrap();
        // 4 * 5 + 17 + 2 * 7 = 51 modules at 5 px each
        assert_eq!(image.width(), 255);
        assert_eq!(image.height(), 255);
        let mid = image.width() / 2;
        assert_eq!(image.get_pixel(mid, mid).0[3], 255);
        // the default radius of 20 trims the extreme corners
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_generate_image_rejects_empty_text() {
        let request = EncodingRequest {
            text: "  ".into(),
            version: 5,
            box_size: 5,
            border: 7,
        };
        let err = generate_image(&request, &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, QrError::Validation(_)));
    }

    #[test]
    fn test_pipeline_matches_staged_calls() {
        let request = EncodingRequest {
            text: "staged vs combined".into(),
            version: 3,
            box_size: 2,
            border: 4,
        };
        let config = RenderConfig {
            fill_color: [40, 0, 80],
            back_color: [255, 255, 240],
            corner_radius: 9,
        };
        let combined = generate_image(&request, &config).unwrap();
        let staged = render(&encode(&request).unwrap(), &config);
        assert_eq!(combined.as_raw(), staged.as_raw());
    }
}
