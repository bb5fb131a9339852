//! The rendering stage: module grids to styled RGBA images, plus PNG
//! export and a terminal preview.

use std::path::Path;

use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};

use crate::encode::ModuleGrid;
use crate::error::{QrError, Result};

/// Raster output of [`render`]: an owned RGBA pixel buffer.
pub type RasterImage = RgbaImage;

/// Visual styling for the rasterized symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Color painted on dark modules.
    pub fill_color: [u8; 3],
    /// Color painted on light modules and the quiet zone.
    pub back_color: [u8; 3],
    /// Corner rounding radius in pixels. Zero keeps the image a plain
    /// rectangle; values past half the image side clamp to the largest
    /// inscribable rounding.
    pub corner_radius: u32,
}

impl Default for RenderConfig {
    /// Black on white with a 20 px corner rounding.
    fn default() -> Self {
        RenderConfig {
            fill_color: [0, 0, 0],
            back_color: [255, 255, 255],
            corner_radius: 20,
        }
    }
}

/// Rasterizes the grid, one `box_size`-sided square of pixels per module,
/// then carves the corners down to `corner_radius` via the alpha channel.
///
/// Rendering never fails: every grid and every config produce an image of
/// `side * box_size` pixels on each edge.
pub fn render(grid: &ModuleGrid, config: &RenderConfig) -> RasterImage {
    let scale = grid.box_size();
    let dimension = grid.side() * scale;
    let fill = Rgba([
        config.fill_color[0],
        config.fill_color[1],
        config.fill_color[2],
        255,
    ]);
    let back = Rgba([
        config.back_color[0],
        config.back_color[1],
        config.back_color[2],
        255,
    ]);

    let mut image = RgbaImage::from_pixel(dimension, dimension, back);
    for y in 0..grid.side() {
        for x in 0..grid.side() {
            if !grid.is_dark(x, y) {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    image.put_pixel(x * scale + dx, y * scale + dy, fill);
                }
            }
        }
    }

    let mask = rounded_rect_mask(dimension, dimension, config.corner_radius);
    for (pixel, coverage) in image.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = coverage.0[0];
    }
    log::debug!(
        "rendered {dimension}x{dimension} px image with corner radius {}",
        config.corner_radius
    );
    image
}

/// Binary coverage mask of a rounded rectangle: 255 inside, 0 in the four
/// corner cutouts. No antialiasing; a pixel is dropped only when it lies
/// entirely outside the corner arc.
fn rounded_rect_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let radius = radius.min(width / 2).min(height / 2);
    let limit = u64::from(radius) * u64::from(radius);
    GrayImage::from_fn(width, height, |x, y| {
        let dx = corner_reach(x, width, radius);
        let dy = corner_reach(y, height, radius);
        if dx > 0 && dy > 0 && dx * dx + dy * dy > limit {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Distance from the pixel's outer edge to the nearest arc center along one
/// axis, or 0 outside the corner bands. Measuring the outer edge keeps the
/// extreme corner pixels transparent for every radius down to 1.
fn corner_reach(coord: u32, extent: u32, radius: u32) -> u64 {
    if coord < radius {
        u64::from(radius - coord)
    } else if coord >= extent - radius {
        u64::from(coord - (extent - radius) + 1)
    } else {
        0
    }
}

/// Writes the image to `path`, always in PNG format regardless of the
/// extension. On failure the image stays valid and may be saved elsewhere.
pub fn save_png(image: &RasterImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| QrError::Save {
            path: path.to_path_buf(),
            source,
        })
}

/// Renders the grid as text for a quick look in the terminal, two character
/// cells per module so the symbol stays roughly square.
pub fn console_preview(grid: &ModuleGrid) -> String {
    let side = grid.side() as usize;
    let mut out = String::with_capacity(side * (side + 1) * 2);
    for y in 0..grid.side() {
        for x in 0..grid.side() {
            out.push_str(if grid.is_dark(x, y) { "██" } else { "  " });
        }
        out.push('\n');
    }
    out
}

/// Parses a `#RRGGBB` color (the leading `#` is optional) into an RGB
/// triple, the form used for the `--fill` and `--back` options.
///
/// # Examples
///
/// ```rust
/// assert_eq!(qrtint::parse_hex_color("#FFA500").unwrap(), [255, 165, 0]);
/// ```
pub fn parse_hex_color(input: &str) -> Result<[u8; 3]> {
    let hex = input.strip_prefix('#').unwrap_or(input);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(QrError::Validation(format!(
            "expected a color like #1A2B3C, got {input:?}"
        )));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).expect("hex digits already validated")
    };
    Ok([channel(0), channel(2), channel(4)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, EncodingRequest};

    fn sample_grid(version: u32, box_size: u32, border: u32) -> ModuleGrid {
        encode(&EncodingRequest {
            text: "HELLO WORLD".into(),
            version,
            box_size,
            border,
        })
        .unwrap()
    }

    fn flat_config() -> RenderConfig {
        RenderConfig {
            corner_radius: 0,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn test_render_dimensions() {
        let grid = sample_grid(1, 3, 4);
        let image = render(&grid, &RenderConfig::default());
        assert_eq!(image.width(), 87);
        assert_eq!(image.height(), 87);
    }

    #[test]
    fn test_radius_zero_is_fully_opaque() {
        let grid = sample_grid(1, 2, 1);
        let image = render(&grid, &flat_config());
        assert!(image.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_rounded_corners_are_transparent() {
        let grid = sample_grid(1, 4, 2);
        let image = render(
            &grid,
            &RenderConfig {
                corner_radius: 6,
                ..RenderConfig::default()
            },
        );
        let last = image.width() - 1;
        for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
            assert_eq!(image.get_pixel(x, y).0[3], 0, "corner ({x}, {y})");
        }
        // edge midpoints and the center stay opaque
        let mid = image.width() / 2;
        for (x, y) in [(mid, 0), (0, mid), (last, mid), (mid, last), (mid, mid)] {
            assert_eq!(image.get_pixel(x, y).0[3], 255, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn test_single_pixel_radius_still_clips_corners() {
        let grid = sample_grid(1, 2, 1);
        let image = render(
            &grid,
            &RenderConfig {
                corner_radius: 1,
                ..RenderConfig::default()
            },
        );
        let last = image.width() - 1;
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(last, last).0[3], 0);
        assert_eq!(image.get_pixel(1, 0).0[3], 255);
        assert_eq!(image.get_pixel(0, 1).0[3], 255);
    }

    #[test]
    fn test_oversized_radius_clamps() {
        let grid = sample_grid(1, 1, 0);
        let image = render(
            &grid,
            &RenderConfig {
                corner_radius: 10_000,
                ..RenderConfig::default()
            },
        );
        assert_eq!(image.width(), 21);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        let mid = image.width() / 2;
        assert_eq!(image.get_pixel(mid, mid).0[3], 255);
    }

    #[test]
    fn test_colors_applied_per_module() {
        let border = 2;
        let box_size = 3;
        let grid = sample_grid(1, box_size, border);
        let config = RenderConfig {
            fill_color: [10, 20, 30],
            back_color: [200, 210, 220],
            corner_radius: 0,
        };
        let image = render(&grid, &config);
        // quiet zone pixel
        assert_eq!(image.get_pixel(0, 0).0, [200, 210, 220, 255]);
        // center of the finder corner module, which is always dark
        let c = border * box_size + box_size / 2;
        assert_eq!(image.get_pixel(c, c).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_module_blocks_are_uniform() {
        let box_size = 4;
        let grid = sample_grid(2, box_size, 1);
        let image = render(&grid, &flat_config());
        for y in 0..grid.side() {
            for x in 0..grid.side() {
                let expected = if grid.is_dark(x, y) {
                    [0, 0, 0, 255]
                } else {
                    [255, 255, 255, 255]
                };
                for dy in 0..box_size {
                    for dx in 0..box_size {
                        let pixel = image.get_pixel(x * box_size + dx, y * box_size + dy);
                        assert_eq!(pixel.0, expected, "module ({x}, {y})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_mask_geometry() {
        let mask = rounded_rect_mask(12, 12, 4);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(11, 0).0[0], 0);
        assert_eq!(mask.get_pixel(6, 0).0[0], 255);
        assert_eq!(mask.get_pixel(0, 6).0[0], 255);
        assert_eq!(mask.get_pixel(6, 6).0[0], 255);
        // the diagonal pixel inside the arc survives
        assert_eq!(mask.get_pixel(3, 3).0[0], 255);
    }

    #[test]
    fn test_console_preview_shape() {
        let grid = sample_grid(1, 1, 0);
        let preview = console_preview(&grid);
        assert_eq!(preview.lines().count(), 21);
        assert!(preview.lines().all(|l| l.chars().count() == 42));
        // finder corner is dark, its separator neighbor is light
        assert!(preview.starts_with("██"));
        assert!(preview.contains("  "));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#000000").unwrap(), [0, 0, 0]);
        assert_eq!(parse_hex_color("#FFFFFF").unwrap(), [255, 255, 255]);
        assert_eq!(parse_hex_color("1a2b3c").unwrap(), [26, 43, 60]);
        for bad in ["", "#FFF", "#GGGGGG", "red", "#1122334", "#½½½½½½"] {
            assert!(parse_hex_color(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_save_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.png");
        let grid = sample_grid(1, 2, 2);
        let image = render(
            &grid,
            &RenderConfig {
                fill_color: [0, 64, 128],
                back_color: [250, 240, 230],
                corner_radius: 5,
            },
        );
        save_png(&image, &path).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded.as_raw(), image.as_raw());
    }

    #[test]
    fn test_save_error_reports_path() {
        let grid = sample_grid(1, 1, 1);
        let image = render(&grid, &RenderConfig::default());
        let path = Path::new("/nonexistent-dir-for-qr-tests/out.png");
        let err = save_png(&image, path).unwrap_err();
        match err {
            QrError::Save { path: reported, .. } => {
                assert_eq!(reported, path.to_path_buf());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // the image is untouched and can still be saved somewhere writable
        let dir = tempfile::tempdir().unwrap();
        assert!(save_png(&image, &dir.path().join("retry.png")).is_ok());
    }
}
