//! The encoding stage: validated requests in, bordered module grids out.

use crate::error::{QrError, Result};
use crate::symbol::{EcLevel, Symbol, Version};

/// Error correction level applied to every symbol: a fixed Medium
/// (about 15% recovery), not exposed as a user option.
const EC_LEVEL: EcLevel = EcLevel::Medium;

/// Parameters for one QR generation action.
///
/// The request is taken by reference and never mutated; repeated calls with
/// equal requests produce identical grids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingRequest {
    /// Text to encode. Must contain at least one non-whitespace character;
    /// leading and trailing whitespace is still encoded, only the emptiness
    /// check ignores it.
    pub text: String,
    /// Symbol version in `1..=40`, fixing grid size and capacity. Text that
    /// does not fit is an error; the version is never raised automatically.
    pub version: u32,
    /// Edge length of one module in pixels, at least 1.
    pub box_size: u32,
    /// Quiet-zone width in modules, added on all four sides. Zero is
    /// allowed, though scanners want the standard four.
    pub border: u32,
}

impl EncodingRequest {
    fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(QrError::Validation(
                "text is empty or only whitespace".into(),
            ));
        }
        if self.box_size == 0 {
            return Err(QrError::Validation(
                "box size must be at least 1 pixel per module".into(),
            ));
        }
        Ok(())
    }
}

/// Square grid of dark and light modules with the quiet zone applied.
///
/// Produced by [`encode`] and immutable afterwards. The grid carries the
/// pixel scale of the request that made it, so the rendering stage needs no
/// second look at the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGrid {
    side: u32,
    box_size: u32,
    modules: Vec<bool>,
}

impl ModuleGrid {
    fn from_symbol(symbol: &Symbol, border: u32, box_size: u32) -> ModuleGrid {
        let side = symbol.side() + 2 * border;
        let mut modules = vec![false; side as usize * side as usize];
        for y in 0..symbol.side() {
            for x in 0..symbol.side() {
                if symbol.module(x, y) {
                    let i = (y + border) as usize * side as usize + (x + border) as usize;
                    modules[i] = true;
                }
            }
        }
        ModuleGrid {
            side,
            box_size,
            modules,
        }
    }

    /// Edge length in modules, quiet zone included.
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Pixel scale the grid was requested at.
    pub fn box_size(&self) -> u32 {
        self.box_size
    }

    /// Color of the module at `(x, y)`; `true` is dark.
    ///
    /// # Panics
    ///
    /// Panics when the coordinates fall outside the grid.
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        assert!(x < self.side && y < self.side, "module out of bounds");
        self.modules[y as usize * self.side as usize + x as usize]
    }
}

/// Encodes `request.text` into a quiet-zone-padded module grid.
///
/// The grid side is `4 * version + 17 + 2 * border` modules. Inputs of only
/// digits use numeric mode, the 45-character uppercase set alphanumeric
/// mode, and everything else byte mode.
///
/// # Examples
///
/// ```rust
/// use qrtint::{encode, EncodingRequest};
///
/// let grid = encode(&EncodingRequest {
///     text: "HELLO".into(),
///     version: 1,
///     box_size: 4,
///     border: 4,
/// })
/// .unwrap();
/// assert_eq!(grid.side(), 29);
/// ```
pub fn encode(request: &EncodingRequest) -> Result<ModuleGrid> {
    request.validate()?;
    let version = Version::from_number(request.version)?;

    // the rendering stage addresses pixels with u32 coordinates, so the
    // scaled image must stay within that space
    let side = u64::from(version.side()) + 2 * u64::from(request.border);
    if side * u64::from(request.box_size) > u64::from(u32::MAX) {
        return Err(QrError::Validation(format!(
            "{side} modules at {} pixels each exceed the maximum image size",
            request.box_size
        )));
    }

    let symbol = Symbol::build(&request.text, version, EC_LEVEL)?;
    log::debug!(
        "encoded {} bytes as version {} symbol with mask {}",
        request.text.len(),
        symbol.version().number(),
        symbol.mask()
    );
    Ok(ModuleGrid::from_symbol(
        &symbol,
        request.border,
        request.box_size,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, version: u32, box_size: u32, border: u32) -> EncodingRequest {
        EncodingRequest {
            text: text.into(),
            version,
            box_size,
            border,
        }
    }

    #[test]
    fn test_grid_side_formula() {
        let grid = encode(&request("https://example.com", 5, 5, 7)).unwrap();
        assert_eq!(grid.side(), 51);
        assert_eq!(grid.box_size(), 5);

        let grid = encode(&request("HELLO", 1, 1, 0)).unwrap();
        assert_eq!(grid.side(), 21);

        let grid = encode(&request("HELLO", 1, 1, 4)).unwrap();
        assert_eq!(grid.side(), 29);
    }

    #[test]
    fn test_quiet_zone_is_light() {
        let border = 3;
        let grid = encode(&request("QUIET ZONE", 2, 2, border)).unwrap();
        for y in 0..grid.side() {
            for x in 0..grid.side() {
                let in_border = x < border
                    || y < border
                    || x >= grid.side() - border
                    || y >= grid.side() - border;
                if in_border {
                    assert!(!grid.is_dark(x, y), "dark module in quiet zone at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn test_symbol_sits_at_border_offset() {
        let border = 5;
        let grid = encode(&request("OFFSET", 1, 3, border)).unwrap();
        let symbol = crate::symbol::Symbol::build(
            "OFFSET",
            crate::symbol::Version::from_number(1).unwrap(),
            super::EC_LEVEL,
        )
        .unwrap();
        for y in 0..symbol.side() {
            for x in 0..symbol.side() {
                assert_eq!(grid.is_dark(x + border, y + border), symbol.module(x, y));
            }
        }
        // finder corner lands right after the quiet zone
        assert!(grid.is_dark(border, border));
    }

    #[test]
    fn test_empty_text_rejected() {
        for text in ["", "   ", "\n\t  "] {
            let err = encode(&request(text, 5, 5, 7)).unwrap_err();
            assert!(matches!(err, QrError::Validation(_)), "{text:?}: {err:?}");
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_still_encoded() {
        let padded = encode(&request(" data ", 2, 1, 0)).unwrap();
        let bare = encode(&request("data", 2, 1, 0)).unwrap();
        assert_ne!(padded, bare);
    }

    #[test]
    fn test_zero_box_size_rejected() {
        let err = encode(&request("data", 5, 0, 7)).unwrap_err();
        assert!(matches!(err, QrError::Validation(_)));
    }

    #[test]
    fn test_version_out_of_range() {
        for version in [0, 41, 100] {
            let err = encode(&request("data", version, 5, 7)).unwrap_err();
            assert!(matches!(err, QrError::VersionOutOfRange(v) if v == version));
        }
    }

    #[test]
    fn test_capacity_exceeded_reports_version() {
        let text = "x".repeat(200);
        let err = encode(&request(&text, 1, 5, 7)).unwrap_err();
        assert!(matches!(err, QrError::Capacity { version: 1, .. }));
        // the same text fits once the caller asks for a big enough version
        assert!(encode(&request(&text, 10, 5, 7)).is_ok());
    }

    #[test]
    fn test_oversized_image_rejected() {
        let err = encode(&request("data", 1, u32::MAX, 0)).unwrap_err();
        assert!(matches!(err, QrError::Validation(_)));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let req = request("determinism check 123", 6, 4, 2);
        assert_eq!(encode(&req).unwrap(), encode(&req).unwrap());
    }

    #[test]
    #[should_panic(expected = "module out of bounds")]
    fn test_is_dark_out_of_bounds_panics() {
        let grid = encode(&request("HELLO", 1, 1, 0)).unwrap();
        grid.is_dark(21, 0);
    }
}
