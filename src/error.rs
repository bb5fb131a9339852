//! Error types for QR generation and export.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for generation and export operations.
pub type Result<T> = std::result::Result<T, QrError>;

/// Errors surfaced by encoding, rendering, and saving.
///
/// Every value is terminal for the action that produced it: the caller
/// reports it and waits for the next request, nothing is retried
/// internally.
#[derive(Error, Debug)]
pub enum QrError {
    /// Input rejected before any encoding work started.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The requested symbol version lies outside the QR Code Model 2 range.
    #[error("version {0} is outside the supported range 1 to 40")]
    VersionOutOfRange(u32),

    /// The requested version cannot hold the data at the configured error
    /// correction level. The encoder never upgrades the version on its own;
    /// the caller must ask for a larger one.
    #[error("input of length {data_len} does not fit in version {version} ({capacity_bits} data bits available)")]
    Capacity {
        /// Length of the input, in characters for numeric/alphanumeric
        /// content and in bytes otherwise.
        data_len: usize,
        /// The version that was asked for.
        version: u8,
        /// Data bits that version offers at the configured level.
        capacity_bits: usize,
    },

    /// Writing the rendered image to disk failed. The in-memory image is
    /// still valid and may be saved elsewhere.
    #[error("failed to save QR image to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
