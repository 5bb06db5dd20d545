//! Error types for embedded image extraction.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during image extraction.
///
/// These describe whole-document failures and the causes behind skipped
/// images. A skipped image is never reported to the caller as an `Err`.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to load the PDF object structure.
    #[error("PDF parsing error: {0}")]
    PdfError(String),

    /// ZIP archive error (for DOCX and PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// Image payload could not be decoded.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Image could not be re-encoded.
    #[error("Image encode error: {0}")]
    ImageEncode(String),
}
