//! Core domain types, extension normalization, JPEG2000 conversion and the
//! output sink shared by the PDF and Office Open XML image extractors.

pub mod convert;
pub mod error;
pub mod normalize;
pub mod sink;
pub mod types;

pub use error::{Error, Result};
pub use normalize::{clean_filename, extension_of, normalize_extension, unique_filename};
pub use sink::{ContentDigest, ImageSink, SeenSet};
pub use types::{
    calculate_progress, format_file_size, DocumentFormat, DocumentOutcome, ExtractionReport,
    ImageCandidate, ImageOutcome, ProgressEvent, ProgressObserver, SkipReason, SourceDocument,
    SourceInfo,
};
