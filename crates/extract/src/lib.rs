//! Extract embedded images from PDF, DOCX and PPTX files.
//!
//! [`extract_document`] routes a path to the matching backend by extension
//! and always returns a [`DocumentOutcome`]; it never fails the caller.
//! [`ExtractionJob`] runs the same work on a background thread and streams
//! progress over a channel.

pub mod dispatch;
pub mod job;

pub use dispatch::{extract_document, ExtractOptions, OutputLayout, DEFAULT_OUTPUT_DIR};
pub use imgx_core::{DocumentFormat, DocumentOutcome, ExtractionReport, ImageOutcome, ProgressEvent};
pub use job::ExtractionJob;
