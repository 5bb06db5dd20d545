//! PDF backend for embedded image extraction.
//!
//! Walks pages in order, finds the image XObjects each page can draw
//! (including inherited resources and images inside forms) and hands them
//! to the shared sink, skipping payloads already written in the same run.

pub mod extractor;
pub mod predictor;
pub mod raster;
pub mod resources;

pub use extractor::PdfExtractor;
