//! DOCX and PPTX (Office Open XML) backend for embedded image extraction.
//!
//! Both formats are ZIP archives that keep their media under a fixed
//! prefix. Matching members are staged into the output directory and
//! renamed once their extension has been normalized.

pub mod archive;

pub use archive::{ArchiveExtractor, ArchiveProfile};
