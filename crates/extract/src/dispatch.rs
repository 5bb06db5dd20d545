//! Format dispatch and output directory resolution.

use imgx_core::{
    clean_filename, DocumentFormat, DocumentOutcome, ExtractionReport, ImageSink, ProgressEvent,
    ProgressObserver, Result, SourceDocument,
};
use imgx_ooxml::{ArchiveExtractor, ArchiveProfile};
use imgx_pdf::PdfExtractor;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Name of the output directory created next to the source document.
pub const DEFAULT_OUTPUT_DIR: &str = "extracted_images";

/// How the output directory is named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputLayout {
    /// One `extracted_images` directory shared by all documents in a folder.
    #[default]
    Shared,
    /// `extracted_images_<stem>` per source document.
    PerDocument,
}

/// Options for a single extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Output directory naming.
    pub layout: OutputLayout,
    /// Explicit output directory; overrides `layout`.
    pub output_dir: Option<PathBuf>,
}

impl ExtractOptions {
    /// Default options: shared `extracted_images` next to the source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output directory layout.
    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Write into a fixed directory instead of one next to the source.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Resolve the output directory for a source document.
    pub fn output_dir_for(&self, source: &Path) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }

        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        match self.layout {
            OutputLayout::Shared => parent.join(DEFAULT_OUTPUT_DIR),
            OutputLayout::PerDocument => {
                let stem = source
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                parent.join(format!("{}_{}", DEFAULT_OUTPUT_DIR, clean_filename(&stem)))
            }
        }
    }
}

/// Extract all images from one document.
///
/// Unsupported extensions and whole-document failures are reported in the
/// returned outcome, never as a panic or error. Files written before a
/// failure are left in place. A `Finished` event is always emitted last.
pub fn extract_document(
    path: &Path,
    options: &ExtractOptions,
    observer: &mut dyn ProgressObserver,
) -> DocumentOutcome {
    let source = SourceDocument::new(path);

    let outcome = match source.format {
        None => {
            let extension = source.extension();
            log::warn!("Unsupported file format: {}", extension);
            DocumentOutcome::Unsupported { extension }
        }
        Some(format) => {
            observer.on_event(ProgressEvent::Started {
                source: source.path.clone(),
                format,
            });
            run_backend(&source.path, format, options, observer)
        }
    };

    observer.on_event(ProgressEvent::Finished(outcome.clone()));
    outcome
}

/// Run the backend for a supported format and wrap its result.
fn run_backend(
    path: &Path,
    format: DocumentFormat,
    options: &ExtractOptions,
    observer: &mut dyn ProgressObserver,
) -> DocumentOutcome {
    warn_on_magic_mismatch(path, format);

    let output_dir = options.output_dir_for(path);
    let mut sink = ImageSink::new(&output_dir, observer);

    let result: Result<()> = match ArchiveProfile::for_format(format) {
        Some(profile) => ArchiveExtractor::new(profile).extract(path, &mut sink),
        None => PdfExtractor::new().extract(path, &mut sink),
    };
    let images = sink.finish();

    match result {
        Ok(()) => {
            let report = ExtractionReport {
                source: path.to_path_buf(),
                format,
                output_dir,
                images,
            };
            log::info!(
                "Extracted {} images from {} ({} skipped)",
                report.written(),
                path.display(),
                report.skipped()
            );
            DocumentOutcome::Completed(report)
        }
        Err(e) => {
            log::error!("Extraction failed for {}: {}", path.display(), e);
            DocumentOutcome::Failed {
                cause: e.to_string(),
            }
        }
    }
}

/// Log when the file header disagrees with the extension. The backend
/// still runs; it reports the real failure if the file is unreadable.
fn warn_on_magic_mismatch(path: &Path, format: DocumentFormat) {
    let mut magic = [0u8; 8];
    let read = File::open(path).and_then(|mut f| f.read(&mut magic));
    if let Ok(n) = read {
        if !format.matches_magic(&magic[..n]) {
            log::warn!(
                "{} does not start with a {} header",
                path.display(),
                format.label()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_output_dir_is_sibling() {
        let options = ExtractOptions::new();
        assert_eq!(
            options.output_dir_for(Path::new("/docs/report.pdf")),
            PathBuf::from("/docs/extracted_images")
        );
        assert_eq!(
            options.output_dir_for(Path::new("report.pdf")),
            PathBuf::from("extracted_images")
        );
    }

    #[test]
    fn test_per_document_output_dir() {
        let options = ExtractOptions::new().with_layout(OutputLayout::PerDocument);
        assert_eq!(
            options.output_dir_for(Path::new("/docs/Q1: plan.pptx")),
            PathBuf::from("/docs/extracted_images_Q1_ plan")
        );
    }

    #[test]
    fn test_explicit_output_dir_wins() {
        let options = ExtractOptions::new()
            .with_layout(OutputLayout::PerDocument)
            .with_output_dir("/tmp/out");
        assert_eq!(
            options.output_dir_for(Path::new("/docs/a.docx")),
            PathBuf::from("/tmp/out")
        );
    }
}
