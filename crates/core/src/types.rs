//! Domain types for documents, image candidates and extraction results.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// The container format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Word document (Office Open XML).
    Docx,
    /// PowerPoint presentation (Office Open XML).
    Pptx,
}

impl DocumentFormat {
    /// Detect format from a file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

    /// Detect format from a path's extension. `None` means unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Check whether leading bytes look like this format's container.
    ///
    /// DOCX and PPTX share the ZIP signature, so this only separates PDF
    /// from Office Open XML.
    pub fn matches_magic(&self, bytes: &[u8]) -> bool {
        match self {
            // PDF header (%PDF)
            Self::Pdf => bytes.starts_with(b"%PDF"),
            // ZIP local file header (PK\x03\x04)
            Self::Docx | Self::Pptx => bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]),
        }
    }

    /// Short lowercase label, also the canonical extension.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A source document: a path plus the format inferred from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDocument {
    /// Path to the document on disk.
    pub path: PathBuf,
    /// Inferred format, `None` when the extension is unsupported.
    pub format: Option<DocumentFormat>,
}

impl SourceDocument {
    /// Classify a path by its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = DocumentFormat::from_path(&path);
        Self { path, format }
    }

    /// Lowercased extension including the leading dot, or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }
}

/// File-level facts about an input, for display before extraction.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    /// File name without directories.
    pub name: String,
    /// Lowercased extension including the dot.
    pub extension: String,
    /// Size on disk in bytes.
    pub size: u64,
}

impl SourceInfo {
    /// Read metadata for a file. Returns `None` if it does not exist.
    pub fn inspect(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Some(Self {
            name,
            extension: SourceDocument::new(path).extension(),
            size: metadata.len(),
        })
    }
}

/// Format a byte count for humans, e.g. `1.50 MB`.
pub fn format_file_size(size: u64) -> String {
    if size == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}

/// Integer percentage of `current` out of `total`; 0 when `total` is 0.
pub fn calculate_progress(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((current.min(total) * 100) / total) as u8
}

/// One embedded image discovered in a document, before normalization.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    /// Image payload bytes.
    pub data: Vec<u8>,
    /// Name declared by the source (resource name or archive basename).
    pub name: String,
    /// Declared extension including the dot, as found in the source.
    pub extension: String,
}

impl ImageCandidate {
    /// Create a candidate, deriving the extension from the declared name.
    pub fn new(data: Vec<u8>, name: impl Into<String>) -> Self {
        let name = name.into();
        let extension = crate::normalize::extension_of(&name);
        Self {
            data,
            name,
            extension,
        }
    }
}

/// Why a single image was not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Bytes identical to an image already written in this run.
    Duplicate,
    /// JPEG2000 payload could not be converted to PNG.
    ConversionFailed(String),
    /// Archive member is not an allowed image type for this format.
    NotAnImage,
    /// Staged archive member was gone before it could be renamed.
    MissingStagedFile,
    /// Stream encoding the extractor cannot turn into an image file.
    UnsupportedEncoding(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate => f.write_str("duplicate content"),
            Self::ConversionFailed(cause) => write!(f, "JP2 conversion failed: {}", cause),
            Self::NotAnImage => f.write_str("not an image"),
            Self::MissingStagedFile => f.write_str("staged file missing"),
            Self::UnsupportedEncoding(filter) => write!(f, "unsupported encoding: {}", filter),
        }
    }
}

/// What happened to one discovered image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImageOutcome {
    /// The image was written to `path`.
    Written {
        /// Final location of the file.
        path: PathBuf,
        /// Normalized extension including the dot.
        extension: String,
    },
    /// The image was skipped; processing continued.
    Skipped {
        /// Declared name of the skipped image.
        name: String,
        /// Why it was skipped.
        reason: SkipReason,
    },
}

impl ImageOutcome {
    /// True if this outcome produced a file.
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Per-image audit trail for one document run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Document that was processed.
    pub source: PathBuf,
    /// Its detected format.
    pub format: DocumentFormat,
    /// Directory the images were written to.
    pub output_dir: PathBuf,
    /// Outcomes in discovery order.
    pub images: Vec<ImageOutcome>,
}

impl ExtractionReport {
    /// Number of files written.
    pub fn written(&self) -> usize {
        self.images.iter().filter(|o| o.is_written()).count()
    }

    /// Number of images skipped.
    pub fn skipped(&self) -> usize {
        self.images.len() - self.written()
    }

    /// Paths of all written files.
    pub fn written_paths(&self) -> Vec<&Path> {
        self.images
            .iter()
            .filter_map(|o| match o {
                ImageOutcome::Written { path, .. } => Some(path.as_path()),
                ImageOutcome::Skipped { .. } => None,
            })
            .collect()
    }
}

/// Terminal result of extracting one document.
#[derive(Debug, Clone, Serialize)]
pub enum DocumentOutcome {
    /// Extraction ran to completion (individual images may be skipped).
    Completed(ExtractionReport),
    /// The extension is not one we handle; nothing was attempted.
    Unsupported {
        /// Lowercased extension including the dot.
        extension: String,
    },
    /// The document could not be processed. Files already written stay.
    Failed {
        /// Human-readable cause.
        cause: String,
    },
}

/// Progress notifications emitted while a document is processed.
#[derive(Debug, Clone, Serialize)]
pub enum ProgressEvent {
    /// Extraction of a supported document began.
    Started {
        /// Document path.
        source: PathBuf,
        /// Detected format.
        format: DocumentFormat,
    },
    /// A PDF page or an archive media member is being processed.
    Page {
        /// 1-based position.
        current: usize,
        /// Total pages or members.
        total: usize,
        /// Percentage completed before this one.
        percent: u8,
    },
    /// One image was written or skipped.
    Image(ImageOutcome),
    /// The document finished.
    Finished(DocumentOutcome),
}

/// Receiver of progress events.
pub trait ProgressObserver {
    /// Handle one event.
    fn on_event(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressObserver for F {
    fn on_event(&mut self, event: ProgressEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension(".PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("DocX"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("pptx"), Some(DocumentFormat::Pptx));
        assert_eq!(DocumentFormat::from_extension("ppt"), None);
        assert_eq!(DocumentFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_source_document_classification() {
        let doc = SourceDocument::new("/tmp/Report.PDF");
        assert_eq!(doc.format, Some(DocumentFormat::Pdf));
        assert_eq!(doc.extension(), ".pdf");

        let doc = SourceDocument::new("/tmp/notes.txt");
        assert_eq!(doc.format, None);
        assert_eq!(doc.extension(), ".txt");

        let doc = SourceDocument::new("/tmp/README");
        assert_eq!(doc.format, None);
        assert_eq!(doc.extension(), "");
    }

    #[test]
    fn test_matches_magic() {
        assert!(DocumentFormat::Pdf.matches_magic(b"%PDF-1.7\n"));
        assert!(!DocumentFormat::Pdf.matches_magic(b"PK\x03\x04"));
        assert!(DocumentFormat::Docx.matches_magic(b"PK\x03\x04rest"));
        assert!(DocumentFormat::Pptx.matches_magic(b"PK\x03\x04rest"));
        assert!(!DocumentFormat::Pptx.matches_magic(b"%PDF"));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_calculate_progress() {
        assert_eq!(calculate_progress(0, 0), 0);
        assert_eq!(calculate_progress(0, 4), 0);
        assert_eq!(calculate_progress(1, 4), 25);
        assert_eq!(calculate_progress(4, 4), 100);
        assert_eq!(calculate_progress(1, 3), 33);
    }

    #[test]
    fn test_report_counts() {
        let report = ExtractionReport {
            source: PathBuf::from("a.pdf"),
            format: DocumentFormat::Pdf,
            output_dir: PathBuf::from("extracted_images"),
            images: vec![
                ImageOutcome::Written {
                    path: PathBuf::from("extracted_images/x.jpg"),
                    extension: ".jpg".to_string(),
                },
                ImageOutcome::Skipped {
                    name: "Im1.jpg".to_string(),
                    reason: SkipReason::Duplicate,
                },
            ],
        };

        assert_eq!(report.written(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(
            report.written_paths(),
            vec![Path::new("extracted_images/x.jpg")]
        );
    }

    #[test]
    fn test_outcome_serializes_for_front_ends() {
        let outcome = DocumentOutcome::Unsupported {
            extension: ".txt".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"Unsupported":{"extension":".txt"}}"#);
    }

    #[test]
    fn test_closure_is_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |e: ProgressEvent| seen.push(e);
            observer.on_event(ProgressEvent::Page {
                current: 1,
                total: 2,
                percent: 0,
            });
        }
        assert_eq!(seen.len(), 1);
    }
}
