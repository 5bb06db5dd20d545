//! PDF image extractor implementation.

use crate::raster::samples_to_png;
use crate::resources::{page_images, ImageXObject};
use flate2::read::ZlibDecoder;
use imgx_core::{Error, ImageCandidate, ImageSink, Result, SeenSet, SkipReason};
use lopdf::Document;
use std::io::Read;
use std::path::Path;

/// Extractor for embedded raster images in PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self
    }

    /// Load a PDF from disk and extract all of its images into `sink`.
    pub fn extract(&self, path: &Path, sink: &mut ImageSink<'_>) -> Result<()> {
        log::info!("Reading PDF {}", path.display());
        let doc = Document::load(path).map_err(|e| Error::PdfError(e.to_string()))?;
        self.extract_document(&doc, sink)
    }

    /// Extract images from an already loaded document.
    ///
    /// Identical payloads are written once per call, however many pages
    /// reference them.
    pub fn extract_document(&self, doc: &Document, sink: &mut ImageSink<'_>) -> Result<()> {
        let pages = doc.get_pages();
        let total = pages.len();
        log::info!("PDF has {} pages", total);

        let mut seen = SeenSet::new();

        for (index, (page_number, page_id)) in pages.into_iter().enumerate() {
            sink.page(index + 1, total);

            let images = page_images(doc, page_id);
            if images.is_empty() {
                log::debug!("No images on page {}", page_number);
            }

            for image in &images {
                let base_name = format!("Im{}_{}", image.id.0, image.id.1);

                if !seen.insert(&image.stream.content) {
                    sink.skip(base_name, SkipReason::Duplicate);
                    continue;
                }

                match to_candidate(doc, image, &base_name) {
                    Ok(candidate) => sink.write(candidate)?,
                    Err(reason) => sink.skip(base_name, reason),
                }
            }
        }

        log::info!("Wrote {} images from PDF", sink.written());
        Ok(())
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn an image XObject into a named payload.
///
/// JPEG and JPEG2000 streams are passed through as-is; raw or
/// Flate-compressed samples are re-encoded as PNG.
fn to_candidate(
    doc: &Document,
    image: &ImageXObject<'_>,
    base_name: &str,
) -> std::result::Result<ImageCandidate, SkipReason> {
    let content = &image.stream.content;
    let filters = image.stream.filters().unwrap_or_default();

    if filters.iter().any(|f| f == "DCTDecode") {
        return Ok(ImageCandidate::new(
            content.clone(),
            format!("{}.jpg", base_name),
        ));
    }

    if filters.iter().any(|f| f == "JPXDecode") {
        return Ok(ImageCandidate::new(
            content.clone(),
            format!("{}.jp2", base_name),
        ));
    }

    let samples = match filters.as_slice() {
        [] => content.clone(),
        [only] if only == "FlateDecode" => inflate(content)
            .map_err(|e| SkipReason::UnsupportedEncoding(format!("FlateDecode: {}", e)))?,
        other => return Err(SkipReason::UnsupportedEncoding(other.join(","))),
    };

    let png = samples_to_png(doc, image.stream, samples)
        .map_err(|e| SkipReason::UnsupportedEncoding(sample_error(e)))?;

    Ok(ImageCandidate::new(png, format!("{}.png", base_name)))
}

/// Skip text for raw samples that could not become a PNG.
fn sample_error(error: Error) -> String {
    match error {
        Error::ImageDecode(cause) | Error::ImageEncode(cause) => format!("samples: {}", cause),
        other => format!("samples: {}", other),
    }
}

/// Decompress a zlib stream.
fn inflate(content: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(content);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
