//! ZIP media extraction shared by Word and PowerPoint documents.

use imgx_core::normalize::is_presentation_image;
use imgx_core::{extension_of, unique_filename, DocumentFormat, Error, ImageSink, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Where a document format keeps its media and which files count as images.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveProfile {
    /// Member path prefix, e.g. `word/media/`.
    pub media_prefix: &'static str,
    /// Filter on the normalized extension; `None` keeps every member.
    pub keep: Option<fn(&str) -> bool>,
}

impl ArchiveProfile {
    /// Word documents: everything under `word/media/` is an image.
    pub fn word() -> Self {
        Self {
            media_prefix: "word/media/",
            keep: None,
        }
    }

    /// PowerPoint presentations: only jpg, jpeg, png and jp2 under
    /// `ppt/media/` are kept. Audio, video and vector art are dropped.
    pub fn powerpoint() -> Self {
        Self {
            media_prefix: "ppt/media/",
            keep: Some(is_presentation_image),
        }
    }

    /// Profile for an archive-based document format.
    pub fn for_format(format: DocumentFormat) -> Option<Self> {
        match format {
            DocumentFormat::Docx => Some(Self::word()),
            DocumentFormat::Pptx => Some(Self::powerpoint()),
            DocumentFormat::Pdf => None,
        }
    }
}

/// Extractor for media stored in Office Open XML archives.
pub struct ArchiveExtractor {
    profile: ArchiveProfile,
}

impl ArchiveExtractor {
    /// Create an extractor for the given profile.
    pub fn new(profile: ArchiveProfile) -> Self {
        Self { profile }
    }

    /// Open a document from disk and extract its media into `sink`.
    pub fn extract(&self, path: &Path, sink: &mut ImageSink<'_>) -> Result<()> {
        log::info!("Reading archive {}", path.display());
        let file = File::open(path)?;
        self.extract_from(BufReader::new(file), sink)
    }

    /// Extract media from any seekable ZIP stream.
    ///
    /// Members are processed in archive order. No deduplication happens:
    /// byte-identical members each produce their own file.
    pub fn extract_from<R: Read + Seek>(&self, reader: R, sink: &mut ImageSink<'_>) -> Result<()> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let members = self.media_members(&mut archive)?;
        let total = members.len();
        log::info!("Found {} members under {}", total, self.profile.media_prefix);

        for (position, (index, basename)) in members.into_iter().enumerate() {
            sink.page(position + 1, total);
            sink.ensure_output_dir()?;

            let staged = stage_member(&mut archive, index, &basename, sink.output_dir())?;
            sink.finalize_staged(&staged, &basename, self.profile.keep)?;
        }

        log::info!("Wrote {} images from archive", sink.written());
        Ok(())
    }

    /// Indices and basenames of file members under the media prefix.
    ///
    /// Entries are listed without decompressing them, so members the reader
    /// cannot decode only matter if they are media.
    fn media_members<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<Vec<(usize, String)>> {
        let mut members = Vec::new();

        for index in 0..archive.len() {
            let member = archive
                .by_index_raw(index)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", index, e)))?;

            if member.is_dir() || !member.name().starts_with(self.profile.media_prefix) {
                continue;
            }

            match basename(member.name()) {
                Some(name) => members.push((index, name.to_string())),
                None => log::debug!("Ignoring member without a usable name: {}", member.name()),
            }
        }

        Ok(members)
    }
}

/// Copy one archive member into `dir`, under its basename when that name
/// is free.
fn stage_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    basename: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let mut member = archive
        .by_index(index)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", basename, e)))?;

    let (staged, mut out) = create_staging_file(dir, basename)?;
    if let Err(e) = std::io::copy(&mut member, &mut out) {
        drop(out);
        let _ = std::fs::remove_file(&staged);
        return Err(e.into());
    }

    log::debug!("Staged {} as {}", member.name(), staged.display());
    Ok(staged)
}

/// Create a new file for a staged member. Existing files in `dir` are never
/// opened; a taken basename falls back to a random name with the same
/// extension.
fn create_staging_file(dir: &Path, basename: &str) -> Result<(PathBuf, File)> {
    let preferred = dir.join(basename);
    match create_new(&preferred) {
        Ok(file) => Ok((preferred, file)),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let fallback = dir.join(format!(
                "staging-{}",
                unique_filename(&extension_of(basename))
            ));
            log::debug!(
                "{} already exists, staging as {}",
                preferred.display(),
                fallback.display()
            );
            let file = create_new(&fallback)?;
            Ok((fallback, file))
        }
        Err(e) => Err(e.into()),
    }
}

fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Last path component of a member name, if it is a plain file name.
fn basename(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next()?;
    match base {
        "" | "." | ".." => None,
        base => Some(base),
    }
}
