//! Output sink: normalizes, converts and persists extracted images.
//!
//! Every image ends up either written under a fresh UUID name or recorded
//! as skipped. Only I/O errors on the output directory escape as `Err`;
//! those end the whole document.

use crate::convert;
use crate::normalize::{extension_of, normalize_extension, unique_filename};
use crate::types::{ImageCandidate, ImageOutcome, ProgressEvent, ProgressObserver, SkipReason};
use crate::{calculate_progress, Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// SHA-256 digest of an image's bytes.
pub type ContentDigest = [u8; 32];

/// Digests of images already written during one extraction run.
#[derive(Debug, Default)]
pub struct SeenSet {
    digests: HashSet<ContentDigest>,
}

impl SeenSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest the bytes and record them. Returns false if already seen.
    pub fn insert(&mut self, data: &[u8]) -> bool {
        self.digests.insert(Self::digest(data))
    }

    /// Compute the content digest of a byte slice.
    pub fn digest(data: &[u8]) -> ContentDigest {
        Sha256::digest(data).into()
    }

    /// Number of distinct payloads recorded.
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// True if nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Destination for extracted images of a single document.
pub struct ImageSink<'a> {
    output_dir: PathBuf,
    dir_ready: bool,
    outcomes: Vec<ImageOutcome>,
    observer: &'a mut dyn ProgressObserver,
}

impl<'a> ImageSink<'a> {
    /// Create a sink writing into `output_dir`. The directory is created
    /// on first use.
    pub fn new(output_dir: impl Into<PathBuf>, observer: &'a mut dyn ProgressObserver) -> Self {
        Self {
            output_dir: output_dir.into(),
            dir_ready: false,
            outcomes: Vec::new(),
            observer,
        }
    }

    /// Directory images are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_output_dir(&mut self) -> Result<()> {
        if !self.dir_ready {
            fs::create_dir_all(&self.output_dir)?;
            self.dir_ready = true;
        }
        Ok(())
    }

    /// Announce that page `current` of `total` is being processed.
    pub fn page(&mut self, current: usize, total: usize) {
        self.observer.on_event(ProgressEvent::Page {
            current,
            total,
            percent: calculate_progress(current.saturating_sub(1), total),
        });
    }

    /// Record a skipped image.
    pub fn skip(&mut self, name: impl Into<String>, reason: SkipReason) {
        let name = name.into();
        match &reason {
            SkipReason::ConversionFailed(_) | SkipReason::MissingStagedFile => {
                log::warn!("Skipping {}: {}", name, reason)
            }
            _ => log::debug!("Skipping {}: {}", name, reason),
        }
        self.record(ImageOutcome::Skipped { name, reason });
    }

    /// Normalize a candidate held in memory and write it under a unique name.
    pub fn write(&mut self, candidate: ImageCandidate) -> Result<()> {
        let ImageCandidate {
            mut data,
            name,
            extension,
        } = candidate;
        let mut ext = normalize_extension(&extension);

        if ext == ".jp2" {
            match convert::jp2_to_png(&data) {
                Ok(png) => {
                    data = png;
                    ext = ".png".to_string();
                }
                Err(e) => {
                    self.skip(name, SkipReason::ConversionFailed(e.to_string()));
                    return Ok(());
                }
            }
        }

        self.ensure_output_dir()?;
        let path = self.output_dir.join(unique_filename(&ext));
        fs::write(&path, &data)?;
        log::debug!("Wrote {} as {}", name, path.display());

        self.record(ImageOutcome::Written {
            path,
            extension: ext,
        });
        Ok(())
    }

    /// Normalize a file already staged in the output directory and rename it
    /// to a unique name.
    ///
    /// `name` is the member's declared file name; its extension decides the
    /// conversion, whatever the staged file is called. `keep` decides, from
    /// the normalized extension, whether the file is a relevant image;
    /// rejected files are deleted.
    pub fn finalize_staged(
        &mut self,
        staged: &Path,
        name: &str,
        keep: Option<fn(&str) -> bool>,
    ) -> Result<()> {
        let name = name.to_string();

        if !staged.is_file() {
            self.skip(name, SkipReason::MissingStagedFile);
            return Ok(());
        }

        let mut ext = normalize_extension(&extension_of(&name));

        if ext == ".jp2" {
            if let Err(e) = convert::convert_jp2_file(staged) {
                remove_staged(staged)?;
                self.skip(name, SkipReason::ConversionFailed(e.to_string()));
                return Ok(());
            }
            ext = ".png".to_string();
        }

        if let Some(keep) = keep {
            if !keep(&ext) {
                remove_staged(staged)?;
                self.skip(name, SkipReason::NotAnImage);
                return Ok(());
            }
        }

        let path = self.output_dir.join(unique_filename(&ext));
        fs::rename(staged, &path)?;
        log::debug!("Renamed {} to {}", name, path.display());

        self.record(ImageOutcome::Written {
            path,
            extension: ext,
        });
        Ok(())
    }

    /// Number of files written so far.
    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_written()).count()
    }

    /// Consume the sink, returning all outcomes in order.
    pub fn finish(self) -> Vec<ImageOutcome> {
        self.outcomes
    }

    fn record(&mut self, outcome: ImageOutcome) {
        self.observer.on_event(ProgressEvent::Image(outcome.clone()));
        self.outcomes.push(outcome);
    }
}

/// Delete a staged file that will not be kept.
fn remove_staged(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::IoError(e)),
    }
}
