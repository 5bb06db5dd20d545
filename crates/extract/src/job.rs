//! Background extraction on a worker thread.
//!
//! The worker owns everything it touches. Progress reaches the caller only
//! through the event channel, so a UI thread can poll or block on it.

use crate::dispatch::{extract_document, ExtractOptions};
use imgx_core::{DocumentOutcome, ProgressEvent, Result};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// One extraction running in the background.
pub struct ExtractionJob {
    events: Receiver<ProgressEvent>,
    handle: JoinHandle<DocumentOutcome>,
}

impl ExtractionJob {
    /// Start extracting `path` on a new thread.
    pub fn spawn(path: impl Into<PathBuf>, options: ExtractOptions) -> Result<Self> {
        let path = path.into();
        let (tx, rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("imgx-extract".to_string())
            .spawn(move || {
                // A dropped receiver only means nobody is watching.
                let mut observer = |event: ProgressEvent| {
                    let _ = tx.send(event);
                };
                extract_document(&path, &options, &mut observer)
            })?;

        Ok(Self { events: rx, handle })
    }

    /// Progress events. Iteration ends once the worker has finished.
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Wait for the worker and return its outcome.
    pub fn join(self) -> DocumentOutcome {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                log::error!("Extraction worker panicked");
                DocumentOutcome::Failed {
                    cause: "extraction worker panicked".to_string(),
                }
            }
        }
    }
}
