//! Local backend: recordings on the device.
//!
//! Recordings are merged into one file by the host [`SourceNormalizer`]
//! before the [`LocalDecoder`] opens it. A previously merged file is reused
//! while it is strictly newer than every recording; a stale one is deleted
//! and merged again.

use bridge_traits::{LocalDecoder, MediaEvents, SourceNormalizer};
use core_runtime::logging::strip_path;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, instrument, warn};

use super::{Backend, SessionSlot};
use crate::error::{PlaybackError, Result};
use crate::item::{Item, ItemSource, SourceKind};

pub struct LocalBackend {
    decoder: Arc<dyn LocalDecoder>,
    normalizer: Arc<dyn SourceNormalizer>,
    slot: SessionSlot,
}

impl LocalBackend {
    pub(crate) fn new(
        decoder: Arc<dyn LocalDecoder>,
        normalizer: Arc<dyn SourceNormalizer>,
        events: Arc<dyn MediaEvents>,
    ) -> Self {
        Self {
            decoder,
            normalizer,
            slot: SessionSlot::new(events),
        }
    }

    /// Path of a playable single file for `item`. Blocks while merging.
    fn playable_file(&self, item: &Item) -> Result<PathBuf> {
        let ItemSource::Local {
            recordings,
            flattened,
        } = &item.source
        else {
            return Err(PlaybackError::UnplayableSource(
                "non-local item routed to the local backend".to_string(),
            ));
        };

        let paths: Vec<PathBuf> = recordings.iter().map(|r| r.path.clone()).collect();

        if let Some(existing) = flattened {
            if is_fresh(existing, &paths) {
                debug!(file = %strip_path(&existing.to_string_lossy()), "Reusing merged file");
                return Ok(existing.clone());
            }
            if existing.exists() {
                info!(file = %strip_path(&existing.to_string_lossy()), "Merged file is stale");
                if let Err(err) = fs::remove_file(existing) {
                    warn!(error = %err, "Failed to delete stale merged file");
                }
            }
        }

        if paths.is_empty() {
            return Err(PlaybackError::Normalization(
                "no recordings to merge".to_string(),
            ));
        }

        debug!(recordings = paths.len(), "Merging recordings");
        self.normalizer
            .normalize(&paths)
            .map_err(|e| PlaybackError::Normalization(e.to_string()))
    }
}

impl Backend for LocalBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    #[instrument(skip_all, fields(session = %self.slot.id()))]
    fn prepare(&mut self, item: &Item) -> Result<()> {
        let file = self.playable_file(item)?;
        debug!(file = %strip_path(&file.to_string_lossy()), "Opening file");

        let session = self
            .decoder
            .open_file(&file, self.slot.events())
            .map_err(|e| PlaybackError::OpenFailed(e.to_string()))?;
        self.slot.attach(session);
        Ok(())
    }

    fn session(&self) -> &SessionSlot {
        &self.slot
    }

    fn session_mut(&mut self) -> &mut SessionSlot {
        &mut self.slot
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// `merged` exists and is strictly newer than every recording. Missing
/// recordings count as infinitely old.
fn is_fresh(merged: &Path, recordings: &[PathBuf]) -> bool {
    let Some(merged_at) = modified(merged) else {
        return false;
    };
    let latest = recordings
        .iter()
        .filter_map(|p| modified(p))
        .max()
        .unwrap_or(SystemTime::UNIX_EPOCH);
    merged_at > latest
}
