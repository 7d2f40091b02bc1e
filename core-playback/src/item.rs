//! # Playable Items
//!
//! An [`Item`] is the immutable description of one thing to play: where its
//! audio lives plus the metadata surfaced in snapshots. Once handed to the
//! player it is shared behind an `Arc` and never mutated.
//!
//! Three kinds of sources exist:
//! - **Intro asset**: a clip bundled with the host app, resolved by name
//! - **Local**: one or more recordings captured on the device, merged into a
//!   single file before decoding
//! - **Remote**: an HTTP(S) stream
//!
//! Which backend plays an item is decided by a [`SourceClassifier`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default name of the bundled intro clip.
pub const INTRO_ASSET: &str = "intro.mp3";

/// One recorded segment of a local item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub path: PathBuf,
    pub duration: Duration,
}

impl Recording {
    pub fn new(path: impl Into<PathBuf>, duration: Duration) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

/// Where an item's audio comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemSource {
    /// Clip bundled with the host application.
    IntroAsset { name: String },
    /// Recordings on the device, in playback order.
    Local {
        recordings: Vec<Recording>,
        /// Previously merged file, reused while it is newer than every
        /// recording.
        flattened: Option<PathBuf>,
    },
    /// Remote stream.
    Remote { url: String },
}

/// Immutable descriptor of the audio to play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Server-side identifier; `None` for unpublished local recordings and
    /// the intro clip.
    pub id: Option<i64>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub is_message: bool,
    /// Declared duration. Local items derive theirs from their recordings.
    pub duration: Duration,
    pub source: ItemSource,
}

impl Item {
    fn with_source(source: ItemSource) -> Self {
        Self {
            id: None,
            title: None,
            author: None,
            is_message: false,
            duration: Duration::ZERO,
            source,
        }
    }

    /// A remote item streamed from `url`.
    pub fn remote(id: i64, url: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::with_source(ItemSource::Remote { url: url.into() })
        }
    }

    /// A local item made of `recordings`.
    pub fn local(recordings: Vec<Recording>) -> Self {
        Self::with_source(ItemSource::Local {
            recordings,
            flattened: None,
        })
    }

    /// The bundled intro clip named `asset`.
    pub fn intro(asset: impl Into<String>, duration: Duration) -> Self {
        Self {
            duration,
            ..Self::with_source(ItemSource::IntroAsset { name: asset.into() })
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn as_message(mut self) -> Self {
        self.is_message = true;
        self
    }

    /// Record a previously merged file for a local item. No-op for other
    /// sources.
    pub fn with_flattened(mut self, path: impl Into<PathBuf>) -> Self {
        if let ItemSource::Local { flattened, .. } = &mut self.source {
            *flattened = Some(path.into());
        }
        self
    }

    /// Whether the audio lives on the device.
    pub fn is_local(&self) -> bool {
        match &self.source {
            ItemSource::Local {
                recordings,
                flattened,
            } => !recordings.is_empty() || flattened.is_some(),
            _ => false,
        }
    }

    /// Total playable length.
    pub fn total_duration(&self) -> Duration {
        match &self.source {
            ItemSource::Local { recordings, .. } if !recordings.is_empty() => {
                recordings.iter().map(|r| r.duration).sum()
            }
            _ => self.duration,
        }
    }
}

// ============================================================================
// Source classification
// ============================================================================

/// Backend family an item is played by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    IntroAsset,
    Local,
    Remote,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::IntroAsset => "intro asset",
            SourceKind::Local => "local",
            SourceKind::Remote => "remote",
        })
    }
}

/// Decides which backend family plays an item.
///
/// Returning `None` marks the item unplayable; submitting it moves the
/// player straight into `Error`.
pub trait SourceClassifier: Send + Sync {
    fn classify(&self, item: &Item) -> Option<SourceKind>;
}

/// Classifies by the shape of [`ItemSource`]: non-empty asset names, local
/// items with something on disk, and `http`/`https` URLs with a host.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl SourceClassifier for DefaultClassifier {
    fn classify(&self, item: &Item) -> Option<SourceKind> {
        match &item.source {
            ItemSource::IntroAsset { name } if !name.trim().is_empty() => {
                Some(SourceKind::IntroAsset)
            }
            ItemSource::Local { .. } if item.is_local() => Some(SourceKind::Local),
            ItemSource::Remote { url } if is_stream_url(url) => Some(SourceKind::Remote),
            _ => None,
        }
    }
}

fn is_stream_url(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    let host = rest.split(|c| c == '/' || c == '?').next().unwrap_or("");
    matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https") && !host.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recordings() -> Vec<Recording> {
        vec![
            Recording::new("/tmp/0001.flac", Duration::from_millis(1500)),
            Recording::new("/tmp/0002.flac", Duration::from_millis(2500)),
        ]
    }

    #[test]
    fn local_duration_sums_recordings() {
        let item = Item::local(recordings()).with_duration(Duration::from_secs(99));
        assert_eq!(item.total_duration(), Duration::from_secs(4));
        assert!(item.is_local());
    }

    #[test]
    fn remote_duration_is_declared() {
        let item = Item::remote(7, "https://example.com/7.mp3")
            .with_duration(Duration::from_secs(30))
            .with_title("Morning")
            .with_author("alice");
        assert_eq!(item.total_duration(), Duration::from_secs(30));
        assert_eq!(item.id, Some(7));
        assert!(!item.is_local());
    }

    #[test]
    fn classifier_recognises_each_kind() {
        let classifier = DefaultClassifier;
        assert_eq!(
            classifier.classify(&Item::intro(INTRO_ASSET, Duration::from_secs(5))),
            Some(SourceKind::IntroAsset)
        );
        assert_eq!(
            classifier.classify(&Item::local(recordings())),
            Some(SourceKind::Local)
        );
        assert_eq!(
            classifier.classify(&Item::remote(1, "HTTPS://cdn.example.com/a.mp3?x=1")),
            Some(SourceKind::Remote)
        );
    }

    #[test]
    fn classifier_rejects_malformed_sources() {
        let classifier = DefaultClassifier;
        assert_eq!(classifier.classify(&Item::remote(1, "ftp://example.com/a")), None);
        assert_eq!(classifier.classify(&Item::remote(1, "https:///a.mp3")), None);
        assert_eq!(classifier.classify(&Item::remote(1, "not a url")), None);
        assert_eq!(classifier.classify(&Item::local(Vec::new())), None);
        assert_eq!(
            classifier.classify(&Item::intro("  ", Duration::ZERO)),
            None
        );
    }

    #[test]
    fn flattened_only_local_item_is_playable() {
        let item = Item::local(Vec::new()).with_flattened("/tmp/merged.flac");
        assert_eq!(DefaultClassifier.classify(&item), Some(SourceKind::Local));
    }

    #[test]
    fn item_serializes_with_tagged_source() {
        let item = Item::remote(3, "https://example.com/3.mp3").as_message();
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"kind\":\"remote\""));
        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
