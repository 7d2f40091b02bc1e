//! # Player Configuration Module
//!
//! Provides configuration management for the playback engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `PlayerConfig` holding every host bridge the engine talks to plus its
//! timing knobs. It enforces fail-fast validation so a player can never be
//! spawned without a way to actually play something.
//!
//! ## Required Dependencies
//!
//! - At least one of `StreamEngine` / `LocalDecoder`
//! - `SourceNormalizer`, whenever a `LocalDecoder` is provided
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `AssetResolver` - Needed only to play bundled intro assets
//! - `ProgressListener` - Ticker cadence for the host's "now playing" UI
//! - `Clock` - Defaults to [`SystemClock`]
//! - `EventBus` - A private bus is created when none is shared in
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{PlayerConfig, TimingConfig};
//! use std::sync::Arc;
//!
//! let config = PlayerConfig::builder()
//!     .stream_engine(Arc::new(MyStreamEngine::new()))
//!     .local_decoder(Arc::new(MyLocalDecoder::new()))
//!     .source_normalizer(Arc::new(MyFlacMerger::new()))
//!     .progress_listener(Arc::new(NotificationUpdater::new()))
//!     .timing(TimingConfig::default())
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::PlayerConfig;
//!
//! // No engine at all: fails with an actionable CapabilityMissing error
//! let config = PlayerConfig::builder()
//!     .build()
//!     .expect("Should fail - missing media engine");
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use bridge_traits::{
    AssetResolver, Clock, LocalDecoder, ProgressListener, SourceNormalizer, StreamEngine,
    SystemClock,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Timing
// ============================================================================

/// Worker, ticker and snapshot cadences.
///
/// These are tuning parameters, not protocol. What matters is the shape:
/// the worker idles on a long sleep that every command and engine signal
/// interrupts, and re-checks after a short sleep whenever it has just kicked
/// off work whose outcome arrives asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Worker sleep when there is nothing left to do.
    ///
    /// Default: 60 seconds.
    #[serde(default = "default_idle_sleep")]
    pub idle_sleep: Duration,

    /// Worker sleep right after a prepare, a reset or a refused resume.
    ///
    /// Default: 251 milliseconds.
    #[serde(default = "default_retry_sleep")]
    pub retry_sleep: Duration,

    /// Progress ticker period.
    ///
    /// Default: 500 milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// Snapshot push period while at least one subscriber is registered.
    ///
    /// Default: 330 milliseconds.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            idle_sleep: default_idle_sleep(),
            retry_sleep: default_retry_sleep(),
            tick_interval: default_tick_interval(),
            snapshot_interval: default_snapshot_interval(),
        }
    }
}

impl TimingConfig {
    /// Short cadences for tests and demos.
    ///
    /// The idle sleep stays well above the retry sleep so the two code paths
    /// remain distinguishable.
    pub fn responsive() -> Self {
        Self {
            idle_sleep: Duration::from_secs(2),
            retry_sleep: Duration::from_millis(10),
            tick_interval: Duration::from_millis(20),
            snapshot_interval: Duration::from_millis(15),
        }
    }

    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    pub fn with_retry_sleep(mut self, retry_sleep: Duration) -> Self {
        self.retry_sleep = retry_sleep;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_snapshot_interval(mut self, snapshot_interval: Duration) -> Self {
        self.snapshot_interval = snapshot_interval;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("idle_sleep", self.idle_sleep),
            ("retry_sleep", self.retry_sleep),
            ("tick_interval", self.tick_interval),
            ("snapshot_interval", self.snapshot_interval),
        ];
        if let Some((name, _)) = named.iter().find(|(_, value)| value.is_zero()) {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }

        if self.retry_sleep >= self.idle_sleep {
            return Err(Error::Config(
                "retry_sleep must be shorter than idle_sleep".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_idle_sleep() -> Duration {
    Duration::from_secs(60)
}

fn default_retry_sleep() -> Duration {
    Duration::from_millis(251)
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_snapshot_interval() -> Duration {
    Duration::from_millis(330)
}

// ============================================================================
// Player configuration
// ============================================================================

/// Everything a player needs to run.
///
/// Use [`PlayerConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct PlayerConfig {
    pub timing: TimingConfig,

    /// Engine for remote streams and bundled assets
    pub stream_engine: Option<Arc<dyn StreamEngine>>,

    /// Decoder for files on the device
    pub local_decoder: Option<Arc<dyn LocalDecoder>>,

    /// Merges local recordings before decoding (required with `local_decoder`)
    pub source_normalizer: Option<Arc<dyn SourceNormalizer>>,

    /// Resolves bundled asset names to locators
    pub asset_resolver: Option<Arc<dyn AssetResolver>>,

    pub progress_listener: Option<Arc<dyn ProgressListener>>,

    pub clock: Arc<dyn Clock>,

    /// Bus receiving playback and lifecycle events
    pub event_bus: EventBus,
}

impl std::fmt::Debug for PlayerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("timing", &self.timing)
            .field(
                "stream_engine",
                &self.stream_engine.as_ref().map(|_| "StreamEngine { ... }"),
            )
            .field(
                "local_decoder",
                &self.local_decoder.as_ref().map(|_| "LocalDecoder { ... }"),
            )
            .field(
                "source_normalizer",
                &self
                    .source_normalizer
                    .as_ref()
                    .map(|_| "SourceNormalizer { ... }"),
            )
            .field(
                "asset_resolver",
                &self.asset_resolver.as_ref().map(|_| "AssetResolver { ... }"),
            )
            .field(
                "progress_listener",
                &self
                    .progress_listener
                    .as_ref()
                    .map(|_| "ProgressListener { ... }"),
            )
            .field("event_bus", &self.event_bus)
            .finish()
    }
}

impl PlayerConfig {
    /// Creates a new builder for constructing a `PlayerConfig`.
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Timing values are usable
    /// - At least one media engine is provided
    /// - A local decoder comes with a source normalizer
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;

        if self.stream_engine.is_none() && self.local_decoder.is_none() {
            return Err(Error::capability_missing(
                "StreamEngine",
                "No media engine provided. Inject a StreamEngine for remote and bundled \
                 audio, a LocalDecoder for on-device recordings, or both.",
            ));
        }

        if self.local_decoder.is_some() && self.source_normalizer.is_none() {
            return Err(Error::capability_missing(
                "SourceNormalizer",
                "A LocalDecoder was provided without a SourceNormalizer. Local items are \
                 stored as several recordings and must be merged before decoding.",
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`PlayerConfig`] instances.
#[derive(Default)]
pub struct PlayerConfigBuilder {
    timing: Option<TimingConfig>,
    stream_engine: Option<Arc<dyn StreamEngine>>,
    local_decoder: Option<Arc<dyn LocalDecoder>>,
    source_normalizer: Option<Arc<dyn SourceNormalizer>>,
    asset_resolver: Option<Arc<dyn AssetResolver>>,
    progress_listener: Option<Arc<dyn ProgressListener>>,
    clock: Option<Arc<dyn Clock>>,
    event_bus: Option<EventBus>,
    event_buffer_size: Option<usize>,
}

impl PlayerConfigBuilder {
    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn stream_engine(mut self, engine: Arc<dyn StreamEngine>) -> Self {
        self.stream_engine = Some(engine);
        self
    }

    pub fn local_decoder(mut self, decoder: Arc<dyn LocalDecoder>) -> Self {
        self.local_decoder = Some(decoder);
        self
    }

    pub fn source_normalizer(mut self, normalizer: Arc<dyn SourceNormalizer>) -> Self {
        self.source_normalizer = Some(normalizer);
        self
    }

    pub fn asset_resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.asset_resolver = Some(resolver);
        self
    }

    pub fn progress_listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.progress_listener = Some(listener);
        self
    }

    /// Overrides the wall clock used for progress accounting.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Publish events on an existing bus instead of a private one.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Capacity of the private bus. Ignored when a bus is shared in.
    pub fn event_buffer_size(mut self, capacity: usize) -> Self {
        self.event_buffer_size = Some(capacity);
        self
    }

    /// Builds the final `PlayerConfig` instance.
    ///
    /// Returns an error if a required bridge is missing or a value is invalid.
    pub fn build(self) -> Result<PlayerConfig> {
        let event_bus = match self.event_bus {
            Some(bus) => bus,
            None => {
                let capacity = self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
                if capacity == 0 {
                    return Err(Error::Config(
                        "Event buffer size must be greater than 0".to_string(),
                    ));
                }
                EventBus::new(capacity)
            }
        };

        let config = PlayerConfig {
            timing: self.timing.unwrap_or_default(),
            stream_engine: self.stream_engine,
            local_decoder: self.local_decoder,
            source_normalizer: self.source_normalizer,
            asset_resolver: self.asset_resolver,
            progress_listener: self.progress_listener,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_bus,
        };

        config.validate()?;

        Ok(config)
    }
}
