//! # Player Demo
//!
//! Drives the playback engine against a simulated host engine that
//! "prepares" after a short delay and reports completion when its clip runs
//! out, printing pushed snapshots along the way.
//!
//! Run with:
//! ```bash
//! cargo run --example player_demo --package core-playback
//!
//! # JSON or compact log output
//! cargo run --example player_demo --package core-playback -- json
//! ```

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{LogLevel, MediaEvents, MediaSession, PlaybackState, StreamEngine};
use core_playback::{Item, Player};
use core_runtime::config::{PlayerConfig, TimingConfig};
use core_runtime::logging::{init_logging, redact_url, LogFormat, LoggingConfig};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

// ============================================================================
// Simulated host engine
// ============================================================================

struct SimulatedEngine {
    prepare_delay: Duration,
    clip_length: Duration,
}

impl StreamEngine for SimulatedEngine {
    fn open_stream(
        &self,
        locator: &str,
        events: Arc<dyn MediaEvents>,
    ) -> BridgeResult<Box<dyn MediaSession>> {
        info!(locator = %redact_url(locator), "Simulated engine buffering");

        let delay = self.prepare_delay;
        let prepared = Arc::clone(&events);
        thread::spawn(move || {
            thread::sleep(delay);
            prepared.on_prepared();
        });

        Ok(Box::new(SimulatedSession {
            events,
            length: self.clip_length,
            offset: Duration::ZERO,
            started: None,
            run: Arc::new(AtomicU64::new(0)),
        }))
    }
}

struct SimulatedSession {
    events: Arc<dyn MediaEvents>,
    length: Duration,
    offset: Duration,
    started: Option<Instant>,
    /// Bumped on every pause, seek and release to cancel the pending
    /// completion timer.
    run: Arc<AtomicU64>,
}

impl SimulatedSession {
    fn current(&self) -> Duration {
        self.offset + self.started.map_or(Duration::ZERO, |at| at.elapsed())
    }

    fn arm_completion(&mut self) {
        let epoch = self.run.fetch_add(1, Ordering::SeqCst) + 1;
        let remaining = self.length.saturating_sub(self.offset);
        let run = Arc::clone(&self.run);
        let events = Arc::clone(&self.events);
        thread::spawn(move || {
            thread::sleep(remaining);
            if run.load(Ordering::SeqCst) == epoch {
                events.on_completed();
            }
        });
    }
}

impl MediaSession for SimulatedSession {
    fn start(&mut self) -> BridgeResult<()> {
        if self.offset >= self.length {
            self.offset = Duration::ZERO;
        }
        self.started = Some(Instant::now());
        self.arm_completion();
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.offset = self.current().min(self.length);
        self.started = None;
        self.run.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> BridgeResult<()> {
        self.offset = position.min(self.length);
        if self.started.is_some() {
            self.started = Some(Instant::now());
            self.arm_completion();
        }
        Ok(())
    }

    fn position(&self) -> Option<Duration> {
        Some(self.current().min(self.length))
    }

    fn release(&mut self) {
        self.run.fetch_add(1, Ordering::SeqCst);
        self.started = None;
    }
}

// ============================================================================
// Demo
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = match env::args().nth(1).as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug),
    )?;

    let engine = Arc::new(SimulatedEngine {
        prepare_delay: Duration::from_millis(400),
        clip_length: Duration::from_secs(4),
    });
    let config = PlayerConfig::builder()
        .timing(TimingConfig::default())
        .stream_engine(engine)
        .build()?;
    let player = Player::spawn(config)?;

    let mut snapshots = player.subscribe()?;
    let printer = tokio::spawn(async move {
        let mut last = None;
        while let Some(snapshot) = snapshots.recv().await {
            if last != Some(snapshot.state) {
                println!(
                    "[snapshot] {:>9} {:5.2}s / {:.2}s",
                    snapshot.state.to_string(),
                    snapshot.progress_secs,
                    snapshot.total_secs
                );
                last = Some(snapshot.state);
            }
            if snapshot.state == PlaybackState::Finished {
                break;
            }
        }
    });

    let item = Item::remote(1, "https://cdn.example/boos/1.mp3?token=demo")
        .with_title("Dawn chorus")
        .with_author("field-recordist")
        .with_duration(Duration::from_secs(4));

    info!("Playing with autostart");
    player.play(item, true);
    tokio::time::sleep(Duration::from_secs(1)).await;

    info!("Seeking to 2s");
    player.seek(Duration::from_secs(2));
    tokio::time::sleep(Duration::from_millis(500)).await;

    info!("Pausing");
    player.pause();
    tokio::time::sleep(Duration::from_millis(700)).await;

    if let Some(saved) = player.persistent_state() {
        println!("[persist] {}", serde_json::to_string(&saved)?);
    }

    info!("Resuming");
    player.resume();

    tokio::time::timeout(Duration::from_secs(10), printer).await??;
    println!("[final] {:?}", player.diagnostics());

    tokio::task::spawn_blocking(move || player.shutdown()).await?;
    Ok(())
}
