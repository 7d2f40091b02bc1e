//! Streaming backend: remote URLs and bundled intro assets.

use bridge_traits::{AssetResolver, MediaEvents, StreamEngine};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{Backend, SessionSlot};
use crate::error::{PlaybackError, Result};
use crate::item::{Item, ItemSource, SourceKind};

pub struct StreamingBackend {
    kind: SourceKind,
    engine: Arc<dyn StreamEngine>,
    resolver: Option<Arc<dyn AssetResolver>>,
    slot: SessionSlot,
}

impl StreamingBackend {
    pub(crate) fn new(
        kind: SourceKind,
        engine: Arc<dyn StreamEngine>,
        resolver: Option<Arc<dyn AssetResolver>>,
        events: Arc<dyn MediaEvents>,
    ) -> Self {
        Self {
            kind,
            engine,
            resolver,
            slot: SessionSlot::new(events),
        }
    }

    fn locator(&self, item: &Item) -> Result<String> {
        match &item.source {
            ItemSource::Remote { url } => Ok(url.clone()),
            ItemSource::IntroAsset { name } => {
                let resolver = self
                    .resolver
                    .as_ref()
                    .ok_or(PlaybackError::EngineUnavailable(SourceKind::IntroAsset))?;
                resolver
                    .resolve(name)
                    .map_err(|e| PlaybackError::OpenFailed(format!("asset '{}': {}", name, e)))
            }
            ItemSource::Local { .. } => Err(PlaybackError::UnplayableSource(
                "local item routed to the streaming backend".to_string(),
            )),
        }
    }
}

impl Backend for StreamingBackend {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    #[instrument(skip_all, fields(session = %self.slot.id(), kind = %self.kind))]
    fn prepare(&mut self, item: &Item) -> Result<()> {
        let locator = self.locator(item)?;
        debug!(locator = %redact_url(&locator), "Opening stream");

        let session = self
            .engine
            .open_stream(&locator, self.slot.events())
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

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, MediaSession};
    use mockall::mock;
    use std::time::Duration;

    mock! {
        Engine {}
        impl StreamEngine for Engine {
            fn open_stream(
                &self,
                locator: &str,
                events: Arc<dyn MediaEvents>,
            ) -> BridgeResult<Box<dyn MediaSession>>;
        }
    }

    mock! {
        Resolver {}
        impl AssetResolver for Resolver {
            fn resolve(&self, name: &str) -> BridgeResult<String>;
        }
    }

    #[test]
    fn remote_item_opens_its_url() {
        let mut engine = MockEngine::new();
        engine
            .expect_open_stream()
            .withf(|locator, _| locator == "https://cdn.example/9.mp3")
            .times(1)
            .returning(|_, _| Ok(Box::new(releasable_session()) as Box<dyn MediaSession>));

        let mut backend =
            StreamingBackend::new(SourceKind::Remote, Arc::new(engine), None, quiet_events());
        backend
            .prepare(&Item::remote(9, "https://cdn.example/9.mp3"))
            .unwrap();
        backend.stop();
    }

    #[test]
    fn intro_asset_goes_through_resolver() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve()
            .withf(|name| name == "intro.mp3")
            .returning(|_| Ok("asset:///intro.mp3".to_string()));

        let mut engine = MockEngine::new();
        engine
            .expect_open_stream()
            .withf(|locator, _| locator == "asset:///intro.mp3")
            .returning(|_, _| Ok(Box::new(releasable_session()) as Box<dyn MediaSession>));

        let mut backend = StreamingBackend::new(
            SourceKind::IntroAsset,
            Arc::new(engine),
            Some(Arc::new(resolver)),
            quiet_events(),
        );
        backend
            .prepare(&Item::intro("intro.mp3", Duration::from_secs(4)))
            .unwrap();
    }

    #[test]
    fn intro_asset_without_resolver_is_unavailable() {
        let engine = MockEngine::new();
        let mut backend =
            StreamingBackend::new(SourceKind::IntroAsset, Arc::new(engine), None, quiet_events());
        let err = backend
            .prepare(&Item::intro("intro.mp3", Duration::ZERO))
            .unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::EngineUnavailable(SourceKind::IntroAsset)
        ));
    }

    #[test]
    fn open_failure_is_reported() {
        let mut engine = MockEngine::new();
        engine
            .expect_open_stream()
            .returning(|_, _| Err(BridgeError::OperationFailed("403".into())));

        let mut backend =
            StreamingBackend::new(SourceKind::Remote, Arc::new(engine), None, quiet_events());
        let err = backend
            .prepare(&Item::remote(1, "https://cdn.example/1.mp3"))
            .unwrap_err();
        assert!(matches!(err, PlaybackError::OpenFailed(msg) if msg.contains("403")));
        // Nothing was opened, so stopping is a no-op.
        backend.stop();
    }
}
