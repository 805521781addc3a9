//! Audio session manager
//!
//! Coordinates every active playback session: the key→session map, the
//! start/stop/replace protocol, auto-stop supervision and the completion
//! listener. This is the single source of truth for which sessions exist.
//!
//! Teardown of one key always runs in the same order: fade scheduler
//! cancelled and joined, auto-stop timer signalled, then the playback
//! handle stopped, reset and released, and only then is the key gone from
//! the map. Schedulers never take the registry lock, so joining them while
//! holding it cannot deadlock; the auto-stop fire path does take the lock,
//! which is why its cancellation is a signal backed by an epoch check
//! rather than a join.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::auto_stop::AutoStopTimer;
use super::fade::{FadeCurve, FadeStep};
use super::scheduler::FadeScheduler;
use crate::config::PlaybackConfig;
use crate::error::AudioError;
use crate::playback::engine::{CompletionHook, PlaybackEngine, PlaybackHandle};
use crate::playback::output::RodioEngine;
use crate::playback::source::SourceResolver;

/// Completion listener: receives the id of the session that finished.
type OnComplete = Arc<dyn Fn(i32) + Send + Sync>;

/// One active playback session.
struct Session {
    handle: Arc<dyn PlaybackHandle>,
    looping: bool,
    /// Distinguishes this session from any earlier/later one under the same
    /// key, so a stale auto-stop fire can recognize itself.
    epoch: u64,
    scheduler: Option<FadeScheduler>,
    auto_stop: AutoStopTimer,
}

impl Session {
    /// Tear the session down: timers first, then the handle.
    fn teardown(self) {
        if let Some(scheduler) = self.scheduler {
            scheduler.cancel();
        }
        self.auto_stop.cancel();

        if self.handle.is_playing() {
            self.handle.stop();
        }
        self.handle.reset();
        self.handle.release();
    }
}

/// Manages concurrently active audio sessions keyed by caller-assigned id.
///
/// Starting a session under an existing key replaces it: the old session is
/// fully torn down, resources released, before the new one is opened.
pub struct AudioSessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    sessions: Mutex<HashMap<i32, Session>>,
    engine: Box<dyn PlaybackEngine>,
    resolver: SourceResolver,
    config: PlaybackConfig,
    on_complete: Mutex<Option<OnComplete>>,
    next_epoch: AtomicU64,
}

impl AudioSessionManager {
    /// Create a manager over an explicit backend and resolver.
    pub fn new(
        engine: Box<dyn PlaybackEngine>,
        resolver: SourceResolver,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                sessions: Mutex::new(HashMap::new()),
                engine,
                resolver,
                config,
                on_complete: Mutex::new(None),
                next_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Create a manager over the default rodio backend, with source roots
    /// taken from the configuration.
    pub fn with_default_output(config: PlaybackConfig) -> Self {
        let resolver = SourceResolver::from_config(&config);
        Self::new(Box::new(RodioEngine::new()), resolver, config)
    }

    /// Register the process-wide completion listener.
    ///
    /// Invoked with the session id when a non-looping session reaches its
    /// natural end of stream, and whenever the auto-stop deadline forces a
    /// session out (looping or not).
    pub fn set_on_complete_listener<F>(&self, listener: F)
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        *self.inner.on_complete.lock() = Some(Arc::new(listener));
    }

    /// Start (or replace) the session at `id`.
    ///
    /// Fade precedence follows the request: non-empty `fade_steps` select a
    /// staircase fade, otherwise a non-zero `fade_duration_ms` selects a
    /// linear fade, otherwise playback starts at full volume.
    pub fn start(
        &self,
        id: i32,
        source_ref: &str,
        looping: bool,
        fade_duration_ms: Option<u64>,
        fade_steps: &[FadeStep],
    ) -> Result<(), AudioError> {
        let fade = FadeCurve::from_request(fade_duration_ms, fade_steps)?;

        let mut sessions = self.inner.sessions.lock();

        // Replacement is stop-then-start: the old session's handle must be
        // fully released before the new one is opened.
        if let Some(existing) = sessions.remove(&id) {
            tracing::debug!("Replacing existing session {}", id);
            existing.teardown();
        }

        let path = self.inner.resolver.resolve(source_ref)?;

        let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);

        let weak = Arc::downgrade(&self.inner);
        let hook: CompletionHook = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!("Session {} reached end of stream", id);
                inner.notify_complete(id);
            }
        });

        let handle = self.inner.engine.open(&path, looping, hook)?;

        let initial_volume = fade
            .as_ref()
            .map(FadeCurve::initial_volume)
            .unwrap_or(self.inner.config.max_volume);
        handle.set_volume(initial_volume);
        handle.start();

        let scheduler = fade.map(|curve| {
            FadeScheduler::spawn(
                handle.clone(),
                curve,
                Duration::from_millis(self.inner.config.fade_tick_ms),
            )
        });

        let weak = Arc::downgrade(&self.inner);
        let auto_stop = AutoStopTimer::arm(
            Duration::from_millis(self.inner.config.auto_stop_ms),
            move || {
                if let Some(inner) = weak.upgrade() {
                    inner.expire(id, epoch);
                }
            },
        );

        sessions.insert(
            id,
            Session {
                handle,
                looping,
                epoch,
                scheduler,
                auto_stop,
            },
        );

        tracing::info!("Started session {} ({}, loop={})", id, path.display(), looping);
        Ok(())
    }

    /// Stop the session at `id`. No-op if the key is absent.
    pub fn stop(&self, id: i32) {
        let mut sessions = self.inner.sessions.lock();
        if let Some(session) = sessions.remove(&id) {
            session.teardown();
            drop(sessions);
            tracing::info!("Stopped session {}", id);
        }
    }

    /// Whether any session is registered (playing or not).
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.lock().is_empty()
    }

    /// Ids of sessions whose handle currently reports audible playback.
    pub fn playing_ids(&self) -> Vec<i32> {
        self.inner
            .sessions
            .lock()
            .iter()
            .filter(|(_, session)| session.handle.is_playing())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Tear down every session. Used on host shutdown.
    pub fn teardown_all(&self) {
        let mut sessions = self.inner.sessions.lock();
        let count = sessions.len();
        for (_, session) in sessions.drain() {
            session.teardown();
        }
        drop(sessions);

        if count > 0 {
            tracing::info!("Tore down {} session(s)", count);
        }
    }
}

impl Clone for AudioSessionManager {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ManagerInner {
    /// Auto-stop deadline for (`id`, `epoch`) elapsed.
    ///
    /// Claims and tears down the session only if that exact session is
    /// still registered; an explicit stop or a replacement that won the
    /// race leaves nothing to do. The completion listener fires
    /// unconditionally once the session has been claimed, looping or not.
    fn expire(&self, id: i32, epoch: u64) {
        let looping = {
            let mut sessions = self.sessions.lock();
            match sessions.get(&id) {
                Some(session) if session.epoch == epoch => {}
                _ => {
                    tracing::debug!("Auto-stop for session {} found it already gone", id);
                    return;
                }
            }
            match sessions.remove(&id) {
                Some(session) => {
                    let looping = session.looping;
                    session.teardown();
                    looping
                }
                None => return,
            }
        };

        tracing::info!(
            "Session {} reached the auto-stop deadline (loop={})",
            id,
            looping
        );
        self.notify_complete(id);
    }

    fn notify_complete(&self, id: i32) {
        let listener = self.on_complete.lock().clone();
        if let Some(listener) = listener {
            listener(id);
        }
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        for (_, session) in self.sessions.get_mut().drain() {
            session.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicBool;

    struct FakeHandle {
        playing: AtomicBool,
        released: AtomicBool,
    }

    impl PlaybackHandle for FakeHandle {
        fn start(&self) {
            self.playing.store(true, Ordering::SeqCst);
        }
        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst) && !self.released.load(Ordering::SeqCst)
        }
        fn set_volume(&self, _volume: f32) {}
        fn stop(&self) {
            self.playing.store(false, Ordering::SeqCst);
        }
        fn reset(&self) {}
        fn release(&self) {
            self.released.store(true, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct FakeEngine {
        opened: PlMutex<Vec<Arc<FakeHandle>>>,
    }

    impl FakeEngine {
        fn handles(&self) -> Vec<Arc<FakeHandle>> {
            self.opened.lock().clone()
        }
    }

    impl PlaybackEngine for FakeEngine {
        fn open(
            &self,
            _path: &Path,
            _looping: bool,
            _on_complete: CompletionHook,
        ) -> Result<Arc<dyn PlaybackHandle>, AudioError> {
            let handle = Arc::new(FakeHandle {
                playing: AtomicBool::new(false),
                released: AtomicBool::new(false),
            });
            self.opened.lock().push(handle.clone());
            Ok(handle)
        }
    }

    fn manager_with_fake() -> (AudioSessionManager, Arc<FakeEngine>) {
        let engine = Arc::new(FakeEngine::default());
        let engine_ref = engine.clone();

        struct SharedEngine(Arc<FakeEngine>);
        impl PlaybackEngine for SharedEngine {
            fn open(
                &self,
                path: &Path,
                looping: bool,
                on_complete: CompletionHook,
            ) -> Result<Arc<dyn PlaybackHandle>, AudioError> {
                self.0.open(path, looping, on_complete)
            }
        }

        let resolver = SourceResolver::new(None, Some(PathBuf::from("/data")));
        let manager = AudioSessionManager::new(
            Box::new(SharedEngine(engine)),
            resolver,
            PlaybackConfig::default(),
        );
        (manager, engine_ref)
    }

    #[test]
    fn test_start_registers_and_plays() {
        let (manager, engine) = manager_with_fake();

        manager.start(7, "alarm.mp3", false, None, &[]).unwrap();

        assert!(!manager.is_empty());
        assert_eq!(manager.playing_ids(), vec![7]);
        assert_eq!(engine.handles().len(), 1);
    }

    #[test]
    fn test_stop_releases_and_unregisters() {
        let (manager, engine) = manager_with_fake();

        manager.start(7, "alarm.mp3", false, None, &[]).unwrap();
        manager.stop(7);

        assert!(manager.is_empty());
        assert!(manager.playing_ids().is_empty());
        assert!(engine.handles()[0].released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_unknown_key_is_noop() {
        let (manager, _engine) = manager_with_fake();
        manager.stop(42);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_start_replaces_prior_session() {
        let (manager, engine) = manager_with_fake();

        manager.start(7, "a.mp3", false, None, &[]).unwrap();
        manager.start(7, "b.mp3", false, None, &[]).unwrap();

        let handles = engine.handles();
        assert_eq!(handles.len(), 2);
        assert!(handles[0].released.load(Ordering::SeqCst));
        assert!(!handles[1].released.load(Ordering::SeqCst));
        assert_eq!(manager.playing_ids(), vec![7]);
    }

    #[test]
    fn test_invalid_fade_spec_rejected_before_any_state_change() {
        let (manager, engine) = manager_with_fake();

        let bad_steps = [FadeStep::new(500, 0.5), FadeStep::new(100, 1.0)];
        let result = manager.start(7, "alarm.mp3", false, None, &bad_steps);

        assert!(matches!(result, Err(AudioError::InvalidFadeSpec(_))));
        assert!(manager.is_empty());
        assert!(engine.handles().is_empty());
    }

    #[test]
    fn test_resolution_failure_leaves_no_session() {
        let engine = Arc::new(FakeEngine::default());
        struct SharedEngine(Arc<FakeEngine>);
        impl PlaybackEngine for SharedEngine {
            fn open(
                &self,
                path: &Path,
                looping: bool,
                on_complete: CompletionHook,
            ) -> Result<Arc<dyn PlaybackHandle>, AudioError> {
                self.0.open(path, looping, on_complete)
            }
        }

        // No data root: relative references cannot resolve.
        let manager = AudioSessionManager::new(
            Box::new(SharedEngine(engine)),
            SourceResolver::new(None, None),
            PlaybackConfig::default(),
        );

        let result = manager.start(7, "alarm.mp3", false, None, &[]);
        assert!(matches!(result, Err(AudioError::ResolutionFailed { .. })));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_teardown_all_clears_everything() {
        let (manager, engine) = manager_with_fake();

        manager.start(1, "a.mp3", false, None, &[]).unwrap();
        manager.start(2, "b.mp3", true, None, &[]).unwrap();
        manager.teardown_all();

        assert!(manager.is_empty());
        for handle in engine.handles() {
            assert!(handle.released.load(Ordering::SeqCst));
        }
    }

    #[test]
    fn test_playing_ids_excludes_drained_sessions() {
        let (manager, engine) = manager_with_fake();

        manager.start(1, "a.mp3", false, None, &[]).unwrap();
        manager.start(2, "b.mp3", false, None, &[]).unwrap();

        // Session 1 drains naturally; it stays registered but silent.
        engine.handles()[0].stop();

        assert!(!manager.is_empty());
        assert_eq!(manager.playing_ids(), vec![2]);
    }
}
