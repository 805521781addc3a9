//! Alarm audio session management
//!
//! Supervises concurrently active audio playback sessions, each keyed by a
//! caller-assigned id: per-session fade-in envelopes, an auto-stop deadline
//! bounding total playback time, and a completion notification for the host.
//!
//! ## Architecture
//!
//! ```text
//! AudioSessionManager
//!   ├── Session (id 1) ─┐
//!   ├── Session (id 2) ─┤ Concurrent playback
//!   └── Session (id n) ─┘
//!
//! Each Session has:
//!   ├── PlaybackHandle   (rodio sink behind a trait seam)
//!   ├── FadeScheduler    (optional: drives the FadeCurve tick by tick)
//!   └── AutoStopTimer    (force-stop + notification at the deadline)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use alarm_audio::{AudioSessionManager, FadeStep, PlaybackConfig};
//!
//! let manager = AudioSessionManager::with_default_output(PlaybackConfig::default());
//! manager.set_on_complete_listener(|id| println!("session {id} finished"));
//!
//! // Ramp to full volume over five seconds, stop after the configured cap.
//! manager.start(1, "assets/tones/chime.mp3", true, Some(5_000), &[])?;
//!
//! // Staircase fade through explicit control points.
//! let steps = [FadeStep::new(0, 0.0), FadeStep::new(10_000, 1.0)];
//! manager.start(2, "ringtones/classic.mp3", false, None, &steps)?;
//!
//! manager.stop(1);
//! manager.teardown_all();
//! ```

pub mod config;
pub mod error;
pub mod playback;
pub mod session;

// Re-export the public surface
pub use config::PlaybackConfig;
pub use error::{AppResult, AudioError, ConfigError};
pub use playback::{CompletionHook, PlaybackEngine, PlaybackHandle, RodioEngine, SourceResolver};
pub use session::{AudioSessionManager, FadeCurve, FadeLevel, FadeStep};
