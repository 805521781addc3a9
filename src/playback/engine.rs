//! Playback backend seam
//!
//! The session core drives playback through these traits so the backend can
//! be swapped out (rodio in production, a scripted fake in tests).

use std::path::Path;
use std::sync::Arc;

use crate::error::AudioError;

/// Invoked once when a non-looping handle reaches natural end-of-stream.
///
/// Backends must not invoke the hook for looping handles, for handles that
/// were stopped or released, or more than once.
pub type CompletionHook = Box<dyn FnOnce() + Send>;

/// One opened playback unit, exclusively owned by a session.
///
/// Every operation must be safe to call on a handle that has already been
/// released: late calls from a racing timer are a no-op, not an error.
pub trait PlaybackHandle: Send + Sync {
    /// Begin audible playback
    fn start(&self);

    /// Whether the handle is currently producing audio
    fn is_playing(&self) -> bool;

    /// Apply a gain in [0.0, 1.0], uniformly across channels
    fn set_volume(&self, volume: f32);

    /// Halt playback
    fn stop(&self);

    /// Return the handle to a reusable neutral state
    fn reset(&self);

    /// Free the underlying decoder/output resources
    fn release(&self);
}

/// Factory for playback handles.
pub trait PlaybackEngine: Send + Sync {
    /// Open and prepare the source at `path`. Playback does not begin until
    /// `start` is called on the returned handle.
    fn open(
        &self,
        path: &Path,
        looping: bool,
        on_complete: CompletionHook,
    ) -> Result<Arc<dyn PlaybackHandle>, AudioError>;
}
