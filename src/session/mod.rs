//! Session lifecycle and fade scheduling
//!
//! Everything that supervises a playback session once it has been opened:
//! the fade curves, the tick thread that drives them, the auto-stop
//! deadline and the manager that owns the key→session map.

pub mod auto_stop;
pub mod fade;
pub mod manager;
pub mod scheduler;

// Re-export commonly used types
pub use auto_stop::AutoStopTimer;
pub use fade::{FadeCurve, FadeLevel, FadeStep};
pub use manager::AudioSessionManager;
pub use scheduler::FadeScheduler;
