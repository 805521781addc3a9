//! Playback backend and source resolution
//!
//! The session core only ever talks to the `PlaybackEngine` /
//! `PlaybackHandle` traits; `output` provides the rodio implementation and
//! `source` maps logical references onto paths the backend can open.

pub mod engine;
pub mod output;
pub mod source;

// Re-export commonly used types
pub use engine::{CompletionHook, PlaybackEngine, PlaybackHandle};
pub use output::RodioEngine;
pub use source::SourceResolver;
