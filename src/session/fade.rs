//! Fade-in curves
//!
//! A fade curve maps elapsed playback time to a target volume. Volume is a
//! pure function of elapsed time, never an accumulator, so a late or missed
//! tick cannot drift the envelope.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AudioError;

/// One control point of a staircase fade, as supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeStep {
    /// Offset from session start, in milliseconds
    pub time_ms: u64,

    /// Target volume at this offset (0.0-1.0)
    pub volume: f32,
}

impl FadeStep {
    /// Create a new control point
    pub fn new(time_ms: u64, volume: f32) -> Self {
        Self { time_ms, volume }
    }
}

/// Volume computed for one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeLevel {
    /// Fade still in progress; apply this gain
    Ramping(f32),

    /// Curve complete; apply this terminal gain once more, then stop ticking
    Done(f32),
}

impl FadeLevel {
    /// The gain carried by this level, regardless of completion state
    pub fn gain(&self) -> f32 {
        match self {
            FadeLevel::Ramping(gain) | FadeLevel::Done(gain) => *gain,
        }
    }

    /// Whether the curve reported completion
    pub fn is_done(&self) -> bool {
        matches!(self, FadeLevel::Done(_))
    }
}

/// A volume envelope applied while a session ramps up.
///
/// Immutable once constructed; `volume_at` is the only operation the
/// scheduler needs.
#[derive(Debug, Clone, PartialEq)]
pub enum FadeCurve {
    /// Uniform ramp from 0.0 to 1.0 over the given duration
    Linear { duration_ms: u64 },

    /// Piecewise ramp through ordered control points, linearly interpolated
    /// between neighbours
    Staircase { steps: Vec<FadeStep> },
}

impl FadeCurve {
    /// Build a curve from the host's start request.
    ///
    /// Non-empty steps win over a plain duration; a zero/absent duration with
    /// no steps means no fade at all. Malformed staircases are rejected here
    /// so the scheduler never has to reason about them.
    pub fn from_request(
        fade_duration_ms: Option<u64>,
        fade_steps: &[FadeStep],
    ) -> Result<Option<FadeCurve>, AudioError> {
        if !fade_steps.is_empty() {
            let curve = FadeCurve::Staircase {
                steps: fade_steps.to_vec(),
            };
            curve.validate()?;
            return Ok(Some(curve));
        }

        match fade_duration_ms {
            Some(duration_ms) if duration_ms > 0 => Ok(Some(FadeCurve::Linear { duration_ms })),
            _ => Ok(None),
        }
    }

    /// Check curve parameters: staircase times must be non-decreasing and
    /// volumes inside [0.0, 1.0].
    pub fn validate(&self) -> Result<(), AudioError> {
        match self {
            FadeCurve::Linear { duration_ms } => {
                if *duration_ms == 0 {
                    return Err(AudioError::InvalidFadeSpec(
                        "linear fade duration must be non-zero".to_string(),
                    ));
                }
            }
            FadeCurve::Staircase { steps } => {
                if steps.is_empty() {
                    return Err(AudioError::InvalidFadeSpec(
                        "staircase fade requires at least one step".to_string(),
                    ));
                }
                for pair in steps.windows(2) {
                    if pair[1].time_ms < pair[0].time_ms {
                        return Err(AudioError::InvalidFadeSpec(format!(
                            "step times must be non-decreasing ({}ms after {}ms)",
                            pair[1].time_ms, pair[0].time_ms
                        )));
                    }
                }
                for step in steps {
                    if !step.volume.is_finite() || step.volume < 0.0 || step.volume > 1.0 {
                        return Err(AudioError::InvalidFadeSpec(format!(
                            "step volume {} outside 0.0-1.0",
                            step.volume
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Compute the volume for the given elapsed time since session start.
    pub fn volume_at(&self, elapsed: Duration) -> FadeLevel {
        let t = elapsed.as_millis() as u64;

        match self {
            FadeCurve::Linear { duration_ms } => {
                if t >= *duration_ms {
                    FadeLevel::Done(1.0)
                } else {
                    FadeLevel::Ramping(t as f32 / *duration_ms as f32)
                }
            }
            FadeCurve::Staircase { steps } => {
                let next_index = match steps.iter().position(|s| s.time_ms >= t) {
                    Some(index) => index,
                    // Past the last control point (or no points at all):
                    // the ramp is over.
                    None => {
                        return match steps.last() {
                            Some(last) => FadeLevel::Done(last.volume),
                            None => FadeLevel::Done(1.0),
                        }
                    }
                };

                if next_index == 0 {
                    return FadeLevel::Ramping(steps[0].volume);
                }

                let prev = steps[next_index - 1];
                let next = steps[next_index];

                // Zero-width interval: no position to interpolate within.
                if next.time_ms == prev.time_ms {
                    return FadeLevel::Ramping(next.volume);
                }

                let ratio = (t - prev.time_ms) as f32 / (next.time_ms - prev.time_ms) as f32;
                FadeLevel::Ramping(prev.volume + (next.volume - prev.volume) * ratio)
            }
        }
    }

    /// The volume the session should start at, before the first tick lands.
    pub fn initial_volume(&self) -> f32 {
        self.volume_at(Duration::ZERO).gain()
    }
}
