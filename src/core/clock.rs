//! Game Clock
//!
//! Scene time that advances only with simulated frames. Animations read
//! elapsed time from here rather than counting frames, so playback speed
//! is independent of frame rate and stops while the scene is paused.

use serde::{Serialize, Deserialize};

/// Accumulated game time in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameClock {
    elapsed: f64,
    frames: u64,
}

impl GameClock {
    /// Clock at time zero.
    pub const fn new() -> Self {
        Self { elapsed: 0.0, frames: 0 }
    }

    /// Clock starting at an arbitrary time (tests, restored scenes).
    pub const fn starting_at(elapsed: f64) -> Self {
        Self { elapsed, frames: 0 }
    }

    /// Advance by one frame of `dt` seconds. Negative steps are ignored.
    pub fn advance(&mut self, dt: f32) {
        if dt > 0.0 {
            self.elapsed += f64::from(dt);
        }
        self.frames += 1;
    }

    /// Current game time in seconds.
    #[inline]
    pub fn now(&self) -> f64 {
        self.elapsed
    }

    /// Number of frames advanced.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
