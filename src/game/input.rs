//! Input Intents and Recording
//!
//! The core only sees which controls are held each tick. Press and release
//! edges are derived by diffing consecutive frames, so a recording of held
//! states replays exactly the same intents.

use serde::{Serialize, Deserialize};
use crate::core::hash::{StateHash, StateHasher};

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Held controls for a single tick.
///
/// NO tick field - tick is stored separately for compression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputFrame {
    /// Held flags (packed bits):
    /// - Bit 0: Left
    /// - Bit 1: Right
    /// - Bit 2: Jump
    /// - Bit 3: Down (drop through)
    /// - Bit 4: Action (dance / throw)
    pub flags: u8,
}

impl InputFrame {
    /// Left flag bit
    pub const LEFT: u8 = 0x01;

    /// Right flag bit
    pub const RIGHT: u8 = 0x02;

    /// Jump flag bit
    pub const JUMP: u8 = 0x04;

    /// Down flag bit
    pub const DOWN: u8 = 0x08;

    /// Action flag bit
    pub const ACTION: u8 = 0x10;

    /// Nothing held.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Frame with exactly these flags held.
    pub const fn from_flags(flags: u8) -> Self {
        Self { flags }
    }

    /// Builder: also hold `flag`.
    pub const fn with(self, flag: u8) -> Self {
        Self { flags: self.flags | flag }
    }

    /// Whether `flag` is held.
    #[inline]
    pub fn held(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Left held.
    #[inline]
    pub fn left(&self) -> bool {
        self.held(Self::LEFT)
    }

    /// Right held.
    #[inline]
    pub fn right(&self) -> bool {
        self.held(Self::RIGHT)
    }

    /// Jump held.
    #[inline]
    pub fn jump(&self) -> bool {
        self.held(Self::JUMP)
    }

    /// Down held.
    #[inline]
    pub fn down(&self) -> bool {
        self.held(Self::DOWN)
    }

    /// Action held.
    #[inline]
    pub fn action(&self) -> bool {
        self.held(Self::ACTION)
    }

    /// Nothing held.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.flags == 0
    }

    /// Set or clear a flag.
    #[inline]
    pub fn set(&mut self, flag: u8, held: bool) {
        if held {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Edges relative to the previous tick's frame.
    #[inline]
    pub fn edges_from(&self, previous: InputFrame) -> InputEdges {
        InputEdges {
            pressed: self.flags & !previous.flags,
            released: previous.flags & !self.flags,
        }
    }
}

/// Press and release edges for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputEdges {
    /// Flags that went down this tick
    pub pressed: u8,
    /// Flags that went up this tick
    pub released: u8,
}

impl InputEdges {
    /// `flag` went down this tick.
    #[inline]
    pub fn pressed(&self, flag: u8) -> bool {
        self.pressed & flag != 0
    }

    /// `flag` went up this tick.
    #[inline]
    pub fn released(&self, flag: u8) -> bool {
        self.released & flag != 0
    }
}

/// Delta-compressed input entry.
///
/// Only stored when input CHANGES (not every tick).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick when this input state began
    pub tick: u32,
    /// The new input state
    pub frame: InputFrame,
}

// =============================================================================
// RECORDING
// =============================================================================

/// Input recording for one scene run.
///
/// Together with the seed this is everything needed to reproduce a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputRecording {
    /// RNG seed the scene was created with
    pub rng_seed: u64,

    /// Last recorded tick
    pub end_tick: u32,

    /// Delta-compressed input data.
    /// Only stores ticks where input CHANGED.
    deltas: Vec<InputDelta>,

    /// Last recorded input (for delta comparison)
    #[serde(skip)]
    last_frame: InputFrame,
}

impl InputRecording {
    /// Create an empty recording.
    pub fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            end_tick: 0,
            deltas: Vec::new(),
            last_frame: InputFrame::new(),
        }
    }

    /// Record input for a tick.
    ///
    /// Only stores if input changed from previous frame.
    pub fn record(&mut self, tick: u32, frame: InputFrame) {
        self.end_tick = tick;

        if frame != self.last_frame {
            self.deltas.push(InputDelta { tick, frame });
            self.last_frame = frame;
        }
    }

    /// Input held at a specific tick.
    pub fn frame_at(&self, tick: u32) -> InputFrame {
        // Last delta at or before this tick
        let idx = self.deltas.partition_point(|d| d.tick <= tick);

        if idx == 0 {
            InputFrame::new()
        } else {
            self.deltas[idx - 1].frame
        }
    }

    /// All deltas.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of delta entries.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Set the last tick (call when the run ends).
    pub fn finalize(&mut self, end_tick: u32) {
        self.end_tick = end_tick;
    }

    /// Hash of the seed and all deltas.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_input_recording();
        hasher.update_u64(self.rng_seed);
        hasher.update_u32(self.end_tick);
        hasher.update_u32(self.deltas.len() as u32);
        for delta in &self.deltas {
            hasher.update_u32(delta.tick);
            hasher.update_u8(delta.frame.flags);
        }
        hasher.finalize()
    }

    /// Iterate every tick from 0 to `end_tick` with its held input.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            recording: self,
            current_tick: 0,
            delta_idx: 0,
            current_frame: InputFrame::new(),
        }
    }
}

/// Iterator for replaying inputs tick-by-tick.
pub struct ReplayIterator<'a> {
    recording: &'a InputRecording,
    current_tick: u32,
    delta_idx: usize,
    current_frame: InputFrame,
}

impl<'a> Iterator for ReplayIterator<'a> {
    type Item = (u32, InputFrame);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_tick > self.recording.end_tick {
            return None;
        }

        while let Some(delta) = self.recording.deltas.get(self.delta_idx) {
            if delta.tick > self.current_tick {
                break;
            }
            self.current_frame = delta.frame;
            self.delta_idx += 1;
        }

        let result = (self.current_tick, self.current_frame);
        self.current_tick += 1;
        Some(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
