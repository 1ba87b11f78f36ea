//! # Rainfall Runtime
//!
//! Deterministic character runtime for a small 2D platformer: player
//! movement, pixel-stepped collision against tagged terrain, carryable
//! props, a rain dance minigame and tag-based sprite animation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     RAINFALL RUNTIME                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Deterministic primitives                │
//! │  ├── vec2.rs       - 2D vector                               │
//! │  ├── rng.rs        - Deterministic Xorshift128+ PRNG         │
//! │  ├── hash.rs       - State hashing for replay checks         │
//! │  └── clock.rs      - Game clock                              │
//! │                                                              │
//! │  game/             - Scene logic (deterministic)             │
//! │  ├── environment.rs- Tags and the world query contract       │
//! │  ├── map.rs        - Tile map levels                         │
//! │  ├── body.rs       - Physics bodies and gravity              │
//! │  ├── collision.rs  - Pull-out collision resolver             │
//! │  ├── player.rs     - Movement state machine                  │
//! │  ├── carry.rs      - Carryable props                         │
//! │  ├── dance.rs      - Rain dance                              │
//! │  ├── animation.rs  - Animation sequencer                     │
//! │  ├── effects.rs    - Particle and sound effects              │
//! │  ├── config.rs     - Tuning                                  │
//! │  ├── input.rs      - Input frames and recordings             │
//! │  ├── state.rs      - Scene state                             │
//! │  └── tick.rs       - Per-frame loop and replay               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The `core/` and `game/` modules never read the system clock and never
//! iterate a HashMap. All randomness comes from the seeded Xorshift128+.
//! Given the same level, seed and input recording a scene produces the
//! same state hash on every run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use core::vec2::Vec2;
pub use core::rng::DeterministicRng;
pub use game::input::{InputFrame, InputDelta, InputRecording};
pub use game::state::SceneState;
pub use game::config::SimulationConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
