//! Core deterministic primitives.
//!
//! Everything the simulation builds on: vectors, the seeded RNG, state
//! hashing for replay verification, and the game clock.

pub mod vec2;
pub mod rng;
pub mod hash;
pub mod clock;

// Re-export core types
pub use vec2::Vec2;
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher, compute_state_hash};
pub use clock::GameClock;
