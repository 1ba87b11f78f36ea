//! Game Logic Module
//!
//! All scene simulation code. Deterministic for a given seed and input.
//!
//! ## Module Structure
//!
//! - `environment`: Environment tags and the `WorldSurface` query contract
//! - `map`: Tile map level geometry
//! - `body`: Physics bodies, gravity policies, the position hook
//! - `collision`: Pixel-stepped pull-out resolver
//! - `input`: Input frames, edges and recordings
//! - `player`: Movement state machine
//! - `carry`: Carryable props
//! - `dance`: Rain dance minigame
//! - `animation`: Sprite sheets and the animation sequencer
//! - `effects`: Particle and sound effects bus
//! - `config`: Tuning and JSON loading
//! - `events`: Game events
//! - `state`: Scene state
//! - `tick`: Per-frame loop and replay

pub mod environment;
pub mod map;
pub mod body;
pub mod collision;
pub mod input;
pub mod player;
pub mod carry;
pub mod dance;
pub mod animation;
pub mod effects;
pub mod config;
pub mod events;
pub mod state;
pub mod tick;

// Re-export key types
pub use environment::{BodyId, Environment, EnvironmentSet, WorldSurface};
pub use map::TileMap;
pub use body::{PhysicsBody, JumpKey};
pub use collision::{Resolver, Resolution, ResolveReport};
pub use input::{InputFrame, InputRecording};
pub use player::{Player, Pose, ActionHint};
pub use animation::{Animator, AnimationError, DrawCommand, SpriteLibrary};
pub use effects::{Effect, Effects};
pub use config::{SimulationConfig, ConfigError};
pub use state::SceneState;
pub use tick::TickResult;
pub use events::GameEvent;
