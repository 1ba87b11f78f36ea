//! Scene State
//!
//! Everything one tick reads and writes: the world, the player, the props,
//! the clock and the RNG, plus the animators that turn poses into draw
//! commands. Props live in a BTreeMap so every pass visits them in id order.

use std::collections::BTreeMap;

use crate::core::clock::GameClock;
use crate::core::hash::{StateHash, compute_state_hash};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::animation::{Animator, SpriteLibrary};
use crate::game::carry::{CarryProfile, Prop};
use crate::game::config::SimulationConfig;
use crate::game::environment::{BodyId, WorldSurface};
use crate::game::events::GameEvent;
use crate::game::map::TileMap;
use crate::game::player::Player;

/// Id the player always has. Props are numbered after it.
pub const PLAYER_ID: BodyId = BodyId(0);

/// One running scene.
#[derive(Debug)]
pub struct SceneState {
    /// Ticks simulated so far
    pub tick: u32,

    /// Game time
    pub clock: GameClock,

    /// Level geometry
    pub world: TileMap,

    /// The player
    pub player: Player,

    /// Props by id
    pub props: BTreeMap<BodyId, Prop>,

    /// Scene RNG
    pub rng: DeterministicRng,

    /// Seed the RNG started from
    pub rng_seed: u64,

    /// Sprite resources
    pub(crate) sprites: SpriteLibrary,

    /// Player animation
    pub(crate) player_animator: Animator,

    /// Prop animations by id
    pub(crate) prop_animators: BTreeMap<BodyId, Animator>,

    /// Events waiting to be taken
    pending_events: Vec<GameEvent>,

    next_id: u32,
    config: SimulationConfig,
}

impl SceneState {
    /// New scene with the player standing at `spawn`.
    pub fn new(world: TileMap, spawn: Vec2, rng_seed: u64, config: &SimulationConfig, sprites: SpriteLibrary) -> Self {
        let player = Player::new(PLAYER_ID, spawn, config);
        let player_animator = Animator::new(sprites.get_or_placeholder("player"));

        Self {
            tick: 0,
            clock: GameClock::new(),
            world,
            player,
            props: BTreeMap::new(),
            rng: DeterministicRng::new(rng_seed),
            rng_seed,
            sprites,
            player_animator,
            prop_animators: BTreeMap::new(),
            pending_events: Vec::new(),
            next_id: PLAYER_ID.0 + 1,
            config: config.clone(),
        }
    }

    /// Place a prop and return its id.
    pub fn add_prop(&mut self, profile: CarryProfile, position: Vec2) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;

        let animator = Animator::new(self.sprites.get_or_placeholder(&profile.sprite));
        let prop = Prop::new(id, profile, position, self.config.prop_gravity, self.config.pixels_per_meter);
        self.props.insert(id, prop);
        self.prop_animators.insert(id, animator);
        id
    }

    /// Prop by id.
    pub fn prop(&self, id: BodyId) -> Option<&Prop> {
        self.props.get(&id)
    }

    /// Configuration the scene was built with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Player animator.
    pub fn player_animator(&self) -> &Animator {
        &self.player_animator
    }

    /// Queue an event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Compute hash of current state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_f64(self.clock.now());
            hasher.update_bool(self.world.is_raining());

            self.player.hash_into(hasher);

            // Sorted by id (BTreeMap guarantees this)
            for prop in self.props.values() {
                prop.hash_into(hasher);
            }

            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);
        })
    }
}
