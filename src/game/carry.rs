//! Carryable Props
//!
//! Props are plain physics bodies with a `CarryProfile` describing how
//! they behave in a mover's hands: where they sit, how hard they are
//! thrown, whether a throw needs a target, and what they settle into
//! once they land somewhere meaningful. The mover reads the profile and
//! never asks what kind of prop it holds.

use std::sync::Arc;
use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;
use crate::core::vec2::Vec2;
use crate::game::body::{ConstantGravity, MotionFlags, PhysicsBody};
use crate::game::collision::{Resolver, ResolveReport};
use crate::game::environment::{BodyId, Environment, EnvironmentSet, WorldSurface};

/// Sub-state a prop settles into. Cleared on pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PropState {
    /// Loose: falls, can be picked up
    #[default]
    Free,
    /// Resting on water
    Floating,
    /// Planted in soil
    Planted,
}

impl PropState {
    /// Animation tag for this state.
    pub fn tag(self) -> &'static str {
        match self {
            PropState::Free => "idle",
            PropState::Floating => "floating",
            PropState::Planted => "planted",
        }
    }
}

/// Where a throw should land, probed relative to the carrier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThrowTarget {
    /// Probe offset from the carrier's feet (pixels)
    pub probe: Vec2,
    /// Tag the probe must report
    pub environment: Environment,
    /// Carrier facing the throw needs
    pub facing: i8,
}

/// Capability record for one prop category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarryProfile {
    /// Sprite id
    pub sprite: String,
    /// Body size (pixels)
    pub size: Vec2,
    /// Cosmetic offset while carried, added on top of the carrier's head
    pub carry_offset: Vec2,
    /// Throw velocity (m/s); x is mirrored by facing
    pub throw_velocity: Vec2,
    /// Target rule for hints and required throws
    pub target: Option<ThrowTarget>,
    /// Refuse to throw unless the target probe matches
    pub target_required: bool,
    /// Velocity the prop is dropped with when the carrier drowns
    pub release_when_drowning: Option<Vec2>,
    /// Prop faces the same way as its carrier
    pub mirror_with_carrier: bool,
    /// Tag the prop settles on and the state it settles into
    pub settles: Option<(Environment, PropState)>,
}

impl CarryProfile {
    /// Stone: only thrown into water off to the left, floats there.
    pub fn stone() -> Self {
        Self {
            sprite: "stone".into(),
            size: Vec2::new(10.0, 8.0),
            carry_offset: Vec2::ZERO,
            throw_velocity: Vec2::new(10.0, 10.0),
            target: Some(ThrowTarget {
                probe: Vec2::new(-100.0, -20.0),
                environment: Environment::Water,
                facing: -1,
            }),
            target_required: true,
            release_when_drowning: Some(Vec2::new(-2.0, 10.0)),
            mirror_with_carrier: true,
            settles: Some((Environment::Water, PropState::Floating)),
        }
    }

    /// Seed: carried slightly forward, plants in soil.
    pub fn seed() -> Self {
        Self {
            sprite: "seed".into(),
            size: Vec2::new(6.0, 6.0),
            carry_offset: Vec2::new(4.0, 0.0),
            throw_velocity: Vec2::new(5.0, 5.0),
            target: Some(ThrowTarget {
                probe: Vec2::new(-30.0, 2.0),
                environment: Environment::Soil,
                facing: -1,
            }),
            target_required: false,
            release_when_drowning: None,
            mirror_with_carrier: false,
            settles: Some((Environment::Soil, PropState::Planted)),
        }
    }

    /// Wood: thrown anywhere.
    pub fn wood() -> Self {
        Self {
            sprite: "wood".into(),
            size: Vec2::new(14.0, 6.0),
            carry_offset: Vec2::ZERO,
            throw_velocity: Vec2::new(5.0, 5.0),
            target: None,
            target_required: false,
            release_when_drowning: None,
            mirror_with_carrier: false,
            settles: None,
        }
    }

    /// Whether the target probe matches for a carrier at `at` facing `direction`.
    pub fn target_matches<W: WorldSurface + ?Sized>(&self, world: &W, at: Vec2, direction: i8) -> bool {
        match self.target {
            Some(target) => {
                direction == target.facing
                    && world.classify(at.x + target.probe.x, at.y + target.probe.y) == target.environment
            }
            None => false,
        }
    }

    /// Whether a throw is allowed right now.
    pub fn can_throw<W: WorldSurface + ?Sized>(&self, world: &W, at: Vec2, direction: i8) -> bool {
        !self.target_required || self.target_matches(world, at, direction)
    }
}

/// A carryable prop in the scene.
#[derive(Clone, Debug)]
pub struct Prop {
    /// World identity
    pub id: BodyId,
    /// Physics
    pub body: PhysicsBody,
    /// Capabilities
    pub profile: CarryProfile,
    /// Settled sub-state
    pub state: PropState,
    /// Facing
    pub direction: i8,
}

impl Prop {
    /// Free prop resting at `position`.
    pub fn new(id: BodyId, profile: CarryProfile, position: Vec2, gravity: f32, pixels_per_meter: f32) -> Self {
        let body = PhysicsBody::new(
            position,
            profile.size.x,
            profile.size.y,
            Arc::new(ConstantGravity(gravity)),
            pixels_per_meter,
        );
        Self { id, body, profile, state: PropState::Free, direction: 1 }
    }

    /// Attach to a carrier: clear the sub-state, stop, and sit at `at`.
    pub fn pick_up(&mut self, at: Vec2) {
        self.body.set_floating(false);
        self.state = PropState::Free;
        self.body.position = at;
        self.body.set_velocity(0.0, 0.0);
    }

    /// Position while carried by a body at `carrier` of `carrier_height`.
    pub fn carried_position(&self, carrier: Vec2, carrier_height: f32) -> Vec2 {
        Vec2::new(
            carrier.x + self.profile.carry_offset.x,
            carrier.y + carrier_height + self.profile.carry_offset.y,
        )
    }

    /// Follow the carrier for this tick.
    pub fn follow(&mut self, carrier: Vec2, carrier_height: f32, carrier_direction: i8) {
        self.body.position = self.carried_position(carrier, carrier_height);
        if self.profile.mirror_with_carrier {
            self.direction = carrier_direction;
        }
    }

    /// Detach with `velocity`.
    pub fn release(&mut self, velocity: Vec2) {
        self.body.set_velocity(velocity.x, velocity.y);
    }

    /// Feed the prop's dynamic state into `hasher`.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_vec2(self.body.position);
        hasher.update_vec2(self.body.velocity());
        hasher.update_bool(self.body.is_floating());
        hasher.update_str(self.state.tag());
        hasher.update_u8(self.direction as u8);
    }

    /// Integrate and resolve a loose prop. Returns a newly settled state.
    pub fn update<W: WorldSurface + ?Sized>(&mut self, world: &W, dt: f32) -> Option<PropState> {
        let mut resolver = Resolver::new(world, self.id);
        let report: ResolveReport = self.body.integrate(dt, MotionFlags::default(), &mut resolver);

        // Loose props stop where they land
        if report.landed() {
            self.body.set_velocity_x(0.0);
        }

        if self.state != PropState::Free {
            return None;
        }
        let (environment, settled) = self.profile.settles?;
        let below = world.classify_filtered(
            self.body.position.x,
            self.body.position.y - 1.0,
            &[self.id],
            EnvironmentSet::EMPTY,
        );
        if below != environment {
            return None;
        }

        self.state = settled;
        self.body.set_velocity(0.0, 0.0);
        if settled == PropState::Floating {
            self.body.set_floating(true);
        }
        tracing::debug!(id = %self.id, state = ?settled, "prop settled");
        Some(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::TileMap;

    fn pond() -> TileMap {
        // Water pool in the middle, soil on the right
        TileMap::from_ascii(
            "\
..........
..........
..........
###~~~#%%#
##########
",
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_pick_up_clears_state() {
        let mut stone = Prop::new(BodyId(1), CarryProfile::stone(), Vec2::new(40.0, 20.0), 35.0, 18.0);
        stone.state = PropState::Floating;
        stone.body.set_floating(true);
        stone.body.set_velocity(1.0, 2.0);

        stone.pick_up(Vec2::new(5.0, 30.0));
        assert_eq!(stone.state, PropState::Free);
        assert!(!stone.body.is_floating());
        assert_eq!(stone.body.velocity(), Vec2::ZERO);
        assert_eq!(stone.body.position, Vec2::new(5.0, 30.0));
    }

    #[test]
    fn test_carried_position_uses_offset() {
        let seed = Prop::new(BodyId(2), CarryProfile::seed(), Vec2::ZERO, 35.0, 18.0);
        assert_eq!(seed.carried_position(Vec2::new(10.0, 5.0), 33.0), Vec2::new(14.0, 38.0));

        let wood = Prop::new(BodyId(3), CarryProfile::wood(), Vec2::ZERO, 35.0, 18.0);
        assert_eq!(wood.carried_position(Vec2::new(10.0, 5.0), 33.0), Vec2::new(10.0, 38.0));
    }

    #[test]
    fn test_follow_mirrors_stone_only() {
        let mut stone = Prop::new(BodyId(1), CarryProfile::stone(), Vec2::ZERO, 35.0, 18.0);
        let mut wood = Prop::new(BodyId(3), CarryProfile::wood(), Vec2::ZERO, 35.0, 18.0);
        stone.follow(Vec2::ZERO, 33.0, -1);
        wood.follow(Vec2::ZERO, 33.0, -1);
        assert_eq!(stone.direction, -1);
        assert_eq!(wood.direction, 1);
    }

    #[test]
    fn test_stone_target_requires_water_to_the_left() {
        let map = pond();
        let stone = CarryProfile::stone();
        // Water tiles span x in [30, 60), y in [10, 20)
        let at = Vec2::new(145.0, 35.0);
        assert!(stone.target_matches(&map, at, -1));
        assert!(stone.can_throw(&map, at, -1));
        assert!(!stone.can_throw(&map, at, 1));
        assert!(!stone.can_throw(&map, Vec2::new(175.0, 35.0), -1));

        // Wood has no target and never needs one
        assert!(CarryProfile::wood().can_throw(&map, at, 1));
    }

    #[test]
    fn test_stone_floats_on_water() {
        let map = pond();
        let mut stone = Prop::new(BodyId(1), CarryProfile::stone(), Vec2::new(45.0, 30.0), 35.0, 18.0);

        let mut settled = None;
        for _ in 0..120 {
            if let Some(state) = stone.update(&map, 1.0 / 60.0) {
                settled = Some(state);
                break;
            }
        }
        assert_eq!(settled, Some(PropState::Floating));
        assert!(stone.body.is_floating());
        // Pulled out one whole pixel at a time, so within a pixel of the surface
        assert!((20.0..21.0).contains(&stone.body.position.y));
        assert_eq!(stone.body.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_seed_plants_in_soil() {
        let map = pond();
        let mut seed = Prop::new(BodyId(2), CarryProfile::seed(), Vec2::new(75.0, 30.0), 35.0, 18.0);
        let mut settled = None;
        for _ in 0..120 {
            settled = settled.or(seed.update(&map, 1.0 / 60.0));
        }
        assert_eq!(settled, Some(PropState::Planted));
        assert_eq!(seed.state, PropState::Planted);
    }

    #[test]
    fn test_wood_never_settles() {
        let map = pond();
        let mut wood = Prop::new(BodyId(3), CarryProfile::wood(), Vec2::new(45.0, 30.0), 35.0, 18.0);
        for _ in 0..120 {
            assert_eq!(wood.update(&map, 1.0 / 60.0), None);
        }
        assert!((20.0..21.0).contains(&wood.body.position.y));
    }
}
