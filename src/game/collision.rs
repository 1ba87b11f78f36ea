//! Collision Resolution
//!
//! Pixel-stepped pull-out against a `WorldSurface`. After naive
//! integration a body may sit inside the world; each probe walks it out
//! one unit at a time until the probe point is clear. Every loop is
//! bounded by the world's extent so malformed geometry cannot hang a tick.
//!
//! Order per step: ground, then ceiling (only if ground did not land),
//! then wall. The outcome is reported per axis as a `Resolution` so the
//! caller never has to infer a bounce from a step count.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::body::{launch_velocity, PhysicsBody, PositionHook};
use crate::game::environment::{BodyId, Environment, EnvironmentSet, WorldSurface};

// =============================================================================
// MASKS
// =============================================================================

/// Which tags each probe ignores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionMask {
    /// Ignored by the ground probe normally
    pub ground: EnvironmentSet,
    /// Ignored by the ground probe while dropping through
    pub drop_through: EnvironmentSet,
    /// Ignored by the ceiling probe
    pub ceiling: EnvironmentSet,
    /// Ignored by the wall probe
    pub wall: EnvironmentSet,
}

/// Tags that never block a head or a side.
const PASSABLE: EnvironmentSet =
    EnvironmentSet::of(&[Environment::Soil, Environment::Bounce, Environment::RainCloud]);

impl Default for CollisionMask {
    fn default() -> Self {
        Self {
            ground: EnvironmentSet::EMPTY,
            drop_through: EnvironmentSet::of(&[Environment::Platform, Environment::Water]),
            ceiling: PASSABLE,
            wall: PASSABLE,
        }
    }
}

impl CollisionMask {
    /// Ground mask for the current drop-through request.
    #[inline]
    pub fn ground_for(&self, drop_through: bool) -> EnvironmentSet {
        if drop_through {
            self.drop_through
        } else {
            self.ground
        }
    }

    /// Ceiling mask; dropping through also passes the drop-through tags overhead.
    #[inline]
    pub fn ceiling_for(&self, drop_through: bool) -> EnvironmentSet {
        if drop_through {
            self.ceiling.union(self.drop_through)
        } else {
            self.ceiling
        }
    }

    /// Wall mask; dropping through also passes the drop-through tags sideways.
    #[inline]
    pub fn wall_for(&self, drop_through: bool) -> EnvironmentSet {
        if drop_through {
            self.wall.union(self.drop_through)
        } else {
            self.wall
        }
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// What a probe did on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// No correction
    #[default]
    None,
    /// Pulled out of the ground; vertical velocity zeroed
    Landed,
    /// Launched off a bounce surface; velocity kept
    Bounced,
    /// Pushed out of a ceiling or wall; that axis' velocity zeroed
    Blocked,
}

/// Ground probe result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroundContact {
    /// Feet were clear, or the body was ascending
    Clear,
    /// Pulled up out of the ground
    Landed {
        /// Unit steps taken
        steps: u32,
    },
    /// First contact was a bounce surface
    Bounced {
        /// Unit steps taken
        steps: u32,
    },
}

/// Full outcome of one resolution pass.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ResolveReport {
    /// Ground/ceiling outcome
    pub vertical: Resolution,
    /// Wall outcome
    pub horizontal: Resolution,
    /// Ground pull-out steps (zero on a bounce)
    pub ground_steps: u32,
    /// Ceiling pull-out steps
    pub ceiling_steps: u32,
    /// Wall pull-out steps
    pub wall_steps: u32,
    /// Vertical velocity before resolution (m/s)
    pub impact_velocity: f32,
}

impl ResolveReport {
    /// Pulled out of the ground this step.
    #[inline]
    pub fn landed(&self) -> bool {
        self.vertical == Resolution::Landed
    }

    /// Bounced this step.
    #[inline]
    pub fn bounced(&self) -> bool {
        self.vertical == Resolution::Bounced
    }
}

// =============================================================================
// PROBES
// =============================================================================

#[inline]
fn step_limit(extent: f32) -> u32 {
    extent.max(0.0).ceil() as u32
}

/// Step the body up while its feet collide. Only runs when vy ≤ 0.
pub fn pull_out_of_ground<W: WorldSurface + ?Sized>(
    world: &W,
    body: &mut PhysicsBody,
    id: BodyId,
    ignore: EnvironmentSet,
) -> GroundContact {
    if body.velocity().y > 0.0 {
        return GroundContact::Clear;
    }

    let exclude = [id];
    let height = world.world_height();
    let limit = step_limit(height);

    let first = world.classify_filtered(body.position.x, body.position.y, &exclude, ignore);
    if !first.is_some() {
        return GroundContact::Clear;
    }

    let mut steps = 0;
    let mut hit = first;
    while hit.is_some() && body.position.y < height && steps < limit {
        body.position.y += 1.0;
        steps += 1;
        #[cfg(feature = "debug-tracing")]
        tracing::trace!(%id, y = body.position.y, %hit, "ground step");
        hit = world.classify_filtered(body.position.x, body.position.y, &exclude, ignore);
    }

    // Whole steps overshoot by the fractional depth; rest on the surface instead
    let settled = body.position.y.floor();
    if steps > 0
        && settled < body.position.y
        && !world.classify_filtered(body.position.x, settled, &exclude, ignore).is_some()
    {
        body.position.y = settled;
    }

    match first {
        Environment::Bounce => GroundContact::Bounced { steps },
        _ if steps > 0 => GroundContact::Landed { steps },
        _ => GroundContact::Clear,
    }
}

/// Step the body down while its top edge collides.
pub fn pull_out_of_ceiling<W: WorldSurface + ?Sized>(
    world: &W,
    body: &mut PhysicsBody,
    id: BodyId,
    ignore: EnvironmentSet,
) -> u32 {
    let exclude = [id];
    let limit = step_limit(world.world_height());

    let mut steps = 0;
    while body.position.y > 0.0
        && steps < limit
        && world.classify_filtered(body.position.x, body.top(), &exclude, ignore).is_some()
    {
        body.position.y -= 1.0;
        steps += 1;
        #[cfg(feature = "debug-tracing")]
        tracing::trace!(%id, y = body.position.y, "ceiling step");
    }
    steps
}

/// Step the body away from a wall at its leading edge.
///
/// The probe spans the middle half of the body, from `y + 3/4·height`
/// down `height/2`, so steps and floors do not register as walls.
pub fn pull_out_of_wall<W: WorldSurface + ?Sized>(
    world: &W,
    body: &mut PhysicsBody,
    id: BodyId,
    ignore: EnvironmentSet,
) -> u32 {
    let exclude = [id];
    let limit = step_limit(world.world_width());
    let (edge, shift) = if body.velocity().x > 0.0 {
        (body.width / 2.0, -1.0)
    } else {
        (-body.width / 2.0, 1.0)
    };

    let mut steps = 0;
    while steps < limit
        && world.classify_vertical_line(
            body.position.x + edge,
            body.position.y + body.height * 3.0 / 4.0,
            body.height / 2.0,
            &exclude,
            ignore,
        )
    {
        body.position.x += shift;
        steps += 1;
        #[cfg(feature = "debug-tracing")]
        tracing::trace!(%id, x = body.position.x, "wall step");
    }
    steps
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Collision-correcting position hook for one body.
pub struct Resolver<'w, W: WorldSurface + ?Sized> {
    /// World to resolve against
    pub world: &'w W,
    /// The body's own id, excluded from every query
    pub id: BodyId,
    /// Probe masks
    pub mask: CollisionMask,
    /// Ignore the drop-through tags on the ground probe
    pub drop_through: bool,
    /// Bounce height in meters; `None` lands on bounce surfaces instead
    pub bounce_height: Option<f32>,
}

impl<'w, W: WorldSurface + ?Sized> Resolver<'w, W> {
    /// Resolver with default masks and no bounce.
    pub fn new(world: &'w W, id: BodyId) -> Self {
        Self {
            world,
            id,
            mask: CollisionMask::default(),
            drop_through: false,
            bounce_height: None,
        }
    }

    /// Run all probes on the body's current position.
    pub fn resolve(&self, body: &mut PhysicsBody) -> ResolveReport {
        let mut report = ResolveReport {
            impact_velocity: body.velocity().y,
            ..ResolveReport::default()
        };

        let ground = pull_out_of_ground(self.world, body, self.id, self.mask.ground_for(self.drop_through));
        match (ground, self.bounce_height) {
            (GroundContact::Bounced { .. }, Some(height)) => {
                body.set_velocity_y(launch_velocity(height, body.gravity().base()));
                report.vertical = Resolution::Bounced;
                tracing::debug!(id = %self.id, vy = body.velocity().y, "bounced");
            }
            (GroundContact::Bounced { steps }, None) | (GroundContact::Landed { steps }, _) => {
                report.ground_steps = steps;
                report.vertical = Resolution::Landed;
            }
            (GroundContact::Clear, _) => {}
        }

        if report.vertical != Resolution::Landed {
            let steps = pull_out_of_ceiling(self.world, body, self.id, self.mask.ceiling_for(self.drop_through));
            if steps > 0 {
                report.ceiling_steps = steps;
                report.vertical = Resolution::Blocked;
            }
        }

        if matches!(report.vertical, Resolution::Landed | Resolution::Blocked) {
            body.set_velocity_y(0.0);
        }

        let steps = pull_out_of_wall(self.world, body, self.id, self.mask.wall_for(self.drop_through));
        if steps > 0 {
            report.wall_steps = steps;
            report.horizontal = Resolution::Blocked;
            body.set_velocity_x(0.0);
        }

        report
    }
}

impl<'w, W: WorldSurface + ?Sized> PositionHook for Resolver<'w, W> {
    type Outcome = ResolveReport;

    fn update_position(&mut self, body: &mut PhysicsBody, target: Vec2) -> ResolveReport {
        body.position = target;
        self.resolve(body)
    }
}

// =============================================================================
// TESTS
// =============================================================================
