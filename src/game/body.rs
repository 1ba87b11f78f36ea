//! Physics Body
//!
//! Position, velocity and limits for one moving entity, plus the
//! pluggable pieces layered on it:
//!
//! - `Gravity`: policy queried once per integration step
//! - `PositionHook`: called with the naive target so callers can run
//!   collision correction instead of teleporting
//!
//! Positions are pixels, velocities meters per second. Integration
//! converts with `pixels_per_meter`.

use std::fmt;
use std::sync::Arc;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;

// =============================================================================
// JUMP KEY
// =============================================================================

/// Jump control state.
///
/// `Neutral` is entered whenever the mover is grounded and means neither
/// held nor released since landing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JumpKey {
    /// Grounded since the last press
    #[default]
    Neutral,
    /// Pressed and still held
    Held,
    /// Released mid-air
    Released,
}

// =============================================================================
// GRAVITY
// =============================================================================

/// What a gravity policy may look at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravityContext {
    /// Current velocity (m/s)
    pub velocity: Vec2,
    /// Airborne
    pub flying: bool,
    /// Jump control state
    pub jump_key: JumpKey,
}

/// Gravity policy. Returns a downward acceleration in m/s².
pub trait Gravity: fmt::Debug + Send + Sync {
    /// Gravity for this step.
    fn gravity(&self, ctx: &GravityContext) -> f32;

    /// Gravity used for launch kinematics (jump and bounce speeds).
    fn base(&self) -> f32;
}

/// Same gravity in every state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantGravity(pub f32);

impl Gravity for ConstantGravity {
    fn gravity(&self, _ctx: &GravityContext) -> f32 {
        self.0
    }

    fn base(&self) -> f32 {
        self.0
    }
}

/// Normal gravity, switching to the stronger `short` constant while
/// ascending after the jump key was released. Cuts the jump arc short.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShortJumpGravity {
    /// Regular gravity
    pub normal: f32,
    /// Gravity after an early release
    pub short: f32,
}

impl Gravity for ShortJumpGravity {
    fn gravity(&self, ctx: &GravityContext) -> f32 {
        if ctx.flying && ctx.jump_key == JumpKey::Released && ctx.velocity.y > 0.0 {
            self.short
        } else {
            self.normal
        }
    }

    fn base(&self) -> f32 {
        self.normal
    }
}

/// Vertical speed that reaches `height` meters under `gravity`.
#[inline]
pub fn launch_velocity(height: f32, gravity: f32) -> f32 {
    (2.0 * height * gravity).max(0.0).sqrt()
}

// =============================================================================
// BODY
// =============================================================================

/// Per-step flags supplied by the owning mover.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionFlags {
    /// Airborne
    pub flying: bool,
    /// Jump control state
    pub jump_key: JumpKey,
}

/// Kinematic body. `position` is the bottom-centre (feet) point.
#[derive(Clone, Debug)]
pub struct PhysicsBody {
    /// Feet position (pixels)
    pub position: Vec2,
    velocity: Vec2,
    max_velocity: f32,
    /// Width (pixels)
    pub width: f32,
    /// Height (pixels)
    pub height: f32,
    floating: bool,
    gravity: Arc<dyn Gravity>,
    pixels_per_meter: f32,
}

impl PhysicsBody {
    /// New body at rest.
    pub fn new(position: Vec2, width: f32, height: f32, gravity: Arc<dyn Gravity>, pixels_per_meter: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            max_velocity: f32::INFINITY,
            width,
            height,
            floating: false,
            gravity,
            pixels_per_meter,
        }
    }

    /// Velocity (m/s).
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Set both velocity components.
    pub fn set_velocity(&mut self, vx: f32, vy: f32) {
        self.velocity = Vec2::new(vx, vy);
    }

    /// Set horizontal velocity.
    pub fn set_velocity_x(&mut self, vx: f32) {
        self.velocity.x = vx;
    }

    /// Set vertical velocity.
    pub fn set_velocity_y(&mut self, vy: f32) {
        self.velocity.y = vy;
    }

    /// Maximum horizontal speed.
    pub fn max_velocity(&self) -> f32 {
        self.max_velocity
    }

    /// Set the maximum horizontal speed. Negative values are treated as zero.
    pub fn set_max_velocity(&mut self, max: f32) {
        self.max_velocity = max.max(0.0);
        self.velocity.x = self.velocity.x.clamp(-self.max_velocity, self.max_velocity);
    }

    /// Add `delta` to vx, clamped to ±max.
    pub fn accelerate_x(&mut self, delta: f32) {
        self.velocity.x = (self.velocity.x + delta).clamp(-self.max_velocity, self.max_velocity);
    }

    /// Move vx toward zero by `|delta|`, never past it.
    pub fn decelerate_x(&mut self, delta: f32) {
        let step = delta.abs();
        if self.velocity.x > 0.0 {
            self.velocity.x = (self.velocity.x - step).max(0.0);
        } else if self.velocity.x < 0.0 {
            self.velocity.x = (self.velocity.x + step).min(0.0);
        }
    }

    /// Whether gravity is suspended.
    pub fn is_floating(&self) -> bool {
        self.floating
    }

    /// Suspend or restore gravity.
    pub fn set_floating(&mut self, floating: bool) {
        self.floating = floating;
    }

    /// Gravity policy.
    pub fn gravity(&self) -> &dyn Gravity {
        self.gravity.as_ref()
    }

    /// Pixels per meter.
    pub fn pixels_per_meter(&self) -> f32 {
        self.pixels_per_meter
    }

    /// Top edge.
    #[inline]
    pub fn top(&self) -> f32 {
        self.position.y + self.height
    }

    /// Integrate one step and hand the naive target to `hook`.
    pub fn integrate<H: PositionHook>(&mut self, dt: f32, flags: MotionFlags, hook: &mut H) -> H::Outcome {
        if !self.floating {
            let ctx = GravityContext {
                velocity: self.velocity,
                flying: flags.flying,
                jump_key: flags.jump_key,
            };
            self.velocity.y -= self.gravity.gravity(&ctx) * dt;
        }
        let target = self.position + self.velocity * (self.pixels_per_meter * dt);
        hook.update_position(self, target)
    }
}

/// Called after naive integration with the target position.
pub trait PositionHook {
    /// What the hook reports back.
    type Outcome;

    /// Move `body` to (or near) `target`.
    fn update_position(&mut self, body: &mut PhysicsBody, target: Vec2) -> Self::Outcome;
}

/// Moves the body straight to the target.
#[derive(Clone, Copy, Debug, Default)]
pub struct Teleport;

impl PositionHook for Teleport {
    type Outcome = ();

    fn update_position(&mut self, body: &mut PhysicsBody, target: Vec2) {
        body.position = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn body(gravity: f32) -> PhysicsBody {
        PhysicsBody::new(Vec2::ZERO, 9.0, 33.0, Arc::new(ConstantGravity(gravity)), 18.0)
    }

    #[test]
    fn test_accelerate_clamps() {
        let mut b = body(0.0);
        b.set_max_velocity(4.5);
        for _ in 0..10 {
            b.accelerate_x(1.0);
        }
        assert_eq!(b.velocity().x, 4.5);
        for _ in 0..20 {
            b.accelerate_x(-1.0);
        }
        assert_eq!(b.velocity().x, -4.5);
    }

    #[test]
    fn test_decelerate_stops_at_zero() {
        let mut b = body(0.0);
        b.set_velocity(0.5, 0.0);
        b.decelerate_x(2.0);
        assert_eq!(b.velocity().x, 0.0);

        b.set_velocity(-0.5, 0.0);
        b.decelerate_x(-2.0);
        assert_eq!(b.velocity().x, 0.0);

        // Sign of the step does not matter
        b.set_velocity(3.0, 0.0);
        b.decelerate_x(-1.0);
        assert_eq!(b.velocity().x, 2.0);
    }

    #[test]
    fn test_integrate_converts_units() {
        let mut b = body(0.0);
        b.set_velocity(1.0, -2.0);
        b.integrate(0.5, MotionFlags::default(), &mut Teleport);
        // 18 px per meter
        assert_eq!(b.position, Vec2::new(9.0, -18.0));
    }

    #[test]
    fn test_floating_skips_gravity() {
        let mut b = body(10.0);
        b.set_floating(true);
        b.integrate(1.0, MotionFlags::default(), &mut Teleport);
        assert_eq!(b.velocity().y, 0.0);

        b.set_floating(false);
        b.integrate(1.0, MotionFlags::default(), &mut Teleport);
        assert_eq!(b.velocity().y, -10.0);
    }

    #[test]
    fn test_short_jump_gravity() {
        let g = ShortJumpGravity { normal: 35.0, short: 100.0 };
        let ascending = Vec2::new(0.0, 5.0);
        let ctx = |flying, jump_key, velocity| GravityContext { velocity, flying, jump_key };

        assert_eq!(g.gravity(&ctx(true, JumpKey::Released, ascending)), 100.0);
        assert_eq!(g.gravity(&ctx(true, JumpKey::Held, ascending)), 35.0);
        // Neutral never cuts the jump
        assert_eq!(g.gravity(&ctx(true, JumpKey::Neutral, ascending)), 35.0);
        assert_eq!(g.gravity(&ctx(true, JumpKey::Released, Vec2::new(0.0, -1.0))), 35.0);
        assert_eq!(g.gravity(&ctx(false, JumpKey::Released, ascending)), 35.0);
        assert_eq!(g.base(), 35.0);
    }

    #[test]
    fn test_launch_velocity() {
        assert_eq!(launch_velocity(2.0, 9.0), 6.0);
        assert_eq!(launch_velocity(0.0, 35.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_acceleration_respects_max(
            max in 0.0f32..20.0,
            steps in proptest::collection::vec(-10.0f32..10.0, 1..50),
        ) {
            let mut b = body(0.0);
            b.set_max_velocity(max);
            for delta in steps {
                b.accelerate_x(delta);
                prop_assert!(b.velocity().x.abs() <= max);
            }
        }

        #[test]
        fn prop_decelerate_never_overshoots(vx in -50.0f32..50.0, delta in -20.0f32..20.0) {
            let mut b = body(0.0);
            b.set_velocity(vx, 0.0);
            b.decelerate_x(delta);
            let after = b.velocity().x;
            prop_assert!(after.abs() <= vx.abs());
            prop_assert!(after == 0.0 || after.signum() == vx.signum());
        }
    }
}
