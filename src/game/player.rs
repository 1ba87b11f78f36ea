//! Player Movement State Machine
//!
//! The player turns input edges into intents, steers its `PhysicsBody`,
//! resolves it against the world and then works out where it stands:
//! grounded or flying, drowning, carrying, dancing. Everything visible or
//! audible it wants to happen is queued as `Effect` data and `GameEvent`s
//! for the tick loop to deliver.
//!
//! ## Per-tick order
//!
//! 1. Input edges (dance keys, move intents, jump, action)
//! 2. Integrate and resolve (bounce effects)
//! 3. Drowning and respawn
//! 4. Horizontal steering
//! 5. Pose and flying flag
//! 6. Landing sound and dust
//! 7. Dance pose, position and timing

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::hash::StateHasher;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::animation::AnimationConfig;
use crate::game::body::{launch_velocity, JumpKey, MotionFlags, PhysicsBody, ShortJumpGravity};
use crate::game::carry::{Prop, PropState};
use crate::game::collision::{ResolveReport, Resolver};
use crate::game::config::{PlayerConfig, SimulationConfig};
use crate::game::dance::DanceRoutine;
use crate::game::effects::{Effect, EmitterKind, SoundCue};
use crate::game::environment::{BodyId, Environment, WorldSurface};
use crate::game::events::GameEvent;
use crate::game::input::{InputEdges, InputFrame};

/// Respawn offset of the second checkpoint, left of the spawn (pixels).
pub const CHECKPOINT_OFFSET: f32 = 485.0;

/// Bodies drowning right of `start_x - CHECKPOINT_MIDPOINT` go back to the spawn.
pub const CHECKPOINT_MIDPOINT: f32 = 242.0;

/// Particles in a bounce or double-jump burst.
pub const BURST_PARTICLES: u32 = 20;

/// Impact speed (m/s) per landing dust particle.
const IMPACT_PER_PARTICLE: f32 = 5.0;

// =============================================================================
// POSE
// =============================================================================

/// What the player looks like this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pose {
    /// Standing still
    #[default]
    Idle,
    /// Moving on the ground
    Walk,
    /// Ascending
    Jump,
    /// Descending well above the ground, or drowning
    Fall,
    /// Dancing in time
    Dance,
    /// Reacting to a dance mistake
    Fail,
    /// Other mistake reaction
    FailAlt,
}

impl Pose {
    /// Animation tag, with the carrying variant where one exists.
    pub fn tag(self, carrying: bool) -> &'static str {
        match (self, carrying) {
            (Pose::Idle, false) => "idle",
            (Pose::Idle, true) => "carry_idle",
            (Pose::Walk, false) => "walk",
            (Pose::Walk, true) => "carry_walk",
            (Pose::Jump, false) => "jump",
            (Pose::Jump, true) => "carry_jump",
            (Pose::Fall, false) => "fall",
            (Pose::Fall, true) => "carry_fall",
            (Pose::Dance, _) => "dance",
            (Pose::Fail, _) => "fail",
            (Pose::FailAlt, _) => "fail_alt",
        }
    }

    /// Mistake reactions play through once, everything else loops.
    pub fn animation_config(self) -> AnimationConfig {
        match self {
            Pose::Fail | Pose::FailAlt => AnimationConfig::ONCE,
            _ => AnimationConfig::LOOP,
        }
    }
}

/// What the action key would do right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionHint {
    /// Nothing
    None,
    /// Start the rain dance
    Dance,
    /// Pick up a prop within reach
    PickUp(BodyId),
    /// Throw the carried prop
    Throw {
        /// The prop's target probe matches
        on_target: bool,
    },
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything outside the player that one update touches.
pub struct PlayerContext<'a, W: WorldSurface + ?Sized> {
    /// Read-only world
    pub world: &'a W,
    /// Props, for pickup, throw and drowning release
    pub props: &'a mut BTreeMap<BodyId, Prop>,
    /// Scene RNG
    pub rng: &'a mut DeterministicRng,
    /// Event sink
    pub events: &'a mut Vec<GameEvent>,
    /// Current tick
    pub tick: u32,
    /// Seconds per tick
    pub dt: f32,
}

// =============================================================================
// PLAYER
// =============================================================================

/// The player character.
#[derive(Clone, Debug)]
pub struct Player {
    /// World identity
    pub id: BodyId,
    /// Physics
    pub body: PhysicsBody,
    config: PlayerConfig,
    start: Vec2,
    direction: i8,
    move_left: bool,
    move_right: bool,
    flying: bool,
    jump_key: JumpKey,
    drop_through: bool,
    drowning: f32,
    double_jump: bool,
    multi_jump: bool,
    used_double_jump: bool,
    carrying: Option<BodyId>,
    dance: Option<DanceRoutine>,
    fail_pose: Pose,
    pose: Pose,
    previous_input: InputFrame,
    rain_requested: bool,
    effects: Vec<Effect>,
}

impl Player {
    /// New player standing at `start`.
    pub fn new(id: BodyId, start: Vec2, config: &SimulationConfig) -> Self {
        let (width, height) = config.player_size();
        let gravity = ShortJumpGravity {
            normal: config.gravity,
            short: config.player.short_jump_gravity,
        };
        let mut body = PhysicsBody::new(start, width, height, Arc::new(gravity), config.pixels_per_meter);
        body.set_max_velocity(config.player.max_speed);

        Self {
            id,
            body,
            config: config.player.clone(),
            start,
            direction: 1,
            move_left: false,
            move_right: false,
            flying: false,
            jump_key: JumpKey::Neutral,
            drop_through: false,
            drowning: 0.0,
            double_jump: false,
            multi_jump: false,
            used_double_jump: false,
            carrying: None,
            dance: None,
            fail_pose: Pose::Fail,
            pose: Pose::Idle,
            previous_input: InputFrame::new(),
            rain_requested: false,
            effects: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Feet position.
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Velocity (m/s).
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.body.velocity()
    }

    /// `1` facing right, `-1` facing left.
    pub fn direction(&self) -> i8 {
        self.direction
    }

    /// Spawn point.
    pub fn start(&self) -> Vec2 {
        self.start
    }

    /// Airborne.
    pub fn is_flying(&self) -> bool {
        self.flying
    }

    /// Jump control state.
    pub fn jump_key(&self) -> JumpKey {
        self.jump_key
    }

    /// Seconds submerged so far.
    pub fn drowning_time(&self) -> f32 {
        self.drowning
    }

    /// Mid-air jump spent since the last landing.
    pub fn used_double_jump(&self) -> bool {
        self.used_double_jump
    }

    /// Carried prop.
    pub fn carrying(&self) -> Option<BodyId> {
        self.carrying
    }

    /// Current pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Animation tag for the current pose.
    pub fn animation_tag(&self) -> &'static str {
        self.pose.tag(self.carrying.is_some())
    }

    /// Active dance.
    pub fn dance(&self) -> Option<&DanceRoutine> {
        self.dance.as_ref()
    }

    /// Dancing right now.
    pub fn is_dancing(&self) -> bool {
        self.dance.is_some()
    }

    /// Movement tuning.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Allow one mid-air jump per flight.
    pub fn learn_double_jump(&mut self) {
        self.double_jump = true;
    }

    /// Allow unlimited mid-air jumps.
    pub fn learn_multi_jump(&mut self) {
        self.multi_jump = true;
    }

    /// Take the queued effects.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Take a pending rain request.
    pub fn take_rain_request(&mut self) -> bool {
        std::mem::replace(&mut self.rain_requested, false)
    }

    /// Feed everything that affects future ticks into `hasher`.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_vec2(self.body.position);
        hasher.update_vec2(self.body.velocity());
        hasher.update_u8(self.direction as u8);
        hasher.update_bool(self.flying);
        hasher.update_u8(self.jump_key as u8);
        hasher.update_f32(self.drowning);
        hasher.update_bool(self.used_double_jump);
        hasher.update_u32(self.carrying.map_or(u32::MAX, |id| id.0));
        hasher.update_u8(self.previous_input.flags);
        hasher.update_str(self.animation_tag());
        match &self.dance {
            Some(dance) => {
                hasher.update_bool(true);
                hasher.update_u32(dance.hits());
                hasher.update_u32(dance.mistakes());
            }
            None => hasher.update_bool(false),
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Whether a jump is allowed right now.
    pub fn can_jump(&self) -> bool {
        if self.multi_jump {
            true
        } else if self.double_jump {
            !self.used_double_jump
        } else {
            !self.flying
        }
    }

    /// Whether the action key would start the rain dance.
    pub fn can_dance<W: WorldSurface + ?Sized>(&self, world: &W) -> bool {
        self.dance.is_none()
            && !world.is_raining()
            && self.carrying.is_none()
            && world.classify(self.body.position.x, self.body.position.y - 5.0) == Environment::RainCloud
    }

    /// What the action key would do right now.
    pub fn action_hint<W: WorldSurface + ?Sized>(&self, world: &W, props: &BTreeMap<BodyId, Prop>) -> ActionHint {
        if self.can_dance(world) {
            return ActionHint::Dance;
        }
        match self.carrying.and_then(|id| props.get(&id)) {
            Some(prop) => {
                let (at, direction) = (self.body.position, self.direction);
                if prop.profile.can_throw(world, at, direction) {
                    ActionHint::Throw { on_target: prop.profile.target_matches(world, at, direction) }
                } else {
                    ActionHint::None
                }
            }
            None => self.prop_in_reach(props).map_or(ActionHint::None, ActionHint::PickUp),
        }
    }

    /// First loose prop overlapping the player's box.
    pub fn prop_in_reach(&self, props: &BTreeMap<BodyId, Prop>) -> Option<BodyId> {
        if self.carrying.is_some() {
            return None;
        }
        let me = &self.body;
        props
            .values()
            .find(|prop| {
                let other = &prop.body;
                prop.state != PropState::Planted
                    && (other.position.x - me.position.x).abs() <= (me.width + other.width) / 2.0
                    && other.position.y <= me.top()
                    && me.position.y <= other.top()
            })
            .map(|prop| prop.id)
    }

    // -------------------------------------------------------------------------
    // Carrying
    // -------------------------------------------------------------------------

    /// Start carrying `prop`. Returns `false` if already carrying.
    pub fn carry(&mut self, prop: &mut Prop) -> bool {
        if self.carrying.is_some() {
            return false;
        }
        prop.pick_up(Vec2::new(self.body.position.x, self.body.top()));
        self.carrying = Some(prop.id);
        debug!(id = %self.id, prop = %prop.id, "picked up");
        true
    }

    /// Throw `prop` if it is the carried one and its target rule allows it.
    /// Returns the release velocity.
    pub fn throw<W: WorldSurface + ?Sized>(&mut self, world: &W, prop: &mut Prop) -> Option<Vec2> {
        if self.carrying != Some(prop.id) {
            return None;
        }
        if !prop.profile.can_throw(world, self.body.position, self.direction) {
            debug!(id = %self.id, prop = %prop.id, "throw refused, target missing");
            return None;
        }

        let velocity = prop.profile.throw_velocity.facing(self.direction);
        prop.release(velocity);
        self.carrying = None;
        self.effects.push(Effect::play(SoundCue::Throwing));
        debug!(id = %self.id, prop = %prop.id, ?velocity, "thrown");
        Some(velocity)
    }

    /// Move the carried prop along with the player.
    pub fn carry_along(&self, props: &mut BTreeMap<BodyId, Prop>) {
        if let Some(prop) = self.carrying.and_then(|id| props.get_mut(&id)) {
            prop.follow(self.body.position, self.body.height, self.direction);
        }
    }

    // -------------------------------------------------------------------------
    // Update
    // -------------------------------------------------------------------------

    /// Run one tick.
    pub fn update<W: WorldSurface + ?Sized>(&mut self, input: InputFrame, ctx: &mut PlayerContext<'_, W>) {
        let edges = input.edges_from(self.previous_input);
        self.previous_input = input;
        self.handle_input(input, edges, ctx);

        let report = self.integrate(ctx);
        let drowning = self.update_drowning(ctx);

        let was_flying = self.flying;
        if !drowning {
            self.steer(ctx.dt);
        }
        self.update_pose(ctx.world, drowning);

        if was_flying && !self.flying {
            self.effects.push(Effect::stop(SoundCue::Landing));
            self.effects.push(Effect::play(SoundCue::Landing));
            ctx.events.push(GameEvent::landed(ctx.tick, self.id, report.impact_velocity));
            debug!(id = %self.id, impact = report.impact_velocity, "landed");
        }
        self.emit_dust(was_flying, &report, ctx);

        if !self.flying {
            self.jump_key = JumpKey::Neutral;
        }

        self.update_dance(ctx);
    }

    fn handle_input<W: WorldSurface + ?Sized>(
        &mut self,
        input: InputFrame,
        edges: InputEdges,
        ctx: &mut PlayerContext<'_, W>,
    ) {
        if let Some(dance) = self.dance.as_mut() {
            for (flag, key) in [(InputFrame::LEFT, 1), (InputFrame::JUMP, 2), (InputFrame::RIGHT, 3)] {
                if edges.pressed(flag) {
                    dance.handle_key(key);
                }
            }
        } else {
            if edges.pressed(InputFrame::RIGHT) {
                self.direction = 1;
                self.move_right = true;
                self.move_left = false;
            }
            if edges.pressed(InputFrame::LEFT) {
                self.direction = -1;
                self.move_left = true;
                self.move_right = false;
            }
            if edges.pressed(InputFrame::ACTION) {
                self.action(ctx);
            }
            if edges.pressed(InputFrame::JUMP) && self.can_jump() {
                self.jump_key = JumpKey::Held;
                self.jump(ctx);
            }
        }

        if edges.released(InputFrame::RIGHT) {
            self.move_right = false;
        }
        if edges.released(InputFrame::LEFT) {
            self.move_left = false;
        }
        if edges.released(InputFrame::JUMP) {
            self.jump_key = JumpKey::Released;
        }
        self.drop_through = input.down();
    }

    fn action<W: WorldSurface + ?Sized>(&mut self, ctx: &mut PlayerContext<'_, W>) {
        if self.can_dance(ctx.world) {
            let (x, y) = (self.body.position.x, self.body.position.y);
            self.dance = Some(DanceRoutine::rain_dance(Vec2::new(x, y - 16.0)));
            self.move_left = false;
            self.move_right = false;
            ctx.events.push(GameEvent::dance_started(ctx.tick, self.id));
            debug!(id = %self.id, "dance started");
            return;
        }

        match self.carrying {
            Some(id) => {
                if let Some(prop) = ctx.props.get_mut(&id) {
                    if let Some(velocity) = self.throw(ctx.world, prop) {
                        ctx.events.push(GameEvent::thrown(ctx.tick, self.id, id, velocity));
                    }
                }
            }
            None => {
                if let Some(prop) = self.prop_in_reach(ctx.props).and_then(|id| ctx.props.get_mut(&id)) {
                    let prop_id = prop.id;
                    if self.carry(prop) {
                        ctx.events.push(GameEvent::picked_up(ctx.tick, self.id, prop_id));
                    }
                }
            }
        }
    }

    fn jump<W: WorldSurface + ?Sized>(&mut self, ctx: &mut PlayerContext<'_, W>) {
        let vy = launch_velocity(self.config.jump_height, self.body.gravity().base());
        self.body.set_velocity_y(vy);
        self.effects.push(Effect::play(SoundCue::Jumping));

        if self.flying {
            self.used_double_jump = true;
            let at = Vec2::new(self.body.position.x, self.body.position.y + 20.0);
            self.effects.push(Effect::emit(EmitterKind::DoubleJump, BURST_PARTICLES, at));
        }
        ctx.events.push(GameEvent::jumped(ctx.tick, self.id, self.flying));
        debug!(id = %self.id, vy, double = self.flying, "jumped");
    }

    fn integrate<W: WorldSurface + ?Sized>(&mut self, ctx: &mut PlayerContext<'_, W>) -> ResolveReport {
        let mut resolver = Resolver {
            world: ctx.world,
            id: self.id,
            mask: self.config.collision,
            drop_through: self.drop_through,
            bounce_height: Some(self.config.bounce_height),
        };
        let flags = MotionFlags { flying: self.flying, jump_key: self.jump_key };
        let report = self.body.integrate(ctx.dt, flags, &mut resolver);

        if report.bounced() {
            let at = Vec2::new(self.body.position.x, self.body.position.y - 12.0);
            self.effects.push(Effect::emit(EmitterKind::Bounce, BURST_PARTICLES, at));
            self.effects.push(Effect::Clear(EmitterKind::Dust));
            self.effects.push(Effect::stop(SoundCue::Bouncing));
            self.effects.push(Effect::play(SoundCue::Bouncing));
            ctx.events.push(GameEvent::bounced(ctx.tick, self.id, self.body.velocity().y));
        }
        report
    }

    /// Returns whether the player is submerged this tick.
    fn update_drowning<W: WorldSurface + ?Sized>(&mut self, ctx: &mut PlayerContext<'_, W>) -> bool {
        let position = self.body.position;
        if ctx.world.classify(position.x, position.y) != Environment::Water {
            self.drowning = 0.0;
            return false;
        }

        if let Some(prop) = self.carrying.and_then(|id| ctx.props.get_mut(&id)) {
            if let Some(velocity) = prop.profile.release_when_drowning {
                prop.release(velocity);
                self.carrying = None;
                ctx.events.push(GameEvent::dropped(ctx.tick, self.id, prop.id));
            }
        }

        if self.drowning == 0.0 {
            self.effects.push(Effect::trigger(SoundCue::Drowning));
            ctx.events.push(GameEvent::drowning_started(ctx.tick, self.id));
        }
        self.body.set_velocity_x(0.0);
        self.drowning += ctx.dt;

        if self.drowning > self.config.drown_seconds {
            self.effects.push(Effect::stop(SoundCue::Drowning));
            let at = self.respawn();
            ctx.events.push(GameEvent::respawned(ctx.tick, self.id, at));
        }
        true
    }

    fn respawn(&mut self) -> Vec2 {
        let (at, direction) = if self.body.position.x > self.start.x - CHECKPOINT_MIDPOINT {
            (self.start, -1)
        } else {
            (Vec2::new(self.start.x - CHECKPOINT_OFFSET, self.start.y), 1)
        };
        self.body.position = at;
        self.body.set_velocity(0.0, 0.0);
        self.direction = direction;
        debug!(id = %self.id, %at, "respawned");
        at
    }

    fn steer(&mut self, dt: f32) {
        let acceleration = if self.flying {
            self.config.air_acceleration
        } else {
            self.config.ground_acceleration
        };

        if self.move_right || self.move_left {
            if !self.flying {
                self.effects.push(Effect::trigger(SoundCue::Walking));
            }
            let sign = if self.move_right { 1.0 } else { -1.0 };
            self.body.accelerate_x(sign * acceleration * dt);
        } else {
            self.effects.push(Effect::stop(SoundCue::Walking));
            self.body.decelerate_x(acceleration * dt);
        }
    }

    fn update_pose<W: WorldSurface + ?Sized>(&mut self, world: &W, drowning: bool) {
        let Vec2 { x: vx, y: vy } = self.body.velocity();
        let position = self.body.position;
        let height_above_ground = position.y - world.ground_height(position.x, position.y);

        let (pose, flying) = if vx == 0.0 && vy == 0.0 {
            (Pose::Idle, false)
        } else if vy > 0.0 {
            (Pose::Jump, true)
        } else if drowning || (vy < 0.0 && height_above_ground > self.config.fall_threshold) {
            (Pose::Fall, true)
        } else {
            (Pose::Walk, false)
        };

        self.pose = pose;
        self.flying = flying;
        if !flying {
            self.used_double_jump = false;
        }
    }

    fn emit_dust<W: WorldSurface + ?Sized>(
        &mut self,
        was_flying: bool,
        report: &ResolveReport,
        ctx: &mut PlayerContext<'_, W>,
    ) {
        if self.flying || !(was_flying || self.body.velocity().x.abs() > self.config.dust_speed) {
            return;
        }
        let count = if was_flying {
            (report.impact_velocity.abs() / IMPACT_PER_PARTICLE).ceil() as u32
        } else {
            u32::from(ctx.rng.chance(ctx.dt, self.config.dust_interval))
        };
        if count > 0 {
            self.effects.push(Effect::emit(EmitterKind::Dust, count, self.body.position));
        }
    }

    fn update_dance<W: WorldSurface + ?Sized>(&mut self, ctx: &mut PlayerContext<'_, W>) {
        let Some(dance) = self.dance.as_mut() else {
            return;
        };

        if dance.has_started() {
            let since_mistake = dance.time_since_last_mistake();
            let since_success = dance.time_since_last_success();
            if since_mistake < 1.0 || since_success < 3.0 {
                if since_mistake <= since_success {
                    if since_mistake == 0.0 {
                        self.fail_pose = if ctx.rng.next_bool(0.5) { Pose::Fail } else { Pose::FailAlt };
                    }
                    self.pose = self.fail_pose;
                } else {
                    self.pose = Pose::Dance;
                }
            }
        }

        let position = self.body.position;
        dance.set_position(position.x, position.y - 16.0);
        if !dance.update(ctx.dt) {
            return;
        }

        let successful = dance.was_successful();
        let mistakes = dance.mistakes();
        self.dance = None;
        ctx.events.push(GameEvent::dance_finished(ctx.tick, self.id, successful, mistakes));
        debug!(id = %self.id, successful, mistakes, "dance finished");

        if successful && ctx.world.classify(position.x, position.y - 5.0) == Environment::RainCloud {
            self.rain_requested = true;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
