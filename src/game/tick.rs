//! Scene Tick
//!
//! The per-frame loop. Given the same scene, seed and inputs it always
//! produces the same state, events and effects.

use tracing::{debug, warn};

use crate::game::animation::{AnimationConfig, DrawCommand, RenderSink, PLACEHOLDER_TAG};
use crate::game::effects::{Effect, Effects};
use crate::game::environment::WorldSurface;
use crate::game::events::GameEvent;
use crate::game::input::{InputFrame, InputRecording};
use crate::game::player::PlayerContext;
use crate::game::state::SceneState;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick that was simulated
    pub tick: u32,
    /// Events generated this tick, sorted
    pub events: Vec<GameEvent>,
    /// Effects dispatched this tick, in order
    pub effects: Vec<Effect>,
    /// Draw commands submitted
    pub draws: usize,
}

/// Run one simulation tick.
///
/// # Order
///
/// 1. Advance the clock
/// 2. Player input, movement and resolution
/// 3. Carried prop follows the player
/// 4. Loose props integrate, resolve and settle
/// 5. Rain requested by the player starts
/// 6. Animators draw the player and props
/// 7. Queued effects go to the emitters and sound channels
///
/// The world is only mutated in step 5, after every entity update.
pub fn tick(
    state: &mut SceneState,
    input: InputFrame,
    effects: &mut Effects,
    sink: &mut dyn RenderSink,
) -> TickResult {
    let now_tick = state.tick;
    let dt = state.config().dt();
    let mut events = state.take_events();

    // 1. Clock
    state.clock.advance(dt);

    // 2. Player
    {
        let mut ctx = PlayerContext {
            world: &state.world,
            props: &mut state.props,
            rng: &mut state.rng,
            events: &mut events,
            tick: now_tick,
            dt,
        };
        state.player.update(input, &mut ctx);
    }

    // 3. Carried prop, same tick as the player moved
    state.player.carry_along(&mut state.props);

    // 4. Loose props
    let carried = state.player.carrying();
    for prop in state.props.values_mut() {
        if Some(prop.id) == carried {
            continue;
        }
        if let Some(settled) = prop.update(&state.world, dt) {
            events.push(GameEvent::prop_settled(now_tick, prop.id, settled));
        }
    }

    // 5. Rain
    if state.player.take_rain_request() && !state.world.is_raining() {
        state.world.start_rain();
        events.push(GameEvent::rain_started(now_tick));
    }

    // 6. Animation
    let draws = animate(state, sink);

    // 7. Effects
    let queued = state.player.take_effects();
    effects.dispatch(&queued);

    state.tick += 1;
    events.sort();

    TickResult { tick: now_tick, events, effects: queued, draws }
}

fn animate(state: &mut SceneState, sink: &mut dyn RenderSink) -> usize {
    let now = state.clock.now();
    let mut draws = 0;

    let player = &state.player;
    let pose = player.pose();
    match state.player_animator.play_or_fallback(
        player.animation_tag(),
        player.direction(),
        pose.animation_config(),
        player.position(),
        now,
        PLACEHOLDER_TAG,
    ) {
        Ok(command) => {
            sink.submit(command);
            draws += 1;
        }
        Err(err) => warn!(%err, "player not drawn"),
    }

    for (id, prop) in &state.props {
        let Some(animator) = state.prop_animators.get_mut(id) else {
            continue;
        };
        match animator.play_or_fallback(
            prop.state.tag(),
            prop.direction,
            AnimationConfig::LOOP,
            prop.body.position,
            now,
            PLACEHOLDER_TAG,
        ) {
            Ok(command) => {
                sink.submit(command);
                draws += 1;
            }
            Err(err) => warn!(%err, %id, "prop not drawn"),
        }
    }

    draws
}

/// Sink that drops every command.
struct Discard;

impl RenderSink for Discard {
    fn submit(&mut self, _command: DrawCommand) {}
}

/// Replay a scene from recorded inputs.
///
/// Effects and draw commands are discarded. Returns the final state and
/// every event.
pub fn replay(initial_state: SceneState, recording: &InputRecording) -> (SceneState, Vec<GameEvent>) {
    let mut state = initial_state;
    if state.rng_seed != recording.rng_seed {
        warn!(
            scene = state.rng_seed,
            recording = recording.rng_seed,
            "replaying with a different seed than recorded"
        );
    }

    let mut effects = Effects::new();
    let mut all_events = Vec::new();
    for (_, frame) in recording.replay_iter() {
        let result = tick(&mut state, frame, &mut effects, &mut Discard);
        all_events.extend(result.events);
    }

    debug!(ticks = state.tick, events = all_events.len(), "replay finished");
    (state, all_events)
}
