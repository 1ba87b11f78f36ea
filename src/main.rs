//! Rainfall Runtime
//!
//! Runs a scripted demo scene headless, logs what happens, then replays
//! the recorded input and checks the final state hash matches.
//!
//! Usage: `rainfall-runtime [level.txt]`. Set `RAINFALL_CONFIG` to a JSON
//! file to override tuning and `RUST_LOG` to change verbosity.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use rainfall::{
    TICK_RATE, VERSION,
    core::vec2::Vec2,
    game::{
        animation::{DrawCommand, SpriteLibrary},
        carry::CarryProfile,
        config::SimulationConfig,
        effects::Effects,
        events::GameEventData,
        input::{InputFrame, InputRecording},
        map::TileMap,
        state::SceneState,
        tick::{replay, tick},
    },
};

/// Built-in level, 10 px tiles. Rain cloud on the left, pond, soil, a
/// bounce pad on the right and a platform overhead.
const DEMO_LEVEL: &str = "
........................................
........................................
........................................
........................................
........................................
..............======....................
........................................
........................................
........................................
........................................
##&&&&####~~~~~~####%%%%####^###########
########################################
";

const TILE_SIZE: f32 = 10.0;
const DEMO_SEED: u64 = 12345;
const DEMO_TICKS: u32 = 20 * TICK_RATE;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    info!("Rainfall Runtime v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = SimulationConfig::from_env().context("loading simulation config")?;
    let level = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading level {}", path))?,
        None => DEMO_LEVEL.to_string(),
    };

    demo_scene(&config, &level)
}

fn build_scene(config: &SimulationConfig, level: &str) -> Result<SceneState> {
    let world = TileMap::from_ascii(level, TILE_SIZE).context("parsing level")?;
    let mut state = SceneState::new(world, Vec2::new(350.0, 20.0), DEMO_SEED, config, SpriteLibrary::standard());
    state.add_prop(CarryProfile::wood(), Vec2::new(320.0, 20.0));
    state.add_prop(CarryProfile::seed(), Vec2::new(250.0, 20.0));
    state.add_prop(CarryProfile::stone(), Vec2::new(180.0, 20.0));
    Ok(state)
}

/// Walk, jump, pick up and throw the wood, then wander left and hop.
fn scripted_input(t: u32) -> InputFrame {
    let frame = InputFrame::new();
    match t {
        0..=29 => frame.with(InputFrame::LEFT),
        30 => frame.with(InputFrame::ACTION),
        31..=89 => frame.with(InputFrame::RIGHT),
        90..=99 => frame.with(InputFrame::RIGHT).with(InputFrame::JUMP),
        100..=149 => frame,
        150 => frame.with(InputFrame::ACTION),
        151..=399 => frame.with(InputFrame::LEFT),
        _ if t % 90 < 10 => frame.with(InputFrame::JUMP),
        _ => frame,
    }
}

fn demo_scene(config: &SimulationConfig, level: &str) -> Result<()> {
    info!("=== Starting Demo Scene ===");

    let mut state = build_scene(config, level)?;
    let mut effects = Effects::logging();
    let mut recording = InputRecording::new(DEMO_SEED);
    let mut draws: Vec<DrawCommand> = Vec::new();

    info!(
        "World: {}x{} tiles, {} props, seed {}",
        state.world.columns(),
        state.world.rows(),
        state.props.len(),
        DEMO_SEED
    );

    let mut total_events = 0;
    for t in 0..DEMO_TICKS {
        let input = scripted_input(t);
        recording.record(t, input);

        draws.clear();
        let result = tick(&mut state, input, &mut effects, &mut draws);
        total_events += result.events.len();

        for event in &result.events {
            match &event.data {
                GameEventData::Respawned { position } => info!("Tick {}: respawned at {}", t, position),
                GameEventData::PickedUp { prop } => info!("Tick {}: picked up {}", t, prop),
                GameEventData::Thrown { prop, velocity } => info!("Tick {}: threw {} at {}", t, prop, velocity),
                GameEventData::PropSettled { prop, state } => info!("Tick {}: {} settled {:?}", t, prop, state),
                GameEventData::DanceFinished { successful, mistakes } => {
                    info!("Tick {}: dance finished, success {} ({} mistakes)", t, successful, mistakes)
                }
                GameEventData::RainStarted => info!("Tick {}: it is raining", t),
                _ => {}
            }
        }

        if t % (5 * TICK_RATE) == 0 {
            info!(
                "Tick {}: player at {} pose {:?}, {} draws",
                t,
                state.player.position(),
                state.player.pose(),
                draws.len()
            );
        }
    }
    recording.finalize(DEMO_TICKS - 1);

    info!("=== Scene Results ===");
    let hash = state.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));
    info!("Recording Hash: {}", hex::encode(recording.compute_hash()));
    info!("Total events: {}, input deltas: {}", total_events, recording.delta_count());

    info!("=== Verifying Determinism ===");
    let (replayed, _) = replay(build_scene(config, level)?, &recording);
    let replay_hash = replayed.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
        Ok(())
    } else {
        warn!("DETERMINISM FAILURE: Hashes differ!");
        anyhow::bail!("replay hash mismatch")
    }
}
