//! Animation Sequencer
//!
//! Decides which logical animation tag an entity shows and for how long.
//! Rendering is someone else's job: every `play` call yields a
//! `DrawCommand` naming the sprite, tag, mirroring and the tag-local
//! elapsed time, and the renderer picks the frame.
//!
//! ## Preemption
//!
//! A looping tag (duration 0) is replaced by any new request at once. A
//! tag played with `play_until_finished` holds until its natural duration
//! has elapsed, so a one-shot is never cut off by a looping request.
//!
//! Time is game time in seconds (`GameClock::now`), never frame counts.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::warn;

use crate::core::vec2::Vec2;

/// Animation errors.
#[derive(Debug, Error)]
pub enum AnimationError {
    /// The sprite has no such tag.
    #[error("sprite {sprite:?} has no animation tag {tag:?}")]
    UnknownTag {
        /// Sprite id
        sprite: String,
        /// Requested tag
        tag: String,
    },

    /// Atlas JSON could not be parsed.
    #[error("invalid sprite atlas: {0}")]
    InvalidAtlas(#[from] serde_json::Error),
}

// =============================================================================
// SPRITES
// =============================================================================

/// Source of per-tag animation lengths.
pub trait SpriteSheet: fmt::Debug + Send + Sync {
    /// Sprite identifier carried in draw commands.
    fn id(&self) -> &str;

    /// Natural length of a tag in seconds, `None` if the tag is unknown.
    fn tag_duration(&self, tag: &str) -> Option<f64>;
}

/// Sprite sheet described by per-tag frame durations in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteAtlas {
    /// Sprite identifier
    pub id: String,
    /// Frame durations (ms) per tag
    pub tags: BTreeMap<String, Vec<u32>>,
}

impl SpriteAtlas {
    /// Atlas with no tags.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), tags: BTreeMap::new() }
    }

    /// Builder: add a tag of `frames` frames lasting `frame_ms` each.
    pub fn with_tag(mut self, tag: impl Into<String>, frames: usize, frame_ms: u32) -> Self {
        self.tags.insert(tag.into(), vec![frame_ms; frames.max(1)]);
        self
    }

    /// Parse an atlas from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, AnimationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Frame index shown `elapsed` seconds into a tag, wrapping around.
    pub fn frame_at(&self, tag: &str, elapsed: f64) -> Option<usize> {
        let frames = self.tags.get(tag)?;
        let total: u64 = frames.iter().map(|ms| u64::from(*ms)).sum();
        if total == 0 {
            return Some(0);
        }
        let mut t = (elapsed.max(0.0) * 1000.0) as u64 % total;
        for (index, ms) in frames.iter().enumerate() {
            let ms = u64::from(*ms);
            if t < ms {
                return Some(index);
            }
            t -= ms;
        }
        Some(frames.len() - 1)
    }
}

impl SpriteSheet for SpriteAtlas {
    fn id(&self) -> &str {
        &self.id
    }

    fn tag_duration(&self, tag: &str) -> Option<f64> {
        self.tags
            .get(tag)
            .map(|frames| frames.iter().map(|ms| f64::from(*ms)).sum::<f64>() / 1000.0)
    }
}

/// Sprite resources, built once at startup and shared read-only.
#[derive(Clone, Debug, Default)]
pub struct SpriteLibrary {
    sheets: BTreeMap<String, Arc<dyn SpriteSheet>>,
}

impl SpriteLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sheet under its id.
    pub fn insert(&mut self, sheet: Arc<dyn SpriteSheet>) {
        self.sheets.insert(sheet.id().to_string(), sheet);
    }

    /// Builder form of `insert`.
    pub fn with(mut self, sheet: impl SpriteSheet + 'static) -> Self {
        self.insert(Arc::new(sheet));
        self
    }

    /// Look up a sheet.
    pub fn get(&self, id: &str) -> Option<Arc<dyn SpriteSheet>> {
        self.sheets.get(id).cloned()
    }

    /// Look up a sheet, falling back to an empty placeholder.
    pub fn get_or_placeholder(&self, id: &str) -> Arc<dyn SpriteSheet> {
        match self.get(id) {
            Some(sheet) => sheet,
            None => {
                warn!(id, "missing sprite sheet, using placeholder");
                Arc::new(SpriteAtlas::new(id).with_tag(PLACEHOLDER_TAG, 1, 1000))
            }
        }
    }

    /// Player and prop sheets with the game's frame timings.
    pub fn standard() -> Self {
        let player = SpriteAtlas::new("player")
            .with_tag("idle", 4, 250)
            .with_tag("walk", 4, 100)
            .with_tag("jump", 1, 100)
            .with_tag("fall", 1, 100)
            .with_tag("carry_idle", 4, 250)
            .with_tag("carry_walk", 4, 100)
            .with_tag("carry_jump", 1, 100)
            .with_tag("carry_fall", 1, 100)
            .with_tag("dance", 6, 156)
            .with_tag("fail", 2, 250)
            .with_tag("fail_alt", 2, 250);

        let prop = |id: &str| {
            SpriteAtlas::new(id)
                .with_tag("idle", 1, 1000)
                .with_tag("floating", 4, 200)
                .with_tag("planted", 1, 1000)
        };

        Self::new()
            .with(player)
            .with(prop("stone"))
            .with(prop("seed"))
            .with(prop("wood"))
    }
}

/// Tag every placeholder sheet has.
pub const PLACEHOLDER_TAG: &str = "idle";

// =============================================================================
// DRAW COMMANDS
// =============================================================================

/// One sprite to draw this frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawCommand {
    /// Sprite id
    pub sprite: String,
    /// Active tag
    pub tag: String,
    /// Entity x (pixels)
    pub x: f32,
    /// Entity y (pixels)
    pub y: f32,
    /// `1` facing right, `-1` mirrored
    pub direction: i8,
    /// Seconds since the tag started
    pub elapsed: f64,
}

/// Consumer of draw commands.
pub trait RenderSink {
    /// Accept one command.
    fn submit(&mut self, command: DrawCommand);
}

impl RenderSink for Vec<DrawCommand> {
    fn submit(&mut self, command: DrawCommand) {
        self.push(command);
    }
}

// =============================================================================
// ANIMATOR
// =============================================================================

/// Playback options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Hold the tag for its natural duration
    pub play_until_finished: bool,
}

impl AnimationConfig {
    /// Loop until replaced.
    pub const LOOP: Self = Self { play_until_finished: false };

    /// Hold until the tag has played once.
    pub const ONCE: Self = Self { play_until_finished: true };
}

/// The current tag of one animator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationState {
    /// Active tag, empty before the first play
    pub tag: String,
    /// Game time the tag started (s)
    pub start: f64,
    /// Fixed length (s), `0` loops forever
    pub duration: f64,
    /// Fixed length reached
    pub finished: bool,
    /// Mirroring
    pub direction: i8,
    /// Options the tag was started with
    pub config: AnimationConfig,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            tag: String::new(),
            start: 0.0,
            duration: 0.0,
            finished: false,
            direction: 1,
            config: AnimationConfig::LOOP,
        }
    }
}

/// Tag sequencer for one entity.
#[derive(Clone, Debug)]
pub struct Animator {
    sprite: Arc<dyn SpriteSheet>,
    state: AnimationState,
}

impl Animator {
    /// Animator with an empty tag.
    pub fn new(sprite: Arc<dyn SpriteSheet>) -> Self {
        Self { sprite, state: AnimationState::default() }
    }

    /// Current state.
    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    /// Sprite this animator draws.
    pub fn sprite(&self) -> &Arc<dyn SpriteSheet> {
        &self.sprite
    }

    /// Request `tag` and produce this frame's draw command.
    ///
    /// An unknown tag is rejected before anything changes.
    pub fn play(
        &mut self,
        tag: &str,
        direction: i8,
        config: AnimationConfig,
        position: Vec2,
        now: f64,
    ) -> Result<DrawCommand, AnimationError> {
        let natural = if self.state.tag == tag {
            None
        } else {
            let duration = self.sprite.tag_duration(tag).ok_or_else(|| AnimationError::UnknownTag {
                sprite: self.sprite.id().to_string(),
                tag: tag.to_string(),
            })?;
            Some(duration)
        };

        self.state.direction = direction;

        if let Some(natural) = natural {
            if self.state.duration > 0.0 && now - self.state.start >= self.state.duration {
                self.state.finished = true;
            }

            if self.state.duration == 0.0 || self.state.finished {
                self.state.tag = tag.to_string();
                self.state.start = now;
                self.state.finished = false;
                self.state.config = config;
                self.state.duration = if config.play_until_finished { natural } else { 0.0 };
            }
        }

        Ok(self.draw(position, now))
    }

    /// `play`, falling back to `fallback` (looping) on an unknown tag.
    pub fn play_or_fallback(
        &mut self,
        tag: &str,
        direction: i8,
        config: AnimationConfig,
        position: Vec2,
        now: f64,
        fallback: &str,
    ) -> Result<DrawCommand, AnimationError> {
        match self.play(tag, direction, config, position, now) {
            Err(err @ AnimationError::UnknownTag { .. }) if tag != fallback => {
                warn!(%err, fallback, "animation fallback");
                self.play(fallback, direction, AnimationConfig::LOOP, position, now)
            }
            other => other,
        }
    }

    fn draw(&self, position: Vec2, now: f64) -> DrawCommand {
        DrawCommand {
            sprite: self.sprite.id().to_string(),
            tag: self.state.tag.clone(),
            x: position.x,
            y: position.y,
            direction: self.state.direction,
            elapsed: now - self.state.start,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sheet() -> Arc<dyn SpriteSheet> {
        Arc::new(
            SpriteAtlas::new("hero")
                .with_tag("idle", 4, 250)
                .with_tag("walk", 4, 100)
                .with_tag("jump", 2, 250)
                .with_tag("attack", 2, 250),
        )
    }

    const AT: Vec2 = Vec2::new(12.0, 34.0);

    #[test]
    fn test_starts_empty() {
        let animator = Animator::new(sheet());
        assert_eq!(animator.state().tag, "");
        assert_eq!(animator.state().duration, 0.0);
        assert!(!animator.state().finished);
    }

    #[test]
    fn test_tag_duration() {
        let atlas = SpriteAtlas::new("hero").with_tag("jump", 3, 200);
        assert_eq!(atlas.tag_duration("jump"), Some(0.6));
        assert_eq!(atlas.tag_duration("swim"), None);
    }

    #[test]
    fn test_frame_at_wraps() {
        let atlas = SpriteAtlas::new("hero").with_tag("walk", 4, 100);
        assert_eq!(atlas.frame_at("walk", 0.0), Some(0));
        assert_eq!(atlas.frame_at("walk", 0.25), Some(2));
        assert_eq!(atlas.frame_at("walk", 0.45), Some(0));
        assert_eq!(atlas.frame_at("swim", 0.0), None);
    }

    #[test]
    fn test_same_tag_keeps_start() {
        let mut animator = Animator::new(sheet());
        animator.play("walk", 1, AnimationConfig::LOOP, AT, 1.0).unwrap();
        for step in 1..10 {
            let now = 1.0 + step as f64 * 0.1;
            let cmd = animator.play("walk", -1, AnimationConfig::LOOP, AT, now).unwrap();
            assert_eq!(animator.state().start, 1.0);
            assert!((cmd.elapsed - (now - 1.0)).abs() < 1e-9);
            assert_eq!(cmd.direction, -1);
        }
    }

    #[test]
    fn test_one_shot_holds_until_finished() {
        let t = 5.0;
        let mut animator = Animator::new(sheet());
        animator.play("walk", 1, AnimationConfig::LOOP, AT, t - 1.0).unwrap();

        let cmd = animator.play("jump", 1, AnimationConfig::ONCE, AT, t).unwrap();
        assert_eq!(cmd.tag, "jump");
        assert_eq!(animator.state().start, t);
        assert_eq!(animator.state().duration, 0.5);

        // Looping requests before the jump has played are ignored
        for now in [t + 0.1, t + 0.3, t + 0.49] {
            let cmd = animator.play("walk", 1, AnimationConfig::LOOP, AT, now).unwrap();
            assert_eq!(cmd.tag, "jump");
            assert_eq!(animator.state().start, t);
        }

        let cmd = animator.play("walk", 1, AnimationConfig::LOOP, AT, t + 0.5).unwrap();
        assert_eq!(cmd.tag, "walk");
        assert_eq!(animator.state().start, t + 0.5);
        assert_eq!(cmd.elapsed, 0.0);
    }

    #[test]
    fn test_draw_command_fields() {
        let mut animator = Animator::new(sheet());
        let cmd = animator.play("idle", -1, AnimationConfig::LOOP, AT, 2.0).unwrap();
        assert_eq!(
            cmd,
            DrawCommand {
                sprite: "hero".to_string(),
                tag: "idle".to_string(),
                x: 12.0,
                y: 34.0,
                    direction: -1,
                elapsed: 0.0,
            }
        );
    }

    #[test]
    fn test_unknown_tag_leaves_state() {
        let mut animator = Animator::new(sheet());
        animator.play("walk", 1, AnimationConfig::LOOP, AT, 1.0).unwrap();
        let before = animator.state().clone();

        let err = animator.play("swim", -1, AnimationConfig::ONCE, AT, 2.0).unwrap_err();
        assert!(matches!(err, AnimationError::UnknownTag { ref tag, .. } if tag == "swim"));
        assert_eq!(animator.state(), &before);
    }

    #[test]
    fn test_fallback_on_unknown_tag() {
        let mut animator = Animator::new(sheet());
        let cmd = animator
            .play_or_fallback("swim", 1, AnimationConfig::ONCE, AT, 1.0, "idle")
            .unwrap();
        assert_eq!(cmd.tag, "idle");
        assert_eq!(animator.state().duration, 0.0);

        // Unknown fallback still errors
        assert!(animator
            .play_or_fallback("swim", 1, AnimationConfig::LOOP, AT, 1.0, "nope")
            .is_err());
    }

    #[test]
    fn test_atlas_json() {
        let json = r#"{"id":"stone","tags":{"idle":[1000],"floating":[200,200]}}"#;
        let atlas = SpriteAtlas::from_json_str(json).unwrap();
        assert_eq!(atlas.tag_duration("floating"), Some(0.4));
        assert!(SpriteAtlas::from_json_str("{").is_err());
    }

    #[test]
    fn test_library_placeholder() {
        let library = SpriteLibrary::standard();
        assert!(library.get("player").is_some());
        let placeholder = library.get_or_placeholder("ghost");
        assert_eq!(placeholder.id(), "ghost");
        assert!(placeholder.tag_duration(PLACEHOLDER_TAG).is_some());
    }

    proptest! {
        #[test]
        fn prop_preemption(
            first_once in any::<bool>(),
            delay in 0.0f64..2.0,
        ) {
            // "attack" lasts 0.5s
            let config = if first_once { AnimationConfig::ONCE } else { AnimationConfig::LOOP };
            let mut animator = Animator::new(sheet());
            animator.play("attack", 1, config, AT, 10.0).unwrap();
            let cmd = animator.play("walk", 1, AnimationConfig::LOOP, AT, 10.0 + delay).unwrap();

            let switched = cmd.tag == "walk";
            let expected = !first_once || (10.0 + delay) - 10.0 >= 0.5;
            prop_assert_eq!(switched, expected);
        }
    }
}
