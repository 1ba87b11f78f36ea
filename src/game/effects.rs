//! Particle and Sound Effects
//!
//! Movers never touch emitters or sound channels directly. They queue
//! `Effect` values during their update; the tick loop hands the queue to
//! an `Effects` bundle, which owns exactly one handle per emitter kind and
//! sound cue and forwards each effect in order.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::vec2::Vec2;

// =============================================================================
// HANDLES
// =============================================================================

/// Particle emitters a mover may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EmitterKind {
    /// Dust kicked up while walking and landing
    Dust,
    /// Burst when launched by a bounce pad
    Bounce,
    /// Burst on a mid-air jump
    DoubleJump,
}

/// Sound cues a mover may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Looping while submerged
    Drowning,
    /// Footsteps
    Walking,
    /// Throwing a prop
    Throwing,
    /// Jump take-off
    Jumping,
    /// Airborne to grounded
    Landing,
    /// Bounce pad
    Bouncing,
}

/// What to do with a sound channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundAction {
    /// Stop, then start from the beginning
    Play,
    /// Stop
    Stop,
    /// Start only if not already playing
    Trigger,
}

/// One queued side effect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Move an emitter and emit particles
    Emit {
        /// Emitter to use
        kind: EmitterKind,
        /// Particle count
        count: u32,
        /// Emission point (pixels)
        at: Vec2,
    },
    /// Drop an emitter's pending particles
    Clear(EmitterKind),
    /// Drive a sound channel
    Sound {
        /// Channel
        cue: SoundCue,
        /// Operation
        action: SoundAction,
    },
}

impl Effect {
    /// Emit `count` particles from `kind` at `at`.
    pub fn emit(kind: EmitterKind, count: u32, at: Vec2) -> Self {
        Effect::Emit { kind, count, at }
    }

    /// Restart a sound.
    pub fn play(cue: SoundCue) -> Self {
        Effect::Sound { cue, action: SoundAction::Play }
    }

    /// Stop a sound.
    pub fn stop(cue: SoundCue) -> Self {
        Effect::Sound { cue, action: SoundAction::Stop }
    }

    /// Start a sound unless it is playing.
    pub fn trigger(cue: SoundCue) -> Self {
        Effect::Sound { cue, action: SoundAction::Trigger }
    }
}

/// Emission contract of an external particle system.
pub trait ParticleEmitter {
    /// Move the emission point.
    fn set_position(&mut self, x: f32, y: f32);

    /// Emit `count` particles at the current position.
    fn emit(&mut self, count: u32);

    /// Drop any particles not yet emitted.
    fn clear(&mut self);
}

/// Contract of an external audio cue.
pub trait SoundChannel {
    /// Stop, then play from the start.
    fn play(&mut self);

    /// Stop playback.
    fn stop(&mut self);

    /// Play unless already playing.
    fn trigger(&mut self);
}

// =============================================================================
// BUNDLE
// =============================================================================

/// Single-owner handles for every emitter kind and sound cue.
#[derive(Default)]
pub struct Effects {
    emitters: BTreeMap<EmitterKind, Box<dyn ParticleEmitter>>,
    sounds: BTreeMap<SoundCue, Box<dyn SoundChannel>>,
}

impl fmt::Debug for Effects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effects")
            .field("emitters", &self.emitters.keys().collect::<Vec<_>>())
            .field("sounds", &self.sounds.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Effects {
    /// Empty bundle. Effects without a handle are dropped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle of `LogEmitter`s and `LogChannel`s for every kind and cue.
    pub fn logging() -> Self {
        let mut effects = Self::new();
        for kind in [EmitterKind::Dust, EmitterKind::Bounce, EmitterKind::DoubleJump] {
            effects.set_emitter(kind, Box::new(LogEmitter::new(kind)));
        }
        for cue in [
            SoundCue::Drowning,
            SoundCue::Walking,
            SoundCue::Throwing,
            SoundCue::Jumping,
            SoundCue::Landing,
            SoundCue::Bouncing,
        ] {
            effects.set_sound(cue, Box::new(LogChannel::new(cue)));
        }
        effects
    }

    /// Install or replace an emitter.
    pub fn set_emitter(&mut self, kind: EmitterKind, emitter: Box<dyn ParticleEmitter>) {
        self.emitters.insert(kind, emitter);
    }

    /// Install or replace a sound channel.
    pub fn set_sound(&mut self, cue: SoundCue, channel: Box<dyn SoundChannel>) {
        self.sounds.insert(cue, channel);
    }

    /// Forward one effect.
    pub fn apply(&mut self, effect: &Effect) {
        match *effect {
            Effect::Emit { kind, count, at } => match self.emitters.get_mut(&kind) {
                Some(emitter) => {
                    emitter.set_position(at.x, at.y);
                    emitter.emit(count);
                }
                None => debug!(?kind, "no emitter installed"),
            },
            Effect::Clear(kind) => {
                if let Some(emitter) = self.emitters.get_mut(&kind) {
                    emitter.clear();
                }
            }
            Effect::Sound { cue, action } => match self.sounds.get_mut(&cue) {
                Some(channel) => match action {
                    SoundAction::Play => channel.play(),
                    SoundAction::Stop => channel.stop(),
                    SoundAction::Trigger => channel.trigger(),
                },
                None => debug!(?cue, "no sound installed"),
            },
        }
    }

    /// Forward effects in order.
    pub fn dispatch<'a>(&mut self, effects: impl IntoIterator<Item = &'a Effect>) {
        for effect in effects {
            self.apply(effect);
        }
    }
}

// =============================================================================
// LOGGING HANDLES
// =============================================================================

/// Emitter that only logs.
#[derive(Clone, Debug)]
pub struct LogEmitter {
    kind: EmitterKind,
    position: Vec2,
    emitted: u64,
}

impl LogEmitter {
    /// Logger for `kind`.
    pub fn new(kind: EmitterKind) -> Self {
        Self { kind, position: Vec2::ZERO, emitted: 0 }
    }

    /// Total particles emitted.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl ParticleEmitter for LogEmitter {
    fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
    }

    fn emit(&mut self, count: u32) {
        self.emitted += u64::from(count);
        debug!(kind = ?self.kind, count, at = %self.position, "particles");
    }

    fn clear(&mut self) {
        debug!(kind = ?self.kind, "particles cleared");
    }
}

/// Sound channel that tracks play state and logs.
#[derive(Clone, Debug)]
pub struct LogChannel {
    cue: SoundCue,
    playing: bool,
    starts: u32,
}

impl LogChannel {
    /// Logger for `cue`.
    pub fn new(cue: SoundCue) -> Self {
        Self { cue, playing: false, starts: 0 }
    }

    /// Currently playing.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Times playback was (re)started.
    pub fn starts(&self) -> u32 {
        self.starts
    }
}

impl SoundChannel for LogChannel {
    fn play(&mut self) {
        self.playing = true;
        self.starts += 1;
        debug!(cue = ?self.cue, "sound play");
    }

    fn stop(&mut self) {
        if self.playing {
            debug!(cue = ?self.cue, "sound stop");
        }
        self.playing = false;
    }

    fn trigger(&mut self) {
        if !self.playing {
            self.play();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct TestEmitter(Log);

    impl ParticleEmitter for TestEmitter {
        fn set_position(&mut self, x: f32, y: f32) {
            self.0.borrow_mut().push(format!("pos {} {}", x, y));
        }
        fn emit(&mut self, count: u32) {
            self.0.borrow_mut().push(format!("emit {}", count));
        }
        fn clear(&mut self) {
            self.0.borrow_mut().push("clear".to_string());
        }
    }

    struct TestChannel(Log);

    impl SoundChannel for TestChannel {
        fn play(&mut self) {
            self.0.borrow_mut().push("play".to_string());
        }
        fn stop(&mut self) {
            self.0.borrow_mut().push("stop".to_string());
        }
        fn trigger(&mut self) {
            self.0.borrow_mut().push("trigger".to_string());
        }
    }

    #[test]
    fn test_dispatch_in_order() {
        let log: Log = Rc::default();
        let mut effects = Effects::new();
        effects.set_emitter(EmitterKind::Bounce, Box::new(TestEmitter(log.clone())));
        effects.set_sound(SoundCue::Bouncing, Box::new(TestChannel(log.clone())));

        let queue = [
            Effect::emit(EmitterKind::Bounce, 20, Vec2::new(3.0, -12.0)),
            Effect::stop(SoundCue::Bouncing),
            Effect::play(SoundCue::Bouncing),
            Effect::Clear(EmitterKind::Bounce),
        ];
        effects.dispatch(&queue);

        assert_eq!(*log.borrow(), vec!["pos 3 -12", "emit 20", "stop", "play", "clear"]);
    }

    #[test]
    fn test_missing_handles_are_skipped() {
        let mut effects = Effects::new();
        effects.dispatch(&[
            Effect::emit(EmitterKind::Dust, 1, Vec2::ZERO),
            Effect::trigger(SoundCue::Walking),
        ]);
    }

    #[test]
    fn test_log_channel_trigger_does_not_restart() {
        let mut channel = LogChannel::new(SoundCue::Walking);
        channel.trigger();
        channel.trigger();
        assert!(channel.is_playing());
        assert_eq!(channel.starts(), 1);

        channel.play();
        assert_eq!(channel.starts(), 2);

        channel.stop();
        assert!(!channel.is_playing());
        channel.trigger();
        assert_eq!(channel.starts(), 3);
    }

    #[test]
    fn test_log_emitter_counts() {
        let mut emitter = LogEmitter::new(EmitterKind::Dust);
        emitter.set_position(1.0, 2.0);
        emitter.emit(3);
        emitter.emit(2);
        assert_eq!(emitter.emitted(), 5);
    }
}
