//! Dance Minigame
//!
//! A rhythm pattern the player must key along to while standing on a rain
//! cloud. Each pattern character is one beat: `1`..`3` are notes for the
//! left, jump and right controls, anything else is a rest.
//!
//! A note counts as hit when its key is pressed within half a beat of it.
//! Wrong keys, keys with no note nearby and notes that slip past unhit are
//! mistakes.

use serde::{Serialize, Deserialize};
use crate::core::vec2::Vec2;

/// Beats of silence before the first note.
pub const LEAD_IN_BEATS: f32 = 4.0;

/// Mistakes tolerated for the dance to still count.
pub const MISTAKE_ALLOWANCE: u32 = 3;

/// Pattern and tempo the player uses to make rain.
pub const RAIN_DANCE_PATTERN: &str = "1 1 1 2 1 2  12 11221122 3 3 3";

/// Tempo of the rain dance.
pub const RAIN_DANCE_BPM: f32 = 192.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct Note {
    time: f32,
    key: u8,
    hit: bool,
    missed: bool,
}

/// One run of a dance pattern.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DanceRoutine {
    position: Vec2,
    beat: f32,
    notes: Vec<Note>,
    /// Seconds since the routine was created
    time: f32,
    last_mistake: Option<f32>,
    last_success: Option<f32>,
    mistakes: u32,
    hits: u32,
}

impl DanceRoutine {
    /// Parse `pattern` at `bpm` beats per minute.
    pub fn new(position: Vec2, bpm: f32, pattern: &str) -> Self {
        let beat = 60.0 / bpm.max(1.0);
        let lead_in = LEAD_IN_BEATS * beat;
        let notes = pattern
            .chars()
            .enumerate()
            .filter_map(|(index, c)| match c {
                '1'..='3' => Some(Note {
                    time: lead_in + index as f32 * beat,
                    key: c as u8 - b'0',
                    hit: false,
                    missed: false,
                }),
                _ => None,
            })
            .collect();

        Self {
            position,
            beat,
            notes,
            time: 0.0,
            last_mistake: None,
            last_success: None,
            mistakes: 0,
            hits: 0,
        }
    }

    /// The rain dance.
    pub fn rain_dance(position: Vec2) -> Self {
        Self::new(position, RAIN_DANCE_BPM, RAIN_DANCE_PATTERN)
    }

    #[inline]
    fn window(&self) -> f32 {
        self.beat / 2.0
    }

    /// Lead-in is over.
    pub fn has_started(&self) -> bool {
        self.time >= LEAD_IN_BEATS * self.beat
    }

    /// Key `1`, `2` or `3` pressed.
    pub fn handle_key(&mut self, key: u8) {
        if !self.has_started() {
            return;
        }
        let (time, window) = (self.time, self.window());
        let note = self
            .notes
            .iter_mut()
            .find(|n| !n.hit && !n.missed && (n.time - time).abs() <= window);

        match note {
            Some(note) if note.key == key => {
                note.hit = true;
                self.hits += 1;
                self.last_success = Some(time);
            }
            Some(note) => {
                note.missed = true;
                self.mistake();
            }
            None => self.mistake(),
        }
    }

    fn mistake(&mut self) {
        self.mistakes += 1;
        self.last_mistake = Some(self.time);
    }

    /// Advance by `dt`. Returns `true` once the pattern is over.
    pub fn update(&mut self, dt: f32) -> bool {
        self.time += dt.max(0.0);

        let deadline = self.time - self.window();
        let mut slipped = 0;
        for note in self.notes.iter_mut().filter(|n| !n.hit && !n.missed && n.time < deadline) {
            note.missed = true;
            slipped += 1;
        }
        for _ in 0..slipped {
            self.mistake();
        }

        self.is_done()
    }

    /// Every note was hit or missed and the last beat has passed.
    pub fn is_done(&self) -> bool {
        let end = self
            .notes
            .last()
            .map_or(LEAD_IN_BEATS * self.beat, |n| n.time + self.beat);
        self.time >= end && self.notes.iter().all(|n| n.hit || n.missed)
    }

    /// Seconds since the last mistake, infinite if none.
    pub fn time_since_last_mistake(&self) -> f32 {
        self.last_mistake.map_or(f32::INFINITY, |t| self.time - t)
    }

    /// Seconds since the last hit, infinite if none.
    pub fn time_since_last_success(&self) -> f32 {
        self.last_success.map_or(f32::INFINITY, |t| self.time - t)
    }

    /// Finished within the mistake allowance.
    pub fn was_successful(&self) -> bool {
        self.mistakes <= MISTAKE_ALLOWANCE && self.hits > 0
    }

    /// Where the note display is drawn.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Move the note display.
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
    }

    /// Number of notes in the pattern.
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Mistakes so far.
    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    /// Notes hit so far.
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Seconds from creation until each note, with its key.
    pub fn schedule(&self) -> impl Iterator<Item = (f32, u8)> + '_ {
        self.notes.iter().map(|n| (n.time, n.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    /// Play `routine` to the end, pressing every note on time when `perfect`.
    fn play(routine: &mut DanceRoutine, perfect: bool) {
        let schedule: Vec<(f32, u8)> = routine.schedule().collect();
        let mut next = 0;
        let mut elapsed = 0.0f32;
        for _ in 0..100_000 {
            if perfect && next < schedule.len() && elapsed >= schedule[next].0 {
                routine.handle_key(schedule[next].1);
                next += 1;
            }
            if routine.update(DT) {
                return;
            }
            elapsed += DT;
        }
        panic!("dance never finished");
    }

    #[test]
    fn test_rain_dance_parses_notes() {
        let routine = DanceRoutine::rain_dance(Vec2::ZERO);
        // Digits in "1 1 1 2 1 2  12 11221122 3 3 3"
        assert_eq!(routine.note_count(), 19);
        assert!(!routine.has_started());
        assert_eq!(routine.time_since_last_mistake(), f32::INFINITY);
        assert_eq!(routine.time_since_last_success(), f32::INFINITY);
    }

    #[test]
    fn test_keys_ignored_during_lead_in() {
        let mut routine = DanceRoutine::rain_dance(Vec2::ZERO);
        routine.handle_key(1);
        assert_eq!(routine.mistakes(), 0);
    }

    #[test]
    fn test_perfect_run_succeeds() {
        let mut routine = DanceRoutine::rain_dance(Vec2::ZERO);
        play(&mut routine, true);
        assert_eq!(routine.hits(), 19);
        assert_eq!(routine.mistakes(), 0);
        assert!(routine.was_successful());
    }

    #[test]
    fn test_idle_run_fails() {
        let mut routine = DanceRoutine::rain_dance(Vec2::ZERO);
        play(&mut routine, false);
        assert_eq!(routine.mistakes(), 19);
        assert!(!routine.was_successful());
        assert!(routine.time_since_last_mistake() < 1.0);
    }

    #[test]
    fn test_wrong_key_is_mistake() {
        let mut routine = DanceRoutine::new(Vec2::ZERO, 60.0, "2");
        // Lead-in is 4s at 60 bpm, first note at 4s
        while !routine.has_started() {
            routine.update(0.5);
        }
        routine.handle_key(3);
        assert_eq!(routine.mistakes(), 1);
        assert_eq!(routine.time_since_last_mistake(), 0.0);

        // The note is spent, a late correct key is another mistake
        routine.handle_key(2);
        assert_eq!(routine.mistakes(), 2);
        assert_eq!(routine.hits(), 0);
    }

    #[test]
    fn test_set_position() {
        let mut routine = DanceRoutine::rain_dance(Vec2::ZERO);
        routine.set_position(10.0, -16.0);
        assert_eq!(routine.position(), Vec2::new(10.0, -16.0));
    }
}
