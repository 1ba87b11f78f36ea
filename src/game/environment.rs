//! World Collision Surface
//!
//! Environment tags and the query contract the resolver and movers run
//! against. The world is a region classifier, not parametric geometry:
//! every query answers "what is at this point" and movers step out of
//! whatever they are inside.

use std::fmt;
use serde::{Serialize, Deserialize};

// =============================================================================
// ENVIRONMENT TAGS
// =============================================================================

/// Classification of a world cell or region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Environment {
    /// Empty space
    #[default]
    None = 0,
    /// Solid ground
    Solid = 1,
    /// One-way platform
    Platform = 2,
    /// Liquid
    Water = 3,
    /// Plantable soil
    Soil = 4,
    /// Bounce pad
    Bounce = 5,
    /// Rain-trigger region
    RainCloud = 6,
}

impl Environment {
    /// All tags in discriminant order.
    pub const ALL: [Environment; 7] = [
        Environment::None,
        Environment::Solid,
        Environment::Platform,
        Environment::Water,
        Environment::Soil,
        Environment::Bounce,
        Environment::RainCloud,
    ];

    /// Anything other than empty space.
    #[inline]
    pub fn is_some(self) -> bool {
        self != Environment::None
    }

    /// Level glyph for this tag.
    pub fn glyph(self) -> char {
        match self {
            Environment::None => '.',
            Environment::Solid => '#',
            Environment::Platform => '=',
            Environment::Water => '~',
            Environment::Soil => '%',
            Environment::Bounce => '^',
            Environment::RainCloud => '&',
        }
    }

    /// Parse a level glyph. Space is accepted as empty.
    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' | ' ' => Some(Environment::None),
            '#' => Some(Environment::Solid),
            '=' => Some(Environment::Platform),
            '~' => Some(Environment::Water),
            '%' => Some(Environment::Soil),
            '^' => Some(Environment::Bounce),
            '&' => Some(Environment::RainCloud),
            _ => None,
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::None => "none",
            Environment::Solid => "solid",
            Environment::Platform => "platform",
            Environment::Water => "water",
            Environment::Soil => "soil",
            Environment::Bounce => "bounce",
            Environment::RainCloud => "rain-cloud",
        };
        f.write_str(name)
    }
}

/// Set of environment tags, used to exclude tags from a query.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Environment>", into = "Vec<Environment>")]
pub struct EnvironmentSet(u8);

impl EnvironmentSet {
    /// No tags.
    pub const EMPTY: Self = Self(0);

    /// Set containing exactly these tags.
    pub const fn of(tags: &[Environment]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < tags.len() {
            bits |= tags[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// This set plus one more tag.
    #[inline]
    pub const fn with(self, tag: Environment) -> Self {
        Self(self.0 | tag.bit())
    }

    /// Union of two sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether the tag is in the set.
    #[inline]
    pub const fn contains(self, tag: Environment) -> bool {
        self.0 & tag.bit() != 0
    }

    /// Whether the set is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `tag` unless it is excluded, in which case `None`.
    #[inline]
    pub fn filter(self, tag: Environment) -> Environment {
        if self.contains(tag) {
            Environment::None
        } else {
            tag
        }
    }

    /// Tags in the set, in discriminant order.
    pub fn iter(self) -> impl Iterator<Item = Environment> {
        Environment::ALL.into_iter().filter(move |tag| self.contains(*tag))
    }
}

impl fmt::Debug for EnvironmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<Vec<Environment>> for EnvironmentSet {
    fn from(tags: Vec<Environment>) -> Self {
        Self::of(&tags)
    }
}

impl From<EnvironmentSet> for Vec<Environment> {
    fn from(set: EnvironmentSet) -> Self {
        set.iter().collect()
    }
}

/// Identifier of a body registered with the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

// =============================================================================
// SURFACE CONTRACT
// =============================================================================

/// Queryable 2D region classifier.
///
/// Coordinates are pixels with y increasing upward. Queries outside the
/// world must classify deterministically so pull-out loops terminate:
/// outside horizontally or below zero is `Solid`, above the top is `None`.
pub trait WorldSurface {
    /// Classify a point, ignoring the given bodies and tags.
    fn classify_filtered(
        &self,
        x: f32,
        y: f32,
        exclude_bodies: &[BodyId],
        exclude_tags: EnvironmentSet,
    ) -> Environment;

    /// Classify a point.
    fn classify(&self, x: f32, y: f32) -> Environment {
        self.classify_filtered(x, y, &[], EnvironmentSet::EMPTY)
    }

    /// Whether anything not excluded lies on the segment from `(x, y)`
    /// down to `(x, y - length)`.
    fn classify_vertical_line(
        &self,
        x: f32,
        y: f32,
        length: f32,
        exclude_bodies: &[BodyId],
        exclude_tags: EnvironmentSet,
    ) -> bool {
        let samples = length.max(0.0).ceil() as u32;
        (0..=samples).any(|i| {
            let sample_y = (y - i as f32).max(y - length);
            self.classify_filtered(x, sample_y, exclude_bodies, exclude_tags).is_some()
        })
    }

    /// First non-excluded tag inside the box centred horizontally on `x`
    /// with its bottom edge at `y`.
    fn classify_box(
        &self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        exclude_bodies: &[BodyId],
        exclude_tags: EnvironmentSet,
    ) -> Environment;

    /// Top of the first occupied surface at or below `(x, y)`, or `0`.
    fn ground_height(&self, x: f32, y: f32) -> f32;

    /// World height in pixels.
    fn world_height(&self) -> f32;

    /// World width in pixels.
    fn world_width(&self) -> f32;

    /// Whether rain has been started.
    fn is_raining(&self) -> bool;

    /// Start the rain. Invoked by the tick loop, never during entity updates.
    fn start_rain(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_roundtrip() {
        for tag in Environment::ALL {
            assert_eq!(Environment::from_glyph(tag.glyph()), Some(tag));
        }
        assert_eq!(Environment::from_glyph(' '), Some(Environment::None));
        assert_eq!(Environment::from_glyph('x'), None);
    }

    #[test]
    fn test_environment_set() {
        let set = EnvironmentSet::of(&[Environment::Platform, Environment::Water]);
        assert!(set.contains(Environment::Platform));
        assert!(set.contains(Environment::Water));
        assert!(!set.contains(Environment::Solid));

        assert_eq!(set.filter(Environment::Water), Environment::None);
        assert_eq!(set.filter(Environment::Solid), Environment::Solid);

        let wider = set.with(Environment::Soil);
        assert_eq!(wider.iter().count(), 3);
        assert!(EnvironmentSet::EMPTY.is_empty());
    }

    #[test]
    fn test_environment_set_serde() {
        let set = EnvironmentSet::of(&[Environment::Bounce, Environment::Soil]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["Soil","Bounce"]"#);

        let back: EnvironmentSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
