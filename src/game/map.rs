//! Tile Map World
//!
//! Reference `WorldSurface`: a fixed tile grid plus movable rectangular
//! body regions (clouds, pads, props). Regions are checked before tiles,
//! in `BodyId` order, so lookups are deterministic.
//!
//! Levels can be written as ASCII art, top line first:
//!
//! ```text
//! ..&&&.....
//! ..........
//! ...===....
//! #^##~~####
//! ```

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::vec2::Vec2;
use crate::game::environment::{BodyId, Environment, EnvironmentSet, WorldSurface};

/// Level parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Unknown glyph in a level line.
    #[error("invalid glyph {glyph:?} at line {line}, column {column}")]
    InvalidGlyph {
        /// Offending character
        glyph: char,
        /// 1-based line number
        line: usize,
        /// 1-based column number
        column: usize,
    },

    /// Line length differs from the first line.
    #[error("line {line} has {found} columns, expected {expected}")]
    Ragged {
        /// 1-based line number
        line: usize,
        /// Width of the first line
        expected: usize,
        /// Width of this line
        found: usize,
    },

    /// No tiles at all.
    #[error("level is empty")]
    Empty,
}

/// Axis-aligned region owned by a body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Bottom-left corner
    pub min: Vec2,
    /// Width and height
    pub size: Vec2,
    /// Tag reported for points inside
    pub environment: Environment,
}

impl Region {
    /// Create a region from its bottom-left corner and size.
    pub fn new(min: Vec2, size: Vec2, environment: Environment) -> Self {
        Self { min, size, environment }
    }

    /// Half-open containment test.
    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min.x
            && x < self.min.x + self.size.x
            && y >= self.min.y
            && y < self.min.y + self.size.y
    }

    /// Top edge.
    #[inline]
    pub fn top(&self) -> f32 {
        self.min.y + self.size.y
    }

    fn spans_x(&self, x: f32) -> bool {
        x >= self.min.x && x < self.min.x + self.size.x
    }

    fn overlaps(&self, min: Vec2, max: Vec2) -> bool {
        self.min.x < max.x
            && self.min.x + self.size.x > min.x
            && self.min.y < max.y
            && self.min.y + self.size.y > min.y
    }
}

/// Tile grid world with body regions and rain state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileMap {
    tile_size: f32,
    columns: usize,
    rows: usize,
    /// Row-major, row 0 is the bottom row.
    tiles: Vec<Environment>,
    regions: BTreeMap<BodyId, Region>,
    raining: bool,
}

impl TileMap {
    /// Empty map of `columns` x `rows` tiles.
    pub fn new(columns: usize, rows: usize, tile_size: f32) -> Self {
        Self {
            tile_size,
            columns,
            rows,
            tiles: vec![Environment::None; columns * rows],
            regions: BTreeMap::new(),
            raining: false,
        }
    }

    /// Parse an ASCII level. The first line is the highest row.
    pub fn from_ascii(level: &str, tile_size: f32) -> Result<Self, MapError> {
        let lines: Vec<&str> = level
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();

        let columns = match lines.first() {
            Some(first) => first.chars().count(),
            None => return Err(MapError::Empty),
        };
        if columns == 0 {
            return Err(MapError::Empty);
        }

        let rows = lines.len();
        let mut map = Self::new(columns, rows, tile_size);

        for (index, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != columns {
                return Err(MapError::Ragged { line: index + 1, expected: columns, found });
            }
            let row = rows - 1 - index;
            for (column, glyph) in line.chars().enumerate() {
                let tag = Environment::from_glyph(glyph).ok_or(MapError::InvalidGlyph {
                    glyph,
                    line: index + 1,
                    column: column + 1,
                })?;
                map.tiles[row * columns + column] = tag;
            }
        }

        Ok(map)
    }

    /// Tile edge length in pixels.
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Number of tile columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of tile rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Tag of a tile. Out-of-range tiles follow the surface rules.
    pub fn tile(&self, column: i64, row: i64) -> Environment {
        if column < 0 || column >= self.columns as i64 || row < 0 {
            Environment::Solid
        } else if row >= self.rows as i64 {
            Environment::None
        } else {
            self.tiles[row as usize * self.columns + column as usize]
        }
    }

    /// Set a tile. Returns `false` when out of range.
    pub fn set(&mut self, column: usize, row: usize, tag: Environment) -> bool {
        if column >= self.columns || row >= self.rows {
            return false;
        }
        self.tiles[row * self.columns + column] = tag;
        true
    }

    /// Fill a rectangle of tiles, clipped to the map.
    pub fn fill_rect(&mut self, column: usize, row: usize, width: usize, height: usize, tag: Environment) {
        let column_end = (column + width).min(self.columns);
        let row_end = (row + height).min(self.rows);
        for r in row..row_end {
            for c in column..column_end {
                self.tiles[r * self.columns + c] = tag;
            }
        }
    }

    /// Register or replace a body region.
    pub fn insert_region(&mut self, id: BodyId, region: Region) {
        self.regions.insert(id, region);
    }

    /// Move a region's bottom-left corner. Returns `false` if unknown.
    pub fn move_region(&mut self, id: BodyId, min: Vec2) -> bool {
        match self.regions.get_mut(&id) {
            Some(region) => {
                region.min = min;
                true
            }
            None => false,
        }
    }

    /// Remove a region.
    pub fn remove_region(&mut self, id: BodyId) -> Option<Region> {
        self.regions.remove(&id)
    }

    /// Look up a region.
    pub fn region(&self, id: BodyId) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Count tiles with the given tag.
    pub fn count(&self, tag: Environment) -> usize {
        self.tiles.iter().filter(|t| **t == tag).count()
    }

    #[inline]
    fn cell(&self, value: f32) -> i64 {
        (value / self.tile_size).floor() as i64
    }

    fn tile_at(&self, x: f32, y: f32) -> Environment {
        self.tile(self.cell(x), self.cell(y))
    }

    fn region_at(&self, x: f32, y: f32, exclude_bodies: &[BodyId], exclude_tags: EnvironmentSet) -> Environment {
        self.regions
            .iter()
            .filter(|(id, _)| !exclude_bodies.contains(id))
            .map(|(_, region)| region)
            .find(|region| region.contains(x, y) && !exclude_tags.contains(region.environment))
            .map(|region| region.environment)
            .unwrap_or(Environment::None)
    }
}

impl WorldSurface for TileMap {
    fn classify_filtered(
        &self,
        x: f32,
        y: f32,
        exclude_bodies: &[BodyId],
        exclude_tags: EnvironmentSet,
    ) -> Environment {
        let region = self.region_at(x, y, exclude_bodies, exclude_tags);
        if region.is_some() {
            return region;
        }
        exclude_tags.filter(self.tile_at(x, y))
    }

    fn classify_vertical_line(
        &self,
        x: f32,
        y: f32,
        length: f32,
        exclude_bodies: &[BodyId],
        exclude_tags: EnvironmentSet,
    ) -> bool {
        let bottom = y - length.max(0.0);
        let column = self.cell(x);
        let tiles = (self.cell(bottom)..=self.cell(y))
            .any(|row| exclude_tags.filter(self.tile(column, row)).is_some());
        if tiles {
            return true;
        }
        self.regions
            .iter()
            .filter(|(id, _)| !exclude_bodies.contains(id))
            .any(|(_, region)| {
                region.spans_x(x)
                    && region.min.y <= y
                    && region.top() > bottom
                    && !exclude_tags.contains(region.environment)
            })
    }

    fn classify_box(
        &self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        exclude_bodies: &[BodyId],
        exclude_tags: EnvironmentSet,
    ) -> Environment {
        let min = Vec2::new(x - width / 2.0, y);
        let max = Vec2::new(x + width / 2.0, y + height);

        let region = self
            .regions
            .iter()
            .filter(|(id, _)| !exclude_bodies.contains(id))
            .map(|(_, region)| region)
            .find(|region| region.overlaps(min, max) && !exclude_tags.contains(region.environment));
        if let Some(region) = region {
            return region.environment;
        }

        // Max edges are exclusive
        let last = |value: f32| (value / self.tile_size).ceil() as i64 - 1;
        for row in self.cell(min.y)..=last(max.y).max(self.cell(min.y)) {
            for column in self.cell(min.x)..=last(max.x).max(self.cell(min.x)) {
                let tag = exclude_tags.filter(self.tile(column, row));
                if tag.is_some() {
                    return tag;
                }
            }
        }
        Environment::None
    }

    fn ground_height(&self, x: f32, y: f32) -> f32 {
        let column = self.cell(x);
        let mut ground = 0.0f32;

        if column >= 0 && column < self.columns as i64 {
            let start = self.cell(y).min(self.rows as i64 - 1);
            for row in (0..=start).rev() {
                if self.tile(column, row).is_some() {
                    ground = ((row + 1) as f32 * self.tile_size).min(y);
                    break;
                }
            }
        }

        for region in self.regions.values() {
            if region.environment.is_some() && region.spans_x(x) && region.min.y <= y {
                ground = ground.max(region.top().min(y));
            }
        }

        ground
    }

    fn world_height(&self) -> f32 {
        self.rows as f32 * self.tile_size
    }

    fn world_width(&self) -> f32 {
        self.columns as f32 * self.tile_size
    }

    fn is_raining(&self) -> bool {
        self.raining
    }

    fn start_rain(&mut self) {
        if !self.raining {
            tracing::info!(clouds = self.count(Environment::RainCloud), "rain started");
        }
        self.raining = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVEL: &str = "\
..&&......
..........
...===....
#^##~~####
";

    #[test]
    fn test_from_ascii_orientation() {
        let map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        assert_eq!(map.columns(), 10);
        assert_eq!(map.rows(), 4);

        // Last line is row 0
        assert_eq!(map.tile(0, 0), Environment::Solid);
        assert_eq!(map.tile(1, 0), Environment::Bounce);
        assert_eq!(map.tile(4, 0), Environment::Water);
        assert_eq!(map.tile(3, 1), Environment::Platform);
        assert_eq!(map.tile(2, 3), Environment::RainCloud);
    }

    #[test]
    fn test_from_ascii_errors() {
        assert_eq!(TileMap::from_ascii("", 10.0).unwrap_err(), MapError::Empty);
        assert_eq!(
            TileMap::from_ascii("...\n....\n", 10.0).unwrap_err(),
            MapError::Ragged { line: 2, expected: 3, found: 4 }
        );
        assert_eq!(
            TileMap::from_ascii("..x\n", 10.0).unwrap_err(),
            MapError::InvalidGlyph { glyph: 'x', line: 1, column: 3 }
        );
    }

    #[test]
    fn test_classify_points() {
        let map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        assert_eq!(map.classify(5.0, 5.0), Environment::Solid);
        assert_eq!(map.classify(15.0, 9.9), Environment::Bounce);
        assert_eq!(map.classify(15.0, 10.0), Environment::None);
        assert_eq!(map.classify(45.0, 2.0), Environment::Water);
    }

    #[test]
    fn test_classify_out_of_bounds() {
        let map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        assert_eq!(map.classify(-1.0, 20.0), Environment::Solid);
        assert_eq!(map.classify(100.0, 20.0), Environment::Solid);
        assert_eq!(map.classify(50.0, -3.0), Environment::Solid);
        assert_eq!(map.classify(50.0, 1000.0), Environment::None);
    }

    #[test]
    fn test_classify_filtered() {
        let map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        let water = EnvironmentSet::of(&[Environment::Water]);
        assert_eq!(map.classify_filtered(45.0, 2.0, &[], water), Environment::None);
        assert_eq!(map.classify_filtered(5.0, 2.0, &[], water), Environment::Solid);
    }

    #[test]
    fn test_regions_override_tiles() {
        let mut map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        let pad = BodyId(7);
        map.insert_region(pad, Region::new(Vec2::new(60.0, 10.0), Vec2::new(10.0, 5.0), Environment::Bounce));

        assert_eq!(map.classify(65.0, 12.0), Environment::Bounce);
        assert_eq!(map.classify_filtered(65.0, 12.0, &[pad], EnvironmentSet::EMPTY), Environment::None);

        assert!(map.move_region(pad, Vec2::new(80.0, 10.0)));
        assert_eq!(map.classify(65.0, 12.0), Environment::None);
        assert_eq!(map.classify(85.0, 12.0), Environment::Bounce);

        assert!(map.remove_region(pad).is_some());
        assert!(!map.move_region(pad, Vec2::ZERO));
    }

    #[test]
    fn test_vertical_line() {
        let map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        let none = EnvironmentSet::EMPTY;
        // Platform row spans y in [10, 20)
        assert!(map.classify_vertical_line(45.0, 30.0, 15.0, &[], none));
        assert!(!map.classify_vertical_line(45.0, 30.0, 5.0, &[], none));
        let platforms = EnvironmentSet::of(&[Environment::Platform]);
        assert!(!map.classify_vertical_line(45.0, 30.0, 15.0, &[], platforms));
    }

    #[test]
    fn test_classify_box() {
        let map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        let none = EnvironmentSet::EMPTY;
        assert_eq!(map.classify_box(45.0, 10.0, 8.0, 8.0, &[], none), Environment::Platform);
        assert_eq!(map.classify_box(85.0, 10.0, 8.0, 8.0, &[], none), Environment::None);
        // Touching the top of the ground row is not overlap
        assert_eq!(map.classify_box(85.0, 10.0, 8.0, 5.0, &[], none), Environment::None);
    }

    #[test]
    fn test_ground_height() {
        let map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        assert_eq!(map.ground_height(5.0, 35.0), 10.0);
        assert_eq!(map.ground_height(45.0, 35.0), 20.0);
        assert_eq!(map.ground_height(45.0, 15.0), 15.0);
        assert_eq!(map.ground_height(-5.0, 35.0), 0.0);
    }

    #[test]
    fn test_rain() {
        let mut map = TileMap::from_ascii(LEVEL, 10.0).unwrap();
        assert!(!map.is_raining());
        map.start_rain();
        assert!(map.is_raining());
        assert_eq!(map.world_width(), 100.0);
        assert_eq!(map.world_height(), 40.0);
    }
}
