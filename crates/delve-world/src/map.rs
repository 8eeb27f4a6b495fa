//! Tiles and level generation.
//!
//! Levels are `MAP_WIDTH x MAP_HEIGHT` grids ringed by indestructible border
//! wall. A generated level is dirt floor with rectangular brick obstructions
//! dropped onto it; any floor pocket cut off from the stairs is filled in so
//! every open tile is reachable. Test mode generates an empty room without
//! drawing any random numbers.

use std::collections::VecDeque;

use delve_types::{Coord, DIRECTIONS, MAP_HEIGHT, MAP_WIDTH, MapMatrix, TileType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorldError;
use crate::random::Randomness;

/// Levels below this one have stairs down.
pub const FINAL_DUNGEON_LEVEL: i32 = 5;

/// Levels with fewer reachable open tiles are regenerated.
const MIN_OPEN_TILES: usize = 250;

/// Attempts before generation gives up.
const MAX_GENERATION_ATTEMPTS: u32 = 50;

/// One map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain.
    pub tile_type: TileType,
    /// Cosmetic variation, 0-255.
    pub aesthetic_index: u8,
}

impl Tile {
    /// Never observed.
    pub const UNKNOWN: Self = Self::new(TileType::Unknown, 0);

    /// Construct a tile.
    pub const fn new(tile_type: TileType, aesthetic_index: u8) -> Self {
        Self {
            tile_type,
            aesthetic_index,
        }
    }

    /// Whether individuals can stand here and sight passes through.
    pub const fn is_open_space(self) -> bool {
        self.tile_type.is_open_space()
    }
}

/// The terrain of a freshly generated level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    /// The tiles.
    pub tiles: MapMatrix<Tile>,
    /// Where the stairs are, on levels that have them.
    pub stairs_down: Option<Coord>,
}

fn is_border(coord: Coord) -> bool {
    coord.x == 0
        || coord.y == 0
        || coord.x == MAP_WIDTH.saturating_sub(1)
        || coord.y == MAP_HEIGHT.saturating_sub(1)
}

/// The test-mode level: a bordered dirt room with stairs in the bottom-right
/// corner (on levels that have stairs).
pub fn test_level(dungeon_level: i32) -> Level {
    let mut tiles = MapMatrix::filled(Tile::new(TileType::DirtFloor, 0));
    for coord in delve_types::geometry::all_coords() {
        if is_border(coord) {
            tiles.set(coord, Tile::new(TileType::BorderWall, 0));
        }
    }
    let stairs_down = (dungeon_level < FINAL_DUNGEON_LEVEL).then(|| {
        let stairs = Coord::new(MAP_WIDTH.saturating_sub(2), MAP_HEIGHT.saturating_sub(2));
        tiles.set(stairs, Tile::new(TileType::StairsDown, 0));
        stairs
    });
    Level { tiles, stairs_down }
}

/// Generate a level. Test mode returns [`test_level`] without drawing.
///
/// # Errors
///
/// Returns [`WorldError::MapGenerationFailed`] if no acceptable level was
/// produced within the attempt budget, or a draw error.
pub fn generate_level<R: Randomness + ?Sized>(
    rng: &mut R,
    dungeon_level: i32,
) -> Result<Level, WorldError> {
    if rng.is_test_mode() {
        return Ok(test_level(dungeon_level));
    }
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let level = generate_candidate(rng, dungeon_level)?;
        let reachable = level.tiles.iter().filter(|t| t.is_open_space()).count();
        if reachable >= MIN_OPEN_TILES {
            debug!(dungeon_level, attempt, reachable, "Generated level");
            return Ok(level);
        }
        debug!(dungeon_level, attempt, reachable, "Rejected cramped level");
    }
    Err(WorldError::MapGenerationFailed {
        attempts: MAX_GENERATION_ATTEMPTS,
    })
}

fn generate_candidate<R: Randomness + ?Sized>(
    rng: &mut R,
    dungeon_level: i32,
) -> Result<Level, WorldError> {
    let mut tiles = MapMatrix::filled(Tile::UNKNOWN);
    for coord in delve_types::geometry::all_coords() {
        let aesthetic = u8::try_from(rng.random_int(256, "aesthetic")?).unwrap_or(0);
        let tile_type = if is_border(coord) {
            TileType::BorderWall
        } else {
            TileType::DirtFloor
        };
        tiles.set(coord, Tile::new(tile_type, aesthetic));
    }

    let rock_count = rng.random_range(20, 51, "rock_count")?;
    for _ in 0..rock_count {
        let width = rng.random_range(2, 9, "rock_width")?;
        let height = rng.random_range(2, 9, "rock_height")?;
        let x = rng.random_range(1, MAP_WIDTH.saturating_sub(width), "rock_x")?;
        let y = rng.random_range(1, MAP_HEIGHT.saturating_sub(height), "rock_y")?;
        let wall = if rng.one_in(2, "rock_color")? {
            TileType::BrownBrickWall
        } else {
            TileType::GrayBrickWall
        };
        for dy in 0..height {
            for dx in 0..width {
                let coord = Coord::new(x.saturating_add(dx), y.saturating_add(dy));
                if let Some(tile) = tiles.get_mut(coord) {
                    if !is_border(coord) {
                        tile.tile_type = wall;
                    }
                }
            }
        }
    }

    let open: Vec<Coord> = delve_types::geometry::all_coords()
        .filter(|c| tiles.get(*c).is_some_and(|t| t.is_open_space()))
        .collect();
    let Some(anchor) = crate::random::choose(rng, &open, "stairs_location")? else {
        return Ok(Level {
            tiles,
            stairs_down: None,
        });
    };

    fill_unreachable(&mut tiles, anchor);

    let stairs_down = if dungeon_level < FINAL_DUNGEON_LEVEL {
        for coord in delve_types::geometry::all_coords() {
            if coord.king_distance(anchor) <= 2 {
                if let Some(tile) = tiles.get_mut(coord) {
                    if tile.tile_type == TileType::DirtFloor {
                        tile.tile_type = TileType::MarbleFloor;
                    }
                }
            }
        }
        if let Some(tile) = tiles.get_mut(anchor) {
            tile.tile_type = TileType::StairsDown;
        }
        Some(anchor)
    } else {
        None
    };
    Ok(Level { tiles, stairs_down })
}

/// Turn every open tile that cannot reach `anchor` into wall.
fn fill_unreachable(tiles: &mut MapMatrix<Tile>, anchor: Coord) {
    let mut reached = MapMatrix::filled(false);
    let mut queue = VecDeque::from([anchor]);
    reached.set(anchor, true);
    while let Some(here) = queue.pop_front() {
        for direction in DIRECTIONS {
            let next = here + direction;
            let open = tiles.get(next).is_some_and(|t| t.is_open_space());
            if open && reached.get(next) == Some(&false) {
                reached.set(next, true);
                queue.push_back(next);
            }
        }
    }
    for coord in delve_types::geometry::all_coords() {
        if reached.get(coord) == Some(&true) {
            continue;
        }
        if let Some(tile) = tiles.get_mut(coord) {
            if tile.is_open_space() {
                tile.tile_type = TileType::GrayBrickWall;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    #[test]
    fn test_level_is_a_bordered_room() {
        let level = test_level(0);
        assert_eq!(
            level.tiles.get(Coord::new(0, 0)).unwrap().tile_type,
            TileType::BorderWall
        );
        assert_eq!(
            level.tiles.get(Coord::new(1, 1)).unwrap().tile_type,
            TileType::DirtFloor
        );
        let stairs = level.stairs_down.unwrap();
        assert_eq!(stairs, Coord::new(48, 23));
        assert_eq!(
            level.tiles.get(stairs).unwrap().tile_type,
            TileType::StairsDown
        );
        assert!(test_level(FINAL_DUNGEON_LEVEL).stairs_down.is_none());
    }

    #[test]
    fn test_mode_generation_draws_nothing() {
        let mut rng = SeededRandom::test_mode();
        let before = rng.state();
        let level = generate_level(&mut rng, 0).unwrap();
        assert_eq!(level, test_level(0));
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn generated_levels_are_deterministic() {
        let a = generate_level(&mut SeededRandom::new(42), 1).unwrap();
        let b = generate_level(&mut SeededRandom::new(42), 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn generated_floor_is_connected_to_the_stairs() {
        let level = generate_level(&mut SeededRandom::new(9), 0).unwrap();
        let stairs = level.stairs_down.unwrap();
        let mut copy = level.tiles.clone();
        fill_unreachable(&mut copy, stairs);
        assert_eq!(copy, level.tiles);
        for coord in delve_types::geometry::all_coords() {
            if is_border(coord) {
                assert_eq!(
                    level.tiles.get(coord).unwrap().tile_type,
                    TileType::BorderWall
                );
            }
        }
    }
}
