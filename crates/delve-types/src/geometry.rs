//! Map coordinates and the fixed-size tile matrix.
//!
//! The dungeon is a single `MAP_WIDTH x MAP_HEIGHT` grid. Coordinates are
//! signed so that direction vectors and out-of-bounds probes can be expressed
//! without casts; [`MapMatrix`] accessors return `None` outside the grid.

use core::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Width of every dungeon level in tiles.
pub const MAP_WIDTH: i32 = 50;

/// Height of every dungeon level in tiles.
pub const MAP_HEIGHT: i32 = 25;

/// A tile position or a direction vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Column, growing east.
    pub x: i32,
    /// Row, growing south.
    pub y: i32,
}

/// The eight unit directions, clockwise from north-west.
pub const DIRECTIONS: [Coord; 8] = [
    Coord::new(-1, -1),
    Coord::new(0, -1),
    Coord::new(1, -1),
    Coord::new(1, 0),
    Coord::new(1, 1),
    Coord::new(0, 1),
    Coord::new(-1, 1),
    Coord::new(-1, 0),
];

impl Coord {
    /// Construct a coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether this position lies inside the map.
    pub const fn is_in_bounds(self) -> bool {
        self.x >= 0 && self.x < MAP_WIDTH && self.y >= 0 && self.y < MAP_HEIGHT
    }

    /// Whether this vector is one of the eight [`DIRECTIONS`].
    pub const fn is_unit_direction(self) -> bool {
        self.x >= -1 && self.x <= 1 && self.y >= -1 && self.y <= 1 && !(self.x == 0 && self.y == 0)
    }

    /// Component-wise sign, turning any vector into a unit-or-zero step.
    pub const fn signum(self) -> Self {
        Self::new(self.x.signum(), self.y.signum())
    }

    /// Squared Euclidean distance to another coordinate.
    pub const fn distance_squared(self, other: Self) -> i32 {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Chebyshev (king-move) distance to another coordinate.
    pub const fn king_distance(self, other: Self) -> i32 {
        let dx = self.x.saturating_sub(other.x).saturating_abs();
        let dy = self.y.saturating_sub(other.y).saturating_abs();
        if dx > dy { dx } else { dy }
    }

    /// Clamp into the map bounds.
    pub fn clamp_to_map(self) -> Self {
        Self::new(
            self.x.clamp(0, MAP_WIDTH.saturating_sub(1)),
            self.y.clamp(0, MAP_HEIGHT.saturating_sub(1)),
        )
    }

    /// Row-major index into a map-sized buffer, if in bounds.
    fn index(self) -> Option<usize> {
        if !self.is_in_bounds() {
            return None;
        }
        let flat = self.y.checked_mul(MAP_WIDTH)?.checked_add(self.x)?;
        usize::try_from(flat).ok()
    }
}

impl Add for Coord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub for Coord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

/// Iterate over every map coordinate in row-major order.
pub fn all_coords() -> impl Iterator<Item = Coord> {
    (0..MAP_HEIGHT).flat_map(|y| (0..MAP_WIDTH).map(move |x| Coord::new(x, y)))
}

/// A value for every tile of one dungeon level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapMatrix<T> {
    cells: Vec<T>,
}

impl<T: Clone> MapMatrix<T> {
    /// Create a matrix with every cell set to `value`.
    pub fn filled(value: T) -> Self {
        let count = usize::try_from(MAP_WIDTH.saturating_mul(MAP_HEIGHT)).unwrap_or(0);
        Self {
            cells: vec![value; count],
        }
    }

    /// Overwrite every cell with `value`.
    pub fn fill(&mut self, value: &T) {
        for cell in &mut self.cells {
            cell.clone_from(value);
        }
    }
}

impl<T> MapMatrix<T> {
    /// Borrow the cell at `coord`, or `None` when out of bounds.
    pub fn get(&self, coord: Coord) -> Option<&T> {
        self.cells.get(coord.index()?)
    }

    /// Mutably borrow the cell at `coord`, or `None` when out of bounds.
    pub fn get_mut(&mut self, coord: Coord) -> Option<&mut T> {
        let index = coord.index()?;
        self.cells.get_mut(index)
    }

    /// Set the cell at `coord`. Out-of-bounds writes are ignored and
    /// reported by returning `false`.
    pub fn set(&mut self, coord: Coord, value: T) -> bool {
        match self.get_mut(coord) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Iterate over cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bounds_checks_all_edges() {
        assert!(Coord::new(0, 0).is_in_bounds());
        assert!(Coord::new(MAP_WIDTH - 1, MAP_HEIGHT - 1).is_in_bounds());
        assert!(!Coord::new(-1, 0).is_in_bounds());
        assert!(!Coord::new(MAP_WIDTH, 0).is_in_bounds());
        assert!(!Coord::new(0, MAP_HEIGHT).is_in_bounds());
    }

    #[test]
    fn matrix_get_and_set() {
        let mut matrix = MapMatrix::filled(0_u8);
        assert!(matrix.set(Coord::new(3, 4), 7));
        assert_eq!(matrix.get(Coord::new(3, 4)), Some(&7));
        assert_eq!(matrix.get(Coord::new(4, 3)), Some(&0));
        assert!(!matrix.set(Coord::new(-1, 4), 9));
        assert_eq!(matrix.get(Coord::new(MAP_WIDTH, 0)), None);
    }

    #[test]
    fn all_coords_is_row_major() {
        let coords: Vec<Coord> = all_coords().take(2).collect();
        assert_eq!(coords, vec![Coord::new(0, 0), Coord::new(1, 0)]);
        assert_eq!(all_coords().count(), 1250);
    }

    #[test]
    fn directions_are_units() {
        assert!(DIRECTIONS.iter().all(|d| d.is_unit_direction()));
        assert!(!Coord::new(0, 0).is_unit_direction());
        assert!(!Coord::new(2, 0).is_unit_direction());
    }

    #[test]
    fn distances() {
        let a = Coord::new(1, 1);
        let b = Coord::new(4, 5);
        assert_eq!(a.distance_squared(b), 25);
        assert_eq!(a.king_distance(b), 4);
    }
}
