//! Breadth-first path finding over what an individual knows of the map.
//!
//! Paths only cross tiles the knowledge records as open space. Tiles never
//! seen read as `unknown`, which counts as open, so an individual will
//! happily plan through unexplored darkness and discover walls on the way.

use std::collections::{BTreeMap, VecDeque};

use delve_types::Coord;
use delve_world::Knowledge;

/// Step order: straight steps are tried before diagonal ones so that paths
/// prefer to hug corridors.
const STEP_ORDER: [Coord; 8] = [
    Coord::new(0, -1),
    Coord::new(1, 0),
    Coord::new(0, 1),
    Coord::new(-1, 0),
    Coord::new(-1, -1),
    Coord::new(1, -1),
    Coord::new(1, 1),
    Coord::new(-1, 1),
];

/// The shortest known path from `start` to `goal`.
///
/// The returned steps exclude `start` and end with `goal`. Returns `None`
/// when `goal` cannot be reached through known open space, or when the two
/// are the same tile.
pub fn find_path(knowledge: &Knowledge, start: Coord, goal: Coord) -> Option<Vec<Coord>> {
    if start == goal || !goal.is_in_bounds() {
        return None;
    }

    // Predecessor of every tile reached so far.
    let mut prev: BTreeMap<Coord, Coord> = BTreeMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            break;
        }
        for step in STEP_ORDER {
            let next = current + step;
            if next == start || prev.contains_key(&next) {
                continue;
            }
            if !next.is_in_bounds() || !knowledge.tile(next).is_open_space() {
                continue;
            }
            prev.insert(next, current);
            queue.push_back(next);
        }
    }

    if !prev.contains_key(&goal) {
        return None;
    }

    let mut path = VecDeque::new();
    let mut current = goal;
    while current != start {
        path.push_front(current);
        current = *prev.get(&current)?;
    }
    Some(path.into_iter().collect())
}
