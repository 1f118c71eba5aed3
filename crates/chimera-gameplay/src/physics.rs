//! Static collision queries used for wall checks and line of sight.
//!
//! The world is a grid of unit cells; a cell is addressed by the floor of a
//! world position. Movement itself is kinematic and lives with each agent.

use std::collections::BTreeSet;

use chimera_common::Vec2;
use serde::{Deserialize, Serialize};

/// Step length used when marching a segment through the grid.
const RAY_STEP: f32 = 0.25;

/// Radius of the small overlap check done halfway along a wall check.
const PROBE_OVERLAP_RADIUS: f32 = 0.05;

/// Collision query interface for checking cell solidity.
///
/// This trait abstracts whatever owns level geometry. Implementations answer
/// whether the cell at the given coordinates blocks movement and sight.
pub trait CollisionQuery {
    /// Checks if a cell at the given world coordinates is solid.
    fn is_solid(&self, x: i32, y: i32) -> bool;

    /// Checks if the cell containing `point` is solid.
    fn is_solid_at(&self, point: Vec2) -> bool {
        self.is_solid(point.x.floor() as i32, point.y.floor() as i32)
    }
}

/// Grid of solid cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionGrid {
    /// Set of solid cells (x, y)
    solid_cells: BTreeSet<(i32, i32)>,
    /// Every cell with y below this is solid
    floor_level: Option<i32>,
}

impl CollisionGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cell as solid.
    pub fn set_solid(&mut self, x: i32, y: i32) {
        self.solid_cells.insert((x, y));
    }

    /// Clears a solid cell.
    pub fn clear(&mut self, x: i32, y: i32) {
        self.solid_cells.remove(&(x, y));
    }

    /// Fills a vertical wall at column `x` from `y_min` to `y_max` inclusive.
    pub fn add_wall(&mut self, x: i32, y_min: i32, y_max: i32) {
        for y in y_min..=y_max {
            self.set_solid(x, y);
        }
    }

    /// Sets the floor level (all cells with y below it are solid).
    pub fn set_floor_level(&mut self, y: i32) {
        self.floor_level = Some(y);
    }

    /// Number of explicitly solid cells.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.solid_cells.len()
    }
}

impl CollisionQuery for CollisionGrid {
    fn is_solid(&self, x: i32, y: i32) -> bool {
        if let Some(floor) = self.floor_level {
            if y < floor {
                return true;
            }
        }
        self.solid_cells.contains(&(x, y))
    }
}

/// Short forward wall check used by ground patrols.
///
/// Reports a hit when the check tip is solid or when the small overlap
/// circle halfway along the check touches a solid cell.
pub fn wall_ahead<C: CollisionQuery + ?Sized>(
    collision: &C,
    origin: Vec2,
    direction: Vec2,
    distance: f32,
) -> bool {
    let dir = direction.normalize_or_zero();
    if dir == Vec2::ZERO || distance <= 0.0 {
        return false;
    }
    if collision.is_solid_at(origin + dir * distance) {
        return true;
    }
    let mid = origin + dir * (distance * 0.5);
    [
        Vec2::ZERO,
        Vec2::new(PROBE_OVERLAP_RADIUS, 0.0),
        Vec2::new(-PROBE_OVERLAP_RADIUS, 0.0),
        Vec2::new(0.0, PROBE_OVERLAP_RADIUS),
        Vec2::new(0.0, -PROBE_OVERLAP_RADIUS),
    ]
    .iter()
    .any(|offset| collision.is_solid_at(mid + *offset))
}

/// Whether any solid cell lies on the segment between `from` and `to`.
///
/// The cells containing the endpoints are not tested, so bodies standing
/// against a wall can still see each other.
pub fn is_obstructed<C: CollisionQuery + ?Sized>(collision: &C, from: Vec2, to: Vec2) -> bool {
    let delta = to - from;
    let length = delta.length();
    if length <= RAY_STEP {
        return false;
    }
    let steps = (length / RAY_STEP).ceil() as usize;
    (1..steps).any(|i| {
        let point = from + delta * (i as f32 / steps as f32);
        collision.is_solid_at(point)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_solidity() {
        let mut grid = CollisionGrid::new();
        grid.set_solid(3, 0);
        assert!(grid.is_solid(3, 0));
        assert!(grid.is_solid_at(Vec2::new(3.7, 0.2)));
        assert!(!grid.is_solid(2, 0));

        grid.clear(3, 0);
        assert!(!grid.is_solid(3, 0));
    }

    #[test]
    fn test_floor_level() {
        let mut grid = CollisionGrid::new();
        grid.set_floor_level(0);
        assert!(grid.is_solid(10, -1));
        assert!(!grid.is_solid(10, 0));
    }

    #[test]
    fn test_wall_ahead_hits_only_facing_wall() {
        let mut grid = CollisionGrid::new();
        grid.add_wall(5, 0, 3);
        let origin = Vec2::new(4.85, 0.5);
        assert!(wall_ahead(&grid, origin, Vec2::X, 0.2));
        assert!(!wall_ahead(&grid, origin, -Vec2::X, 0.2));
        assert!(!wall_ahead(&grid, Vec2::new(2.0, 0.5), Vec2::X, 0.2));
    }

    #[test]
    fn test_line_of_sight_through_wall() {
        let mut grid = CollisionGrid::new();
        grid.add_wall(5, 0, 3);
        assert!(is_obstructed(&grid, Vec2::new(0.0, 1.0), Vec2::new(10.0, 1.0)));
        assert!(!is_obstructed(&grid, Vec2::new(0.0, 1.0), Vec2::new(4.0, 1.0)));
        assert!(!is_obstructed(&grid, Vec2::new(0.0, 8.0), Vec2::new(10.0, 8.0)));
    }
}
