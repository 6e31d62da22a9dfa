//! A* over the tile grid's passability field.
//!
//! Step cost is the Euclidean distance between adjacent cells (`1` or `√2`).
//! The heuristic is Manhattan distance for four-way movement and octile
//! distance for eight-way movement; both are admissible and consistent, so
//! the first time the goal leaves the frontier its cost is optimal.
//!
//! Search is deterministic: neighbours come out in a fixed direction order
//! (reversed on cells where `x + y` is even, which straightens diagonal
//! runs) and frontier ties pop in insertion order.
//!
//! ```
//! use gloam_ecs::component::Cell;
//! use gloam_engine::pathfinding::{find_path, Connectivity};
//! use gloam_engine::tile::{TileCatalog, TileGrid, TileId, TileWrite};
//!
//! let mut tiles = TileGrid::new(4, 1, 1, TileCatalog::dungeon());
//! let floor: Vec<_> = (0..4).map(|x| TileWrite::new(x, 0, TileId::DUNGEON_BRICK_FLOOR)).collect();
//! tiles.add_tiles(0, &floor);
//!
//! let path = find_path(&tiles, Cell::new(0, 0), Cell::new(3, 0), Connectivity::Four).unwrap();
//! assert_eq!(path.cells.len(), 4);
//! assert_eq!(path.cost, 3.0);
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use gloam_ecs::component::Cell;

use crate::collision::COLLISION_LAYER;
use crate::tile::TileGrid;

pub type Location = Cell;

const STRAIGHT: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(i32, i32); 4] = [(1, -1), (-1, -1), (1, 1), (-1, 1)];

/// Where a path may go. Implemented by [`TileGrid`] over the collision
/// layer, the same predicate the move system uses.
pub trait Passability {
    fn in_bounds(&self, cell: Location) -> bool;
    fn is_passable(&self, cell: Location) -> bool;
}

impl Passability for TileGrid {
    fn in_bounds(&self, cell: Location) -> bool {
        TileGrid::in_bounds(self, cell.x, cell.y)
    }

    fn is_passable(&self, cell: Location) -> bool {
        TileGrid::is_passable(self, COLLISION_LAYER, cell.x, cell.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Four,
    Eight,
}

impl Connectivity {
    fn heuristic(self, a: Location, b: Location) -> f64 {
        let dx = f64::from((a.x - b.x).abs());
        let dy = f64::from((a.y - b.y).abs());
        match self {
            Connectivity::Four => dx + dy,
            Connectivity::Eight => dx.max(dy) + (std::f64::consts::SQRT_2 - 1.0) * dx.min(dy),
        }
    }
}

/// A found path, start first.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub cells: Vec<Location>,
    pub cost: f64,
}

/// Bookkeeping of one search, scoped to one call.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Predecessor of every reached cell; the start maps to itself.
    pub came_from: HashMap<Location, Location>,
    pub cost_so_far: HashMap<Location, f64>,
}

impl SearchState {
    pub fn reached(&self, cell: Location) -> bool {
        self.came_from.contains_key(&cell)
    }

    /// Walk `came_from` back from `goal`. `None` if the goal was not reached.
    pub fn path_to(&self, start: Location, goal: Location) -> Option<Path> {
        let cost = *self.cost_so_far.get(&goal)?;
        let mut cells = vec![goal];
        let mut current = goal;
        while current != start {
            current = *self.came_from.get(&current)?;
            cells.push(current);
        }
        cells.reverse();
        Some(Path { cells, cost })
    }
}

#[derive(Debug)]
struct Frontier {
    priority: f64,
    seq: u64,
    cost: f64,
    cell: Location,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    /// Reversed so [`BinaryHeap`] pops the lowest priority, oldest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Passable in-bounds neighbours of `cell` in direction order.
pub fn neighbors(
    map: &impl Passability,
    cell: Location,
    connectivity: Connectivity,
) -> Vec<Location> {
    let diagonal: &[(i32, i32)] = match connectivity {
        Connectivity::Four => &[],
        Connectivity::Eight => &DIAGONAL,
    };
    let mut out: Vec<Location> = STRAIGHT
        .iter()
        .chain(diagonal)
        .map(|&(dx, dy)| Cell::new(cell.x + dx, cell.y + dy))
        .filter(|&next| map.in_bounds(next) && map.is_passable(next))
        .collect();
    if (cell.x + cell.y).rem_euclid(2) == 0 {
        out.reverse();
    }
    out
}

fn step_cost(a: Location, b: Location) -> f64 {
    if a.x != b.x && a.y != b.y {
        std::f64::consts::SQRT_2
    } else {
        1.0
    }
}

/// Run A* from `start` until `goal` is popped or the frontier runs dry.
pub fn search(
    map: &impl Passability,
    start: Location,
    goal: Location,
    connectivity: Connectivity,
) -> SearchState {
    let mut state = SearchState::default();
    state.came_from.insert(start, start);
    state.cost_so_far.insert(start, 0.0);

    let mut frontier = BinaryHeap::new();
    let mut seq = 0u64;
    frontier.push(Frontier {
        priority: 0.0,
        seq,
        cost: 0.0,
        cell: start,
    });

    let mut expanded = 0usize;
    while let Some(entry) = frontier.pop() {
        let current = entry.cell;
        if current == goal {
            break;
        }
        // A cheaper route to this cell was queued after this entry.
        if state
            .cost_so_far
            .get(&current)
            .is_some_and(|&best| entry.cost > best)
        {
            continue;
        }
        expanded += 1;

        for next in neighbors(map, current, connectivity) {
            let new_cost = entry.cost + step_cost(current, next);
            let improves = state
                .cost_so_far
                .get(&next)
                .map_or(true, |&known| new_cost < known);
            if improves {
                state.cost_so_far.insert(next, new_cost);
                state.came_from.insert(next, current);
                seq += 1;
                frontier.push(Frontier {
                    priority: new_cost + connectivity.heuristic(next, goal),
                    seq,
                    cost: new_cost,
                    cell: next,
                });
            }
        }
    }

    tracing::trace!(
        start = ?start,
        goal = ?goal,
        expanded,
        reached = state.reached(goal),
        "path search finished"
    );
    state
}

/// Shortest path from `start` to `goal`, or `None` when the goal cannot be
/// reached. `start == goal` yields the single-cell path.
pub fn find_path(
    map: &impl Passability,
    start: Location,
    goal: Location,
    connectivity: Connectivity,
) -> Option<Path> {
    if start == goal {
        return Some(Path {
            cells: vec![start],
            cost: 0.0,
        });
    }
    search(map, start, goal, connectivity).path_to(start, goal)
}
