//! Battle-grid geometry
//!
//! Both rulesets share one coordinate type: axial `(q, r)`. The
//! PF2-like ruleset reads it as an 8-connected square grid (Chebyshev
//! distance, 5 feet per square); the GURPS-like ruleset reads it as a
//! hex grid (cube distance). Movement queries return the cheapest path
//! so resolution code can walk it square by square.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

/// A cell on the battle grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub q: i32,
    pub r: i32,
}

impl GridPosition {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Which metric a ruleset uses for its grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    Square,
    Hex,
}

const SQUARE_DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const HEX_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Chebyshev distance on the 8-connected square grid.
pub fn square_distance(a: GridPosition, b: GridPosition) -> i32 {
    (a.q - b.q).abs().max((a.r - b.r).abs())
}

/// Axial hex distance.
pub fn hex_distance(a: GridPosition, b: GridPosition) -> i32 {
    ((a.q - b.q).abs() + (a.q + a.r - b.q - b.r).abs() + (a.r - b.r).abs()) / 2
}

/// Distance under the given metric.
pub fn distance(kind: GridKind, a: GridPosition, b: GridPosition) -> i32 {
    match kind {
        GridKind::Square => square_distance(a, b),
        GridKind::Hex => hex_distance(a, b),
    }
}

/// Neighboring cells under the given metric.
pub fn neighbors(kind: GridKind, pos: GridPosition) -> Vec<GridPosition> {
    match kind {
        GridKind::Square => SQUARE_DIRECTIONS
            .iter()
            .map(|(dq, dr)| GridPosition::new(pos.q + dq, pos.r + dr))
            .collect(),
        GridKind::Hex => HEX_DIRECTIONS
            .iter()
            .map(|(dq, dr)| GridPosition::new(pos.q + dq, pos.r + dr))
            .collect(),
    }
}

/// A cell reachable within a movement budget, with the path taken
#[derive(Debug, Clone)]
pub struct ReachableCell {
    pub position: GridPosition,
    pub cost: i32,
    /// Path from start to this cell, start included
    pub path: Vec<GridPosition>,
}

/// Breadth-first reachability out to `max_cells` moves. Occupied cells
/// cannot be entered or passed through. The start cell itself is not in
/// the result.
pub fn reachable_cells(
    kind: GridKind,
    start: GridPosition,
    max_cells: i32,
    occupied: &[GridPosition],
) -> HashMap<GridPosition, ReachableCell> {
    let blocked: HashSet<GridPosition> = occupied.iter().copied().collect();
    let mut results = HashMap::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(ReachableCell {
        position: start,
        cost: 0,
        path: vec![start],
    });

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.position) {
            continue;
        }
        if current.cost > 0 {
            results.insert(current.position, current.clone());
        }
        if current.cost >= max_cells {
            continue;
        }
        for neighbor in neighbors(kind, current.position) {
            if blocked.contains(&neighbor) || visited.contains(&neighbor) {
                continue;
            }
            let mut path = current.path.clone();
            path.push(neighbor);
            queue.push_back(ReachableCell {
                position: neighbor,
                cost: current.cost + 1,
                path,
            });
        }
    }

    results
}

/// Path to `dest` if it is reachable within the budget.
pub fn path_to(
    kind: GridKind,
    start: GridPosition,
    dest: GridPosition,
    max_cells: i32,
    occupied: &[GridPosition],
) -> Option<ReachableCell> {
    reachable_cells(kind, start, max_cells, occupied).remove(&dest)
}

/// Greedy single step toward a target, skipping occupied cells. Returns
/// None when no neighbor improves the distance.
pub fn step_toward(
    kind: GridKind,
    from: GridPosition,
    target: GridPosition,
    occupied: &[GridPosition],
) -> Option<GridPosition> {
    let current = distance(kind, from, target);
    neighbors(kind, from)
        .into_iter()
        .filter(|n| !occupied.contains(n))
        .map(|n| (distance(kind, n, target), n))
        .filter(|(d, _)| *d < current)
        .min_by_key(|(d, _)| *d)
        .map(|(_, n)| n)
}
