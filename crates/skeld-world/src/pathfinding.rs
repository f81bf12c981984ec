//! A* search over the waypoint graph.
//!
//! Edge cost and heuristic are both the Euclidean distance between waypoint
//! positions. The heuristic is consistent, so the first time the goal leaves
//! the open set its path is optimal.
//!
//! The open set is a plain vector scanned for the lowest f-score; the first
//! node found with that score wins.

use skeld_types::Point;

use crate::map::{ShipMap, WaypointId};

impl ShipMap {
    /// Euclidean distance between two waypoints, `None` if either is missing.
    fn waypoint_distance(&self, a: WaypointId, b: WaypointId) -> Option<f64> {
        let pa = self.waypoint(a)?.position;
        let pb = self.waypoint(b)?.position;
        Some(pa.distance(pb))
    }

    /// Shortest waypoint sequence from `start` to `goal`, inclusive.
    ///
    /// Returns `Some(vec![start])` when both ends coincide and `None` when no
    /// route exists or either end is unknown.
    pub fn find_path(&self, start: WaypointId, goal: WaypointId) -> Option<Vec<WaypointId>> {
        let n = self.waypoint_count();
        if start >= n || goal >= n {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let mut g_score = vec![f64::INFINITY; n];
        let mut f_score = vec![f64::INFINITY; n];
        let mut came_from: Vec<Option<WaypointId>> = vec![None; n];
        let mut open: Vec<WaypointId> = vec![start];

        *g_score.get_mut(start)? = 0.0;
        *f_score.get_mut(start)? = self.waypoint_distance(start, goal)?;

        while !open.is_empty() {
            let mut best: Option<(usize, f64)> = None;
            for (slot, node) in open.iter().enumerate() {
                let f = f_score.get(*node).copied().unwrap_or(f64::INFINITY);
                if best.is_none_or(|(_, bf)| f < bf) {
                    best = Some((slot, f));
                }
            }
            let (slot, _) = best?;
            let current = open.remove(slot);

            if current == goal {
                return Some(reconstruct(&came_from, current));
            }

            let current_g = g_score.get(current).copied()?;
            for &neighbor in self.neighbors(current) {
                let Some(step) = self.waypoint_distance(current, neighbor) else {
                    continue;
                };
                let tentative = current_g + step;
                let Some(known) = g_score.get_mut(neighbor) else {
                    continue;
                };
                if tentative < *known {
                    *known = tentative;
                    if let Some(slot) = came_from.get_mut(neighbor) {
                        *slot = Some(current);
                    }
                    let h = self.waypoint_distance(neighbor, goal).unwrap_or(0.0);
                    if let Some(f) = f_score.get_mut(neighbor) {
                        *f = tentative + h;
                    }
                    if !open.contains(&neighbor) {
                        open.push(neighbor);
                    }
                }
            }
        }

        None
    }

    /// Walkable polyline between two arbitrary points.
    ///
    /// Both ends snap to their nearest waypoint; the result is the positions
    /// of the waypoints along the shortest route between them.
    pub fn find_path_between_points(&self, from: Point, to: Point) -> Option<Vec<Point>> {
        let start = self.nearest_waypoint(from)?;
        let goal = self.nearest_waypoint(to)?;
        let ids = self.find_path(start, goal)?;
        ids.into_iter()
            .map(|id| self.waypoint(id).map(|wp| wp.position))
            .collect()
    }

    /// Total Euclidean length of a waypoint sequence, `None` if any
    /// consecutive pair is not connected by an edge.
    pub fn path_cost(&self, path: &[WaypointId]) -> Option<f64> {
        let mut total = 0.0;
        for pair in path.windows(2) {
            let [a, b] = pair else {
                return None;
            };
            if !self.neighbors(*a).contains(b) {
                return None;
            }
            total += self.waypoint_distance(*a, *b)?;
        }
        Some(total)
    }
}

/// Walk predecessor links back from `end` and return the forward path.
fn reconstruct(came_from: &[Option<WaypointId>], end: WaypointId) -> Vec<WaypointId> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(Some(prev)) = came_from.get(current) {
        path.push(*prev);
        current = *prev;
    }
    path.reverse();
    path
}
