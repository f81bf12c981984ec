//! Ship map: rooms, corridors, waypoint graph, vents, and walls.
//!
//! The [`ShipMap`] is the spatial backbone of the simulation. Rooms and
//! corridors define where an agent may stand, the waypoint graph defines how
//! it walks between them, and vents give impostors one-way shortcuts.
//!
//! Waypoint edges are stored as an undirected adjacency list indexed by
//! [`WaypointId`]; neighbor order is insertion order, which keeps search
//! results stable for a given build order.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use skeld_types::{Point, Rect, RoomId};

use crate::error::WorldError;

/// Index of a waypoint in the navigation graph.
pub type WaypointId = usize;

/// Index of a vent in the vent network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VentId(pub usize);

impl fmt::Display for VentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vent#{}", self.0)
    }
}

/// A named room with its floor rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Walkable floor area.
    pub bounds: Rect,
    /// Point agents aim for when heading to the room.
    pub center: Point,
}

/// A walkable corridor connecting rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    /// Human-readable name ("Hallway between ...").
    pub name: String,
    /// Walkable floor area.
    pub bounds: Rect,
}

/// A node of the navigation graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position on the ship plane.
    pub position: Point,
    /// Room the waypoint sits in, `None` for corridor waypoints.
    pub room: Option<RoomId>,
}

/// A vent. Links are one-way: a vent lists where it can exit to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vent {
    /// Name of the vent.
    pub name: String,
    /// Position of the grate.
    pub position: Point,
    /// Room containing the vent.
    pub room: RoomId,
    /// Vents reachable from this one.
    pub links: Vec<VentId>,
}

/// What occupies a point of the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// Inside a room.
    Room(RoomId),
    /// Inside a corridor, by corridor index.
    Corridor(usize),
    /// Outside every room and corridor.
    Void,
}

impl Area {
    /// The room, if this area is one.
    pub const fn room(self) -> Option<RoomId> {
        match self {
            Self::Room(r) => Some(r),
            Self::Corridor(_) | Self::Void => None,
        }
    }
}

/// The complete ship map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipMap {
    /// Width of the plane.
    width: f64,
    /// Height of the plane.
    height: f64,
    /// Rooms indexed by identifier.
    rooms: BTreeMap<RoomId, Room>,
    /// Corridors in lookup order.
    corridors: Vec<Corridor>,
    /// Wall obstacles that block free movement.
    walls: Vec<Rect>,
    /// Navigation nodes.
    waypoints: Vec<Waypoint>,
    /// Undirected adjacency, same length as `waypoints`.
    edges: Vec<Vec<WaypointId>>,
    /// Vent network.
    vents: Vec<Vent>,
    /// Rooms considered next door to each room.
    adjacency: BTreeMap<RoomId, Vec<RoomId>>,
}

impl ShipMap {
    /// Create an empty map of the given size.
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            rooms: BTreeMap::new(),
            corridors: Vec::new(),
            walls: Vec::new(),
            waypoints: Vec::new(),
            edges: Vec::new(),
            vents: Vec::new(),
            adjacency: BTreeMap::new(),
        }
    }

    /// Width of the plane.
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Height of the plane.
    pub const fn height(&self) -> f64 {
        self.height
    }

    // -------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------

    /// Register a room.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateRoom`] if the room already exists.
    pub fn add_room(&mut self, id: RoomId, bounds: Rect, center: Point) -> Result<(), WorldError> {
        if self.rooms.contains_key(&id) {
            return Err(WorldError::DuplicateRoom(id));
        }
        self.rooms.insert(id, Room { id, bounds, center });
        Ok(())
    }

    /// Register a corridor. Corridors are matched in registration order.
    pub fn add_corridor(&mut self, name: impl Into<String>, bounds: Rect) {
        self.corridors.push(Corridor {
            name: name.into(),
            bounds,
        });
    }

    /// Register a wall obstacle.
    pub fn add_wall(&mut self, bounds: Rect) {
        self.walls.push(bounds);
    }

    /// Add a waypoint and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoomNotFound`] if `room` names an unregistered room.
    pub fn add_waypoint(
        &mut self,
        position: Point,
        room: Option<RoomId>,
    ) -> Result<WaypointId, WorldError> {
        if let Some(r) = room
            && !self.rooms.contains_key(&r)
        {
            return Err(WorldError::RoomNotFound(r));
        }
        let id = self.waypoints.len();
        self.waypoints.push(Waypoint { position, room });
        self.edges.push(Vec::new());
        Ok(id)
    }

    /// Connect two waypoints in both directions. Connecting an existing pair
    /// again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownWaypoint`] if either end is missing.
    pub fn add_edge(&mut self, a: WaypointId, b: WaypointId) -> Result<(), WorldError> {
        if a >= self.waypoints.len() {
            return Err(WorldError::UnknownWaypoint(a));
        }
        if b >= self.waypoints.len() {
            return Err(WorldError::UnknownWaypoint(b));
        }
        for (from, to) in [(a, b), (b, a)] {
            if let Some(list) = self.edges.get_mut(from)
                && !list.contains(&to)
            {
                list.push(to);
            }
        }
        Ok(())
    }

    /// Add an unlinked vent and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoomNotFound`] for an unregistered room, or
    /// [`WorldError::DuplicateVent`] if the name is taken.
    pub fn add_vent(
        &mut self,
        name: impl Into<String>,
        position: Point,
        room: RoomId,
    ) -> Result<VentId, WorldError> {
        let name = name.into();
        if !self.rooms.contains_key(&room) {
            return Err(WorldError::RoomNotFound(room));
        }
        if self.vent_by_name(&name).is_some() {
            return Err(WorldError::DuplicateVent(name));
        }
        let id = VentId(self.vents.len());
        self.vents.push(Vent {
            name,
            position,
            room,
            links: Vec::new(),
        });
        Ok(id)
    }

    /// Add a one-way link from vent `from` to vent `to`, both by name.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownVent`] if either name is unknown, or
    /// [`WorldError::SelfLinkedVent`] for a link to itself.
    pub fn link_vents(&mut self, from: &str, to: &str) -> Result<(), WorldError> {
        let src = self
            .vent_by_name(from)
            .ok_or_else(|| WorldError::UnknownVent(from.to_owned()))?;
        let dst = self
            .vent_by_name(to)
            .ok_or_else(|| WorldError::UnknownVent(to.to_owned()))?;
        if src == dst {
            return Err(WorldError::SelfLinkedVent(src));
        }
        if let Some(vent) = self.vents.get_mut(src.0)
            && !vent.links.contains(&dst)
        {
            vent.links.push(dst);
        }
        Ok(())
    }

    /// Declare the rooms next door to `room`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoomNotFound`] if any room is unregistered.
    pub fn set_adjacent(&mut self, room: RoomId, neighbors: &[RoomId]) -> Result<(), WorldError> {
        for r in std::iter::once(&room).chain(neighbors) {
            if !self.rooms.contains_key(r) {
                return Err(WorldError::RoomNotFound(*r));
            }
        }
        self.adjacency.insert(room, neighbors.to_vec());
        Ok(())
    }

    // -------------------------------------------------------------------
    // Rooms and areas
    // -------------------------------------------------------------------

    /// Look up a room.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// Iterate over all rooms in identifier order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Identifiers of every registered room.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    /// Center point of a room.
    pub fn room_center(&self, id: RoomId) -> Option<Point> {
        self.rooms.get(&id).map(|r| r.center)
    }

    /// Uniform point within `jitter` of a room center on both axes.
    pub fn random_point_near_center(
        &self,
        id: RoomId,
        jitter: f64,
        rng: &mut impl Rng,
    ) -> Option<Point> {
        let center = self.room_center(id)?;
        let dx = (rng.random::<f64>() - 0.5) * 2.0 * jitter;
        let dy = (rng.random::<f64>() - 0.5) * 2.0 * jitter;
        Some(center.offset(dx, dy))
    }

    /// Room containing `p`. Corridors are not rooms.
    pub fn room_at(&self, p: Point) -> Option<RoomId> {
        self.rooms
            .values()
            .find(|r| r.bounds.contains(p))
            .map(|r| r.id)
    }

    /// Classify a point. Rooms take precedence over corridors.
    pub fn area_at(&self, p: Point) -> Area {
        if let Some(room) = self.room_at(p) {
            return Area::Room(room);
        }
        self.corridors
            .iter()
            .position(|c| c.bounds.contains(p))
            .map_or(Area::Void, Area::Corridor)
    }

    /// Name of a corridor by index.
    pub fn corridor_name(&self, index: usize) -> Option<&str> {
        self.corridors.get(index).map(|c| c.name.as_str())
    }

    /// Whether an agent may stand at `p`.
    pub fn is_walkable(&self, p: Point) -> bool {
        self.area_at(p) != Area::Void
    }

    /// Whether a circle of `radius` around `p` overlaps a wall obstacle.
    pub fn collides_with_wall(&self, p: Point, radius: f64) -> bool {
        self.walls
            .iter()
            .any(|w| w.clamp(p).distance(p) < radius)
    }

    /// Rooms next door to `room`, empty if none were declared.
    pub fn adjacent_rooms(&self, room: RoomId) -> &[RoomId] {
        self.adjacency.get(&room).map_or(&[], Vec::as_slice)
    }

    /// Whether two rooms are declared neighbors.
    pub fn are_adjacent(&self, a: RoomId, b: RoomId) -> bool {
        self.adjacent_rooms(a).contains(&b)
    }

    /// Resolve free text to a room.
    ///
    /// Tries, in order: a case-insensitive display-name match, a fuzzy match
    /// where either string contains the other, then a key match with
    /// whitespace removed.
    pub fn parse_room(&self, text: &str) -> Option<RoomId> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        if let Some(r) = self
            .rooms
            .keys()
            .find(|r| r.name().to_lowercase() == needle)
        {
            return Some(*r);
        }
        if let Some(r) = self.rooms.keys().find(|r| {
            let name = r.name().to_lowercase();
            needle.contains(&name) || name.contains(&needle)
        }) {
            return Some(*r);
        }
        let compact: String = needle.chars().filter(|c| !c.is_whitespace()).collect();
        self.rooms
            .keys()
            .find(|r| r.key().to_lowercase() == compact)
            .copied()
    }

    // -------------------------------------------------------------------
    // Waypoints
    // -------------------------------------------------------------------

    /// Number of waypoints.
    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    /// Look up a waypoint.
    pub fn waypoint(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.get(id)
    }

    /// All waypoints in identifier order.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Neighbors of a waypoint in insertion order.
    pub fn neighbors(&self, id: WaypointId) -> &[WaypointId] {
        self.edges.get(id).map_or(&[], Vec::as_slice)
    }

    /// Waypoint closest to `p`. The first one wins on ties.
    pub fn nearest_waypoint(&self, p: Point) -> Option<WaypointId> {
        let mut best: Option<(WaypointId, f64)> = None;
        for (id, wp) in self.waypoints.iter().enumerate() {
            let d = wp.position.distance(p);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Waypoint maximizing the distance to the closest of `others`.
    ///
    /// With no `others`, the first waypoint is returned.
    pub fn farthest_waypoint_from(&self, others: &[Point]) -> Option<&Waypoint> {
        if others.is_empty() {
            return self.waypoints.first();
        }
        let mut best: Option<(&Waypoint, f64)> = None;
        for wp in &self.waypoints {
            let nearest = others
                .iter()
                .map(|o| wp.position.distance(*o))
                .fold(f64::INFINITY, f64::min);
            if best.is_none_or(|(_, bd)| nearest > bd) {
                best = Some((wp, nearest));
            }
        }
        best.map(|(wp, _)| wp)
    }

    // -------------------------------------------------------------------
    // Vents
    // -------------------------------------------------------------------

    /// Look up a vent.
    pub fn vent(&self, id: VentId) -> Option<&Vent> {
        self.vents.get(id.0)
    }

    /// All vents in identifier order.
    pub fn vents(&self) -> impl Iterator<Item = (VentId, &Vent)> {
        self.vents.iter().enumerate().map(|(i, v)| (VentId(i), v))
    }

    /// Find a vent by name.
    pub fn vent_by_name(&self, name: &str) -> Option<VentId> {
        self.vents.iter().position(|v| v.name == name).map(VentId)
    }

    /// Vents located in `room`.
    pub fn vents_in_room(&self, room: RoomId) -> impl Iterator<Item = (VentId, &Vent)> {
        self.vents().filter(move |(_, v)| v.room == room)
    }

    /// First vent in `room` strictly closer to `p` than `max_distance`.
    pub fn vent_near(&self, p: Point, room: RoomId, max_distance: f64) -> Option<VentId> {
        self.vents_in_room(room)
            .find(|(_, v)| v.position.distance(p) < max_distance)
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_two_room_map() -> ShipMap {
        let mut map = ShipMap::new(1000.0, 500.0);
        map.add_room(
            RoomId::Cafeteria,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Point::new(50.0, 50.0),
        )
        .unwrap();
        map.add_room(
            RoomId::Admin,
            Rect::new(300.0, 0.0, 100.0, 100.0),
            Point::new(350.0, 50.0),
        )
        .unwrap();
        map.add_corridor("Hall", Rect::new(100.0, 40.0, 200.0, 20.0));
        let a = map.add_waypoint(Point::new(50.0, 50.0), Some(RoomId::Cafeteria)).unwrap();
        let h = map.add_waypoint(Point::new(200.0, 50.0), None).unwrap();
        let b = map.add_waypoint(Point::new(350.0, 50.0), Some(RoomId::Admin)).unwrap();
        map.add_edge(a, h).unwrap();
        map.add_edge(h, b).unwrap();
        map
    }

    #[test]
    fn duplicate_room_rejected() {
        let mut map = make_two_room_map();
        let err = map.add_room(
            RoomId::Admin,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Point::new(0.0, 0.0),
        );
        assert!(matches!(err, Err(WorldError::DuplicateRoom(RoomId::Admin))));
    }

    #[test]
    fn edges_are_undirected_and_deduplicated() {
        let mut map = make_two_room_map();
        map.add_edge(1, 0).unwrap();
        assert_eq!(map.neighbors(0), &[1]);
        assert_eq!(map.neighbors(1), &[0, 2]);
    }

    #[test]
    fn edge_to_missing_waypoint_fails() {
        let mut map = make_two_room_map();
        assert!(matches!(map.add_edge(0, 9), Err(WorldError::UnknownWaypoint(9))));
    }

    #[test]
    fn area_classification() {
        let map = make_two_room_map();
        assert_eq!(map.area_at(Point::new(10.0, 10.0)), Area::Room(RoomId::Cafeteria));
        assert_eq!(map.area_at(Point::new(200.0, 50.0)), Area::Corridor(0));
        assert_eq!(map.area_at(Point::new(200.0, 200.0)), Area::Void);
        assert!(map.is_walkable(Point::new(200.0, 45.0)));
        assert_eq!(map.corridor_name(0), Some("Hall"));
    }

    #[test]
    fn nearest_waypoint_prefers_first_on_tie() {
        let map = make_two_room_map();
        assert_eq!(map.nearest_waypoint(Point::new(125.0, 50.0)), Some(0));
        assert_eq!(map.nearest_waypoint(Point::new(340.0, 90.0)), Some(2));
        assert_eq!(ShipMap::new(1.0, 1.0).nearest_waypoint(Point::new(0.0, 0.0)), None);
    }

    #[test]
    fn farthest_waypoint_maximizes_minimum_distance() {
        let map = make_two_room_map();
        let wp = map.farthest_waypoint_from(&[Point::new(40.0, 50.0)]).unwrap();
        assert_eq!(wp.room, Some(RoomId::Admin));
    }

    #[test]
    fn vent_links_are_one_way() {
        let mut map = make_two_room_map();
        map.add_vent("a", Point::new(20.0, 20.0), RoomId::Cafeteria).unwrap();
        map.add_vent("b", Point::new(320.0, 20.0), RoomId::Admin).unwrap();
        map.link_vents("a", "b").unwrap();
        let a = map.vent_by_name("a").unwrap();
        let b = map.vent_by_name("b").unwrap();
        assert_eq!(map.vent(a).unwrap().links, vec![b]);
        assert!(map.vent(b).unwrap().links.is_empty());
        assert!(matches!(map.link_vents("a", "zz"), Err(WorldError::UnknownVent(_))));
        assert!(matches!(map.link_vents("a", "a"), Err(WorldError::SelfLinkedVent(_))));
    }

    #[test]
    fn vent_near_respects_room_and_distance() {
        let mut map = make_two_room_map();
        map.add_vent("a", Point::new(20.0, 20.0), RoomId::Cafeteria).unwrap();
        let p = Point::new(30.0, 30.0);
        assert!(map.vent_near(p, RoomId::Cafeteria, 100.0).is_some());
        assert!(map.vent_near(p, RoomId::Cafeteria, 5.0).is_none());
        assert!(map.vent_near(p, RoomId::Admin, 1000.0).is_none());
    }

    #[test]
    fn wall_collision_uses_radius() {
        let mut map = make_two_room_map();
        map.add_wall(Rect::new(50.0, 0.0, 10.0, 40.0));
        assert!(map.collides_with_wall(Point::new(45.0, 20.0), 15.0));
        assert!(!map.collides_with_wall(Point::new(20.0, 20.0), 15.0));
    }

    #[test]
    fn parse_room_tries_name_then_fuzzy_then_key() {
        let map = make_two_room_map();
        assert_eq!(map.parse_room("cafeteria"), Some(RoomId::Cafeteria));
        assert_eq!(map.parse_room("I'd go to Admin."), Some(RoomId::Admin));
        assert_eq!(map.parse_room("cafe"), Some(RoomId::Cafeteria));
        assert_eq!(map.parse_room(""), None);
        assert_eq!(map.parse_room("reactor"), None);
    }

    #[test]
    fn adjacency_requires_known_rooms() {
        let mut map = make_two_room_map();
        map.set_adjacent(RoomId::Cafeteria, &[RoomId::Admin]).unwrap();
        assert!(map.are_adjacent(RoomId::Cafeteria, RoomId::Admin));
        assert!(!map.are_adjacent(RoomId::Admin, RoomId::Cafeteria));
        assert!(map.set_adjacent(RoomId::Admin, &[RoomId::Reactor]).is_err());
    }

    #[test]
    fn random_point_stays_within_jitter() {
        use rand::SeedableRng;
        use rand::rngs::SmallRng;

        let map = make_two_room_map();
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..100 {
            let p = map
                .random_point_near_center(RoomId::Admin, 30.0, &mut rng)
                .unwrap();
            assert!((p.x - 350.0).abs() <= 30.0);
            assert!((p.y - 50.0).abs() <= 30.0);
        }
        assert!(
            map.random_point_near_center(RoomId::Reactor, 30.0, &mut rng)
                .is_none()
        );
    }
}
