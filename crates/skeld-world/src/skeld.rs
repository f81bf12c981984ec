//! The Skeld: the default ship layout.
//!
//! 14 rooms, 21 corridors, 2 wall obstacles, 56 waypoints and 11 vents on a
//! 3200 x 2000 plane. Waypoints 0 to 35 sit inside rooms; 36 to 55 are
//! corridor junctions.

use skeld_types::{Point, Rect, RoomId};
use tracing::debug;

use crate::error::WorldError;
use crate::map::ShipMap;

/// Plane width.
pub const MAP_WIDTH: f64 = 3200.0;

/// Plane height.
pub const MAP_HEIGHT: f64 = 2000.0;

/// (room, bounds x, y, w, h, center x, y)
const ROOMS: [(RoomId, [f64; 4], [f64; 2]); 14] = [
    (RoomId::Cafeteria, [1200.0, 100.0, 500.0, 350.0], [1450.0, 275.0]),
    (RoomId::Weapons, [1800.0, 150.0, 300.0, 280.0], [1950.0, 290.0]),
    (RoomId::Navigation, [2300.0, 350.0, 350.0, 350.0], [2475.0, 525.0]),
    (RoomId::O2, [1750.0, 500.0, 280.0, 250.0], [1890.0, 625.0]),
    (RoomId::Shields, [2050.0, 750.0, 300.0, 280.0], [2200.0, 890.0]),
    (RoomId::Communications, [1550.0, 900.0, 300.0, 250.0], [1700.0, 1025.0]),
    (RoomId::Storage, [1100.0, 750.0, 400.0, 350.0], [1300.0, 925.0]),
    (RoomId::Admin, [1550.0, 550.0, 300.0, 280.0], [1700.0, 690.0]),
    (RoomId::Electrical, [600.0, 650.0, 320.0, 300.0], [760.0, 800.0]),
    (RoomId::LowerEngine, [200.0, 750.0, 300.0, 300.0], [350.0, 900.0]),
    (RoomId::UpperEngine, [200.0, 150.0, 300.0, 300.0], [350.0, 300.0]),
    (RoomId::Reactor, [50.0, 400.0, 300.0, 300.0], [200.0, 550.0]),
    (RoomId::MedBay, [800.0, 250.0, 300.0, 280.0], [950.0, 390.0]),
    (RoomId::Security, [550.0, 400.0, 250.0, 220.0], [675.0, 510.0]),
];

const CORRIDORS: [(&str, [f64; 4]); 21] = [
    ("Hallway between Cafeteria and Weapons", [1700.0, 200.0, 120.0, 80.0]),
    ("Hallway between Cafeteria and MedBay", [1050.0, 280.0, 170.0, 70.0]),
    ("Hallway between MedBay and Security", [500.0, 280.0, 320.0, 70.0]),
    ("Hallway between Engine and Reactor", [250.0, 430.0, 100.0, 120.0]),
    ("Hallway between Reactor and Security", [340.0, 470.0, 230.0, 70.0]),
    ("Hallway between Reactor and Lower Engine", [250.0, 680.0, 100.0, 100.0]),
    ("Hallway between Security and Electrical", [700.0, 580.0, 100.0, 100.0]),
    ("Hallway between Electrical and Lower Engine", [480.0, 780.0, 140.0, 70.0]),
    ("Hallway between Electrical and Storage", [900.0, 780.0, 220.0, 70.0]),
    ("Hallway between Cafeteria and Storage", [1400.0, 430.0, 80.0, 420.0]),
    ("Hallway near Admin entrance", [1480.0, 550.0, 70.0, 70.0]),
    ("Hallway between Storage and Admin", [1400.0, 800.0, 170.0, 70.0]),
    ("Hallway between Admin and Comms", [1650.0, 810.0, 80.0, 110.0]),
    ("Hallway between Weapons and O2", [1850.0, 410.0, 80.0, 110.0]),
    ("Hallway between Weapons and Navigation", [2080.0, 280.0, 240.0, 80.0]),
    ("Hallway between O2 and Shields", [2010.0, 650.0, 100.0, 120.0]),
    ("Hallway between O2 and Navigation", [2010.0, 530.0, 310.0, 70.0]),
    ("Hallway between Navigation and Shields", [2300.0, 680.0, 80.0, 100.0]),
    ("Hallway between Comms and Shields", [1830.0, 900.0, 240.0, 70.0]),
    ("Hallway South of Storage", [1100.0, 1080.0, 200.0, 70.0]),
    ("Hallway North of MedBay", [1100.0, 150.0, 120.0, 80.0]),
];

/// Electrical's inner wall.
const WALLS: [[f64; 4]; 2] = [[718.0, 650.0, 14.0, 210.0], [718.0, 650.0, 55.0, 14.0]];

/// Waypoints in identifier order: (x, y, room).
const WAYPOINTS: [(f64, f64, Option<RoomId>); 56] = [
    (1450.0, 275.0, Some(RoomId::Cafeteria)),
    (1300.0, 275.0, Some(RoomId::Cafeteria)),
    (1600.0, 275.0, Some(RoomId::Cafeteria)),
    (1450.0, 180.0, Some(RoomId::Cafeteria)),
    (1450.0, 400.0, Some(RoomId::Cafeteria)),
    (1950.0, 290.0, Some(RoomId::Weapons)),
    (1850.0, 240.0, Some(RoomId::Weapons)),
    (2475.0, 525.0, Some(RoomId::Navigation)),
    (2380.0, 450.0, Some(RoomId::Navigation)),
    (2400.0, 620.0, Some(RoomId::Navigation)),
    (1890.0, 625.0, Some(RoomId::O2)),
    (1890.0, 540.0, Some(RoomId::O2)),
    (2200.0, 890.0, Some(RoomId::Shields)),
    (2150.0, 790.0, Some(RoomId::Shields)),
    (1700.0, 1025.0, Some(RoomId::Communications)),
    (1700.0, 940.0, Some(RoomId::Communications)),
    (1300.0, 925.0, Some(RoomId::Storage)),
    (1200.0, 850.0, Some(RoomId::Storage)),
    (1400.0, 850.0, Some(RoomId::Storage)),
    (1700.0, 690.0, Some(RoomId::Admin)),
    (1600.0, 620.0, Some(RoomId::Admin)),
    (1700.0, 790.0, Some(RoomId::Admin)),
    (760.0, 800.0, Some(RoomId::Electrical)),
    (700.0, 720.0, Some(RoomId::Electrical)),
    (850.0, 800.0, Some(RoomId::Electrical)),
    (350.0, 900.0, Some(RoomId::LowerEngine)),
    (350.0, 820.0, Some(RoomId::LowerEngine)),
    (350.0, 300.0, Some(RoomId::UpperEngine)),
    (350.0, 380.0, Some(RoomId::UpperEngine)),
    (200.0, 550.0, Some(RoomId::Reactor)),
    (250.0, 480.0, Some(RoomId::Reactor)),
    (250.0, 640.0, Some(RoomId::Reactor)),
    (950.0, 390.0, Some(RoomId::MedBay)),
    (900.0, 320.0, Some(RoomId::MedBay)),
    (675.0, 510.0, Some(RoomId::Security)),
    (675.0, 580.0, Some(RoomId::Security)),
    (1750.0, 240.0, None),
    (1150.0, 300.0, None),
    (550.0, 310.0, None),
    (300.0, 470.0, None),
    (400.0, 500.0, None),
    (300.0, 720.0, None),
    (720.0, 640.0, None),
    (550.0, 810.0, None),
    (1000.0, 810.0, None),
    (1440.0, 520.0, None),
    (1440.0, 700.0, None),
    (1480.0, 850.0, None),
    (1890.0, 460.0, None),
    (2100.0, 320.0, None),
    (2100.0, 560.0, None),
    (2100.0, 720.0, None),
    (2340.0, 700.0, None),
    (1950.0, 940.0, None),
    (1690.0, 850.0, None),
    (650.0, 310.0, None),
];

/// Undirected edges; each pair listed once.
const EDGES: [(usize, usize); 63] = [
    (0, 1),
    (0, 2),
    (0, 3),
    (0, 4),
    (1, 37),
    (2, 36),
    (4, 45),
    (5, 6),
    (5, 49),
    (6, 36),
    (6, 48),
    (7, 8),
    (7, 9),
    (8, 49),
    (8, 50),
    (8, 52),
    (9, 52),
    (10, 11),
    (10, 51),
    (11, 48),
    (11, 50),
    (12, 13),
    (12, 53),
    (13, 51),
    (13, 52),
    (14, 15),
    (15, 53),
    (15, 54),
    (16, 17),
    (16, 18),
    (17, 44),
    (18, 47),
    (19, 20),
    (19, 21),
    (20, 45),
    (21, 54),
    (21, 47),
    (22, 23),
    (22, 24),
    (23, 42),
    (24, 44),
    (24, 43),
    (25, 26),
    (26, 41),
    (26, 43),
    (27, 28),
    (27, 38),
    (28, 39),
    (29, 30),
    (29, 31),
    (30, 39),
    (30, 40),
    (31, 41),
    (32, 33),
    (32, 37),
    (33, 55),
    (34, 35),
    (34, 40),
    (35, 42),
    (37, 55),
    (38, 55),
    (45, 46),
    (46, 47),
];

/// (name, x, y, room)
const VENTS: [(&str, f64, f64, RoomId); 11] = [
    ("reactor_top", 220.0, 470.0, RoomId::Reactor),
    ("upperEngine_vent", 370.0, 230.0, RoomId::UpperEngine),
    ("lowerEngine_vent", 370.0, 830.0, RoomId::LowerEngine),
    ("medbay_vent", 920.0, 350.0, RoomId::MedBay),
    ("electrical_vent", 730.0, 760.0, RoomId::Electrical),
    ("security_vent", 650.0, 540.0, RoomId::Security),
    ("admin_vent", 1660.0, 720.0, RoomId::Admin),
    ("cafeteria_vent", 1500.0, 200.0, RoomId::Cafeteria),
    ("navigation_vent", 2450.0, 480.0, RoomId::Navigation),
    ("weapons_vent", 1980.0, 250.0, RoomId::Weapons),
    ("shields_vent", 2230.0, 850.0, RoomId::Shields),
];

/// One-way vent links (from, to).
const VENT_LINKS: [(&str, &str); 15] = [
    ("reactor_top", "upperEngine_vent"),
    ("upperEngine_vent", "reactor_top"),
    ("upperEngine_vent", "lowerEngine_vent"),
    ("lowerEngine_vent", "upperEngine_vent"),
    ("lowerEngine_vent", "reactor_top"),
    ("medbay_vent", "electrical_vent"),
    ("electrical_vent", "medbay_vent"),
    ("security_vent", "medbay_vent"),
    ("security_vent", "electrical_vent"),
    ("admin_vent", "cafeteria_vent"),
    ("cafeteria_vent", "admin_vent"),
    ("navigation_vent", "weapons_vent"),
    ("navigation_vent", "shields_vent"),
    ("weapons_vent", "navigation_vent"),
    ("shields_vent", "navigation_vent"),
];

const ADJACENT: [(RoomId, &[RoomId]); 14] = [
    (RoomId::Cafeteria, &[RoomId::Weapons, RoomId::MedBay, RoomId::Admin]),
    (RoomId::Weapons, &[RoomId::Cafeteria, RoomId::Navigation, RoomId::O2]),
    (RoomId::Navigation, &[RoomId::Weapons, RoomId::O2, RoomId::Shields]),
    (RoomId::O2, &[RoomId::Weapons, RoomId::Navigation, RoomId::Shields]),
    (RoomId::Shields, &[RoomId::Navigation, RoomId::O2, RoomId::Communications]),
    (RoomId::Communications, &[RoomId::Shields, RoomId::Admin, RoomId::Storage]),
    (
        RoomId::Storage,
        &[RoomId::Cafeteria, RoomId::Admin, RoomId::Electrical, RoomId::Communications],
    ),
    (RoomId::Admin, &[RoomId::Cafeteria, RoomId::Storage, RoomId::Communications]),
    (RoomId::Electrical, &[RoomId::Storage, RoomId::Security, RoomId::LowerEngine]),
    (RoomId::LowerEngine, &[RoomId::Electrical, RoomId::Reactor]),
    (RoomId::UpperEngine, &[RoomId::Reactor, RoomId::MedBay]),
    (RoomId::Reactor, &[RoomId::UpperEngine, RoomId::LowerEngine, RoomId::Security]),
    (RoomId::MedBay, &[RoomId::UpperEngine, RoomId::Cafeteria]),
    (RoomId::Security, &[RoomId::Reactor, RoomId::Electrical]),
];

const fn rect([x, y, w, h]: [f64; 4]) -> Rect {
    Rect::new(x, y, w, h)
}

/// Build the Skeld map.
///
/// # Errors
///
/// Returns a [`WorldError`] if the built-in tables are inconsistent.
pub fn build_skeld() -> Result<ShipMap, WorldError> {
    let mut map = ShipMap::new(MAP_WIDTH, MAP_HEIGHT);

    for (id, bounds, [cx, cy]) in ROOMS {
        map.add_room(id, rect(bounds), Point::new(cx, cy))?;
    }
    for (name, bounds) in CORRIDORS {
        map.add_corridor(name, rect(bounds));
    }
    for bounds in WALLS {
        map.add_wall(rect(bounds));
    }
    for (x, y, room) in WAYPOINTS {
        map.add_waypoint(Point::new(x, y), room)?;
    }
    for (a, b) in EDGES {
        map.add_edge(a, b)?;
    }
    for (name, x, y, room) in VENTS {
        map.add_vent(name, Point::new(x, y), room)?;
    }
    for (from, to) in VENT_LINKS {
        map.link_vents(from, to)?;
    }
    for (room, neighbors) in ADJACENT {
        map.set_adjacent(room, neighbors)?;
    }
    if map.waypoint_count() == 0 {
        return Err(WorldError::EmptyMap);
    }

    debug!(
        rooms = ROOMS.len(),
        waypoints = map.waypoint_count(),
        vents = VENTS.len(),
        "skeld map built"
    );
    Ok(map)
}
