// Speed modes written to vehicles while they approach a managed junction.
pub const SPEED_MODE_NEAR_JUNCTION: u8 = 22;
pub const SPEED_MODE_FAR_JUNCTION: u8 = 23;
// Full default caution, restored when a platoon leaves a controller or disbands.
pub const SPEED_MODE_RELEASED: u8 = 31;

// Car-following parameters while platooning.
pub const PLATOON_TAU: f64 = 0.05;
pub const PLATOON_SPEED_FACTOR: f64 = 1.0;
pub const PLATOON_MIN_GAP: f64 = 0.0;
pub const PLATOON_IMPERFECTION: f64 = 0.0;

// Car-following parameters restored on disband.
pub const RELEASED_TAU: f64 = 1.0;
pub const RELEASED_SPEED_FACTOR: f64 = 0.9;
pub const RELEASED_MIN_GAP: f64 = 2.5;
pub const RELEASED_IMPERFECTION: f64 = 0.5;
pub const RELEASED_COLOR: (u8, u8, u8) = (255, 255, 255);

// Distances in meters.
pub const LEADER_LOOKAHEAD: f64 = 20.0;
pub const FOLLOW_GAP: f64 = 10.0;
pub const APPROACH_DISTANCE: f64 = 20.0;
