// simulation_api.rs
//
// The query-and-control surface the coordination core needs from a traffic
// simulation. Every platoon and controller operation takes the collaborator
// explicitly, so the same code drives a live simulation or the in-memory
// backend in `simulation_engine`.

use serde::{Deserialize, Serialize};

pub type VehicleId = String;
pub type LaneId = String;
pub type EdgeId = String;

/// An RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Picks a random color for platoon identification.
    pub fn random() -> Self {
        Rgb(rand::random(), rand::random(), rand::random())
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb(r, g, b)
    }
}

/// A discrete driving-behavior profile (how cautiously a vehicle brakes and
/// accelerates near a junction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedMode(pub u8);

/// What a vehicle should do with its speed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpeedCommand {
    /// Hold exactly this speed (m/s), still capped by road limits.
    Fixed(f64),
    /// Drop any override and return to the simulation's own speed control.
    Release,
}

/// The leading vehicle found ahead of another vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Leader {
    pub vehicle: VehicleId,
    /// Bumper-to-bumper distance in meters.
    pub gap: f64,
}

/// Vehicle and lane query/control operations provided by the simulation.
///
/// Getters return `None` for vehicles the simulation no longer knows about.
/// Setters on unknown vehicles are ignored.
pub trait SimulationApi {
    /// IDs of every vehicle currently in the simulation.
    fn vehicle_ids(&self) -> Vec<VehicleId>;

    fn lane(&self, vehicle: &str) -> Option<LaneId>;
    fn lane_position(&self, vehicle: &str) -> Option<f64>;
    fn speed(&self, vehicle: &str) -> Option<f64>;
    fn acceleration(&self, vehicle: &str) -> Option<f64>;
    fn length(&self, vehicle: &str) -> Option<f64>;
    fn route(&self, vehicle: &str) -> Option<Vec<EdgeId>>;
    fn route_index(&self, vehicle: &str) -> Option<usize>;

    /// The nearest vehicle ahead within `distance` meters, if any.
    fn leader(&self, vehicle: &str, distance: f64) -> Option<Leader>;

    fn set_speed(&mut self, vehicle: &str, command: SpeedCommand);
    fn set_color(&mut self, vehicle: &str, color: Rgb);
    fn set_tau(&mut self, vehicle: &str, tau: f64);
    fn set_speed_factor(&mut self, vehicle: &str, factor: f64);
    fn set_min_gap(&mut self, vehicle: &str, min_gap: f64);
    fn set_imperfection(&mut self, vehicle: &str, imperfection: f64);
    fn set_speed_mode(&mut self, vehicle: &str, mode: SpeedMode);

    /// Lanes governed by the traffic light of the given intersection.
    fn controlled_lanes(&self, intersection: &str) -> Vec<LaneId>;
}
