use crate::config::DrivingProfile;
use crate::simulation_api::{EdgeId, Rgb, SpeedCommand, SpeedMode, VehicleId};

/// Different types of vehicles in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    Car,
    Bus,
    Truck,
}

impl VehicleType {
    /// (length m, max speed m/s, acceleration m/s^2)
    pub fn dimensions(self) -> (f64, f64, f64) {
        match self {
            VehicleType::Car => (4.5, 13.9, 2.6),
            VehicleType::Bus => (12.0, 11.1, 1.2),
            VehicleType::Truck => (16.0, 11.1, 1.0),
        }
    }
}

/// A vehicle as held by the in-memory simulation.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub vehicle_type: VehicleType,
    pub route: Vec<EdgeId>,
    pub route_index: usize,
    /// Offset from the start of the current lane in meters.
    pub lane_position: f64,
    pub speed: f64,
    pub length: f64,
    pub max_speed: f64,
    pub acceleration: f64,
    pub speed_command: SpeedCommand,
    pub speed_mode: SpeedMode,
    pub color: Rgb,
    pub profile: DrivingProfile,
}

impl SimVehicle {
    /// Creates a vehicle at the start of its first edge.
    pub fn new(id: impl Into<VehicleId>, vehicle_type: VehicleType, route: Vec<EdgeId>) -> Self {
        let (length, max_speed, acceleration) = vehicle_type.dimensions();
        Self {
            id: id.into(),
            vehicle_type,
            route,
            route_index: 0,
            lane_position: 0.0,
            speed: 0.0,
            length,
            max_speed,
            acceleration,
            speed_command: SpeedCommand::Release,
            speed_mode: SpeedMode(crate::global_variables::SPEED_MODE_RELEASED),
            color: crate::global_variables::RELEASED_COLOR.into(),
            profile: DrivingProfile::released(),
        }
    }

    pub fn at(mut self, lane_position: f64, speed: f64) -> Self {
        self.lane_position = lane_position;
        self.speed = speed;
        self
    }

    pub fn current_edge(&self) -> Option<&EdgeId> {
        self.route.get(self.route_index)
    }
}
