#![allow(dead_code)]

use platoon_control::control_system::intersection_controller::SharedPlatoon;
use platoon_control::simulation_api::SpeedCommand;
use platoon_control::simulation_engine::lanes::create_crossroads;
use platoon_control::simulation_engine::simulation::InMemorySimulation;
use platoon_control::simulation_engine::vehicles::{SimVehicle, VehicleType};
use platoon_control::{ControlConfig, Platoon};
use std::cell::RefCell;
use std::rc::Rc;

pub const NORTH_TO_EAST: &[&str] = &["north_in", "east_out"];
pub const NORTH_TO_SOUTH: &[&str] = &["north_in", "south_out"];
pub const WEST_TO_EAST: &[&str] = &["west_in", "east_out"];
pub const WEST_TO_SOUTH: &[&str] = &["west_in", "south_out"];

/// Crossroads with 200 m approaches; J1 serves `north_in_0` and `west_in_0`.
pub fn crossroads() -> InMemorySimulation {
    InMemorySimulation::new(create_crossroads(200.0))
}

/// Inserts a car (4.5 m long) at `position` on the first edge of `route`.
pub fn add_car(sim: &mut InMemorySimulation, id: &str, route: &[&str], position: f64, speed: f64) {
    let route = route.iter().map(|e| e.to_string()).collect();
    sim.insert_vehicle(SimVehicle::new(id, VehicleType::Car, route).at(position, speed));
}

pub fn platoon(sim: &mut InMemorySimulation, vehicles: &[&str]) -> Platoon {
    let vehicles: Vec<String> = vehicles.iter().map(|v| v.to_string()).collect();
    Platoon::new(sim, &vehicles, &ControlConfig::default()).expect("non-empty platoon")
}

pub fn shared(platoon: Platoon) -> SharedPlatoon {
    Rc::new(RefCell::new(platoon))
}

pub fn command(sim: &InMemorySimulation, vehicle: &str) -> SpeedCommand {
    sim.vehicle(vehicle).expect("vehicle present").speed_command
}

pub fn fixed_speed(sim: &InMemorySimulation, vehicle: &str) -> Option<f64> {
    match command(sim, vehicle) {
        SpeedCommand::Fixed(speed) => Some(speed),
        SpeedCommand::Release => None,
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
