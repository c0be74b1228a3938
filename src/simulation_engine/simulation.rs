// simulation.rs
//
// A small in-memory traffic simulation implementing `SimulationApi`. It is
// enough to drive platoons and intersection controllers in tests and in the
// demo binary: single-lane edges, routes supplied by the caller, and a
// leader-limited speed model.

use crate::simulation_api::{
    EdgeId, LaneId, Leader, Rgb, SimulationApi, SpeedCommand, SpeedMode, VehicleId,
};
use crate::simulation_engine::lanes::{lane_of_edge, RoadNetwork};
use crate::simulation_engine::movement::{advance_vehicle, next_speed};
use crate::simulation_engine::vehicles::SimVehicle;
use log::{debug, warn};
use std::collections::BTreeMap;

pub struct InMemorySimulation {
    pub network: RoadNetwork,
    vehicles: BTreeMap<VehicleId, SimVehicle>,
    time: f64,
}

impl InMemorySimulation {
    pub fn new(network: RoadNetwork) -> Self {
        Self {
            network,
            vehicles: BTreeMap::new(),
            time: 0.0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn insert_vehicle(&mut self, vehicle: SimVehicle) {
        debug!("Inserting vehicle {} on route {:?}", vehicle.id, vehicle.route);
        self.vehicles.insert(vehicle.id.clone(), vehicle);
    }

    pub fn remove_vehicle(&mut self, vehicle: &str) -> Option<SimVehicle> {
        self.vehicles.remove(vehicle)
    }

    pub fn vehicle(&self, vehicle: &str) -> Option<&SimVehicle> {
        self.vehicles.get(vehicle)
    }

    pub fn vehicle_mut(&mut self, vehicle: &str) -> Option<&mut SimVehicle> {
        self.vehicles.get_mut(vehicle)
    }

    /// Replaces a vehicle's route, keeping its current edge index.
    pub fn set_route(&mut self, vehicle: &str, route: Vec<EdgeId>) {
        if let Some(v) = self.vehicles.get_mut(vehicle) {
            v.route = route;
        }
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    fn with_vehicle(&mut self, vehicle: &str, apply: impl FnOnce(&mut SimVehicle)) {
        match self.vehicles.get_mut(vehicle) {
            Some(v) => apply(v),
            None => warn!("Ignoring command for unknown vehicle {}", vehicle),
        }
    }

    /// Advances every vehicle by `dt` seconds. Vehicles that drive off the end
    /// of their route leave the simulation; their IDs are returned.
    pub fn step(&mut self, dt: f64) -> Vec<VehicleId> {
        let speeds: Vec<(VehicleId, f64)> = self
            .vehicles
            .values()
            .map(|v| {
                let gap = self.leader(&v.id, f64::INFINITY).map(|l| l.gap);
                (v.id.clone(), next_speed(v, gap, dt))
            })
            .collect();

        let mut arrived = Vec::new();
        for (id, speed) in speeds {
            let network = &self.network;
            if let Some(vehicle) = self.vehicles.get_mut(&id) {
                vehicle.speed = speed;
                let edge_length = |edge: &str| network.lane(edge).map(|l| l.length_meters);
                let still_driving = advance_vehicle(vehicle, dt, edge_length);
                if !still_driving {
                    arrived.push(id);
                }
            }
        }
        for id in &arrived {
            debug!("Vehicle {} reached the end of its route", id);
            self.vehicles.remove(id);
        }
        self.time += dt;
        arrived
    }
}

impl SimulationApi for InMemorySimulation {
    fn vehicle_ids(&self) -> Vec<VehicleId> {
        self.vehicles.keys().cloned().collect()
    }

    fn lane(&self, vehicle: &str) -> Option<LaneId> {
        self.vehicles
            .get(vehicle)?
            .current_edge()
            .map(|edge| lane_of_edge(edge))
    }

    fn lane_position(&self, vehicle: &str) -> Option<f64> {
        self.vehicles.get(vehicle).map(|v| v.lane_position)
    }

    fn speed(&self, vehicle: &str) -> Option<f64> {
        self.vehicles.get(vehicle).map(|v| v.speed)
    }

    fn acceleration(&self, vehicle: &str) -> Option<f64> {
        self.vehicles.get(vehicle).map(|v| v.acceleration)
    }

    fn length(&self, vehicle: &str) -> Option<f64> {
        self.vehicles.get(vehicle).map(|v| v.length)
    }

    fn route(&self, vehicle: &str) -> Option<Vec<EdgeId>> {
        self.vehicles.get(vehicle).map(|v| v.route.clone())
    }

    fn route_index(&self, vehicle: &str) -> Option<usize> {
        self.vehicles.get(vehicle).map(|v| v.route_index)
    }

    fn leader(&self, vehicle: &str, distance: f64) -> Option<Leader> {
        let me = self.vehicles.get(vehicle)?;
        let edge = me.current_edge()?;
        self.vehicles
            .values()
            .filter(|other| other.id != me.id && other.current_edge() == Some(edge))
            .filter(|other| other.lane_position > me.lane_position)
            .map(|other| Leader {
                vehicle: other.id.clone(),
                gap: other.lane_position - other.length - me.lane_position,
            })
            .filter(|leader| leader.gap <= distance)
            .min_by(|a, b| a.gap.total_cmp(&b.gap))
    }

    fn set_speed(&mut self, vehicle: &str, command: SpeedCommand) {
        self.with_vehicle(vehicle, |v| v.speed_command = command);
    }

    fn set_color(&mut self, vehicle: &str, color: Rgb) {
        self.with_vehicle(vehicle, |v| v.color = color);
    }

    fn set_tau(&mut self, vehicle: &str, tau: f64) {
        self.with_vehicle(vehicle, |v| v.profile.tau = tau);
    }

    fn set_speed_factor(&mut self, vehicle: &str, factor: f64) {
        self.with_vehicle(vehicle, |v| v.profile.speed_factor = factor);
    }

    fn set_min_gap(&mut self, vehicle: &str, min_gap: f64) {
        self.with_vehicle(vehicle, |v| v.profile.min_gap = min_gap);
    }

    fn set_imperfection(&mut self, vehicle: &str, imperfection: f64) {
        self.with_vehicle(vehicle, |v| v.profile.imperfection = imperfection);
    }

    fn set_speed_mode(&mut self, vehicle: &str, mode: SpeedMode) {
        self.with_vehicle(vehicle, |v| v.speed_mode = mode);
    }

    fn controlled_lanes(&self, intersection: &str) -> Vec<LaneId> {
        self.network.controlled_lanes(intersection)
    }
}
