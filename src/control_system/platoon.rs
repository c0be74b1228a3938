use crate::config::{CatchUpPolicy, ControlConfig, DrivingProfile};
use crate::simulation_api::{
    EdgeId, LaneId, Rgb, SimulationApi, SpeedCommand, SpeedMode, VehicleId,
};
use log::{debug, error, info};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("Routes of platoon {other} do not converge with platoon {target}")]
    RoutesDiverge { target: String, other: String },

    #[error("Platoon {0} is no longer active")]
    Inactive(String),
}

/// A vehicle's route as captured when it joined the platoon.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub edges: Vec<EdgeId>,
    pub destination: Option<EdgeId>,
}

impl Route {
    fn capture<S: SimulationApi + ?Sized>(sim: &S, vehicle: &str) -> Self {
        let edges = sim.route(vehicle).unwrap_or_default();
        let destination = edges.last().cloned();
        Self { edges, destination }
    }

    /// Edges from `route_index` onwards (empty once past the end).
    pub fn remaining(&self, route_index: usize) -> &[EdgeId] {
        self.edges.get(route_index..).unwrap_or(&[])
    }
}

/// A group of vehicles driving under one speed discipline behind a fixed lead.
#[derive(Debug)]
pub struct Platoon {
    active: bool,
    lead_vehicle: VehicleId,
    vehicles: BTreeSet<VehicleId>,
    routes: Vec<Route>,
    lane: Option<LaneId>,
    lane_position: Option<f64>,
    target_speed: Option<f64>,
    color: Rgb,
    config: ControlConfig,
}

impl Platoon {
    /// Creates a platoon led by the first of `starting_vehicles`.
    ///
    /// Returns `None` when no vehicles are given.
    pub fn new<S: SimulationApi + ?Sized>(
        sim: &mut S,
        starting_vehicles: &[VehicleId],
        config: &ControlConfig,
    ) -> Option<Self> {
        let lead_vehicle = starting_vehicles.first()?.clone();
        info!("Creating a new platoon with: {:?}", starting_vehicles);

        let mut platoon = Self {
            active: true,
            lane: sim.lane(&lead_vehicle),
            lane_position: sim.lane_position(&lead_vehicle),
            lead_vehicle,
            vehicles: starting_vehicles.iter().cloned().collect(),
            routes: starting_vehicles
                .iter()
                .map(|v| Route::capture(sim, v))
                .collect(),
            target_speed: None,
            color: Rgb::random(),
            config: config.clone(),
        };
        platoon.start_platoon_behaviour(sim, starting_vehicles);
        Some(platoon)
    }

    /// The platoon ID is its lead vehicle's ID.
    pub fn id(&self) -> &str {
        &self.lead_vehicle
    }

    pub fn lead_vehicle(&self) -> &str {
        &self.lead_vehicle
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn vehicles(&self) -> &BTreeSet<VehicleId> {
        &self.vehicles
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Lane of the lead vehicle as of the last update.
    pub fn lane(&self) -> Option<&str> {
        self.lane.as_deref()
    }

    pub fn lane_position(&self) -> Option<f64> {
        self.lane_position
    }

    pub fn target_speed(&self) -> Option<f64> {
        self.target_speed
    }

    pub fn current_speed<S: SimulationApi + ?Sized>(&self, sim: &S) -> f64 {
        sim.speed(&self.lead_vehicle).unwrap_or(0.0)
    }

    pub fn acceleration<S: SimulationApi + ?Sized>(&self, sim: &S) -> f64 {
        sim.acceleration(&self.lead_vehicle).unwrap_or(0.0)
    }

    /// Total length of the members still in the simulation.
    pub fn length<S: SimulationApi + ?Sized>(&self, sim: &S) -> f64 {
        self.vehicles.iter().filter_map(|v| sim.length(v)).sum()
    }

    /// Current lanes of every member still in the simulation.
    pub fn lanes_of_all_vehicles<S: SimulationApi + ?Sized>(&self, sim: &S) -> Vec<LaneId> {
        self.vehicles.iter().filter_map(|v| sim.lane(v)).collect()
    }

    /// The part of `vehicle`'s live route it has not yet driven.
    pub fn remaining_route_of_vehicle<S: SimulationApi + ?Sized>(
        &self,
        sim: &S,
        vehicle: &str,
    ) -> Vec<EdgeId> {
        match (sim.route(vehicle), sim.route_index(vehicle)) {
            (Some(route), Some(index)) => route.get(index..).unwrap_or(&[]).to_vec(),
            _ => Vec::new(),
        }
    }

    /// Adds a single vehicle and applies platoon behaviour to it.
    pub fn add_vehicle<S: SimulationApi + ?Sized>(&mut self, sim: &mut S, vehicle: &str) {
        self.vehicles.insert(vehicle.to_string());
        self.routes.push(Route::capture(sim, vehicle));
        info!(
            "Adding {} to platoon {}, New length: {}",
            vehicle,
            self.id(),
            self.vehicles.len()
        );
        self.start_platoon_behaviour(sim, &[vehicle.to_string()]);
    }

    /// Marks the platoon as dead and returns its remaining vehicles to normal.
    pub fn disband<S: SimulationApi + ?Sized>(&mut self, sim: &mut S) {
        if !self.active {
            return;
        }
        self.stop_platoon_behaviour(sim);
        self.active = false;
        info!("Disbanding platoon: {}", self.id());
    }

    /// Folds `other` into this platoon if every one of its vehicles follows
    /// this platoon's lead onto its next edge. `other` is disbanded first.
    pub fn merge<S: SimulationApi + ?Sized>(
        &mut self,
        sim: &mut S,
        other: &mut Platoon,
    ) -> Result<(), MergeError> {
        if !self.active {
            return Err(MergeError::Inactive(self.id().to_string()));
        }
        if !self.check_routes_converge(sim, other.vehicles.iter()) {
            error!(
                "Could not merge platoon {} with platoon {}",
                other.id(),
                self.id()
            );
            return Err(MergeError::RoutesDiverge {
                target: self.id().to_string(),
                other: other.id().to_string(),
            });
        }
        other.disband(sim);
        for vehicle in other.vehicles.clone() {
            self.add_vehicle(sim, &vehicle);
        }
        Ok(())
    }

    /// Do all `vehicles` (by their full live route) include the lead's next edge?
    ///
    /// Holds trivially when the lead is on its final edge. Fails when the lead
    /// has left the simulation, since its next edge is then unknown.
    pub fn check_routes_converge<'a, S, I>(&self, sim: &S, vehicles: I) -> bool
    where
        S: SimulationApi + ?Sized,
        I: IntoIterator<Item = &'a VehicleId>,
    {
        let Some(lead_index) = sim.route_index(&self.lead_vehicle) else {
            return false;
        };
        let Some(lead_route) = self.routes.first() else {
            return true;
        };
        let Some(next_edge) = lead_route.remaining(lead_index).get(1) else {
            return true;
        };
        vehicles.into_iter().all(|vehicle| {
            sim.route(vehicle)
                .is_some_and(|route| route.contains(next_edge))
        })
    }

    /// Per-tick refresh: location from the lead, speed propagation, route
    /// agreement, and reclaiming the platoon once any member has left.
    pub fn update_platoon<S: SimulationApi + ?Sized>(&mut self, sim: &mut S) {
        if !self.active {
            return;
        }
        let present: HashSet<VehicleId> = sim.vehicle_ids().into_iter().collect();

        if present.contains(&self.lead_vehicle) {
            self.lane = sim.lane(&self.lead_vehicle);
            self.lane_position = sim.lane_position(&self.lead_vehicle);

            match self.target_speed {
                Some(target) => self.update_speed(sim, target, true),
                None => {
                    let lead_speed = self.current_speed(sim);
                    self.update_speed(sim, lead_speed, false);
                }
            }

            if !self.check_routes_converge(sim, self.vehicles.iter()) {
                info!("Routes diverged in platoon {}", self.id());
                self.disband(sim);
            }
        } else {
            self.lane = None;
            self.lane_position = None;
        }

        if self.vehicles.iter().any(|v| !present.contains(v)) {
            self.disband(sim);
        }
    }

    /// Pushes `speed` to the members. Followers only take it while their
    /// leader is within the follow gap, otherwise they are released so they can
    /// catch up.
    ///
    /// With `include_lead` the lead is commanded to `speed` directly. It is
    /// not subject to the follow-gap rule, since no platoon member drives
    /// ahead of it.
    pub fn update_speed<S: SimulationApi + ?Sized>(
        &self,
        sim: &mut S,
        speed: f64,
        include_lead: bool,
    ) {
        if !self.active {
            return;
        }
        if include_lead {
            sim.set_speed(&self.lead_vehicle, SpeedCommand::Fixed(speed));
        }
        let lead_moving = self.current_speed(sim) != 0.0;
        for vehicle in self.vehicles.iter().filter(|v| **v != self.lead_vehicle) {
            let in_range = sim
                .leader(vehicle, self.config.leader_lookahead)
                .is_some_and(|leader| leader.gap <= self.config.follow_gap);
            let follows = in_range
                && match self.config.catch_up {
                    CatchUpPolicy::LeaderGapOnly => true,
                    CatchUpPolicy::MovingLeadRequired => lead_moving,
                };
            let command = if follows {
                SpeedCommand::Fixed(speed)
            } else {
                SpeedCommand::Release
            };
            debug!("Platoon {}: {} -> {:?}", self.id(), vehicle, command);
            sim.set_speed(vehicle, command);
        }
    }

    /// Holds the whole platoon at `speed` until the target is removed. Ignored
    /// once the platoon is disbanded.
    pub fn set_target_speed<S: SimulationApi + ?Sized>(&mut self, sim: &mut S, speed: f64) {
        if !self.active {
            return;
        }
        self.target_speed = Some(speed);
        self.update_speed(sim, speed, true);
    }

    /// Drops the target and hands every member back to default speed control.
    pub fn remove_target_speed<S: SimulationApi + ?Sized>(&mut self, sim: &mut S) {
        if !self.active {
            return;
        }
        self.target_speed = None;
        let present: HashSet<VehicleId> = sim.vehicle_ids().into_iter().collect();
        for vehicle in self.vehicles.iter().filter(|v| present.contains(*v)) {
            sim.set_speed(vehicle, SpeedCommand::Release);
        }
    }

    pub fn set_speed_mode<S: SimulationApi + ?Sized>(&self, sim: &mut S, mode: SpeedMode) {
        if !self.active {
            return;
        }
        let present: HashSet<VehicleId> = sim.vehicle_ids().into_iter().collect();
        for vehicle in self.vehicles.iter().filter(|v| present.contains(*v)) {
            sim.set_speed_mode(vehicle, mode);
        }
    }

    fn start_platoon_behaviour<S: SimulationApi + ?Sized>(
        &mut self,
        sim: &mut S,
        vehicles: &[VehicleId],
    ) {
        if self.active {
            for vehicle in vehicles {
                sim.set_color(vehicle, self.color);
                apply_profile(sim, vehicle, &self.config.platoon_profile);
            }
        }
        self.update_platoon(sim);
    }

    // Only vehicles still on the map are touched.
    fn stop_platoon_behaviour<S: SimulationApi + ?Sized>(&mut self, sim: &mut S) {
        self.target_speed = None;
        let present: HashSet<VehicleId> = sim.vehicle_ids().into_iter().collect();
        for vehicle in self.vehicles.iter().filter(|v| present.contains(*v)) {
            sim.set_speed(vehicle, SpeedCommand::Release);
            sim.set_color(vehicle, self.config.released_color);
            apply_profile(sim, vehicle, &self.config.released_profile);
            sim.set_speed_mode(vehicle, self.config.speed_modes.released);
        }
    }
}

fn apply_profile<S: SimulationApi + ?Sized>(sim: &mut S, vehicle: &str, profile: &DrivingProfile) {
    sim.set_tau(vehicle, profile.tau);
    sim.set_speed_factor(vehicle, profile.speed_factor);
    sim.set_min_gap(vehicle, profile.min_gap);
    sim.set_imperfection(vehicle, profile.imperfection);
}
