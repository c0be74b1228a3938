use crate::config::ControlConfig;
use crate::control_system::platoon::Platoon;
use crate::monitoring::status_log::{IntersectionStatus, PlatoonStatus};
use crate::simulation_api::{LaneId, SimulationApi};
use log::{debug, info};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Platoons are shared between whoever formed them and every controller
/// tracking them.
pub type SharedPlatoon = Rc<RefCell<Platoon>>;

/// Serialises junction access among the platoons approaching one signalised
/// intersection by handing out back-to-back time reservations.
pub struct IntersectionController {
    pub name: String,
    lanes_served: HashSet<LaneId>,
    platoons: Vec<SharedPlatoon>,
    config: ControlConfig,
}

impl IntersectionController {
    pub fn new<S: SimulationApi + ?Sized>(
        sim: &S,
        intersection: &str,
        config: &ControlConfig,
    ) -> Self {
        Self {
            name: intersection.to_string(),
            lanes_served: sim.controlled_lanes(intersection).into_iter().collect(),
            platoons: Vec::new(),
            config: config.clone(),
        }
    }

    pub fn lanes_served(&self) -> &HashSet<LaneId> {
        &self.lanes_served
    }

    pub fn platoons(&self) -> &[SharedPlatoon] {
        &self.platoons
    }

    pub fn is_tracking(&self, platoon: &SharedPlatoon) -> bool {
        self.platoons.iter().any(|p| Rc::ptr_eq(p, platoon))
    }

    pub fn add_platoon(&mut self, platoon: SharedPlatoon) {
        self.platoons.push(platoon);
    }

    /// Stops managing `platoon` and returns it to default speed behaviour.
    pub fn remove_platoon<S: SimulationApi + ?Sized>(
        &mut self,
        sim: &mut S,
        platoon: &SharedPlatoon,
    ) {
        self.platoons.retain(|p| !Rc::ptr_eq(p, platoon));
        self.release(sim, platoon);
    }

    fn release<S: SimulationApi + ?Sized>(&self, sim: &mut S, platoon: &SharedPlatoon) {
        let mut platoon = platoon.borrow_mut();
        platoon.remove_target_speed(sim);
        platoon.set_speed_mode(sim, self.config.speed_modes.released);
        debug!("{}: released platoon {}", self.name, platoon.id());
    }

    fn serves(&self, lane: Option<&str>) -> bool {
        lane.is_some_and(|lane| self.lanes_served.contains(lane))
    }

    /// Distance proxy to this junction's stop line, 0 off the served lanes.
    pub fn platoon_lane_position(&self, platoon: &Platoon) -> f64 {
        if self.serves(platoon.lane()) {
            platoon.lane_position().unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Starts tracking every active candidate on a served lane, closest first.
    pub fn find_and_add_relevant_platoons(&mut self, candidates: &[SharedPlatoon]) {
        let mut ordered: Vec<(f64, &SharedPlatoon)> = candidates
            .iter()
            .map(|p| (self.platoon_lane_position(&p.borrow()), p))
            .collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, platoon) in ordered {
            let admissible = {
                let p = platoon.borrow();
                p.is_active() && self.serves(p.lane())
            };
            if admissible && !self.is_tracking(platoon) {
                info!("{}: now managing platoon {}", self.name, platoon.borrow().id());
                self.add_platoon(Rc::clone(platoon));
            }
        }
    }

    /// Sets `platoon`'s speed for the junction already reserved for
    /// `reserved_time` seconds and returns the new reservation total.
    pub fn update_platoon_speed<S: SimulationApi + ?Sized>(
        &self,
        sim: &mut S,
        platoon: &mut Platoon,
        reserved_time: f64,
    ) -> f64 {
        let distance = self.platoon_lane_position(platoon);
        let current_speed = platoon.current_speed(sim);

        // Near the line the distance/time ratio collapses towards zero, so the
        // platoon keeps its speed instead.
        if distance > self.config.approach_distance {
            platoon.set_speed_mode(sim, self.config.speed_modes.far_junction);
            let speed = reservation_speed(distance, reserved_time, platoon.acceleration(sim));
            if speed >= current_speed {
                platoon.remove_target_speed(sim);
            } else {
                platoon.set_target_speed(sim, speed);
            }
        } else if current_speed == 0.0 {
            platoon.remove_target_speed(sim);
        } else {
            platoon.set_speed_mode(sim, self.config.speed_modes.near_junction);
            platoon.set_target_speed(sim, current_speed);
        }

        // Only the first platoon to reserve pays for its approach.
        let length_through_junction = if reserved_time == 0.0 {
            distance + platoon.length(sim)
        } else {
            platoon.length(sim)
        };
        reserved_time + length_through_junction / current_speed.max(1.0)
    }

    /// Evicts disbanded platoons and those that left the served lanes, then
    /// reschedules the rest in list order. Returns the total reserved time, or
    /// `None` when fewer than two platoons are tracked.
    pub fn update<S: SimulationApi + ?Sized>(&mut self, sim: &mut S) -> Option<f64> {
        if self.platoons.len() <= 1 {
            return None;
        }

        let tracked = std::mem::take(&mut self.platoons);
        let mut reserved_time = 0.0;
        for platoon in tracked {
            // A disbanded platoon's members are no longer its own to command.
            if !platoon.borrow().is_active() {
                debug!("{}: dropped disbanded platoon {}", self.name, platoon.borrow().id());
                continue;
            }
            let lanes = platoon.borrow().lanes_of_all_vehicles(sim);
            if lanes.iter().all(|lane| !self.lanes_served.contains(lane)) {
                self.release(sim, &platoon);
                continue;
            }
            // Platoons whose lead already crossed are left alone this tick.
            if self.serves(platoon.borrow().lane()) {
                reserved_time =
                    self.update_platoon_speed(sim, &mut platoon.borrow_mut(), reserved_time);
            }
            self.platoons.push(platoon);
        }
        Some(reserved_time)
    }

    /// Logs each tracked platoon's target and current speed.
    pub fn log_status<S: SimulationApi + ?Sized>(
        &self,
        sim: &S,
        tick: u64,
        reservation: Option<f64>,
    ) -> IntersectionStatus {
        let platoons: Vec<PlatoonStatus> = self
            .platoons
            .iter()
            .map(|p| {
                let p = p.borrow();
                PlatoonStatus {
                    platoon_id: p.id().to_string(),
                    target_speed: p.target_speed(),
                    current_speed: p.current_speed(sim),
                    member_count: p.vehicles().len(),
                }
            })
            .collect();

        if !platoons.is_empty() {
            info!("------------{} Information------------", self.name);
            for p in &platoons {
                info!(
                    "Platoon: {}, Target: {:?}, Current: {:.2}",
                    p.platoon_id, p.target_speed, p.current_speed
                );
            }
            if let Some(reserved) = reservation {
                info!("Total time reserved: {:.2}", reserved);
            }
        }

        IntersectionStatus {
            tick,
            intersection: self.name.clone(),
            reserved_time: reservation,
            platoons,
        }
    }
}

/// Speed that reaches the stop line when the current reservation ends, never
/// below the platoon's acceleration capability.
pub fn reservation_speed(distance: f64, reserved_time: f64, acceleration: f64) -> f64 {
    (distance / reserved_time.max(1.0)).max(acceleration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_speed() {
        assert_eq!(reservation_speed(100.0, 10.0, 2.0), 10.0);
        assert_eq!(reservation_speed(100.0, 0.0, 2.0), 100.0);
        assert_eq!(reservation_speed(10.0, 20.0, 2.0), 2.0);
    }
}
