// platoon_demo.rs
//
// Example driver: runs the in-memory crossroads, forms platoons from arriving
// vehicles and lets an intersection controller pace them through J1.
//
// Usage: platoon_demo [config.json] [status.csv]

use log::{error, info};
use platoon_control::control_system::intersection_controller::SharedPlatoon;
use platoon_control::monitoring::status_log::append_status_csv;
use platoon_control::simulation_api::SimulationApi;
use platoon_control::simulation_engine::lanes::create_crossroads;
use platoon_control::simulation_engine::simulation::InMemorySimulation;
use platoon_control::simulation_engine::vehicles::{SimVehicle, VehicleType};
use platoon_control::{ControlConfig, IntersectionController, Platoon};
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;
use tokio::time::{interval, Duration};

const STEP_SECONDS: f64 = 1.0;
const TICKS: u64 = 300;
const SPAWN_EVERY: u64 = 3;

fn spawn_vehicle(sim: &mut InMemorySimulation, next_id: &mut u64) -> String {
    let mut rng = rand::rng();
    let entry = if rng.random_bool(0.5) { "north_in" } else { "west_in" };
    let exit = if rng.random_bool(0.7) { "east_out" } else { "south_out" };
    let vehicle_type = if rng.random_range(0.0..1.0) < 0.85 {
        VehicleType::Car
    } else {
        VehicleType::Bus
    };
    let id = format!("veh{}", *next_id);
    *next_id += 1;
    let speed = rng.random_range(6.0..10.0);
    sim.insert_vehicle(
        SimVehicle::new(id.clone(), vehicle_type, vec![entry.into(), exit.into()]).at(0.0, speed),
    );
    id
}

/// Puts a new vehicle into an existing platoon on its lane when routes allow,
/// otherwise starts a platoon of its own.
fn join_or_form_platoon(
    sim: &mut InMemorySimulation,
    platoons: &mut Vec<SharedPlatoon>,
    vehicle: String,
    config: &ControlConfig,
) {
    let Some(mut fresh) = Platoon::new(sim, &[vehicle], config) else {
        return;
    };
    let lane = sim.lane(fresh.lead_vehicle());
    let candidate = platoons.iter().find(|p| {
        let p = p.borrow();
        p.is_active() && p.lane().map(str::to_string) == lane
    });
    if let Some(target) = candidate {
        if target.borrow_mut().merge(sim, &mut fresh).is_ok() {
            return;
        }
    }
    platoons.push(Rc::new(RefCell::new(fresh)));
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match ControlConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("Could not load config {}: {}", path, e);
                return;
            }
        },
        None => ControlConfig::default(),
    };
    let csv_path = args.next();

    let mut sim = InMemorySimulation::new(create_crossroads(200.0));
    let mut controller = IntersectionController::new(&sim, "J1", &config);
    let mut platoons: Vec<SharedPlatoon> = Vec::new();
    let mut next_vehicle_id = 1;

    let mut ticker = interval(Duration::from_millis(20));
    for tick in 0..TICKS {
        ticker.tick().await;

        if tick % SPAWN_EVERY == 0 {
            let vehicle = spawn_vehicle(&mut sim, &mut next_vehicle_id);
            join_or_form_platoon(&mut sim, &mut platoons, vehicle, &config);
        }

        controller.find_and_add_relevant_platoons(&platoons);
        let reservation = controller.update(&mut sim);
        for platoon in &platoons {
            platoon.borrow_mut().update_platoon(&mut sim);
        }

        let status = controller.log_status(&sim, tick, reservation);
        if let Some(path) = &csv_path {
            if let Err(e) = append_status_csv(path, &status) {
                error!("Error logging intersection status: {}", e);
            }
        }

        platoons.retain(|p| p.borrow().is_active());
        sim.step(STEP_SECONDS);
    }

    info!(
        "Finished after {:.0}s with {} vehicles and {} platoons remaining",
        sim.time(),
        sim.vehicle_count(),
        platoons.len()
    );
}
