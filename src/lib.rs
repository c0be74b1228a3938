//! Platoon formation and intersection reservation control for a traffic
//! microsimulation. The caller owns the simulation loop and invokes the
//! controllers once per tick through a [`simulation_api::SimulationApi`].

pub mod config;
pub mod control_system;
pub mod global_variables;
pub mod monitoring;
pub mod simulation_api;
pub mod simulation_engine;

pub use config::{CatchUpPolicy, ConfigError, ControlConfig};
pub use control_system::intersection_controller::{IntersectionController, SharedPlatoon};
pub use control_system::platoon::{MergeError, Platoon};
pub use simulation_api::SimulationApi;
