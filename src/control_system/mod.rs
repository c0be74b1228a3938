// control_system/mod.rs
pub mod intersection_controller;
pub mod platoon;
