use crate::simulation_api::SpeedCommand;
use crate::simulation_engine::vehicles::SimVehicle;

/// Computes a vehicle's speed for the next step of `dt` seconds.
///
/// A fixed command is held (capped at max speed). Otherwise the vehicle
/// accelerates toward `max_speed * speed_factor`. In both cases it never
/// drives further than the room left behind its leader, if one is given.
pub fn next_speed(vehicle: &SimVehicle, leader_gap: Option<f64>, dt: f64) -> f64 {
    let desired = match vehicle.speed_command {
        SpeedCommand::Fixed(speed) => speed.clamp(0.0, vehicle.max_speed),
        SpeedCommand::Release => {
            let cruise = vehicle.max_speed * vehicle.profile.speed_factor;
            (vehicle.speed + vehicle.acceleration * dt).min(cruise)
        }
    };

    match leader_gap {
        Some(gap) if dt > 0.0 => {
            let room = (gap - vehicle.profile.min_gap).max(0.0);
            desired.min(room / dt)
        }
        _ => desired,
    }
}

/// Moves the vehicle along its route by `speed * dt`, crossing onto later
/// edges as needed. `edge_length` looks up the length of an edge.
///
/// Returns `false` once the vehicle has driven off its final edge.
pub fn advance_vehicle<F>(vehicle: &mut SimVehicle, dt: f64, edge_length: F) -> bool
where
    F: Fn(&str) -> Option<f64>,
{
    vehicle.lane_position += vehicle.speed * dt;
    loop {
        let Some(edge) = vehicle.current_edge() else {
            return false;
        };
        let Some(length) = edge_length(edge) else {
            return false;
        };
        if vehicle.lane_position < length {
            return true;
        }
        vehicle.lane_position -= length;
        vehicle.route_index += 1;
    }
}
