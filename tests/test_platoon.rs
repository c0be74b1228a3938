//! Platoon lifecycle and speed propagation against the in-memory simulation.

mod common;

use common::*;
use platoon_control::simulation_api::{Rgb, SimulationApi, SpeedCommand, SpeedMode};
use platoon_control::{CatchUpPolicy, ControlConfig, MergeError, Platoon};

#[test]
fn test_new_platoon_applies_behaviour_and_caches_lead_state() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 40.0, 7.0);

    let p = platoon(&mut sim, &["a", "b"]);

    assert!(p.is_active());
    assert_eq!(p.id(), "a");
    assert_eq!(p.lead_vehicle(), "a");
    assert_eq!(p.vehicles().len(), 2);
    assert_eq!(p.routes().len(), 2);
    assert_eq!(p.routes()[0].destination.as_deref(), Some("east_out"));
    assert_eq!(p.lane(), Some("north_in_0"));
    assert_eq!(p.lane_position(), Some(50.0));

    for id in ["a", "b"] {
        let v = sim.vehicle(id).unwrap();
        assert_eq!(v.color, p.color());
        assert_eq!(v.profile.tau, 0.05);
        assert_eq!(v.profile.speed_factor, 1.0);
        assert_eq!(v.profile.min_gap, 0.0);
        assert_eq!(v.profile.imperfection, 0.0);
    }

    // b is 5.5 m behind a and takes the lead's speed, the lead is left alone.
    assert_eq!(command(&sim, "b"), SpeedCommand::Fixed(8.0));
    assert_eq!(command(&sim, "a"), SpeedCommand::Release);
}

#[test]
fn test_empty_platoon_is_rejected() {
    let mut sim = crossroads();
    assert!(Platoon::new(&mut sim, &[], &ControlConfig::default()).is_none());
}

#[test]
fn test_straggler_is_released_to_catch_up() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 100.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 90.0, 8.0);
    add_car(&mut sim, "c", NORTH_TO_EAST, 50.0, 8.0);

    let _p = platoon(&mut sim, &["a", "b", "c"]);

    assert_eq!(command(&sim, "b"), SpeedCommand::Fixed(8.0));
    assert_eq!(command(&sim, "c"), SpeedCommand::Release);
}

#[test]
fn test_moving_lead_policy_releases_followers_of_stopped_lead() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 0.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 42.0, 0.0);

    let gap_only = platoon(&mut sim, &["a", "b"]);
    assert_eq!(command(&sim, "b"), SpeedCommand::Fixed(0.0));
    gap_only.update_speed(&mut sim, 0.0, false);
    assert_eq!(command(&sim, "b"), SpeedCommand::Fixed(0.0));

    let config = ControlConfig {
        catch_up: CatchUpPolicy::MovingLeadRequired,
        ..ControlConfig::default()
    };
    let _strict = Platoon::new(&mut sim, &["a".to_string(), "b".to_string()], &config).unwrap();
    assert_eq!(command(&sim, "b"), SpeedCommand::Release);
}

#[test]
fn test_merge_folds_members_and_disbands_other() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 40.0, 8.0);
    add_car(&mut sim, "c", WEST_TO_EAST, 60.0, 8.0);

    let mut p1 = platoon(&mut sim, &["a", "b"]);
    let mut p2 = platoon(&mut sim, &["c"]);

    assert_eq!(p1.merge(&mut sim, &mut p2), Ok(()));

    assert!(p1.is_active());
    assert!(!p2.is_active());
    let members: Vec<&str> = p1.vehicles().iter().map(String::as_str).collect();
    assert_eq!(members, vec!["a", "b", "c"]);
    assert_eq!(p1.routes().len(), 3);
    assert_eq!(sim.vehicle("c").unwrap().color, p1.color());
    assert_eq!(sim.vehicle("c").unwrap().profile.tau, 0.05);
}

#[test]
fn test_merge_fails_when_routes_diverge() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "c", WEST_TO_SOUTH, 60.0, 8.0);

    let mut p1 = platoon(&mut sim, &["a"]);
    let mut p2 = platoon(&mut sim, &["c"]);

    let result = p1.merge(&mut sim, &mut p2);

    assert_eq!(
        result,
        Err(MergeError::RoutesDiverge {
            target: "a".to_string(),
            other: "c".to_string()
        })
    );
    assert!(p1.is_active());
    assert!(p2.is_active());
    assert_eq!(p1.vehicles().len(), 1);
    assert_eq!(p2.vehicles().len(), 1);
    assert_eq!(sim.vehicle("c").unwrap().color, p2.color());
}

#[test]
fn test_merge_into_disbanded_platoon_is_refused() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "c", WEST_TO_EAST, 60.0, 8.0);

    let mut p1 = platoon(&mut sim, &["a"]);
    let mut p2 = platoon(&mut sim, &["c"]);
    p1.disband(&mut sim);

    assert_eq!(
        p1.merge(&mut sim, &mut p2),
        Err(MergeError::Inactive("a".to_string()))
    );
    assert!(p2.is_active());
}

#[test]
fn test_member_leaving_disbands_and_releases_the_rest() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 42.0, 8.0);
    let mut p = platoon(&mut sim, &["a", "b"]);
    p.set_target_speed(&mut sim, 6.0);
    assert_eq!(command(&sim, "a"), SpeedCommand::Fixed(6.0));

    sim.remove_vehicle("b");
    p.update_platoon(&mut sim);

    assert!(!p.is_active());
    assert_eq!(p.target_speed(), None);
    let a = sim.vehicle("a").unwrap();
    assert_eq!(a.speed_command, SpeedCommand::Release);
    assert_eq!(a.color, Rgb(255, 255, 255));
    assert_eq!(a.profile.tau, 1.0);
    assert_eq!(a.profile.speed_factor, 0.9);
    assert_eq!(a.profile.min_gap, 2.5);
    assert_eq!(a.profile.imperfection, 0.5);
    assert_eq!(a.speed_mode, SpeedMode(31));
}

#[test]
fn test_lead_leaving_clears_location_and_disbands() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 42.0, 8.0);
    let mut p = platoon(&mut sim, &["a", "b"]);

    sim.remove_vehicle("a");
    p.update_platoon(&mut sim);

    assert_eq!(p.lane(), None);
    assert_eq!(p.lane_position(), None);
    assert!(!p.is_active());
    assert_eq!(command(&sim, "b"), SpeedCommand::Release);
}

#[test]
fn test_route_divergence_disbands() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 42.0, 8.0);
    let mut p = platoon(&mut sim, &["a", "b"]);

    p.update_platoon(&mut sim);
    assert!(p.is_active());

    sim.set_route("b", NORTH_TO_SOUTH.iter().map(|e| e.to_string()).collect());
    p.update_platoon(&mut sim);

    assert!(!p.is_active());
}

#[test]
fn test_convergence_holds_when_lead_is_on_final_edge() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "c", WEST_TO_SOUTH, 60.0, 8.0);
    let p = platoon(&mut sim, &["a"]);

    let c = vec!["c".to_string()];
    assert!(!p.check_routes_converge(&sim, &c));

    sim.vehicle_mut("a").unwrap().route_index = 1;
    assert!(p.check_routes_converge(&sim, &c));
    assert_eq!(p.remaining_route_of_vehicle(&sim, "a"), vec!["east_out".to_string()]);
}

#[test]
fn test_disbanded_platoon_applies_no_overrides() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 42.0, 8.0);
    let mut p = platoon(&mut sim, &["a", "b"]);

    p.disband(&mut sim);
    p.set_target_speed(&mut sim, 3.0);
    p.update_platoon(&mut sim);
    p.update_speed(&mut sim, 3.0, true);
    p.set_speed_mode(&mut sim, SpeedMode(23));

    assert_eq!(command(&sim, "a"), SpeedCommand::Release);
    assert_eq!(command(&sim, "b"), SpeedCommand::Release);
    assert_eq!(sim.vehicle("a").unwrap().speed_mode, SpeedMode(31));
    assert_eq!(p.target_speed(), None);
}

#[test]
fn test_convergence_fails_once_lead_has_left() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 42.0, 8.0);
    let p = platoon(&mut sim, &["a"]);

    let b = vec!["b".to_string()];
    assert!(p.check_routes_converge(&sim, &b));

    sim.remove_vehicle("a");
    assert!(!p.check_routes_converge(&sim, &b));
    assert!(!p.check_routes_converge(&sim, &Vec::<String>::new()));
}

#[test]
fn test_readding_member_keeps_set_semantics() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 42.0, 8.0);
    let mut p = platoon(&mut sim, &["a", "b"]);

    sim.set_tau("b", 1.0);
    p.add_vehicle(&mut sim, "b");

    assert_eq!(p.vehicles().len(), 2);
    assert_eq!(p.routes().len(), 3);
    assert_eq!(sim.vehicle("b").unwrap().profile.tau, 0.05);
}

#[test]
fn test_target_speed_holds_lead_and_close_followers() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 42.0, 8.0);
    let mut p = platoon(&mut sim, &["a", "b"]);

    p.set_target_speed(&mut sim, 5.0);
    assert_eq!(p.target_speed(), Some(5.0));
    assert_eq!(command(&sim, "a"), SpeedCommand::Fixed(5.0));
    assert_eq!(command(&sim, "b"), SpeedCommand::Fixed(5.0));

    p.update_platoon(&mut sim);
    assert_eq!(command(&sim, "a"), SpeedCommand::Fixed(5.0));

    p.remove_target_speed(&mut sim);
    assert_eq!(command(&sim, "a"), SpeedCommand::Release);
    assert_eq!(command(&sim, "b"), SpeedCommand::Release);

    p.update_platoon(&mut sim);
    assert_eq!(command(&sim, "b"), SpeedCommand::Fixed(8.0));
}

#[test]
fn test_platoon_measurements_come_from_members() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 50.0, 8.0);
    add_car(&mut sim, "b", WEST_TO_EAST, 42.0, 3.0);
    let p = platoon(&mut sim, &["a", "b"]);

    assert_eq!(p.current_speed(&sim), 8.0);
    assert_eq!(p.acceleration(&sim), 2.6);
    assert_eq!(p.length(&sim), 9.0);
    assert_eq!(
        p.lanes_of_all_vehicles(&sim),
        vec!["north_in_0".to_string(), "west_in_0".to_string()]
    );
    assert_eq!(sim.lane("b").as_deref(), Some("west_in_0"));
}

#[test]
fn test_platoon_keeps_together_over_simulated_ticks() {
    let mut sim = crossroads();
    add_car(&mut sim, "a", NORTH_TO_EAST, 60.0, 8.0);
    add_car(&mut sim, "b", NORTH_TO_EAST, 50.0, 8.0);
    let mut p = platoon(&mut sim, &["a", "b"]);

    for _ in 0..10 {
        p.update_platoon(&mut sim);
        sim.step(1.0);
    }
    assert!(p.is_active());

    // Both drive off the network eventually, which reclaims the platoon.
    for _ in 0..200 {
        p.update_platoon(&mut sim);
        sim.step(1.0);
    }
    assert!(!p.is_active());
    assert_eq!(sim.vehicle_count(), 0);
}
