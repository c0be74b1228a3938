use crate::simulation_api::{EdgeId, LaneId};
use std::collections::HashMap;

/// Represents a lane (the single lane of one network edge).
#[derive(Debug, Clone)]
pub struct Lane {
    pub name: LaneId,
    pub edge: EdgeId,
    /// Length of the lane in meters.
    pub length_meters: f64,
}

impl Lane {
    pub fn new(edge: &str, length_meters: f64) -> Self {
        Self {
            name: lane_of_edge(edge),
            edge: edge.to_string(),
            length_meters,
        }
    }
}

/// Lane IDs follow the `<edge>_<index>` convention.
pub fn lane_of_edge(edge: &str) -> LaneId {
    format!("{}_0", edge)
}

/// Edges, their lanes, and which lanes each traffic light governs.
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    lanes: HashMap<EdgeId, Lane>,
    traffic_lights: HashMap<String, Vec<LaneId>>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, edge: &str, length_meters: f64) -> &mut Self {
        self.lanes
            .insert(edge.to_string(), Lane::new(edge, length_meters));
        self
    }

    /// Puts the lanes of `edges` under the traffic light `intersection`.
    pub fn add_traffic_light(&mut self, intersection: &str, edges: &[&str]) -> &mut Self {
        let lanes = edges.iter().map(|e| lane_of_edge(e)).collect();
        self.traffic_lights.insert(intersection.to_string(), lanes);
        self
    }

    pub fn lane(&self, edge: &str) -> Option<&Lane> {
        self.lanes.get(edge)
    }

    pub fn controlled_lanes(&self, intersection: &str) -> Vec<LaneId> {
        self.traffic_lights
            .get(intersection)
            .cloned()
            .unwrap_or_default()
    }
}

/// A crossroads: `north_in`/`west_in` approach junction `J1`, both continue
/// onto `east_out` or `south_out`.
pub fn create_crossroads(approach_length: f64) -> RoadNetwork {
    let mut network = RoadNetwork::new();
    network
        .add_edge("north_in", approach_length)
        .add_edge("west_in", approach_length)
        .add_edge("east_out", approach_length)
        .add_edge("south_out", approach_length)
        .add_traffic_light("J1", &["north_in", "west_in"]);
    network
}
