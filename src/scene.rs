// src/scene.rs
//
// Single source of truth for everything derived from telemetry on a given
// tick. One writer (fusion + lifecycle), readers are notified only after
// the tick's mutations are complete.

use nalgebra::Matrix3;

use crate::types::*;

/// Hard cap on polygon vertices: one left and one right rail point per
/// trajectory sample.
pub const MAX_POLYGON_VERTICES: usize = 2 * TRAJECTORY_SIZE;

/// A screen-space polygon with a fixed maximum capacity. Exceeding the
/// capacity means the upstream trajectory size contract was violated.
#[derive(Debug, Clone, Default)]
pub struct VertexPolygon {
    points: Vec<ScreenPoint>,
}

impl VertexPolygon {
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn push(&mut self, p: ScreenPoint) {
        assert!(
            self.points.len() < MAX_POLYGON_VERTICES,
            "polygon capacity exceeded"
        );
        self.points.push(p);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ScreenPoint] {
        &self.points
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    /// Camera-from-car rotation, replaced on each calibration update.
    pub view_from_calib: Matrix3<f32>,

    // Projected geometry.
    pub lane_line_vertices: [VertexPolygon; 4],
    pub lane_line_probs: [f32; 4],
    pub road_edge_vertices: [VertexPolygon; 2],
    pub road_edge_stds: [f32; 2],
    pub lane_blindspot_vertices: [VertexPolygon; 2],
    pub track_vertices: VertexPolygon,
    pub lead_vertices: [Option<ScreenPoint>; 2],
    pub lead_radar: [bool; 2],

    // Vehicle state mirror.
    pub car_state: CarStateData,
    pub controls_state: ControlsStateData,
    pub steering_angle_deg: f32,
    pub left_blindspot: bool,
    pub right_blindspot: bool,
    pub output_scale: f32,
    pub longitudinal_control: bool,

    // Power / lifecycle.
    pub power_hardware: PowerHardware,
    pub ignition: bool,
    pub started: bool,
    /// Tick at which the current onroad session began.
    pub started_tick: u64,

    // Ambient sensors.
    pub light_sensor: f32,
    pub accel_sensor: f32,
    pub gyro_sensor: f32,

    // Session config, re-read at each onroad transition.
    pub end_to_end: bool,
    pub dynamic_lane_profile: i32,
    pub dynamic_lane_profile_status: bool,
    pub is_metric: bool,
    pub compass: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            view_from_calib: Matrix3::identity(),
            lane_line_vertices: Default::default(),
            lane_line_probs: [0.0; 4],
            road_edge_vertices: Default::default(),
            road_edge_stds: [0.0; 2],
            lane_blindspot_vertices: Default::default(),
            track_vertices: VertexPolygon::default(),
            lead_vertices: [None; 2],
            lead_radar: [false; 2],
            car_state: CarStateData::default(),
            controls_state: ControlsStateData::default(),
            steering_angle_deg: 0.0,
            left_blindspot: false,
            right_blindspot: false,
            output_scale: 0.0,
            longitudinal_control: false,
            power_hardware: PowerHardware::Unknown,
            ignition: false,
            started: false,
            started_tick: 0,
            light_sensor: 0.0,
            accel_sensor: 0.0,
            gyro_sensor: 0.0,
            end_to_end: false,
            dynamic_lane_profile: 0,
            dynamic_lane_profile_status: false,
            is_metric: false,
            compass: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "polygon capacity exceeded")]
    fn test_polygon_overflow_asserts() {
        let mut poly = VertexPolygon::default();
        for _ in 0..=MAX_POLYGON_VERTICES {
            poly.push(ScreenPoint::default());
        }
    }
}
