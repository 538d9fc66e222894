// src/geometry.rs
//
// Polygon builders: turn noisy model trajectories into screen-space
// polygons via the projection transform. All builders write rail-pair
// windings (left sequence followed by the right sequence reversed) so the
// renderer can fill them as closed loops.

use nalgebra::{Matrix3, Vector3};

use crate::params::Params;
use crate::projection::CameraView;
use crate::scene::{Scene, VertexPolygon};
use crate::types::{LineData, ModelData, RadarStateData, ScreenPoint, TRAJECTORY_SIZE};

pub const MIN_DRAW_DISTANCE: f32 = 10.0;
pub const MAX_DRAW_DISTANCE: f32 = 100.0;

/// Blind-spot ribbons only hug the first stretch of the lane boundary.
const BLINDSPOT_HORIZON: f32 = 100.0;

/// Camera mounting height; leads and the path ribbon are lifted by this.
const PATH_HEIGHT_OFFSET: f32 = 1.22;

/// Geometry widths read from the configuration store. Stored as scaled
/// integer strings; a parse failure is a contract violation and fatal.
#[derive(Debug, Clone, Copy)]
pub struct RoadWidths {
    pub custom_road_ui: bool,
    pub unlimited_road_ui: bool,
    pub path: f32,
    pub lane_line: f32,
    pub road_edge: f32,
    pub blindspot: f32,
}

impl RoadWidths {
    pub fn from_params(params: &Params) -> anyhow::Result<Self> {
        Ok(Self {
            custom_road_ui: params.get_bool("custom_road_ui"),
            unlimited_road_ui: params.get_bool("unlimited_road_ui"),
            path: params.get_f32("path_width")? / 10.0 * 0.1524,
            lane_line: params.get_f32("lane_lines_width")? / 12.0 * 0.1524,
            road_edge: params.get_f32("road_edges_width")? / 12.0 * 0.1524,
            blindspot: params.get_f32("blindspot_line_width")? / 10.0 * 0.1524,
        })
    }
}

/// Largest sample index whose longitudinal distance does not exceed
/// `target`; 0 if the first sample already exceeds it. Bounds all
/// downstream sampling to a usable horizon.
pub fn path_length_idx(line: &LineData, target: f32) -> usize {
    let mut max_idx = 0;
    for i in 1..TRAJECTORY_SIZE {
        if line.x[i] > target {
            break;
        }
        max_idx = i;
    }
    max_idx
}

/// Build a symmetric rail-pair polygon along `line`. A sample contributes
/// only if both offset projections succeed. With `allow_invert` false, a
/// sample whose left point moves down-screen relative to the previous
/// accepted one is discarded, so the polygon cannot fold back over itself
/// when the path crests a hill.
pub fn update_line_data(
    view: &CameraView,
    calib: &Matrix3<f32>,
    line: &LineData,
    y_off: f32,
    z_off: f32,
    pvd: &mut VertexPolygon,
    max_idx: usize,
    allow_invert: bool,
) {
    let mut left_points: Vec<ScreenPoint> = Vec::with_capacity(max_idx + 1);
    let mut right_points: Vec<ScreenPoint> = Vec::with_capacity(max_idx + 1);

    for i in 0..=max_idx {
        let left = view.car_to_screen(
            calib,
            Vector3::new(line.x[i], line.y[i] - y_off, line.z[i] + z_off),
        );
        let right = view.car_to_screen(
            calib,
            Vector3::new(line.x[i], line.y[i] + y_off, line.z[i] + z_off),
        );
        if let (Some(left), Some(right)) = (left, right) {
            if !allow_invert {
                if let Some(prev) = left_points.last() {
                    if left.y > prev.y {
                        continue;
                    }
                }
            }
            left_points.push(left);
            right_points.push(right);
        }
    }

    pvd.clear();
    for p in &left_points {
        pvd.push(*p);
    }
    for p in right_points.iter().rev() {
        pvd.push(*p);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlindspotSide {
    Left,
    Right,
}

/// Build a one-sided ribbon hugging a lane boundary: an outbound sweep at
/// the asymmetric offset and a return sweep at the opposite offset. Unlike
/// the symmetric builder there is no pairing requirement; the cursor only
/// advances on a successful projection, so failed samples are skipped
/// without gaps.
pub fn update_blindspot_data(
    view: &CameraView,
    calib: &Matrix3<f32>,
    side: BlindspotSide,
    line: &LineData,
    y_off: f32,
    pvd: &mut VertexPolygon,
    max_idx: usize,
) {
    let (out_off, ret_off) = match side {
        BlindspotSide::Left => (y_off, 0.0),
        BlindspotSide::Right => (0.0, y_off),
    };

    pvd.clear();
    for i in 0..=max_idx {
        let pt = Vector3::new(line.x[i], line.y[i] - out_off, line.z[i]);
        if let Some(p) = view.car_to_screen(calib, pt) {
            pvd.push(p);
        }
    }
    for i in (0..=max_idx).rev() {
        let pt = Vector3::new(line.x[i], line.y[i] + ret_off, line.z[i]);
        if let Some(p) = view.car_to_screen(calib, pt) {
            pvd.push(p);
        }
    }
}

/// Refresh both lead-vehicle markers from the radar track and the current
/// path trajectory. A lead without status keeps no radar flag and emits no
/// point.
pub fn update_leads(
    scene: &mut Scene,
    view: &CameraView,
    radar: &RadarStateData,
    position: &LineData,
) {
    let calib = scene.view_from_calib;
    for (i, lead) in [radar.lead_one, radar.lead_two].iter().enumerate() {
        if lead.status {
            let z = position.z[path_length_idx(position, lead.d_rel)];
            if let Some(p) = view.car_to_screen(
                &calib,
                Vector3::new(lead.d_rel, -lead.y_rel, z + PATH_HEIGHT_OFFSET),
            ) {
                scene.lead_vertices[i] = Some(p);
            }
            scene.lead_radar[i] = lead.radar;
        } else {
            scene.lead_radar[i] = false;
        }
    }
}

/// Full-scene geometry rebuild, invoked on each trajectory-channel update.
pub fn update_model(
    scene: &mut Scene,
    view: &CameraView,
    model: &ModelData,
    radar: &RadarStateData,
    widths: &RoadWidths,
) {
    let calib = scene.view_from_calib;
    let horizon_x = model.position.x[TRAJECTORY_SIZE - 1];
    let mut max_distance = if widths.custom_road_ui && widths.unlimited_road_ui {
        horizon_x
    } else {
        horizon_x.clamp(MIN_DRAW_DISTANCE, MAX_DRAW_DISTANCE)
    };

    // Lane lines, width scaled by per-line probability.
    let max_idx = path_length_idx(&model.lane_lines[0], max_distance);
    for i in 0..scene.lane_line_vertices.len() {
        scene.lane_line_probs[i] = model.lane_line_probs[i];
        let half_width = if widths.custom_road_ui {
            widths.lane_line * scene.lane_line_probs[i]
        } else {
            0.025 * scene.lane_line_probs[i]
        };
        update_line_data(
            view,
            &calib,
            &model.lane_lines[i],
            half_width,
            0.0,
            &mut scene.lane_line_vertices[i],
            max_idx,
            true,
        );
    }

    // Blind-spot ribbons along the inner lane boundaries, shorter horizon.
    let blindspot_width = if widths.custom_road_ui { widths.blindspot } else { 0.5 };
    let max_idx_barrier = max_idx.min(path_length_idx(&model.lane_lines[0], BLINDSPOT_HORIZON));
    update_blindspot_data(
        view,
        &calib,
        BlindspotSide::Left,
        &model.lane_lines[1],
        blindspot_width,
        &mut scene.lane_blindspot_vertices[0],
        max_idx_barrier,
    );
    update_blindspot_data(
        view,
        &calib,
        BlindspotSide::Right,
        &model.lane_lines[2],
        blindspot_width,
        &mut scene.lane_blindspot_vertices[1],
        max_idx_barrier,
    );

    // Road edges.
    let edge_width = if widths.custom_road_ui { widths.road_edge } else { 0.025 };
    for i in 0..scene.road_edge_vertices.len() {
        scene.road_edge_stds[i] = model.road_edge_stds[i];
        update_line_data(
            view,
            &calib,
            &model.road_edges[i],
            edge_width,
            0.0,
            &mut scene.road_edge_vertices[i],
            max_idx,
            true,
        );
    }

    // Path ribbon, shrunk to the lead when one is tracked.
    if radar.lead_one.status {
        let lead_d = radar.lead_one.d_rel * 2.0;
        max_distance = (lead_d - (lead_d * 0.35).min(10.0)).clamp(0.0, max_distance);
    }
    let path_width = if widths.custom_road_ui { widths.path } else { 0.9 };
    let max_idx = path_length_idx(&model.position, max_distance);
    update_line_data(
        view,
        &calib,
        &model.position,
        path_width,
        PATH_HEIGHT_OFFSET,
        &mut scene.track_vertices,
        max_idx,
        false,
    );
}
