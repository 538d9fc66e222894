// src/types.rs

use serde::Serialize;

/// Ticks per second of the scene-sync loop.
pub const UI_FREQ: u64 = 20;

/// Samples per predicted trajectory line.
pub const TRAJECTORY_SIZE: usize = 33;

/// A point in screen pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// One predicted 3D line in car-body coordinates, sorted by increasing
/// longitudinal distance.
#[derive(Debug, Clone)]
pub struct LineData {
    pub x: [f32; TRAJECTORY_SIZE],
    pub y: [f32; TRAJECTORY_SIZE],
    pub z: [f32; TRAJECTORY_SIZE],
}

impl Default for LineData {
    fn default() -> Self {
        Self {
            x: [0.0; TRAJECTORY_SIZE],
            y: [0.0; TRAJECTORY_SIZE],
            z: [0.0; TRAJECTORY_SIZE],
        }
    }
}

/// Full model-trajectory message: ego path, lane lines and road edges.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub position: LineData,
    pub lane_lines: [LineData; 4],
    pub lane_line_probs: [f32; 4],
    pub road_edges: [LineData; 2],
    pub road_edge_stds: [f32; 2],
}

/// One tracked lead vehicle.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadData {
    /// Longitudinal distance to the lead, meters.
    pub d_rel: f32,
    /// Lateral offset of the lead, meters (positive = right).
    pub y_rel: f32,
    /// Does this slot currently track anything?
    pub status: bool,
    /// Radar-confirmed (vs. vision-only).
    pub radar: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RadarStateData {
    pub lead_one: LeadData,
    pub lead_two: LeadData,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CarStateData {
    pub steering_angle_deg: f32,
    pub left_blindspot: bool,
    pub right_blindspot: bool,
    pub v_ego: f32,
}

/// Which lateral controller produced this tick's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LateralControlState {
    Pid { output: f32 },
    Indi { output: f32 },
    Lqr { output: f32 },
    Torque { output: f32 },
}

impl Default for LateralControlState {
    fn default() -> Self {
        Self::Pid { output: 0.0 }
    }
}

impl LateralControlState {
    pub fn output(&self) -> f32 {
        match *self {
            Self::Pid { output }
            | Self::Indi { output }
            | Self::Lqr { output }
            | Self::Torque { output } => output,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AlertStatus {
    #[default]
    Normal,
    UserPrompt,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ControlsMode {
    #[default]
    Disabled,
    PreEnabled,
    Enabled,
    Overriding,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ControlsStateData {
    pub enabled: bool,
    pub alert_status: AlertStatus,
    pub mode: ControlsMode,
    pub lateral_control: LateralControlState,
}

/// Roll/pitch/yaw calibration, radians.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationData {
    pub rpy: [f32; 3],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceStateData {
    pub started: bool,
}

/// Coarse power-hardware classification reported by the control units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PowerHardware {
    #[default]
    Unknown,
    Integrated,
    External,
}

/// State of one power/control unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerUnitState {
    pub hardware: PowerHardware,
    pub ignition_line: bool,
    pub ignition_can: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CarParamsData {
    pub longitudinal_control: bool,
}

/// Raw camera exposure readings used to derive ambient light.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraStateData {
    pub gain: f32,
    pub integ_lines: u32,
}

/// One raw inertial sample. Batches occasionally arrive with empty vectors;
/// fusion skips those without touching the scene.
#[derive(Debug, Clone)]
pub enum SensorSample {
    Acceleration(Vec<f32>),
    GyroUncalibrated(Vec<f32>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DriverMonitoringData {
    pub face_detected: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalizationData {
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GpsData {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LateralPlanData {
    pub dynamic_lane_profile_status: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RoadLimitSpeedData {
    pub active: bool,
    pub speed_limit: f32,
}
