// src/projection.rs
//
// Calibrated 3D→2D projection. A point in car-body coordinates is rotated
// into camera space, multiplied by the intrinsic matrix of the selected
// camera, perspective-divided, mapped into screen pixels and finally clip
// tested against the screen rectangle expanded by a fixed margin. Falling
// outside that rectangle is an expected, frequent, silent outcome.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::types::ScreenPoint;

/// Clip-region margin around the screen, pixels.
pub const CLIP_MARGIN: f32 = 500.0;

/// Full-frame dimensions of the camera image, pixels.
pub const FRAME_WIDTH: f32 = 1928.0;
pub const FRAME_HEIGHT: f32 = 1208.0;

/// Focal lengths of the narrow and wide cameras.
pub const FCAM_FOCAL: f32 = 2648.0;
pub const ECAM_FOCAL: f32 = 567.0;

/// Fixed axis permutation from device frame (x forward, y left, z up)
/// into camera frame (x right, y down, z forward).
fn view_from_device() -> Matrix3<f32> {
    Matrix3::new(
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0, //
        1.0, 0.0, 0.0,
    )
}

/// Camera-from-car matrix derived from a roll/pitch/yaw calibration.
/// Recomputed once per calibration update; immutable between updates.
pub fn calibration_matrix(rpy: &[f32; 3]) -> Matrix3<f32> {
    let device_from_calib = *Rotation3::from_euler_angles(rpy[0], rpy[1], rpy[2]).matrix();
    view_from_device() * device_from_calib
}

fn intrinsic_matrix(focal: f32) -> Matrix3<f32> {
    Matrix3::new(
        focal, 0.0, FRAME_WIDTH / 2.0, //
        0.0, focal, FRAME_HEIGHT / 2.0, //
        0.0, 0.0, 1.0,
    )
}

/// Screen-space view: intrinsic selection plus the 2D affine map from
/// full-frame coordinates to screen pixels.
#[derive(Debug, Clone)]
pub struct CameraView {
    wide: bool,
    screen_w: f32,
    screen_h: f32,
    scale: f32,
    off_x: f32,
    off_y: f32,
}

impl CameraView {
    pub fn new(screen_w: f32, screen_h: f32, wide: bool) -> Self {
        // Scale the frame to cover the screen, centered.
        let scale = (screen_w / FRAME_WIDTH).max(screen_h / FRAME_HEIGHT);
        Self {
            wide,
            screen_w,
            screen_h,
            scale,
            off_x: (screen_w - scale * FRAME_WIDTH) / 2.0,
            off_y: (screen_h - scale * FRAME_HEIGHT) / 2.0,
        }
    }

    pub fn set_wide(&mut self, wide: bool) {
        self.wide = wide;
    }

    pub fn is_wide(&self) -> bool {
        self.wide
    }

    /// Project a car-space point to screen pixels through the current
    /// calibration. `None` means not visible this sample.
    pub fn car_to_screen(
        &self,
        calib: &Matrix3<f32>,
        pt: Vector3<f32>,
    ) -> Option<ScreenPoint> {
        let ep = calib * pt;
        let focal = if self.wide { ECAM_FOCAL } else { FCAM_FOCAL };
        let kep = intrinsic_matrix(focal) * ep;

        if kep.z <= 0.0 {
            return None;
        }

        let frame_x = kep.x / kep.z;
        let frame_y = kep.y / kep.z;
        let point = ScreenPoint {
            x: self.scale * frame_x + self.off_x,
            y: self.scale * frame_y + self.off_y,
        };

        let in_clip_region = point.x >= -CLIP_MARGIN
            && point.x <= self.screen_w + CLIP_MARGIN
            && point.y >= -CLIP_MARGIN
            && point.y <= self.screen_h + CLIP_MARGIN;
        in_clip_region.then_some(point)
    }
}
