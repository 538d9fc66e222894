// src/hardware.rs
//
// Platform seams: display/brightness actuation, the liveness watchdog and
// the hardware platform flavor. Actuation primitives are collaborators —
// this core only decides when to call them.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Camera/display platform flavor, fixed at process start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HardwarePlatform {
    Tici,
    Eon,
    Pc,
}

impl HardwarePlatform {
    /// Only tici hardware carries the wide camera.
    pub fn supports_wide_camera(&self) -> bool {
        matches!(self, Self::Tici)
    }

    /// Maximum exposure value of the light-estimation camera.
    pub fn max_exposure(&self) -> f32 {
        match self {
            // Wide camera: 1618 lines at gain 10, dampened.
            Self::Tici => 1618.0 * 10.0 / 6.0,
            Self::Eon => 5408.0 * 1.0,
            Self::Pc => 1904.0 * 10.0,
        }
    }
}

/// Physical display actuation. Implementations must be cheap to call from
/// a blocking worker.
pub trait DisplayHardware: Send + Sync {
    fn set_brightness(&self, percent: i32);
    fn set_display_power(&self, on: bool);
}

/// Logging stand-in used when no platform backend is wired up.
pub struct StubDisplay;

impl DisplayHardware for StubDisplay {
    fn set_brightness(&self, percent: i32) {
        debug!("display brightness -> {percent}");
    }

    fn set_display_power(&self, on: bool) {
        debug!("display power -> {on}");
    }
}

/// Liveness collaborator, kicked once per second. Its timeout handling is
/// out of scope here.
pub trait Watchdog: Send {
    fn kick(&mut self);
}

/// Writes the current epoch time to a file the supervisor watches.
pub struct FileWatchdog {
    path: PathBuf,
}

impl FileWatchdog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Watchdog for FileWatchdog {
    fn kick(&mut self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        if let Err(e) = std::fs::write(&self.path, now.to_string()) {
            warn!("watchdog kick failed: {e}");
        }
    }
}

/// No-op watchdog for tests and the demo loop.
pub struct NullWatchdog;

impl Watchdog for NullWatchdog {
    fn kick(&mut self) {}
}
