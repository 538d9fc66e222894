// src/device.rs
//
// Hysteretic wakefulness + smoothed brightness, derived from the fused
// Scene each tick. Brightness actuation runs on a blocking worker with at
// most one request in flight; a differing target that arrives while a
// request is outstanding is dropped, not queued.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::filter::FirstOrderFilter;
use crate::hardware::DisplayHardware;
use crate::pipeline::{EventBus, TickMetrics, UiEvent};
use crate::scene::Scene;
use crate::types::UI_FREQ;

const BACKLIGHT_OFFROAD: f32 = 50.0;
const BACKLIGHT_TS: f32 = 10.0;
const BACKLIGHT_DT: f32 = 0.05;

/// Interactive timeout after the ignition edge, seconds.
const IGNITION_ON_TIMEOUT_S: u64 = 10;
const IGNITION_OFF_TIMEOUT_S: u64 = 30;

/// Motion-wake thresholds.
const ACCEL_WAKE_DELTA: f32 = 0.2;
const GYRO_WAKE_DELTA: f32 = 0.15;
/// Window of the exponential running average on the accelerometer.
const ACCEL_SAMPLES: f32 = (5 * UI_FREQ) as f32;

pub struct Device {
    hardware: Arc<dyn DisplayHardware>,
    metrics: TickMetrics,

    brightness_filter: FirstOrderFilter,
    last_brightness: i32,
    brightness_task: Option<JoinHandle<()>>,

    interactive_timeout: i64,
    awake: bool,
    ignition_on: bool,

    accel_avg: f32,
    gyro_prev: f32,
}

impl Device {
    pub fn new(
        hardware: Arc<dyn DisplayHardware>,
        metrics: TickMetrics,
        events: &mut EventBus,
    ) -> Self {
        let mut device = Self {
            hardware,
            metrics,
            brightness_filter: FirstOrderFilter::new(BACKLIGHT_OFFROAD, BACKLIGHT_TS, BACKLIGHT_DT),
            last_brightness: 0,
            brightness_task: None,
            interactive_timeout: 0,
            awake: false,
            ignition_on: false,
            accel_avg: 0.0,
            gyro_prev: 0.0,
        };
        device.set_awake(true, events);
        device.reset_interactive_timeout();
        device
    }

    pub fn update(&mut self, scene: &Scene, events: &mut EventBus) {
        self.update_brightness(scene);
        self.update_wakefulness(scene, events);
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    fn set_awake(&mut self, on: bool, events: &mut EventBus) {
        if on != self.awake {
            self.awake = on;
            self.hardware.set_display_power(on);
            debug!("setting display power {on}");
            events.publish(UiEvent::DisplayPowerChanged { awake: on });
        }
    }

    fn reset_interactive_timeout(&mut self) {
        let secs = if self.ignition_on {
            IGNITION_ON_TIMEOUT_S
        } else {
            IGNITION_OFF_TIMEOUT_S
        };
        self.interactive_timeout = (secs * UI_FREQ) as i64;
    }

    fn update_brightness(&mut self, scene: &Scene) {
        let mut clipped = BACKLIGHT_OFFROAD;
        if scene.started {
            // Scale the sensor to 0..100, then apply the CIE 1931
            // psychometric lightness curve.
            clipped = 100.0 * scene.light_sensor;
            clipped = if clipped <= 8.0 {
                clipped / 903.3
            } else {
                ((clipped + 16.0) / 116.0).powi(3)
            };
            clipped = (100.0 * clipped).clamp(10.0, 100.0);
        }

        let mut brightness = self.brightness_filter.update(clipped).round() as i32;
        if !self.awake {
            brightness = 0;
        }

        if brightness != self.last_brightness {
            let in_flight = self
                .brightness_task
                .as_ref()
                .is_some_and(|t| !t.is_finished());
            if in_flight {
                // Deliberate debounce: dropped, never queued.
                self.metrics.inc(&self.metrics.brightness_dropped);
            } else {
                let hw = Arc::clone(&self.hardware);
                self.brightness_task =
                    Some(tokio::task::spawn_blocking(move || hw.set_brightness(brightness)));
                self.last_brightness = brightness;
                self.metrics.inc(&self.metrics.brightness_applied);
            }
        }
    }

    fn motion_triggered(&mut self, scene: &Scene) -> bool {
        let accel_trigger = (scene.accel_sensor - self.accel_avg).abs() > ACCEL_WAKE_DELTA;
        let gyro_trigger = (scene.gyro_sensor - self.gyro_prev).abs() > GYRO_WAKE_DELTA;

        self.gyro_prev = scene.gyro_sensor;
        self.accel_avg =
            (self.accel_avg * (ACCEL_SAMPLES - 1.0) + scene.accel_sensor) / ACCEL_SAMPLES;

        !self.awake && accel_trigger && gyro_trigger
    }

    fn update_wakefulness(&mut self, scene: &Scene, events: &mut EventBus) {
        let ignition_just_turned_off = !scene.ignition && self.ignition_on;
        self.ignition_on = scene.ignition;

        if ignition_just_turned_off || self.motion_triggered(scene) {
            self.reset_interactive_timeout();
        } else if self.interactive_timeout > 0 {
            self.interactive_timeout -= 1;
            if self.interactive_timeout == 0 {
                events.publish(UiEvent::InteractiveTimeout);
            }
        }

        self.set_awake(scene.ignition || self.interactive_timeout > 0, events);
    }
}
