// src/ui_state.rs
//
// UiState owns the Scene and the telemetry bus and drives one synchronous
// tick: poll → fuse → status/lifecycle → publish. It is constructed once,
// explicitly, and handed by reference to the renderer and the device
// controller — there is no hidden global instance.

use anyhow::Result;
use tracing::info;

use crate::channels::TelemetryBus;
use crate::fusion;
use crate::hardware::{HardwarePlatform, Watchdog};
use crate::params::Params;
use crate::pipeline::{EventBus, TickMetrics, UiEvent};
use crate::projection::CameraView;
use crate::scene::Scene;
use crate::types::{AlertStatus, ControlsMode, UI_FREQ};

/// Coarse engagement status shown by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Disengaged,
    Engaged,
    Override,
    Warning,
    Alert,
}

/// Ticks past onroad start before projected world objects are trusted;
/// the camera needs a moment to warm up.
const CAMERA_WARMUP_TICKS: u64 = UI_FREQ;

pub struct UiState {
    pub scene: Scene,
    pub bus: TelemetryBus,
    pub params: Params,
    pub view: CameraView,
    pub status: Status,
    pub platform: HardwarePlatform,

    started_prev: bool,
    watchdog: Box<dyn Watchdog>,
    metrics: TickMetrics,

    // Display toggles, seeded at construction and refreshed on each
    // onroad transition.
    pub show_debug: bool,
    pub show_gear: bool,
    pub show_tpms: bool,
    pub show_brake: bool,
    pub show_engrpm: bool,
    pub show_datetime: bool,
    pub show_steer: bool,

    pub prime_type: i32,
    pub language: String,
}

impl UiState {
    pub fn new(
        params: Params,
        bus: TelemetryBus,
        mut view: CameraView,
        platform: HardwarePlatform,
        watchdog: Box<dyn Watchdog>,
        metrics: TickMetrics,
    ) -> Result<Self> {
        view.set_wide(platform.supports_wide_camera() && params.get_bool("enable_wide_camera"));
        let prime_type = params.get_i32("prime_type")?;
        let language = params.get("language_setting")?.to_string();

        let mut s = Self {
            scene: Scene::default(),
            bus,
            params,
            view,
            status: Status::Disengaged,
            platform,
            started_prev: false,
            watchdog,
            metrics,
            show_debug: false,
            show_gear: false,
            show_tpms: false,
            show_brake: false,
            show_engrpm: false,
            show_datetime: false,
            show_steer: false,
            prime_type,
            language,
        };
        s.refresh_display_params();
        Ok(s)
    }

    /// Re-read the persisted display toggles.
    pub fn refresh_display_params(&mut self) {
        self.scene.is_metric = self.params.get_bool("is_metric");
        self.scene.compass = self.params.get_bool("compass");
        self.show_debug = self.params.get_bool("show_debug_ui");
        self.show_gear = self.params.get_bool("show_gear_ui");
        self.show_tpms = self.params.get_bool("show_tpms_ui");
        self.show_brake = self.params.get_bool("show_brake_ui");
        self.show_engrpm = self.params.get_bool("show_eng_rpm_ui");
        self.show_datetime = self.params.get_bool("show_date_time");
        self.show_steer = self.params.get_bool("show_steer_ui");
    }

    /// Projected geometry is only trusted once onroad and past the camera
    /// warm-up window.
    pub fn world_objects_visible(&self) -> bool {
        self.scene.started && self.bus.tick() > self.scene.started_tick + CAMERA_WARMUP_TICKS
    }

    /// One synchronous tick: all Scene mutation happens here, readers are
    /// notified only afterwards.
    pub fn update(&mut self, events: &mut EventBus) -> Result<()> {
        self.bus.poll_once();
        fusion::update_state(self)?;
        self.update_status(events)?;

        if self.bus.tick() % UI_FREQ == 0 {
            self.watchdog.kick();
        }
        self.metrics.inc(&self.metrics.total_ticks);
        events.publish(UiEvent::TickComplete);
        Ok(())
    }

    fn update_status(&mut self, events: &mut EventBus) -> Result<()> {
        if self.scene.started && self.bus.controls_state.updated() {
            let cs = &self.scene.controls_state;
            self.status = if cs.alert_status == AlertStatus::UserPrompt {
                Status::Warning
            } else if cs.alert_status == AlertStatus::Critical {
                Status::Alert
            } else if matches!(cs.mode, ControlsMode::PreEnabled | ControlsMode::Overriding) {
                Status::Override
            } else if cs.enabled {
                Status::Engaged
            } else {
                Status::Disengaged
            };
        }

        // Onroad/offroad transition: re-read persisted configuration so
        // changes made while offroad take effect at the next session.
        if self.scene.started != self.started_prev || self.bus.tick() == 1 {
            if self.scene.started {
                self.status = Status::Disengaged;
                self.scene.started_tick = self.bus.tick();
                self.scene.end_to_end = self.params.get_bool("end_to_end_toggle");
                self.view.set_wide(
                    self.platform.supports_wide_camera()
                        && self.params.get_bool("enable_wide_camera"),
                );
                self.scene.dynamic_lane_profile = self.params.get_i32("dynamic_lane_profile")?;
                self.refresh_display_params();
                info!("onroad session started at tick {}", self.scene.started_tick);
            }
            self.started_prev = self.scene.started;
            self.metrics.inc(&self.metrics.onroad_transitions);
            events.publish(UiEvent::OffroadTransition {
                offroad: !self.scene.started,
            });
        }
        Ok(())
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::types::*;

    #[test]
    fn test_first_tick_emits_offroad_transition() {
        let (_feed, mut ui) = fixture();
        let mut events = EventBus::new(16);
        ui.update(&mut events).unwrap();

        let events = events.drain();
        assert!(events.contains(&UiEvent::OffroadTransition { offroad: true }));
        assert!(events.contains(&UiEvent::TickComplete));
    }

    #[test]
    fn test_onroad_transition_resets_status_and_records_tick() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(16);

        ui.update(&mut events).unwrap();
        assert!(!ui.scene.started);

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();

        assert!(ui.scene.started);
        assert_eq!(ui.status, Status::Disengaged);
        assert_eq!(ui.scene.started_tick, 2);
        assert_eq!(ui.scene.dynamic_lane_profile, 1);
        assert!(events
            .drain()
            .contains(&UiEvent::OffroadTransition { offroad: false }));
    }

    #[test]
    fn test_transition_rereads_wide_camera_param() {
        let mut params = base_params();
        let (feed, mut ui) = {
            let (feed, ui) = fixture_with(params.clone(), HardwarePlatform::Tici);
            (feed, ui)
        };
        assert!(!ui.view.is_wide());

        // The user flips the toggle while offroad; it must only take
        // effect at the next onroad transition.
        params = Params::from_pairs(&[
            ("prime_type", "0"),
            ("language_setting", "en"),
            ("dynamic_lane_profile", "1"),
            ("enable_wide_camera", "1"),
        ]);
        ui.params = params;
        let mut events = EventBus::new(16);
        ui.update(&mut events).unwrap();
        assert!(!ui.view.is_wide());

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();
        assert!(ui.view.is_wide());
    }

    #[test]
    fn test_wide_camera_needs_hardware_support() {
        let params = Params::from_pairs(&[
            ("prime_type", "0"),
            ("language_setting", "en"),
            ("dynamic_lane_profile", "1"),
            ("enable_wide_camera", "1"),
        ]);
        let (_feed, ui) = fixture_with(params, HardwarePlatform::Eon);
        assert!(!ui.view.is_wide());
    }

    fn controls(
        alert: AlertStatus,
        mode: ControlsMode,
        enabled: bool,
    ) -> ControlsStateData {
        ControlsStateData {
            enabled,
            alert_status: alert,
            mode,
            lateral_control: LateralControlState::default(),
        }
    }

    #[test]
    fn test_status_precedence() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();
        assert!(ui.scene.started);

        let cases = [
            (
                controls(AlertStatus::UserPrompt, ControlsMode::Enabled, true),
                Status::Warning,
            ),
            (
                controls(AlertStatus::Critical, ControlsMode::Enabled, true),
                Status::Alert,
            ),
            (
                controls(AlertStatus::Normal, ControlsMode::PreEnabled, false),
                Status::Override,
            ),
            (
                controls(AlertStatus::Normal, ControlsMode::Overriding, true),
                Status::Override,
            ),
            (
                controls(AlertStatus::Normal, ControlsMode::Enabled, true),
                Status::Engaged,
            ),
            (
                controls(AlertStatus::Normal, ControlsMode::Disabled, false),
                Status::Disengaged,
            ),
        ];

        for (cs, expected) in cases {
            feed.controls_state.send(cs).unwrap();
            ui.update(&mut events).unwrap();
            assert_eq!(ui.status, expected);
        }
    }

    #[test]
    fn test_status_untouched_without_controls_update() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();

        feed.controls_state
            .send(controls(AlertStatus::Normal, ControlsMode::Enabled, true))
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.status, Status::Engaged);

        // No controls message this tick: status holds.
        ui.update(&mut events).unwrap();
        assert_eq!(ui.status, Status::Engaged);
    }

    #[test]
    fn test_watchdog_kicked_once_per_second() {
        use crate::channels::telemetry_pair;
        use crate::hardware::Watchdog;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountingWatchdog(Arc<AtomicUsize>);
        impl Watchdog for CountingWatchdog {
            fn kick(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let kicks = Arc::new(AtomicUsize::new(0));
        let (_feed, bus) = telemetry_pair();
        let mut ui = UiState::new(
            base_params(),
            bus,
            crate::projection::CameraView::new(2160.0, 1080.0, false),
            HardwarePlatform::Tici,
            Box::new(CountingWatchdog(kicks.clone())),
            TickMetrics::new(),
        )
        .unwrap();

        let mut events = EventBus::new(1024);
        for _ in 0..(3 * UI_FREQ) {
            ui.update(&mut events).unwrap();
        }
        assert_eq!(kicks.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_world_objects_hidden_during_warmup() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(256);

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();
        assert!(ui.scene.started);
        assert!(!ui.world_objects_visible());

        for _ in 0..UI_FREQ {
            ui.update(&mut events).unwrap();
            assert!(!ui.world_objects_visible());
        }
        ui.update(&mut events).unwrap();
        assert!(ui.world_objects_visible());
    }
}
