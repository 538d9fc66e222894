// src/channels.rs
//
// Telemetry bus. Each logical channel exposes "value as of this tick",
// "was updated this tick" and "tick at which it was last received". A
// single non-blocking poll per tick advances every channel by at most one
// message; a channel with no new data simply reports not-updated and the
// rest of the tick proceeds without waiting. Retry/backoff for the
// underlying transport is the producer's concern, not ours.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::types::*;

const CHANNEL_DEPTH: usize = 32;

/// One logical telemetry channel with per-tick dirty-flag semantics.
pub struct Channel<T> {
    rx: Receiver<T>,
    value: T,
    updated: bool,
    rcv_tick: u64,
}

impl<T: Default> Channel<T> {
    fn new(rx: Receiver<T>) -> Self {
        Self {
            rx,
            value: T::default(),
            updated: false,
            rcv_tick: 0,
        }
    }

    fn poll(&mut self, tick: u64) {
        self.updated = false;
        if let Ok(v) = self.rx.try_recv() {
            self.value = v;
            self.updated = true;
            self.rcv_tick = tick;
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// True iff a message arrived during the most recent poll.
    pub fn updated(&self) -> bool {
        self.updated
    }

    /// Tick index at which the last message was received (0 = never).
    pub fn rcv_tick(&self) -> u64 {
        self.rcv_tick
    }
}

/// The fixed channel set, established at construction.
pub struct TelemetryBus {
    tick: u64,
    pub car_state: Channel<CarStateData>,
    pub controls_state: Channel<ControlsStateData>,
    pub calibration: Channel<CalibrationData>,
    pub model: Channel<ModelData>,
    pub radar_state: Channel<RadarStateData>,
    pub device_state: Channel<DeviceStateData>,
    pub road_camera: Channel<CameraStateData>,
    pub wide_road_camera: Channel<CameraStateData>,
    pub power_states: Channel<Vec<PowerUnitState>>,
    pub car_params: Channel<CarParamsData>,
    pub driver_monitoring: Channel<DriverMonitoringData>,
    pub sensor_events: Channel<Vec<SensorSample>>,
    pub localization: Channel<LocalizationData>,
    pub gps: Channel<GpsData>,
    pub lateral_plan: Channel<LateralPlanData>,
    pub road_limit_speed: Channel<RoadLimitSpeedData>,
}

/// Producer half handed to the transport (or to tests).
#[derive(Clone)]
pub struct TelemetryFeed {
    pub car_state: Sender<CarStateData>,
    pub controls_state: Sender<ControlsStateData>,
    pub calibration: Sender<CalibrationData>,
    pub model: Sender<ModelData>,
    pub radar_state: Sender<RadarStateData>,
    pub device_state: Sender<DeviceStateData>,
    pub road_camera: Sender<CameraStateData>,
    pub wide_road_camera: Sender<CameraStateData>,
    pub power_states: Sender<Vec<PowerUnitState>>,
    pub car_params: Sender<CarParamsData>,
    pub driver_monitoring: Sender<DriverMonitoringData>,
    pub sensor_events: Sender<Vec<SensorSample>>,
    pub localization: Sender<LocalizationData>,
    pub gps: Sender<GpsData>,
    pub lateral_plan: Sender<LateralPlanData>,
    pub road_limit_speed: Sender<RoadLimitSpeedData>,
}

macro_rules! make_channel {
    () => {{
        let (tx, rx) = bounded(CHANNEL_DEPTH);
        (tx, Channel::new(rx))
    }};
}

/// Build the producer/consumer pair for the fixed channel set.
pub fn telemetry_pair() -> (TelemetryFeed, TelemetryBus) {
    let (car_state_tx, car_state) = make_channel!();
    let (controls_state_tx, controls_state) = make_channel!();
    let (calibration_tx, calibration) = make_channel!();
    let (model_tx, model) = make_channel!();
    let (radar_state_tx, radar_state) = make_channel!();
    let (device_state_tx, device_state) = make_channel!();
    let (road_camera_tx, road_camera) = make_channel!();
    let (wide_road_camera_tx, wide_road_camera) = make_channel!();
    let (power_states_tx, power_states) = make_channel!();
    let (car_params_tx, car_params) = make_channel!();
    let (driver_monitoring_tx, driver_monitoring) = make_channel!();
    let (sensor_events_tx, sensor_events) = make_channel!();
    let (localization_tx, localization) = make_channel!();
    let (gps_tx, gps) = make_channel!();
    let (lateral_plan_tx, lateral_plan) = make_channel!();
    let (road_limit_speed_tx, road_limit_speed) = make_channel!();

    let feed = TelemetryFeed {
        car_state: car_state_tx,
        controls_state: controls_state_tx,
        calibration: calibration_tx,
        model: model_tx,
        radar_state: radar_state_tx,
        device_state: device_state_tx,
        road_camera: road_camera_tx,
        wide_road_camera: wide_road_camera_tx,
        power_states: power_states_tx,
        car_params: car_params_tx,
        driver_monitoring: driver_monitoring_tx,
        sensor_events: sensor_events_tx,
        localization: localization_tx,
        gps: gps_tx,
        lateral_plan: lateral_plan_tx,
        road_limit_speed: road_limit_speed_tx,
    };

    let bus = TelemetryBus {
        tick: 0,
        car_state,
        controls_state,
        calibration,
        model,
        radar_state,
        device_state,
        road_camera,
        wide_road_camera,
        power_states,
        car_params,
        driver_monitoring,
        sensor_events,
        localization,
        gps,
        lateral_plan,
        road_limit_speed,
    };

    (feed, bus)
}

impl TelemetryBus {
    /// Advance every channel by at most one message. Never blocks.
    pub fn poll_once(&mut self) {
        self.tick += 1;
        self.car_state.poll(self.tick);
        self.controls_state.poll(self.tick);
        self.calibration.poll(self.tick);
        self.model.poll(self.tick);
        self.radar_state.poll(self.tick);
        self.device_state.poll(self.tick);
        self.road_camera.poll(self.tick);
        self.wide_road_camera.poll(self.tick);
        self.power_states.poll(self.tick);
        self.car_params.poll(self.tick);
        self.driver_monitoring.poll(self.tick);
        self.sensor_events.poll(self.tick);
        self.localization.poll(self.tick);
        self.gps.poll(self.tick);
        self.lateral_plan.poll(self.tick);
        self.road_limit_speed.poll(self.tick);
    }

    /// Current tick index, incremented once per poll.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}
