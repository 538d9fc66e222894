// src/fusion.rs
//
// Per-tick telemetry fusion: for each logical channel, copy or derive the
// relevant Scene fields iff that channel reported an update this tick.
// Runs synchronously inside the tick; the Scene has no other writer.

use anyhow::Result;
use tracing::warn;

use crate::geometry::{self, RoadWidths};
use crate::projection::calibration_matrix;
use crate::types::{PowerHardware, SensorSample, UI_FREQ};
use crate::ui_state::UiState;

/// Power-state channel freshness window, in ticks.
const POWER_STALE_TICKS: u64 = 5 * UI_FREQ;

pub fn update_state(s: &mut UiState) -> Result<()> {
    if s.bus.car_state.updated() {
        let cs = *s.bus.car_state.value();
        s.scene.car_state = cs;
        s.scene.steering_angle_deg = cs.steering_angle_deg;
        s.scene.left_blindspot = cs.left_blindspot;
        s.scene.right_blindspot = cs.right_blindspot;
    }

    if s.scene.started && s.bus.controls_state.updated() {
        let cs = *s.bus.controls_state.value();
        s.scene.controls_state = cs;
        s.scene.output_scale = cs.lateral_control.output();
    }

    if s.bus.calibration.updated() {
        s.scene.view_from_calib = calibration_matrix(&s.bus.calibration.value().rpy);
    }

    if s.world_objects_visible() {
        if s.bus.model.updated() {
            let widths = RoadWidths::from_params(&s.params)?;
            geometry::update_model(
                &mut s.scene,
                &s.view,
                s.bus.model.value(),
                s.bus.radar_state.value(),
                &widths,
            );
            s.metrics().inc(&s.metrics().scene_rebuilds);
        }
        // Guard against a trajectory captured before this onroad session.
        if s.bus.radar_state.updated() && s.bus.model.rcv_tick() > s.scene.started_tick {
            geometry::update_leads(
                &mut s.scene,
                &s.view,
                s.bus.radar_state.value(),
                &s.bus.model.value().position,
            );
            s.metrics().inc(&s.metrics().lead_updates);
        }
    }

    if s.bus.power_states.updated() {
        let units = s.bus.power_states.value();
        if let Some(first) = units.first() {
            s.scene.power_hardware = first.hardware;
            if first.hardware != PowerHardware::Unknown {
                s.scene.ignition = units
                    .iter()
                    .any(|u| u.ignition_line || u.ignition_can);
            }
        }
    } else if s.bus.tick() - s.bus.power_states.rcv_tick() > POWER_STALE_TICKS {
        s.scene.power_hardware = PowerHardware::Unknown;
    }

    if s.bus.car_params.updated() {
        s.scene.longitudinal_control = s.bus.car_params.value().longitudinal_control;
    }

    // Raw inertial samples only matter for the motion-wake path, which is
    // moot once driving.
    if !s.scene.started && s.bus.sensor_events.updated() {
        for sample in s.bus.sensor_events.value() {
            match sample {
                SensorSample::Acceleration(v) => {
                    if v.len() < 3 {
                        warn!("acceleration sample with {} axes, skipping", v.len());
                    } else {
                        s.scene.accel_sensor = v[2];
                    }
                }
                SensorSample::GyroUncalibrated(v) => {
                    if v.len() < 2 {
                        warn!("gyro sample with {} axes, skipping", v.len());
                    } else {
                        s.scene.gyro_sensor = v[1];
                    }
                }
            }
        }
    }

    // Ambient light comes from whichever camera this platform exposes.
    if !s.platform.supports_wide_camera() && s.bus.road_camera.updated() {
        let cam = s.bus.road_camera.value();
        let ev = cam.gain * cam.integ_lines as f32;
        s.scene.light_sensor = (1.0 - ev / s.platform.max_exposure()).clamp(0.0, 1.0);
    } else if s.platform.supports_wide_camera() && s.bus.wide_road_camera.updated() {
        let cam = s.bus.wide_road_camera.value();
        let ev = cam.gain * cam.integ_lines as f32;
        s.scene.light_sensor = (1.0 - ev / s.platform.max_exposure()).clamp(0.0, 1.0);
    }

    if s.bus.lateral_plan.updated() {
        s.scene.dynamic_lane_profile_status =
            s.bus.lateral_plan.value().dynamic_lane_profile_status;
    }

    s.scene.started = s.bus.device_state.value().started && s.scene.ignition;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwarePlatform;
    use crate::pipeline::EventBus;
    use crate::types::*;
    use crate::ui_state::testing::{base_params, feed_onroad, fixture, fixture_with};

    #[test]
    fn test_ignition_is_or_across_units() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed.power_states
            .send(vec![
                PowerUnitState {
                    hardware: PowerHardware::Integrated,
                    ignition_line: false,
                    ignition_can: false,
                },
                PowerUnitState {
                    hardware: PowerHardware::External,
                    ignition_line: false,
                    ignition_can: true,
                },
            ])
            .unwrap();
        ui.update(&mut events).unwrap();

        assert!(ui.scene.ignition);
        assert_eq!(ui.scene.power_hardware, PowerHardware::Integrated);
    }

    #[test]
    fn test_unknown_hardware_does_not_clear_ignition() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed.power_states
            .send(vec![PowerUnitState {
                hardware: PowerHardware::Integrated,
                ignition_line: true,
                ignition_can: false,
            }])
            .unwrap();
        ui.update(&mut events).unwrap();
        assert!(ui.scene.ignition);

        feed.power_states
            .send(vec![PowerUnitState {
                hardware: PowerHardware::Unknown,
                ignition_line: false,
                ignition_can: false,
            }])
            .unwrap();
        ui.update(&mut events).unwrap();
        assert!(ui.scene.ignition, "unknown units must not rewrite ignition");
    }

    #[test]
    fn test_stale_power_channel_resets_hardware_type() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(2048);

        feed.power_states
            .send(vec![PowerUnitState {
                hardware: PowerHardware::External,
                ignition_line: true,
                ignition_can: false,
            }])
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.power_hardware, PowerHardware::External);

        for _ in 0..POWER_STALE_TICKS {
            ui.update(&mut events).unwrap();
            assert_eq!(ui.scene.power_hardware, PowerHardware::External);
        }
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.power_hardware, PowerHardware::Unknown);
    }

    #[test]
    fn test_calibration_replaces_view_matrix() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        // Scene::default() carries the identity, under which every
        // flat-road sample sits at zero camera depth. A calibration
        // message must install the composed camera-from-car rotation.
        assert_eq!(ui.scene.view_from_calib, nalgebra::Matrix3::identity());

        let rpy = [0.0, 0.02, -0.01];
        feed.calibration.send(CalibrationData { rpy }).unwrap();
        ui.update(&mut events).unwrap();

        assert_eq!(ui.scene.view_from_calib, calibration_matrix(&rpy));
        let depth = ui.scene.view_from_calib * nalgebra::Vector3::new(10.0, 0.0, 0.0);
        assert!(depth.z > 0.0, "forward points must gain camera depth");
    }

    #[test]
    fn test_started_requires_device_and_ignition() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed.device_state
            .send(DeviceStateData { started: true })
            .unwrap();
        ui.update(&mut events).unwrap();
        assert!(!ui.scene.started, "device started alone is not enough");

        feed.power_states
            .send(vec![PowerUnitState {
                hardware: PowerHardware::Integrated,
                ignition_line: true,
                ignition_can: false,
            }])
            .unwrap();
        ui.update(&mut events).unwrap();
        assert!(ui.scene.started);
    }

    #[test]
    fn test_lateral_control_mode_dispatch() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();

        let modes = [
            LateralControlState::Pid { output: 0.1 },
            LateralControlState::Indi { output: 0.2 },
            LateralControlState::Lqr { output: 0.3 },
            LateralControlState::Torque { output: 0.4 },
        ];
        for mode in modes {
            feed.controls_state
                .send(ControlsStateData {
                    enabled: true,
                    alert_status: AlertStatus::Normal,
                    mode: ControlsMode::Enabled,
                    lateral_control: mode,
                })
                .unwrap();
            ui.update(&mut events).unwrap();
            assert_eq!(ui.scene.output_scale, mode.output());
        }
    }

    #[test]
    fn test_controls_ignored_until_started() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed.controls_state
            .send(ControlsStateData {
                enabled: true,
                lateral_control: LateralControlState::Torque { output: 0.9 },
                ..Default::default()
            })
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.output_scale, 0.0);
    }

    #[test]
    fn test_sensor_samples_gated_and_empty_batches_skipped() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed.sensor_events
            .send(vec![
                SensorSample::Acceleration(vec![0.1, 0.2, 9.8]),
                SensorSample::GyroUncalibrated(vec![0.01, 0.05]),
            ])
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.accel_sensor, 9.8);
        assert_eq!(ui.scene.gyro_sensor, 0.05);

        // Malformed batches leave the scalars untouched.
        feed.sensor_events
            .send(vec![
                SensorSample::Acceleration(vec![]),
                SensorSample::GyroUncalibrated(vec![]),
            ])
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.accel_sensor, 9.8);
        assert_eq!(ui.scene.gyro_sensor, 0.05);
    }

    #[test]
    fn test_sensor_samples_not_applied_once_started() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();
        assert!(ui.scene.started);

        feed.sensor_events
            .send(vec![SensorSample::Acceleration(vec![0.0, 0.0, 3.0])])
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.accel_sensor, 0.0);
    }

    #[test]
    fn test_light_sensor_from_platform_camera() {
        // Tici listens to the wide camera and ignores the narrow one.
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(64);

        feed.road_camera
            .send(CameraStateData {
                gain: 10.0,
                integ_lines: 1000,
            })
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.light_sensor, 0.0);

        feed.wide_road_camera
            .send(CameraStateData {
                gain: 0.0,
                integ_lines: 0,
            })
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.light_sensor, 1.0);

        // Non-tici platforms use the narrow road camera instead.
        let (feed, mut ui) = fixture_with(base_params(), HardwarePlatform::Pc);
        feed.road_camera
            .send(CameraStateData {
                gain: 10.0,
                integ_lines: 1904,
            })
            .unwrap();
        ui.update(&mut events).unwrap();
        assert_eq!(ui.scene.light_sensor, 0.0);
    }

    fn visible_model() -> ModelData {
        let mut model = ModelData::default();
        for i in 0..TRAJECTORY_SIZE {
            let x = i as f32 * 3.0;
            model.position.x[i] = x;
            for line in model.lane_lines.iter_mut() {
                line.x[i] = x;
            }
            for edge in model.road_edges.iter_mut() {
                edge.x[i] = x;
            }
        }
        model.lane_line_probs = [1.0; 4];
        model
    }

    fn run_warmup(ui: &mut UiState, events: &mut EventBus) {
        while !ui.world_objects_visible() {
            ui.update(events).unwrap();
        }
    }

    #[test]
    fn test_model_rebuild_gated_by_visibility() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(2048);

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();

        // Still warming up: a model update must not rebuild geometry.
        feed.model.send(visible_model()).unwrap();
        ui.update(&mut events).unwrap();
        assert!(ui.scene.track_vertices.is_empty());

        run_warmup(&mut ui, &mut events);
        feed.model.send(visible_model()).unwrap();
        ui.update(&mut events).unwrap();
        assert!(!ui.scene.track_vertices.is_empty());
    }

    #[test]
    fn test_lead_update_requires_fresh_trajectory() {
        let (feed, mut ui) = fixture();
        let mut events = EventBus::new(2048);

        feed_onroad(&feed);
        ui.update(&mut events).unwrap();
        run_warmup(&mut ui, &mut events);

        // Radar arrives but the model channel has never been received
        // this session: the lead marker must stay clear.
        feed.radar_state
            .send(RadarStateData {
                lead_one: LeadData {
                    d_rel: 30.0,
                    y_rel: 0.0,
                    status: true,
                    radar: true,
                },
                ..Default::default()
            })
            .unwrap();
        ui.update(&mut events).unwrap();
        assert!(ui.scene.lead_vertices[0].is_none());
        assert!(!ui.scene.lead_radar[0]);

        feed.model.send(visible_model()).unwrap();
        ui.update(&mut events).unwrap();
        feed.radar_state
            .send(RadarStateData {
                lead_one: LeadData {
                    d_rel: 30.0,
                    y_rel: 0.0,
                    status: true,
                    radar: true,
                },
                ..Default::default()
            })
            .unwrap();
        ui.update(&mut events).unwrap();
        assert!(ui.scene.lead_vertices[0].is_some());
        assert!(ui.scene.lead_radar[0]);
    }
}
