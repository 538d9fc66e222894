// src/main.rs

mod channels;
mod device;
mod filter;
mod fusion;
mod geometry;
mod hardware;
mod params;
mod pipeline;
mod projection;
mod scene;
mod types;
mod ui_state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use channels::TelemetryFeed;
use device::Device;
use hardware::{FileWatchdog, HardwarePlatform, StubDisplay};
use params::Params;
use pipeline::{EventBus, TickMetrics, UiEvent};
use projection::CameraView;
use types::*;
use ui_state::UiState;

const SCREEN_WIDTH: f32 = 2160.0;
const SCREEN_HEIGHT: f32 = 1080.0;

/// Ticks between metric summaries in the log.
const SUMMARY_INTERVAL_TICKS: u64 = 10 * UI_FREQ;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "roadscene=info".to_string()),
        )
        .init();

    info!("Scene sync starting");

    let params = Params::load("params.yaml")?;
    info!("Configuration loaded");

    let (feed, bus) = channels::telemetry_pair();
    let metrics = TickMetrics::new();

    let mut ui = UiState::new(
        params,
        bus,
        CameraView::new(SCREEN_WIDTH, SCREEN_HEIGHT, false),
        HardwarePlatform::Tici,
        Box::new(FileWatchdog::new(
            std::env::temp_dir().join("roadscene_watchdog"),
        )),
        metrics.clone(),
    )?;
    info!(
        "Scene sync ready: wide_camera={} prime_type={} language={}",
        ui.view.is_wide(),
        ui.prime_type,
        ui.language
    );

    let mut events = EventBus::new(256);
    let mut device = Device::new(Arc::new(StubDisplay), metrics.clone(), &mut events);

    // Stand-in for the real telemetry transport: a scripted drive.
    tokio::spawn(synthetic_drive(feed));

    let mut interval = tokio::time::interval(Duration::from_millis(1000 / UI_FREQ));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                ui.update(&mut events)?;
                device.update(&ui.scene, &mut events);

                for event in events.drain() {
                    match event {
                        UiEvent::TickComplete => {}
                        UiEvent::OffroadTransition { offroad } => {
                            info!("transition: {}", if offroad { "offroad" } else { "onroad" });
                        }
                        UiEvent::DisplayPowerChanged { awake } => {
                            info!("display {}", if awake { "awake" } else { "asleep" });
                        }
                        UiEvent::InteractiveTimeout => {
                            info!("interactive timeout, going to sleep");
                        }
                    }
                }

                let tick = ui.bus.tick();
                if tick % SUMMARY_INTERVAL_TICKS == 0 {
                    info!("{}", metrics.summary());
                }
                if tick % UI_FREQ == 0 && ui.world_objects_visible() {
                    debug!(
                        "scene: status={:?} track={} leads=[{} {}]",
                        ui.status,
                        ui.scene.track_vertices.len(),
                        ui.scene.lead_vertices[0].is_some(),
                        ui.scene.lead_vertices[1].is_some(),
                    );
                    if ui.show_debug {
                        debug!(
                            "track polygon: {}",
                            serde_json::to_string(ui.scene.track_vertices.points())
                                .unwrap_or_default()
                        );
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down: {}", metrics.summary());
                break;
            }
        }
    }

    Ok(())
}

/// Feeds the bus a plausible short drive: ignition on, calibration settles,
/// the model tracks a gentle curve with one radar lead. Stops when the
/// consumer goes away.
async fn synthetic_drive(feed: TelemetryFeed) {
    use crossbeam_channel::TrySendError;

    // A full queue just means the consumer is a tick behind; only a
    // disconnect stops the drive.
    fn offer<T>(tx: &crossbeam_channel::Sender<T>, msg: T) -> bool {
        !matches!(tx.try_send(msg), Err(TrySendError::Disconnected(_)))
    }

    let mut interval = tokio::time::interval(Duration::from_millis(1000 / UI_FREQ));
    let mut step: u64 = 0;

    offer(
        &feed.calibration,
        CalibrationData {
            rpy: [0.0, 0.02, -0.01],
        },
    );
    offer(
        &feed.car_params,
        CarParamsData {
            longitudinal_control: true,
        },
    );

    loop {
        interval.tick().await;
        step += 1;
        let t = step as f32 / UI_FREQ as f32;

        if !offer(&feed.device_state, DeviceStateData { started: true }) {
            debug!("scene sync gone, stopping synthetic drive");
            return;
        }
        offer(
            &feed.power_states,
            vec![PowerUnitState {
                hardware: PowerHardware::Integrated,
                ignition_line: true,
                ignition_can: false,
            }],
        );

        offer(
            &feed.car_state,
            CarStateData {
                steering_angle_deg: 4.0 * (0.2 * t).sin(),
                v_ego: 28.0,
                left_blindspot: false,
                right_blindspot: false,
            },
        );
        offer(
            &feed.controls_state,
            ControlsStateData {
                enabled: true,
                alert_status: AlertStatus::Normal,
                mode: ControlsMode::Enabled,
                lateral_control: LateralControlState::Torque {
                    output: 0.3 * (0.2 * t).sin(),
                },
            },
        );
        offer(
            &feed.wide_road_camera,
            CameraStateData {
                gain: 2.0,
                integ_lines: 400,
            },
        );
        offer(
            &feed.sensor_events,
            vec![
                SensorSample::Acceleration(vec![0.0, 0.0, 9.8]),
                SensorSample::GyroUncalibrated(vec![0.0, 0.01, 0.0]),
            ],
        );

        offer(&feed.model, curved_model(t));
        offer(
            &feed.radar_state,
            RadarStateData {
                lead_one: LeadData {
                    d_rel: 45.0 + 5.0 * (0.1 * t).sin(),
                    y_rel: 0.3,
                    status: true,
                    radar: true,
                },
                lead_two: LeadData::default(),
            },
        );

        if step % UI_FREQ == 0 && feed.model.is_full() {
            warn!("model channel backlogged, consumer is falling behind");
        }
    }
}

/// A gently curving trajectory with lane lines 1.8 m out and road edges at
/// 3.6 m.
fn curved_model(t: f32) -> ModelData {
    let mut model = ModelData::default();
    let curvature = 0.002 * (0.2 * t).sin();

    for i in 0..TRAJECTORY_SIZE {
        let x = 3.0 * i as f32;
        let y = curvature * x * x;
        model.position.x[i] = x;
        model.position.y[i] = y;

        for (j, offset) in [-3.6f32, -1.8, 1.8, 3.6].into_iter().enumerate() {
            model.lane_lines[j].x[i] = x;
            model.lane_lines[j].y[i] = y + offset;
        }
        for (j, offset) in [-5.4f32, 5.4].into_iter().enumerate() {
            model.road_edges[j].x[i] = x;
            model.road_edges[j].y[i] = y + offset;
        }
    }

    model.lane_line_probs = [0.4, 0.95, 0.95, 0.4];
    model.road_edge_stds = [0.1, 0.1];
    model
}
