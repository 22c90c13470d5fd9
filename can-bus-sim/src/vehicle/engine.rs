//! Vehicle engine
//!
//! Folds an ordered event stream into vehicle state. Each consumed event may
//! change the operating mode (see [`IntrusionMonitor`]), then updates the
//! physical state according to its kind, then appends one telemetry sample.
//!
//! ## Dynamics
//! - **Gas**: pedal → power → torque (capped) → speed gain through the gear
//!   ratio (capped) → engine speed (clamped)
//! - **Brake**: speed loss grows exponentially with intensity; torque is
//!   re-derived from the last commanded power at the new engine speed
//! - **Idle**: small random road-load drift biased towards slowing down; once
//!   the engine is shut down, a fixed drag until the vehicle stops
//!
//! Gas and brake inputs fall back to the idle transition outside `Normal` mode.

use crate::config::EngineConfig;
use crate::types::{Event, EventKind, Result, SimError};
use crate::vehicle::gear::{gear_for_speed, gear_ratio};
use crate::vehicle::monitor::IntrusionMonitor;
use crate::vehicle::state::{ModeTransition, OperatingMode, TelemetrySample, VehicleState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::E;

/// kW and RPM to N·m
const POWER_TO_TORQUE: f64 = 9550.0;

/// Stateful vehicle model
#[derive(Debug, Clone)]
pub struct VehicleEngine {
    config: EngineConfig,
    state: VehicleState,
    monitor: IntrusionMonitor,
    rng: ChaCha8Rng,
    samples: Vec<TelemetrySample>,
    braking: Vec<(f64, f64)>,
    transitions: Vec<ModeTransition>,
    last_timestamp: Option<f64>,
    last_query_time: f64,
    last_gear: Option<u8>,
}

impl VehicleEngine {
    /// Create an engine at rest in `Normal` mode
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            state: VehicleState::at_rest(config.min_engine_speed),
            monitor: IntrusionMonitor::new(config.invalid_msg_threshold, config.window_length),
            rng: ChaCha8Rng::seed_from_u64(config.noise_seed),
            samples: Vec::new(),
            braking: Vec::new(),
            transitions: Vec::new(),
            last_timestamp: None,
            last_query_time: f64::NEG_INFINITY,
            last_gear: None,
            config,
        })
    }

    /// Builder method: start from a given speed instead of rest
    pub fn with_initial_speed(mut self, speed_kmph: f64) -> Self {
        let speed = speed_kmph.max(0.0);
        self.state.speed_kmph = speed;
        self.state.engine_speed_rpm = self.engine_speed_for(speed, gear_ratio(speed));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current physical state
    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Current operating mode
    pub fn mode(&self) -> OperatingMode {
        self.monitor.mode()
    }

    /// (speed, engine speed, torque)
    pub fn query_vehicle_status(&self) -> (f64, f64, f64) {
        (
            self.state.speed_kmph,
            self.state.engine_speed_rpm,
            self.state.torque_nm,
        )
    }

    /// Full telemetry series, one sample per consumed event
    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// (timestamp, speed) series
    pub fn speedometer(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .map(|s| (s.timestamp, s.speed_kmph))
            .collect()
    }

    /// (timestamp, engine speed) series
    pub fn tachometer(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .map(|s| (s.timestamp, s.engine_speed_rpm))
            .collect()
    }

    /// (timestamp, torque) series
    pub fn torque_record(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .map(|s| (s.timestamp, s.torque_nm))
            .collect()
    }

    /// (timestamp, intensity) of every brake event applied in `Normal` mode
    pub fn braking_record(&self) -> &[(f64, f64)] {
        &self.braking
    }

    /// Every mode change so far, in order
    pub fn transitions(&self) -> &[ModeTransition] {
        &self.transitions
    }

    /// Consume one event
    ///
    /// Query events are outputs of the engine and are ignored here. Events must
    /// arrive in non-decreasing timestamp order.
    pub fn process(&mut self, event: &Event) -> Result<()> {
        if event.kind.is_query() {
            log::trace!("Ignoring query event '{}' at t={:.3}s", event.kind, event.timestamp);
            return Ok(());
        }

        self.check_contract(event)?;
        self.last_timestamp = Some(event.timestamp);

        for transition in self.monitor.observe(event) {
            self.transitions.push(transition);
        }

        match event.kind {
            EventKind::GasPedal => self.apply_gas(event.value),
            EventKind::BrakePedal => self.apply_brake(event.timestamp, event.value),
            EventKind::Idle => self.apply_idle(),
            _ => {}
        }

        self.samples.push(TelemetrySample {
            timestamp: event.timestamp,
            speed_kmph: self.state.speed_kmph,
            engine_speed_rpm: self.state.engine_speed_rpm,
            torque_nm: self.state.torque_nm,
            mode: self.monitor.mode(),
        });

        Ok(())
    }

    /// Consume an ordered stream and return the status events it provokes
    ///
    /// Speed, engine speed and torque queries are emitted whenever more than
    /// `query_interval` has passed since the last batch; a gear status broadcast
    /// is emitted whenever the gear index changes.
    pub fn drive(&mut self, events: &[Event]) -> Result<Vec<Event>> {
        let mut emitted = Vec::new();

        for event in events {
            if event.kind.is_query() {
                continue;
            }

            self.process(event)?;

            if event.timestamp - self.last_query_time > self.config.query_interval {
                self.last_query_time = event.timestamp;
                emitted.extend(self.status_events(event.timestamp));
            }

            let gear = gear_for_speed(self.state.speed_kmph);
            if self.last_gear != Some(gear) {
                self.last_gear = Some(gear);
                emitted.push(
                    Event::new(EventKind::GearStatus, event.timestamp, f64::from(gear))
                        .with_description("Gear status"),
                );
            }
        }

        log::info!(
            "Drove {} events: {} samples, {} status events, mode {}",
            events.len(),
            self.samples.len(),
            emitted.len(),
            self.mode()
        );

        Ok(emitted)
    }

    /// Query events carrying the current state
    fn status_events(&self, timestamp: f64) -> [Event; 3] {
        let (speed, engine_speed, torque) = self.query_vehicle_status();
        [
            Event::new(EventKind::QuerySpeed, timestamp, speed).with_description("Query speed"),
            Event::new(EventKind::QueryRpm, timestamp, engine_speed).with_description("Query RPM"),
            Event::new(EventKind::QueryTorque, timestamp, torque).with_description("Query torque"),
        ]
    }

    fn check_contract(&self, event: &Event) -> Result<()> {
        if event.kind == EventKind::Unknown {
            return Err(SimError::ContractViolation(format!(
                "'{}' event at t={} cannot be simulated",
                event.kind, event.timestamp
            )));
        }

        if !event.timestamp.is_finite() {
            return Err(SimError::ContractViolation(format!(
                "non-finite timestamp {}",
                event.timestamp
            )));
        }

        if let Some(last) = self.last_timestamp {
            if event.timestamp < last {
                return Err(SimError::ContractViolation(format!(
                    "timestamp {} precedes previous event at {}",
                    event.timestamp, last
                )));
            }
        }

        match event.kind {
            EventKind::BrakePedal if !(0.0..=1.0).contains(&event.value) => {
                Err(SimError::ContractViolation(format!(
                    "brake intensity {} outside [0, 1] at t={}",
                    event.value, event.timestamp
                )))
            }
            EventKind::GasPedal if !(0.0..=1.0).contains(&event.value) => {
                Err(SimError::ContractViolation(format!(
                    "gas pedal position {} outside [0, 1] at t={}",
                    event.value, event.timestamp
                )))
            }
            _ => Ok(()),
        }
    }

    fn apply_gas(&mut self, pedal: f64) {
        if self.monitor.mode() != OperatingMode::Normal
            || self.state.engine_speed_rpm >= self.config.max_engine_speed
        {
            self.apply_idle();
            return;
        }

        let power = pedal * self.config.gas_to_power_ratio;
        let torque = self.torque_at(power, self.state.engine_speed_rpm);
        let ratio = gear_ratio(self.state.speed_kmph);
        let accel = (torque * ratio * self.config.torque_to_accel_ratio).min(self.config.max_accel);

        self.state.power_kw = power;
        self.state.torque_nm = torque;
        self.state.speed_kmph += accel;
        self.state.engine_speed_rpm = self.engine_speed_for(self.state.speed_kmph, ratio);
    }

    fn apply_brake(&mut self, timestamp: f64, intensity: f64) {
        if self.monitor.mode() != OperatingMode::Normal {
            self.apply_idle();
            return;
        }

        let speed_loss =
            self.state.speed_kmph * intensity.exp() / E * self.config.brake_normalization;
        self.state.speed_kmph = (self.state.speed_kmph - speed_loss).max(0.0);

        // Torque follows the last commanded power, not the brake input
        let ratio = gear_ratio(self.state.speed_kmph);
        self.state.engine_speed_rpm = self.engine_speed_for(self.state.speed_kmph, ratio);
        self.state.torque_nm = self.torque_at(self.state.power_kw, self.state.engine_speed_rpm);

        self.braking.push((timestamp, intensity));
    }

    fn apply_idle(&mut self) {
        if self.monitor.mode() == OperatingMode::EngineShutdown {
            self.state.speed_kmph += self.config.shutdown_drag;
            if self.state.speed_kmph <= 0.0 {
                self.state = VehicleState::at_rest(0.0);
            }
            return;
        }

        let drift = self.config.idle_drift;
        if drift > 0.0 {
            let speed_drift: f64 = self.rng.gen_range(-drift / 4.0..drift);
            let power_drift: f64 = self.rng.gen_range(-drift / 4.0..drift);
            self.state.speed_kmph = (self.state.speed_kmph * (1.0 - speed_drift)).max(0.0);
            self.state.power_kw *= 1.0 - power_drift;
        }

        let ratio = gear_ratio(self.state.speed_kmph);
        self.state.engine_speed_rpm = self.engine_speed_for(self.state.speed_kmph, ratio);
        self.state.torque_nm = self.torque_at(self.state.power_kw, self.state.engine_speed_rpm);
    }

    fn engine_speed_for(&self, speed_kmph: f64, ratio: f64) -> f64 {
        (speed_kmph * ratio * self.config.speed_to_engine_ratio)
            .clamp(self.config.min_engine_speed, self.config.max_engine_speed)
    }

    fn torque_at(&self, power_kw: f64, engine_speed_rpm: f64) -> f64 {
        if engine_speed_rpm <= 0.0 {
            return 0.0;
        }
        (power_kw * POWER_TO_TORQUE / engine_speed_rpm).clamp(0.0, self.config.max_torque)
    }
}
