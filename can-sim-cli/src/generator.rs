//! Scenario event generation
//!
//! Builds the input stream for one simulation run from a scenario file:
//!
//! - **Benign traffic**: gas pedal, steering and braking events at distinct
//!   random millisecond slots, sized from the nominal bus load
//! - **Idle ticks**: every millisecond no benign event occupies
//! - **Attacks**: diagnostic floods and fuel-kill commands, optionally
//!   delayed until the vehicle reaches a trigger condition
//!
//! All randomness comes from one seeded generator, so a scenario and a seed
//! always produce the same stream.

use crate::config::{AppConfig, AttackConfig, AttackKind, Interval};
use anyhow::{Context, Result};
use can_bus_sim::config::{BRAKE_LOAD_RATIO, BUS_LOAD, CAN_DATA_RATE, CAN_FRAME_LEN};
use can_bus_sim::{gear_for_speed, sort_events, EngineConfig, Event, EventKind, VehicleEngine};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use std::collections::HashSet;

/// Steering wheel deflection range in degrees
const STEERING_RANGE: f64 = 45.0;

/// Timestamps for `ratio` of the bus load over `duration` seconds from `start`
///
/// Events land on distinct millisecond slots, so the count is capped at the
/// number of slots in the interval.
pub fn event_timing<R: Rng>(rng: &mut R, start: f64, duration: f64, ratio: f64) -> Vec<f64> {
    let wanted = (CAN_DATA_RATE / CAN_FRAME_LEN * duration * BUS_LOAD * ratio) as usize;
    let slots = (duration * 1000.0).round() as usize;
    let count = wanted.min(slots);

    if count < wanted {
        log::debug!(
            "Capping {} events to {} millisecond slots from t={:.3}s",
            wanted,
            slots,
            start
        );
    }

    let mut offsets = index::sample(rng, slots, count).into_vec();
    offsets.sort_unstable();
    offsets
        .into_iter()
        .map(|ms| start + ms as f64 / 1000.0)
        .collect()
}

/// Event stream generator for one scenario
pub struct ScenarioGenerator<'a> {
    config: &'a AppConfig,
    seed: u64,
    rng: ChaCha8Rng,
}

impl<'a> ScenarioGenerator<'a> {
    pub fn new(config: &'a AppConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Vehicle constants for driving the generated stream
    ///
    /// The idle noise is seeded from the run seed, so trigger dry runs and the
    /// real run see the same vehicle.
    pub fn engine_config(&self) -> EngineConfig {
        self.config.vehicle.clone().with_noise_seed(self.seed)
    }

    /// Build the full, time-ordered input stream
    pub fn generate(&mut self) -> Result<Vec<Event>> {
        let config = self.config;
        let benign = self.benign_events();
        let mut events = benign.clone();

        for (i, attack) in config.attacks.iter().enumerate() {
            let Some(start) = self.attack_start(attack, &events)? else {
                log::warn!(
                    "Attack #{} ({:?}) never triggered, skipping",
                    i + 1,
                    attack.kind
                );
                continue;
            };
            let injected = self.attack_events(attack, start);
            log::info!(
                "Attack #{} ({:?}): {} events from t={:.3}s",
                i + 1,
                attack.kind,
                injected.len(),
                start
            );
            events.extend(injected);
            sort_events(&mut events);
        }

        log::info!(
            "Generated {} events ({} benign incl. idle, {} attack)",
            events.len(),
            benign.len(),
            events.len() - benign.len()
        );
        Ok(events)
    }

    /// Driver inputs plus idle ticks, sorted
    fn benign_events(&mut self) -> Vec<Event> {
        let config = self.config;
        let duration = config.simulation.duration_secs;
        let driving = &config.driving;
        let mut events = Vec::new();

        for t in event_timing(&mut self.rng, 0.0, duration, driving.gas_ratio) {
            let pedal = if driving.accelerate.iter().any(|i| i.contains(t)) {
                self.rng.gen_range(0.5..1.0)
            } else {
                0.0
            };
            events.push(Event::new(EventKind::GasPedal, t, pedal).with_description("Gas pedal"));
        }

        for t in event_timing(&mut self.rng, 0.0, duration, driving.steering_ratio) {
            let angle = self.rng.gen_range(-STEERING_RANGE..STEERING_RANGE);
            events.push(
                Event::new(EventKind::SteeringAngle, t, angle).with_description("Steering angle"),
            );
        }

        for interval in self.braking_intervals() {
            let end = interval.end.min(duration);
            if end <= interval.start {
                continue;
            }
            for t in event_timing(&mut self.rng, interval.start, end - interval.start, BRAKE_LOAD_RATIO) {
                let intensity = self.rng.gen_range(0.2..=1.0);
                events.push(
                    Event::new(EventKind::BrakePedal, t, intensity).with_description("Brake pedal"),
                );
            }
        }

        let occupied: HashSet<u64> = events
            .iter()
            .map(|e| (e.timestamp * 1000.0).round() as u64)
            .collect();
        let slots = (duration * 1000.0).round() as u64;
        for ms in (0..slots).filter(|ms| !occupied.contains(ms)) {
            events.push(Event::new(EventKind::Idle, ms as f64 / 1000.0, 0.0));
        }

        sort_events(&mut events);
        events
    }

    /// Configured braking periods plus randomly placed bursts
    fn braking_intervals(&mut self) -> Vec<Interval> {
        let mut intervals = self.config.driving.brake.clone();

        if let Some(random) = self.config.driving.random_braking {
            let gaps = match Exp::new(1.0 / random.mean_gap_secs) {
                Ok(gaps) => gaps,
                Err(e) => {
                    log::warn!("Random braking disabled: {}", e);
                    return intervals;
                }
            };
            let mut t = gaps.sample(&mut self.rng);
            while t < self.config.simulation.duration_secs {
                intervals.push(Interval {
                    start: t,
                    end: t + random.burst_secs,
                });
                t += random.burst_secs + gaps.sample(&mut self.rng);
            }
        }

        intervals
    }

    /// When the attack begins, or `None` if its trigger never holds
    ///
    /// `stream` is the sorted stream built so far, earlier attacks included.
    fn attack_start(&self, attack: &AttackConfig, stream: &[Event]) -> Result<Option<f64>> {
        let Some(trigger) = attack.trigger else {
            return Ok(Some(attack.start));
        };

        let mut engine =
            VehicleEngine::new(self.engine_config()).context("Failed to set up trigger dry run")?;
        for event in stream {
            engine
                .process(event)
                .with_context(|| format!("Trigger dry run failed at t={:.3}s", event.timestamp))?;
            if event.timestamp < attack.start {
                continue;
            }
            let speed = engine.state().speed_kmph;
            if trigger.holds(speed, gear_for_speed(speed)) {
                log::debug!(
                    "Trigger holds at t={:.3}s ({:.1} km/h)",
                    event.timestamp,
                    speed
                );
                return Ok(Some(event.timestamp));
            }
        }

        Ok(None)
    }

    fn attack_events(&mut self, attack: &AttackConfig, start: f64) -> Vec<Event> {
        let remaining = self.config.simulation.duration_secs - start;
        let duration = attack.duration.min(remaining);
        if duration <= 0.0 {
            return Vec::new();
        }

        let (kind, value, description) = match attack.kind {
            AttackKind::Dos => (EventKind::BusDiagnostic, 0.0, "Diagnostic flood"),
            AttackKind::FuelKill => (EventKind::FuelKill, 1.0, "Fuel kill"),
        };

        event_timing(&mut self.rng, start, duration, attack.intensity)
            .into_iter()
            .map(|t| Event::new(kind, t, value).with_description(description))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DrivingConfig, SimulationConfig, TriggerConfig};
    use can_bus_sim::EngineConfig;

    fn scenario(duration_secs: f64) -> AppConfig {
        AppConfig {
            simulation: SimulationConfig {
                duration_secs,
                seed: 1,
            },
            vehicle: EngineConfig::default(),
            driving: DrivingConfig {
                accelerate: vec![Interval {
                    start: 0.0,
                    end: duration_secs,
                }],
                ..DrivingConfig::default()
            },
            attacks: Vec::new(),
        }
    }

    fn count(events: &[Event], kind: EventKind) -> usize {
        events.iter().filter(|e| e.kind == kind).count()
    }

    #[test]
    fn test_event_timing_count_and_slots() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let times = event_timing(&mut rng, 2.0, 1.0, 0.2);

        // 1e6 / 128 * 1.0 * 0.3 * 0.2 = 468.75
        assert_eq!(times.len(), 468);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert!(times.iter().all(|&t| (2.0..3.0).contains(&t)));
    }

    #[test]
    fn test_event_timing_capped_by_slots() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let times = event_timing(&mut rng, 0.0, 0.5, 1.0);
        assert_eq!(times.len(), 500);
    }

    #[test]
    fn test_benign_stream_fills_every_millisecond() {
        let config = scenario(1.0);
        let events = ScenarioGenerator::new(&config, 1).generate().unwrap();

        let slots: HashSet<u64> = events
            .iter()
            .map(|e| (e.timestamp * 1000.0).round() as u64)
            .collect();
        assert_eq!(slots.len(), 1000);
        assert_eq!(count(&events, EventKind::GasPedal), 468);
        assert!(events
            .iter()
            .filter(|e| e.kind == EventKind::GasPedal)
            .all(|e| (0.5..1.0).contains(&e.value)));
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_same_seed_same_stream() {
        let config = scenario(0.5);
        let a = ScenarioGenerator::new(&config, 9).generate().unwrap();
        let b = ScenarioGenerator::new(&config, 9).generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dos_attack_injected() {
        let mut config = scenario(2.0);
        config.attacks.push(AttackConfig {
            kind: AttackKind::Dos,
            start: 0.5,
            duration: 1.0,
            intensity: 0.5,
            trigger: None,
        });

        let events = ScenarioGenerator::new(&config, 2).generate().unwrap();
        // 1e6 / 128 * 1.0 * 0.3 * 0.5 = 1171.875, capped at 1000 slots
        assert_eq!(count(&events, EventKind::BusDiagnostic), 1000);
        assert!(events
            .iter()
            .filter(|e| e.kind == EventKind::BusDiagnostic)
            .all(|e| (0.5..1.5).contains(&e.timestamp)));
    }

    #[test]
    fn test_unreachable_trigger_skips_attack() {
        let mut config = scenario(0.5);
        config.attacks.push(AttackConfig {
            kind: AttackKind::FuelKill,
            start: 0.0,
            duration: 0.2,
            intensity: 0.1,
            trigger: Some(TriggerConfig {
                min_speed_kmph: Some(200.0),
                gear: None,
            }),
        });

        let events = ScenarioGenerator::new(&config, 4).generate().unwrap();
        assert_eq!(count(&events, EventKind::FuelKill), 0);
    }

    #[test]
    fn test_trigger_sees_earlier_attacks() {
        let mut config = scenario(4.0);
        // Flood from the start freezes the gas pedal until recovery at t=3
        config.attacks.push(AttackConfig {
            kind: AttackKind::Dos,
            start: 0.0,
            duration: 2.0,
            intensity: 1.0,
            trigger: None,
        });
        let trigger = TriggerConfig {
            min_speed_kmph: Some(10.0),
            gear: None,
        };
        config.attacks.push(AttackConfig {
            kind: AttackKind::FuelKill,
            start: 0.0,
            duration: 0.2,
            intensity: 1.0,
            trigger: Some(trigger),
        });

        let mut generator = ScenarioGenerator::new(&config, 8);
        let events = generator.generate().unwrap();
        let mut engine = VehicleEngine::new(generator.engine_config()).unwrap();

        let mut first_hold = None;
        let mut first_attack = None;
        for event in &events {
            if event.kind == EventKind::FuelKill {
                first_attack = Some(event.timestamp);
                break;
            }
            engine.process(event).unwrap();
            let speed = engine.state().speed_kmph;
            if first_hold.is_none() && trigger.holds(speed, gear_for_speed(speed)) {
                first_hold = Some(event.timestamp);
            }
        }

        let first_hold = first_hold.unwrap();
        assert!(first_hold >= 3.0, "trigger held at t={first_hold}");
        assert_eq!(first_attack, Some(first_hold));
    }

    #[test]
    fn test_engine_config_uses_run_seed() {
        let config = scenario(1.0);
        let generator = ScenarioGenerator::new(&config, 77);
        assert_eq!(generator.engine_config().noise_seed, 77);
        assert_eq!(
            generator.engine_config().max_torque,
            config.vehicle.max_torque
        );
    }

    #[test]
    fn test_trigger_delays_attack() {
        let mut config = scenario(3.0);
        config.attacks.push(AttackConfig {
            kind: AttackKind::FuelKill,
            start: 0.0,
            duration: 0.5,
            intensity: 0.1,
            trigger: Some(TriggerConfig {
                min_speed_kmph: Some(5.0),
                gear: None,
            }),
        });

        let events = ScenarioGenerator::new(&config, 5).generate().unwrap();
        let first = events
            .iter()
            .find(|e| e.kind == EventKind::FuelKill)
            .map(|e| e.timestamp)
            .unwrap();
        assert!(first > 0.0);
    }
}
