//! Scenario configuration loading and parsing

use anyhow::{bail, Context, Result};
use can_bus_sim::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Scenario file (loaded from scenario.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub vehicle: EngineConfig,
    #[serde(default)]
    pub driving: DrivingConfig,
    #[serde(default)]
    pub attacks: Vec<AttackConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Simulated time in seconds
    pub duration_secs: f64,
    #[serde(default)]
    pub seed: u64,
}

/// Benign driver behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DrivingConfig {
    /// Periods with the gas pedal pressed
    #[serde(default)]
    pub accelerate: Vec<Interval>,
    /// Periods with the brake pedal pressed
    #[serde(default)]
    pub brake: Vec<Interval>,
    /// Extra braking bursts at exponentially distributed gaps
    pub random_braking: Option<RandomBrakingConfig>,
    #[serde(default = "default_gas_ratio")]
    pub gas_ratio: f64,
    #[serde(default = "default_steering_ratio")]
    pub steering_ratio: f64,
}

impl Default for DrivingConfig {
    fn default() -> Self {
        Self {
            accelerate: Vec::new(),
            brake: Vec::new(),
            random_braking: None,
            gas_ratio: default_gas_ratio(),
            steering_ratio: default_steering_ratio(),
        }
    }
}

fn default_gas_ratio() -> f64 {
    0.2
}

fn default_steering_ratio() -> f64 {
    0.05
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RandomBrakingConfig {
    /// Mean time between the end of one burst and the start of the next
    pub mean_gap_secs: f64,
    /// Length of each burst
    pub burst_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    /// Diagnostic flood on the highest-priority channel
    Dos,
    /// Repeated fuel-kill engage commands
    FuelKill,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttackConfig {
    pub kind: AttackKind,
    /// Earliest start time
    pub start: f64,
    pub duration: f64,
    /// Share of bus capacity used by the attack
    pub intensity: f64,
    pub trigger: Option<TriggerConfig>,
}

/// Vehicle condition an attack waits for
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct TriggerConfig {
    pub min_speed_kmph: Option<f64>,
    pub gear: Option<u8>,
}

impl TriggerConfig {
    pub fn holds(&self, speed_kmph: f64, gear: u8) -> bool {
        self.min_speed_kmph.map_or(true, |min| speed_kmph >= min)
            && self.gear.map_or(true, |g| gear >= g)
    }
}

impl AppConfig {
    /// Check the scenario is internally consistent
    pub fn validate(&self) -> Result<()> {
        let duration = self.simulation.duration_secs;
        if !(duration.is_finite() && duration > 0.0) {
            bail!("simulation.duration_secs must be positive, got {}", duration);
        }

        self.vehicle
            .validate()
            .context("Invalid [vehicle] section")?;

        for interval in self.driving.accelerate.iter().chain(&self.driving.brake) {
            if !(interval.start >= 0.0 && interval.end > interval.start) {
                bail!(
                    "driving interval [{}, {}) is empty or negative",
                    interval.start,
                    interval.end
                );
            }
        }

        for (name, ratio) in [
            ("gas_ratio", self.driving.gas_ratio),
            ("steering_ratio", self.driving.steering_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                bail!("driving.{} must be in [0, 1], got {}", name, ratio);
            }
        }

        if let Some(random) = self.driving.random_braking {
            if !(random.mean_gap_secs > 0.0 && random.burst_secs > 0.0) {
                bail!("driving.random_braking gaps and bursts must be positive");
            }
        }

        for (i, attack) in self.attacks.iter().enumerate() {
            if !(attack.start >= 0.0 && attack.duration > 0.0) {
                bail!("attack #{} has an empty or negative time span", i + 1);
            }
            if !(attack.intensity > 0.0 && attack.intensity <= 1.0) {
                bail!(
                    "attack #{} intensity must be in (0, 1], got {}",
                    i + 1,
                    attack.intensity
                );
            }
        }

        Ok(())
    }
}

/// Load a scenario from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse scenario file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid scenario file: {:?}", path))?;

    Ok(config)
}
