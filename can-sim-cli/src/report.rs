//! Run reports
//!
//! Console summaries for `simulate` and `decode`, plus JSON export of the same
//! data (and the full telemetry series for simulations).

use anyhow::{Context, Result};
use can_bus_sim::{Event, EventKind, ModeTransition, OperatingMode, ReadSummary, TelemetrySample};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Min / max / mean of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SeriesSummary {
    /// `None` for an empty series
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut count = 0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for v in values {
            count += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }

        (count > 0).then(|| Self {
            count,
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

/// Speed, engine speed and torque series
#[derive(Debug, Clone, Serialize)]
pub struct VehicleSeries {
    pub speed_kmph: Option<SeriesSummary>,
    pub engine_speed_rpm: Option<SeriesSummary>,
    pub torque_nm: Option<SeriesSummary>,
}

impl VehicleSeries {
    pub fn from_samples(samples: &[TelemetrySample]) -> Self {
        Self {
            speed_kmph: SeriesSummary::from_values(samples.iter().map(|s| s.speed_kmph)),
            engine_speed_rpm: SeriesSummary::from_values(samples.iter().map(|s| s.engine_speed_rpm)),
            torque_nm: SeriesSummary::from_values(samples.iter().map(|s| s.torque_nm)),
        }
    }

    /// From the status broadcasts found in a decoded stream
    pub fn from_status_events(events: &[Event]) -> Self {
        let series = |kind: EventKind| {
            SeriesSummary::from_values(events.iter().filter(|e| e.kind == kind).map(|e| e.value))
        };
        Self {
            speed_kmph: series(EventKind::QuerySpeed),
            engine_speed_rpm: series(EventKind::QueryRpm),
            torque_nm: series(EventKind::QueryTorque),
        }
    }
}

/// Events per kind, keyed by kind name
pub fn kind_counts(events: &[Event]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.kind.name()).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub generated_at: DateTime<Utc>,
    pub scenario: String,
    pub seed: u64,
    pub duration_secs: f64,
    pub input_events: usize,
    pub status_events: usize,
    pub records_written: usize,
    pub final_mode: OperatingMode,
    pub transitions: Vec<ModeTransition>,
    pub event_counts: BTreeMap<&'static str, usize>,
    pub series: VehicleSeries,
    pub telemetry: Vec<TelemetrySample>,
}

#[derive(Debug, Serialize)]
pub struct DecodeReport {
    pub generated_at: DateTime<Utc>,
    pub input: String,
    pub summary: ReadSummary,
    pub event_counts: BTreeMap<&'static str, usize>,
    pub series: VehicleSeries,
}

impl DecodeReport {
    pub fn new(input: &Path, events: &[Event], summary: ReadSummary) -> Self {
        Self {
            generated_at: Utc::now(),
            input: input.display().to_string(),
            summary,
            event_counts: kind_counts(events),
            series: VehicleSeries::from_status_events(events),
        }
    }
}

/// Write any report as pretty-printed JSON
pub fn write_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create report file: {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write report: {:?}", path))?;
    log::info!("Report written to {:?}", path);
    Ok(())
}

fn print_counts(counts: &BTreeMap<&'static str, usize>) {
    for (kind, count) in counts {
        println!("  {:<16} {:>8}", kind, count);
    }
}

fn print_series(series: &VehicleSeries) {
    let rows = [
        ("Speed (km/h)", series.speed_kmph),
        ("Engine (RPM)", series.engine_speed_rpm),
        ("Torque (N·m)", series.torque_nm),
    ];
    for (name, summary) in rows {
        match summary {
            Some(s) => println!(
                "  {:<14} min {:>9.2}  max {:>9.2}  mean {:>9.2}  ({} samples)",
                name, s.min, s.max, s.mean, s.count
            ),
            None => println!("  {:<14} no samples", name),
        }
    }
}

pub fn print_simulation(report: &SimulationReport) {
    println!("═══════════════════════════════════════════════");
    println!("  CAN Bus Simulation");
    println!("═══════════════════════════════════════════════\n");

    println!("Scenario: {} (seed {})", report.scenario, report.seed);
    println!("Duration: {:.3} s", report.duration_secs);
    println!(
        "Events:   {} input, {} status, {} records written",
        report.input_events, report.status_events, report.records_written
    );

    println!("\nEvent counts:");
    print_counts(&report.event_counts);

    println!("\nVehicle:");
    print_series(&report.series);

    println!("\nMode transitions:");
    if report.transitions.is_empty() {
        println!("  none");
    }
    for t in &report.transitions {
        println!("  t={:>9.3}s  {} → {}", t.timestamp, t.from, t.to);
    }
    println!("\nFinal mode: {}", report.final_mode);
}

pub fn print_decode(report: &DecodeReport) {
    println!("═══════════════════════════════════════════════");
    println!("  CAN Record Decoder");
    println!("═══════════════════════════════════════════════\n");

    println!("Input: {}", report.input);
    println!(
        "Records: {} read, {} events, {} malformed, {} unknown channel",
        report.summary.records,
        report.summary.events,
        report.summary.malformed,
        report.summary.unknown_channel
    );

    println!("\nEvent counts:");
    print_counts(&report.event_counts);

    println!("\nStatus broadcasts:");
    print_series(&report.series);
}
