//! CAN Bus Simulator CLI Application
//!
//! This is the command-line interface for the CAN bus simulator.
//! It uses the can-bus-sim library and adds:
//! - Scenario files (driving profile, attacks, vehicle constants)
//! - Benign traffic and attack generation
//! - Console and JSON reports

use anyhow::{Context, Result};
use can_bus_sim::{
    sort_events, Event, FrameReader, FrameRecord, FrameWriter, SignalCodec, VehicleEngine,
};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

mod config;
mod generator;
mod report;

use generator::ScenarioGenerator;
use report::{DecodeReport, SimulationReport, VehicleSeries};

/// CAN Bus Simulator - Simulate a vehicle bus under attack
#[derive(Parser, Debug)]
#[command(name = "can-sim")]
#[command(about = "Simulate and decode CAN bus traffic with intrusion attacks", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and write the bus traffic to a record file
    Simulate {
        /// Scenario file (TOML)
        #[arg(short, long, value_name = "FILE")]
        scenario: PathBuf,

        /// Record file to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// JSON file for the telemetry report
        #[arg(short, long, value_name = "FILE")]
        telemetry: Option<PathBuf>,

        /// Override the scenario seed
        #[arg(long, value_name = "N")]
        seed: Option<u64>,
    },

    /// Read a record file and summarize its contents
    Decode {
        /// Record file to read
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// JSON file for the decode report
        #[arg(short, long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Maximum number of events to decode
        #[arg(long, value_name = "COUNT")]
        max_events: Option<usize>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("CAN Bus Simulator CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using simulation library v{}", can_bus_sim::VERSION);

    match &args.command {
        Command::Simulate {
            scenario,
            output,
            telemetry,
            seed,
        } => simulate(scenario, output, telemetry.as_deref(), *seed, args.quiet),
        Command::Decode {
            input,
            json,
            max_events,
        } => decode(input, json.as_deref(), *max_events, args.quiet),
    }
}

/// Generate, drive, frame and store one scenario
fn simulate(
    scenario: &Path,
    output: &Path,
    telemetry: Option<&Path>,
    seed: Option<u64>,
    quiet: bool,
) -> Result<()> {
    log::info!("Loading scenario from: {:?}", scenario);
    let config = config::load_config(scenario)?;
    let seed = seed.unwrap_or(config.simulation.seed);

    let mut generator = ScenarioGenerator::new(&config, seed);
    let events = generator.generate()?;

    let mut engine =
        VehicleEngine::new(generator.engine_config()).context("Invalid vehicle configuration")?;
    let status = engine.drive(&events).context("Simulation aborted")?;

    let mut stream: Vec<Event> = events.iter().chain(status.iter()).cloned().collect();
    sort_events(&mut stream);

    let codec = SignalCodec::standard()?;
    let records = frame_events(&codec, &stream)?;

    let mut writer = FrameWriter::create(output, codec)
        .with_context(|| format!("Failed to create record file: {:?}", output))?;
    for record in &records {
        writer.write_record(record)?;
    }
    writer
        .finish()
        .with_context(|| format!("Failed to flush record file: {:?}", output))?;

    let report = SimulationReport {
        generated_at: chrono::Utc::now(),
        scenario: scenario.display().to_string(),
        seed,
        duration_secs: config.simulation.duration_secs,
        input_events: events.len(),
        status_events: status.len(),
        records_written: records.len(),
        final_mode: engine.mode(),
        transitions: engine.transitions().to_vec(),
        event_counts: report::kind_counts(&stream),
        series: VehicleSeries::from_samples(engine.samples()),
        telemetry: engine.samples().to_vec(),
    };

    if let Some(path) = telemetry {
        report::write_json(path, &report)?;
    }
    if !quiet {
        report::print_simulation(&report);
    }

    Ok(())
}

/// Frame every event in parallel, keeping stream order
fn frame_events(codec: &SignalCodec, events: &[Event]) -> Result<Vec<FrameRecord>> {
    let framed = events
        .par_iter()
        .map(|event| {
            FrameRecord::from_event(codec, event).with_context(|| {
                format!("Failed to frame '{}' at t={:.3}s", event.kind, event.timestamp)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(framed.into_iter().flatten().collect())
}

/// Read a record file and report what is in it
fn decode(input: &Path, json: Option<&Path>, max_events: Option<usize>, quiet: bool) -> Result<()> {
    let codec = SignalCodec::standard()?;
    let mut reader = FrameReader::open(input, codec)
        .with_context(|| format!("Failed to open record file: {:?}", input))?;

    let limit = max_events.unwrap_or(usize::MAX);
    let mut events = Vec::new();
    for event in reader.by_ref().take(limit) {
        events.push(event.with_context(|| format!("Failed to read record file: {:?}", input))?);
    }

    let summary = reader.summary();
    if summary.malformed > 0 {
        log::warn!("{} malformed records skipped", summary.malformed);
    }

    let report = DecodeReport::new(input, &events, summary);
    if let Some(path) = json {
        report::write_json(path, &report)?;
    }
    if !quiet {
        report::print_decode(&report);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
