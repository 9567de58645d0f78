//! Demo driver for the accelerometer + magnetometer synchronizer.
//!
//! Generates synthetic primary and secondary streams in memory, feeds them
//! through [`sensor_syncer::syncer::accel_mag`] and prints every emitted
//! synced measurement plus a final summary. No real sensor or LSL hookup —
//! this only exercises the in-process matching and interpolation.
//!
//! ```bash
//! sensorsync-demo-2stream --count 200 --seed 7
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use sensor_syncer::adapter::{PrimaryAdapter, SecondaryAdapter};
use sensor_syncer::interpolator::LinearInterpolator;
use sensor_syncer::measurement::{Accuracy, AccelerometerMeasurement, MagnetometerMeasurement};
use sensor_syncer::syncer::accel_mag::Builder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sensorsync-demo-2stream",
    about = "Synthetic accelerometer+magnetometer synchronization demo"
)]
struct Args {
    /// Number of primary (accelerometer) samples to generate.
    #[arg(long, default_value_t = 200)]
    count: usize,

    /// Primary sample period, in milliseconds.
    #[arg(long, default_value_t = 10)]
    primary_period_ms: u64,

    /// Secondary sample period, in milliseconds.
    #[arg(long, default_value_t = 30)]
    secondary_period_ms: u64,

    /// Ring buffer capacity per stream.
    #[arg(long, default_value_t = 64)]
    capacity: usize,

    /// Random seed for synthetic payload jitter.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Suppress the per-sample println output, print only the summary.
    #[arg(long)]
    quiet: bool,

    /// Load count/periods/capacity/seed from a JSON scenario file instead of
    /// the flags above.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Write the resolved scenario out as JSON for reuse with `--scenario`.
    #[arg(long)]
    dump_scenario: Option<PathBuf>,
}

/// On-disk description of a synthetic run, so a scenario can be replayed
/// exactly. Mirrors the toolbox crate's `to_recorder_config_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scenario {
    count: usize,
    primary_period_ms: u64,
    secondary_period_ms: u64,
    capacity: usize,
    seed: u64,
}

impl From<&Args> for Scenario {
    fn from(args: &Args) -> Self {
        Self {
            count: args.count,
            primary_period_ms: args.primary_period_ms,
            secondary_period_ms: args.secondary_period_ms,
            capacity: args.capacity,
            seed: args.seed,
        }
    }
}

impl Scenario {
    fn load(path: &PathBuf) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing scenario file {}", path.display()))
    }

    fn dump(&self, path: &PathBuf) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("writing scenario file {}", path.display()))
    }

    fn apply(self, args: &mut Args) {
        args.count = self.count;
        args.primary_period_ms = self.primary_period_ms;
        args.secondary_period_ms = self.secondary_period_ms;
        args.capacity = self.capacity;
        args.seed = self.seed;
    }
}

struct VecPrimaryAdapter {
    pending: Vec<AccelerometerMeasurement>,
}

impl PrimaryAdapter<AccelerometerMeasurement> for VecPrimaryAdapter {
    fn start(&mut self, _start_timestamp: i64) -> bool {
        true
    }

    fn stop(&mut self) {}

    fn drain_up_to_position(&mut self, position: usize) -> Vec<AccelerometerMeasurement> {
        let take = position.min(self.pending.len());
        self.pending.drain(..take).collect()
    }
}

struct VecSecondaryAdapter {
    pending: Vec<MagnetometerMeasurement>,
}

impl SecondaryAdapter<MagnetometerMeasurement> for VecSecondaryAdapter {
    fn start(&mut self, _start_timestamp: i64) -> bool {
        true
    }

    fn stop(&mut self) {}

    fn drain_before(&mut self, timestamp: i64) -> Vec<MagnetometerMeasurement> {
        let mut drained = Vec::new();
        self.pending.retain(|m| {
            if m.timestamp <= timestamp {
                drained.push(m.clone());
                false
            } else {
                true
            }
        });
        drained
    }
}

fn generate_accelerometer(count: usize, period_ms: u64, rng: &mut fastrand::Rng) -> Vec<AccelerometerMeasurement> {
    (0..count)
        .map(|i| {
            let ts = i as i64 * period_ms as i64 * 1_000_000;
            let jitter = || rng.f32() * 0.1 - 0.05;
            AccelerometerMeasurement::new(jitter(), jitter(), 9.81 + jitter(), ts, Accuracy::High)
        })
        .collect()
}

fn generate_magnetometer(count: usize, period_ms: u64, rng: &mut fastrand::Rng) -> Vec<MagnetometerMeasurement> {
    (0..count)
        .map(|i| {
            let ts = i as i64 * period_ms as i64 * 1_000_000;
            let jitter = || rng.f32() * 2.0 - 1.0;
            MagnetometerMeasurement::new(20.0 + jitter(), jitter(), jitter(), ts, Accuracy::Medium)
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();
    tracing_subscriber::fmt::init();

    if let Some(path) = args.scenario.clone() {
        Scenario::load(&path)?.apply(&mut args);
    }
    if let Some(path) = args.dump_scenario.clone() {
        Scenario::from(&args).dump(&path)?;
    }

    let mut rng = fastrand::Rng::with_seed(args.seed);
    let primary_samples = generate_accelerometer(args.count, args.primary_period_ms, &mut rng);
    let duration_ns = args.count as i64 * args.primary_period_ms as i64 * 1_000_000;
    let secondary_count = (duration_ns / (args.secondary_period_ms as i64 * 1_000_000)) as usize + 1;
    let secondary_samples = generate_magnetometer(secondary_count, args.secondary_period_ms, &mut rng);

    let total_primary = primary_samples.len();
    let quiet = args.quiet;

    let mut syncer = Builder::new(Box::new(VecPrimaryAdapter {
        pending: primary_samples,
    }))
    .primary_capacity(args.capacity)
    .magnetometer(
        args.capacity,
        Box::new(LinearInterpolator),
        Box::new(VecSecondaryAdapter {
            pending: secondary_samples,
        }),
    )
    .on_synced_measurement(move |tuple| {
        if !quiet {
            println!(
                "t={:>12} accel=({:.3},{:.3},{:.3}) mag=({:.3},{:.3},{:.3})",
                tuple.timestamp,
                tuple.accelerometer.ax,
                tuple.accelerometer.ay,
                tuple.accelerometer.az,
                tuple.magnetometer.mx,
                tuple.magnetometer.my,
                tuple.magnetometer.mz,
            );
        }
    })
    .build()?;

    syncer.start(Some(0))?;
    for position in 1..=total_primary {
        syncer.handle_primary_measurement(position);
        syncer.handle_secondary_measurement(sensor_syncer::syncer::accel_mag::StreamId::Magnetometer);
    }

    println!(
        "processed={} accelerometer_usage={:.2} magnetometer_usage={:.2}",
        syncer.number_of_processed_measurements(),
        syncer.primary_usage(),
        syncer.magnetometer().usage(),
    );
    syncer.stop();
    Ok(())
}
