//! Demo driver for the accelerometer + gravity + gyroscope synchronizer.
//!
//! Same synthetic-stream approach as `sensorsync-demo-2stream`, extended to
//! three participating streams so every primary emission has to wait on two
//! independently-paced secondaries.
//!
//! ```bash
//! sensorsync-demo-3stream --count 200 --seed 11
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use sensor_syncer::adapter::{PrimaryAdapter, SecondaryAdapter};
use sensor_syncer::interpolator::QuadraticInterpolator;
use sensor_syncer::measurement::{
    Accuracy, AccelerometerMeasurement, GravityMeasurement, GyroscopeMeasurement,
};
use sensor_syncer::syncer::accel_gravity_gyro::{Builder, StreamId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sensorsync-demo-3stream",
    about = "Synthetic accelerometer+gravity+gyroscope synchronization demo"
)]
struct Args {
    #[arg(long, default_value_t = 200)]
    count: usize,

    #[arg(long, default_value_t = 10)]
    primary_period_ms: u64,

    #[arg(long, default_value_t = 20)]
    gravity_period_ms: u64,

    #[arg(long, default_value_t = 25)]
    gyroscope_period_ms: u64,

    #[arg(long, default_value_t = 64)]
    capacity: usize,

    #[arg(long, default_value_t = 11)]
    seed: u64,

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
    gravity_period_ms: u64,
    gyroscope_period_ms: u64,
    capacity: usize,
    seed: u64,
}

impl From<&Args> for Scenario {
    fn from(args: &Args) -> Self {
        Self {
            count: args.count,
            primary_period_ms: args.primary_period_ms,
            gravity_period_ms: args.gravity_period_ms,
            gyroscope_period_ms: args.gyroscope_period_ms,
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
        args.gravity_period_ms = self.gravity_period_ms;
        args.gyroscope_period_ms = self.gyroscope_period_ms;
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

struct VecSecondaryAdapter<M> {
    pending: Vec<M>,
}

impl SecondaryAdapter<GravityMeasurement> for VecSecondaryAdapter<GravityMeasurement> {
    fn start(&mut self, _start_timestamp: i64) -> bool {
        true
    }

    fn stop(&mut self) {}

    fn drain_before(&mut self, timestamp: i64) -> Vec<GravityMeasurement> {
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

impl SecondaryAdapter<GyroscopeMeasurement> for VecSecondaryAdapter<GyroscopeMeasurement> {
    fn start(&mut self, _start_timestamp: i64) -> bool {
        true
    }

    fn stop(&mut self) {}

    fn drain_before(&mut self, timestamp: i64) -> Vec<GyroscopeMeasurement> {
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

fn generate_gravity(count: usize, period_ms: u64, rng: &mut fastrand::Rng) -> Vec<GravityMeasurement> {
    (0..count)
        .map(|i| {
            let ts = i as i64 * period_ms as i64 * 1_000_000;
            let jitter = || rng.f32() * 0.02 - 0.01;
            GravityMeasurement::new(jitter(), jitter(), 9.81 + jitter(), ts, Accuracy::High)
        })
        .collect()
}

fn generate_gyroscope(count: usize, period_ms: u64, rng: &mut fastrand::Rng) -> Vec<GyroscopeMeasurement> {
    (0..count)
        .map(|i| {
            let ts = i as i64 * period_ms as i64 * 1_000_000;
            let jitter = || rng.f32() * 0.05 - 0.025;
            GyroscopeMeasurement::new(jitter(), jitter(), jitter(), ts, Accuracy::Medium)
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
    let gravity_count = (duration_ns / (args.gravity_period_ms as i64 * 1_000_000)) as usize + 1;
    let gyroscope_count = (duration_ns / (args.gyroscope_period_ms as i64 * 1_000_000)) as usize + 1;
    let gravity_samples = generate_gravity(gravity_count, args.gravity_period_ms, &mut rng);
    let gyroscope_samples = generate_gyroscope(gyroscope_count, args.gyroscope_period_ms, &mut rng);

    let total_primary = primary_samples.len();
    let quiet = args.quiet;

    let mut syncer = Builder::new(Box::new(VecPrimaryAdapter {
        pending: primary_samples,
    }))
    .primary_capacity(args.capacity)
    .gravity(
        args.capacity,
        Box::new(QuadraticInterpolator),
        Box::new(VecSecondaryAdapter {
            pending: gravity_samples,
        }),
    )
    .gyroscope(
        args.capacity,
        Box::new(QuadraticInterpolator),
        Box::new(VecSecondaryAdapter {
            pending: gyroscope_samples,
        }),
    )
    .on_synced_measurement(move |tuple| {
        if !quiet {
            println!(
                "t={:>12} accel=({:.3},{:.3},{:.3}) gravity=({:.3},{:.3},{:.3}) gyro=({:.3},{:.3},{:.3})",
                tuple.timestamp,
                tuple.accelerometer.ax,
                tuple.accelerometer.ay,
                tuple.accelerometer.az,
                tuple.gravity.gx,
                tuple.gravity.gy,
                tuple.gravity.gz,
                tuple.gyroscope.wx,
                tuple.gyroscope.wy,
                tuple.gyroscope.wz,
            );
        }
    })
    .build()?;

    syncer.start(Some(0))?;
    for position in 1..=total_primary {
        syncer.handle_primary_measurement(position);
        syncer.handle_secondary_measurement(StreamId::Gravity);
        syncer.handle_secondary_measurement(StreamId::Gyroscope);
    }

    println!(
        "processed={} accelerometer_usage={:.2} gravity_usage={:.2} gyroscope_usage={:.2}",
        syncer.number_of_processed_measurements(),
        syncer.primary_usage(),
        syncer.gravity().usage(),
        syncer.gyroscope().usage(),
    );
    syncer.stop();
    Ok(())
}
