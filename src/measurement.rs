//! Per-stream measurement records and the synced tuples the syncer emits.
//!
//! Measurements are plain, value-copyable data: the core never holds a
//! reference into adapter-owned memory, only owned copies (see `spec.md` §3).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence the underlying sensor reports for a measurement. `Unavailable`
/// covers adapters that never report accuracy at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accuracy {
    Unreliable,
    Low,
    Medium,
    High,
    Unavailable,
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Accuracy::Unreliable => "unreliable",
            Accuracy::Low => "low",
            Accuracy::Medium => "medium",
            Accuracy::High => "high",
            Accuracy::Unavailable => "unavailable",
        };
        f.write_str(label)
    }
}

/// Identifies which physical sensor produced a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorType {
    Accelerometer,
    Gravity,
    Gyroscope,
    Magnetometer,
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SensorType::Accelerometer => "accelerometer",
            SensorType::Gravity => "gravity",
            SensorType::Gyroscope => "gyroscope",
            SensorType::Magnetometer => "magnetometer",
        };
        f.write_str(label)
    }
}

/// Common contract every per-stream measurement satisfies: a monotonic
/// (within a stream) nanosecond timestamp, an optional reported accuracy and
/// a sensor tag. `with_timestamp` is used by the interpolators and by the
/// direct-carry fallback to rewrite the aligned timestamp without touching
/// any other field.
pub trait Measurement: Clone {
    fn timestamp(&self) -> i64;
    fn with_timestamp(&self, timestamp: i64) -> Self;
    fn accuracy(&self) -> Accuracy;
    fn sensor_type(&self) -> SensorType;
}

/// Component-wise numeric blending used by the linear and quadratic
/// interpolators. Only the payload fields participate; `accuracy` and
/// `sensor_type` are always taken from the most recent sample (`current`),
/// per `spec.md` §4.2.
pub trait Blend: Measurement {
    fn lerp(previous: &Self, current: &Self, lambda: f64) -> Self;
    fn quadratic(p0: &Self, p1: &Self, p2: &Self, t0: i64, t1: i64, t2: i64, target: f64) -> Self;
}

fn lerp_f32(a: f32, b: f32, lambda: f64) -> f32 {
    (a as f64 + (b as f64 - a as f64) * lambda) as f32
}

fn lerp_option_f32(a: Option<f32>, b: Option<f32>, lambda: f64) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(lerp_f32(a, b, lambda)),
        _ => None,
    }
}

fn quadratic_basis(t0: i64, t1: i64, t2: i64, target: f64) -> (f64, f64, f64) {
    let (t0, t1, t2) = (t0 as f64, t1 as f64, t2 as f64);
    let l0 = (target - t1) * (target - t2) / ((t0 - t1) * (t0 - t2));
    let l1 = (target - t0) * (target - t2) / ((t1 - t0) * (t1 - t2));
    let l2 = (target - t0) * (target - t1) / ((t2 - t0) * (t2 - t1));
    (l0, l1, l2)
}

fn quadratic_f32(p0: f32, p1: f32, p2: f32, basis: (f64, f64, f64)) -> f32 {
    (p0 as f64 * basis.0 + p1 as f64 * basis.1 + p2 as f64 * basis.2) as f32
}

fn quadratic_option_f32(
    p0: Option<f32>,
    p1: Option<f32>,
    p2: Option<f32>,
    basis: (f64, f64, f64),
) -> Option<f32> {
    match (p0, p1, p2) {
        (Some(p0), Some(p1), Some(p2)) => Some(quadratic_f32(p0, p1, p2, basis)),
        _ => None,
    }
}

/// Accelerometer reading: three axes plus an optional estimated bias per
/// axis (absent on adapters that don't expose uncalibrated output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerMeasurement {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub bias_x: Option<f32>,
    pub bias_y: Option<f32>,
    pub bias_z: Option<f32>,
    pub timestamp: i64,
    pub accuracy: Accuracy,
    pub sensor_type: SensorType,
}

impl AccelerometerMeasurement {
    pub fn new(ax: f32, ay: f32, az: f32, timestamp: i64, accuracy: Accuracy) -> Self {
        Self {
            ax,
            ay,
            az,
            bias_x: None,
            bias_y: None,
            bias_z: None,
            timestamp,
            accuracy,
            sensor_type: SensorType::Accelerometer,
        }
    }
}

/// Gravity reading: three axes only, no bias (the platform derives gravity
/// from sensor fusion, it has no calibration bias of its own).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityMeasurement {
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    pub timestamp: i64,
    pub accuracy: Accuracy,
    pub sensor_type: SensorType,
}

impl GravityMeasurement {
    pub fn new(gx: f32, gy: f32, gz: f32, timestamp: i64, accuracy: Accuracy) -> Self {
        Self {
            gx,
            gy,
            gz,
            timestamp,
            accuracy,
            sensor_type: SensorType::Gravity,
        }
    }
}

/// Gyroscope reading: three axes plus an optional per-axis drift bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GyroscopeMeasurement {
    pub wx: f32,
    pub wy: f32,
    pub wz: f32,
    pub bias_x: Option<f32>,
    pub bias_y: Option<f32>,
    pub bias_z: Option<f32>,
    pub timestamp: i64,
    pub accuracy: Accuracy,
    pub sensor_type: SensorType,
}

impl GyroscopeMeasurement {
    pub fn new(wx: f32, wy: f32, wz: f32, timestamp: i64, accuracy: Accuracy) -> Self {
        Self {
            wx,
            wy,
            wz,
            bias_x: None,
            bias_y: None,
            bias_z: None,
            timestamp,
            accuracy,
            sensor_type: SensorType::Gyroscope,
        }
    }
}

/// Magnetometer reading: three axes plus an optional per-axis hard-iron bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnetometerMeasurement {
    pub mx: f32,
    pub my: f32,
    pub mz: f32,
    pub bias_x: Option<f32>,
    pub bias_y: Option<f32>,
    pub bias_z: Option<f32>,
    pub timestamp: i64,
    pub accuracy: Accuracy,
    pub sensor_type: SensorType,
}

impl MagnetometerMeasurement {
    pub fn new(mx: f32, my: f32, mz: f32, timestamp: i64, accuracy: Accuracy) -> Self {
        Self {
            mx,
            my,
            mz,
            bias_x: None,
            bias_y: None,
            bias_z: None,
            timestamp,
            accuracy,
            sensor_type: SensorType::Magnetometer,
        }
    }
}

macro_rules! impl_measurement {
    ($ty:ty) => {
        impl Measurement for $ty {
            fn timestamp(&self) -> i64 {
                self.timestamp
            }

            fn with_timestamp(&self, timestamp: i64) -> Self {
                let mut out = self.clone();
                out.timestamp = timestamp;
                out
            }

            fn accuracy(&self) -> Accuracy {
                self.accuracy
            }

            fn sensor_type(&self) -> SensorType {
                self.sensor_type
            }
        }
    };
}

impl_measurement!(AccelerometerMeasurement);
impl_measurement!(GravityMeasurement);
impl_measurement!(GyroscopeMeasurement);
impl_measurement!(MagnetometerMeasurement);

impl Blend for AccelerometerMeasurement {
    fn lerp(previous: &Self, current: &Self, lambda: f64) -> Self {
        Self {
            ax: lerp_f32(previous.ax, current.ax, lambda),
            ay: lerp_f32(previous.ay, current.ay, lambda),
            az: lerp_f32(previous.az, current.az, lambda),
            bias_x: lerp_option_f32(previous.bias_x, current.bias_x, lambda),
            bias_y: lerp_option_f32(previous.bias_y, current.bias_y, lambda),
            bias_z: lerp_option_f32(previous.bias_z, current.bias_z, lambda),
            timestamp: current.timestamp,
            accuracy: current.accuracy,
            sensor_type: current.sensor_type,
        }
    }

    fn quadratic(p0: &Self, p1: &Self, p2: &Self, t0: i64, t1: i64, t2: i64, target: f64) -> Self {
        let basis = quadratic_basis(t0, t1, t2, target);
        Self {
            ax: quadratic_f32(p0.ax, p1.ax, p2.ax, basis),
            ay: quadratic_f32(p0.ay, p1.ay, p2.ay, basis),
            az: quadratic_f32(p0.az, p1.az, p2.az, basis),
            bias_x: quadratic_option_f32(p0.bias_x, p1.bias_x, p2.bias_x, basis),
            bias_y: quadratic_option_f32(p0.bias_y, p1.bias_y, p2.bias_y, basis),
            bias_z: quadratic_option_f32(p0.bias_z, p1.bias_z, p2.bias_z, basis),
            timestamp: p2.timestamp,
            accuracy: p2.accuracy,
            sensor_type: p2.sensor_type,
        }
    }
}

impl Blend for GravityMeasurement {
    fn lerp(previous: &Self, current: &Self, lambda: f64) -> Self {
        Self {
            gx: lerp_f32(previous.gx, current.gx, lambda),
            gy: lerp_f32(previous.gy, current.gy, lambda),
            gz: lerp_f32(previous.gz, current.gz, lambda),
            timestamp: current.timestamp,
            accuracy: current.accuracy,
            sensor_type: current.sensor_type,
        }
    }

    fn quadratic(p0: &Self, p1: &Self, p2: &Self, t0: i64, t1: i64, t2: i64, target: f64) -> Self {
        let basis = quadratic_basis(t0, t1, t2, target);
        Self {
            gx: quadratic_f32(p0.gx, p1.gx, p2.gx, basis),
            gy: quadratic_f32(p0.gy, p1.gy, p2.gy, basis),
            gz: quadratic_f32(p0.gz, p1.gz, p2.gz, basis),
            timestamp: p2.timestamp,
            accuracy: p2.accuracy,
            sensor_type: p2.sensor_type,
        }
    }
}

impl Blend for GyroscopeMeasurement {
    fn lerp(previous: &Self, current: &Self, lambda: f64) -> Self {
        Self {
            wx: lerp_f32(previous.wx, current.wx, lambda),
            wy: lerp_f32(previous.wy, current.wy, lambda),
            wz: lerp_f32(previous.wz, current.wz, lambda),
            bias_x: lerp_option_f32(previous.bias_x, current.bias_x, lambda),
            bias_y: lerp_option_f32(previous.bias_y, current.bias_y, lambda),
            bias_z: lerp_option_f32(previous.bias_z, current.bias_z, lambda),
            timestamp: current.timestamp,
            accuracy: current.accuracy,
            sensor_type: current.sensor_type,
        }
    }

    fn quadratic(p0: &Self, p1: &Self, p2: &Self, t0: i64, t1: i64, t2: i64, target: f64) -> Self {
        let basis = quadratic_basis(t0, t1, t2, target);
        Self {
            wx: quadratic_f32(p0.wx, p1.wx, p2.wx, basis),
            wy: quadratic_f32(p0.wy, p1.wy, p2.wy, basis),
            wz: quadratic_f32(p0.wz, p1.wz, p2.wz, basis),
            bias_x: quadratic_option_f32(p0.bias_x, p1.bias_x, p2.bias_x, basis),
            bias_y: quadratic_option_f32(p0.bias_y, p1.bias_y, p2.bias_y, basis),
            bias_z: quadratic_option_f32(p0.bias_z, p1.bias_z, p2.bias_z, basis),
            timestamp: p2.timestamp,
            accuracy: p2.accuracy,
            sensor_type: p2.sensor_type,
        }
    }
}

impl Blend for MagnetometerMeasurement {
    fn lerp(previous: &Self, current: &Self, lambda: f64) -> Self {
        Self {
            mx: lerp_f32(previous.mx, current.mx, lambda),
            my: lerp_f32(previous.my, current.my, lambda),
            mz: lerp_f32(previous.mz, current.mz, lambda),
            bias_x: lerp_option_f32(previous.bias_x, current.bias_x, lambda),
            bias_y: lerp_option_f32(previous.bias_y, current.bias_y, lambda),
            bias_z: lerp_option_f32(previous.bias_z, current.bias_z, lambda),
            timestamp: current.timestamp,
            accuracy: current.accuracy,
            sensor_type: current.sensor_type,
        }
    }

    fn quadratic(p0: &Self, p1: &Self, p2: &Self, t0: i64, t1: i64, t2: i64, target: f64) -> Self {
        let basis = quadratic_basis(t0, t1, t2, target);
        Self {
            mx: quadratic_f32(p0.mx, p1.mx, p2.mx, basis),
            my: quadratic_f32(p0.my, p1.my, p2.my, basis),
            mz: quadratic_f32(p0.mz, p1.mz, p2.mz, basis),
            bias_x: quadratic_option_f32(p0.bias_x, p1.bias_x, p2.bias_x, basis),
            bias_y: quadratic_option_f32(p0.bias_y, p1.bias_y, p2.bias_y, basis),
            bias_z: quadratic_option_f32(p0.bias_z, p1.bias_z, p2.bias_z, basis),
            timestamp: p2.timestamp,
            accuracy: p2.accuracy,
            sensor_type: p2.sensor_type,
        }
    }
}

/// Output of the 2-stream (accelerometer + magnetometer) syncer: one
/// measurement per participating stream aligned to a common timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerAndMagnetometerSyncedMeasurement {
    pub timestamp: i64,
    pub accelerometer: AccelerometerMeasurement,
    pub magnetometer: MagnetometerMeasurement,
}

/// Output of the 3-stream (accelerometer + gravity + gyroscope) syncer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerGravityAndGyroscopeSyncedMeasurement {
    pub timestamp: i64,
    pub accelerometer: AccelerometerMeasurement,
    pub gravity: GravityMeasurement,
    pub gyroscope: GyroscopeMeasurement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_timestamp_only_touches_timestamp() {
        let m = AccelerometerMeasurement::new(1.0, 2.0, 3.0, 100, Accuracy::High);
        let rewritten = m.with_timestamp(200);
        assert_eq!(rewritten.timestamp, 200);
        assert_eq!(rewritten.ax, m.ax);
        assert_eq!(rewritten.accuracy, m.accuracy);
    }

    #[test]
    fn lerp_is_linear_in_payload_only() {
        let a = MagnetometerMeasurement::new(0.0, 0.0, 0.0, 0, Accuracy::Medium);
        let b = MagnetometerMeasurement::new(10.0, 20.0, 30.0, 100, Accuracy::High);
        let mid = MagnetometerMeasurement::lerp(&a, &b, 0.5);
        assert_eq!(mid.mx, 5.0);
        assert_eq!(mid.my, 10.0);
        assert_eq!(mid.mz, 15.0);
        // accuracy/sensor_type come from `current` (b), not blended.
        assert_eq!(mid.accuracy, Accuracy::High);
    }

    #[test]
    fn quadratic_reproduces_interior_sample_exactly() {
        let p0 = GravityMeasurement::new(0.0, 0.0, 9.8, 0, Accuracy::High);
        let p1 = GravityMeasurement::new(1.0, 0.0, 9.8, 100, Accuracy::High);
        let p2 = GravityMeasurement::new(4.0, 0.0, 9.8, 200, Accuracy::High);
        let at_p1 = GravityMeasurement::quadratic(&p0, &p1, &p2, 0, 100, 200, 100.0);
        assert!((at_p1.gx - p1.gx).abs() < 1e-3);
    }
}
