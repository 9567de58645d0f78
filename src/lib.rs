//! sensor-syncer — multi-stream inertial measurement synchronization.
//!
//! This crate aligns a high-rate primary stream (accelerometer) against one
//! or more lower-rate secondary streams (magnetometer, or gravity and
//! gyroscope together) onto a single shared timestamp, interpolating the
//! secondary samples onto each primary arrival as they're emitted.
//!
//! # Overview
//!
//! Two synchronizer variants are provided, both built from the same generic
//! matching algorithm:
//!
//! - [`syncer::accel_mag`] — accelerometer + magnetometer (2-stream)
//! - [`syncer::accel_gravity_gyro`] — accelerometer + gravity + gyroscope
//!   (3-stream)
//!
//! Each variant exposes a `Builder` for wiring up adapters, capacities and
//! interpolation strategies, and a `Syncer` with `start`/`stop` lifecycle
//! methods and listener callbacks for synced tuples, buffer-full events,
//! accuracy changes and stale-measurement eviction.
//!
//! OS sensor registration, threading and the actual callback wiring into a
//! platform's sensor framework are out of scope — this crate only owns the
//! buffering, matching and interpolation. Callers implement
//! [`adapter::PrimaryAdapter`] and [`adapter::SecondaryAdapter`] over
//! whatever collects their raw samples.
//!
//! # Library Usage
//!
//! - [`measurement`] — per-stream measurement types and the blending traits
//!   used by interpolation
//! - [`ring`] — the bounded FIFO buffer each stream is kept in
//! - [`interpolator`] — direct, linear and quadratic alignment strategies
//! - [`adapter`] — the contract a stream's data source must satisfy
//! - [`syncer`] — the synchronizer state machine and its two variants
//! - [`error`] — construction and lifecycle error types
//!
//! # License
//!
//! This project is licensed under the GNU General Public License v3.0.
//! See LICENSE.md for details.

pub mod adapter;
pub mod error;
pub mod interpolator;
pub mod measurement;
pub mod ring;
pub mod syncer;
