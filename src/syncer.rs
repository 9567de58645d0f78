//! The synchronizer core: ingest, matching, stale eviction and lifecycle
//! (`spec.md` §4.4–§4.6, components C5–C7).
//!
//! The algorithm itself — buffer push/drain, secondary selection,
//! interpolation, post-emission cleanup and stale eviction — lives exactly
//! once as the generic [`SecondaryChannel`] type and the free functions
//! below it. [`define_syncer`] instantiates that shared algorithm twice (the
//! 2-stream and 3-stream variants named in `spec.md` §1), the way the
//! toolbox crate this is built from uses `macro_rules!` (`pull_and_record!`,
//! `copy_data!`) to share one code path across several concrete sample
//! types, rather than duplicating the state machine per variant.

use crate::error::SyncerError;
use crate::interpolator::{History, Interpolator};
use crate::measurement::{Accuracy, Blend, Measurement, SensorType};
use crate::ring::{PushResult, RingBuffer};
use std::time::Duration;

/// Static description of a stream, independent of its runtime buffer state.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    pub sensor_type: SensorType,
    pub sensor_delay: Duration,
    pub start_offset_enabled: bool,
}

/// Runtime state for one secondary stream: its ring buffer, the carry
/// window used for interpolation, the configured strategy and its adapter.
pub struct SecondaryChannel<M: Blend> {
    ring: RingBuffer<M>,
    history: History<M>,
    last_notified_timestamp: i64,
    interpolator: Box<dyn Interpolator<M>>,
    adapter: Box<dyn crate::adapter::SecondaryAdapter<M>>,
    descriptor: StreamDescriptor,
}

impl<M: Blend> SecondaryChannel<M> {
    pub fn new(
        label: &'static str,
        capacity: usize,
        descriptor: StreamDescriptor,
        interpolator: Box<dyn Interpolator<M>>,
        adapter: Box<dyn crate::adapter::SecondaryAdapter<M>>,
    ) -> Result<Self, SyncerError> {
        Ok(Self {
            ring: RingBuffer::new(label, capacity)?,
            history: History::new(),
            last_notified_timestamp: i64::MIN,
            interpolator,
            adapter,
            descriptor,
        })
    }

    fn reset(&mut self) {
        self.ring.clear();
        self.history.clear();
        self.last_notified_timestamp = i64::MIN;
    }

    pub fn usage(&self) -> f64 {
        self.ring.usage()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn last_notified_timestamp(&self) -> i64 {
        self.last_notified_timestamp
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    pub fn collector_usage(&self) -> Option<f64> {
        self.adapter.collector_usage()
    }
}

/// Pulls newly available measurements up to `horizon` from the adapter into
/// the channel's ring, applying the buffer-full protocol. Returns `true` if
/// any push overflowed the buffer (`spec.md` §4.4.4).
fn secondary_ingest<M: Blend>(channel: &mut SecondaryChannel<M>, horizon: i64) -> bool {
    let batch = channel.adapter.drain_before(horizon);
    let mut overflowed = false;
    for m in batch {
        if channel.ring.push(m) == PushResult::Full {
            overflowed = true;
        }
    }
    overflowed
}

/// Returns whether `channel` currently has a qualifying secondary for
/// `target_ts`, without mutating any state. Used to decide, before
/// committing to emit, whether every participating stream can be matched.
fn secondary_has_match<M: Blend>(channel: &SecondaryChannel<M>, target_ts: i64) -> bool {
    channel.ring.find_best_match(target_ts).is_some()
}

/// Selects the newest qualifying secondary for `target_ts`, interpolates it
/// onto that timestamp, updates the carry window and evicts everything at
/// or before the selected sample from the ring (`spec.md` §4.4.5 steps 2,3,5).
/// Panics if called without first confirming [`secondary_has_match`] — the
/// core only calls this after that check has passed for every stream in the
/// batch.
fn secondary_match<M: Blend>(channel: &mut SecondaryChannel<M>, target_ts: i64) -> M {
    let selected = channel
        .ring
        .find_best_match(target_ts)
        .expect("caller must confirm a match exists first")
        .clone();
    let aligned = channel
        .interpolator
        .interpolate(&channel.history, &selected, target_ts);
    channel.history.push(selected.clone());
    channel.last_notified_timestamp = selected.timestamp();
    channel.ring.drain_matching(|m| m.timestamp() <= selected.timestamp());
    aligned
}

fn secondary_evict_stale<M: Blend>(
    channel: &mut SecondaryChannel<M>,
    anchor_ts: i64,
    stale_offset_nanos: i64,
) -> Vec<M> {
    let threshold = anchor_ts - stale_offset_nanos;
    channel.ring.drain_matching(|m| m.timestamp() < threshold)
}

/// Generates one concrete syncer variant (a fixed primary plus a fixed list
/// of secondary streams) into its own module, reusing the shared
/// [`SecondaryChannel`] algorithm above for every secondary field.
macro_rules! define_syncer {
    (
        module: $module:ident,
        primary: ($primary_variant:ident, $primary_field:ident, $primary_adapter_field:ident, $primary_ty:ty, $primary_label:literal),
        secondaries: [ $( ($sec_variant:ident, $sec_field:ident, $sec_ty:ty, $sec_label:literal) ),+ $(,)? ],
        synced: $synced:path,
    ) => {
        pub mod $module {
            use super::*;
            use crate::adapter::{PrimaryAdapter, SecondaryAdapter};

            /// Identifies one of this variant's participating streams.
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum StreamId {
                $primary_variant,
                $( $sec_variant ),+
            }

            /// Measurements evicted from one stream by stale cleanup
            /// (`spec.md` §4.4.6).
            #[derive(Debug, Clone)]
            pub enum StaleBatch {
                $primary_variant(Vec<$primary_ty>),
                $( $sec_variant(Vec<$sec_ty>) ),+
            }

            /// Construction knobs shared by every stream in this variant
            /// (`spec.md` §6). Per-stream capacity and interpolator are
            /// supplied to [`Builder`] alongside the adapters.
            #[derive(Debug, Clone)]
            pub struct Config {
                pub stop_when_filled_buffer: bool,
                pub stale_offset_nanos: i64,
                pub stale_detection_enabled: bool,
            }

            impl Default for Config {
                fn default() -> Self {
                    Self {
                        stop_when_filled_buffer: false,
                        stale_offset_nanos: 2_000_000_000,
                        stale_detection_enabled: true,
                    }
                }
            }

            type SyncedListener = Box<dyn FnMut(&$synced)>;
            type BufferFullListener = Box<dyn FnMut(StreamId)>;
            type AccuracyChangedListener = Box<dyn FnMut(StreamId, Accuracy)>;
            type StaleListener = Box<dyn FnMut(StreamId, StaleBatch)>;

            #[derive(Default)]
            struct Listeners {
                synced: Option<SyncedListener>,
                buffer_full: Option<BufferFullListener>,
                accuracy_changed: Option<AccuracyChangedListener>,
                stale: Option<StaleListener>,
            }

            /// The synchronizer state machine for this stream set.
            pub struct Syncer {
                running: bool,
                stopping: bool,
                start_timestamp: i64,
                most_recent_timestamp: Option<i64>,
                oldest_timestamp: Option<i64>,
                number_of_processed_measurements: u64,
                last_notified_timestamp: i64,
                $primary_field: RingBuffer<$primary_ty>,
                $primary_adapter_field: Box<dyn PrimaryAdapter<$primary_ty>>,
                primary_descriptor: StreamDescriptor,
                $( $sec_field: SecondaryChannel<$sec_ty>, )+
                config: Config,
                listeners: Listeners,
            }

            impl Syncer {
                /// Request graceful shutdown: the syncer keeps running
                /// until the current emission cycle completes, then stops
                /// (`spec.md` §4.4.5 step 6).
                pub fn request_stop(&mut self) {
                    self.stopping = true;
                }

                pub fn running(&self) -> bool {
                    self.running
                }

                pub fn start_timestamp(&self) -> i64 {
                    self.start_timestamp
                }

                pub fn most_recent_timestamp(&self) -> Option<i64> {
                    self.most_recent_timestamp
                }

                pub fn oldest_timestamp(&self) -> Option<i64> {
                    self.oldest_timestamp
                }

                pub fn number_of_processed_measurements(&self) -> u64 {
                    self.number_of_processed_measurements
                }

                pub fn $primary_field(&self) -> &RingBuffer<$primary_ty> {
                    &self.$primary_field
                }

                pub fn primary_usage(&self) -> f64 {
                    self.$primary_field.usage()
                }

                pub fn primary_collector_usage(&self) -> Option<f64> {
                    self.$primary_adapter_field.collector_usage()
                }

                pub fn primary_descriptor(&self) -> &StreamDescriptor {
                    &self.primary_descriptor
                }

                $(
                    pub fn $sec_field(&self) -> &SecondaryChannel<$sec_ty> {
                        &self.$sec_field
                    }
                )+

                /// Preconditions: `running == false` (`spec.md` §4.4.1).
                pub fn start(&mut self, timestamp: Option<i64>) -> Result<bool, SyncerError> {
                    if self.running {
                        return Err(SyncerError::InvalidState { action: "start" });
                    }
                    self.reset_state();
                    self.start_timestamp = timestamp.unwrap_or_else(monotonic_now_nanos);

                    if !self.$primary_adapter_field.start(self.start_timestamp) {
                        tracing::warn!(stream = $primary_label, "adapter failed to start");
                        return Ok(false);
                    }
                    $(
                        if !self.$sec_field.adapter.start(self.start_timestamp) {
                            tracing::warn!(stream = $sec_label, "adapter failed to start");
                            return Ok(false);
                        }
                    )+

                    self.running = true;
                    tracing::debug!(start_timestamp = self.start_timestamp, "syncer started");
                    Ok(true)
                }

                /// Synchronous, idempotent; never fails (`spec.md` §4.4.2, §7).
                pub fn stop(&mut self) {
                    self.$primary_adapter_field.stop();
                    $( self.$sec_field.adapter.stop(); )+
                    self.reset_state();
                    self.stopping = false;
                    self.running = false;
                    tracing::debug!("syncer stopped");
                }

                fn reset_state(&mut self) {
                    self.$primary_field.clear();
                    $( self.$sec_field.reset(); )+
                    self.last_notified_timestamp = i64::MIN;
                    self.most_recent_timestamp = None;
                    self.oldest_timestamp = None;
                    self.number_of_processed_measurements = 0;
                }

                /// Driver entrypoint for the primary stream's
                /// "measurement arrived" callback (`spec.md` §4.4.3).
                pub fn handle_primary_measurement(&mut self, position: usize) {
                    if !self.running {
                        return;
                    }
                    let batch = self.$primary_adapter_field.drain_up_to_position(position);
                    if batch.is_empty() {
                        return;
                    }
                    for m in batch {
                        self.most_recent_timestamp = Some(m.timestamp());
                        if self.$primary_field.push(m) == PushResult::Full {
                            tracing::warn!(stream = $primary_label, "buffer full");
                            if let Some(listener) = self.listeners.buffer_full.as_mut() {
                                listener(StreamId::$primary_variant);
                            }
                            if self.config.stop_when_filled_buffer {
                                self.stop();
                                return;
                            }
                        }
                    }
                    self.process_primary_batch();
                }

                /// Driver entrypoint for a secondary stream's "measurement
                /// arrived" callback (`spec.md` §4.4.4). Never triggers
                /// matching directly — only the primary path does.
                pub fn handle_secondary_measurement(&mut self, stream: StreamId) {
                    if !self.running {
                        return;
                    }
                    let Some(horizon) = self.most_recent_timestamp else {
                        return;
                    };
                    match stream {
                        StreamId::$primary_variant => {}
                        $(
                            StreamId::$sec_variant => {
                                if secondary_ingest(&mut self.$sec_field, horizon) {
                                    tracing::warn!(stream = $sec_label, "buffer full");
                                    if let Some(listener) = self.listeners.buffer_full.as_mut() {
                                        listener(StreamId::$sec_variant);
                                    }
                                    if self.config.stop_when_filled_buffer {
                                        self.stop();
                                        return;
                                    }
                                }
                            }
                        )+
                    }
                    // Matching is driven by the primary path only (`spec.md`
                    // §4.4.4 step 4); a primary left waiting here is
                    // re-examined on the next primary ingest, not now.
                }

                pub fn handle_accuracy_changed(&mut self, stream: StreamId, accuracy: Accuracy) {
                    if let Some(listener) = self.listeners.accuracy_changed.as_mut() {
                        listener(stream, accuracy);
                    }
                }

                /// `spec.md` §4.4.5: iterate the primary buffer front to
                /// back, discard stale late arrivals, match each surviving
                /// primary against every secondary, emit and clean up.
                fn process_primary_batch(&mut self) {
                    loop {
                        let Some(candidate) = self.$primary_field.peek_front().cloned() else {
                            break;
                        };

                        if candidate.timestamp() <= self.last_notified_timestamp {
                            self.$primary_field.pop_front();
                            tracing::trace!(
                                timestamp = candidate.timestamp(),
                                "discarding out-of-order primary"
                            );
                            continue;
                        }

                        let target_ts = candidate.timestamp();
                        let all_ready = true
                            $( && secondary_has_match(&self.$sec_field, target_ts) )+;
                        if !all_ready {
                            break;
                        }

                        self.$primary_field.pop_front();
                        $(
                            let $sec_field = secondary_match(&mut self.$sec_field, target_ts);
                        )+

                        self.oldest_timestamp = Some(target_ts);
                        self.last_notified_timestamp = target_ts;
                        self.number_of_processed_measurements += 1;

                        let tuple = $synced {
                            timestamp: target_ts,
                            $primary_field: candidate,
                            $( $sec_field, )+
                        };
                        tracing::debug!(
                            timestamp = target_ts,
                            processed = self.number_of_processed_measurements,
                            "emitted synced measurement"
                        );
                        if let Some(listener) = self.listeners.synced.as_mut() {
                            listener(&tuple);
                        }

                        if self.stopping {
                            self.stop();
                            return;
                        }

                        self.cleanup_stale(target_ts);
                    }
                }

                /// `spec.md` §4.4.6.
                fn cleanup_stale(&mut self, anchor_ts: i64) {
                    if !self.config.stale_detection_enabled {
                        return;
                    }
                    let offset = self.config.stale_offset_nanos;

                    let primary_stale = self
                        .$primary_field
                        .drain_matching(|m| m.timestamp() < anchor_ts - offset);
                    if !primary_stale.is_empty() {
                        tracing::trace!(
                            stream = $primary_label,
                            count = primary_stale.len(),
                            "evicted stale measurements"
                        );
                        if let Some(listener) = self.listeners.stale.as_mut() {
                            listener(
                                StreamId::$primary_variant,
                                StaleBatch::$primary_variant(primary_stale),
                            );
                        }
                    }

                    $(
                        let stale = secondary_evict_stale(&mut self.$sec_field, anchor_ts, offset);
                        if !stale.is_empty() {
                            tracing::trace!(
                                stream = $sec_label,
                                count = stale.len(),
                                "evicted stale measurements"
                            );
                            if let Some(listener) = self.listeners.stale.as_mut() {
                                listener(StreamId::$sec_variant, StaleBatch::$sec_variant(stale));
                            }
                        }
                    )+
                }

                /// Only available to the crate's own tests: constructs a
                /// syncer with an already-populated mid-run state, so
                /// scenario tests don't need to poke private fields from
                /// outside (`SPEC_FULL.md` §9's "reflective test surgery"
                /// decision).
                #[cfg(test)]
                pub(crate) fn set_last_notified_timestamp_for_test(&mut self, ts: i64) {
                    self.last_notified_timestamp = ts;
                }

                #[cfg(test)]
                pub(crate) fn push_primary_for_test(&mut self, m: $primary_ty) -> crate::ring::PushResult {
                    if self.most_recent_timestamp.is_none()
                        || self.most_recent_timestamp.unwrap() < m.timestamp()
                    {
                        self.most_recent_timestamp = Some(m.timestamp());
                    }
                    self.$primary_field.push(m)
                }

                /// Only available to the crate's own tests: runs one matching
                /// pass directly, without going through `handle_primary_measurement`.
                #[cfg(test)]
                pub(crate) fn process_primary_batch_for_test(&mut self) {
                    self.process_primary_batch();
                }
            }

            /// Assembles a [`Syncer`] from its adapters, interpolators and
            /// configuration (`SPEC_FULL.md` §6's builder, grounded on the
            /// toolbox crate's `cli::Args`).
            pub struct Builder {
                config: Config,
                primary_capacity: usize,
                primary_descriptor: StreamDescriptor,
                primary_adapter: Option<Box<dyn PrimaryAdapter<$primary_ty>>>,
                $( $sec_field: Option<(usize, StreamDescriptor, Box<dyn Interpolator<$sec_ty>>, Box<dyn SecondaryAdapter<$sec_ty>>)>, )+
                listeners: Listeners,
            }

            impl Builder {
                pub fn new(primary_adapter: Box<dyn PrimaryAdapter<$primary_ty>>) -> Self {
                    Self {
                        config: Config::default(),
                        primary_capacity: 64,
                        primary_descriptor: StreamDescriptor {
                            sensor_type: SensorType::$primary_variant,
                            sensor_delay: Duration::ZERO,
                            start_offset_enabled: false,
                        },
                        primary_adapter: Some(primary_adapter),
                        $( $sec_field: None, )+
                        listeners: Listeners::default(),
                    }
                }

                pub fn config(mut self, config: Config) -> Self {
                    self.config = config;
                    self
                }

                pub fn primary_capacity(mut self, capacity: usize) -> Self {
                    self.primary_capacity = capacity;
                    self
                }

                $(
                    pub fn $sec_field(
                        mut self,
                        capacity: usize,
                        interpolator: Box<dyn Interpolator<$sec_ty>>,
                        adapter: Box<dyn SecondaryAdapter<$sec_ty>>,
                    ) -> Self {
                        self.$sec_field = Some((
                            capacity,
                            StreamDescriptor {
                                sensor_type: SensorType::$sec_variant,
                                sensor_delay: Duration::ZERO,
                                start_offset_enabled: false,
                            },
                            interpolator,
                            adapter,
                        ));
                        self
                    }
                )+

                pub fn on_synced_measurement(
                    mut self,
                    listener: impl FnMut(&$synced) + 'static,
                ) -> Self {
                    self.listeners.synced = Some(Box::new(listener));
                    self
                }

                pub fn on_buffer_filled(mut self, listener: impl FnMut(StreamId) + 'static) -> Self {
                    self.listeners.buffer_full = Some(Box::new(listener));
                    self
                }

                pub fn on_accuracy_changed(
                    mut self,
                    listener: impl FnMut(StreamId, Accuracy) + 'static,
                ) -> Self {
                    self.listeners.accuracy_changed = Some(Box::new(listener));
                    self
                }

                pub fn on_stale_measurements(
                    mut self,
                    listener: impl FnMut(StreamId, StaleBatch) + 'static,
                ) -> Self {
                    self.listeners.stale = Some(Box::new(listener));
                    self
                }

                pub fn build(mut self) -> Result<Syncer, SyncerError> {
                    let primary_field = RingBuffer::new($primary_label, self.primary_capacity)?;
                    $(
                        let (capacity, descriptor, interpolator, adapter) = self
                            .$sec_field
                            .take()
                            .expect(concat!($sec_label, " stream was not configured on the builder"));
                        let $sec_field =
                            SecondaryChannel::new($sec_label, capacity, descriptor, interpolator, adapter)?;
                    )+

                    Ok(Syncer {
                        running: false,
                        stopping: false,
                        start_timestamp: 0,
                        most_recent_timestamp: None,
                        oldest_timestamp: None,
                        number_of_processed_measurements: 0,
                        last_notified_timestamp: i64::MIN,
                        $primary_field: primary_field,
                        $primary_adapter_field: self
                            .primary_adapter
                            .take()
                            .expect("primary adapter supplied to Builder::new"),
                        primary_descriptor: self.primary_descriptor,
                        $( $sec_field, )+
                        config: self.config,
                        listeners: self.listeners,
                    })
                }
            }
        }
    };
}

fn monotonic_now_nanos() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

define_syncer! {
    module: accel_mag,
    primary: (Accelerometer, accelerometer, accelerometer_adapter, crate::measurement::AccelerometerMeasurement, "accelerometer"),
    secondaries: [
        (Magnetometer, magnetometer, crate::measurement::MagnetometerMeasurement, "magnetometer"),
    ],
    synced: crate::measurement::AccelerometerAndMagnetometerSyncedMeasurement,
}

define_syncer! {
    module: accel_gravity_gyro,
    primary: (Accelerometer, accelerometer, accelerometer_adapter, crate::measurement::AccelerometerMeasurement, "accelerometer"),
    secondaries: [
        (Gravity, gravity, crate::measurement::GravityMeasurement, "gravity"),
        (Gyroscope, gyroscope, crate::measurement::GyroscopeMeasurement, "gyroscope"),
    ],
    synced: crate::measurement::AccelerometerGravityAndGyroscopeSyncedMeasurement,
}

#[cfg(test)]
mod tests {
    use super::accel_mag;
    use crate::adapter::{PrimaryAdapter, SecondaryAdapter};
    use crate::interpolator::{DirectInterpolator, LinearInterpolator};
    use crate::measurement::{Accuracy, AccelerometerMeasurement, MagnetometerMeasurement};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct VecPrimaryAdapter {
        pending: Vec<AccelerometerMeasurement>,
        started: bool,
    }

    impl PrimaryAdapter<AccelerometerMeasurement> for VecPrimaryAdapter {
        fn start(&mut self, _start_timestamp: i64) -> bool {
            self.started = true;
            true
        }

        fn stop(&mut self) {
            self.started = false;
        }

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

    fn accel(ts: i64) -> AccelerometerMeasurement {
        AccelerometerMeasurement::new(1.0, 0.0, 0.0, ts, Accuracy::High)
    }

    fn mag(ts: i64) -> MagnetometerMeasurement {
        MagnetometerMeasurement::new(0.0, 1.0, 0.0, ts, Accuracy::High)
    }

    fn build_syncer(
        primary: Vec<AccelerometerMeasurement>,
        secondary: Vec<MagnetometerMeasurement>,
    ) -> accel_mag::Syncer {
        let primary_adapter = Box::new(VecPrimaryAdapter {
            pending: primary,
            started: false,
        });
        let secondary_adapter = Box::new(VecSecondaryAdapter { pending: secondary });
        accel_mag::Builder::new(primary_adapter)
            .primary_capacity(8)
            .magnetometer(8, Box::new(DirectInterpolator), secondary_adapter)
            .build()
            .unwrap()
    }

    #[test]
    fn start_rejects_double_start() {
        let mut syncer = build_syncer(vec![], vec![]);
        assert!(syncer.start(Some(0)).unwrap());
        assert!(syncer.start(Some(0)).is_err());
    }

    #[test]
    fn emits_synced_measurement_once_both_streams_ready() {
        // Matching is driven by the primary path only (`spec.md` §4.4.4): a
        // secondary that arrives while a primary is buffered does not emit
        // anything by itself. The match surfaces on the *next* primary tick,
        // once that secondary sample is already sitting in its ring.
        let emitted = Rc::new(RefCell::new(Vec::new()));
        let emitted_clone = emitted.clone();

        let mut syncer = accel_mag::Builder::new(Box::new(VecPrimaryAdapter {
            pending: vec![accel(100), accel(200)],
            started: false,
        }))
        .primary_capacity(8)
        .magnetometer(
            8,
            Box::new(DirectInterpolator),
            Box::new(VecSecondaryAdapter {
                pending: vec![mag(90)],
            }),
        )
        .on_synced_measurement(move |tuple| emitted_clone.borrow_mut().push(tuple.clone()))
        .build()
        .unwrap();

        assert!(syncer.start(Some(0)).unwrap());
        syncer.handle_primary_measurement(1);
        syncer.handle_secondary_measurement(accel_mag::StreamId::Magnetometer);
        assert_eq!(emitted.borrow().len(), 0, "no emission on the secondary's own arrival");

        // The test adapter's `drain_up_to_position` takes `position` items
        // from whatever it still has buffered, so a second single-item tick
        // is still `handle_primary_measurement(1)`, not `(2)`.
        syncer.handle_primary_measurement(1);

        let emitted = emitted.borrow();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].timestamp, 100);
        assert_eq!(emitted[0].magnetometer.timestamp, 100);
    }

    #[test]
    fn withholds_primary_without_qualifying_secondary() {
        let mut syncer = build_syncer(vec![accel(100)], vec![]);
        assert!(syncer.start(Some(0)).unwrap());
        syncer.handle_primary_measurement(1);
        syncer.handle_secondary_measurement(accel_mag::StreamId::Magnetometer);
        assert_eq!(syncer.number_of_processed_measurements(), 0);
        assert_eq!(syncer.accelerometer().len(), 1);
    }

    #[test]
    fn stale_eviction_runs_after_each_emission() {
        let mut syncer = accel_mag::Builder::new(Box::new(VecPrimaryAdapter {
            pending: vec![accel(0), accel(10_000_000_000), accel(20_000_000_000)],
            started: false,
        }))
        .primary_capacity(8)
        .magnetometer(
            8,
            Box::new(LinearInterpolator),
            Box::new(VecSecondaryAdapter {
                pending: vec![mag(0), mag(10_000_000_000)],
            }),
        )
        .build()
        .unwrap();

        assert!(syncer.start(Some(0)).unwrap());
        // One primary at a time: `drain_up_to_position(1)` takes whatever is
        // next from the adapter's remaining queue, not a cumulative index.
        syncer.handle_primary_measurement(1);
        syncer.handle_secondary_measurement(accel_mag::StreamId::Magnetometer);
        syncer.handle_primary_measurement(1);
        syncer.handle_secondary_measurement(accel_mag::StreamId::Magnetometer);
        syncer.handle_primary_measurement(1);

        // Each primary tick re-examines the buffer, matching and cleaning up
        // the previous one once its secondary has caught up. The third
        // primary is left waiting with no matching secondary available.
        assert_eq!(syncer.number_of_processed_measurements(), 2);
        assert_eq!(syncer.accelerometer().len(), 1);
        assert_eq!(syncer.magnetometer().len(), 0);
    }

    #[test]
    fn stop_clears_buffers_and_allows_restart() {
        let mut syncer = build_syncer(vec![accel(0)], vec![mag(0)]);
        assert!(syncer.start(Some(0)).unwrap());
        syncer.stop();
        assert!(!syncer.running());
        assert_eq!(syncer.accelerometer().len(), 0);
        assert!(syncer.start(Some(0)).unwrap());
    }

    #[test]
    fn freshness_gate_discards_primaries_behind_last_notified() {
        let mut syncer = build_syncer(vec![], vec![]);
        assert!(syncer.start(Some(0)).unwrap());
        syncer.set_last_notified_timestamp_for_test(500);
        assert_eq!(syncer.push_primary_for_test(accel(100)), crate::ring::PushResult::Ok);
        syncer.process_primary_batch_for_test();
        assert_eq!(syncer.accelerometer().len(), 0);
        assert_eq!(syncer.number_of_processed_measurements(), 0);
    }
}
