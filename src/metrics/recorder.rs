//! Metric Recorder
//!
//! Ring buffer of [`PerformanceMetric`] samples plus timing helpers.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::clock::SharedClock;
use crate::metrics::DEFAULT_METRICS_CAPACITY;

// == Performance Metric ==
/// One recorded sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetric {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

// == Metric Recorder ==
/// Append-only sample buffer holding at most `capacity` entries.
///
/// Internally synchronised so it can be shared behind an `Arc` and written
/// from any task without an outer lock.
#[derive(Debug)]
pub struct MetricRecorder {
    samples: Mutex<VecDeque<PerformanceMetric>>,
    capacity: usize,
    clock: SharedClock,
}

impl MetricRecorder {
    pub fn new(capacity: usize, clock: SharedClock) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            clock,
        }
    }

    /// Recorder with the stock capacity of 100 samples.
    pub fn with_defaults(clock: SharedClock) -> Self {
        Self::new(DEFAULT_METRICS_CAPACITY, clock)
    }

    // == Record ==
    /// Appends a sample stamped with the current time, dropping the oldest
    /// samples once the buffer is over capacity.
    pub fn record(&self, name: &str, value: f64, metadata: Option<Map<String, Value>>) {
        let metric = PerformanceMetric {
            name: name.to_string(),
            value,
            timestamp: self.clock.now(),
            metadata,
        };

        let mut samples = self.lock();
        samples.push_back(metric);
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    // == Measure ==
    /// Runs `f`, records `{name}_duration` in milliseconds and returns its
    /// result untouched.
    pub fn measure<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = f();
        self.record_duration(name, started);
        result
    }

    /// Async variant of [`measure`](Self::measure). The duration is recorded
    /// whether the future resolves to `Ok` or `Err`; errors are never swallowed.
    pub async fn measure_async<T, Fut>(&self, name: &str, fut: Fut) -> T
    where
        Fut: Future<Output = T>,
    {
        let started = Instant::now();
        let result = fut.await;
        self.record_duration(name, started);
        result
    }

    // == Queries ==
    /// Snapshot of every buffered sample, oldest first.
    pub fn all(&self) -> Vec<PerformanceMetric> {
        self.lock().iter().cloned().collect()
    }

    pub fn by_name(&self, name: &str) -> Vec<PerformanceMetric> {
        self.lock()
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    /// Mean value of the samples named `name`, if any are buffered.
    pub fn average(&self, name: &str) -> Option<f64> {
        let samples = self.lock();
        let (sum, count) = samples
            .iter()
            .filter(|m| m.name == name)
            .fold((0.0, 0usize), |(sum, count), m| (sum + m.value, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn record_duration(&self, name: &str, started: Instant) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.record(&format!("{name}_duration"), elapsed_ms, None);
    }

    // A panic while holding the lock cannot leave the deque half-updated, so
    // a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<PerformanceMetric>> {
        self.samples.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
