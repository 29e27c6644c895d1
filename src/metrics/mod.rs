//! Metrics Module
//!
//! Bounded in-process recorder of named numeric samples. Instrumented code
//! writes, diagnostics read.

mod recorder;

pub use recorder::{MetricRecorder, PerformanceMetric};

/// Number of samples kept before the oldest are dropped.
pub const DEFAULT_METRICS_CAPACITY: usize = 100;
