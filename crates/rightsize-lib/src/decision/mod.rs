//! Decision policies
//!
//! Four independent classifiers, one per resource dimension. Each maps its
//! own inputs to a decision plus a rationale and never looks at another
//! dimension's signals.
//!
//! The band thresholds are policy constants. The target utilization used by
//! the calculator is a run parameter and is deliberately not shared here.

mod cpu;
mod jvm;
mod memory;

pub use cpu::decide_cpu;
pub use jvm::{decide_jvm_heap, decide_jvm_non_heap, jvm_rationale};
pub use memory::decide_memory;

/// Ratios above this are under pressure
pub const INCREASE_ABOVE: f64 = 0.90;

/// Ratios below this are overprovisioned
pub const REDUCE_BELOW: f64 = 0.60;

/// After-GC heap utilization above this needs a larger heap
pub const JVM_HEAP_INCREASE_ABOVE: f64 = 0.80;

/// Non-heap bytes above this share of the memory request need more room
pub const JVM_NON_HEAP_SHARE_ABOVE: f64 = 0.30;

/// Position of a ratio relative to the healthy band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Band {
    NoData,
    Over,
    Under,
    Healthy,
}

/// Classify a p95 ratio. Both boundaries belong to the healthy band.
pub(crate) fn classify(ratio: f64) -> Band {
    if ratio <= 0.0 {
        Band::NoData
    } else if ratio > INCREASE_ABOVE {
        Band::Over
    } else if ratio < REDUCE_BELOW {
        Band::Under
    } else {
        Band::Healthy
    }
}
