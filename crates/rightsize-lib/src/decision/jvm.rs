use super::{JVM_HEAP_INCREASE_ABOVE, JVM_NON_HEAP_SHARE_ABOVE};
use crate::models::JvmDecision;

/// Classify heap pressure from the after-GC utilization ratio
pub fn decide_jvm_heap(after_gc_ratio: f64) -> (JvmDecision, String) {
    if after_gc_ratio > JVM_HEAP_INCREASE_ABOVE {
        (
            JvmDecision::Increase,
            format!("after-GC heap ratio {:.2} > 0.80", after_gc_ratio),
        )
    } else if after_gc_ratio <= 0.0 {
        (JvmDecision::Keep, "no heap data".to_string())
    } else {
        (
            JvmDecision::Keep,
            format!("after-GC heap ratio {:.2} ok", after_gc_ratio),
        )
    }
}

/// Classify non-heap pressure relative to the container's memory request.
///
/// A zero request keeps: there is nothing to take a share of.
pub fn decide_jvm_non_heap(non_heap_bytes: i64, mem_request_bytes: i64) -> (JvmDecision, String) {
    if mem_request_bytes == 0 {
        return (JvmDecision::Keep, "no memory request".to_string());
    }

    let share = non_heap_bytes as f64 / mem_request_bytes as f64;
    if share > JVM_NON_HEAP_SHARE_ABOVE {
        (
            JvmDecision::Increase,
            format!("non-heap {:.0}% of request > 30%", share * 100.0),
        )
    } else {
        (
            JvmDecision::Keep,
            format!("non-heap {:.0}% of request", share * 100.0),
        )
    }
}

/// Combined JVM rationale for display
pub fn jvm_rationale(heap_why: &str, non_heap_why: &str) -> String {
    format!("heap: {}; non-heap: {}", heap_why, non_heap_why)
}
