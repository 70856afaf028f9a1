use super::{classify, Band};
use crate::models::CpuDecision;

/// Classify the CPU dimension.
///
/// Active throttling wins over any ratio: reducing a throttled container
/// would only add pressure.
pub fn decide_cpu(p95_ratio: f64, throttled: bool) -> (CpuDecision, String) {
    if throttled {
        return (
            CpuDecision::SkipThrottling,
            "CPU throttling detected (skipping reductions)".to_string(),
        );
    }

    match classify(p95_ratio) {
        Band::NoData => (CpuDecision::Keep, "no cpu ratio data (keeping)".to_string()),
        Band::Over => (
            CpuDecision::Increase,
            format!("cpu p95 ratio {:.2} > 0.90 (pressure)", p95_ratio),
        ),
        Band::Under => (
            CpuDecision::Reduce,
            format!("cpu p95 ratio {:.2} < 0.60 (overprovisioned)", p95_ratio),
        ),
        Band::Healthy => (
            CpuDecision::Keep,
            format!("cpu p95 ratio {:.2} within healthy band", p95_ratio),
        ),
    }
}
