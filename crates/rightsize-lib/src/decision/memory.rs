use super::{classify, Band};
use crate::models::MemoryDecision;

/// Classify the memory dimension. An OOM kill in the lookback window wins.
pub fn decide_memory(p95_ratio: f64, oom_killed: bool) -> (MemoryDecision, String) {
    if oom_killed {
        return (
            MemoryDecision::SkipOom,
            "OOMKilled detected in lookback window".to_string(),
        );
    }

    match classify(p95_ratio) {
        Band::NoData => (MemoryDecision::Keep, "no memory ratio data (keeping)".to_string()),
        Band::Over => (
            MemoryDecision::Increase,
            format!("mem p95 ratio {:.2} > 0.90 (risk)", p95_ratio),
        ),
        Band::Under => (
            MemoryDecision::Reduce,
            format!("mem p95 ratio {:.2} < 0.60 (overprovisioned)", p95_ratio),
        ),
        Band::Healthy => (
            MemoryDecision::Keep,
            format!("mem p95 ratio {:.2} within healthy band", p95_ratio),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oom_overrides_ratio() {
        let (decision, why) = decide_memory(0.2, true);
        assert_eq!(decision, MemoryDecision::SkipOom);
        assert_eq!(why, "OOMKilled detected in lookback window");
    }

    #[test]
    fn test_bands() {
        assert_eq!(decide_memory(0.0, false).0, MemoryDecision::Keep);
        assert_eq!(decide_memory(0.30, false).0, MemoryDecision::Reduce);
        assert_eq!(decide_memory(0.5999, false).0, MemoryDecision::Reduce);
        assert_eq!(decide_memory(0.60, false).0, MemoryDecision::Keep);
        assert_eq!(decide_memory(0.90, false).0, MemoryDecision::Keep);
        assert_eq!(decide_memory(0.9001, false).0, MemoryDecision::Increase);
    }

    #[test]
    fn test_rationale() {
        assert_eq!(decide_memory(0.93, false).1, "mem p95 ratio 0.93 > 0.90 (risk)");
        assert_eq!(decide_memory(-1.0, false).1, "no memory ratio data (keeping)");
    }
}
