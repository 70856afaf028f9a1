//! Recommendation arithmetic
//!
//! Both dimensions share one formula:
//!
//! ```text
//! factor      = (observed_ratio / target_util) * safety_factor
//! recommended = ceil(current * factor / granularity) * granularity
//! ```
//!
//! Rounding always goes up. Absent data (non-positive current, ratio or
//! target) passes the current value through unchanged.

pub const MIB: i64 = 1024 * 1024;

/// Recommended memory request in bytes, a multiple of `round_bytes`.
pub fn recommend_memory(
    current_bytes: i64,
    ratio: f64,
    target: f64,
    safety: f64,
    round_bytes: i64,
) -> i64 {
    if current_bytes <= 0 || ratio <= 0.0 || target <= 0.0 || round_bytes <= 0 {
        return current_bytes;
    }

    let reco = current_bytes as f64 * scale_factor(ratio, target, safety);
    let steps = (reco / round_bytes as f64).ceil();

    // `as` saturates; clamp so the product stays a representable multiple
    let steps = (steps as i64).min(i64::MAX / round_bytes);
    steps * round_bytes
}

/// Recommended CPU request in cores, a multiple of `round_cores`.
pub fn recommend_cpu(current_cores: f64, ratio: f64, target: f64, safety: f64, round_cores: f64) -> f64 {
    if current_cores <= 0.0 || ratio <= 0.0 || target <= 0.0 || round_cores <= 0.0 {
        return current_cores;
    }

    let reco = current_cores * scale_factor(ratio, target, safety);
    (reco / round_cores).ceil() * round_cores
}

fn scale_factor(ratio: f64, target: f64, safety: f64) -> f64 {
    (ratio / target) * safety
}

/// Convert a millicore granularity to cores
pub fn millicores_to_cores(millicores: i64) -> f64 {
    millicores as f64 / 1000.0
}
