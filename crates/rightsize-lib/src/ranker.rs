//! Result ordering and truncation

use crate::models::RightsizeResult;

/// Order results by memory p95 ratio and keep at most `top_k` of them.
///
/// `bottom` sorts ascending (most overprovisioned first). The sort is stable,
/// so equal ratios keep their incoming order. A `top_k` of zero keeps all.
pub fn rank(mut results: Vec<RightsizeResult>, bottom: bool, top_k: usize) -> Vec<RightsizeResult> {
    results.sort_by(|a, b| {
        let ord = a.mem_p95_ratio.total_cmp(&b.mem_p95_ratio);
        if bottom {
            ord
        } else {
            ord.reverse()
        }
    });

    if top_k > 0 {
        results.truncate(top_k);
    }

    results
}
