//! Core data models for the rightsizing engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Composite identity of one workload container across all signal sets
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub namespace: String,
    pub cluster: String,
    pub container: String,
}

impl EntityKey {
    pub fn new(
        namespace: impl Into<String>,
        cluster: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            cluster: cluster.into(),
            container: container.into(),
        }
    }

    /// Extract the key from a sample's label set.
    ///
    /// Returns `None` when any of the three labels is missing or empty.
    pub fn from_labels(labels: &HashMap<String, String>, names: &KeyLabels) -> Option<Self> {
        let get = |name: &str| labels.get(name).filter(|v| !v.is_empty()).cloned();

        Some(Self {
            namespace: get(&names.namespace)?,
            cluster: get(&names.cluster)?,
            container: get(&names.container)?,
        })
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cluster, self.namespace, self.container)
    }
}

/// Label names that make up an [`EntityKey`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLabels {
    pub namespace: String,
    pub cluster: String,
    pub container: String,
}

impl Default for KeyLabels {
    fn default() -> Self {
        Self {
            namespace: "namespace".to_string(),
            cluster: "uw_cluster".to_string(),
            container: "container".to_string(),
        }
    }
}

/// One data point of one signal for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: HashMap<String, String>,
    pub value: f64,
}

/// The eight signals fetched for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    MemP95Ratio,
    CpuP95Ratio,
    MemRequest,
    CpuRequest,
    OomKilled,
    CpuThrottled,
    JvmHeapAfterGc,
    JvmNonHeapBytes,
}

impl SignalKind {
    pub const ALL: [SignalKind; 8] = [
        SignalKind::MemP95Ratio,
        SignalKind::CpuP95Ratio,
        SignalKind::MemRequest,
        SignalKind::CpuRequest,
        SignalKind::OomKilled,
        SignalKind::CpuThrottled,
        SignalKind::JvmHeapAfterGc,
        SignalKind::JvmNonHeapBytes,
    ];

    /// Mandatory signals abort the run when their fetch fails.
    pub fn is_mandatory(&self) -> bool {
        matches!(
            self,
            SignalKind::MemP95Ratio
                | SignalKind::CpuP95Ratio
                | SignalKind::MemRequest
                | SignalKind::CpuRequest
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::MemP95Ratio => "mem p95 ratio",
            SignalKind::CpuP95Ratio => "cpu p95 ratio",
            SignalKind::MemRequest => "mem requests",
            SignalKind::CpuRequest => "cpu requests",
            SignalKind::OomKilled => "oom killed",
            SignalKind::CpuThrottled => "cpu throttling",
            SignalKind::JvmHeapAfterGc => "jvm heap after gc",
            SignalKind::JvmNonHeapBytes => "jvm non-heap bytes",
        }
    }

    /// Stable identifier used as a metric label
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::MemP95Ratio => "mem_p95_ratio",
            SignalKind::CpuP95Ratio => "cpu_p95_ratio",
            SignalKind::MemRequest => "mem_request",
            SignalKind::CpuRequest => "cpu_request",
            SignalKind::OomKilled => "oom_killed",
            SignalKind::CpuThrottled => "cpu_throttled",
            SignalKind::JvmHeapAfterGc => "jvm_heap_after_gc",
            SignalKind::JvmNonHeapBytes => "jvm_non_heap_bytes",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for one rightsizing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsizeParams {
    pub namespace: String,
    pub cluster: String,
    /// Usage window, e.g. "24h"
    pub window: String,
    /// Subquery resolution, e.g. "5m"
    pub subquery_step: String,
    /// OOM lookback window, e.g. "14d"
    pub oom_window: String,
    /// Target utilization ratio in (0, 1]
    pub target_util: f64,
    /// Safety multiplier applied on top of the target-implied value
    pub safety_factor: f64,
    /// Memory rounding granularity in bytes
    pub mem_round_bytes: i64,
    /// CPU rounding granularity in cores
    pub cpu_round_cores: f64,
    /// Result limit; 0 means unlimited
    pub top_k: usize,
    /// Ascending by memory ratio (most overprovisioned first) when true
    pub bottom: bool,
}

/// Echo of the run's parameters for downstream renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsizeMeta {
    pub namespace: String,
    pub cluster: String,
    pub window: String,
    pub oom_window: String,
    pub target_util: f64,
    pub safety_factor: f64,
    pub subquery_step: String,
    pub mem_round_bytes: i64,
    pub cpu_round_cores: f64,
    pub top_k: usize,
    pub bottom: bool,
    pub generated_at: DateTime<Utc>,
}

impl RightsizeMeta {
    pub fn from_params(params: &RightsizeParams) -> Self {
        Self {
            namespace: params.namespace.clone(),
            cluster: params.cluster.clone(),
            window: params.window.clone(),
            oom_window: params.oom_window.clone(),
            target_util: params.target_util,
            safety_factor: params.safety_factor,
            subquery_step: params.subquery_step.clone(),
            mem_round_bytes: params.mem_round_bytes,
            cpu_round_cores: params.cpu_round_cores,
            top_k: params.top_k,
            bottom: params.bottom,
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CpuDecision {
    Reduce,
    Keep,
    Increase,
    SkipThrottling,
}

impl CpuDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            CpuDecision::Reduce => "REDUCE",
            CpuDecision::Keep => "KEEP",
            CpuDecision::Increase => "INCREASE",
            CpuDecision::SkipThrottling => "SKIP_THROTTLING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryDecision {
    Reduce,
    Keep,
    Increase,
    SkipOom,
}

impl MemoryDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryDecision::Reduce => "REDUCE",
            MemoryDecision::Keep => "KEEP",
            MemoryDecision::Increase => "INCREASE",
            MemoryDecision::SkipOom => "SKIP_OOM",
        }
    }
}

/// JVM heap and non-heap are never recommended down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JvmDecision {
    Keep,
    Increase,
}

impl JvmDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            JvmDecision::Keep => "KEEP",
            JvmDecision::Increase => "INCREASE",
        }
    }
}

macro_rules! impl_display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_via_as_str!(CpuDecision, MemoryDecision, JvmDecision);

/// Recommendation for one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsizeResult {
    pub namespace: String,
    pub cluster: String,
    pub container: String,

    pub mem_p95_ratio: f64,
    pub cpu_p95_ratio: f64,

    pub mem_request_bytes: i64,
    pub cpu_request_cores: f64,

    pub mem_recommended_bytes: i64,
    pub cpu_recommended_cores: f64,

    pub oom_killed: bool,
    pub cpu_throttled: bool,

    pub jvm_heap_after_gc_ratio: f64,
    pub jvm_non_heap_bytes: i64,

    pub memory_decision: MemoryDecision,
    pub cpu_decision: CpuDecision,
    pub jvm_heap_decision: JvmDecision,
    pub jvm_non_heap_decision: JvmDecision,

    /// Recommended minus current
    pub mem_delta_bytes: i64,
    pub cpu_delta_cores: f64,

    pub cpu_why: String,
    pub memory_why: String,
    pub jvm_why: String,
}

impl RightsizeResult {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.namespace, &self.cluster, &self.container)
    }
}

/// A best-effort signal that could not be fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnavailableSignal {
    pub signal: SignalKind,
    pub reason: String,
}

/// Everything a run hands to downstream renderers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RightsizeReport {
    pub results: Vec<RightsizeResult>,
    pub meta: RightsizeMeta,
    pub unavailable: Vec<UnavailableSignal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_from_labels() {
        let l = labels(&[
            ("namespace", "payments"),
            ("uw_cluster", "prod-eu"),
            ("container", "api"),
            ("pod", "api-7d9f"),
        ]);
        let key = EntityKey::from_labels(&l, &KeyLabels::default()).unwrap();
        assert_eq!(key, EntityKey::new("payments", "prod-eu", "api"));
    }

    #[test]
    fn test_key_requires_all_labels() {
        let names = KeyLabels::default();
        let missing = labels(&[("namespace", "payments"), ("container", "api")]);
        assert!(EntityKey::from_labels(&missing, &names).is_none());

        let empty = labels(&[
            ("namespace", "payments"),
            ("uw_cluster", "prod-eu"),
            ("container", ""),
        ]);
        assert!(EntityKey::from_labels(&empty, &names).is_none());
    }

    #[test]
    fn test_key_separator_in_values_does_not_collide() {
        let a = EntityKey::new("a|b", "c", "d");
        let b = EntityKey::new("a", "b|c", "d");
        assert_ne!(a, b);
    }

    #[test]
    fn test_result_key_matches_identity() {
        let key = EntityKey::new("payments", "prod-eu", "api");
        let result = RightsizeResult {
            namespace: "payments".to_string(),
            cluster: "prod-eu".to_string(),
            container: "api".to_string(),
            mem_p95_ratio: 0.4,
            cpu_p95_ratio: 0.4,
            mem_request_bytes: 512,
            cpu_request_cores: 0.5,
            mem_recommended_bytes: 512,
            cpu_recommended_cores: 0.5,
            oom_killed: false,
            cpu_throttled: false,
            jvm_heap_after_gc_ratio: 0.0,
            jvm_non_heap_bytes: 0,
            memory_decision: MemoryDecision::Keep,
            cpu_decision: CpuDecision::Keep,
            jvm_heap_decision: JvmDecision::Keep,
            jvm_non_heap_decision: JvmDecision::Keep,
            mem_delta_bytes: 0,
            cpu_delta_cores: 0.0,
            cpu_why: String::new(),
            memory_why: String::new(),
            jvm_why: String::new(),
        };

        assert_eq!(result.key(), key);
        assert_eq!(result.key().to_string(), "prod-eu/payments/api");
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&CpuDecision::SkipThrottling).unwrap();
        assert_eq!(json, "\"SKIP_THROTTLING\"");
        let json = serde_json::to_string(&MemoryDecision::SkipOom).unwrap();
        assert_eq!(json, "\"SKIP_OOM\"");
        assert_eq!(JvmDecision::Increase.to_string(), "INCREASE");
    }

    #[test]
    fn test_mandatory_signals() {
        let mandatory: Vec<_> = SignalKind::ALL
            .iter()
            .filter(|s| s.is_mandatory())
            .collect();
        assert_eq!(mandatory.len(), 4);
        assert!(!SignalKind::OomKilled.is_mandatory());
        assert!(!SignalKind::JvmNonHeapBytes.is_mandatory());
    }
}
