//! Signal correlation
//!
//! Joins independently fetched signal sets into one record per container.
//! The memory-request set is the anchor: only containers with an observed
//! memory request produce a record. Every other signal is optional per
//! container and falls back to its zero value.

use crate::models::{EntityKey, KeyLabels, Sample, SignalKind};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Values of exactly one signal kind, keyed by container identity
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet<T> {
    values: BTreeMap<EntityKey, T>,
    duplicates: usize,
    unkeyed: usize,
}

impl<T> Default for SignalSet<T> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            duplicates: 0,
            unkeyed: 0,
        }
    }
}

impl<T: Copy + Default> SignalSet<T> {
    /// Collapse samples into a set, converting each raw value with `convert`.
    ///
    /// A key seen twice keeps the later sample. Samples without a complete
    /// key are skipped.
    pub fn from_samples<F>(samples: Vec<Sample>, labels: &KeyLabels, convert: F) -> Self
    where
        F: Fn(f64) -> T,
    {
        let mut set = Self::default();

        for sample in samples {
            match EntityKey::from_labels(&sample.labels, labels) {
                Some(key) => {
                    if set.values.insert(key, convert(sample.value)).is_some() {
                        set.duplicates += 1;
                    }
                }
                None => set.unkeyed += 1,
            }
        }

        set
    }

    /// Value for `key`, or the dimension's zero value when absent
    pub fn get_or_zero(&self, key: &EntityKey) -> T {
        self.values.get(key).copied().unwrap_or_default()
    }
}

impl<T> SignalSet<T> {
    pub fn get(&self, key: &EntityKey) -> Option<&T> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &T)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of samples that overwrote an earlier one with the same key
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Number of samples dropped for lacking a complete key
    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}

/// OOM flag: the last-terminated-reason gauge reached 1 in the lookback window
pub fn oom_flag(value: f64) -> bool {
    value >= 1.0
}

/// Throttle flag: any throttled time in the usage window
pub fn throttle_flag(value: f64) -> bool {
    value > 0.0
}

/// Byte counts are truncated toward zero
pub fn whole_bytes(value: f64) -> i64 {
    value as i64
}

/// All eight signal sets of one run
#[derive(Debug, Clone, Default)]
pub struct SignalBundle {
    pub mem_ratio: SignalSet<f64>,
    pub cpu_ratio: SignalSet<f64>,
    pub mem_request: SignalSet<i64>,
    pub cpu_request: SignalSet<f64>,
    pub oom_killed: SignalSet<bool>,
    pub cpu_throttled: SignalSet<bool>,
    pub jvm_heap_ratio: SignalSet<f64>,
    pub jvm_non_heap: SignalSet<i64>,
}

impl SignalBundle {
    /// Build every set from raw samples. Missing signal kinds become empty sets.
    pub fn from_samples(mut samples: HashMap<SignalKind, Vec<Sample>>, labels: &KeyLabels) -> Self {
        let mut take = |kind: SignalKind| samples.remove(&kind).unwrap_or_default();
        let ratio = |v: f64| v;

        let bundle = Self {
            mem_ratio: SignalSet::from_samples(take(SignalKind::MemP95Ratio), labels, ratio),
            cpu_ratio: SignalSet::from_samples(take(SignalKind::CpuP95Ratio), labels, ratio),
            mem_request: SignalSet::from_samples(take(SignalKind::MemRequest), labels, whole_bytes),
            cpu_request: SignalSet::from_samples(take(SignalKind::CpuRequest), labels, ratio),
            oom_killed: SignalSet::from_samples(take(SignalKind::OomKilled), labels, oom_flag),
            cpu_throttled: SignalSet::from_samples(
                take(SignalKind::CpuThrottled),
                labels,
                throttle_flag,
            ),
            jvm_heap_ratio: SignalSet::from_samples(take(SignalKind::JvmHeapAfterGc), labels, ratio),
            jvm_non_heap: SignalSet::from_samples(
                take(SignalKind::JvmNonHeapBytes),
                labels,
                whole_bytes,
            ),
        };

        bundle.report_anomalies();
        bundle
    }

    /// (signal, duplicates, unkeyed) for every set
    pub fn quality(&self) -> [(SignalKind, usize, usize); 8] {
        [
            (SignalKind::MemP95Ratio, self.mem_ratio.duplicates(), self.mem_ratio.unkeyed()),
            (SignalKind::CpuP95Ratio, self.cpu_ratio.duplicates(), self.cpu_ratio.unkeyed()),
            (SignalKind::MemRequest, self.mem_request.duplicates(), self.mem_request.unkeyed()),
            (SignalKind::CpuRequest, self.cpu_request.duplicates(), self.cpu_request.unkeyed()),
            (SignalKind::OomKilled, self.oom_killed.duplicates(), self.oom_killed.unkeyed()),
            (
                SignalKind::CpuThrottled,
                self.cpu_throttled.duplicates(),
                self.cpu_throttled.unkeyed(),
            ),
            (
                SignalKind::JvmHeapAfterGc,
                self.jvm_heap_ratio.duplicates(),
                self.jvm_heap_ratio.unkeyed(),
            ),
            (
                SignalKind::JvmNonHeapBytes,
                self.jvm_non_heap.duplicates(),
                self.jvm_non_heap.unkeyed(),
            ),
        ]
    }

    fn report_anomalies(&self) {
        for (signal, duplicates, unkeyed) in self.quality() {
            if duplicates > 0 {
                warn!(
                    signal = %signal,
                    duplicates = duplicates,
                    "Signal returned several rows for the same container, keeping the last"
                );
            }
            if unkeyed > 0 {
                debug!(signal = %signal, unkeyed = unkeyed, "Skipped samples without a complete key");
            }
        }
    }
}

/// Joined signals for one container, before any recommendation is made
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedEntity {
    pub key: EntityKey,
    pub mem_ratio: f64,
    pub cpu_ratio: f64,
    pub mem_request_bytes: i64,
    pub cpu_request_cores: f64,
    pub oom_killed: bool,
    pub cpu_throttled: bool,
    pub jvm_heap_ratio: f64,
    pub jvm_non_heap_bytes: i64,
}

/// Join all signals, anchored on the memory-request set.
///
/// Output is ordered by [`EntityKey`].
pub fn correlate(bundle: &SignalBundle) -> Vec<CorrelatedEntity> {
    bundle
        .mem_request
        .iter()
        .map(|(key, &mem_request_bytes)| CorrelatedEntity {
            key: key.clone(),
            mem_ratio: bundle.mem_ratio.get_or_zero(key),
            cpu_ratio: bundle.cpu_ratio.get_or_zero(key),
            mem_request_bytes,
            cpu_request_cores: bundle.cpu_request.get_or_zero(key),
            oom_killed: bundle.oom_killed.get_or_zero(key),
            cpu_throttled: bundle.cpu_throttled.get_or_zero(key),
            jvm_heap_ratio: bundle.jvm_heap_ratio.get_or_zero(key),
            jvm_non_heap_bytes: bundle.jvm_non_heap.get_or_zero(key),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ns: &str, cluster: &str, container: &str, value: f64) -> Sample {
        let labels = [
            ("namespace", ns),
            ("uw_cluster", cluster),
            ("container", container),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Sample { labels, value }
    }

    fn key(container: &str) -> EntityKey {
        EntityKey::new("ns", "c1", container)
    }

    #[test]
    fn test_signal_set_last_write_wins() {
        let samples = vec![sample("ns", "c1", "app", 0.3), sample("ns", "c1", "app", 0.5)];
        let set = SignalSet::from_samples(samples, &KeyLabels::default(), |v| v);

        assert_eq!(set.len(), 1);
        assert_eq!(set.duplicates(), 1);
        assert_eq!(set.get(&key("app")), Some(&0.5));
    }

    #[test]
    fn test_signal_set_skips_unkeyed_samples() {
        let mut partial = sample("ns", "c1", "app", 1.0);
        partial.labels.remove("uw_cluster");
        let samples = vec![partial, sample("ns", "c1", "worker", 2.0)];

        let set = SignalSet::from_samples(samples, &KeyLabels::default(), |v| v);
        assert_eq!(set.len(), 1);
        assert_eq!(set.unkeyed(), 1);
        assert_eq!(set.get_or_zero(&key("app")), 0.0);
    }

    #[test]
    fn test_bundle_missing_kinds_are_empty() {
        let mut samples = HashMap::new();
        samples.insert(SignalKind::MemRequest, vec![sample("ns", "c1", "app", 512.0)]);

        let bundle = SignalBundle::from_samples(samples, &KeyLabels::default());
        assert!(!bundle.mem_request.is_empty());
        assert!(bundle.cpu_ratio.is_empty());
        assert!(bundle.jvm_non_heap.is_empty());
    }

    #[test]
    fn test_flag_conversions() {
        assert!(oom_flag(1.0));
        assert!(!oom_flag(0.99));
        assert!(throttle_flag(0.001));
        assert!(!throttle_flag(0.0));
        assert_eq!(whole_bytes(1536.9), 1536);
    }

    #[test]
    fn test_correlate_anchors_on_memory_request() {
        let mut samples = HashMap::new();
        samples.insert(SignalKind::MemRequest, vec![sample("ns", "c1", "app", 1073741824.0)]);
        samples.insert(
            SignalKind::CpuP95Ratio,
            vec![sample("ns", "c1", "app", 0.4), sample("ns", "c1", "cpu-only", 0.8)],
        );

        let bundle = SignalBundle::from_samples(samples, &KeyLabels::default());
        let entities = correlate(&bundle);

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].key, key("app"));
        assert_eq!(entities[0].cpu_ratio, 0.4);
    }

    #[test]
    fn test_correlate_zero_fills_missing_signals() {
        let mut samples = HashMap::new();
        samples.insert(SignalKind::MemRequest, vec![sample("ns", "c1", "app", 512.0)]);

        let bundle = SignalBundle::from_samples(samples, &KeyLabels::default());
        let entities = correlate(&bundle);

        assert_eq!(
            entities,
            vec![CorrelatedEntity {
                key: key("app"),
                mem_ratio: 0.0,
                cpu_ratio: 0.0,
                mem_request_bytes: 512,
                cpu_request_cores: 0.0,
                oom_killed: false,
                cpu_throttled: false,
                jvm_heap_ratio: 0.0,
                jvm_non_heap_bytes: 0,
            }]
        );
    }

    #[test]
    fn test_correlate_joins_all_signals() {
        let mut samples = HashMap::new();
        samples.insert(SignalKind::MemRequest, vec![sample("ns", "c1", "app", 2048.0)]);
        samples.insert(SignalKind::MemP95Ratio, vec![sample("ns", "c1", "app", 0.3)]);
        samples.insert(SignalKind::CpuP95Ratio, vec![sample("ns", "c1", "app", 0.7)]);
        samples.insert(SignalKind::CpuRequest, vec![sample("ns", "c1", "app", 0.5)]);
        samples.insert(SignalKind::OomKilled, vec![sample("ns", "c1", "app", 1.0)]);
        samples.insert(SignalKind::CpuThrottled, vec![sample("ns", "c1", "app", 12.5)]);
        samples.insert(SignalKind::JvmHeapAfterGc, vec![sample("ns", "c1", "app", 0.85)]);
        samples.insert(SignalKind::JvmNonHeapBytes, vec![sample("ns", "c1", "app", 700.4)]);

        let bundle = SignalBundle::from_samples(samples, &KeyLabels::default());
        let entity = &correlate(&bundle)[0];

        assert_eq!(entity.mem_ratio, 0.3);
        assert_eq!(entity.cpu_ratio, 0.7);
        assert_eq!(entity.mem_request_bytes, 2048);
        assert_eq!(entity.cpu_request_cores, 0.5);
        assert!(entity.oom_killed);
        assert!(entity.cpu_throttled);
        assert_eq!(entity.jvm_heap_ratio, 0.85);
        assert_eq!(entity.jvm_non_heap_bytes, 700);
    }

    #[test]
    fn test_correlate_does_not_match_across_clusters() {
        let mut samples = HashMap::new();
        samples.insert(SignalKind::MemRequest, vec![sample("ns", "c1", "app", 2048.0)]);
        samples.insert(SignalKind::MemP95Ratio, vec![sample("ns", "c2", "app", 0.9)]);

        let bundle = SignalBundle::from_samples(samples, &KeyLabels::default());
        assert_eq!(correlate(&bundle)[0].mem_ratio, 0.0);
    }
}
