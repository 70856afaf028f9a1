//! Rightsizing run orchestration
//!
//! A run fetches all eight signals concurrently, joins them per container,
//! computes recommendations and decisions, then ranks the result set.
//! Everything after the fetch barrier is synchronous and pure.

mod fetch;


use crate::calculator::{recommend_cpu, recommend_memory};
use crate::correlator::{correlate, CorrelatedEntity, SignalBundle};
use crate::decision::{
    decide_cpu, decide_jvm_heap, decide_jvm_non_heap, decide_memory, jvm_rationale,
};
use crate::error::{Result, RightsizeError};
use crate::gateway::MetricsGateway;
use crate::models::{KeyLabels, RightsizeMeta, RightsizeParams, RightsizeReport, RightsizeResult};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::ranker::rank;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::warn;

/// Upper bound on signal fetches in flight at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Settings that belong to the deployment rather than to one run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrent backend queries (at least 1)
    pub max_concurrency: usize,
    /// Label names forming the container identity
    pub key_labels: KeyLabels,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            key_labels: KeyLabels::default(),
        }
    }
}

/// Runs the full signal → recommendation pipeline against a gateway
pub struct RightsizeEngine {
    gateway: Arc<dyn MetricsGateway>,
    config: EngineConfig,
    metrics: EngineMetrics,
}

impl RightsizeEngine {
    pub fn new(gateway: Arc<dyn MetricsGateway>, config: EngineConfig) -> Self {
        Self {
            gateway,
            config,
            metrics: EngineMetrics::new(),
        }
    }

    /// Execute one run. Every backend query must finish before `deadline`.
    ///
    /// A failed mandatory signal aborts the run with that signal's error.
    /// A failed best-effort signal is reported in
    /// [`RightsizeReport::unavailable`] and treated as no data.
    pub async fn run(&self, params: &RightsizeParams, deadline: Instant) -> Result<RightsizeReport> {
        validate_params(params)?;

        let started = std::time::Instant::now();
        let meta = RightsizeMeta::from_params(params);
        let logger = StructuredLogger::new(&params.cluster);
        logger.log_run_started(params);

        let fetched = match self.fetch_all(params, deadline, &logger).await {
            Ok(fetched) => fetched,
            Err(err) => {
                logger.log_run_failed(&err);
                return Err(err);
            }
        };
        for unavailable in &fetched.unavailable {
            logger.log_signal_unavailable(unavailable);
        }

        let bundle = SignalBundle::from_samples(fetched.samples, &self.config.key_labels);
        if bundle.mem_request.is_empty() {
            warn!(
                cluster = %params.cluster,
                namespace = %params.namespace,
                "No memory requests matched, run yields no results"
            );
        }
        for (signal, duplicates, _) in bundle.quality() {
            if duplicates > 0 {
                self.metrics.add_duplicate_keys(signal, duplicates);
            }
        }

        let results: Vec<RightsizeResult> = correlate(&bundle)
            .into_iter()
            .map(|entity| build_result(entity, params))
            .collect();
        let results = rank(results, params.bottom, params.top_k);

        for result in &results {
            logger.log_recommendation(result);
        }
        self.metrics.set_results(results.len());
        logger.log_run_completed(results.len(), fetched.unavailable.len(), started.elapsed());

        Ok(RightsizeReport {
            results,
            meta,
            unavailable: fetched.unavailable,
        })
    }
}

/// Turn one joined container record into a recommendation.
///
/// An OOM kill pins both recommendations to the current requests.
pub fn build_result(entity: CorrelatedEntity, params: &RightsizeParams) -> RightsizeResult {
    let (mem_recommended_bytes, cpu_recommended_cores) = if entity.oom_killed {
        (entity.mem_request_bytes, entity.cpu_request_cores)
    } else {
        (
            recommend_memory(
                entity.mem_request_bytes,
                entity.mem_ratio,
                params.target_util,
                params.safety_factor,
                params.mem_round_bytes,
            ),
            recommend_cpu(
                entity.cpu_request_cores,
                entity.cpu_ratio,
                params.target_util,
                params.safety_factor,
                params.cpu_round_cores,
            ),
        )
    };

    let (memory_decision, memory_why) = decide_memory(entity.mem_ratio, entity.oom_killed);
    let (cpu_decision, cpu_why) = decide_cpu(entity.cpu_ratio, entity.cpu_throttled);
    let (jvm_heap_decision, heap_why) = decide_jvm_heap(entity.jvm_heap_ratio);
    let (jvm_non_heap_decision, non_heap_why) =
        decide_jvm_non_heap(entity.jvm_non_heap_bytes, entity.mem_request_bytes);

    RightsizeResult {
        namespace: entity.key.namespace,
        cluster: entity.key.cluster,
        container: entity.key.container,
        mem_p95_ratio: entity.mem_ratio,
        cpu_p95_ratio: entity.cpu_ratio,
        mem_request_bytes: entity.mem_request_bytes,
        cpu_request_cores: entity.cpu_request_cores,
        mem_recommended_bytes,
        cpu_recommended_cores,
        oom_killed: entity.oom_killed,
        cpu_throttled: entity.cpu_throttled,
        jvm_heap_after_gc_ratio: entity.jvm_heap_ratio,
        jvm_non_heap_bytes: entity.jvm_non_heap_bytes,
        memory_decision,
        cpu_decision,
        jvm_heap_decision,
        jvm_non_heap_decision,
        mem_delta_bytes: mem_recommended_bytes.saturating_sub(entity.mem_request_bytes),
        cpu_delta_cores: cpu_recommended_cores - entity.cpu_request_cores,
        cpu_why,
        memory_why,
        jvm_why: jvm_rationale(&heap_why, &non_heap_why),
    }
}

/// Reject parameters the calculator cannot work with
pub fn validate_params(params: &RightsizeParams) -> Result<()> {
    let invalid = |msg: String| Err(RightsizeError::InvalidParams(msg));

    for (name, value) in [
        ("namespace", &params.namespace),
        ("cluster", &params.cluster),
        ("window", &params.window),
        ("subquery_step", &params.subquery_step),
        ("oom_window", &params.oom_window),
    ] {
        if value.trim().is_empty() {
            return invalid(format!("{name} must not be empty"));
        }
    }

    if !(params.target_util > 0.0 && params.target_util <= 1.0) {
        return invalid(format!(
            "target_util must be in (0, 1], got {}",
            params.target_util
        ));
    }
    if !(params.safety_factor.is_finite() && params.safety_factor >= 0.0) {
        return invalid(format!(
            "safety_factor must be >= 0, got {}",
            params.safety_factor
        ));
    }
    if params.mem_round_bytes <= 0 {
        return invalid(format!(
            "mem_round_bytes must be > 0, got {}",
            params.mem_round_bytes
        ));
    }
    if !(params.cpu_round_cores.is_finite() && params.cpu_round_cores > 0.0) {
        return invalid(format!(
            "cpu_round_cores must be > 0, got {}",
            params.cpu_round_cores
        ));
    }

    Ok(())
}
