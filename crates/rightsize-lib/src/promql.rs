//! Query expressions for each signal
//!
//! Every expression aggregates `by (namespace, container, <cluster label>)` so
//! that the resulting label sets line up with [`crate::models::EntityKey`].

use crate::models::{KeyLabels, RightsizeParams, SignalKind};

/// Build the query expression for one signal.
pub fn query_for(signal: SignalKind, params: &RightsizeParams, labels: &KeyLabels) -> String {
    let scope = Scope::new(params, labels);

    match signal {
        SignalKind::MemP95Ratio => mem_p95_ratio(&scope, &params.window, &params.subquery_step),
        SignalKind::CpuP95Ratio => cpu_p95_ratio(&scope, &params.window, &params.subquery_step),
        SignalKind::MemRequest => requests(&scope, "memory"),
        SignalKind::CpuRequest => requests(&scope, "cpu"),
        SignalKind::OomKilled => oom_killed(&scope, &params.oom_window),
        SignalKind::CpuThrottled => cpu_throttling(&scope, &params.window),
        SignalKind::JvmHeapAfterGc => jvm_heap_after_gc(&scope),
        SignalKind::JvmNonHeapBytes => jvm_non_heap_bytes(&scope),
    }
}

/// Label matchers and grouping shared by all expressions
struct Scope {
    selector: String,
    by: String,
}

impl Scope {
    fn new(params: &RightsizeParams, labels: &KeyLabels) -> Self {
        Self {
            selector: format!(
                r#"{}="{}",{}="{}""#,
                labels.namespace,
                escape(&params.namespace),
                labels.cluster,
                escape(&params.cluster)
            ),
            by: format!(
                "{}, {}, {}",
                labels.namespace, labels.container, labels.cluster
            ),
        }
    }
}

/// Escape a label value for use inside a double-quoted matcher
fn escape(value: &str) -> String {
    value.replace('\\', r"\\").replace('"', "\\\"")
}

fn mem_p95_ratio(scope: &Scope, window: &str, step: &str) -> String {
    format!(
        r#"quantile_over_time(
  0.95,
  (
    avg by ({by}) (
      container_memory_working_set_bytes{{{sel}}}
    )
    /
    avg by ({by}) (
      kube_pod_container_resource_requests{{{sel},resource="memory"}}
    )
  )[{window}:{step}]
)"#,
        by = scope.by,
        sel = scope.selector,
    )
}

fn cpu_p95_ratio(scope: &Scope, window: &str, step: &str) -> String {
    format!(
        r#"quantile_over_time(
  0.95,
  (
    avg by ({by}) (
      rate(container_cpu_usage_seconds_total{{{sel},container!="POD",container!=""}}[5m])
    )
    /
    avg by ({by}) (
      kube_pod_container_resource_requests{{{sel},resource="cpu"}}
    )
  )[{window}:{step}]
)"#,
        by = scope.by,
        sel = scope.selector,
    )
}

fn requests(scope: &Scope, resource: &str) -> String {
    format!(
        r#"avg by ({by}) (
  kube_pod_container_resource_requests{{{sel},resource="{resource}"}}
)"#,
        by = scope.by,
        sel = scope.selector,
    )
}

fn oom_killed(scope: &Scope, window: &str) -> String {
    format!(
        r#"max by ({by}) (
  max_over_time(
    kube_pod_container_status_last_terminated_reason{{{sel},reason="OOMKilled"}}[{window}]
  )
)"#,
        by = scope.by,
        sel = scope.selector,
    )
}

fn cpu_throttling(scope: &Scope, window: &str) -> String {
    format!(
        r#"max by ({by}) (
  increase(
    container_cpu_cfs_throttled_seconds_total{{{sel},container!="POD",container!=""}}[{window}]
  )
)"#,
        by = scope.by,
        sel = scope.selector,
    )
}

fn jvm_heap_after_gc(scope: &Scope) -> String {
    format!(
        r#"avg by ({by}) (
  jvm_memory_usage_after_gc{{{sel},area="heap"}}
)"#,
        by = scope.by,
        sel = scope.selector,
    )
}

fn jvm_non_heap_bytes(scope: &Scope) -> String {
    format!(
        r#"avg by ({by}) (
  jvm_memory_used_bytes{{{sel},area!="heap"}}
)"#,
        by = scope.by,
        sel = scope.selector,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RightsizeParams {
        RightsizeParams {
            namespace: "microservices".to_string(),
            cluster: "prod-eu".to_string(),
            window: "24h".to_string(),
            subquery_step: "5m".to_string(),
            oom_window: "14d".to_string(),
            target_util: 0.7,
            safety_factor: 1.15,
            mem_round_bytes: 64 * 1024 * 1024,
            cpu_round_cores: 0.01,
            top_k: 50,
            bottom: true,
        }
    }

    #[test]
    fn test_every_signal_is_scoped() {
        let labels = KeyLabels::default();
        for signal in SignalKind::ALL {
            let q = query_for(signal, &params(), &labels);
            assert!(
                q.contains(r#"namespace="microservices",uw_cluster="prod-eu""#),
                "{signal} query is not scoped: {q}"
            );
            assert!(q.contains("by (namespace, container, uw_cluster)"));
        }
    }

    #[test]
    fn test_windows_are_applied() {
        let labels = KeyLabels::default();
        let mem = query_for(SignalKind::MemP95Ratio, &params(), &labels);
        assert!(mem.contains("[24h:5m]"));
        assert!(mem.contains(r#"resource="memory""#));

        let oom = query_for(SignalKind::OomKilled, &params(), &labels);
        assert!(oom.contains("[14d]"));
        assert!(oom.contains(r#"reason="OOMKilled""#));

        let throttle = query_for(SignalKind::CpuThrottled, &params(), &labels);
        assert!(throttle.contains("[24h]"));
    }

    #[test]
    fn test_custom_cluster_label() {
        let labels = KeyLabels {
            cluster: "cluster".to_string(),
            ..KeyLabels::default()
        };
        let q = query_for(SignalKind::CpuRequest, &params(), &labels);
        assert!(q.contains(r#"cluster="prod-eu""#));
        assert!(!q.contains("uw_cluster"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let mut p = params();
        p.namespace = r#"ns"x"#.to_string();
        let q = query_for(SignalKind::MemRequest, &p, &KeyLabels::default());
        assert!(q.contains(r#"namespace="ns\"x""#));
    }
}
