//! The `run` command: compute and render recommendations

use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use rightsize_lib::calculator::{millicores_to_cores, MIB};
use rightsize_lib::{
    EngineConfig, EngineMetrics, HttpGateway, KeyLabels, RightsizeEngine, RightsizeParams,
    RightsizeReport, RightsizeResult,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

use crate::config::CliConfig;
use crate::export::{write_csv, write_helm_patch};
use crate::output::{
    color_cpu, color_jvm, color_memory, format_bytes, format_cpu_change, format_mem_change,
    format_ratio, print_info, print_success, print_warning, OutputFormat,
};

/// Arguments for `rightsize run`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Kubernetes namespace
    #[arg(long, default_value = "microservices")]
    pub namespace: String,

    /// Cluster name (value of the cluster label)
    #[arg(long)]
    pub cluster: String,

    /// Usage window (e.g. 24h, 7d)
    #[arg(long, default_value = "24h")]
    pub window: String,

    /// Subquery step (e.g. 1m, 5m, 15m)
    #[arg(long = "sub-step", default_value = "5m")]
    pub sub_step: String,

    /// Lookback window to detect OOM kills
    #[arg(long = "oom-window", default_value = "14d")]
    pub oom_window: String,

    /// Target p95 usage/request ratio
    #[arg(long = "target-util", default_value_t = 0.70)]
    pub target_util: f64,

    /// Safety multiplier for recommendations
    #[arg(long = "safety", default_value_t = 1.15)]
    pub safety: f64,

    /// Round memory recommendations up to this MiB multiple
    #[arg(long = "mem-round-mib", default_value_t = 64)]
    pub mem_round_mib: i64,

    /// Round CPU recommendations up to this millicore multiple
    #[arg(long = "cpu-round-m", default_value_t = 10)]
    pub cpu_round_m: i64,

    /// Limit results to the top K after ranking (0 = unlimited)
    #[arg(long = "topk", default_value_t = 50)]
    pub top_k: usize,

    /// Most overprovisioned first; use --bottom=false for most underprovisioned
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub bottom: bool,

    /// Print the rationale behind every decision
    #[arg(long)]
    pub explain: bool,

    /// Write a CSV report to this path
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write a Helm values patch to this path
    #[arg(long = "helm-patch")]
    pub helm_patch: Option<PathBuf>,

    /// Write engine metrics in Prometheus text format to this path
    #[arg(long = "metrics-file")]
    pub metrics_file: Option<PathBuf>,

    /// Deadline for the whole run (overrides config)
    #[arg(long = "timeout-secs")]
    pub timeout_secs: Option<u64>,
}

impl RunArgs {
    pub fn to_params(&self) -> RightsizeParams {
        RightsizeParams {
            namespace: self.namespace.clone(),
            cluster: self.cluster.clone(),
            window: self.window.clone(),
            subquery_step: self.sub_step.clone(),
            oom_window: self.oom_window.clone(),
            target_util: self.target_util,
            safety_factor: self.safety,
            mem_round_bytes: self.mem_round_mib.saturating_mul(MIB),
            cpu_round_cores: millicores_to_cores(self.cpu_round_m),
            top_k: self.top_k,
            bottom: self.bottom,
        }
    }
}

/// Row for the recommendations table
#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "CONTAINER")]
    container: String,
    #[tabled(rename = "MEM P95")]
    mem_ratio: String,
    #[tabled(rename = "CPU P95")]
    cpu_ratio: String,
    #[tabled(rename = "MEM REQ")]
    mem_request: String,
    #[tabled(rename = "MEM REC")]
    mem_recommended: String,
    #[tabled(rename = "CPU REQ")]
    cpu_request: String,
    #[tabled(rename = "CPU REC")]
    cpu_recommended: String,
    #[tabled(rename = "CPU DECISION")]
    cpu_decision: String,
    #[tabled(rename = "MEM DECISION")]
    memory_decision: String,
    #[tabled(rename = "JVM HEAP")]
    jvm_heap: String,
    #[tabled(rename = "JVM NON-HEAP")]
    jvm_non_heap: String,
}

impl From<&RightsizeResult> for ResultRow {
    fn from(r: &RightsizeResult) -> Self {
        Self {
            container: r.container.clone(),
            mem_ratio: format_ratio(r.mem_p95_ratio),
            cpu_ratio: format_ratio(r.cpu_p95_ratio),
            mem_request: format_bytes(r.mem_request_bytes),
            mem_recommended: format_mem_change(
                r.mem_request_bytes,
                r.mem_recommended_bytes,
                r.memory_decision,
            ),
            cpu_request: format!("{:.2}", r.cpu_request_cores),
            cpu_recommended: format_cpu_change(
                r.cpu_request_cores,
                r.cpu_recommended_cores,
                r.cpu_decision,
            ),
            cpu_decision: color_cpu(r.cpu_decision),
            memory_decision: color_memory(r.memory_decision),
            jvm_heap: color_jvm(r.jvm_heap_decision),
            jvm_non_heap: color_jvm(r.jvm_non_heap_decision),
        }
    }
}

/// Execute one rightsizing run against the configured gateway
pub async fn run(config: &CliConfig, args: &RunArgs, format: OutputFormat) -> Result<()> {
    let params = args.to_params();
    let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(config.timeout_secs));

    let gateway = HttpGateway::with_timeout(&config.gateway_url, timeout)
        .context("Failed to create metrics gateway")?;
    debug!(gateway = %gateway.base_url(), "Using metrics gateway");

    let engine = RightsizeEngine::new(
        Arc::new(gateway),
        EngineConfig {
            max_concurrency: config.max_concurrency,
            key_labels: KeyLabels {
                cluster: config.cluster_label.clone(),
                ..KeyLabels::default()
            },
        },
    );

    let deadline = tokio::time::Instant::now() + timeout;
    let outcome = engine.run(&params, deadline).await;

    // Metrics are worth keeping for failed runs too
    if let Some(path) = &args.metrics_file {
        std::fs::write(path, EngineMetrics::new().render())
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    let report = outcome.context("Rightsizing run failed")?;

    match format {
        OutputFormat::Table => render_table(&report, args.explain),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(path) = &args.csv {
        write_csv(path, &report.results, &report.meta)?;
        print_success(&format!("wrote CSV to {}", path.display()));
    }

    if let Some(path) = &args.helm_patch {
        write_helm_patch(path, &report.results)?;
        print_success(&format!("wrote Helm patch to {}", path.display()));
    }

    Ok(())
}

fn render_table(report: &RightsizeReport, explain: bool) {
    for unavailable in &report.unavailable {
        print_warning(&format!(
            "{} unavailable, treated as no data: {}",
            unavailable.signal, unavailable.reason
        ));
    }

    if report.results.is_empty() {
        print_info(&format!(
            "No containers with memory requests in {}/{}",
            report.meta.cluster, report.meta.namespace
        ));
        return;
    }

    let rows: Vec<ResultRow> = report.results.iter().map(ResultRow::from).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    if explain {
        println!();
        for r in &report.results {
            println!("{}", r.container);
            println!("  memory: {}", r.memory_why);
            println!("  cpu:    {}", r.cpu_why);
            println!("  jvm:    {}", r.jvm_why);
        }
    }
}
