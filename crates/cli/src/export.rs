//! File exports: CSV report and Helm values patch

use anyhow::{Context, Result};
use rightsize_lib::calculator::MIB;
use rightsize_lib::{RightsizeMeta, RightsizeResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const CSV_HEADER: [&str; 12] = [
    "container",
    "mem_p95_ratio",
    "cpu_p95_ratio",
    "mem_request_bytes",
    "mem_recommended_bytes",
    "cpu_request_cores",
    "cpu_recommended_cores",
    "oom_killed",
    "cpu_decision",
    "memory_decision",
    "jvm_heap_decision",
    "jvm_non_heap_decision",
];

/// Write metadata rows, a blank row, the header, then one row per result
pub fn write_csv(path: &Path, results: &[RightsizeResult], meta: &RightsizeMeta) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let target_util = format!("{:.6}", meta.target_util);
    let safety_factor = format!("{:.6}", meta.safety_factor);
    let generated_at = meta.generated_at.to_rfc3339();
    let mut writer = writer_for(&mut out);
    for (key, value) in [
        ("namespace", meta.namespace.as_str()),
        ("cluster", meta.cluster.as_str()),
        ("window", meta.window.as_str()),
        ("oom_window", meta.oom_window.as_str()),
        ("target_util", target_util.as_str()),
        ("safety_factor", safety_factor.as_str()),
        ("generated_at", generated_at.as_str()),
    ] {
        writer.write_record([key, value])?;
    }
    writer.flush()?;
    drop(writer);
    // csv quotes an empty record, so the separator row is written raw
    out.write_all(b"\n")?;

    let mut writer = writer_for(&mut out);
    writer.write_record(CSV_HEADER)?;
    for r in results {
        writer.write_record([
            r.container.clone(),
            format!("{:.6}", r.mem_p95_ratio),
            format!("{:.6}", r.cpu_p95_ratio),
            r.mem_request_bytes.to_string(),
            r.mem_recommended_bytes.to_string(),
            format!("{:.6}", r.cpu_request_cores),
            format!("{:.6}", r.cpu_recommended_cores),
            r.oom_killed.to_string(),
            r.cpu_decision.to_string(),
            r.memory_decision.to_string(),
            r.jvm_heap_decision.to_string(),
            r.jvm_non_heap_decision.to_string(),
        ])?;
    }

    writer.flush()?;
    drop(writer);
    out.flush()?;
    Ok(())
}

fn writer_for<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().flexible(true).from_writer(out)
}

/// Write a Helm values snippet keyed by `services.<container>.resources.requests`
pub fn write_helm_patch(path: &Path, results: &[RightsizeResult]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let mut sorted: Vec<&RightsizeResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.container.cmp(&b.container));

    writeln!(out, "# rightsize-generated Helm values snippet")?;
    writeln!(out, "# Merge this into your chart values (or adapt to your chart schema).")?;
    writeln!(out, "services:")?;
    for r in sorted {
        writeln!(out, "  {}:", r.container)?;
        writeln!(out, "    resources:")?;
        writeln!(out, "      requests:")?;
        writeln!(out, "        cpu: \"{}\"", cpu_quantity(r.cpu_recommended_cores))?;
        writeln!(out, "        memory: \"{}\"", memory_quantity(r.mem_recommended_bytes))?;
    }

    out.flush()?;
    Ok(())
}

/// Cores as a millicore quantity, e.g. `250m`
pub fn cpu_quantity(cores: f64) -> String {
    format!("{}m", (cores * 1000.0).round() as i64)
}

/// Bytes as a MiB quantity rounded up, e.g. `512Mi`
pub fn memory_quantity(bytes: i64) -> String {
    format!("{}Mi", (bytes + MIB - 1).div_euclid(MIB))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rightsize_lib::{CpuDecision, JvmDecision, MemoryDecision, RightsizeParams};

    fn result(container: &str, mem_rec: i64, cpu_rec: f64) -> RightsizeResult {
        RightsizeResult {
            namespace: "microservices".to_string(),
            cluster: "prod-eu".to_string(),
            container: container.to_string(),
            mem_p95_ratio: 0.31,
            cpu_p95_ratio: 0.42,
            mem_request_bytes: 1024 * MIB,
            cpu_request_cores: 0.5,
            mem_recommended_bytes: mem_rec,
            cpu_recommended_cores: cpu_rec,
            oom_killed: false,
            cpu_throttled: false,
            jvm_heap_after_gc_ratio: 0.0,
            jvm_non_heap_bytes: 0,
            memory_decision: MemoryDecision::Reduce,
            cpu_decision: CpuDecision::Reduce,
            jvm_heap_decision: JvmDecision::Keep,
            jvm_non_heap_decision: JvmDecision::Keep,
            mem_delta_bytes: mem_rec - 1024 * MIB,
            cpu_delta_cores: cpu_rec - 0.5,
            cpu_why: String::new(),
            memory_why: String::new(),
            jvm_why: String::new(),
        }
    }

    fn meta() -> RightsizeMeta {
        RightsizeMeta::from_params(&RightsizeParams {
            namespace: "microservices".to_string(),
            cluster: "prod-eu".to_string(),
            window: "24h".to_string(),
            subquery_step: "5m".to_string(),
            oom_window: "14d".to_string(),
            target_util: 0.7,
            safety_factor: 1.15,
            mem_round_bytes: 64 * MIB,
            cpu_round_cores: 0.01,
            top_k: 50,
            bottom: true,
        })
    }

    #[test]
    fn test_quantities() {
        assert_eq!(cpu_quantity(0.35), "350m");
        assert_eq!(cpu_quantity(1.0), "1000m");
        assert_eq!(memory_quantity(512 * MIB), "512Mi");
        assert_eq!(memory_quantity(512 * MIB + 1), "513Mi");
    }

    #[test]
    fn test_write_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        write_csv(&path, &[result("checkout", 512 * MIB, 0.35)], &meta()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "namespace,microservices");
        assert_eq!(lines[1], "cluster,prod-eu");
        assert_eq!(lines[4], "target_util,0.700000");
        assert_eq!(lines[7], "");
        assert!(lines[8].starts_with("container,mem_p95_ratio,"));
        assert!(lines[9].starts_with("checkout,0.310000,0.420000,1073741824,536870912,"));
        assert!(lines[9].ends_with("false,REDUCE,REDUCE,KEEP,KEEP"));
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn test_write_helm_patch_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.yaml");

        let results = vec![
            result("payments", 768 * MIB, 0.25),
            result("checkout", 512 * MIB, 0.35),
        ];
        write_helm_patch(&path, &results).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let checkout = text.find("  checkout:").unwrap();
        let payments = text.find("  payments:").unwrap();
        assert!(checkout < payments);
        assert!(text.contains("        cpu: \"350m\"\n        memory: \"512Mi\""));
        assert!(text.contains("        cpu: \"250m\"\n        memory: \"768Mi\""));
    }
}
