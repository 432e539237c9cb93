//! Report export — JSON, CSV, and Markdown.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: one line per (configuration, category) cell plus one per Overall row,
//!   accuracies in percent and deltas in percentage points
//! - **Markdown**: human-readable comparison tables
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::compare::to_percentage_points;
use crate::report::{Cell, ComparisonReport, ReportRow, SCHEMA_VERSION};

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_CSV: &str = "report.csv";
pub const REPORT_MARKDOWN: &str = "report.md";

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &ComparisonReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ComparisonReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ComparisonReport> {
    let report: ComparisonReport =
        serde_json::from_str(json).context("failed to deserialize ComparisonReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

const CSV_HEADER: [&str; 23] = [
    "configuration",
    "category",
    "is_baseline",
    "is_target",
    "n",
    "mean_pct",
    "std_dev_pct",
    "ci_lower_pct",
    "ci_upper_pct",
    "small_sample",
    "min_pct",
    "max_pct",
    "coefficient_of_variation",
    "high_relative_variance",
    "wide_range",
    "delta_pp",
    "cohens_d",
    "effect_magnitude",
    "ci_verdict",
    "p_value",
    "adjusted_p",
    "fdr_significant",
    "unavailable",
];

/// Empty fields mean "not applicable" or "unavailable"; the last column
/// carries the reasons.
pub fn export_csv(report: &ComparisonReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for row in &report.rows {
        wtr.write_record(csv_cells(row))?;
    }

    for overall in &report.overall {
        let mut record = vec![String::new(); CSV_HEADER.len()];
        record[0] = overall.configuration.to_string();
        record[1] = "overall".to_string();
        record[2] = overall.is_baseline.to_string();
        record[4] = overall.runs.to_string();
        record[5] = opt_pct(overall.mean_accuracy.value().copied());
        let delta = overall.delta.as_ref();
        record[15] = opt_pct(delta.and_then(|c| c.value()).copied());
        let reasons: Vec<&str> = std::iter::once(overall.mean_accuracy.reason())
            .chain(std::iter::once(delta.and_then(Cell::reason)))
            .flatten()
            .collect();
        record[22] = reasons.join("; ");
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn csv_cells(row: &ReportRow) -> Vec<String> {
    let stat = row.aggregate.value();
    let ci = stat.and_then(|s| s.ci);
    let flags = row.variance.as_ref();
    let comparison = row.comparison.as_ref();
    let effect = comparison.and_then(|c| c.effect_size.value());
    let welch = comparison.and_then(|c| c.welch.value());
    let fdr = comparison.and_then(|c| c.fdr.as_ref());

    let mut reasons: Vec<&str> = Vec::new();
    reasons.extend(row.aggregate.reason());
    if let Some(c) = comparison {
        reasons.extend(c.delta.reason());
        reasons.extend(c.effect_size.reason());
        reasons.extend(c.welch.reason());
    }
    reasons.dedup();

    vec![
        row.configuration.to_string(),
        row.category.to_string(),
        row.is_baseline.to_string(),
        row.is_target.to_string(),
        stat.map(|s| s.n.to_string()).unwrap_or_default(),
        opt_pct(stat.map(|s| s.mean)),
        opt_pct(stat.and_then(|s| s.std_dev)),
        opt_pct(ci.map(|c| c.lower)),
        opt_pct(ci.map(|c| c.upper)),
        ci.map(|c| c.small_sample.to_string()).unwrap_or_default(),
        opt_pct(stat.map(|s| s.min)),
        opt_pct(stat.map(|s| s.max)),
        flags
            .and_then(|f| f.coefficient_of_variation)
            .map(|v| format!("{v:.4}"))
            .unwrap_or_default(),
        flags
            .map(|f| f.high_relative_variance.to_string())
            .unwrap_or_default(),
        flags.map(|f| f.wide_range.to_string()).unwrap_or_default(),
        opt_pct(comparison.and_then(|c| c.delta.value()).copied()),
        effect.map(|e| format!("{:.4}", e.d)).unwrap_or_default(),
        effect.map(|e| e.magnitude.to_string()).unwrap_or_default(),
        comparison
            .and_then(|c| c.ci_verdict)
            .map(|v| v.to_string())
            .unwrap_or_default(),
        welch.map(|w| format!("{:.6}", w.p_value)).unwrap_or_default(),
        fdr.map(|f| format!("{:.6}", f.adjusted_p)).unwrap_or_default(),
        fdr.map(|f| f.significant.to_string()).unwrap_or_default(),
        reasons.join("; "),
    ]
}

fn opt_pct(fraction: Option<f64>) -> String {
    fraction
        .map(|f| format!("{:.2}", to_percentage_points(f)))
        .unwrap_or_default()
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn export_markdown(report: &ComparisonReport) -> String {
    let mut md = String::with_capacity(4096);

    md.push_str("# Configuration Comparison Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Baseline | {} |\n", report.baseline));
    md.push_str(&format!(
        "| Confidence Level | {:.0}% |\n",
        report.confidence_level * 100.0
    ));
    md.push_str(&format!("| FDR Alpha | {} |\n", report.fdr_alpha));
    md.push_str(&format!(
        "| Variance Thresholds | CoV > {}, range > {:.1} pp |\n",
        report.variance_thresholds.max_coefficient_of_variation,
        to_percentage_points(report.variance_thresholds.max_range)
    ));
    md.push_str(&format!("| Campaign Hash | {} |\n", report.campaign_hash));
    md.push('\n');

    push_accuracy_table(&mut md, report);
    push_delta_table(&mut md, report);
    push_leaders(&mut md, report);
    push_abstention(&mut md, report);
    push_variance_flags(&mut md, report);

    if !report.errors.is_empty() {
        md.push_str("## Unavailable Cells\n\n");
        for err in &report.errors {
            md.push_str(&format!("- {err}\n"));
        }
        md.push('\n');
    }

    md
}

fn table_header(md: &mut String, first: &str, report: &ComparisonReport) {
    md.push_str(&format!("| {first} |"));
    for cat in &report.categories {
        md.push_str(&format!(" {cat} |"));
    }
    md.push_str(" Overall |\n");
    md.push_str("| --- |");
    for _ in &report.categories {
        md.push_str(" ---: |");
    }
    md.push_str(" ---: |\n");
}

fn push_accuracy_table(md: &mut String, report: &ComparisonReport) {
    md.push_str("## Accuracy (mean ± CI half-width, %)\n\n");
    table_header(md, "Configuration", report);
    for cfg in &report.configurations {
        let label = if cfg == &report.baseline {
            format!("{cfg} (baseline)")
        } else {
            cfg.to_string()
        };
        md.push_str(&format!("| {label} |"));
        for row in report.rows_for(cfg) {
            let text = match row.aggregate.value() {
                Some(stat) => match stat.ci {
                    Some(ci) => format!(
                        "{:.2} ± {:.2}{}",
                        to_percentage_points(stat.mean),
                        to_percentage_points(ci.upper - stat.mean),
                        if ci.small_sample { " †" } else { "" }
                    ),
                    None => format!("{:.2}", to_percentage_points(stat.mean)),
                },
                None => "unavailable".to_string(),
            };
            let marker = if row.is_target { " *" } else { "" };
            md.push_str(&format!(" {text}{marker} |"));
        }
        let overall = report
            .overall_for(cfg)
            .and_then(|o| o.mean_accuracy.value())
            .map_or("unavailable".to_string(), |m| {
                format!("{:.2}", to_percentage_points(*m))
            });
        md.push_str(&format!(" {overall} |\n"));
    }
    md.push_str("\n`*` target category, `†` fewer runs than the normal-approximation minimum.\n\n");
}

fn push_delta_table(md: &mut String, report: &ComparisonReport) {
    md.push_str("## Delta vs Baseline (pp, Cohen's d)\n\n");
    table_header(md, "Configuration", report);
    for cfg in report.configurations.iter().filter(|c| *c != &report.baseline) {
        md.push_str(&format!("| {cfg} |"));
        for row in report.rows_for(cfg) {
            let text = match row.comparison.as_ref() {
                Some(c) => match (c.delta.value(), c.effect_size.value()) {
                    (Some(delta), Some(effect)) => format!(
                        "{:+.2} (d={:.2}, {}){}",
                        to_percentage_points(*delta),
                        effect.d,
                        effect.magnitude,
                        if c.fdr.is_some_and(|f| f.significant) {
                            " ✓"
                        } else {
                            ""
                        }
                    ),
                    (Some(delta), None) => format!("{:+.2}", to_percentage_points(*delta)),
                    _ => "unavailable".to_string(),
                },
                None => String::new(),
            };
            md.push_str(&format!(" {text} |"));
        }
        let overall = report
            .overall_for(cfg)
            .and_then(|o| o.delta.as_ref())
            .and_then(|d| d.value())
            .map_or("unavailable".to_string(), |d| {
                format!("{:+.2}", to_percentage_points(*d))
            });
        md.push_str(&format!(" {overall} |\n"));
    }
    md.push_str("\n`✓` significant after Benjamini–Hochberg adjustment.\n\n");
}

fn push_leaders(md: &mut String, report: &ComparisonReport) {
    md.push_str("## Best Configuration per Category\n\n");
    md.push_str("| Category | Configuration | Mean (%) | Delta (pp) |\n");
    md.push_str("| --- | --- | ---: | ---: |\n");
    for entry in &report.leaders {
        match &entry.leader {
            Some(leader) => md.push_str(&format!(
                "| {} | {} | {:.2} | {} |\n",
                entry.category,
                leader.configuration,
                to_percentage_points(leader.mean),
                leader
                    .delta
                    .map_or("n/a".to_string(), |d| format!("{:+.2}", to_percentage_points(d)))
            )),
            None => md.push_str(&format!("| {} | n/a | | |\n", entry.category)),
        }
    }
    md.push('\n');
}

fn push_abstention(md: &mut String, report: &ComparisonReport) {
    let Some(first) = report.abstention.first() else {
        return;
    };
    if first.categories.is_empty() {
        return;
    }

    md.push_str("## Correctly Empty Responses (mean per run)\n\n");
    md.push_str("| Configuration |");
    for count in &first.categories {
        md.push_str(&format!(" {} |", count.category));
    }
    md.push_str(" Total |\n| --- |");
    for _ in &first.categories {
        md.push_str(" ---: |");
    }
    md.push_str(" ---: |\n");

    for summary in &report.abstention {
        md.push_str(&format!("| {} |", summary.configuration));
        for count in &summary.categories {
            md.push_str(&format!(" {} |", fmt_count(count.mean_correctly_empty)));
        }
        md.push_str(&format!(" {} |\n", fmt_count(summary.total)));
    }
    md.push('\n');
}

fn fmt_count(value: Option<f64>) -> String {
    value.map_or("n/a".to_string(), |v| format!("{v:.1}"))
}

fn push_variance_flags(md: &mut String, report: &ComparisonReport) {
    let flagged: Vec<&ReportRow> = report
        .rows
        .iter()
        .filter(|r| r.variance.is_some_and(|f| f.any()))
        .collect();
    if flagged.is_empty() {
        return;
    }

    md.push_str("## High Variance Cells\n\n");
    md.push_str("| Configuration | Category | CoV | Range (pp) | Flags |\n");
    md.push_str("| --- | --- | ---: | ---: | --- |\n");
    for row in flagged {
        let Some(flags) = row.variance else {
            continue;
        };
        let mut labels = Vec::new();
        if flags.high_relative_variance {
            labels.push("cov");
        }
        if flags.wide_range {
            labels.push("range");
        }
        md.push_str(&format!(
            "| {} | {} | {} | {:.2} | {} |\n",
            row.configuration,
            row.category,
            flags
                .coefficient_of_variation
                .map_or("n/a".to_string(), |c| format!("{c:.3}")),
            to_percentage_points(flags.range),
            labels.join(", ")
        ));
    }
    md.push('\n');
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `report.json`, `report.csv` and `report.md` into `output_dir`.
pub fn save_report(report: &ComparisonReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create report dir: {}", output_dir.display()))?;

    let json = export_json(report)?;
    std::fs::write(output_dir.join(REPORT_JSON), &json)
        .with_context(|| format!("failed to write {REPORT_JSON}"))?;

    let csv = export_csv(report)?;
    std::fs::write(output_dir.join(REPORT_CSV), &csv)
        .with_context(|| format!("failed to write {REPORT_CSV}"))?;

    std::fs::write(output_dir.join(REPORT_MARKDOWN), export_markdown(report))
        .with_context(|| format!("failed to write {REPORT_MARKDOWN}"))?;

    Ok(output_dir.to_path_buf())
}

/// Load a report from a directory written by [`save_report`].
pub fn load_report(dir: &Path) -> Result<ComparisonReport> {
    let path = dir.join(REPORT_JSON);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
