//! Terminal formatting of fit results.
//!
//! We keep formatting code in one place so the fitting code stays free of
//! presentation concerns.

use crate::engine::CommandLine;
use crate::fit::FittedOutput;
use crate::io::export::ParamStats;
use crate::report::{failed_samples, param_stats};

/// Format a short run summary (command, layout, parameter table).
pub fn format_fit_summary(output: &dyn FittedOutput, input: &str) -> String {
    let report = output.report();
    let layout = &report.layout;
    let n_samples = output.params().values.nrows();
    let mut out = String::new();

    out.push_str(&format!(
        "=== mlite - {} fit ({}) ===\n",
        output.family().to_uppercase(),
        output.model_name()
    ));
    out.push_str(&format!("Input: {input}\n"));
    out.push_str(&format!(
        "Samples: n={} | failed={} | zeroed on input={}\n",
        n_samples,
        failed_samples(output.error_codes()).len(),
        report.sanitized.rows.len()
    ));
    out.push_str(&format!(
        "Columns: errors={} residual={} iauc={} params={} ct_mod={} ct_sig={} (total {})\n",
        layout.blocks.error_codes,
        layout.blocks.residual,
        layout.blocks.iauc,
        layout.params,
        layout.blocks.modelled,
        layout.blocks.signal_derived,
        layout.total_width()
    ));
    if let Some(path) = &report.kept_result {
        out.push_str(&format!("Result file: {}\n", path.display()));
    }

    out.push_str("\nParameters (successful fits):\n");
    out.push_str(&format_stats_table(&param_stats(output.params(), output.error_codes())));
    out
}

/// Format the command a dry run would execute.
pub fn format_dry_run(cmd: &CommandLine) -> String {
    let mut out = String::new();
    out.push_str("Dry run - command not executed:\n");
    out.push_str(&cmd.to_string());
    out.push('\n');
    out
}

fn format_stats_table(stats: &[ParamStats]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:>6} {:>12} {:>12} {:>12} {:>12}",
            "param", "n", "mean", "median", "min", "max"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<10} {:-<6} {:-<12} {:-<12} {:-<12} {:-<12}\n",
        "", "", "", "", "", ""
    ));

    for s in stats {
        out.push_str(&format!(
            "{:<10} {:>6} {:>12} {:>12} {:>12} {:>12}\n",
            truncate(&s.name, 10),
            s.n,
            fmt_num(s.mean),
            fmt_num(s.median),
            fmt_num(s.min),
            fmt_num(s.max),
        ));
    }
    out
}

/// Fixed notation for ordinary magnitudes, scientific for tiny/huge ones.
fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e6).contains(&a) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
