// logveil/src/ui/summary.rs
//! Human-readable summaries of runs, reconstructions and audits.
//!
//! Summaries never contain original field values; they are built from
//! counters and anonymized-side metrics only.

use std::io::Write;

use anyhow::Result;
use logveil_core::{ColumnAudit, ReconstructionOutput, RunReport};

use crate::ui::theme::{paint, ThemeEntry, ThemeMap};

fn row<W: Write>(out: &mut W, label: &str, value: impl ToString, theme: &ThemeMap, colors: bool) -> Result<()> {
    writeln!(
        out,
        "  {:<22} {}",
        paint(label, ThemeEntry::SummaryField, theme, colors),
        paint(&value.to_string(), ThemeEntry::SummaryCount, theme, colors)
    )?;
    Ok(())
}

/// Prints the summary of an `anonymize` run.
pub fn print_run_summary<W: Write>(report: &RunReport, out: &mut W, theme: &ThemeMap, colors: bool) -> Result<()> {
    writeln!(
        out,
        "{}",
        paint(&format!("Anonymization summary ({})", report.format), ThemeEntry::Header, theme, colors)
    )?;
    row(out, "Lines", report.lines_total, theme, colors)?;
    row(out, "Records", report.records, theme, colors)?;
    row(out, "Unmatched lines", report.mismatched_lines, theme, colors)?;
    row(out, "Replacements", report.replacements, theme, colors)?;
    row(out, "Invalid values", report.invalid_total(), theme, colors)?;
    for (field, kinds) in &report.invalid_values {
        for (kind, count) in kinds {
            row(out, &format!("  {field} ({kind})"), count, theme, colors)?;
        }
    }
    if report.overlapping_spans > 0 {
        row(out, "Overlapping spans", report.overlapping_spans, theme, colors)?;
    }
    if report.groups_dropped > 0 {
        row(out, "Groups dropped", report.groups_dropped, theme, colors)?;
        row(out, "Lines suppressed", report.suppressed_lines.len(), theme, colors)?;
    }

    for underflow in &report.cluster_underflows {
        writeln!(
            out,
            "{}",
            paint(
                &format!(
                    "Warning: '{}' was not condensed ({} record(s) < k={}).",
                    underflow.field, underflow.records, underflow.k
                ),
                ThemeEntry::Warn,
                theme,
                colors
            )
        )?;
    }
    print_conflict_tail(report.conflicts.len(), out, theme, colors)
}

/// Prints the summary of a `reconstruct` run.
pub fn print_reconstruction_summary<W: Write>(
    output: &ReconstructionOutput,
    out: &mut W,
    theme: &ThemeMap,
    colors: bool,
) -> Result<()> {
    writeln!(out, "{}", paint("Reconstruction summary", ThemeEntry::Header, theme, colors))?;
    row(out, "Replacements", output.replaced, theme, colors)?;
    for conflict in &output.conflicts {
        writeln!(out, "{}", paint(&format!("  {conflict}"), ThemeEntry::Warn, theme, colors))?;
    }
    print_conflict_tail(output.conflicts.len(), out, theme, colors)
}

fn print_conflict_tail<W: Write>(conflicts: usize, out: &mut W, theme: &ThemeMap, colors: bool) -> Result<()> {
    if conflicts == 0 {
        writeln!(out, "{}", paint("No reconstruction conflicts.", ThemeEntry::Success, theme, colors))?;
    } else {
        writeln!(
            out,
            "{}",
            paint(
                &format!("{conflicts} replacement(s) skipped due to conflicts."),
                ThemeEntry::Error,
                theme,
                colors
            )
        )?;
    }
    Ok(())
}

/// Prints a column audit as an aligned table.
pub fn print_audit<W: Write>(audit: &ColumnAudit, out: &mut W, theme: &ThemeMap, colors: bool) -> Result<()> {
    writeln!(
        out,
        "{}",
        paint(&format!("Audit of '{}'", audit.field), ThemeEntry::Header, theme, colors)
    )?;
    row(out, "Pairs", audit.pairs, theme, colors)?;
    row(out, "Entropy (original)", format!("{:.4} bits", audit.entropy_original), theme, colors)?;
    row(out, "Entropy (anonymized)", format!("{:.4} bits", audit.entropy_anonymized), theme, colors)?;
    row(out, "Entropy change", format!("{:+.4} bits", audit.entropy_delta), theme, colors)?;
    row(out, "Uniqueness", format!("{:.4}", audit.uniqueness), theme, colors)?;
    if let Some(octets) = &audit.octets {
        let rates: Vec<String> = octets.collision_rates.iter().map(|r| format!("{r:.4}")).collect();
        row(out, "Octet collision rate", rates.join(" / "), theme, colors)?;
        row(out, "/24 Jaccard index", format!("{:.4}", octets.subnet_jaccard), theme, colors)?;
    }
    if audit.low_entropy {
        writeln!(
            out,
            "{}",
            paint("Low entropy: this field may be unusable for analysis.", ThemeEntry::Warn, theme, colors)
        )?;
    }
    Ok(())
}
