//! Fit summary report

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::FitReport;

/// Terminal summary of a fit run
#[derive(Debug)]
pub struct FitSummary<'a> {
    pub report: &'a FitReport,
}

impl<'a> FitSummary<'a> {
    pub fn new(report: &'a FitReport) -> Self {
        Self { report }
    }

    /// Rows kept as a percentage of the input.
    pub fn kept_pct(&self) -> f64 {
        if self.report.total_rows == 0 {
            0.0
        } else {
            self.report.kept_rows as f64 / self.report.total_rows as f64 * 100.0
        }
    }

    fn count_cell(count: usize) -> Cell {
        Cell::new(count).fg(if count == 0 { Color::White } else { Color::Red })
    }

    pub fn render_table(&self) -> Table {
        let report = self.report;
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Input Rows"), Cell::new(report.total_rows)]);
        table.add_row(vec![
            Cell::new("🗑️  Excluded Rows"),
            Self::count_cell(report.excluded_rows),
        ]);
        for exclusion in &report.exclusions {
            table.add_row(vec![
                Cell::new(format!("     {} ({})", exclusion.field, exclusion.reason)),
                Cell::new(exclusion.rows).fg(Color::Yellow),
            ]);
        }
        table.add_row(vec![
            Cell::new("⚠️  Malformed Values"),
            Self::count_cell(report.malformed_values),
        ]);
        table.add_row(vec![
            Cell::new("⚠️  Out-of-range Codes"),
            Self::count_cell(report.out_of_domain_values),
        ]);
        table.add_row(vec![
            Cell::new("🚫 Unregistered Columns"),
            Self::count_cell(report.unregistered_columns.len()),
        ]);
        table.add_row(vec![
            Cell::new("🕳️  Dropped (Missing)"),
            Self::count_cell(report.dropped_fields.len()),
        ]);
        table.add_row(vec![
            Cell::new("🏷️  Categorical Fields"),
            Cell::new(format!("{} ({})", report.categorical_fields, report.encoding)),
        ]);
        table.add_row(vec![
            Cell::new("✅ Kept Rows"),
            Cell::new(format!("{} ({:.1}%)", report.kept_rows, self.kept_pct()))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("📐 Feature Columns"),
            Cell::new(report.feature_columns)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("FIT SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        for line in self.render_table().to_string().lines() {
            println!("    {}", line);
        }

        if !self.report.outcomes.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("🎯").cyan(),
                style("OUTCOMES").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            for outcome in &self.report.outcomes {
                println!(
                    "      {} {:<10} yes {}  no {}  missing {}",
                    style("•").dim(),
                    outcome.field,
                    style(outcome.counts.positive).green(),
                    style(outcome.counts.negative).cyan(),
                    style(outcome.counts.missing).yellow()
                );
            }
        }

        let dropped = &self.report.dropped_fields;
        let unregistered = &self.report.unregistered_columns;
        if !dropped.is_empty() || !unregistered.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("📝").cyan(),
                style("IGNORED FIELDS").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());

            for (title, fields) in [("High Missing Values", dropped), ("Unregistered", unregistered)] {
                if fields.is_empty() {
                    continue;
                }
                println!();
                println!(
                    "      {} {}:",
                    style(title).yellow(),
                    style(format!("({})", fields.len())).dim()
                );
                for field in fields {
                    println!("        {} {}", style("•").dim(), field);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CategoricalEncoding, ExclusionCount, MissingLabelReason};

    fn report() -> FitReport {
        FitReport {
            targets: vec!["DIABETE3".into()],
            encoding: CategoricalEncoding::Ordinal,
            total_rows: 8,
            kept_rows: 6,
            excluded_rows: 2,
            exclusions: vec![ExclusionCount {
                field: "DIABETE3".into(),
                reason: MissingLabelReason::Sentinel,
                rows: 2,
            }],
            outcomes: Vec::new(),
            malformed_values: 0,
            out_of_domain_values: 1,
            unregistered_columns: vec!["SEQNO".into()],
            dropped_fields: Vec::new(),
            marker_profile: Vec::new(),
            feature_fields: 3,
            categorical_fields: 1,
            feature_columns: 3,
        }
    }

    #[test]
    fn test_kept_pct() {
        let report = report();
        assert!((FitSummary::new(&report).kept_pct() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_table_lists_exclusion_reason() {
        let report = report();
        let rendered = FitSummary::new(&report).render_table().to_string();
        assert!(rendered.contains("DIABETE3 (sentinel)"));
        assert!(rendered.contains("Feature Columns"));
    }
}
