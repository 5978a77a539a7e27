//! `rules` subcommand: inspect or export the field rule table

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use super::RulesArgs;
use crate::pipeline::{FieldRegistry, FieldRule, Transform};

fn shape(rule: &FieldRule) -> String {
    match &rule.transform {
        Transform::NumericUnit { bands } => format!("{} band(s)", bands.len()),
        Transform::Categorical { labels } => format!("{} label(s)", labels.len()),
        Transform::Identity { min, max } => match (min, max) {
            (None, None) => "unbounded".to_string(),
            _ => format!(
                "[{}, {}]",
                min.map_or("-".to_string(), |v| v.to_string()),
                max.map_or("-".to_string(), |v| v.to_string())
            ),
        },
        Transform::Target { positive, negative } => format!("+{:?} -{:?}", positive, negative),
    }
}

pub fn render_rules_table(registry: &FieldRegistry) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Field").add_attribute(Attribute::Bold),
        Cell::new("Kind").add_attribute(Attribute::Bold),
        Cell::new("Shape").add_attribute(Attribute::Bold),
        Cell::new("Sentinels").add_attribute(Attribute::Bold),
        Cell::new("Description").add_attribute(Attribute::Bold),
    ]);

    for rule in registry.rules() {
        let sentinels: Vec<String> = rule
            .sentinels
            .iter()
            .map(|s| format!("{:?}={}", s.codes, s.marker))
            .collect();
        let name = Cell::new(&rule.name);
        table.add_row(vec![
            if rule.is_target() { name.fg(Color::Green) } else { name },
            Cell::new(rule.kind()),
            Cell::new(shape(rule)),
            Cell::new(sentinels.join(" ")),
            Cell::new(&rule.description),
        ]);
    }
    table
}

pub fn run_rules(args: &RulesArgs, registry: &FieldRegistry) -> Result<()> {
    if let Some(path) = &args.export {
        let json = registry.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write rule table to {}", path.display()))?;
        println!(
            "{} {} rules ({}) written to {}",
            style("✓").green(),
            registry.len(),
            registry.version(),
            path.display()
        );
        return Ok(());
    }

    if let Some(field) = &args.field {
        let rule = registry
            .get(field)
            .with_context(|| format!("Field '{}' is not in rule table {}", field, registry.version()))?;
        let json = serde_json::to_string_pretty(rule).context("Failed to serialize rule")?;
        println!("{}", json);
        return Ok(());
    }

    println!(
        "\n {} Rule table {} ({} fields, fingerprint {})",
        style("◆").cyan().bold(),
        style(registry.version()).yellow(),
        registry.len(),
        style(registry.fingerprint()).dim()
    );
    println!("{}", render_rules_table(registry));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_table_has_row_per_field() {
        let registry = FieldRegistry::standard();
        let rendered = render_rules_table(&registry).to_string();
        assert!(rendered.contains("ALCDAY5"));
        assert!(rendered.contains("ADDEPEV2"));
    }

    #[test]
    fn test_shape_of_bounded_identity() {
        let rule = FieldRule::new("X", Transform::Identity { min: Some(1.0), max: None });
        assert_eq!(shape(&rule), "[1, -]");
    }
}
