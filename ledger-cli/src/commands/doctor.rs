//! Doctor command - ledger integrity checks

use anyhow::{bail, Result};
use colored::Colorize;
use comfy_table::{Cell, Color};
use serde_json::Value;

use super::get_context;
use crate::output;
use ledger_core::services::CheckStatus;

/// Render one finding as "key: value, key: value"
fn format_detail(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}: {}", k, s),
                other => format!("{}: {}", k, other),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

pub fn run(verbose: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let report = ctx.integrity_service.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", "Ledger Integrity Check".bold());
        println!();

        let mut table = output::create_table();
        table.set_header(vec!["Check", "Status", "Message"]);

        for (name, check) in &report.checks {
            let status = match check.status {
                CheckStatus::Pass => Cell::new("PASS").fg(Color::Green),
                CheckStatus::Error => Cell::new("ERROR").fg(Color::Red),
            };
            table.add_row(vec![Cell::new(name), status, Cell::new(&check.message)]);

            if verbose {
                for detail in check.details.iter().flatten() {
                    table.add_row(vec![
                        Cell::new(""),
                        Cell::new(""),
                        Cell::new(format!("  - {}", format_detail(detail))),
                    ]);
                }
            }
        }

        println!("{}", table);
        println!();
        println!(
            "Summary: {} passed, {} errors ({} users, {} records, supply {})",
            report.summary.passed.to_string().green(),
            report.summary.errors.to_string().red(),
            report.summary.users,
            report.summary.records,
            report.summary.total_supply,
        );
    }

    if !report.is_healthy() {
        bail!("{} integrity check(s) failed", report.summary.errors);
    }
    Ok(())
}
