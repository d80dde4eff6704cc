//! Report commands - rankings and history

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Color};

use super::{get_context, require_caller};
use crate::output;
use ledger_core::{Direction, HistoryEntry};

pub fn top_users(token: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = require_caller(&ctx, token)?;
    let ranking = ctx.reporting_service.top_users_by_outbound_volume(&caller)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranking)?);
        return Ok(());
    }

    if ranking.is_empty() {
        output::info("No transfers yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["#", "User", "Sent"]);
    for (rank, row) in ranking.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&row.username),
            Cell::new(row.transacted_value).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
    Ok(())
}

pub fn top_transactions(token: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = require_caller(&ctx, token)?;
    let rows = ctx.reporting_service.top_transactions_per_user(&caller)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        output::info("No transfers yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Counterparty", "Amount"]);
    for row in &rows {
        table.add_row(vec![Cell::new(&row.username), amount_cell(row.amount)]);
    }
    println!("{}", table);
    Ok(())
}

pub fn history(token: Option<&str>, csv_path: Option<&Path>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = require_caller(&ctx, token)?;
    let entries = ctx.reporting_service.history(&caller)?;

    if let Some(path) = csv_path {
        write_csv(path, &entries)
            .with_context(|| format!("Failed to write CSV to {}", path.display()))?;
        if json {
            println!("{}", serde_json::json!({ "path": path, "rows": entries.len() }));
        } else {
            output::success(&format!("Wrote {} row(s) to {}", entries.len(), path.display()));
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        output::info("No transactions yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Type", "Counterparty", "Amount"]);
    for entry in &entries {
        let kind = match (entry.direction, &entry.counterparty) {
            (Direction::Credit, None) => "topup",
            (Direction::Credit, Some(_)) => "received",
            (Direction::Debit, _) => "sent",
        };
        table.add_row(vec![
            Cell::new(entry.created_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(kind),
            Cell::new(entry.counterparty.as_deref().unwrap_or("")),
            amount_cell(entry.amount),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn amount_cell(amount: i64) -> Cell {
    let cell = Cell::new(amount).set_alignment(CellAlignment::Right);
    if amount < 0 {
        cell.fg(Color::Red)
    } else {
        cell.fg(Color::Green)
    }
}

fn write_csv(path: &Path, entries: &[HistoryEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["id", "created_at", "direction", "counterparty", "amount"])?;
    for entry in entries {
        let created_at = entry.created_at.to_rfc3339();
        let amount = entry.amount.to_string();
        writer.write_record([
            entry.id.as_str(),
            created_at.as_str(),
            entry.direction.as_str(),
            entry.counterparty.as_deref().unwrap_or(""),
            amount.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
