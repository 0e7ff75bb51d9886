//! Balance, history and usage commands

use anyhow::Result;
use colored::Colorize;
use tessera_core::LedgerEntry;

use super::{current_account, get_context};
use crate::output;

pub fn overview(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = current_account(&ctx)?;
    let overview = ctx.usage_service.overview(&account)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    if overview.subscribed {
        println!("{}", "Subscribed: usage is not metered".green());
    } else {
        println!("{} {}", "Credits remaining:".bold(), overview.credits_remaining);
    }
    if let Some(reset) = overview.credits_reset_date {
        println!("Last reset: {}", reset.format("%Y-%m-%d"));
    }
    println!();

    let mut costs = output::create_table();
    costs.set_header(vec!["Action", "Cost"]);
    for (action, cost) in &overview.credit_costs {
        costs.add_row(vec![action.clone(), cost.to_string()]);
    }
    println!("{}", costs);

    if !overview.recent_transactions.is_empty() {
        println!();
        println!("{}", "Recent activity".bold());
        println!("{}", entries_table(&overview.recent_transactions));
    }
    Ok(())
}

pub fn history(page: u32, limit: u32, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = current_account(&ctx)?;
    let history = ctx.ledger_service.history(account.id, page, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.entries.is_empty() {
        output::info("No transactions.");
        return Ok(());
    }
    println!("{}", entries_table(&history.entries));
    println!(
        "Page {} of {} ({} transactions)",
        history.page,
        history.pages.max(1),
        history.total
    );
    Ok(())
}

pub fn track(action: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = current_account(&ctx)?;
    let receipt = ctx.usage_service.track(&account, action.as_deref());

    if json {
        return output::emit_json(receipt);
    }
    match receipt {
        Ok(receipt) if receipt.bypassed => {
            output::success(&format!("{} recorded (subscription)", receipt.action_type));
        }
        Ok(receipt) => {
            output::success(&format!(
                "{} used {} credit(s), {} remaining",
                receipt.action_type, receipt.cost, receipt.credits_remaining
            ));
        }
        Err(tessera_core::Error::InsufficientCredits {
            credits_remaining,
            cost,
        }) => {
            output::error(&format!(
                "Insufficient credits: {} required, {} remaining",
                cost, credits_remaining
            ));
            output::info("Buy more with `tessera packages` or subscribe with `tessera subscribe`.");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub(crate) fn entries_table(entries: &[LedgerEntry]) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec!["#", "Date", "Type", "Action", "Change", "Balance", "Description"]);
    for entry in entries {
        let change = if entry.credits_added > 0 {
            format!("+{}", entry.credits_added)
        } else if entry.credits_used > 0 {
            format!("-{}", entry.credits_used)
        } else {
            "0".to_string()
        };
        table.add_row(vec![
            entry.sequence.to_string(),
            entry.created_at.format("%Y-%m-%d %H:%M").to_string(),
            entry.transaction_type.to_string(),
            entry.action_type.clone(),
            change,
            entry.credits_remaining.to_string(),
            entry.description.clone(),
        ]);
    }
    table
}
