//! Packages, purchases and subscriptions

use anyhow::Result;

use super::{current_account, get_context};
use crate::output;

pub fn packages(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let packages = ctx.purchase_service.list_packages()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Package", "Credits", "Price"]);
    for package in &packages {
        table.add_row(vec![
            package.id.to_string(),
            package.name.clone(),
            package.credits.to_string(),
            output::format_cents(package.price_cents),
        ]);
    }
    println!("{}", table);

    println!();
    for plan in ctx.purchase_service.plans() {
        println!("Plan {}: {}", plan.name, output::format_cents(plan.price_cents));
    }
    Ok(())
}

pub fn buy(package_id: i64, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = current_account(&ctx)?;
    let receipt = ctx.purchase_service.purchase(&account, package_id);

    if json {
        return output::emit_json(receipt);
    }
    let receipt = receipt?;
    output::success(&format!(
        "Purchased {}: +{} credits, {} remaining",
        receipt.package_name, receipt.credits_purchased, receipt.credits_remaining
    ));
    Ok(())
}

pub fn subscribe(plan: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = current_account(&ctx)?;
    let updated = ctx
        .purchase_service
        .subscribe(account.id, plan)
        .map(|a| tessera_core::AccountProfile::from(&a));

    if json {
        return output::emit_json(updated);
    }
    let updated = updated?;
    output::success(&format!(
        "Subscribed to {}",
        updated.subscription_plan.as_deref().unwrap_or(plan)
    ));
    Ok(())
}
