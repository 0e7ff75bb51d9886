//! Admin commands

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use tessera_core::domain::{AdminCreditAction, AdminCreditRequest};
use uuid::Uuid;

use super::credits::entries_table;
use super::{current_account, get_context, get_password_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Add, remove or reset a user's credits
    Credits {
        /// Target user id
        user_id: Uuid,
        /// add, remove or reset
        action: AdminCreditAction,
        /// Number of credits (ignored by reset)
        #[arg(long, default_value_t = 0)]
        amount: u32,
        /// Reason recorded in the ledger and audit trail
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reset every non-subscribed free account to the baseline allowance
    ResetMonthly {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show dashboard numbers
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List users
    Users {
        /// Filter by email substring
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one user with activity counts
    Show {
        /// Target user id
        user_id: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an administrator account
    Bootstrap {
        #[arg(long)]
        email: String,
        /// Password (or TESSERA_PASSWORD, or prompt)
        #[arg(long)]
        password: Option<String>,
    },
}

pub fn run(command: AdminCommands) -> Result<()> {
    let ctx = get_context()?;

    if let AdminCommands::Bootstrap { email, password } = command {
        let password = get_password_or_prompt(password, true)?;
        let profile = ctx.auth_service.create_admin(&email, &password)?;
        output::success(&format!("Admin account created for {}", profile.email));
        println!("{} {}", "Account id:".dimmed(), profile.id);
        return Ok(());
    }

    let admin = current_account(&ctx)?;
    match command {
        AdminCommands::Credits {
            user_id,
            action,
            amount,
            description,
            json,
        } => {
            let request = AdminCreditRequest {
                user_id,
                action,
                amount,
                description,
            };
            let result = ctx.admin_service.adjust_credits(&admin, &request);
            if json {
                return output::emit_json(result);
            }
            let adjustment = result?;
            output::success(&format!(
                "Credits {}: {} -> {}",
                adjustment.action, adjustment.old_credits, adjustment.new_credits
            ));
            if !adjustment.audited {
                output::warning("Audit record could not be written");
            }
        }
        AdminCommands::ResetMonthly { json } => {
            let result = ctx.admin_service.reset_monthly_credits(&admin);
            if json {
                return output::emit_json(result);
            }
            let report = result?;
            output::success(&format!("Reset {} account(s)", report.users_reset));
            if report.failures > 0 {
                output::warning(&format!("{} account(s) failed, see logs", report.failures));
            }
            if report.skipped > 0 {
                output::info(&format!(
                    "{} account(s) subscribed since the listing and were left alone",
                    report.skipped
                ));
            }
        }
        AdminCommands::Stats { json } => {
            let stats = ctx.admin_service.stats(&admin)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            let mut table = output::create_table();
            table.add_row(vec!["Total users", &stats.total_users.to_string()]);
            table.add_row(vec!["Subscribed users", &stats.subscribed_users.to_string()]);
            table.add_row(vec![
                "Credits in circulation",
                &stats.total_credits_in_circulation.to_string(),
            ]);
            println!("{}", table);

            if !stats.recent_transactions.is_empty() {
                println!();
                println!("{}", "Recent transactions".bold());
                let mut recent = output::create_table();
                recent.set_header(vec!["Date", "Email", "Type", "Change", "Balance"]);
                for activity in &stats.recent_transactions {
                    let entry = &activity.entry;
                    let change = i64::from(entry.credits_added) - i64::from(entry.credits_used);
                    recent.add_row(vec![
                        entry.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        activity.email.clone(),
                        entry.transaction_type.to_string(),
                        format!("{:+}", change),
                        entry.credits_remaining.to_string(),
                    ]);
                }
                println!("{}", recent);
            }
        }
        AdminCommands::Users {
            search,
            page,
            limit,
            json,
        } => {
            let users = ctx
                .admin_service
                .list_users(&admin, search.as_deref(), page, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Email", "Type", "Subscribed", "Credits"]);
            for user in &users.users {
                table.add_row(vec![
                    user.id.to_string(),
                    user.email.clone(),
                    user.user_type.to_string(),
                    if user.subscribed { "yes" } else { "no" }.to_string(),
                    user.credits_remaining.to_string(),
                ]);
            }
            println!("{}", table);
            println!("Page {} of {} ({} users)", users.page, users.pages.max(1), users.total);
        }
        AdminCommands::Show { user_id, json } => {
            let summary = ctx.admin_service.account_summary(&admin, user_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            let user = &summary.user;
            println!("{} {}", "Email:".bold(), user.email);
            println!("{} {}", "Type:".bold(), user.user_type);
            match &user.subscription_plan {
                Some(plan) if user.subscribed => println!("{} {}", "Plan:".bold(), plan),
                _ => println!("{} {}", "Credits:".bold(), user.credits_remaining),
            }
            println!();

            let mut table = output::create_table();
            table.add_row(vec!["Ledger entries", &summary.ledger_entries.to_string()]);
            table.add_row(vec!["Purchases", &summary.purchases.to_string()]);
            table.add_row(vec!["Admin adjustments", &summary.admin_actions.to_string()]);
            table.add_row(vec!["Usage records", &summary.usage_records.to_string()]);
            println!("{}", table);

            if !summary.recent_transactions.is_empty() {
                println!();
                println!("{}", entries_table(&summary.recent_transactions));
            }
        }
        AdminCommands::Bootstrap { .. } => {}
    }
    Ok(())
}
