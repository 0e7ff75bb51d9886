//! Signup, login, logout and whoami

use anyhow::Result;
use colored::Colorize;
use tessera_core::AccountProfile;

use super::{clear_token, current_account, get_context, get_password_or_prompt, read_token, save_token};
use crate::output;

pub fn signup(email: &str, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let password = get_password_or_prompt(password, true)?;
    let response = ctx.auth_service.signup(email, &password);
    if let Ok(auth) = &response {
        save_token(&auth.token)?;
    }

    if json {
        return output::emit_json(response);
    }
    let response = response?;
    output::success(&format!("Account created for {}", response.user.email));
    print_profile(&response.user);
    Ok(())
}

pub fn login(email: &str, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let password = get_password_or_prompt(password, false)?;
    let response = ctx.auth_service.login(email, &password);
    if let Ok(auth) = &response {
        save_token(&auth.token)?;
    }

    if json {
        return output::emit_json(response);
    }
    let response = response?;
    output::success(&format!("Logged in as {}", response.user.email));
    println!("Session expires {}", response.expires_at.format("%Y-%m-%d %H:%M UTC"));
    Ok(())
}

pub fn logout() -> Result<()> {
    let Some(token) = read_token()? else {
        output::info("Not logged in.");
        return Ok(());
    };
    let ctx = get_context()?;
    ctx.auth_service.logout(&token)?;
    clear_token()?;
    output::success("Logged out.");
    Ok(())
}

pub fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = current_account(&ctx)?;
    let profile = AccountProfile::from(&account);

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }
    print_profile(&profile);
    Ok(())
}

fn print_profile(profile: &AccountProfile) {
    let mut table = output::create_table();
    table.add_row(vec!["Email", &profile.email]);
    table.add_row(vec!["User type", profile.user_type.as_str()]);
    let subscription = match (profile.subscribed, &profile.subscription_plan) {
        (true, Some(plan)) => plan.clone(),
        (true, None) => "active".to_string(),
        (false, _) => "none".to_string(),
    };
    table.add_row(vec!["Subscription", &subscription]);
    table.add_row(vec!["Credits", &profile.credits_remaining.to_string()]);
    println!("{}", table);
    println!("{} {}", "Account id:".dimmed(), profile.id);
}
