//! CLI command implementations

pub mod admin;
pub mod auth;
pub mod billing;
pub mod credits;
pub mod doctor;

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use dialoguer::Password;
use tessera_core::{Account, TesseraContext};
use tracing::debug;

const SESSION_FILE: &str = "session";

/// Get the tessera directory from environment or default
pub fn get_tessera_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var("TESSERA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::home_dir()
        .context("Could not find home directory")?
        .join(".tessera"))
}

/// Get or create tessera context
pub fn get_context() -> Result<TesseraContext> {
    let dir = get_tessera_dir()?;
    debug!(dir = %dir.display(), "opening data directory");
    TesseraContext::new(&dir).context("Failed to initialize tessera context")
}

/// Token from TESSERA_TOKEN or the saved session file
pub fn read_token() -> Result<Option<String>> {
    if let Ok(token) = env::var("TESSERA_TOKEN") {
        if !token.trim().is_empty() {
            return Ok(Some(token.trim().to_string()));
        }
    }
    let path = get_tessera_dir()?.join(SESSION_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let token = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let token = token.trim();
    Ok((!token.is_empty()).then(|| token.to_string()))
}

pub fn save_token(token: &str) -> Result<()> {
    let dir = get_tessera_dir()?;
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(SESSION_FILE), token)?;
    Ok(())
}

pub fn clear_token() -> Result<()> {
    let path = get_tessera_dir()?.join(SESSION_FILE);
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

/// Account behind the current token
pub fn current_account(ctx: &TesseraContext) -> Result<Account> {
    let Some(token) = read_token()? else {
        bail!("Not logged in. Run `tessera login` first.");
    };
    debug!("authenticating saved session");
    Ok(ctx.authenticate(&token)?)
}

/// Get password from --password flag, TESSERA_PASSWORD env var, or prompt
pub fn get_password_or_prompt(password_flag: Option<String>, confirm: bool) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }
    if let Ok(p) = env::var("TESSERA_PASSWORD") {
        return Ok(p);
    }

    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}
