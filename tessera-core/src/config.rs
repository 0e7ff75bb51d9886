//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "sessionSecret": "9f2c...",
//!   "sessionTtlDays": 7,
//!   "freeCreditAllowance": 5,
//!   "actionCosts": { "download_svg": 1, "download_png": 2, "download_pdf": 3 },
//!   "defaultActionType": "download_svg",
//!   "subscriptionPlans": [{ "name": "monthly", "priceCents": 1500 }],
//!   "disposableDomains": [],
//!   "disposableKeywords": []
//! }
//! ```
//! Keys this crate does not know about are kept when the file is rewritten.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::SubscriptionPlan;
use crate::services::ActionCosts;

const SETTINGS_FILE: &str = "settings.json";

/// Ten years
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

fn default_ttl_days() -> i64 {
    7
}

fn default_allowance() -> u32 {
    5
}

fn default_action_costs() -> HashMap<String, u32> {
    [("download_svg", 1), ("download_png", 2), ("download_pdf", 3)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn default_action_type() -> String {
    "download_svg".to_string()
}

fn default_plans() -> Vec<SubscriptionPlan> {
    vec![
        SubscriptionPlan {
            name: "monthly".to_string(),
            price_cents: 1500,
        },
        SubscriptionPlan {
            name: "yearly".to_string(),
            price_cents: 15000,
        },
    ]
}

/// Raw settings.json structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_secret: Option<String>,
    #[serde(default = "default_ttl_days")]
    session_ttl_days: i64,
    #[serde(default = "default_allowance")]
    free_credit_allowance: u32,
    #[serde(default = "default_action_costs")]
    action_costs: HashMap<String, u32>,
    #[serde(default = "default_action_type")]
    default_action_type: String,
    #[serde(default = "default_plans")]
    subscription_plans: Vec<SubscriptionPlan>,
    #[serde(default)]
    disposable_domains: Vec<String>,
    #[serde(default)]
    disposable_keywords: Vec<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_ttl_days: default_ttl_days(),
            free_credit_allowance: default_allowance(),
            action_costs: default_action_costs(),
            default_action_type: default_action_type(),
            subscription_plans: default_plans(),
            disposable_domains: Vec::new(),
            disposable_keywords: Vec::new(),
            other: HashMap::new(),
        }
    }
}

/// Tessera configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Hex-encoded HMAC key for session tokens
    pub session_secret: String,
    pub session_ttl_days: i64,
    /// Baseline balance for new accounts and resets
    pub free_credit_allowance: u32,
    pub action_costs: HashMap<String, u32>,
    pub default_action_type: String,
    pub subscription_plans: Vec<SubscriptionPlan>,
    pub disposable_domains: Vec<String>,
    pub disposable_keywords: Vec<String>,
}

impl Config {
    /// Load config from the data directory.
    ///
    /// A session secret is generated and written back on first load unless
    /// `TESSERA_SESSION_SECRET` supplies one. `TESSERA_FREE_CREDITS`
    /// overrides the allowance.
    pub fn load(dir: &Path) -> Result<Self> {
        let settings_path = dir.join(SETTINGS_FILE);

        let mut raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid settings in {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let env_secret = std::env::var("TESSERA_SESSION_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let session_secret = match (env_secret, raw.session_secret.clone()) {
            (Some(secret), _) => secret,
            (None, Some(secret)) => secret,
            (None, None) => {
                let bytes: [u8; 32] = rand::thread_rng().gen();
                let secret = hex::encode(bytes);
                raw.session_secret = Some(secret.clone());
                write_settings(dir, &raw)?;
                info!("generated new session secret");
                secret
            }
        };

        let free_credit_allowance = match std::env::var("TESSERA_FREE_CREDITS").ok() {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("TESSERA_FREE_CREDITS is not a number: {}", value))?,
            None => raw.free_credit_allowance,
        };

        if raw.session_ttl_days <= 0 || raw.session_ttl_days > MAX_SESSION_TTL_DAYS {
            bail!(
                "sessionTtlDays must be between 1 and {}, got {}",
                MAX_SESSION_TTL_DAYS,
                raw.session_ttl_days
            );
        }

        Ok(Self {
            session_secret,
            session_ttl_days: raw.session_ttl_days,
            free_credit_allowance,
            action_costs: raw.action_costs,
            default_action_type: raw.default_action_type,
            subscription_plans: raw.subscription_plans,
            disposable_domains: raw.disposable_domains,
            disposable_keywords: raw.disposable_keywords,
        })
    }

    /// Save config to the data directory, preserving keys we don't manage
    pub fn save(&self, dir: &Path) -> Result<()> {
        let settings_path = dir.join(SETTINGS_FILE);
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.session_secret = Some(self.session_secret.clone());
        settings.session_ttl_days = self.session_ttl_days;
        settings.free_credit_allowance = self.free_credit_allowance;
        settings.action_costs = self.action_costs.clone();
        settings.default_action_type = self.default_action_type.clone();
        settings.subscription_plans = self.subscription_plans.clone();
        settings.disposable_domains = self.disposable_domains.clone();
        settings.disposable_keywords = self.disposable_keywords.clone();

        write_settings(dir, &settings)
    }

    /// Decoded session secret
    pub fn session_secret_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(self.session_secret.trim()).context("sessionSecret must be hex encoded")
    }

    pub fn action_costs(&self) -> ActionCosts {
        ActionCosts::new(self.action_costs.clone(), self.default_action_type.clone())
    }
}

fn write_settings(dir: &Path, settings: &SettingsFile) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(dir.join(SETTINGS_FILE), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_and_generated_secret_persist() {
        let dir = TempDir::new().unwrap();
        let first = Config::load(dir.path()).unwrap();
        assert_eq!(first.session_ttl_days, 7);
        assert_eq!(first.action_costs().cost("download_pdf"), 3);
        assert_eq!(first.subscription_plans.len(), 2);
        assert_eq!(first.session_secret_bytes().unwrap().len(), 32);

        let second = Config::load(dir.path()).unwrap();
        assert_eq!(first.session_secret, second.session_secret);
    }

    #[test]
    fn test_unknown_keys_preserved_on_save() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"sessionSecret": "00112233445566778899aabbccddeeff", "theme": "dark", "actionCosts": {"download_svg": 4}}"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        assert_eq!(config.action_costs().cost("download_svg"), 4);
        config.disposable_domains.push("burner.dev".to_string());
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["disposableDomains"][0], "burner.dev");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"sessionSecret": "00112233445566778899aabbccddeeff", "sessionTtlDays": 0}"#,
        )
        .unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        for ttl in ["9223372036854775807", "100000000000", "3651"] {
            let dir = TempDir::new().unwrap();
            std::fs::write(
                dir.path().join(SETTINGS_FILE),
                format!(
                    r#"{{"sessionSecret": "00112233445566778899aabbccddeeff", "sessionTtlDays": {}}}"#,
                    ttl
                ),
            )
            .unwrap();
            assert!(Config::load(dir.path()).is_err(), "ttl {} accepted", ttl);
        }
    }
}
