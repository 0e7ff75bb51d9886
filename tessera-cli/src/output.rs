//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;
use tessera_core::OperationResult;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format cents as dollars
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

/// Print a core result as the JSON envelope; failures exit non-zero
pub fn emit_json<T: Serialize>(result: tessera_core::domain::result::Result<T>) -> anyhow::Result<()> {
    let failed = result.is_err();
    let envelope: OperationResult<T> = result.into();
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(499), "$4.99");
        assert_eq!(format_cents(15000), "$150.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(-120), "-$1.20");
    }
}
