//! Output formatting utilities.

use serde_json::Value;

/// Formats a value as pretty JSON.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats a signature candidate as a simple table row.
pub fn format_table_row(candidate: &Value) -> String {
    let label = candidate
        .get("label")
        .and_then(|v| v.as_str())
        .unwrap_or("?");
    let created = candidate
        .get("created")
        .and_then(|v| v.as_i64())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    let expires = candidate
        .get("expires")
        .and_then(|v| v.as_i64())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    let status = match (
        candidate.get("keyid_valid").and_then(|v| v.as_bool()),
        candidate.get("has_signature").and_then(|v| v.as_bool()),
    ) {
        (Some(true), Some(true)) => "ok",
        (Some(false), _) => "bad-keyid",
        (_, Some(false)) => "unsigned",
        _ => "?",
    };
    let components = candidate
        .get("components")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    format!(
        "{:<12} {:<12} {:<12} {:<10} {}",
        truncate(label, 12),
        created,
        expires,
        status,
        components
    )
}

/// Prints table header.
#[allow(clippy::print_literal)]
pub fn print_table_header() {
    println!(
        "{:<12} {:<12} {:<12} {:<10} {}",
        "LABEL", "CREATED", "EXPIRES", "STATUS", "COMPONENTS"
    );
    println!("{}", "-".repeat(80));
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}
