//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

use chrono::{DateTime, NaiveDate, Utc};

/// Validate stage ID prefix format.
///
/// Delegates to the configuration validator so the rules live in one place.
pub fn validate_prefix(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    crate::config::validate_prefix(trimmed).map_err(|e| e.to_string())?;
    Ok(trimmed.to_string())
}

/// Validate stage ID format.
///
/// Expected format: `prefix-suffix`, alphanumerics with single inner hyphens.
/// Examples: `stg-a3f8`, `shop-12x`
pub fn validate_stage_id(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Stage ID cannot be empty".to_string());
    }

    let Some((prefix, suffix)) = s.split_once('-') else {
        return Err(format!(
            "Invalid stage ID format: '{}'. Expected format: prefix-suffix (e.g., stg-a3f8)",
            s
        ));
    };

    validate_prefix(prefix).map_err(|e| format!("Stage ID {}", e.to_lowercase()))?;

    if suffix.is_empty() {
        return Err("Stage ID suffix cannot be empty".to_string());
    }
    if !suffix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("Stage ID suffix must contain only alphanumerics and hyphens".to_string());
    }
    if suffix.starts_with('-') || suffix.ends_with('-') || suffix.contains("--") {
        return Err("Stage ID suffix has misplaced hyphens".to_string());
    }

    Ok(s.to_string())
}

/// Validate an item ID: any non-blank string, trimmed.
pub fn validate_item_id(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("Item ID cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate a stage name using the domain rules.
pub fn validate_name(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    crate::domain::validate_name(trimmed)?;
    Ok(trimmed.to_string())
}

/// Parse a timestamp as RFC 3339, or a bare `YYYY-MM-DD` date at midnight UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            format!(
                "Invalid timestamp '{}'. Expected RFC 3339 (2024-03-10T12:00:00Z) or YYYY-MM-DD",
                s
            )
        })
}
