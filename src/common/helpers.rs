// Helper functions for safe logging and serialization

use chrono::{SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            let first = parts[0].chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Current UTC time with fixed sub-second precision
///
/// Every timestamp the service writes goes through here so that stored
/// values sort lexicographically in chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Timestamp `offset` from now, in the same format as [`now_timestamp`]
pub fn timestamp_after(offset: std::time::Duration) -> String {
    let offset = chrono::Duration::from_std(offset).unwrap_or_else(|_| chrono::Duration::zero());
    (Utc::now() + offset).to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decodes a JSON-encoded string list column, tolerating NULL and garbage
pub fn parse_string_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|json| serde_json::from_str::<Vec<String>>(json).ok())
        .unwrap_or_default()
}

/// Encodes a string list for storage in a TEXT column
pub fn encode_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Serializes a JSON string list column as an array for API responses
pub fn serialize_string_list<S>(items: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    parse_string_list(items.as_deref()).serialize(serializer)
}
