//! Post-validation cleaning applied to every agent output.
//!
//! List fields drop null, blank and non-string entries and trim the survivors.
//! Optional scalars stay absent; they are never coerced to an empty string.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Trims every entry and drops the ones left empty. Idempotent.
pub fn clean_string_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter_map(|item| {
            let trimmed = item.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

/// Collapses every whitespace run to a single space. Blank input becomes `None`.
pub fn collapse_whitespace(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Serde adapter for list-of-strings fields: `null` or a missing key becomes `[]`,
/// non-string entries are dropped, strings are cleaned. Anything other than an array
/// or null is a schema violation.
pub fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(clean_string_list(
        raw.unwrap_or_default()
            .iter()
            .filter_map(Value::as_str),
    ))
}

/// Serde adapter for the identity headline.
pub fn de_headline<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(collapse_whitespace))
}

/// Comparison key used to tell whether two verbatim blocks are the same text.
pub fn block_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
