//! Fix / non-fix classification of method change histories.
//!
//! Works directly on the provider's raw JSON container so that unexpected
//! shapes degrade to an empty history instead of failing the run.

use fixscope_core::{ChangeRecord, FixKeywords};
use serde_json::Value;

/// Key of the per-change map in a CodeShovel result.
pub const CHANGE_DETAILS_KEY: &str = "changeHistoryDetails";

/// Key of the change message inside one change entry.
pub const COMMIT_MESSAGE_KEY: &str = "commitMessage";

/// The result of classifying one method history.
///
/// `fix_records.len() == fix_count <= total`.
///
/// # Examples
///
/// ```
/// use fixscope_history::classify::ClassifiedSet;
///
/// let empty = ClassifiedSet::default();
/// assert_eq!(empty.total, 0);
/// assert_eq!(empty.ratio(), 0.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedSet {
    /// Number of well-formed change entries.
    pub total: u32,
    /// Number of entries whose message matched a keyword.
    pub fix_count: u32,
    /// The matching entries, in input order.
    pub fix_records: Vec<ChangeRecord>,
}

impl ClassifiedSet {
    /// `fix_count / total`, or `0.0` for an empty history.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.fix_count) / f64::from(self.total)
        }
    }

    /// Identifiers of the fix records, in input order.
    pub fn fix_ids(&self) -> Vec<String> {
        self.fix_records.iter().map(|r| r.id.clone()).collect()
    }
}

/// Convert a provider container into change records.
///
/// Returns `None` when the container is not an object or has no usable
/// `changeHistoryDetails` object. Non-object entries are skipped.
///
/// # Examples
///
/// ```
/// use fixscope_history::classify::change_records;
/// use serde_json::json;
///
/// let history = json!({
///     "changeHistoryDetails": {
///         "a1": {"commitMessage": "Fix overflow"},
///         "b2": "not an entry"
///     }
/// });
/// let records = change_records(&history).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].message, "Fix overflow");
///
/// assert!(change_records(&json!([1, 2])).is_none());
/// ```
pub fn change_records(history: &Value) -> Option<Vec<ChangeRecord>> {
    let Some(container) = history.as_object() else {
        tracing::warn!(kind = json_kind(history), "history is not an object");
        return None;
    };
    let Some(details) = container.get(CHANGE_DETAILS_KEY) else {
        tracing::warn!("history has no {CHANGE_DETAILS_KEY} field");
        return None;
    };
    let Some(details) = details.as_object() else {
        tracing::warn!(kind = json_kind(details), "{CHANGE_DETAILS_KEY} is not an object");
        return None;
    };

    let mut records = Vec::with_capacity(details.len());
    for (id, entry) in details {
        let Some(fields) = entry.as_object() else {
            tracing::warn!(change = %id, kind = json_kind(entry), "skipping malformed change entry");
            continue;
        };
        let message = fields
            .get(COMMIT_MESSAGE_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        records.push(ChangeRecord {
            id: id.clone(),
            message,
            metadata: fields.clone(),
        });
    }
    Some(records)
}

/// Partition records by keyword match on their message.
pub fn classify_records(records: Vec<ChangeRecord>, keywords: &FixKeywords) -> ClassifiedSet {
    let total = records.len() as u32;
    let fix_records: Vec<ChangeRecord> = records
        .into_iter()
        .filter(|r| keywords.matches(&r.message))
        .collect();
    ClassifiedSet {
        total,
        fix_count: fix_records.len() as u32,
        fix_records,
    }
}

/// Classify a raw provider container.
///
/// Malformed containers classify as an empty history; this never fails.
///
/// # Examples
///
/// ```
/// use fixscope_core::FixKeywords;
/// use fixscope_history::classify::classify;
/// use serde_json::json;
///
/// let history = json!({
///     "changeHistoryDetails": {
///         "c1": {"commitMessage": "Initial import"},
///         "c2": {"commitMessage": "BUG-12: handle empty input"},
///         "c3": {"commitMessage": "Refactor"}
///     }
/// });
/// let set = classify(&history, &FixKeywords::default());
/// assert_eq!((set.total, set.fix_count), (3, 1));
/// assert_eq!(set.fix_ids(), vec!["c2"]);
/// ```
pub fn classify(history: &Value, keywords: &FixKeywords) -> ClassifiedSet {
    match change_records(history) {
        Some(records) => classify_records(records, keywords),
        None => ClassifiedSet::default(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
