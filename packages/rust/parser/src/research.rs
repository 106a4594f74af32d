//! Research response parsing.
//!
//! Model output is matched against the fixed [`ResearchField`] schema. Two
//! shapes are recognized:
//! - a JSON object (bare, fenced, or the first object of an array) whose keys
//!   name schema fields
//! - `Label: value` lines, with optional bullets, numbering or bold markup;
//!   unlabeled lines continue the previous field, and a line holding only a
//!   label opens a field whose value follows on the next lines
//!
//! Anything that matches neither shape yields an all-missing record.

use std::collections::HashMap;
use std::sync::LazyLock;

use outreach_shared::{MatchReport, RESEARCH_FIELD_COUNT, ResearchField, ResearchRecord};
use serde_json::Value;
use tracing::debug;

use crate::cleanup::{is_placeholder, normalize_label, strip_code_fences, strip_line_markup};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which shape the response was read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Json,
    LabeledLines,
    /// Nothing in the response matched the schema.
    Unstructured,
}

/// A research record plus how well the response matched the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResearch {
    pub record: ResearchRecord,
    pub report: MatchReport,
    pub shape: ResponseShape,
}

// ---------------------------------------------------------------------------
// Label lookup (built once)
// ---------------------------------------------------------------------------

/// Every accepted spelling of every field, normalized.
static LABELS: LazyLock<HashMap<String, ResearchField>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for field in ResearchField::ALL {
        let spec = field.spec();
        map.insert(normalize_label(spec.key), field);
        map.insert(normalize_label(spec.label), field);
        for alias in spec.aliases {
            map.entry(normalize_label(alias)).or_insert(field);
        }
    }
    map
});

/// Resolve a candidate label to a schema field.
///
/// A trailing parenthetical (`"Cloud Providers (AWS/GCP/Azure)"`) is ignored.
fn lookup(label: &str) -> Option<ResearchField> {
    let normalized = normalize_label(label);
    if let Some(field) = LABELS.get(&normalized) {
        return Some(*field);
    }
    let without_paren = label.split('(').next().unwrap_or(label);
    LABELS.get(&normalize_label(without_paren)).copied()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a raw research response. Never fails; unmatched fields stay missing.
pub fn parse_research(raw: &str) -> ParsedResearch {
    let body = strip_code_fences(raw);

    let (record, shape) = match parse_json(body) {
        Some(record) if record.filled() > 0 => (record, ResponseShape::Json),
        _ => {
            let record = parse_labeled_lines(body);
            let shape = if record.filled() > 0 {
                ResponseShape::LabeledLines
            } else {
                ResponseShape::Unstructured
            };
            (record, shape)
        }
    };

    let report = MatchReport {
        matched: record.filled(),
        expected: RESEARCH_FIELD_COUNT,
    };
    debug!(
        matched = report.matched,
        expected = report.expected,
        ?shape,
        "parsed research response"
    );

    ParsedResearch {
        record,
        report,
        shape,
    }
}

/// Try to read the response as a JSON object.
fn parse_json(body: &str) -> Option<ResearchRecord> {
    let start = body.find(['{', '['])?;
    let end = body.rfind(['}', ']'])?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&body[start..=end]).ok()?;
    let object = match value {
        Value::Object(map) => map,
        Value::Array(items) => match items.into_iter().next()? {
            Value::Object(map) => map,
            _ => return None,
        },
        _ => return None,
    };

    let mut record = fill_from_object(&object);

    // `{"research": {...}}` style wrappers: look one level down.
    if record.filled() == 0 {
        for nested in object.values() {
            if let Value::Object(inner) = nested {
                record = fill_from_object(inner);
                if record.filled() > 0 {
                    break;
                }
            }
        }
    }

    Some(record)
}

fn fill_from_object(object: &serde_json::Map<String, Value>) -> ResearchRecord {
    let mut record = ResearchRecord::empty();
    for (key, value) in object {
        let Some(field) = lookup(key) else {
            continue;
        };
        let text = value_to_text(value);
        if !is_placeholder(&text) && record.is_missing(field) {
            record.set(field, text);
        }
    }
    record
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

/// Read `Label: value` lines against the schema.
fn parse_labeled_lines(body: &str) -> ResearchRecord {
    let mut values: HashMap<ResearchField, Vec<String>> = HashMap::new();
    let mut current: Option<ResearchField> = None;

    for line in body.lines() {
        let stripped = strip_line_markup(line);
        if stripped.is_empty() {
            continue;
        }

        let labeled = stripped
            .split_once(':')
            .filter(|(label, _)| label.len() <= 80)
            .and_then(|(label, value)| lookup(label).map(|field| (field, value.trim())));

        if let Some((field, value)) = labeled {
            current = Some(field);
            let entry = values.entry(field).or_default();
            if !value.is_empty() {
                entry.push(value.to_string());
            }
            continue;
        }

        // A bare heading naming a field opens it.
        if let Some(field) = lookup(&stripped) {
            current = Some(field);
            values.entry(field).or_default();
            continue;
        }

        if let Some(field) = current {
            values.entry(field).or_default().push(stripped);
        }
    }

    let mut record = ResearchRecord::empty();
    for (field, parts) in values {
        let text = parts.join("\n");
        if !is_placeholder(&text) {
            record.set(field, text);
        }
    }
    record
}
