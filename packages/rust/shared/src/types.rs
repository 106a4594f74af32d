//! Core domain types for Outreach batches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::schema::{RESEARCH_FIELD_COUNT, ResearchField};

/// Value stored for a research field the model did not provide.
pub const MISSING: &str = "";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for batch run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Prospect
// ---------------------------------------------------------------------------

/// A person/company pair to research and write to. Identity is the input position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospect {
    pub person_name: String,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
}

impl Prospect {
    pub fn new(
        person_name: impl Into<String>,
        company_name: impl Into<String>,
        linkedin_url: Option<String>,
    ) -> Self {
        Self {
            person_name: person_name.into(),
            company_name: company_name.into(),
            linkedin_url,
        }
    }

    /// First whitespace-separated token of the person's name.
    pub fn first_name(&self) -> &str {
        self.person_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.person_name)
    }

    /// `"<person> at <company>"`, used in logs and report headings.
    pub fn display_name(&self) -> String {
        format!("{} at {}", self.person_name, self.company_name)
    }
}

/// SHA-256 over the ordered prospect list. Used to refuse resuming a run
/// against a different input.
pub fn input_fingerprint(prospects: &[Prospect]) -> String {
    let mut hasher = Sha256::new();
    for p in prospects {
        hasher.update(p.person_name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(p.company_name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(p.linkedin_url.as_deref().unwrap_or("").as_bytes());
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// ResearchRecord
// ---------------------------------------------------------------------------

/// Research findings for one prospect. Always holds every schema field; any
/// field the model did not supply is [`MISSING`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRecord {
    values: [String; RESEARCH_FIELD_COUNT],
}

impl ResearchRecord {
    /// A record with every field missing.
    pub fn empty() -> Self {
        Self {
            values: std::array::from_fn(|_| MISSING.to_string()),
        }
    }

    pub fn get(&self, field: ResearchField) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: ResearchField, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    pub fn is_missing(&self, field: ResearchField) -> bool {
        self.get(field).trim().is_empty()
    }

    /// Number of fields holding a non-empty value.
    pub fn filled(&self) -> usize {
        self.values.iter().filter(|v| !v.trim().is_empty()).count()
    }

    /// Fields paired with their values, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (ResearchField, &str)> {
        ResearchField::ALL
            .into_iter()
            .zip(self.values.iter().map(String::as_str))
    }
}

impl Default for ResearchRecord {
    fn default() -> Self {
        Self::empty()
    }
}

// Serialized as a flat `{ key: value }` map with every key present.
impl Serialize for ResearchRecord {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(RESEARCH_FIELD_COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.key(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResearchRecord {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut record = Self::empty();
        for (key, value) in raw {
            if let Some(field) = ResearchField::from_key(&key) {
                record.set(field, value);
            }
        }
        Ok(record)
    }
}

/// How much of a model response the parser could map onto a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Fields recovered from the response.
    pub matched: usize,
    /// Fields the schema expects.
    pub expected: usize,
}

impl MatchReport {
    /// True when some expected fields were not recovered.
    pub fn is_degraded(&self) -> bool {
        self.matched < self.expected
    }
}

// ---------------------------------------------------------------------------
// EmailRecord
// ---------------------------------------------------------------------------

/// A drafted outreach message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub subject: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// ProcessingResult
// ---------------------------------------------------------------------------

/// Terminal status of one prospect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Research and email both succeeded.
    Completed,
    /// Research succeeded, email drafting failed.
    PartialFailure,
    /// Research failed; no email was attempted.
    Failure,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PartialFailure => "partial_failure",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage at which a prospect failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineFailure {
    ResearchFailed,
    EmailFailed,
}

/// Everything produced for one prospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Zero-based input position.
    pub position: usize,
    pub prospect: Prospect,
    pub research: Option<ResearchRecord>,
    pub email: Option<EmailRecord>,
    pub status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<PipelineFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Parse quality of the research response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_match: Option<MatchReport>,
    /// False when the email subject had to be defaulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject_found: Option<bool>,
    /// Gateway attempts spent on this prospect across both stages.
    #[serde(default)]
    pub attempts: u32,
}

impl ProcessingResult {
    pub fn is_success(&self) -> bool {
        self.status == ProcessingStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn karl() -> Prospect {
        Prospect::new(
            "Karl Martin",
            "integrate.ai",
            Some("https://www.linkedin.com/in/karlmartin0".into()),
        )
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn first_name_and_display() {
        let p = karl();
        assert_eq!(p.first_name(), "Karl");
        assert_eq!(p.display_name(), "Karl Martin at integrate.ai");
        assert_eq!(Prospect::new("", "x", None).first_name(), "");
    }

    #[test]
    fn fingerprint_depends_on_order() {
        let a = karl();
        let b = Prospect::new("John Smith", "TechCorp AI", None);
        let f1 = input_fingerprint(&[a.clone(), b.clone()]);
        let f2 = input_fingerprint(&[b, a.clone()]);
        assert_ne!(f1, f2);
        assert_eq!(f1.len(), 64);
        assert_eq!(input_fingerprint(&[a.clone()]), input_fingerprint(&[a]));
    }

    #[test]
    fn empty_record_has_every_field() {
        let record = ResearchRecord::empty();
        assert_eq!(record.iter().count(), RESEARCH_FIELD_COUNT);
        assert_eq!(record.filled(), 0);
        assert!(record.is_missing(ResearchField::GeneralReport));
    }

    #[test]
    fn record_serializes_total_key_set() {
        let mut record = ResearchRecord::empty();
        record.set(ResearchField::AiMlInitiatives, "Federated learning platform");

        let json = serde_json::to_value(&record).expect("serialize");
        let obj = json.as_object().expect("object");
        assert_eq!(obj.len(), RESEARCH_FIELD_COUNT);
        assert_eq!(obj["ai_ml_initiatives"], "Federated learning platform");
        assert_eq!(obj["breakage_claims_rollout_governance"], "");

        let back: ResearchRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn record_deserialize_ignores_unknown_and_fills_missing() {
        let back: ResearchRecord =
            serde_json::from_str(r#"{"general_report":"CEO","bogus":"x"}"#).unwrap();
        assert_eq!(back.get(ResearchField::GeneralReport), "CEO");
        assert_eq!(back.filled(), 1);
    }

    #[test]
    fn processing_result_serialization() {
        let result = ProcessingResult {
            position: 0,
            prospect: karl(),
            research: Some(ResearchRecord::empty()),
            email: None,
            status: ProcessingStatus::PartialFailure,
            failure: Some(PipelineFailure::EmailFailed),
            error_detail: Some("timed out".into()),
            research_match: Some(MatchReport {
                matched: 3,
                expected: RESEARCH_FIELD_COUNT,
            }),
            email_subject_found: None,
            attempts: 5,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""status":"partial_failure""#));
        assert!(json.contains(r#""failure":"email_failed""#));
        let parsed: ProcessingResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
        assert!(parsed.research_match.unwrap().is_degraded());
    }
}
