//! Research results as CSV: one row per prospect, one column per schema field.

use outreach_shared::{OutreachError, ProcessingResult, ResearchField, Result};

/// Identity and status columns that precede the research fields.
const LEAD_COLUMNS: [&str; 5] = ["person_name", "company_name", "linkedin_url", "status", "error"];

/// Header row: identity columns followed by every field key in schema order.
pub fn header() -> Vec<&'static str> {
    LEAD_COLUMNS
        .iter()
        .copied()
        .chain(ResearchField::ALL.iter().map(|f| f.key()))
        .collect()
}

/// CSV output failures are a data problem, not an input parse error.
fn output_error(stage: &str, e: impl std::fmt::Display) -> OutreachError {
    OutreachError::validation(format!("csv {stage} failed: {e}"))
}

/// Render all results. Prospects without research get empty field columns.
pub fn render(results: &[ProcessingResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(header())
        .map_err(|e| output_error("write", e))?;

    for result in results {
        let mut row: Vec<&str> = vec![
            result.prospect.person_name.as_str(),
            result.prospect.company_name.as_str(),
            result.prospect.linkedin_url.as_deref().unwrap_or(""),
            result.status.as_str(),
            result.error_detail.as_deref().unwrap_or(""),
        ];
        match &result.research {
            Some(record) => row.extend(record.iter().map(|(_, value)| value)),
            None => row.extend(std::iter::repeat_n("", ResearchField::ALL.len())),
        }
        writer
            .write_record(&row)
            .map_err(|e| output_error("write", e))?;
    }

    let bytes = writer.into_inner().map_err(|e| output_error("flush", e))?;
    String::from_utf8(bytes).map_err(|e| output_error("encoding", e))
}
