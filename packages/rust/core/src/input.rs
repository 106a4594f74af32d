//! Prospect list loading from CSV.
//!
//! Required columns: `person_name`, `company_name`. `linkedin_url` is read when
//! present. Header names are matched case-insensitively; extra columns are
//! ignored. Rows missing a required value are skipped with a warning.

use std::io::Read;
use std::path::Path;

use outreach_shared::{OutreachError, Prospect, Result};
use tracing::{info, warn};

const PERSON_COLUMN: &str = "person_name";
const COMPANY_COLUMN: &str = "company_name";
const LINKEDIN_COLUMN: &str = "linkedin_url";

/// A row that was not turned into a prospect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the file (header is line 1).
    pub line: u64,
    pub reason: String,
}

/// What was found in an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSummary {
    pub columns: Vec<String>,
    pub rows: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Prospects in file order plus the summary.
#[derive(Debug, Clone)]
pub struct ProspectInput {
    pub prospects: Vec<Prospect>,
    pub summary: InputSummary,
}

/// Read and validate a prospect CSV file.
pub fn read_prospects_csv(path: &Path) -> Result<ProspectInput> {
    let file = std::fs::File::open(path).map_err(|e| OutreachError::io(path, e))?;
    let input = parse_prospects_csv(file)?;
    info!(
        path = %path.display(),
        prospects = input.prospects.len(),
        skipped = input.summary.skipped.len(),
        "loaded prospects"
    );
    Ok(input)
}

/// Check an input file without processing it.
pub fn validate_prospects_csv(path: &Path) -> Result<InputSummary> {
    read_prospects_csv(path).map(|input| input.summary)
}

/// Parse prospect CSV from any reader.
pub fn parse_prospects_csv(reader: impl Read) -> Result<ProspectInput> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| OutreachError::parse(format!("invalid CSV header: {e}")))?
        .clone();

    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    };

    let (person_idx, company_idx) = match (find(PERSON_COLUMN), find(COMPANY_COLUMN)) {
        (Some(p), Some(c)) => (p, c),
        _ => {
            return Err(OutreachError::validation(format!(
                "CSV must contain columns {PERSON_COLUMN} and {COMPANY_COLUMN} (found: {})",
                columns.join(", ")
            )));
        }
    };
    let linkedin_idx = find(LINKEDIN_COLUMN);

    let mut prospects = Vec::new();
    let mut skipped = Vec::new();
    let mut rows = 0;

    for record in csv_reader.records() {
        let record = record.map_err(|e| OutreachError::parse(format!("invalid CSV row: {e}")))?;
        rows += 1;
        let line = record.position().map_or(rows as u64 + 1, |p| p.line());

        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        let person = field(person_idx);
        let company = field(company_idx);

        if person.is_empty() || company.is_empty() {
            let reason = format!(
                "missing {}",
                if person.is_empty() { PERSON_COLUMN } else { COMPANY_COLUMN }
            );
            warn!(line, %reason, "skipping incomplete row");
            skipped.push(SkippedRow { line, reason });
            continue;
        }

        let linkedin_url = linkedin_idx
            .map(field)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        prospects.push(Prospect::new(person, company, linkedin_url));
    }

    if prospects.is_empty() {
        return Err(OutreachError::validation(
            "no valid prospects found in CSV input",
        ));
    }

    Ok(ProspectInput {
        prospects,
        summary: InputSummary {
            columns,
            rows,
            skipped,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_rows_in_order() {
        let csv = "\
person_name,company_name,linkedin_url
Karl Martin,integrate.ai,https://www.linkedin.com/in/karlmartin0
John Smith,TechCorp AI,
";
        let input = parse_prospects_csv(csv.as_bytes()).unwrap();
        assert_eq!(input.prospects.len(), 2);
        assert_eq!(input.prospects[0].person_name, "Karl Martin");
        assert_eq!(
            input.prospects[0].linkedin_url.as_deref(),
            Some("https://www.linkedin.com/in/karlmartin0")
        );
        assert_eq!(input.prospects[1].company_name, "TechCorp AI");
        assert_eq!(input.prospects[1].linkedin_url, None);
        assert_eq!(input.summary.rows, 2);
        assert!(input.summary.skipped.is_empty());
    }

    #[test]
    fn headers_are_case_insensitive_and_reorderable() {
        let csv = "Company_Name,notes,Person_Name\nAcme,x,Jo Doe\n";
        let input = parse_prospects_csv(csv.as_bytes()).unwrap();
        assert_eq!(input.prospects[0], Prospect::new("Jo Doe", "Acme", None));
        assert_eq!(input.summary.columns, vec!["Company_Name", "notes", "Person_Name"]);
    }

    #[test]
    fn incomplete_rows_are_skipped() {
        let csv = "\
person_name,company_name
Karl Martin,integrate.ai
,NoName Inc
Jane Doe,
  Priya  ,  Initech
";
        let input = parse_prospects_csv(csv.as_bytes()).unwrap();
        assert_eq!(input.prospects.len(), 2);
        assert_eq!(input.prospects[1], Prospect::new("Priya", "Initech", None));
        assert_eq!(input.summary.rows, 4);
        assert_eq!(input.summary.skipped.len(), 2);
        assert_eq!(input.summary.skipped[0].line, 3);
        assert!(input.summary.skipped[0].reason.contains("person_name"));
        assert!(input.summary.skipped[1].reason.contains("company_name"));
    }

    #[test]
    fn missing_required_column_is_error() {
        let err = parse_prospects_csv("name,company\nA,B\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("person_name"));
    }

    #[test]
    fn empty_input_is_error() {
        let err = parse_prospects_csv("person_name,company_name\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no valid prospects"));

        let err = parse_prospects_csv("person_name,company_name\n,\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no valid prospects"));
    }

    #[test]
    fn validate_reports_summary() {
        let path =
            std::env::temp_dir().join(format!("outreach-input-{}.csv", uuid::Uuid::now_v7()));
        std::fs::write(&path, "person_name,company_name\nA B,C\n,D\n").unwrap();
        let summary = validate_prospects_csv(&path).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.skipped.len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let path =
            std::env::temp_dir().join(format!("outreach-missing-{}.csv", uuid::Uuid::now_v7()));
        let err = read_prospects_csv(&path).unwrap_err();
        assert!(matches!(err, OutreachError::Io { .. }));
    }
}
