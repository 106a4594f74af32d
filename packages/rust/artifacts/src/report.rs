//! Research results as a Markdown report, one signal table per prospect.

use std::fmt::Write;

use outreach_shared::{ProcessingResult, ResearchField};

/// Cell text for a field with no value.
const NOT_AVAILABLE: &str = "NA";

pub fn render(results: &[ProcessingResult]) -> String {
    let mut out = String::from("# Sales Research Results\n");

    for (i, result) in results.iter().enumerate() {
        let _ = write!(
            out,
            "\n## Prospect {}: {}\n\n",
            i + 1,
            result.prospect.display_name()
        );
        if let Some(url) = &result.prospect.linkedin_url {
            let _ = writeln!(out, "LinkedIn: {url}\n");
        }

        let Some(record) = &result.research else {
            let detail = result.error_detail.as_deref().unwrap_or("no detail");
            let _ = writeln!(out, "_Research failed: {}_", escape_cell(detail));
            continue;
        };

        if let Some(report) = result.research_match.filter(|r| r.is_degraded()) {
            let _ = writeln!(
                out,
                "_Partial research: {} of {} signals recovered._\n",
                report.matched, report.expected
            );
        }

        out.push_str(concat!(
            "| Category Signal | Why it matters (sales-use lens) ",
            "| How to capture (open-source clues) | Signal Description | Source URL Evidence |\n",
        ));
        out.push_str("|---|---|---|---|---|\n");

        for field in ResearchField::ALL {
            let spec = field.spec();
            let value = record.get(field).trim();
            let (signal, source) = if value.is_empty() {
                (NOT_AVAILABLE.to_string(), NOT_AVAILABLE)
            } else {
                (
                    escape_cell(value),
                    result.prospect.linkedin_url.as_deref().unwrap_or(NOT_AVAILABLE),
                )
            };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                spec.label, spec.why_it_matters, spec.how_to_capture, signal, source
            );
        }
    }

    out
}

/// Keep a value inside one table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("<br>")
}
