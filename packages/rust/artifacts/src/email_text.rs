//! Drafted emails as a plain-text file, one block per prospect.

use std::fmt::Write;

use outreach_shared::ProcessingResult;

const BANNER_WIDTH: usize = 60;
const RULE_WIDTH: usize = 40;

pub fn render(results: &[ProcessingResult]) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(out, "{banner}");
        let _ = writeln!(out, "EMAIL {}: {}", i + 1, result.prospect.display_name());
        let _ = writeln!(out, "{banner}\n");
        let _ = writeln!(out, "STATUS: {}", result.status);

        match &result.email {
            Some(email) => {
                let _ = writeln!(out, "SUBJECT: {}\n", email.subject);
                let _ = writeln!(out, "MESSAGE #1:");
                let _ = writeln!(out, "{rule}");
                let _ = writeln!(out, "{}\n", email.body.trim());
            }
            None => {
                let detail = result.error_detail.as_deref().unwrap_or("no detail");
                let _ = writeln!(out, "NOT GENERATED: {detail}\n");
            }
        }
    }

    out
}
