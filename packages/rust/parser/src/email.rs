//! Email response parsing.
//!
//! The subject comes from an explicit `Subject:` marker. The body is taken
//! from the first of these that matches:
//! 1. a `Message #1` block (up to `Message #2`)
//! 2. a `Part 2: LinkedIn DM` block (up to `Part 3`)
//! 3. a greeting paragraph starting `Hi <Name>,`
//! 4. whatever remains once the subject line is removed

use std::sync::LazyLock;

use outreach_shared::EmailRecord;
use regex::Regex;
use tracing::debug;

use crate::cleanup::{strip_code_fences, trim_decorations, trim_separator_lines};

/// Where the email body was found in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySource {
    MessageMarker,
    LinkedInDm,
    Greeting,
    Remainder,
}

/// An email record plus whether the subject was present in the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEmail {
    /// Subject is empty when `subject_found` is false.
    pub record: EmailRecord,
    pub subject_found: bool,
    pub body_source: BodySource,
}

impl ParsedEmail {
    /// Fill a missing subject with [`default_subject`].
    pub fn with_default_subject(mut self, company_name: &str) -> Self {
        if !self.subject_found {
            self.record.subject = default_subject(company_name);
        }
        self
    }
}

/// Subject used when the model omitted one.
pub fn default_subject(company_name: &str) -> String {
    format!("Your AI initiatives at {company_name}")
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static SUBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t>#*_-]*subject(?:[ \t]+line)?[ \t*_]*:[ \t*_]*(.+?)[ \t]*$")
        .expect("subject regex")
});

static MESSAGE_1_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)message\s*#?\s*1\b[\s*_]*:?[\s*_]*(.*?)(?:[#*\s]*message\s*#?\s*2\b|\z)")
        .expect("message regex")
});

static LINKEDIN_DM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)part\s*2\b[\s*_]*:?[\s*_-]*linkedin\s*dm[\s*_]*:?[\s*_]*",
        r"(.*?)(?:[#*\s]*part\s*3\b|\z)",
    ))
    .expect("linkedin dm regex")
});

static GREETING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(Hi\s+[\w.'-]+,.*)").expect("greeting regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a raw email response. Never fails.
pub fn parse_email(raw: &str) -> ParsedEmail {
    let text = strip_code_fences(raw);

    let subject_match = SUBJECT_RE.captures(text).and_then(|caps| caps.get(1));
    let subject = subject_match
        .map(|m| trim_decorations(m.as_str()).to_string())
        .filter(|s| !s.is_empty());

    let (body, body_source) = extract_body(text, subject_match.map(|m| m.end()));

    debug!(
        subject_found = subject.is_some(),
        ?body_source,
        body_len = body.len(),
        "parsed email response"
    );

    ParsedEmail {
        subject_found: subject.is_some(),
        record: EmailRecord {
            subject: subject.unwrap_or_default(),
            body,
        },
        body_source,
    }
}

fn extract_body(text: &str, subject_end: Option<usize>) -> (String, BodySource) {
    let candidates: [(&Regex, BodySource); 3] = [
        (&MESSAGE_1_RE, BodySource::MessageMarker),
        (&LINKEDIN_DM_RE, BodySource::LinkedInDm),
        (&GREETING_RE, BodySource::Greeting),
    ];

    for (re, source) in candidates {
        if let Some(m) = re.captures(text).and_then(|caps| caps.get(1)) {
            let body = trim_separator_lines(m.as_str().trim());
            if !body.is_empty() {
                return (body, source);
            }
        }
    }

    let rest = match subject_end {
        Some(end) => &text[end..],
        None => text,
    };
    (trim_separator_lines(rest.trim()), BodySource::Remainder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_and_message_markers() {
        let raw = "\
SUBJECT: Federated learning at integrate.ai

MESSAGE #1:
Hi Karl,

Saw your work on privacy-preserving ML.

Best,
Sam

MESSAGE #2:
Following up.";
        let parsed = parse_email(raw);
        assert!(parsed.subject_found);
        assert_eq!(parsed.record.subject, "Federated learning at integrate.ai");
        assert_eq!(parsed.body_source, BodySource::MessageMarker);
        assert!(parsed.record.body.starts_with("Hi Karl,"));
        assert!(parsed.record.body.ends_with("Sam"));
        assert!(!parsed.record.body.contains("Following up"));
    }

    #[test]
    fn bold_markdown_markers() {
        let raw =
            "**Subject:** \"Scaling GenAI at Acme\"\n\n**Message #1:**\nHi Jo,\nShort note.\n";
        let parsed = parse_email(raw);
        assert_eq!(parsed.record.subject, "Scaling GenAI at Acme");
        assert_eq!(parsed.record.body, "Hi Jo,\nShort note.");
    }

    #[test]
    fn linkedin_dm_section() {
        let raw = "\
Part 1: Research summary
stuff

Part 2: LinkedIn DM
Hi Karl, I sincerely relate seeing integrate.ai's work on federated learning.

Part 3: Notes
ignore me";
        let parsed = parse_email(raw);
        assert!(!parsed.subject_found);
        assert_eq!(parsed.body_source, BodySource::LinkedInDm);
        assert!(parsed.record.body.starts_with("Hi Karl, I sincerely"));
        assert!(!parsed.record.body.contains("ignore me"));
    }

    #[test]
    fn greeting_fallback() {
        let raw = "Sure! Here's a draft.\n\nHi Priya,\nLoved your talk.\n";
        let parsed = parse_email(raw);
        assert_eq!(parsed.body_source, BodySource::Greeting);
        assert_eq!(parsed.record.body, "Hi Priya,\nLoved your talk.");
    }

    #[test]
    fn remainder_after_subject() {
        let raw = "Subject: Quick question\n\nWould you be open to a chat?";
        let parsed = parse_email(raw);
        assert_eq!(parsed.record.subject, "Quick question");
        assert_eq!(parsed.body_source, BodySource::Remainder);
        assert_eq!(parsed.record.body, "Would you be open to a chat?");
    }

    #[test]
    fn missing_subject_is_flagged_and_defaulted() {
        let parsed = parse_email("Just a body with no markers.");
        assert!(!parsed.subject_found);
        assert_eq!(parsed.record.subject, "");
        assert_eq!(parsed.record.body, "Just a body with no markers.");

        let filled = parsed.with_default_subject("integrate.ai");
        assert_eq!(filled.record.subject, "Your AI initiatives at integrate.ai");
    }

    #[test]
    fn default_does_not_replace_found_subject() {
        let parsed = parse_email("Subject: Hello\nHi A,\nbody").with_default_subject("X");
        assert_eq!(parsed.record.subject, "Hello");
    }

    #[test]
    fn empty_and_garbage_input_never_panics() {
        for raw in ["", "\n\n", "Subject:", "MESSAGE #1:", "```\n```", "Part 2 LinkedIn DM"] {
            let parsed = parse_email(raw);
            assert!(!parsed.subject_found, "input {raw:?}");
        }
    }
}
