//! Text normalization passes shared by the research and email parsers.

use std::sync::LazyLock;

use regex::Regex;

/// Remove a wrapping Markdown code fence (```` ```json ... ``` ````) if present.
///
/// Only the outermost fence is removed; text without a fence is returned trimmed.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n(.*?)\n?\s*```\s*$").expect("valid regex")
    });

    match FENCE_RE.captures(text) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim(),
        None => text.trim(),
    }
}

/// Strip list bullets, ordered-list numbers, heading hashes and blockquote
/// markers from the start of a line, then drop bold/underline emphasis.
pub(crate) fn strip_line_markup(line: &str) -> String {
    static LEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:\s*(?:#{1,6}|>|[-*•+]|\d{1,3}[.)]))+\s+").expect("valid regex")
    });

    let line = line.trim();
    let line = LEAD_RE.replace(line, "");
    line.replace("**", "").replace("__", "").trim().to_string()
}

/// Lowercase a label and collapse every run of non-alphanumerics to one space.
///
/// `"AI/ML Initiatives"`, `"ai_ml_initiatives"` and `"AI-ML  initiatives"` all
/// normalize to `"ai ml initiatives"`.
pub(crate) fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_space = false;
    for ch in label.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Values models use to say "nothing found". Treated as missing.
pub(crate) fn is_placeholder(value: &str) -> bool {
    let v = normalize_label(value);
    matches!(
        v.as_str(),
        "" | "na" | "n a" | "none" | "null" | "unknown" | "not found" | "not available"
            | "no information" | "no data"
    )
}

/// Trim surrounding quotes and emphasis from a single-line value.
pub(crate) fn trim_decorations(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c| c == '*' || c == '_' || c == '"' || c == '\'' || c == '`')
        .trim()
}

/// Drop separator lines (`---`, `===`) at either end of a block.
pub(crate) fn trim_separator_lines(text: &str) -> String {
    static SEP_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*(?:-{3,}|={3,}|\*{3,}|_{3,})\s*$").expect("valid regex"));

    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty() && !SEP_RE.is_match(l))
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty() && !SEP_RE.is_match(l))
        .map_or(start, |i| i + 1);

    lines[start..end.max(start)].join("\n")
}
