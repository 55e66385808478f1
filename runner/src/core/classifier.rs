//! Classification of failed runner output into retryable quota exhaustion vs
//! fatal failures.
//!
//! Matching is case-insensitive substring search against a per-runner pattern
//! list. The lists are heuristics over human-readable CLI output and can be
//! overridden from configuration when a provider changes its wording.

use crate::error::UsageLimitExceeded;

pub const CODEX_USAGE_LIMIT_PATTERNS: &[&str] = &[
    "you've hit your usage limit",
    "usage limit",
    "purchase more credits",
];

pub const COPILOT_USAGE_LIMIT_PATTERNS: &[&str] =
    &["usage limit", "rate limit exceeded", "quota exceeded"];

pub const GEMINI_USAGE_LIMIT_PATTERNS: &[&str] = &[
    "usage limit",
    "quota exceeded",
    "rate limit exceeded",
    "quota has been exhausted",
];

/// Ordered, lower-cased substrings that indicate exhausted quota.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageLimitPatterns {
    patterns: Vec<String>,
}

impl UsageLimitPatterns {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    /// True if any pattern occurs in `output`, ignoring case.
    pub fn matches(&self, output: &str) -> bool {
        self.matched_in(&output.to_lowercase()).next().is_some()
    }

    fn matched_in<'a>(&'a self, lower: &'a str) -> impl Iterator<Item = &'a str> {
        self.iter().filter(move |p| lower.contains(p))
    }
}

/// Outcome of inspecting a failed attempt's combined output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Quota exhausted; the next candidate should be tried.
    Retryable(UsageLimitExceeded),
    /// Not a quota failure; surface as-is and stop.
    Fatal,
}

/// Classify `combined_output` (stderr followed by stdout) for `runner`.
pub fn classify(
    runner: &str,
    combined_output: &str,
    patterns: &UsageLimitPatterns,
) -> Classification {
    if !patterns.matches(combined_output) {
        return Classification::Fatal;
    }
    Classification::Retryable(UsageLimitExceeded {
        runner: runner.to_string(),
        message: extract_message(combined_output, patterns),
    })
}

/// Pick the line of `output` that explains the quota failure.
///
/// Returns the first line (original casing, trimmed) containing a matched
/// pattern. If patterns only match across lines, the first non-empty line is
/// used. If nothing matches, `output` is returned unchanged.
pub fn extract_message(output: &str, patterns: &UsageLimitPatterns) -> String {
    let lower = output.to_lowercase();
    let matched: Vec<&str> = patterns.matched_in(&lower).collect();
    if matched.is_empty() {
        return output.to_string();
    }

    for line in output.lines() {
        let line_lower = line.to_lowercase();
        if matched.iter().any(|p| line_lower.contains(p)) {
            return line.trim().to_string();
        }
    }

    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| output.to_string())
}
