//! Host pattern matching.
//!
//! # Responsibilities
//! - Compile a configured host key into an anchored matcher
//! - Match a requested hostname against it
//!
//! # Design Decisions
//! - A single `*` stands for exactly one DNS label (`[^.]+`)
//! - Only the first `.` and the first `*` of a pattern are rewritten; the
//!   rest of the pattern reaches the regex engine verbatim. Existing hosts
//!   files depend on this, so `a.b.example.com` also matches `a.bXexample.com`
//! - Matching is case-sensitive, keys are compared as written
//! - A pattern that does not compile never matches

use regex::Regex;

/// A compiled host key from the `hosts` or `https` mapping.
#[derive(Debug, Clone)]
pub struct HostPattern {
    raw: String,
    regex: Option<Regex>,
}

impl HostPattern {
    /// Compile a pattern. Never fails; an uncompilable pattern is kept but
    /// matches nothing.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let regex = match Regex::new(&regex_source(&raw)) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(pattern = %raw, error = %e, "Host pattern does not compile and will never match");
                None
            }
        };
        Self { raw, regex }
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern contains a wildcard label.
    pub fn is_wildcard(&self) -> bool {
        self.raw.contains('*')
    }

    /// Whether the pattern compiled successfully.
    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// Returns true if `hostname` matches this pattern.
    pub fn matches(&self, hostname: &str) -> bool {
        if hostname.is_empty() {
            return false;
        }
        self.regex
            .as_ref()
            .map(|regex| regex.is_match(hostname))
            .unwrap_or(false)
    }
}

impl std::fmt::Display for HostPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One-shot match of `hostname` against an uncompiled pattern.
pub fn matches(pattern: &str, hostname: &str) -> bool {
    HostPattern::parse(pattern).matches(hostname)
}

fn regex_source(pattern: &str) -> String {
    let escaped = pattern.replacen('.', "\\.", 1).replacen('*', "[^.]+", 1);
    format!("^{}$", escaped)
}
