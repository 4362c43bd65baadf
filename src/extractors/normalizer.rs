// src/extractors/normalizer.rs
//! Rewrite rules that undo the artifacts PDF text extraction leaves in the
//! budget exhibit: leader dots, digit grouping, placeholder hyphens and lost
//! row breaks.
//!
//! Rules run in a fixed order; later rules rely on the output of earlier
//! ones. Row and field boundaries are written as control characters that
//! cannot survive rule 1, so running the normalizer twice is a no-op.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::RuleVariant;
use crate::utils::error::ConfigError;

/// Inserted between rows (rule 6).
pub const ROW_BREAK: char = '\u{1e}';
/// Inserted between the fields of a row (rules 4 and 5).
pub const FIELD_SEPARATOR: char = '\u{1f}';

// --- Regex Patterns (Lazy Static) ---
static PLACEHOLDER_HYPHENS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d.])?\.--").expect("Failed to compile PLACEHOLDER_HYPHENS_RE"));

static LEADER_DOTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{3,}").expect("Failed to compile LEADER_DOTS_RE"));

static DIGIT_THEN_UPPER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)([A-Z])").expect("Failed to compile DIGIT_THEN_UPPER_RE"));

static SPACE_BEFORE_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(" +{}", FIELD_SEPARATOR))
        .expect("Failed to compile SPACE_BEFORE_SEPARATOR_RE")
});

/// The rewrite steps, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    StripStructural,
    RemoveBoilerplate,
    PlaceholderHyphens,
    LeaderDots,
    NumericGaps,
    RowBreaks,
    SpaceBeforeSeparator,
}

impl Rule {
    pub const ORDER: [Rule; 7] = [
        Rule::StripStructural,
        Rule::RemoveBoilerplate,
        Rule::PlaceholderHyphens,
        Rule::LeaderDots,
        Rule::NumericGaps,
        Rule::RowBreaks,
        Rule::SpaceBeforeSeparator,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rule::StripStructural => "strip_structural",
            Rule::RemoveBoilerplate => "remove_boilerplate",
            Rule::PlaceholderHyphens => "placeholder_hyphens",
            Rule::LeaderDots => "leader_dots",
            Rule::NumericGaps => "numeric_gaps",
            Rule::RowBreaks => "row_breaks",
            Rule::SpaceBeforeSeparator => "space_before_separator",
        }
    }
}

/// Applies the rule set for one document edition.
#[derive(Debug, Clone)]
pub struct Normalizer {
    boilerplate: Option<Regex>,
    numeric_gap: Regex,
}

impl Normalizer {
    /// Compiles the variant's patterns. Fails when the boilerplate list or the
    /// numeric gap width produces a pattern the regex engine rejects.
    pub fn new(variant: &RuleVariant) -> Result<Self, ConfigError> {
        let mut literals: Vec<&str> = variant
            .boilerplate
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        // Alternation is leftmost-first, so " of Total" must be tried before "Total".
        literals.sort_by(|a, b| b.len().cmp(&a.len()));
        let boilerplate = if literals.is_empty() {
            None
        } else {
            let pattern = literals
                .iter()
                .map(|lit| regex::escape(lit))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&pattern)
                .map_err(|e| ConfigError::Invalid(format!("boilerplate pattern rejected: {}", e)))?;
            Some(re)
        };

        let gap = variant.min_numeric_gap.max(1);
        let numeric_gap = Regex::new(&format!(r"(\d) {{{},}}(\d)", gap)).map_err(|e| {
            ConfigError::Invalid(format!("min_numeric_gap {} rejected: {}", variant.min_numeric_gap, e))
        })?;

        Ok(Self { boilerplate, numeric_gap })
    }

    /// Rule 1 only. Used on the whole document before anchors are located.
    pub fn strip_structural(&self, text: &str) -> String {
        text.chars()
            .filter(|c| !matches!(c, '\r' | '\n' | ',' | '$' | '%'))
            .collect()
    }

    /// Runs every rule in order. Text that matches no rule passes through.
    pub fn normalize(&self, text: &str) -> String {
        Rule::ORDER
            .iter()
            .fold(text.to_string(), |acc, rule| self.apply(*rule, &acc))
    }

    pub fn apply(&self, rule: Rule, text: &str) -> String {
        let out = match rule {
            Rule::StripStructural => Cow::Owned(self.strip_structural(text)),
            Rule::RemoveBoilerplate => match &self.boilerplate {
                Some(re) => re.replace_all(text, ""),
                None => Cow::Borrowed(text),
            },
            Rule::PlaceholderHyphens => {
                PLACEHOLDER_HYPHENS_RE.replace_all(text, |caps: &Captures| match caps.get(1) {
                    // "1234567.--" is an empty decimal part; "...--" keeps its last leader dot.
                    Some(prev) => format!("{}.0", prev.as_str()),
                    // ".--" standing alone: an empty value.
                    None => "0".to_string(),
                })
            }
            Rule::LeaderDots => LEADER_DOTS_RE.replace_all(text, FIELD_SEPARATOR.to_string()),
            Rule::NumericGaps => Cow::Owned(self.split_numeric_gaps(text)),
            Rule::RowBreaks => {
                DIGIT_THEN_UPPER_RE.replace_all(text, format!("${{1}}{}${{2}}", ROW_BREAK))
            }
            Rule::SpaceBeforeSeparator => {
                SPACE_BEFORE_SEPARATOR_RE.replace_all(text, FIELD_SEPARATOR.to_string())
            }
        };
        let out = out.into_owned();
        if out != text {
            tracing::trace!("Rule {} rewrote {} -> {} bytes", rule.name(), text.len(), out.len());
        }
        out
    }

    // Matches share their trailing digit with the next gap ("1 2 3"), so
    // replace until nothing is left.
    fn split_numeric_gaps(&self, text: &str) -> String {
        let replacement = format!("${{1}}{}${{2}}", FIELD_SEPARATOR);
        let mut current = text.to_string();
        while self.numeric_gap.is_match(&current) {
            current = self
                .numeric_gap
                .replace_all(&current, replacement.as_str())
                .into_owned();
        }
        current
    }
}
