//! Truncation heuristics for generated source.
//!
//! Not a parser. Each rule is evaluated independently and any hit marks the
//! text as incomplete, which sends the run back for another generation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Opened component tags may exceed closed ones by this much before the text
/// counts as truncated (nested components produce false positives).
pub const TAG_TOLERANCE: usize = 3;

const UI_LIBRARY_TOKENS: &[&str] = &["React", "react"];
const DECLARATION_KEYWORDS: &[&str] = &["export default", "function", "const", "let", "var"];
const TRAILING_OPENERS: &[char] = &[',', '{', '(', '['];

static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Z][A-Za-z0-9]*[^/>]*>").expect("open tag regex"));
static CLOSE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</[A-Z][A-Za-z0-9]*>").expect("close tag regex"));
static SELF_CLOSING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Z][A-Za-z0-9]*[^>]*/>").expect("self-closing tag regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    pub has_ui_library: bool,
    pub has_declaration: bool,
    pub open_braces: usize,
    pub close_braces: usize,
    pub trailing_opener: Option<char>,
    pub open_tags: usize,
    pub close_tags: usize,
    pub self_closing_tags: usize,
}

impl CompletenessReport {
    pub fn braces_balanced(&self) -> bool {
        self.open_braces == self.close_braces
    }

    pub fn tags_balanced(&self) -> bool {
        self.open_tags <= self.close_tags + self.self_closing_tags + TAG_TOLERANCE
    }

    /// True if any rule fired.
    pub fn looks_incomplete(&self) -> bool {
        !self.has_ui_library
            || !self.has_declaration
            || !self.braces_balanced()
            || self.trailing_opener.is_some()
            || !self.tags_balanced()
    }

    /// Names of the rules that fired, for logs and error messages.
    pub fn findings(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.has_ui_library {
            out.push("missing ui library token");
        }
        if !self.has_declaration {
            out.push("missing declaration");
        }
        if !self.braces_balanced() {
            out.push("unbalanced braces");
        }
        if self.trailing_opener.is_some() {
            out.push("ends with open delimiter");
        }
        if !self.tags_balanced() {
            out.push("unclosed component tags");
        }
        out
    }
}

/// Evaluate every rule against fence-stripped text.
pub fn inspect(code: &str) -> CompletenessReport {
    let trimmed = code.trim();
    CompletenessReport {
        has_ui_library: UI_LIBRARY_TOKENS.iter().any(|t| trimmed.contains(t)),
        has_declaration: DECLARATION_KEYWORDS.iter().any(|k| trimmed.contains(k)),
        open_braces: code.matches('{').count(),
        close_braces: code.matches('}').count(),
        trailing_opener: trimmed.chars().last().filter(|c| TRAILING_OPENERS.contains(c)),
        open_tags: OPEN_TAG.find_iter(code).count(),
        close_tags: CLOSE_TAG.find_iter(code).count(),
        self_closing_tags: SELF_CLOSING_TAG.find_iter(code).count(),
    }
}

pub fn looks_incomplete(code: &str) -> bool {
    inspect(code).looks_incomplete()
}
