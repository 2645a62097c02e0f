//! Markdown fence removal.
//!
//! Models are told not to wrap output in ```` ``` ```` blocks and do it anyway.
//! If a fenced block is present only its body is kept; otherwise any stray
//! fence markers are dropped wherever they appear.

use once_cell::sync::Lazy;
use regex::Regex;

/// First fenced block, with an optional language hint after the opening marker.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n(.*?)\r?\n?```").expect("fenced block regex")
});

static OPENING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_+\-]*[ \t]*\r?\n?").expect("opening marker regex")
});

static CLOSING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\r?\n?```[ \t]*$").expect("closing marker regex"));

/// Strip markdown fences. Always returns trimmed text without any ```` ``` ````.
pub fn strip_fences(text: &str) -> String {
    let body = match FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => text,
    };
    let body = OPENING_MARKER.replace_all(body, "");
    let body = CLOSING_MARKER.replace_all(&body, "");
    body.replace("```", "").trim().to_string()
}
