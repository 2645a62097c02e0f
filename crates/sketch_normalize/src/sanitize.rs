//! Removes syntax the in-browser Babel build cannot reliably lower, plus
//! leftovers models tend to emit around the component.
//!
//! Every rule is a plain text rewrite; text that matches nothing passes
//! through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::COMPONENT_SLOT;

static TYPED_COMPONENT_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":\s*React\.(?:FC|FunctionComponent)\b(?:<[^<>]*>)?").expect("typed alias regex")
});

static TYPED_DESTRUCTURED_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*\{\s*([^}]+?)\s*\}\s*:\s*\{[^}]+\}\s*\)").expect("typed param regex")
});

static AS_CONST: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+as\s+const\b").expect("as const regex"));

static GUARDED_SLOT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?s)if\s*\(\s*typeof\s+window\s*!==?\s*["']undefined["']\s*\)\s*\{{[^{{}}]*?window\.{COMPONENT_SLOT}[^{{}}]*\}}"#
    ))
    .expect("guarded slot regex")
});

static STANDALONE_SLOT_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]*window\.{COMPONENT_SLOT}\s*=\s*[^;\n]+;?[ \t]*$"
    ))
    .expect("slot assignment regex")
});

static BARE_IDENTIFIER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[A-Z][A-Za-z0-9_]*;[ \t]*$").expect("bare identifier regex"));

static MODULE_EXPORTS_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^[ \t]*module\.exports\b.*$").expect("module.exports regex"));

static EXPORTS_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^[ \t]*exports\..*$").expect("exports regex"));

/// Apply every sanitizer rule in order and trim the result.
pub fn sanitize(code: &str) -> String {
    let code = TYPED_COMPONENT_ALIAS.replace_all(code, "");
    let code = TYPED_DESTRUCTURED_PARAM.replace_all(&code, "({ ${1} })");
    let code = AS_CONST.replace_all(&code, "");
    let code = GUARDED_SLOT_BLOCK.replace_all(&code, "");
    let code = BARE_IDENTIFIER_LINE.replace_all(&code, "");
    let code = MODULE_EXPORTS_TAIL.replace_all(&code, "");
    let code = EXPORTS_TAIL.replace_all(&code, "");
    let code = STANDALONE_SLOT_ASSIGNMENT.replace_all(&code, "");
    code.trim().to_string()
}
