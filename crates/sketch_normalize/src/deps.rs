//! Import rewriting for a document without a module system.
//!
//! Import statements are replaced by bindings against the UMD globals the
//! sandbox loads. Resolution is two passes over sets:
//!
//! 1. collect what the blob imports and what it declares itself;
//! 2. classify every capitalized markup tag as local, core, icon, or an
//!    implicit icon dependency the model used without importing.
//!
//! ```text
//! import React, { useState } from 'react'      const React = window.React;
//! import { Home } from 'lucide-react'      →    const { useState } = React;
//! <Home/> <Star/>                               const __iconLibrary = window.Lucide || …;
//!                                               const { Home = …, Star = … } = __iconLibrary;
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const CORE_LIBRARY: &str = "react";
pub const ICON_LIBRARY: &str = "lucide-react";

/// Globals an icon UMD build may register under.
pub const ICON_GLOBALS: &[&str] = &["Lucide", "lucide", "lucideReact"];

const CORE_GLOBAL: &str = "React";
const ICON_BINDING: &str = "__iconLibrary";
const MISSING_ICON: &str = "__missingIcon";

/// Capitalized core exports usable as tags without an import.
const CORE_TAGS: &[&str] = &["Fragment", "Suspense", "StrictMode", "Profiler", "Component"];

/// Language and host globals; a `<Name` match on these is a leftover type
/// argument (`useState<String>`), not markup.
const HOST_GLOBALS: &[&str] = &[
    "Array", "Boolean", "Date", "Error", "HTMLElement", "HTMLInputElement", "JSON", "Map", "Math",
    "Number", "Object", "Partial", "Promise", "Record", "Set", "String",
];

static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+([^;'"]*?)\s*\bfrom\s*['"]([^'"]+)['"][ \t]*;?[ \t]*\r?\n?"#)
        .expect("import regex")
});

static SIDE_EFFECT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*['"][^'"]+['"][ \t]*;?[ \t]*\r?\n?"#)
        .expect("side-effect import regex")
});

static REEXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*export\s+(?:type\s+)?(?:\*(?:\s+as\s+[A-Za-z_$][\w$]*)?|\{[^}]*\})\s*from\s*['"][^'"]+['"][ \t]*;?[ \t]*\r?\n?"#,
    )
    .expect("re-export regex")
});

static NAMED_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]*)\}").expect("named list regex"));

static AS_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+as\s+").expect("as regex"));

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier regex"));

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:const|let|var|function|class)\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .expect("declaration regex")
});

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Z][A-Za-z0-9_]*)").expect("markup tag regex"));

/// One destructured name, optionally renamed (`imported as local`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Binding {
    pub imported: String,
    pub local: String,
}

impl Binding {
    pub fn plain(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { imported: name.clone(), local: name }
    }

    pub fn is_aliased(&self) -> bool {
        self.imported != self.local
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_aliased() {
            write!(f, "{}: {}", self.imported, self.local)
        } else {
            f.write_str(&self.local)
        }
    }
}

/// Where a capitalized markup tag resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagOrigin {
    /// Declared by the blob itself.
    Local,
    /// The core library global or one of its exports.
    Core,
    /// Imported from the icon library.
    Icon,
    /// A language or host global, left alone.
    Host,
    /// Used without import or declaration; assumed to be an icon.
    Implicit,
}

/// Statements parsed out of the blob, grouped by source library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportScan {
    pub core: BTreeSet<Binding>,
    pub icons: BTreeSet<Binding>,
    /// Default or namespace imports of the core library under another name.
    pub core_aliases: BTreeSet<String>,
    /// Default or namespace imports of the icon library.
    pub icon_aliases: BTreeSet<String>,
}

/// Two disjoint binding groups, keyed by local name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencySet {
    pub core: BTreeMap<String, Binding>,
    pub icons: BTreeMap<String, Binding>,
    pub core_aliases: BTreeSet<String>,
    pub icon_aliases: BTreeSet<String>,
}

impl DependencySet {
    pub fn needs_icon_library(&self) -> bool {
        !self.icons.is_empty() || !self.icon_aliases.is_empty()
    }

    /// Header binding every collected name to a runtime global.
    pub fn render_header(&self) -> String {
        let mut out = format!("const {CORE_GLOBAL} = window.{CORE_GLOBAL};\n");
        for alias in &self.core_aliases {
            out.push_str(&format!("const {alias} = {CORE_GLOBAL};\n"));
        }
        if !self.core.is_empty() {
            let names: Vec<String> = self.core.values().map(Binding::to_string).collect();
            out.push_str(&format!("const {{ {} }} = {CORE_GLOBAL};\n", names.join(", ")));
        }
        if self.needs_icon_library() {
            let lookup: Vec<String> = ICON_GLOBALS.iter().map(|g| format!("window.{g}")).collect();
            out.push_str(&format!("const {ICON_BINDING} = {} || {{}};\n", lookup.join(" || ")));
            for alias in &self.icon_aliases {
                out.push_str(&format!("const {alias} = {ICON_BINDING};\n"));
            }
        }
        if !self.icons.is_empty() {
            out.push_str(&format!(
                "const {MISSING_ICON} = function MissingIcon(props) {{ \
                 return props && props.children ? {CORE_GLOBAL}.createElement({CORE_GLOBAL}.Fragment, null, props.children) : null; }};\n"
            ));
            let names: Vec<String> = self
                .icons
                .values()
                .map(|b| format!("{b} = {MISSING_ICON}"))
                .collect();
            out.push_str(&format!("const {{ {} }} = {ICON_BINDING};\n", names.join(", ")));
        }
        out
    }
}

fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

fn parse_named_list(list: &str) -> Vec<Binding> {
    list.split(',')
        .map(str::trim)
        .map(|s| s.strip_prefix("type ").map(str::trim).unwrap_or(s))
        .filter(|s| !s.is_empty())
        .filter_map(|spec| {
            let parts: Vec<&str> = AS_KEYWORD.split(spec).map(str::trim).collect();
            let binding = match parts.as_slice() {
                [name] => Binding::plain(*name),
                [imported, local] => Binding {
                    imported: (*imported).to_string(),
                    local: (*local).to_string(),
                },
                _ => return None,
            };
            (is_identifier(&binding.imported) && is_identifier(&binding.local)).then_some(binding)
        })
        .collect()
}

/// Default and namespace names of an import clause (`React`, `* as R`).
fn parse_default_names(clause: &str) -> Vec<String> {
    let without_list = NAMED_LIST.replace_all(clause, "");
    without_list
        .split(',')
        .map(str::trim)
        .map(|s| s.strip_prefix("* as ").map(str::trim).unwrap_or(s))
        .filter(|s| is_identifier(s) && *s != "type")
        .map(str::to_string)
        .collect()
}

/// Import clauses with their sources, and the code with those statements
/// removed. Imports only count at the start of a line; repeating until
/// nothing matches picks up a second import sharing the first one's line.
fn split_imports(code: &str) -> (Vec<(String, String)>, String) {
    let mut found = Vec::new();
    let mut code = code.to_string();
    while IMPORT_FROM.is_match(&code) {
        for caps in IMPORT_FROM.captures_iter(&code) {
            if let (Some(c), Some(s)) = (caps.get(1), caps.get(2)) {
                found.push((c.as_str().trim().to_string(), s.as_str().to_string()));
            }
        }
        code = IMPORT_FROM.replace_all(&code, "").into_owned();
    }
    (found, code)
}

/// First pass, imports: collect bindings from the two known libraries.
pub fn scan_imports(code: &str) -> ImportScan {
    let mut scan = ImportScan::default();
    let (imports, _) = split_imports(code);
    for (clause, source) in &imports {
        let (clause, source) = (clause.as_str(), source.as_str());
        let clause = clause.strip_prefix("type ").unwrap_or(clause);
        let named: Vec<Binding> = NAMED_LIST
            .captures(clause)
            .and_then(|c| c.get(1))
            .map(|m| parse_named_list(m.as_str()))
            .unwrap_or_default();
        let defaults = parse_default_names(clause);
        match source {
            CORE_LIBRARY => {
                scan.core.extend(named);
                scan.core_aliases
                    .extend(defaults.into_iter().filter(|d| d != CORE_GLOBAL));
            }
            ICON_LIBRARY => {
                scan.icons.extend(named);
                scan.icon_aliases.extend(defaults);
            }
            other => tracing::debug!(source = other, "dropping import from unknown library"),
        }
    }
    scan
}

/// First pass, declarations: identifiers the blob defines itself.
pub fn declared_names(code: &str) -> BTreeSet<String> {
    DECLARATION
        .captures_iter(code)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Capitalized markup tags in the blob.
pub fn markup_tags(code: &str) -> BTreeSet<String> {
    MARKUP_TAG
        .captures_iter(code)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Second pass: classify each tag. Order of `tags` does not matter.
pub fn classify_tags(
    tags: &BTreeSet<String>,
    locals: &BTreeSet<String>,
    scan: &ImportScan,
) -> BTreeMap<String, TagOrigin> {
    let core_locals: BTreeSet<&str> = scan.core.iter().map(|b| b.local.as_str()).collect();
    let icon_locals: BTreeSet<&str> = scan.icons.iter().map(|b| b.local.as_str()).collect();
    tags.iter()
        .map(|tag| {
            let origin = if locals.contains(tag) {
                TagOrigin::Local
            } else if tag == CORE_GLOBAL
                || core_locals.contains(tag.as_str())
                || scan.core_aliases.contains(tag)
                || CORE_TAGS.contains(&tag.as_str())
            {
                TagOrigin::Core
            } else if icon_locals.contains(tag.as_str()) || scan.icon_aliases.contains(tag) {
                TagOrigin::Icon
            } else if HOST_GLOBALS.contains(&tag.as_str()) {
                TagOrigin::Host
            } else {
                TagOrigin::Implicit
            };
            (tag.clone(), origin)
        })
        .collect()
}

/// Build the disjoint binding groups for `code`.
pub fn resolve_dependencies(code: &str) -> DependencySet {
    let scan = scan_imports(code);
    let locals = declared_names(code);
    let origins = classify_tags(&markup_tags(code), &locals, &scan);
    let shadowed = |name: &str| locals.contains(name) || name == CORE_GLOBAL;

    let mut deps = DependencySet {
        core_aliases: scan.core_aliases.iter().filter(|a| !shadowed(a)).cloned().collect(),
        icon_aliases: scan.icon_aliases.iter().filter(|a| !shadowed(a)).cloned().collect(),
        ..Default::default()
    };
    for binding in scan.core.iter().filter(|b| !shadowed(&b.local)) {
        deps.core.insert(binding.local.clone(), binding.clone());
    }
    for (tag, origin) in &origins {
        if *origin == TagOrigin::Core && CORE_TAGS.contains(&tag.as_str()) && !deps.core.contains_key(tag) {
            deps.core.insert(tag.clone(), Binding::plain(tag.clone()));
        }
    }

    let implicit = origins
        .iter()
        .filter(|(_, o)| **o == TagOrigin::Implicit)
        .map(|(tag, _)| Binding::plain(tag.clone()));
    for binding in scan.icons.iter().cloned().chain(implicit) {
        if shadowed(&binding.local)
            || deps.core.contains_key(&binding.local)
            || deps.core_aliases.contains(&binding.local)
            || deps.icon_aliases.contains(&binding.local)
        {
            continue;
        }
        deps.icons.entry(binding.local.clone()).or_insert(binding);
    }
    deps
}

/// Remove every import statement and `export … from` re-export.
pub fn strip_module_statements(code: &str) -> String {
    let (_, code) = split_imports(code);
    let code = SIDE_EFFECT_IMPORT.replace_all(&code, "");
    let code = REEXPORT.replace_all(&code, "");
    code.trim_start().to_string()
}

/// Replace imports with global bindings.
pub fn rewrite_imports(code: &str) -> (String, DependencySet) {
    let deps = resolve_dependencies(code);
    let body = strip_module_statements(code);
    tracing::debug!(
        core = deps.core.len(),
        icons = deps.icons.len(),
        "rewrote imports to globals"
    );
    (format!("{}\n{}", deps.render_header(), body), deps)
}
