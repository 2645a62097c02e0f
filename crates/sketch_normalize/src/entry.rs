//! Entry-point binding: the default export becomes a guarded assignment to
//! the global slot the sandbox bootstrap polls.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{NormalizeError, Result};
use crate::COMPONENT_SLOT;

/// Name given to default exports that carry no identifier of their own.
pub const ANONYMOUS_COMPONENT: &str = "GeneratedComponent";

static DEFAULT_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s+default\s+((?:async\s+)?function\s*\*?\s*([A-Za-z_$][A-Za-z0-9_$]*))")
        .expect("default function regex")
});

static DEFAULT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s+default\s+(class\s+([A-Za-z_$][A-Za-z0-9_$]*))").expect("default class regex")
});

static DEFAULT_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)\bexport\s+default\s+([A-Za-z_$][A-Za-z0-9_$]*)[ \t]*;?[ \t]*$")
        .expect("default identifier regex")
});

static DEFAULT_SPECIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s*\{\s*([A-Za-z_$][A-Za-z0-9_$]*)\s+as\s+default\s*\}[ \t]*;?")
        .expect("default specifier regex")
});

static DEFAULT_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bexport\s+default\s+").expect("default expression regex"));

static EXPORT_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bexport\s*\{[^}]*\}[ \t]*;?").expect("export list regex"));

static NAMED_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s+((?:async\s+)?(?:const|let|var|function|class)\b)").expect("named export regex")
});

static SLOT_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"window\.{COMPONENT_SLOT}\s*=\s*[^;\n]+;?"
    ))
    .expect("slot assignment regex")
});

/// How the default export was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportForm {
    Function,
    Class,
    Identifier,
    Specifier,
    Expression,
}

/// Located default export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultExport {
    pub name: String,
    pub form: ExportForm,
}

/// Find the default export without modifying the text.
pub fn find_default_export(code: &str) -> Option<DefaultExport> {
    let named = |re: &Regex, group: usize, form: ExportForm| {
        re.captures(code)
            .and_then(|c| c.get(group))
            .map(|m| DefaultExport { name: m.as_str().to_string(), form })
    };
    named(&DEFAULT_FUNCTION, 2, ExportForm::Function)
        .or_else(|| named(&DEFAULT_CLASS, 2, ExportForm::Class))
        .or_else(|| named(&DEFAULT_IDENTIFIER, 1, ExportForm::Identifier))
        .or_else(|| named(&DEFAULT_SPECIFIER, 1, ExportForm::Specifier))
        .or_else(|| {
            DEFAULT_EXPRESSION.is_match(code).then(|| DefaultExport {
                name: fresh_name(code),
                form: ExportForm::Expression,
            })
        })
}

fn fresh_name(code: &str) -> String {
    let mut name = ANONYMOUS_COMPONENT.to_string();
    let mut n = 1;
    while Regex::new(&format!(r"\b{name}\b")).map(|re| re.is_match(code)).unwrap_or(false) {
        n += 1;
        name = format!("{ANONYMOUS_COMPONENT}{n}");
    }
    name
}

/// The guarded assignment appended to every normalized source.
pub fn slot_assignment(name: &str) -> String {
    format!("if (typeof window !== 'undefined') {{\n  window.{COMPONENT_SLOT} = {name};\n}}\n")
}

/// Remove export syntax, bind the default export to the global slot.
///
/// Returns the rewritten code and the bound identifier.
pub fn bind_entry_point(code: &str) -> Result<(String, String)> {
    let export = find_default_export(code).ok_or(NormalizeError::NoDefaultExport)?;
    let code = SLOT_ASSIGNMENT.replace_all(code, "");
    let code = match export.form {
        ExportForm::Function => DEFAULT_FUNCTION.replace_all(&code, "${1}"),
        ExportForm::Class => DEFAULT_CLASS.replace_all(&code, "${1}"),
        ExportForm::Identifier => DEFAULT_IDENTIFIER.replace_all(&code, ""),
        ExportForm::Specifier => DEFAULT_SPECIFIER.replace_all(&code, ""),
        ExportForm::Expression => {
            let binding = format!("const {} = ", export.name);
            DEFAULT_EXPRESSION.replacen(&code, 1, binding.as_str())
        }
    };
    // Leftover default exports would not parse outside a module anyway.
    let code = DEFAULT_IDENTIFIER.replace_all(&code, "");
    let code = DEFAULT_EXPRESSION.replace_all(&code, "");
    let code = EXPORT_LIST.replace_all(&code, "");
    let code = NAMED_EXPORT.replace_all(&code, "${1}");

    tracing::debug!(component = %export.name, form = ?export.form, "bound default export");
    let bound = format!("{}\n\n{}", code.trim_end(), slot_assignment(&export.name));
    Ok((bound, export.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_count(code: &str) -> usize {
        code.matches(&format!("window.{COMPONENT_SLOT} =")).count()
    }

    #[test]
    fn binds_default_function() {
        let (out, name) = bind_entry_point("export default function App() { return null; }").unwrap();
        assert_eq!(name, "App");
        assert!(out.starts_with("function App() { return null; }"));
        assert!(out.ends_with("window.__PREVIEW_COMPONENT__ = App;\n}\n"));
        assert!(!out.contains("export"));
    }

    #[test]
    fn binds_default_class() {
        let (out, name) = bind_entry_point("export default class Board extends React.Component {}").unwrap();
        assert_eq!(name, "Board");
        assert!(out.starts_with("class Board extends React.Component {}"));
    }

    #[test]
    fn binds_trailing_identifier() {
        let code = "const Dashboard = () => <div/>;\n\nexport default Dashboard;";
        let (out, name) = bind_entry_point(code).unwrap();
        assert_eq!(name, "Dashboard");
        assert!(!out.contains("export default"));
        assert_eq!(slot_count(&out), 1);
    }

    #[test]
    fn binds_default_specifier() {
        let code = "function Page() { return null; }\nexport { Page as default };";
        let (out, name) = bind_entry_point(code).unwrap();
        assert_eq!(name, "Page");
        assert!(!out.contains("export"));
    }

    #[test]
    fn binds_anonymous_arrow() {
        let code = "export default () => <div/>;";
        let (out, name) = bind_entry_point(code).unwrap();
        assert_eq!(name, ANONYMOUS_COMPONENT);
        assert!(out.starts_with("const GeneratedComponent = () => <div/>;"));
    }

    #[test]
    fn wrapped_export_is_an_expression() {
        let code = "function App() { return null; }\nexport default React.memo(App);";
        let (out, name) = bind_entry_point(code).unwrap();
        assert_eq!(name, ANONYMOUS_COMPONENT);
        assert!(out.contains("const GeneratedComponent = React.memo(App);"));
    }

    #[test]
    fn anonymous_name_avoids_collisions() {
        let code = "const GeneratedComponent = 1;\nexport default () => null;";
        let (_, name) = bind_entry_point(code).unwrap();
        assert_eq!(name, "GeneratedComponent2");
    }

    #[test]
    fn stray_wrapped_slot_assignment_is_removed_whole() {
        let code = "function App() { return <div/>; }\nwindow.__PREVIEW_COMPONENT__ = React.memo(App);\nexport default App;";
        let (out, name) = bind_entry_point(code).unwrap();
        assert_eq!(name, "App");
        assert!(!out.contains(".memo(App)"), "{out}");
        assert_eq!(slot_count(&out), 1);
    }

    #[test]
    fn missing_default_export_is_an_error() {
        let err = bind_entry_point("const App = () => null;").unwrap_err();
        assert!(matches!(err, NormalizeError::NoDefaultExport));
        assert_eq!(err.to_string(), "no default export found in generated code");
    }

    #[test]
    fn named_exports_lose_their_keyword() {
        let code = "export const Button = () => null;\nexport function Card() {}\nexport { Button };\nexport default Card;";
        let (out, name) = bind_entry_point(code).unwrap();
        assert_eq!(name, "Card");
        assert!(out.contains("const Button = () => null;"));
        assert!(out.contains("function Card() {}"));
        assert!(!out.contains("export"));
    }

    #[test]
    fn stray_slot_assignments_are_replaced() {
        let code = "function App() {}\nwindow.__PREVIEW_COMPONENT__ = App;\nexport default App;";
        let (out, _) = bind_entry_point(code).unwrap();
        assert_eq!(slot_count(&out), 1);
    }

    #[test]
    fn error_iff_no_default_export() {
        let cases = [
            ("export default function A() {}", true),
            ("export default class B {}", true),
            ("const C = 1;\nexport default C", true),
            ("export { D as default }", true),
            ("export default () => null", true),
            ("export const E = 1;", false),
            ("function F() {}", false),
            ("", false),
        ];
        for (code, has_default) in cases {
            match bind_entry_point(code) {
                Ok((out, _)) => {
                    assert!(has_default, "{code:?} should have failed");
                    assert_eq!(slot_count(&out), 1);
                    assert!(!out.contains("export default"));
                }
                Err(_) => assert!(!has_default, "{code:?} should have bound"),
            }
        }
    }
}
