//! Sandbox document builder.
//!
//! The document loads React, ReactDOM, Tailwind and Babel standalone from
//! public CDNs, embeds the normalized code in a `text/babel` script, and runs
//! a bootstrap that waits for the transpiler, transforms once, then polls the
//! component slot until it renders or the poll budget runs out.
//!
//! Terminal states are published on `window.__PREVIEW_STATE__` and on
//! `document.body.dataset.previewState`: `rendered`, `render-error`,
//! `compile-error` or `timeout`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::COMPONENT_SLOT;

pub const STATE_SLOT: &str = "__PREVIEW_STATE__";

static SCRIPT_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</script>").expect("script close regex"));

static RESIDUAL_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:tsx|typescript|jsx|javascript|react)?").expect("residual fence regex")
});

/// Bootstrap timer settings, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapTiming {
    /// Interval between transpiler availability checks. Unbounded.
    pub transpiler_poll_ms: u32,
    /// Interval between component slot checks.
    pub component_poll_ms: u32,
    /// Component slot checks before giving up.
    pub max_component_polls: u32,
    /// Delay between the transpiler appearing and the transform.
    pub transform_delay_ms: u32,
    /// Delay between the transform and the first slot check.
    pub first_poll_delay_ms: u32,
}

impl Default for BootstrapTiming {
    fn default() -> Self {
        Self {
            transpiler_poll_ms: 50,
            component_poll_ms: 100,
            max_component_polls: 40,
            transform_delay_ms: 100,
            first_poll_delay_ms: 150,
        }
    }
}

/// A built preview document. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxDocument {
    html: String,
}

impl SandboxDocument {
    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }
}

/// Make code safe to place inside an inline script element.
pub fn escape_for_script(code: &str) -> String {
    let code = SCRIPT_CLOSE.replace_all(code, r"<\/script>");
    RESIDUAL_FENCE.replace_all(&code, "").trim().to_string()
}

pub fn build_document(code: &str) -> SandboxDocument {
    build_document_with(code, BootstrapTiming::default())
}

pub fn build_document_with(code: &str, timing: BootstrapTiming) -> SandboxDocument {
    let safe = escape_for_script(code);
    // Code goes in last so its text is never scanned for placeholders.
    let html = TEMPLATE
        .replace("%%COMPONENT_SLOT%%", COMPONENT_SLOT)
        .replace("%%STATE_SLOT%%", STATE_SLOT)
        .replace("%%TRANSPILER_POLL_MS%%", &timing.transpiler_poll_ms.to_string())
        .replace("%%COMPONENT_POLL_MS%%", &timing.component_poll_ms.to_string())
        .replace("%%MAX_COMPONENT_POLLS%%", &timing.max_component_polls.to_string())
        .replace("%%TRANSFORM_DELAY_MS%%", &timing.transform_delay_ms.to_string())
        .replace("%%FIRST_POLL_DELAY_MS%%", &timing.first_poll_delay_ms.to_string())
        .replacen("%%CODE%%", &safe, 1);
    tracing::debug!(bytes = html.len(), "built sandbox document");
    SandboxDocument { html }
}

const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width,initial-scale=1" />
  <title>Preview</title>

  <script crossorigin src="https://unpkg.com/react@18/umd/react.development.js"></script>
  <script crossorigin src="https://unpkg.com/react-dom@18/umd/react-dom.development.js"></script>
  <script src="https://cdn.tailwindcss.com"></script>
  <script src="https://unpkg.com/@babel/standalone@7.23.5/babel.min.js"></script>

  <style>
    html,body,#root{height:100%;margin:0;padding:0;background:#f8fafc}
    #root{padding:16px;overflow:auto}
    .error-container{padding:24px;background:#fee;border:2px solid #fcc;border-radius:8px;margin:16px;
      font-family:monospace;color:#c00;white-space:pre-wrap;word-break:break-word;max-height:80vh;overflow:auto}
    .error-container strong{display:block;margin-top:8px}
    .loading-container{display:flex;align-items:center;justify-content:center;height:100%;
      font-family:system-ui,-apple-system,sans-serif;color:#666}
  </style>
</head>

<body data-preview-state="loading">
  <div id="root">
    <div class="loading-container"><div>Loading preview...</div></div>
  </div>

  <script type="text/babel">
%%CODE%%
  </script>

  <script>
    (function () {
      var TRANSPILER_POLL_MS = %%TRANSPILER_POLL_MS%%;
      var COMPONENT_POLL_MS = %%COMPONENT_POLL_MS%%;
      var MAX_COMPONENT_POLLS = %%MAX_COMPONENT_POLLS%%;
      var TRANSFORM_DELAY_MS = %%TRANSFORM_DELAY_MS%%;
      var FIRST_POLL_DELAY_MS = %%FIRST_POLL_DELAY_MS%%;

      var settled = false;

      function settle(state) {
        if (settled) return false;
        settled = true;
        window.%%STATE_SLOT%% = state;
        document.body.dataset.previewState = state;
        return true;
      }

      function showError(title, sections) {
        var root = document.getElementById('root');
        var box = document.createElement('div');
        box.className = 'error-container';
        var heading = document.createElement('strong');
        heading.textContent = title;
        box.appendChild(heading);
        sections.forEach(function (s) {
          if (s[0]) {
            var label = document.createElement('strong');
            label.textContent = s[0];
            box.appendChild(label);
          }
          box.appendChild(document.createTextNode(s[1]));
        });
        root.innerHTML = '';
        root.appendChild(box);
      }

      function tryRender() {
        var Comp = window.%%COMPONENT_SLOT%%;
        if (!Comp) return false;
        if (settled) return true;
        try {
          var rootEl = document.getElementById('root');
          rootEl.innerHTML = '';
          ReactDOM.createRoot(rootEl).render(React.createElement(Comp));
        } catch (e) {
          settle('render-error');
          showError('Render Error', [
            ['Message:', String(e && e.message)],
            ['Stack:', (e && e.stack) || 'No stack trace available']
          ]);
          return true;
        }
        settle('rendered');
        return true;
      }

      function pollForComponent(polls) {
        if (tryRender()) return;
        polls += 1;
        if (polls >= MAX_COMPONENT_POLLS) {
          if (!settle('timeout')) return;
          var keys = Object.keys(window).filter(function (k) {
            return k.indexOf('PREVIEW') !== -1 || k.indexOf('Component') !== -1;
          });
          showError('Component Not Found', [
            ['', 'The preview component failed to initialize after ' + polls + ' attempts.'],
            ['Possible causes:', 'Syntax error in generated code, missing export default, or the component assignment never ran.'],
            ['Debug info:', 'Found window keys: ' + JSON.stringify(keys)]
          ]);
          return;
        }
        setTimeout(function () { pollForComponent(polls); }, COMPONENT_POLL_MS);
      }

      function transform() {
        try {
          Babel.transformScriptTags();
        } catch (e) {
          if (!settle('compile-error')) return;
          showError('Compilation Error', [
            ['Message:', String(e && e.message)],
            ['', 'This usually means there is a syntax error in the generated code.']
          ]);
          return;
        }
        setTimeout(function () { pollForComponent(0); }, FIRST_POLL_DELAY_MS);
      }

      function waitForTranspiler() {
        if (!window.Babel || typeof window.Babel.transformScriptTags !== 'function') {
          setTimeout(waitForTranspiler, TRANSPILER_POLL_MS);
          return;
        }
        setTimeout(transform, TRANSFORM_DELAY_MS);
      }

      if (document.readyState === 'loading') {
        document.addEventListener('DOMContentLoaded', waitForTranspiler);
      } else {
        waitForTranspiler();
      }
    })();
  </script>
</body>
</html>
"#;
