//! Command template rendering and argv tokenization.
//!
//! Templates are literal text with `{{ ... }}` placeholders. A placeholder
//! body is a dotted reference whose first segment names a render-scope entry
//! and whose remainder paths into that value (`Obj.metadata.name`), with an
//! optional piped helper (`Obj.metadata.labels | joinLabels`). Whitespace
//! inside the braces is insignificant.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use kact_core::path::{lookup, ExtractError};
use kact_core::scalar_to_string;

/// Names available to a template during one render.
pub type RenderScope = serde_json::Map<String, serde_json::Value>;

/// Named helper callable from a placeholder pipe. Returns a rendered string
/// or a message describing why the input was unusable.
pub type Helper = fn(&serde_json::Value) -> Result<String, String>;
pub type HelperMap = HashMap<&'static str, Helper>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("template syntax error: {0}")]
    ParseError(String),
    #[error("undefined reference {0:?}")]
    UndefinedReference(String),
    #[error("unknown helper {0:?}")]
    UnknownHelper(String),
    #[error("helper {helper:?} failed: {message}")]
    HelperFailed { helper: String, message: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("rendered command is empty")]
    EmptyCommand,
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder regex"));

/// Render `template` against `scope`, substituting every placeholder.
/// Fails on unbalanced braces, references absent from the scope, unknown
/// helpers, or a helper rejecting its input. Literal text passes through
/// untouched; a template with no placeholders renders as itself.
pub fn render(template: &str, scope: &RenderScope, helpers: &HelperMap) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0).expect("match");
        let literal = &template[last..whole.start()];
        check_literal(literal)?;
        out.push_str(literal);
        let body = caps.get(1).expect("capture").as_str();
        out.push_str(&eval_placeholder(body, scope, helpers)?);
        last = whole.end();
    }
    let tail = &template[last..];
    check_literal(tail)?;
    out.push_str(tail);
    Ok(out)
}

// Literal chunks sit between matched placeholders; any brace pair left in
// one means the template had an unopened or unterminated placeholder.
fn check_literal(chunk: &str) -> Result<(), RenderError> {
    if chunk.contains("{{") || chunk.contains("}}") {
        return Err(RenderError::ParseError(format!("unbalanced braces near {:?}", chunk.trim())));
    }
    Ok(())
}

fn eval_placeholder(body: &str, scope: &RenderScope, helpers: &HelperMap) -> Result<String, RenderError> {
    let mut parts = body.splitn(2, '|');
    let reference = parts.next().unwrap_or("").trim();
    let helper = parts.next().map(str::trim);
    if reference.is_empty() {
        return Err(RenderError::ParseError("empty placeholder".into()));
    }
    let value = resolve_reference(reference, scope)?;
    match helper {
        None => Ok(scalar_to_string(value)),
        Some("") => Err(RenderError::ParseError(format!("dangling pipe in {:?}", body.trim()))),
        Some(name) => {
            let f = helpers.get(name).ok_or_else(|| RenderError::UnknownHelper(name.to_string()))?;
            f(value).map_err(|message| RenderError::HelperFailed { helper: name.to_string(), message })
        }
    }
}

// First segment names a scope entry, the rest is an extractor path into it.
// A leading dot is tolerated so Go-template-style references keep working.
fn resolve_reference<'a>(reference: &str, scope: &'a RenderScope) -> Result<&'a serde_json::Value, RenderError> {
    let body = reference.strip_prefix('.').unwrap_or(reference);
    let (root, rest) = match body.split_once('.') {
        Some((root, rest)) => (root, Some(rest)),
        None => (body, None),
    };
    if root.is_empty() || !root.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RenderError::ParseError(format!("bad reference root {root:?}")));
    }
    let value = scope
        .get(root)
        .ok_or_else(|| RenderError::UndefinedReference(root.to_string()))?;
    match rest {
        None => Ok(value),
        Some(rest) => lookup(value, rest).map_err(|e| match e {
            ExtractError::PathNotFound { .. } => RenderError::UndefinedReference(reference.to_string()),
            ExtractError::InvalidExpression { reason, .. } => {
                RenderError::ParseError(format!("bad reference {reference:?}: {reason}"))
            }
        }),
    }
}

/// `joinLabels`: comma-joined `key=value` pairs of a label map. Pair order
/// follows the map's iteration order and is not part of the contract.
fn join_labels(v: &serde_json::Value) -> Result<String, String> {
    let map = v.as_object().ok_or_else(|| "joinLabels expects a map".to_string())?;
    let pairs: Vec<String> = map.iter().map(|(k, val)| format!("{}={}", k, scalar_to_string(val))).collect();
    Ok(pairs.join(","))
}

/// Helpers every render gets: currently just `joinLabels`.
pub fn builtin_helpers() -> HelperMap {
    let mut m = HelperMap::new();
    m.insert("joinLabels", join_labels as Helper);
    m
}

/// Split rendered text into an argv on single spaces. No quoting and no
/// escape sequences: an argument containing a literal space cannot be
/// expressed, and runs of spaces yield empty tokens. This mirrors the
/// original splitting behavior on purpose; silently adding shell-style
/// quoting would change which commands succeed.
pub fn tokenize(rendered: &str) -> Result<Vec<String>, TokenizeError> {
    if rendered.is_empty() {
        return Err(TokenizeError::EmptyCommand);
    }
    Ok(rendered.split(' ').map(str::to_string).collect())
}
