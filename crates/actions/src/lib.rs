//! kact actions — catalog, selection, and the resolution pipeline.
//!
//! An `Action` is a named command template attached to a resource kind.
//! User-defined actions come from a YAML config; two built-ins (`get`,
//! `describe`) are always appended so no kind ever resolves to an empty
//! candidate list. Resolution runs catalog → variable extraction → template
//! render → argv tokenization, failing fast at the first broken stage.

#![forbid(unsafe_code)]

pub mod template;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use kact_core::path::{extract, ExtractError};
use kact_core::ResourceObject;

pub use template::{builtin_helpers, render, tokenize, Helper, HelperMap, RenderError, RenderScope, TokenizeError};

/// A named, templated command associated with a resource kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub variables: SmallVec<[Variable; 4]>,
    pub command: String,
}

/// Declares that `path` is evaluated against the resource object and bound
/// under `name` in the render scope before the command template runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "jsonpath")]
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDoc {
    #[serde(default)]
    actions: HashMap<String, Vec<Action>>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading actions config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing actions config: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("no action named {0:?} for this kind")]
    NotFound(String),
    #[error("action selection cancelled")]
    Cancelled,
    #[error("action prompt failed: {0}")]
    Prompt(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChooseError {
    #[error("selection cancelled")]
    Cancelled,
    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl From<ChooseError> for SelectError {
    fn from(e: ChooseError) -> Self {
        match e {
            ChooseError::Cancelled => SelectError::Cancelled,
            ChooseError::Prompt(msg) => SelectError::Prompt(msg),
        }
    }
}

/// Predicate deciding whether a typed query matches a candidate display name.
pub type SearchPredicate = fn(query: &str, candidate: &str) -> bool;

/// Interactive choice among displayed items, returning the chosen index.
/// Production wraps a terminal prompt; tests script the answer. The core
/// never depends on a concrete UI library through this seam.
pub trait Chooser {
    fn choose(&self, label: &str, items: &[String], matches: SearchPredicate) -> Result<usize, ChooseError>;
}

/// Case-insensitive, whitespace-stripped substring match used to filter
/// selection lists.
pub fn search_match(query: &str, candidate: &str) -> bool {
    fn fold(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
    }
    fold(candidate).contains(&fold(query))
}

/// Per-kind user actions plus the unconditional built-in defaults.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    per_kind: HashMap<String, Vec<Action>>,
    defaults: Vec<Action>,
}

impl ActionCatalog {
    /// Load user actions from a YAML config file. `None` or a missing file
    /// yields a catalog with built-ins only; an unreadable or malformed
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let per_kind = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p).map_err(|source| CatalogError::Read { path: p.to_path_buf(), source })?;
                let doc = parse_config(&text)?;
                debug!(path = %p.display(), kinds = doc.actions.len(), "actions config loaded");
                doc.actions
            }
            _ => HashMap::new(),
        };
        Ok(Self { per_kind, defaults: builtin_defaults() })
    }

    /// Build a catalog from an in-memory YAML document.
    pub fn from_config_str(text: &str) -> Result<Self, CatalogError> {
        Ok(Self { per_kind: parse_config(text)?.actions, defaults: builtin_defaults() })
    }

    /// Ordered candidate list for a kind: user actions first, then the
    /// built-in defaults. Never empty; duplicate names are retained, so
    /// under a collision the earlier (user) entry wins first-match lookup.
    pub fn candidates(&self, kind: &str) -> Vec<Action> {
        let mut out: Vec<Action> = self.per_kind.get(kind).cloned().unwrap_or_default();
        out.extend(self.defaults.iter().cloned());
        out
    }

    /// Resolve one action: exact first-match by name when `explicit` is
    /// given, otherwise delegate to the chooser over the candidate list.
    pub fn select(&self, kind: &str, explicit: Option<&str>, chooser: &dyn Chooser) -> Result<Action, SelectError> {
        let candidates = self.candidates(kind);
        match explicit {
            Some(name) => candidates
                .into_iter()
                .find(|a| a.name == name)
                .ok_or_else(|| SelectError::NotFound(name.to_string())),
            None => {
                let names: Vec<String> = candidates.iter().map(|a| a.name.clone()).collect();
                let idx = chooser.choose("actions", &names, search_match)?;
                candidates
                    .into_iter()
                    .nth(idx)
                    .ok_or_else(|| SelectError::Prompt(format!("chooser returned out-of-range index {idx}")))
            }
        }
    }
}

// An empty document parses as YAML null, which is as good as no config.
fn parse_config(text: &str) -> Result<ConfigDoc, CatalogError> {
    let doc: Option<ConfigDoc> = serde_yaml::from_str(text).map_err(|source| CatalogError::Parse { source })?;
    Ok(doc.unwrap_or_default())
}

fn builtin_defaults() -> Vec<Action> {
    vec![
        Action {
            name: "get".into(),
            variables: SmallVec::new(),
            command: "kubectl -n {{ Namespace }} get {{ Kind }} {{ Obj.metadata.name }}".into(),
        },
        Action {
            name: "describe".into(),
            variables: SmallVec::new(),
            command: "kubectl -n {{ Namespace }} describe {{ Kind }} {{ Obj.metadata.name }}".into(),
        },
    ]
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("selecting action for kind {kind:?}: {source}")]
    ActionSelection {
        kind: String,
        #[source]
        source: SelectError,
    },
    #[error("resolving variable {name:?} from {path:?}: {source}")]
    VariableResolution {
        name: String,
        path: String,
        #[source]
        source: ExtractError,
    },
    #[error("rendering command for action {action:?}: {source}")]
    Render {
        action: String,
        #[source]
        source: RenderError,
    },
    #[error("tokenizing command for action {action:?}: {source}")]
    Tokenize {
        action: String,
        #[source]
        source: TokenizeError,
    },
}

/// Composition root: one call drives catalog → extractor → renderer →
/// tokenizer and returns a ready-to-execute argv. Holds no per-resolution
/// state; a shared read-only instance is safe across invocations.
pub struct Engine {
    catalog: ActionCatalog,
}

impl Engine {
    pub fn new(catalog: ActionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// Resolve `(kind, object, namespace, optional action name)` into an
    /// argument vector. Every stage failure is terminal for this attempt;
    /// nothing is retried and partial variable bindings never reach the
    /// renderer.
    pub fn resolve(
        &self,
        kind: &str,
        obj: &ResourceObject,
        namespace: &str,
        explicit: Option<&str>,
        chooser: &dyn Chooser,
    ) -> Result<Vec<String>, ResolveError> {
        let action = self
            .catalog
            .select(kind, explicit, chooser)
            .map_err(|source| ResolveError::ActionSelection { kind: kind.to_string(), source })?;
        debug!(kind, action = %action.name, variables = action.variables.len(), "action selected");

        // Ambient bindings first; variable bindings overlay them, so a
        // variable named Namespace or Kind shadows the ambient value.
        let mut scope = RenderScope::new();
        scope.insert("Obj".into(), obj.clone());
        scope.insert("Namespace".into(), serde_json::Value::String(namespace.to_string()));
        scope.insert("Kind".into(), serde_json::Value::String(kind.to_string()));
        for var in &action.variables {
            let value = extract(obj, &var.path).map_err(|source| ResolveError::VariableResolution {
                name: var.name.clone(),
                path: var.path.clone(),
                source,
            })?;
            scope.insert(var.name.clone(), serde_json::Value::String(value));
        }

        let rendered = render(&action.command, &scope, &builtin_helpers())
            .map_err(|source| ResolveError::Render { action: action.name.clone(), source })?;
        debug!(action = %action.name, rendered = %rendered, "command rendered");
        tokenize(&rendered).map_err(|source| ResolveError::Tokenize { action: action.name, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chooser scripted to answer with a fixed index, or cancel.
    pub(crate) struct Scripted(pub Option<usize>);

    impl Chooser for Scripted {
        fn choose(&self, _label: &str, _items: &[String], _matches: SearchPredicate) -> Result<usize, ChooseError> {
            self.0.ok_or(ChooseError::Cancelled)
        }
    }

    const CONFIG: &str = r#"
actions:
  pod:
    - name: logs
      command: "kubectl -n {{ Namespace }} logs {{ Obj.metadata.name }}"
    - name: get
      command: "echo shadowed-get {{ Obj.metadata.name }}"
  deploy:
    - name: pods-for
      variables:
        - name: Selector
          jsonpath: .spec.selector.matchLabels
      command: "kubectl -n {{ Namespace }} get pods -l {{ Obj.spec.selector.matchLabels | joinLabels }}"
"#;

    fn catalog() -> ActionCatalog {
        ActionCatalog::from_config_str(CONFIG).unwrap()
    }

    #[test]
    fn unknown_kind_candidates_are_exactly_the_defaults() {
        let c = catalog().candidates("node");
        let names: Vec<&str> = c.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["get", "describe"]);
    }

    #[test]
    fn user_actions_precede_defaults() {
        let c = catalog().candidates("pod");
        let names: Vec<&str> = c.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["logs", "get", "get", "describe"]);
    }

    #[test]
    fn explicit_select_is_first_match_under_collision() {
        let a = catalog().select("pod", Some("get"), &Scripted(None)).unwrap();
        assert!(a.command.starts_with("echo shadowed-get"), "user entry should win: {}", a.command);
    }

    #[test]
    fn explicit_select_is_deterministic() {
        let c = catalog();
        let first = c.select("pod", Some("logs"), &Scripted(None)).unwrap();
        let second = c.select("pod", Some("logs"), &Scripted(None)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_select_unknown_name_fails() {
        let err = catalog().select("pod", Some("restart"), &Scripted(None)).unwrap_err();
        assert_eq!(err, SelectError::NotFound("restart".into()));
    }

    #[test]
    fn interactive_select_uses_chooser_index() {
        let a = catalog().select("node", None, &Scripted(Some(1))).unwrap();
        assert_eq!(a.name, "describe");
    }

    #[test]
    fn interactive_cancel_propagates() {
        let err = catalog().select("node", None, &Scripted(None)).unwrap_err();
        assert_eq!(err, SelectError::Cancelled);
    }

    #[test]
    fn empty_config_still_has_defaults() {
        let c = ActionCatalog::from_config_str("").unwrap();
        assert_eq!(c.candidates("anything").len(), 2);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(ActionCatalog::from_config_str("actions: [not, a, map]").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_builtins() {
        let c = ActionCatalog::load(Some(Path::new("/nonexistent/kact.yaml"))).unwrap();
        assert_eq!(c.candidates("pod").len(), 2);
    }

    #[test]
    fn search_match_is_case_insensitive_and_strips_whitespace() {
        assert!(search_match("DESC", "describe"));
        assert!(search_match("roll out", "rollout-restart"));
        assert!(!search_match("logs", "describe"));
        assert!(search_match("", "anything"));
    }

    #[test]
    fn variables_parse_from_jsonpath_key() {
        let c = catalog();
        let a = c.select("deploy", Some("pods-for"), &Scripted(None)).unwrap();
        assert_eq!(a.variables.len(), 1);
        assert_eq!(a.variables[0].name, "Selector");
        assert_eq!(a.variables[0].path, ".spec.selector.matchLabels");
    }
}
