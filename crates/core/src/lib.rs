//! kact core types — generic resource trees and path extraction.
//!
//! Resources enter the system as kube objects, get serialized once at the
//! boundary into a generic `serde_json::Value` tree, and every downstream
//! component (variable extraction, template rendering) works purely on that
//! tree. No typed resource access exists past the adapter.

#![forbid(unsafe_code)]

pub mod path;

/// Generic serialized resource object: maps, sequences, scalars.
pub type ResourceObject = serde_json::Value;

pub mod prelude {
    pub use super::path::{extract, lookup, ExtractError};
    pub use super::{display_name, scalar_to_string, ResourceObject};
}

/// `namespace/name` display key for an object, or bare `name` for
/// cluster-scoped resources. Missing metadata renders as an empty name.
pub fn display_name(obj: &ResourceObject) -> String {
    let meta = obj.get("metadata");
    let name = meta.and_then(|m| m.get("name")).and_then(|v| v.as_str()).unwrap_or("");
    if let Some(ns) = meta.and_then(|m| m.get("namespace")).and_then(|v| v.as_str()) {
        format!("{}/{}", ns, name)
    } else {
        name.to_string()
    }
}

/// Render a tree node as a single string: strings bare, numbers/bools via
/// Display, null empty. Maps and sequences fall back to compact JSON so a
/// structured endpoint still yields something printable.
pub fn scalar_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
