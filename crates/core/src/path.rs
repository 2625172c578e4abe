//! Path query extraction over generic resource trees.
//!
//! Expressions are the minimal json-path-like grammar used by action
//! variables and templates: optional leading dot, dot-separated field
//! segments, at most one `[index]` per segment (`.metadata.labels.app`,
//! `.items[0].name`, `spec.dnsNames[0]`). Wildcards and filters are not
//! part of the grammar and are rejected at parse time.

use thiserror::Error;

use crate::scalar_to_string;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid path expression {expr:?}: {reason}")]
    InvalidExpression { expr: String, reason: String },
    #[error("path {expr:?} not found at {segment:?}")]
    PathNotFound { expr: String, segment: String },
}

/// One parsed step: an optional object key followed by an optional index.
/// A bare `[n]` segment has an empty key and indexes the current sequence.
#[derive(Debug, PartialEq, Eq)]
struct Segment<'a> {
    key: &'a str,
    index: Option<usize>,
}

fn invalid(expr: &str, reason: impl Into<String>) -> ExtractError {
    ExtractError::InvalidExpression { expr: expr.to_string(), reason: reason.into() }
}

fn parse_segments<'a>(expr: &'a str) -> Result<Vec<Segment<'a>>, ExtractError> {
    let body = expr.strip_prefix('.').unwrap_or(expr);
    if body.is_empty() {
        return Err(invalid(expr, "empty expression"));
    }
    if body.contains('*') || body.contains('?') {
        return Err(invalid(expr, "wildcards and filters are not supported"));
    }
    let mut out = Vec::new();
    for seg in body.split('.') {
        if seg.is_empty() {
            return Err(invalid(expr, "empty segment"));
        }
        let (key, index) = match seg.find('[') {
            None => (seg, None),
            Some(open) => {
                if !seg.ends_with(']') {
                    return Err(invalid(expr, format!("unterminated index in {seg:?}")));
                }
                let idx_str = &seg[open + 1..seg.len() - 1];
                if idx_str.is_empty() || !idx_str.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid(expr, format!("non-numeric index in {seg:?}")));
                }
                let idx: usize = idx_str
                    .parse()
                    .map_err(|_| invalid(expr, format!("index out of numeric range in {seg:?}")))?;
                (&seg[..open], Some(idx))
            }
        };
        if !key.is_empty() && !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(invalid(expr, format!("bad key characters in {key:?}")));
        }
        out.push(Segment { key, index });
    }
    Ok(out)
}

/// Walk `expr` through `root` and return the addressed node. Missing keys,
/// out-of-range indices, and descents into scalars are `PathNotFound`;
/// grammar problems are `InvalidExpression`.
pub fn lookup<'a>(root: &'a serde_json::Value, expr: &str) -> Result<&'a serde_json::Value, ExtractError> {
    let not_found = |segment: &str| ExtractError::PathNotFound {
        expr: expr.to_string(),
        segment: segment.to_string(),
    };
    let mut cur = root;
    for seg in parse_segments(expr)? {
        if !seg.key.is_empty() {
            cur = match cur {
                serde_json::Value::Object(map) => map.get(seg.key).ok_or_else(|| not_found(seg.key))?,
                _ => return Err(not_found(seg.key)),
            };
        }
        if let Some(i) = seg.index {
            cur = match cur {
                serde_json::Value::Array(arr) => arr.get(i).ok_or_else(|| not_found(&format!("{}[{}]", seg.key, i)))?,
                _ => return Err(not_found(&format!("{}[{}]", seg.key, i))),
            };
        }
    }
    Ok(cur)
}

/// Evaluate `expr` against `root` and render the result as a string.
pub fn extract(root: &serde_json::Value, expr: &str) -> Result<String, ExtractError> {
    lookup(root, expr).map(scalar_to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod() -> serde_json::Value {
        serde_json::json!({
            "metadata": {
                "name": "web-1",
                "namespace": "prod",
                "labels": {"app": "web", "tier": "frontend"}
            },
            "spec": {
                "containers": [
                    {"name": "app", "image": "web:1.2"},
                    {"name": "sidecar", "image": "proxy:0.9"}
                ],
                "replicas": 3
            }
        })
    }

    #[test]
    fn extracts_nested_scalar() {
        assert_eq!(extract(&pod(), ".metadata.name").unwrap(), "web-1");
        assert_eq!(extract(&pod(), ".metadata.labels.app").unwrap(), "web");
    }

    #[test]
    fn leading_dot_is_optional() {
        assert_eq!(extract(&pod(), "metadata.name").unwrap(), extract(&pod(), ".metadata.name").unwrap());
    }

    #[test]
    fn indexes_into_sequences() {
        assert_eq!(extract(&pod(), ".spec.containers[1].image").unwrap(), "proxy:0.9");
    }

    #[test]
    fn renders_non_string_scalars() {
        assert_eq!(extract(&pod(), ".spec.replicas").unwrap(), "3");
    }

    #[test]
    fn missing_key_is_path_not_found() {
        let err = extract(&pod(), ".metadata.missing").unwrap_err();
        assert!(matches!(err, ExtractError::PathNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn out_of_range_index_is_path_not_found() {
        let err = extract(&pod(), ".spec.containers[9].name").unwrap_err();
        assert!(matches!(err, ExtractError::PathNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn descent_into_scalar_is_path_not_found() {
        let err = extract(&pod(), ".metadata.name.deeper").unwrap_err();
        assert!(matches!(err, ExtractError::PathNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn grammar_errors_are_invalid_expression() {
        for expr in ["", ".", ".spec..x", ".spec.*", ".spec.items[x]", ".spec.items[", ".spec.a b"] {
            let err = extract(&pod(), expr).unwrap_err();
            assert!(matches!(err, ExtractError::InvalidExpression { .. }), "{expr:?} gave {err:?}");
        }
    }

    #[test]
    fn structured_endpoint_renders_compact_json() {
        let got = extract(&pod(), ".metadata.labels").unwrap();
        assert!(got.starts_with('{') && got.contains("\"app\":\"web\""), "got {got}");
    }
}
