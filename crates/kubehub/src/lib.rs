//! kact kubehub — discovery and object listing against the live cluster.
//!
//! The only place typed kube objects exist. Everything leaving this crate
//! is a generic `serde_json::Value` tree, serialized once at the boundary
//! with `metadata.managedFields` stripped.

#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use kube::{
    api::{Api, ListParams},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    discovery::{Discovery, Scope},
    Client,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A served resource kind, as discovered from the cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KindEntry {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub namespaced: bool,
}

impl KindEntry {
    /// Lowercase kind name (`pod`, `node`) — the action catalog key and the
    /// `Kind` binding rendered into command templates.
    pub fn key(&self) -> String {
        self.kind.to_lowercase()
    }

    pub fn gvk_key(&self) -> String {
        if self.group.is_empty() {
            format!("{}/{}", self.version, self.kind)
        } else {
            format!("{}/{}/{}", self.group, self.version, self.kind)
        }
    }

    fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind {
            group: self.group.clone(),
            version: self.version.clone(),
            kind: self.kind.clone(),
        };
        ApiResource::from_gvk_with_plural(&gvk, &self.plural)
    }
}

/// Discover served resource kinds (incl. CRDs) using kube Discovery.
pub async fn discover_kinds() -> Result<Vec<KindEntry>> {
    let client = Client::try_default().await.context("connecting to cluster")?;
    let discovery = Discovery::new(client).run().await.context("running api discovery")?;
    let mut out = Vec::new();
    for group in discovery.groups() {
        for (ar, caps) in group.recommended_resources() {
            let namespaced = matches!(caps.scope, Scope::Namespaced);
            out.push(KindEntry {
                group: ar.group.clone(),
                version: ar.version.clone(),
                kind: ar.kind.clone(),
                plural: ar.plural.clone(),
                namespaced,
            });
        }
    }
    // Stable-ish order
    out.sort_by(|a, b| a.group.cmp(&b.group).then(a.version.cmp(&b.version)).then(a.kind.cmp(&b.kind)));
    info!(kinds = out.len(), "discovery complete");
    Ok(out)
}

/// Find a discovered kind by its lowercase key, plural, or kind name.
pub fn find_kind<'a>(kinds: &'a [KindEntry], wanted: &str) -> Option<&'a KindEntry> {
    let wanted = wanted.to_lowercase();
    kinds
        .iter()
        .find(|k| k.key() == wanted || k.plural.to_lowercase() == wanted || k.kind.to_lowercase() == wanted)
}

/// List objects of a kind as generic trees. Namespaced kinds list within
/// `namespace` when given; cluster-scoped kinds ignore it.
pub async fn list_objects(entry: &KindEntry, namespace: Option<&str>) -> Result<Vec<serde_json::Value>> {
    let client = Client::try_default().await.context("connecting to cluster")?;
    let ar = entry.api_resource();
    let api: Api<DynamicObject> = if entry.namespaced {
        match namespace {
            Some(ns) => Api::namespaced_with(client, ns, &ar),
            None => Api::all_with(client, &ar),
        }
    } else {
        Api::all_with(client, &ar)
    };
    let list = api
        .list(&ListParams::default())
        .await
        .with_context(|| format!("listing {}", entry.gvk_key()))?;
    debug!(gvk = %entry.gvk_key(), ns = ?namespace, count = list.items.len(), "objects listed");
    let mut out = Vec::with_capacity(list.items.len());
    for obj in list.items.iter() {
        let mut raw = serde_json::to_value(obj).context("serializing object")?;
        strip_managed_fields(&mut raw);
        out.push(raw);
    }
    if out.is_empty() {
        return Err(anyhow!("no {} objects found{}", entry.key(), namespace.map(|n| format!(" in namespace {n}")).unwrap_or_default()));
    }
    Ok(out)
}

fn strip_managed_fields(v: &mut serde_json::Value) {
    if let Some(meta) = v.get_mut("metadata") {
        if let Some(obj) = meta.as_object_mut() {
            obj.remove("managedFields");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(group: &str, kind: &str, plural: &str) -> KindEntry {
        KindEntry {
            group: group.to_string(),
            version: "v1".to_string(),
            kind: kind.to_string(),
            plural: plural.to_string(),
            namespaced: true,
        }
    }

    #[test]
    fn key_is_lowercase_kind() {
        assert_eq!(entry("", "Pod", "pods").key(), "pod");
    }

    #[test]
    fn gvk_key_elides_empty_group() {
        assert_eq!(entry("", "Pod", "pods").gvk_key(), "v1/Pod");
        assert_eq!(entry("apps", "Deployment", "deployments").gvk_key(), "apps/v1/Deployment");
    }

    #[test]
    fn find_kind_matches_key_plural_and_kind() {
        let kinds = vec![entry("", "Pod", "pods"), entry("apps", "Deployment", "deployments")];
        assert_eq!(find_kind(&kinds, "pod").unwrap().kind, "Pod");
        assert_eq!(find_kind(&kinds, "deployments").unwrap().kind, "Deployment");
        assert_eq!(find_kind(&kinds, "Deployment").unwrap().kind, "Deployment");
        assert!(find_kind(&kinds, "gone").is_none());
    }

    #[test]
    fn managed_fields_are_stripped() {
        let mut v = serde_json::json!({
            "metadata": {"name": "a", "managedFields": [{"manager": "kubectl"}]}
        });
        strip_managed_fields(&mut v);
        assert!(v.pointer("/metadata/managedFields").is_none());
        assert_eq!(v.pointer("/metadata/name").and_then(|n| n.as_str()), Some("a"));
    }
}
