//! Interactive pickers on top of `inquire`.
//!
//! `TermChooser` is the production `Chooser`: it renders a filterable select
//! prompt and maps operator aborts to `ChooseError::Cancelled`. The engine
//! only ever sees the trait.

use std::fmt;

use anyhow::{anyhow, Result};
use inquire::{InquireError, Select};

use kact_actions::{search_match, ChooseError, Chooser, SearchPredicate};
use kact_kubehub::KindEntry;

struct Row {
    idx: usize,
    text: String,
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub struct TermChooser;

impl Chooser for TermChooser {
    fn choose(&self, label: &str, items: &[String], matches: SearchPredicate) -> Result<usize, ChooseError> {
        let rows: Vec<Row> = items
            .iter()
            .enumerate()
            .map(|(idx, text)| Row { idx, text: text.clone() })
            .collect();
        let scorer = |input: &str, _opt: &Row, value: &str, _idx: usize| -> Option<i64> {
            if matches(input, value) { Some(0) } else { None }
        };
        let picked = Select::new(label, rows)
            .with_scorer(&scorer)
            .prompt()
            .map_err(|e| match e {
                InquireError::OperationCanceled | InquireError::OperationInterrupted => ChooseError::Cancelled,
                other => ChooseError::Prompt(other.to_string()),
            })?;
        Ok(picked.idx)
    }
}

/// Prompt for a resource kind among the discovered set.
pub fn pick_kind(chooser: &dyn Chooser, kinds: &[KindEntry]) -> Result<KindEntry> {
    let names: Vec<String> = kinds.iter().map(|k| format!("{} ({})", k.key(), k.gvk_key())).collect();
    let idx = chooser.choose("Kinds", &names, search_match)?;
    kinds.get(idx).cloned().ok_or_else(|| anyhow!("kind selection out of range"))
}

/// Prompt for one object of the chosen kind, displayed as `namespace/name`.
pub fn pick_object(chooser: &dyn Chooser, entry: &KindEntry, objects: &[serde_json::Value]) -> Result<serde_json::Value> {
    let names: Vec<String> = objects.iter().map(kact_core::display_name).collect();
    let idx = chooser.choose(&entry.plural, &names, search_match)?;
    objects.get(idx).cloned().ok_or_else(|| anyhow!("object selection out of range"))
}
