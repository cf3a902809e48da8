//! Label policy and the label editor model.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use jira_api::Issue as JiraIssue;

use crate::bridge::LabelChoice;
use crate::session::SessionError;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").expect("invalid whitespace regex"));

/// Jira rejects labels with whitespace; empty ones are meaningless.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && !WHITESPACE.is_match(label)
}

/// Sorted, de-duplicated valid labels; invalid entries are dropped, never fixed.
pub fn valid_labels<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    labels
        .into_iter()
        .filter(|label| is_valid_label(label))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Labels used across `issues`, most frequent first, ties by name.
pub fn rank_project_labels(issues: &[JiraIssue]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in issues.iter().flat_map(|issue| issue.fields.labels.iter()) {
        *counts.entry(label.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(a_name, a_count), (b_name, b_count)| {
        b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
    });
    ranked.into_iter().map(|(name, _)| name.to_string()).collect()
}

/// What the editor's selection is saved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelTarget {
    NewIssue,
    Existing(String),
}

/// Checkbox list over project labels plus the target's current labels.
#[derive(Debug, Clone)]
pub struct LabelEditor {
    target: LabelTarget,
    available: Vec<String>,
    initial: BTreeSet<String>,
    selected: BTreeSet<String>,
}

impl LabelEditor {
    pub fn new(target: LabelTarget, project_labels: Vec<String>, current: BTreeSet<String>) -> Self {
        let mut available = project_labels;
        for label in &current {
            if !available.contains(label) {
                available.push(label.clone());
            }
        }
        Self {
            target,
            available,
            selected: current.clone(),
            initial: current,
        }
    }

    pub fn target(&self) -> &LabelTarget {
        &self.target
    }

    pub fn choices(&self) -> Vec<LabelChoice> {
        self.available
            .iter()
            .map(|name| LabelChoice {
                name: name.clone(),
                selected: self.selected.contains(name),
            })
            .collect()
    }

    /// Flips the label at `index` in [`choices`](Self::choices) order.
    pub fn toggle(&mut self, index: usize) -> Option<LabelChoice> {
        let name = self.available.get(index)?.clone();
        let selected = if self.selected.remove(&name) {
            false
        } else {
            self.selected.insert(name.clone());
            true
        };
        Some(LabelChoice { name, selected })
    }

    /// Adds a new label (selected). A label already offered is just selected.
    pub fn add_label(&mut self, name: &str) -> Result<LabelChoice, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyLabel);
        }
        if !is_valid_label(name) {
            return Err(SessionError::InvalidLabel(name.to_string()));
        }
        if !self.available.iter().any(|known| known == name) {
            self.available.push(name.to_string());
        }
        self.selected.insert(name.to_string());
        Ok(LabelChoice {
            name: name.to_string(),
            selected: true,
        })
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn has_changes(&self) -> bool {
        self.selected != self.initial
    }
}
