//! Status-transition matching.

use std::collections::BTreeSet;

use jira_api::Transition;

/// No transition leads to the requested status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatchingTransition {
    pub target: String,
    pub available: Vec<String>,
}

/// Id of the first transition (in API order) whose destination status
/// equals `target`, ignoring case. Transitions without an id never match.
pub fn match_transition(
    transitions: &[Transition],
    target: &str,
) -> Result<String, NoMatchingTransition> {
    let wanted = target.trim().to_lowercase();
    transitions
        .iter()
        .filter(|transition| {
            transition
                .target_name()
                .map(|name| name.to_lowercase() == wanted)
                .unwrap_or(false)
        })
        .find_map(|transition| transition.id.clone())
        .ok_or_else(|| NoMatchingTransition {
            target: target.trim().to_string(),
            available: available_targets(transitions),
        })
}

/// Distinct destination names, sorted.
pub fn available_targets(transitions: &[Transition]) -> Vec<String> {
    transitions
        .iter()
        .filter_map(|transition| transition.target_name())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
