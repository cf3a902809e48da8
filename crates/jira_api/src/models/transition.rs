use serde::{Deserialize, Serialize};

use super::field::{deserialize_string_field, NamedRef};

/// Response of `issue/{key}/transitions`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TransitionList {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Transition {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub to: Option<NamedRef>,
}

impl Transition {
    /// Name of the status this transition leads to.
    pub fn target_name(&self) -> Option<&str> {
        self.to.as_ref().and_then(|to| to.name.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct TransitionExecuteRequest<'a> {
    pub transition: TransitionIdRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct TransitionIdRef<'a> {
    pub id: &'a str,
}

impl<'a> TransitionExecuteRequest<'a> {
    pub fn new(id: &'a str) -> Self {
        Self {
            transition: TransitionIdRef { id },
        }
    }
}
