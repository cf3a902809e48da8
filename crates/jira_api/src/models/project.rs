//! Project listing and create-metadata models.

use serde::Deserialize;

/// One page of `project/search`.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPage {
    #[serde(default)]
    pub values: Vec<ProjectRef>,
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    pub key: Option<String>,
    pub name: Option<String>,
}

/// Response of `issue/createmeta` expanded with issue types.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CreateMeta {
    #[serde(default)]
    pub projects: Vec<ProjectMeta>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectMeta {
    pub key: Option<String>,
    #[serde(default)]
    pub issuetypes: Vec<IssueTypeMeta>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IssueTypeMeta {
    pub name: Option<String>,
    #[serde(default)]
    pub subtask: bool,
}

impl CreateMeta {
    /// Sorted names of the non-subtask issue types offered for `project_key`.
    pub fn standard_issue_types(&self, project_key: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .projects
            .iter()
            .find(|project| project.key.as_deref() == Some(project_key))
            .map(|project| {
                project
                    .issuetypes
                    .iter()
                    .filter(|issue_type| !issue_type.subtask)
                    .filter_map(|issue_type| issue_type.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
