mod document;
mod field;
mod issue;
mod project;
mod transition;
mod user;
mod worklog;

pub use document::AdfDocument;
pub use field::NamedRef;
pub use issue::{
    Assignee, CreatedIssue, Issue, IssueCreateRequest, IssueFields, LabelsUpdateRequest,
    SearchResults, WorklogPage, WorklogSummary,
};
pub use project::{CreateMeta, IssueTypeMeta, ProjectMeta, ProjectPage, ProjectRef};
pub use transition::{Transition, TransitionExecuteRequest, TransitionIdRef, TransitionList};
pub use user::Myself;
pub use worklog::{WorklogCreateRequest, WorklogCreated};
