//! Request gateway and typed models for the Jira Cloud REST API used by the focus timer.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod result;

pub use client::JiraClient;
pub use config::JiraConfig;
pub use error::{JiraError, Result};
pub use models::{
    AdfDocument, Assignee, CreateMeta, CreatedIssue, Issue, IssueCreateRequest, IssueFields,
    Myself, NamedRef, ProjectPage, ProjectRef, SearchResults, Transition, TransitionList,
    WorklogCreateRequest, WorklogCreated,
};
pub use reqwest::Method;
pub use result::{ApiErrorBody, RequestResult};
