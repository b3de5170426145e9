//! Catalog entities as stored in the warehouse dimensions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::status::ProjectStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    Task,
    Page,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Task => "task",
            EntityKind::Page => "page",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "project" | "projects" => Ok(EntityKind::Project),
            "task" | "tasks" => Ok(EntityKind::Task),
            "page" | "pages" => Ok(EntityKind::Page),
            other => Err(Error::Other(format!("unknown entity kind: {other}"))),
        }
    }
}

/// A relation to another entity, either just its id or the loaded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Unresolved(String),
    Resolved(T),
}

impl<T: HasId> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Unresolved(id) => id,
            Ref::Resolved(t) => t.id(),
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Ref::Resolved(t) => Some(t),
            Ref::Unresolved(_) => None,
        }
    }
}

pub trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub title: String,
    pub group: Option<String>,
    pub subgroup: Option<String>,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub program: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    pub page_id: String,
    pub title: String,
    pub url: String,
    pub lang: Option<String>,
    pub owners: Option<String>,
    pub sections: Option<String>,
}

impl HasId for Project {
    fn id(&self) -> &str {
        &self.project_id
    }
}

impl HasId for Task {
    fn id(&self) -> &str {
        &self.task_id
    }
}

impl HasId for Page {
    fn id(&self) -> &str {
        &self.page_id
    }
}

/// One usability test run attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UxTest {
    pub ux_test_id: String,
    pub project_id: String,
    pub title: String,
    pub test_type: Option<String>,
    /// Raw status label as recorded by the research team.
    pub status: Option<String>,
    pub success_rate: Option<f64>,
    pub total_users: Option<i64>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub launch_date: Option<String>,
    pub project_lead: Option<String>,
    pub cops: bool,
    pub tasks: Vec<Ref<Task>>,
}

impl UxTest {
    pub fn project_status(&self) -> ProjectStatus {
        match self.status.as_deref() {
            Some(label) => ProjectStatus::from_label(label),
            None => ProjectStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: String,
    pub project_id: String,
    pub filename: String,
    pub storage_url: Option<String>,
    pub size: Option<i64>,
}

impl Attachment {
    /// Storage URL without its scheme; the UI prepends its own.
    pub fn display_url(&self) -> Option<String> {
        self.storage_url
            .as_deref()
            .map(|u| u.strip_prefix("https://").unwrap_or(u).to_string())
    }
}
