//! Composite project status derived from UX test statuses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "Complete")]
    Complete,
    #[serde(rename = "Delayed")]
    Delayed,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Planning")]
    Planning,
    #[serde(rename = "Exploratory")]
    Exploratory,
    #[serde(rename = "Being monitored")]
    BeingMonitored,
    #[serde(rename = "Needs review")]
    NeedsReview,
    #[serde(rename = "Paused")]
    Paused,
    #[serde(rename = "Unknown")]
    Unknown,
}

/// Statuses that win when at least one child carries them, highest first.
/// `Complete` is handled separately: it requires every child to be complete.
pub const STATUS_PRIORITY: [ProjectStatus; 7] = [
    ProjectStatus::Delayed,
    ProjectStatus::InProgress,
    ProjectStatus::Planning,
    ProjectStatus::Exploratory,
    ProjectStatus::BeingMonitored,
    ProjectStatus::NeedsReview,
    ProjectStatus::Paused,
];

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 9] = [
        ProjectStatus::Complete,
        ProjectStatus::Delayed,
        ProjectStatus::InProgress,
        ProjectStatus::Planning,
        ProjectStatus::Exploratory,
        ProjectStatus::BeingMonitored,
        ProjectStatus::NeedsReview,
        ProjectStatus::Paused,
        ProjectStatus::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Complete => "Complete",
            ProjectStatus::Delayed => "Delayed",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Planning => "Planning",
            ProjectStatus::Exploratory => "Exploratory",
            ProjectStatus::BeingMonitored => "Being monitored",
            ProjectStatus::NeedsReview => "Needs review",
            ProjectStatus::Paused => "Paused",
            ProjectStatus::Unknown => "Unknown",
        }
    }

    /// Map a stored label to a status. Unrecognized labels become `Unknown`.
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.label() == label)
            .unwrap_or(ProjectStatus::Unknown)
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Reduce child statuses to one composite status.
pub fn reduce_status(statuses: &[ProjectStatus]) -> ProjectStatus {
    if statuses.is_empty() {
        return ProjectStatus::Unknown;
    }
    if statuses.iter().all(|s| *s == ProjectStatus::Complete) {
        return ProjectStatus::Complete;
    }
    STATUS_PRIORITY
        .into_iter()
        .find(|candidate| statuses.contains(candidate))
        .unwrap_or(ProjectStatus::Unknown)
}

/// Aggregate SQL expression equivalent to [`reduce_status`] over the rows of
/// a `GROUP BY`, where a row's status is read from `column`.
///
/// A NULL status counts as a row that is not complete, matching
/// `UxTest::project_status` mapping `None` to `Unknown`.
pub fn status_case_sql(column: &str) -> String {
    let has = |s: ProjectStatus| {
        format!(
            "SUM(CASE WHEN {column} = '{}' THEN 1 ELSE 0 END)",
            s.label()
        )
    };
    let mut sql = format!(
        "CASE WHEN COUNT(*) > 0 AND {} = COUNT(*) THEN '{}'",
        has(ProjectStatus::Complete),
        ProjectStatus::Complete.label()
    );
    for status in STATUS_PRIORITY {
        sql.push_str(&format!(" WHEN {} > 0 THEN '{}'", has(status), status.label()));
    }
    sql.push_str(&format!(" ELSE '{}' END", ProjectStatus::Unknown.label()));
    sql
}
