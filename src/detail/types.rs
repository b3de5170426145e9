use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ux_tests::UxTestRow;
use crate::change::{percent_change, Compared, PercentChange};
use crate::feedback::{DailyComments, PageComments, RelevantCommentsAndWords};
use crate::metrics::{EnquiryCalls, MetricTotals, RangeMetrics, SearchTerm, TopicCalls};
use crate::model::{Attachment, EntityKind, Project, Task};
use crate::status::ProjectStatus;

/// Comparative summary of one entity over a primary and a comparison range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDetail {
    pub kind: EntityKind,
    pub id: String,
    pub title: String,

    /// Range tokens as requested.
    pub date_range: String,
    pub comparison_date_range: String,
    pub date_range_data: RangeMetrics,
    pub comparison_date_range_data: RangeMetrics,
    /// `visitsChange`, `dyf_yesChange`, ... for every total.
    pub totals_change: BTreeMap<String, PercentChange>,

    pub status: ProjectStatus,
    pub cops: bool,
    pub avg_task_success_from_last_test: Option<f64>,
    pub avg_success_value_change: Option<f64>,
    pub avg_success_percent_change: Option<PercentChange>,
    pub date_from_last_test: Option<String>,
    pub task_success_by_ux_test: Vec<UxTestRow>,

    pub search_terms: Vec<Compared<SearchTerm>>,

    pub feedback_by_page: Vec<Compared<PageComments>>,
    pub feedback_by_day: Vec<DailyComments>,
    pub most_relevant_comments_and_words: RelevantCommentsAndWords,
    pub num_comments: i64,
    pub num_comments_percent_change: PercentChange,

    pub calls_by_topic: Vec<Compared<TopicCalls>>,
    pub calldrivers_enquiry: Vec<Compared<EnquiryCalls>>,

    #[serde(flatten)]
    pub info: EntityInfo,
}

/// Fields that only make sense for one kind of entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub launch_date: Option<String>,
    pub members: Option<String>,
    pub url: Option<String>,
    pub group: Option<String>,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub attachments: Vec<Attachment>,
}

const TOTALS: &[(&str, fn(&MetricTotals) -> f64)] = &[
    ("visits", |t| t.visits as f64),
    ("dyf_submit", |t| t.dyf_submit as f64),
    ("dyf_yes", |t| t.dyf_yes as f64),
    ("dyf_no", |t| t.dyf_no as f64),
    ("fwylf_cant_find_info", |t| t.fwylf_cant_find_info as f64),
    ("fwylf_hard_to_understand", |t| t.fwylf_hard_to_understand as f64),
    ("fwylf_other", |t| t.fwylf_other as f64),
    ("fwylf_error", |t| t.fwylf_error as f64),
    ("gsc_total_clicks", |t| t.gsc_total_clicks as f64),
    ("gsc_total_impressions", |t| t.gsc_total_impressions as f64),
    ("gsc_total_ctr", |t| t.gsc_total_ctr),
    ("gsc_total_position", |t| t.gsc_total_position),
];

/// Change of every total plus `total_calldriversChange`.
pub fn totals_change(current: &RangeMetrics, previous: &RangeMetrics) -> BTreeMap<String, PercentChange> {
    let mut changes: BTreeMap<String, PercentChange> = TOTALS
        .iter()
        .map(|(name, get)| {
            (
                format!("{name}Change"),
                percent_change(get(&current.totals), get(&previous.totals)),
            )
        })
        .collect();
    changes.insert(
        "total_calldriversChange".to_string(),
        percent_change(
            current.calldrivers.total_calldrivers as f64,
            previous.calldrivers.total_calldrivers as f64,
        ),
    );
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_change_keys() {
        let mut current = RangeMetrics::default();
        current.totals.visits = 150;
        current.calldrivers.total_calldrivers = 4;
        let mut previous = RangeMetrics::default();
        previous.totals.visits = 120;

        let changes = totals_change(&current, &previous);
        assert_eq!(changes.len(), TOTALS.len() + 1);
        assert_eq!(changes["visitsChange"], PercentChange::Ratio(0.25));
        assert_eq!(changes["dyf_yesChange"], PercentChange::NoChange);
        assert_eq!(changes["total_calldriversChange"], PercentChange::Undefined);
    }
}
