use serde::{Deserialize, Serialize};

/// Sums and means of page-day records over a scope and range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub visits: i64,
    pub dyf_submit: i64,
    pub dyf_yes: i64,
    pub dyf_no: i64,
    pub fwylf_cant_find_info: i64,
    pub fwylf_hard_to_understand: i64,
    pub fwylf_other: i64,
    pub fwylf_error: i64,
    pub gsc_total_clicks: i64,
    pub gsc_total_impressions: i64,
    /// Mean of per-page means, not weighted by impressions.
    pub gsc_total_ctr: f64,
    /// Mean of per-page means, not weighted by impressions.
    pub gsc_total_position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVisits {
    pub date: String,
    pub visits: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDyf {
    pub date: String,
    pub dyf_submit: i64,
    pub dyf_yes: i64,
    pub dyf_no: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCalls {
    pub date: String,
    pub calls: i64,
}

/// One page of the scope with its totals for the range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVisits {
    pub page_id: String,
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub totals: MetricTotals,
}

/// Totals over the pages of one task that fall inside the scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPageMetrics {
    pub task_id: String,
    pub title: String,
    #[serde(flatten)]
    pub totals: MetricTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnquiryCalls {
    pub enquiry_line: String,
    pub calls: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCalls {
    pub topic: String,
    pub calls: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCalls {
    pub task_id: String,
    pub title: String,
    pub calls: i64,
}

/// Call-center volume attributed to the scope's topic ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallDriverMetrics {
    pub total_calldrivers: i64,
    pub calldrivers_by_day: Vec<DailyCalls>,
    pub calldrivers_enquiry: Vec<EnquiryCalls>,
    pub calls_by_topic: Vec<TopicCalls>,
    pub calls_by_tasks: Vec<TaskCalls>,
}

/// Everything rolled up for one entity over one date range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeMetrics {
    #[serde(flatten)]
    pub totals: MetricTotals,
    pub visits_by_day: Vec<DailyVisits>,
    pub dyf_by_day: Vec<DailyDyf>,
    pub visits_by_page: Vec<PageVisits>,
    pub page_metrics_by_tasks: Vec<TaskPageMetrics>,
    #[serde(flatten)]
    pub calldrivers: CallDriverMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub term: String,
    pub clicks: i64,
    pub position: f64,
}
