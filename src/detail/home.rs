//! Catalog-wide summaries shown on the landing pages.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::ux_tests::latest_from_samples;
use crate::date_util::{date_key, months_before};
use crate::error::Result;
use crate::range::DateRange;
use crate::status::{status_case_sql, ProjectStatus};
use crate::storage::Database;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeProject {
    pub project_id: String,
    pub title: String,
    pub cops: bool,
    /// Earliest UX test date.
    pub start_date: Option<String>,
    pub launch_date: Option<String>,
    /// Mean success rate over every test of the project.
    pub avg_success_rate: Option<f64>,
    pub status: ProjectStatus,
    /// Mean success rate on the most recent test date.
    pub last_avg_success_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeSummary {
    pub num_in_progress: usize,
    pub num_planning: usize,
    pub num_completed_recently: usize,
    pub total_completed: usize,
    pub num_delayed: usize,
    pub completed_cops: usize,
    /// Projects with at least one UX test, by title.
    pub projects: Vec<HomeProject>,
}

/// Project counts by composite status, with "completed recently" measured
/// from `as_of`.
pub async fn home_summary_as_of(
    db: &Database,
    as_of: NaiveDate,
    recent_months: u32,
) -> Result<HomeSummary> {
    let projects = db
        .reader()
        .call(|conn| {
            let mut projects = home_projects_sql(conn)?;
            let latest = last_success_by_project_sql(conn)?;
            for p in &mut projects {
                p.last_avg_success_rate = latest.get(&p.project_id).copied().flatten();
            }
            Ok::<_, rusqlite::Error>(projects)
        })
        .await?;

    let cutoff = date_key(months_before(as_of, recent_months));
    let count = |status: ProjectStatus| projects.iter().filter(|p| p.status == status).count();
    let completed = || projects.iter().filter(|p| p.status == ProjectStatus::Complete);

    let summary = HomeSummary {
        num_in_progress: count(ProjectStatus::InProgress),
        num_planning: count(ProjectStatus::Planning),
        num_completed_recently: completed()
            .filter(|p| p.start_date.as_deref().is_some_and(|d| d >= cutoff.as_str()))
            .count(),
        total_completed: completed().count(),
        num_delayed: count(ProjectStatus::Delayed),
        completed_cops: completed().filter(|p| p.cops).count(),
        projects,
    };
    log::debug!(
        "home summary as of {as_of}: {} projects, {} completed since {cutoff}",
        summary.projects.len(),
        summary.num_completed_recently
    );
    Ok(summary)
}

fn home_projects_sql(conn: &Connection) -> std::result::Result<Vec<HomeProject>, rusqlite::Error> {
    let sql = format!(
        "SELECT p.project_id, p.title, MAX(u.cops), MIN(u.date_key), MAX(u.launch_date),
                AVG(u.success_rate), {}
         FROM dim_projects p
         JOIN dim_ux_tests u ON u.project_id = p.project_id
         GROUP BY p.project_id
         ORDER BY p.title, p.project_id",
        status_case_sql("u.status")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(HomeProject {
            project_id: row.get(0)?,
            title: row.get(1)?,
            cops: row.get::<_, i64>(2)? != 0,
            start_date: row.get(3)?,
            launch_date: row.get(4)?,
            avg_success_rate: row.get(5)?,
            status: ProjectStatus::from_label(&row.get::<_, String>(6)?),
            last_avg_success_rate: None,
        })
    })?;
    rows.collect()
}

fn last_success_by_project_sql(
    conn: &Connection,
) -> std::result::Result<HashMap<String, Option<f64>>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT project_id, date_key, success_rate FROM dim_ux_tests
         WHERE date_key IS NOT NULL AND success_rate IS NOT NULL",
    )?;
    let mut samples: HashMap<String, Vec<(String, f64)>> = HashMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
        ))
    })?;
    for row in rows {
        let (project_id, date, rate) = row?;
        samples.entry(project_id).or_default().push((date, rate));
    }
    Ok(samples
        .into_iter()
        .map(|(project_id, rates)| {
            let latest = latest_from_samples(rates.iter().map(|(d, r)| (d.as_str(), *r)));
            (project_id, latest.avg_test_success)
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskVisits {
    pub task_id: String,
    pub title: String,
    pub visits: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksHome {
    pub date_range: String,
    /// Visits to pages linked to at least one task, each page counted once.
    pub total_visits: i64,
    pub tasks: Vec<TaskVisits>,
}

/// Visits per task over `range`, busiest first.
pub async fn tasks_home(db: &Database, range: &DateRange) -> Result<TasksHome> {
    let (start, end) = range.keys();
    let date_range = range.to_token();

    let (total_visits, tasks) = db
        .reader()
        .call(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(m.visits), 0) FROM fact_page_metrics m
                 WHERE m.page_id IN (SELECT page_id FROM bridge_task_pages)
                   AND m.date_key >= ?1 AND m.date_key <= ?2",
                params![start, end],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT t.task_id, t.title, COALESCE(SUM(m.visits), 0) AS visits
                 FROM dim_tasks t
                 LEFT JOIN bridge_task_pages b ON b.task_id = t.task_id
                 LEFT JOIN fact_page_metrics m ON m.page_id = b.page_id
                     AND m.date_key >= ?1 AND m.date_key <= ?2
                 GROUP BY t.task_id
                 ORDER BY visits DESC, t.title, t.task_id",
            )?;
            let rows = stmt.query_map(params![start, end], |row| {
                Ok(TaskVisits {
                    task_id: row.get(0)?,
                    title: row.get(1)?,
                    visits: row.get(2)?,
                })
            })?;
            let tasks = rows.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok::<_, rusqlite::Error>((total, tasks))
        })
        .await?;

    Ok(TasksHome {
        date_range,
        total_visits,
        tasks,
    })
}
