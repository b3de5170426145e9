pub mod calldrivers;
pub mod search_terms;
pub mod types;

pub use search_terms::top_search_terms;
pub use types::*;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

use crate::error::Result;
use crate::graph::Scope;
use crate::range::DateRange;
use crate::storage::repository::{id_values, placeholders};
use crate::storage::Database;

/// Roll up every page and call-driver metric of `scope` over `range`.
///
/// `by_tasks` adds the per-task breakdown, which only makes sense when the
/// entity spans several tasks.
pub async fn compute_range_metrics(
    db: &Database,
    scope: &Scope,
    range: &DateRange,
    by_tasks: bool,
) -> Result<RangeMetrics> {
    let (start, end) = range.keys();
    let scope = scope.clone();

    let metrics = db
        .reader()
        .call(move |conn| {
            let totals = compute_totals_sql(conn, &scope.page_ids, &start, &end)?;
            let visits_by_day = compute_visits_by_day_sql(conn, &scope.page_ids, &start, &end)?;
            let dyf_by_day = compute_dyf_by_day_sql(conn, &scope.page_ids, &start, &end)?;
            let visits_by_page = compute_visits_by_page_sql(conn, &scope.page_ids, &start, &end)?;
            let page_metrics_by_tasks = if by_tasks {
                compute_task_metrics_sql(conn, &scope, &start, &end)?
            } else {
                Vec::new()
            };
            let calldrivers = calldrivers::compute_calldrivers_sql(conn, &scope, &start, &end)?;

            Ok::<RangeMetrics, rusqlite::Error>(RangeMetrics {
                totals,
                visits_by_day,
                dyf_by_day,
                visits_by_page,
                page_metrics_by_tasks,
                calldrivers,
            })
        })
        .await?;
    Ok(metrics)
}

/// Sum columns of `fact_page_metrics`, aliased `m`.
const SUM_COLUMNS: &str = "COALESCE(SUM(m.visits), 0), COALESCE(SUM(m.dyf_submit), 0), \
     COALESCE(SUM(m.dyf_yes), 0), COALESCE(SUM(m.dyf_no), 0), \
     COALESCE(SUM(m.fwylf_cant_find_info), 0), COALESCE(SUM(m.fwylf_hard_to_understand), 0), \
     COALESCE(SUM(m.fwylf_other), 0), COALESCE(SUM(m.fwylf_error), 0), \
     COALESCE(SUM(m.gsc_total_clicks), 0), COALESCE(SUM(m.gsc_total_impressions), 0)";

/// Read the ten sums starting at `offset`, then ctr and position.
fn totals_from_row(
    row: &Row<'_>,
    offset: usize,
) -> std::result::Result<MetricTotals, rusqlite::Error> {
    Ok(MetricTotals {
        visits: row.get(offset)?,
        dyf_submit: row.get(offset + 1)?,
        dyf_yes: row.get(offset + 2)?,
        dyf_no: row.get(offset + 3)?,
        fwylf_cant_find_info: row.get(offset + 4)?,
        fwylf_hard_to_understand: row.get(offset + 5)?,
        fwylf_other: row.get(offset + 6)?,
        fwylf_error: row.get(offset + 7)?,
        gsc_total_clicks: row.get(offset + 8)?,
        gsc_total_impressions: row.get(offset + 9)?,
        gsc_total_ctr: row.get::<_, Option<f64>>(offset + 10)?.unwrap_or(0.0),
        gsc_total_position: row.get::<_, Option<f64>>(offset + 11)?.unwrap_or(0.0),
    })
}

fn scoped_values(page_ids: &[String], start: &str, end: &str) -> Vec<Value> {
    let mut values = id_values(page_ids);
    values.push(Value::Text(start.to_string()));
    values.push(Value::Text(end.to_string()));
    values
}

fn compute_totals_sql(
    conn: &Connection,
    page_ids: &[String],
    start: &str,
    end: &str,
) -> std::result::Result<MetricTotals, rusqlite::Error> {
    // Inner query: one row per page with its sums and means.
    let sql = format!(
        "SELECT COALESCE(SUM(visits), 0), COALESCE(SUM(dyf_submit), 0),
                COALESCE(SUM(dyf_yes), 0), COALESCE(SUM(dyf_no), 0),
                COALESCE(SUM(fwylf_cant_find_info), 0), COALESCE(SUM(fwylf_hard_to_understand), 0),
                COALESCE(SUM(fwylf_other), 0), COALESCE(SUM(fwylf_error), 0),
                COALESCE(SUM(gsc_total_clicks), 0), COALESCE(SUM(gsc_total_impressions), 0),
                AVG(page_ctr), AVG(page_position)
         FROM (
             SELECT m.page_id,
                    SUM(m.visits) AS visits, SUM(m.dyf_submit) AS dyf_submit,
                    SUM(m.dyf_yes) AS dyf_yes, SUM(m.dyf_no) AS dyf_no,
                    SUM(m.fwylf_cant_find_info) AS fwylf_cant_find_info,
                    SUM(m.fwylf_hard_to_understand) AS fwylf_hard_to_understand,
                    SUM(m.fwylf_other) AS fwylf_other, SUM(m.fwylf_error) AS fwylf_error,
                    SUM(m.gsc_total_clicks) AS gsc_total_clicks,
                    SUM(m.gsc_total_impressions) AS gsc_total_impressions,
                    AVG(m.gsc_total_ctr) AS page_ctr,
                    AVG(m.gsc_total_position) AS page_position
             FROM fact_page_metrics m
             WHERE m.page_id IN ({})
               AND m.date_key >= ? AND m.date_key <= ?
             GROUP BY m.page_id
         )",
        placeholders(page_ids.len())
    );
    conn.query_row(
        &sql,
        params_from_iter(scoped_values(page_ids, start, end)),
        |row| totals_from_row(row, 0),
    )
}

fn compute_visits_by_day_sql(
    conn: &Connection,
    page_ids: &[String],
    start: &str,
    end: &str,
) -> std::result::Result<Vec<DailyVisits>, rusqlite::Error> {
    let sql = format!(
        "SELECT m.date_key, SUM(m.visits)
         FROM fact_page_metrics m
         WHERE m.page_id IN ({})
           AND m.date_key >= ? AND m.date_key <= ?
         GROUP BY m.date_key
         ORDER BY m.date_key",
        placeholders(page_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(scoped_values(page_ids, start, end)), |row| {
        Ok(DailyVisits {
            date: row.get(0)?,
            visits: row.get(1)?,
        })
    })?;
    rows.collect()
}

fn compute_dyf_by_day_sql(
    conn: &Connection,
    page_ids: &[String],
    start: &str,
    end: &str,
) -> std::result::Result<Vec<DailyDyf>, rusqlite::Error> {
    let sql = format!(
        "SELECT m.date_key, SUM(m.dyf_submit), SUM(m.dyf_yes), SUM(m.dyf_no)
         FROM fact_page_metrics m
         WHERE m.page_id IN ({})
           AND m.date_key >= ? AND m.date_key <= ?
         GROUP BY m.date_key
         ORDER BY m.date_key",
        placeholders(page_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(scoped_values(page_ids, start, end)), |row| {
        Ok(DailyDyf {
            date: row.get(0)?,
            dyf_submit: row.get(1)?,
            dyf_yes: row.get(2)?,
            dyf_no: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Every page of the scope, including pages with no records in the range.
fn compute_visits_by_page_sql(
    conn: &Connection,
    page_ids: &[String],
    start: &str,
    end: &str,
) -> std::result::Result<Vec<PageVisits>, rusqlite::Error> {
    let sql = format!(
        "SELECT p.page_id, p.title, p.url, {SUM_COLUMNS},
                AVG(m.gsc_total_ctr), AVG(m.gsc_total_position)
         FROM dim_pages p
         LEFT JOIN fact_page_metrics m
           ON m.page_id = p.page_id AND m.date_key >= ? AND m.date_key <= ?
         WHERE p.page_id IN ({})
         GROUP BY p.page_id
         ORDER BY p.title, p.page_id",
        placeholders(page_ids.len())
    );
    let mut values = vec![Value::Text(start.to_string()), Value::Text(end.to_string())];
    values.extend(id_values(page_ids));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(PageVisits {
            page_id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            totals: totals_from_row(row, 3)?,
        })
    })?;
    rows.collect()
}

/// Per task of the scope, totals over its pages that are also in scope.
fn compute_task_metrics_sql(
    conn: &Connection,
    scope: &Scope,
    start: &str,
    end: &str,
) -> std::result::Result<Vec<TaskPageMetrics>, rusqlite::Error> {
    let sql = format!(
        "SELECT t.task_id, t.title, {SUM_COLUMNS},
                AVG(m.gsc_total_ctr), AVG(m.gsc_total_position)
         FROM dim_tasks t
         JOIN bridge_task_pages btp ON btp.task_id = t.task_id
         LEFT JOIN fact_page_metrics m
           ON m.page_id = btp.page_id AND m.date_key >= ? AND m.date_key <= ?
         WHERE t.task_id IN ({}) AND btp.page_id IN ({})
         GROUP BY t.task_id
         ORDER BY t.title, t.task_id",
        placeholders(scope.task_ids.len()),
        placeholders(scope.page_ids.len())
    );
    let mut values = vec![Value::Text(start.to_string()), Value::Text(end.to_string())];
    values.extend(id_values(&scope.task_ids));
    values.extend(id_values(&scope.page_ids));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(TaskPageMetrics {
            task_id: row.get(0)?,
            title: row.get(1)?,
            totals: totals_from_row(row, 2)?,
        })
    })?;
    rows.collect()
}
