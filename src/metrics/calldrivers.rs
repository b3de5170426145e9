//! Call-center drivers attributed to an entity through its tasks' topic ids.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::types::*;
use crate::graph::Scope;
use crate::storage::repository::{id_values, placeholders};

pub(crate) fn compute_calldrivers_sql(
    conn: &Connection,
    scope: &Scope,
    start: &str,
    end: &str,
) -> std::result::Result<CallDriverMetrics, rusqlite::Error> {
    let tpc_list = placeholders(scope.tpc_ids.len());
    let mut values: Vec<Value> = scope.tpc_ids.iter().map(|id| Value::Integer(*id)).collect();
    values.push(Value::Text(start.to_string()));
    values.push(Value::Text(end.to_string()));
    let filter = format!("c.tpc_id IN ({tpc_list}) AND c.date_key >= ? AND c.date_key <= ?");

    let total_calldrivers: i64 = conn.query_row(
        &format!("SELECT COALESCE(SUM(c.calls), 0) FROM fact_calldrivers c WHERE {filter}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let calldrivers_by_day = {
        let mut stmt = conn.prepare(&format!(
            "SELECT c.date_key, SUM(c.calls) FROM fact_calldrivers c
             WHERE {filter}
             GROUP BY c.date_key ORDER BY c.date_key"
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(DailyCalls {
                date: row.get(0)?,
                calls: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let calldrivers_enquiry = {
        let mut stmt = conn.prepare(&format!(
            "SELECT c.enquiry_line, SUM(c.calls) FROM fact_calldrivers c
             WHERE {filter}
             GROUP BY c.enquiry_line ORDER BY c.enquiry_line"
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(EnquiryCalls {
                enquiry_line: row.get(0)?,
                calls: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let calls_by_topic = {
        let mut stmt = conn.prepare(&format!(
            "SELECT COALESCE(c.topic, ''), SUM(c.calls) AS calls FROM fact_calldrivers c
             WHERE {filter}
             GROUP BY COALESCE(c.topic, '') ORDER BY calls DESC, 1"
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(TopicCalls {
                topic: row.get(0)?,
                calls: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    // A topic id shared by two tasks counts toward both.
    let calls_by_tasks = {
        let sql = format!(
            "SELECT t.task_id, t.title, SUM(c.calls) AS calls
             FROM fact_calldrivers c
             JOIN bridge_task_tpc_ids b ON b.tpc_id = c.tpc_id
             JOIN dim_tasks t ON t.task_id = b.task_id
             WHERE {filter} AND t.task_id IN ({})
             GROUP BY t.task_id
             ORDER BY calls DESC, t.title, t.task_id",
            placeholders(scope.task_ids.len())
        );
        let mut task_values = values.clone();
        task_values.extend(id_values(&scope.task_ids));
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(task_values), |row| {
            Ok(TaskCalls {
                task_id: row.get(0)?,
                title: row.get(1)?,
                calls: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    Ok(CallDriverMetrics {
        total_calldrivers,
        calldrivers_by_day,
        calldrivers_enquiry,
        calls_by_topic,
        calls_by_tasks,
    })
}
