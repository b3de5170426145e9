use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::model::{Attachment, Page, Project, Ref, Task, UxTest};

// ── Projects ───────────────────────────────────────────────────────

pub fn upsert_project(conn: &Connection, project: &Project) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_projects (project_id, title, description, cached_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(project_id) DO UPDATE SET
            title=excluded.title, description=excluded.description,
            cached_at=excluded.cached_at",
        params![project.project_id, project.title, project.description],
    )?;
    Ok(())
}

pub fn get_project(conn: &Connection, project_id: &str) -> Result<Option<Project>, rusqlite::Error> {
    conn.query_row(
        "SELECT project_id, title, description FROM dim_projects WHERE project_id = ?1",
        params![project_id],
        |row| {
            Ok(Project {
                project_id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn projects_for_task(conn: &Connection, task_id: &str) -> Result<Vec<Project>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT p.project_id, p.title, p.description
         FROM dim_projects p
         JOIN bridge_project_tasks bpt ON bpt.project_id = p.project_id
         WHERE bpt.task_id = ?1
         ORDER BY p.title, p.project_id",
    )?;
    let rows = stmt.query_map(params![task_id], |row| {
        Ok(Project {
            project_id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
        })
    })?;
    rows.collect()
}

/// Projects linked to a page directly or through one of its tasks.
pub fn projects_for_page(conn: &Connection, page_id: &str) -> Result<Vec<Project>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT p.project_id, p.title, p.description
         FROM dim_projects p
         WHERE p.project_id IN (
             SELECT project_id FROM bridge_project_pages WHERE page_id = ?1
             UNION
             SELECT bpt.project_id FROM bridge_project_tasks bpt
             JOIN bridge_task_pages btp ON btp.task_id = bpt.task_id
             WHERE btp.page_id = ?1
         )
         ORDER BY p.title, p.project_id",
    )?;
    let rows = stmt.query_map(params![page_id], |row| {
        Ok(Project {
            project_id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
        })
    })?;
    rows.collect()
}

// ── Tasks ──────────────────────────────────────────────────────────

pub fn upsert_task(conn: &Connection, task: &Task) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_tasks (
            task_id, title, group_name, subgroup, topic, subtopic, program, service, cached_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
        ON CONFLICT(task_id) DO UPDATE SET
            title=excluded.title, group_name=excluded.group_name, subgroup=excluded.subgroup,
            topic=excluded.topic, subtopic=excluded.subtopic, program=excluded.program,
            service=excluded.service, cached_at=excluded.cached_at",
        params![
            task.task_id,
            task.title,
            task.group,
            task.subgroup,
            task.topic,
            task.subtopic,
            task.program,
            task.service,
        ],
    )?;
    Ok(())
}

fn task_from_row(row: &Row<'_>) -> Result<Task, rusqlite::Error> {
    Ok(Task {
        task_id: row.get(0)?,
        title: row.get(1)?,
        group: row.get(2)?,
        subgroup: row.get(3)?,
        topic: row.get(4)?,
        subtopic: row.get(5)?,
        program: row.get(6)?,
        service: row.get(7)?,
    })
}

const TASK_COLUMNS: &str =
    "t.task_id, t.title, t.group_name, t.subgroup, t.topic, t.subtopic, t.program, t.service";

pub fn get_task(conn: &Connection, task_id: &str) -> Result<Option<Task>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM dim_tasks t WHERE t.task_id = ?1"),
        params![task_id],
        task_from_row,
    )
    .optional()
}

pub fn tasks_for_project(conn: &Connection, project_id: &str) -> Result<Vec<Task>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS}
         FROM dim_tasks t
         JOIN bridge_project_tasks bpt ON bpt.task_id = t.task_id
         WHERE bpt.project_id = ?1
         ORDER BY t.title, t.task_id"
    ))?;
    let rows = stmt.query_map(params![project_id], task_from_row)?;
    rows.collect()
}

pub fn tasks_for_page(conn: &Connection, page_id: &str) -> Result<Vec<Task>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS}
         FROM dim_tasks t
         JOIN bridge_task_pages btp ON btp.task_id = t.task_id
         WHERE btp.page_id = ?1
         ORDER BY t.title, t.task_id"
    ))?;
    let rows = stmt.query_map(params![page_id], task_from_row)?;
    rows.collect()
}

pub fn list_tasks(conn: &Connection) -> Result<Vec<Task>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM dim_tasks t ORDER BY t.title, t.task_id"
    ))?;
    let rows = stmt.query_map([], task_from_row)?;
    rows.collect()
}

// ── Pages ──────────────────────────────────────────────────────────

pub fn upsert_page(conn: &Connection, page: &Page) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_pages (page_id, title, url, lang, owners, sections, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
         ON CONFLICT(page_id) DO UPDATE SET
            title=excluded.title, url=excluded.url, lang=excluded.lang,
            owners=excluded.owners, sections=excluded.sections, cached_at=excluded.cached_at",
        params![
            page.page_id,
            page.title,
            page.url,
            page.lang,
            page.owners,
            page.sections,
        ],
    )?;
    Ok(())
}

pub fn get_page(conn: &Connection, page_id: &str) -> Result<Option<Page>, rusqlite::Error> {
    conn.query_row(
        "SELECT page_id, title, url, lang, owners, sections FROM dim_pages WHERE page_id = ?1",
        params![page_id],
        |row| {
            Ok(Page {
                page_id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
                lang: row.get(3)?,
                owners: row.get(4)?,
                sections: row.get(5)?,
            })
        },
    )
    .optional()
}

// ── Bridges ────────────────────────────────────────────────────────

pub fn link_project_task(
    conn: &Connection,
    project_id: &str,
    task_id: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO bridge_project_tasks (project_id, task_id) VALUES (?1, ?2)",
        params![project_id, task_id],
    )?;
    Ok(())
}

pub fn link_project_page(
    conn: &Connection,
    project_id: &str,
    page_id: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO bridge_project_pages (project_id, page_id) VALUES (?1, ?2)",
        params![project_id, page_id],
    )?;
    Ok(())
}

pub fn link_task_page(conn: &Connection, task_id: &str, page_id: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO bridge_task_pages (task_id, page_id) VALUES (?1, ?2)",
        params![task_id, page_id],
    )?;
    Ok(())
}

pub fn link_task_tpc_id(conn: &Connection, task_id: &str, tpc_id: i64) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO bridge_task_tpc_ids (task_id, tpc_id) VALUES (?1, ?2)",
        params![task_id, tpc_id],
    )?;
    Ok(())
}

pub fn task_ids_for_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT task_id FROM bridge_project_tasks WHERE project_id = ?1 ORDER BY task_id",
    )?;
    let rows = stmt.query_map(params![project_id], |row| row.get(0))?;
    rows.collect()
}

pub fn task_ids_for_page(conn: &Connection, page_id: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt =
        conn.prepare("SELECT task_id FROM bridge_task_pages WHERE page_id = ?1 ORDER BY task_id")?;
    let rows = stmt.query_map(params![page_id], |row| row.get(0))?;
    rows.collect()
}

/// Pages of the given tasks, plus any page linked straight to `project_id`.
pub fn page_ids_for_scope(
    conn: &Connection,
    task_ids: &[String],
    project_id: Option<&str>,
) -> Result<Vec<String>, rusqlite::Error> {
    let mut values = id_values(task_ids);
    values.push(Value::Text(project_id.unwrap_or_default().to_string()));
    let sql = format!(
        "SELECT page_id FROM bridge_task_pages WHERE task_id IN ({})
         UNION
         SELECT page_id FROM bridge_project_pages WHERE project_id = ?
         ORDER BY page_id",
        placeholders(task_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| row.get(0))?;
    rows.collect()
}

pub fn tpc_ids_for_tasks(conn: &Connection, task_ids: &[String]) -> Result<Vec<i64>, rusqlite::Error> {
    let sql = format!(
        "SELECT DISTINCT tpc_id FROM bridge_task_tpc_ids WHERE task_id IN ({}) ORDER BY tpc_id",
        placeholders(task_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(id_values(task_ids)), |row| row.get(0))?;
    rows.collect()
}

// ── UX Tests ───────────────────────────────────────────────────────

pub fn upsert_ux_test(conn: &Connection, test: &UxTest) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_ux_tests (
            ux_test_id, project_id, title, test_type, status, success_rate, total_users,
            date_key, start_date, launch_date, project_lead, cops, cached_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'))
        ON CONFLICT(ux_test_id) DO UPDATE SET
            project_id=excluded.project_id, title=excluded.title, test_type=excluded.test_type,
            status=excluded.status, success_rate=excluded.success_rate,
            total_users=excluded.total_users, date_key=excluded.date_key,
            start_date=excluded.start_date, launch_date=excluded.launch_date,
            project_lead=excluded.project_lead, cops=excluded.cops, cached_at=excluded.cached_at",
        params![
            test.ux_test_id,
            test.project_id,
            test.title,
            test.test_type,
            test.status,
            test.success_rate,
            test.total_users,
            test.date,
            test.start_date,
            test.launch_date,
            test.project_lead,
            test.cops as i32,
        ],
    )?;

    conn.execute(
        "DELETE FROM bridge_ux_test_tasks WHERE ux_test_id = ?1",
        params![test.ux_test_id],
    )?;
    for task in &test.tasks {
        conn.execute(
            "INSERT OR IGNORE INTO bridge_ux_test_tasks (ux_test_id, task_id) VALUES (?1, ?2)",
            params![test.ux_test_id, task.id()],
        )?;
    }
    Ok(())
}

const UX_TEST_COLUMNS: &str = "u.ux_test_id, u.project_id, u.title, u.test_type, u.status, \
     u.success_rate, u.total_users, u.date_key, u.start_date, u.launch_date, u.project_lead, u.cops";

fn ux_test_from_row(row: &Row<'_>) -> Result<UxTest, rusqlite::Error> {
    Ok(UxTest {
        ux_test_id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        test_type: row.get(3)?,
        status: row.get(4)?,
        success_rate: row.get(5)?,
        total_users: row.get(6)?,
        date: row.get(7)?,
        start_date: row.get(8)?,
        launch_date: row.get(9)?,
        project_lead: row.get(10)?,
        cops: row.get::<_, i64>(11)? != 0,
        tasks: Vec::new(),
    })
}

/// Attach the task ids of each test as unresolved refs.
fn load_ux_test_tasks(conn: &Connection, tests: &mut [UxTest]) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT task_id FROM bridge_ux_test_tasks WHERE ux_test_id = ?1 ORDER BY task_id",
    )?;
    for test in tests.iter_mut() {
        let ids = stmt
            .query_map(params![test.ux_test_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        test.tasks = ids.into_iter().map(Ref::Unresolved).collect();
    }
    Ok(())
}

pub fn ux_tests_for_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<UxTest>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {UX_TEST_COLUMNS} FROM dim_ux_tests u
         WHERE u.project_id = ?1
         ORDER BY u.date_key, u.ux_test_id"
    ))?;
    let mut tests = stmt
        .query_map(params![project_id], ux_test_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    load_ux_test_tasks(conn, &mut tests)?;
    Ok(tests)
}

/// UX tests linked to any of the given tasks.
pub fn ux_tests_for_tasks(
    conn: &Connection,
    task_ids: &[String],
) -> Result<Vec<UxTest>, rusqlite::Error> {
    let sql = format!(
        "SELECT {UX_TEST_COLUMNS} FROM dim_ux_tests u
         WHERE u.ux_test_id IN (
             SELECT ux_test_id FROM bridge_ux_test_tasks WHERE task_id IN ({})
         )
         ORDER BY u.date_key, u.ux_test_id",
        placeholders(task_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut tests = stmt
        .query_map(params_from_iter(id_values(task_ids)), ux_test_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    load_ux_test_tasks(conn, &mut tests)?;
    Ok(tests)
}

// ── Attachments ────────────────────────────────────────────────────

pub fn upsert_attachment(conn: &Connection, attachment: &Attachment) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_attachments (attachment_id, project_id, filename, storage_url, size)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(attachment_id) DO UPDATE SET
            project_id=excluded.project_id, filename=excluded.filename,
            storage_url=excluded.storage_url, size=excluded.size",
        params![
            attachment.attachment_id,
            attachment.project_id,
            attachment.filename,
            attachment.storage_url,
            attachment.size,
        ],
    )?;
    Ok(())
}

pub fn attachments_for_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<Attachment>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT attachment_id, project_id, filename, storage_url, size
         FROM dim_attachments WHERE project_id = ?1
         ORDER BY filename, attachment_id",
    )?;
    let rows = stmt.query_map(params![project_id], |row| {
        Ok(Attachment {
            attachment_id: row.get(0)?,
            project_id: row.get(1)?,
            filename: row.get(2)?,
            storage_url: row.get(3)?,
            size: row.get(4)?,
        })
    })?;
    rows.collect()
}

// ── Facts ──────────────────────────────────────────────────────────

/// One page-day of traffic and survey counts.
#[derive(Debug, Clone, Default)]
pub struct PageMetricsRow {
    pub page_id: String,
    pub date: String,
    pub url: String,
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
    pub gsc_total_ctr: f64,
    pub gsc_total_position: f64,
}

pub fn upsert_page_metrics(conn: &Connection, row: &PageMetricsRow) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO fact_page_metrics (
            page_id, date_key, url, visits, dyf_submit, dyf_yes, dyf_no,
            fwylf_cant_find_info, fwylf_hard_to_understand, fwylf_other, fwylf_error,
            gsc_total_clicks, gsc_total_impressions, gsc_total_ctr, gsc_total_position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(page_id, date_key) DO UPDATE SET
            url=excluded.url, visits=excluded.visits, dyf_submit=excluded.dyf_submit,
            dyf_yes=excluded.dyf_yes, dyf_no=excluded.dyf_no,
            fwylf_cant_find_info=excluded.fwylf_cant_find_info,
            fwylf_hard_to_understand=excluded.fwylf_hard_to_understand,
            fwylf_other=excluded.fwylf_other, fwylf_error=excluded.fwylf_error,
            gsc_total_clicks=excluded.gsc_total_clicks,
            gsc_total_impressions=excluded.gsc_total_impressions,
            gsc_total_ctr=excluded.gsc_total_ctr, gsc_total_position=excluded.gsc_total_position",
        params![
            row.page_id,
            row.date,
            row.url,
            row.visits,
            row.dyf_submit,
            row.dyf_yes,
            row.dyf_no,
            row.fwylf_cant_find_info,
            row.fwylf_hard_to_understand,
            row.fwylf_other,
            row.fwylf_error,
            row.gsc_total_clicks,
            row.gsc_total_impressions,
            row.gsc_total_ctr,
            row.gsc_total_position,
        ],
    )?;
    Ok(())
}

pub fn upsert_search_term(
    conn: &Connection,
    page_id: &str,
    date: &str,
    term: &str,
    clicks: i64,
    position: f64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO fact_search_terms (page_id, date_key, term, clicks, position)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(page_id, date_key, term) DO UPDATE SET
            clicks=excluded.clicks, position=excluded.position",
        params![page_id, date, term, clicks, position],
    )?;
    Ok(())
}

pub fn insert_calldriver(
    conn: &Connection,
    date: &str,
    enquiry_line: &str,
    topic: Option<&str>,
    tpc_id: i64,
    calls: i64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO fact_calldrivers (date_key, enquiry_line, topic, tpc_id, calls)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![date, enquiry_line, topic, tpc_id, calls],
    )?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FeedbackRow {
    pub feedback_id: String,
    pub date: String,
    pub page_id: Option<String>,
    pub url: String,
    pub lang: String,
    pub comment: String,
}

pub fn upsert_feedback(conn: &Connection, row: &FeedbackRow) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO fact_feedback (feedback_id, date_key, page_id, url, lang, comment)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(feedback_id) DO UPDATE SET
            date_key=excluded.date_key, page_id=excluded.page_id, url=excluded.url,
            lang=excluded.lang, comment=excluded.comment",
        params![
            row.feedback_id,
            row.date,
            row.page_id,
            row.url,
            row.lang,
            row.comment,
        ],
    )?;
    Ok(())
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Helpers ────────────────────────────────────────────────────────

/// `?,?,?` for an `IN (...)` list. An empty list yields `NULL`, which
/// matches nothing.
pub(crate) fn placeholders(n: usize) -> String {
    if n == 0 {
        return "NULL".to_string();
    }
    vec!["?"; n].join(",")
}

pub(crate) fn id_values(ids: &[String]) -> Vec<Value> {
    ids.iter().map(|id| Value::Text(id.clone())).collect()
}
