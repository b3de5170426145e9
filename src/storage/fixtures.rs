//! A small passport-services catalog shared by the aggregation tests.
//!
//! Primary range is March 2024, comparison range is February 2024.

use super::repository::*;
use super::Database;
use crate::model::{Attachment, Page, Project, Ref, Task, UxTest};

pub const PRIMARY: &str = "2024-03-01/2024-03-31";
pub const COMPARISON: &str = "2024-02-01/2024-02-29";

pub const PROJECT_ID: &str = "proj-passport";
pub const PROJECT_BENEFITS: &str = "proj-benefits";
pub const PROJECT_ARCHIVE: &str = "proj-archive";
pub const PROJECT_DELAYED: &str = "proj-delayed";
pub const PROJECT_EMPTY: &str = "proj-empty";

pub const TASK_A: &str = "task-apply";
pub const TASK_B: &str = "task-renew";

pub const PAGE_1: &str = "page-1";
pub const PAGE_2: &str = "page-2";
pub const PAGE_3: &str = "page-3";
pub const PAGE_OUTSIDE: &str = "page-9";

pub const TPC_A: i64 = 101;
pub const TPC_OUTSIDE: i64 = 999;

pub fn project(id: &str, title: &str, description: Option<&str>) -> Project {
    Project {
        project_id: id.into(),
        title: title.into(),
        description: description.map(String::from),
    }
}

fn page(id: &str, title: &str, path: &str) -> Page {
    Page {
        page_id: id.into(),
        title: title.into(),
        url: format!("www.canada.ca/en/{path}.html"),
        lang: Some("en".into()),
        ..Page::default()
    }
}

pub fn ux_test(
    id: &str,
    project_id: &str,
    status: &str,
    date: &str,
    success_rate: Option<f64>,
    cops: bool,
    tasks: &[&str],
) -> UxTest {
    UxTest {
        ux_test_id: id.into(),
        project_id: project_id.into(),
        title: format!("Test {id}"),
        test_type: Some("Baseline".into()),
        status: Some(status.into()),
        success_rate,
        total_users: Some(12),
        date: Some(date.into()),
        start_date: None,
        launch_date: Some("2024-06-01".into()),
        project_lead: Some("R. Tremblay".into()),
        cops,
        tasks: tasks.iter().map(|t| Ref::Unresolved(t.to_string())).collect(),
    }
}

fn metrics(page_id: &str, date: &str, visits: i64) -> PageMetricsRow {
    PageMetricsRow {
        page_id: page_id.into(),
        date: date.into(),
        url: format!("www.canada.ca/{page_id}"),
        visits,
        ..PageMetricsRow::default()
    }
}

fn feedback(id: &str, date: &str, page_id: &str, lang: &str, comment: &str) -> FeedbackRow {
    FeedbackRow {
        feedback_id: id.into(),
        date: date.into(),
        page_id: Some(page_id.into()),
        url: format!("www.canada.ca/{page_id}"),
        lang: lang.into(),
        comment: comment.into(),
    }
}

/// Seed the catalog into `db`.
///
/// Scope of `PROJECT_ID`: tasks A and B, pages 1 and 2 through the tasks,
/// page 3 linked directly, topic id `TPC_A` through task A. `PAGE_OUTSIDE`
/// and `TPC_OUTSIDE` carry large numbers that must never leak into it.
pub async fn seed_catalog(db: &Database) {
    db.writer()
        .call(|conn| {
            upsert_project(
                conn,
                &project(PROJECT_ID, "Passport renewal", Some("Online renewal redesign")),
            )?;
            upsert_project(conn, &project(PROJECT_BENEFITS, "Benefits finder", None))?;
            upsert_project(conn, &project(PROJECT_ARCHIVE, "Archived survey", None))?;
            upsert_project(conn, &project(PROJECT_DELAYED, "Tax slips", None))?;
            upsert_project(conn, &project(PROJECT_EMPTY, "No tests yet", None))?;

            upsert_task(
                conn,
                &Task {
                    task_id: TASK_A.into(),
                    title: "Apply for a passport".into(),
                    group: Some("Travel".into()),
                    topic: Some("Passport".into()),
                    subtopic: Some("Apply".into()),
                    ..Task::default()
                },
            )?;
            upsert_task(
                conn,
                &Task {
                    task_id: TASK_B.into(),
                    title: "Renew a passport".into(),
                    group: Some("Travel".into()),
                    topic: Some("Passport".into()),
                    subtopic: Some("Renew".into()),
                    ..Task::default()
                },
            )?;

            upsert_page(conn, &page(PAGE_1, "Apply for a passport", "passport/apply"))?;
            upsert_page(conn, &page(PAGE_2, "Passport fees", "passport/fees"))?;
            upsert_page(conn, &page(PAGE_3, "Passport photos", "passport/photos"))?;
            upsert_page(conn, &page(PAGE_OUTSIDE, "Weather", "weather"))?;

            link_project_task(conn, PROJECT_ID, TASK_A)?;
            link_project_task(conn, PROJECT_ID, TASK_B)?;
            link_task_page(conn, TASK_A, PAGE_1)?;
            link_task_page(conn, TASK_A, PAGE_2)?;
            link_task_page(conn, TASK_B, PAGE_2)?;
            link_project_page(conn, PROJECT_ID, PAGE_3)?;
            link_task_tpc_id(conn, TASK_A, TPC_A)?;

            // UX tests: the two latest share a date and average 0.85.
            upsert_ux_test(
                conn,
                &ux_test("ux-1", PROJECT_ID, "Complete", "2024-01-10", Some(0.6), false, &[TASK_A, TASK_B]),
            )?;
            upsert_ux_test(
                conn,
                &ux_test("ux-2", PROJECT_ID, "In Progress", "2024-02-15", Some(0.8), true, &[TASK_A]),
            )?;
            upsert_ux_test(
                conn,
                &ux_test("ux-3", PROJECT_ID, "In Progress", "2024-02-15", Some(0.9), false, &[TASK_A]),
            )?;
            upsert_ux_test(
                conn,
                &ux_test("ux-ben", PROJECT_BENEFITS, "Complete", "2024-02-01", Some(0.7), true, &[]),
            )?;
            upsert_ux_test(
                conn,
                &ux_test("ux-arc", PROJECT_ARCHIVE, "Complete", "2022-05-01", Some(0.5), false, &[]),
            )?;
            upsert_ux_test(
                conn,
                &ux_test("ux-del-1", PROJECT_DELAYED, "Delayed", "2024-01-05", None, false, &[]),
            )?;
            upsert_ux_test(
                conn,
                &ux_test("ux-del-2", PROJECT_DELAYED, "Planning", "2024-03-01", None, false, &[]),
            )?;

            upsert_attachment(
                conn,
                &Attachment {
                    attachment_id: "att-1".into(),
                    project_id: PROJECT_ID.into(),
                    filename: "findings.pdf".into(),
                    storage_url: Some("https://files.example/findings.pdf".into()),
                    size: Some(2048),
                },
            )?;

            // Page 1: 100 + 50 visits in March, 120 in February.
            upsert_page_metrics(
                conn,
                &PageMetricsRow {
                    dyf_submit: 6,
                    dyf_yes: 4,
                    dyf_no: 2,
                    fwylf_cant_find_info: 1,
                    fwylf_hard_to_understand: 1,
                    gsc_total_clicks: 40,
                    gsc_total_impressions: 400,
                    gsc_total_ctr: 0.1,
                    gsc_total_position: 3.0,
                    ..metrics(PAGE_1, "2024-03-04", 100)
                },
            )?;
            upsert_page_metrics(
                conn,
                &PageMetricsRow {
                    dyf_submit: 2,
                    dyf_yes: 1,
                    dyf_no: 1,
                    fwylf_other: 1,
                    gsc_total_clicks: 10,
                    gsc_total_impressions: 200,
                    gsc_total_ctr: 0.05,
                    gsc_total_position: 5.0,
                    ..metrics(PAGE_1, "2024-03-20", 50)
                },
            )?;
            upsert_page_metrics(
                conn,
                &PageMetricsRow {
                    dyf_submit: 3,
                    dyf_yes: 3,
                    gsc_total_clicks: 30,
                    gsc_total_impressions: 300,
                    gsc_total_ctr: 0.1,
                    gsc_total_position: 4.0,
                    ..metrics(PAGE_1, "2024-02-10", 120)
                },
            )?;
            upsert_page_metrics(
                conn,
                &PageMetricsRow {
                    gsc_total_clicks: 5,
                    gsc_total_impressions: 100,
                    gsc_total_ctr: 0.05,
                    gsc_total_position: 7.0,
                    ..metrics(PAGE_2, "2024-03-05", 30)
                },
            )?;
            upsert_page_metrics(conn, &metrics(PAGE_OUTSIDE, "2024-03-04", 1000))?;

            // Search terms: "taxes" ranks first in March but only has 3
            // clicks in February, below ten other terms.
            upsert_search_term(conn, PAGE_1, "2024-03-04", "Taxes", 10, 2.0)?;
            upsert_search_term(conn, PAGE_1, "2024-03-04", "Passport Fees", 6, 3.0)?;
            upsert_search_term(conn, PAGE_2, "2024-03-05", "passport fees", 2, 4.0)?;
            upsert_search_term(conn, PAGE_OUTSIDE, "2024-03-04", "taxes", 500, 1.0)?;
            upsert_search_term(conn, PAGE_1, "2024-02-10", "taxes", 3, 2.5)?;
            for i in 0..10 {
                upsert_search_term(conn, PAGE_1, "2024-02-10", &format!("term-{i:02}"), 5, 6.0)?;
            }

            // Call drivers
            insert_calldriver(conn, "2024-03-04", "Passport", Some("Fees"), TPC_A, 7)?;
            insert_calldriver(conn, "2024-03-04", "Passport", Some("Photos"), TPC_A, 3)?;
            insert_calldriver(conn, "2024-03-10", "Citizenship", Some("Fees"), TPC_A, 5)?;
            insert_calldriver(conn, "2024-02-10", "Passport", Some("Fees"), TPC_A, 4)?;
            insert_calldriver(conn, "2024-02-12", "Benefits", Some("Status"), TPC_A, 6)?;
            insert_calldriver(conn, "2024-03-04", "Other", Some("Fees"), TPC_OUTSIDE, 100)?;

            // Feedback
            upsert_feedback(
                conn,
                &feedback("fb-1", "2024-03-04", PAGE_1, "en", "I can't find the renewal fee anywhere"),
            )?;
            upsert_feedback(
                conn,
                &feedback("fb-2", "2024-03-06", PAGE_1, "en", "The renewal fee page is confusing"),
            )?;
            upsert_feedback(
                conn,
                &feedback("fb-3", "2024-03-05", PAGE_2, "fr", "Les frais de renouvellement ne sont pas clairs"),
            )?;
            upsert_feedback(
                conn,
                &feedback("fb-4", "2024-02-15", PAGE_3, "en", "Photo requirements are unclear"),
            )?;
            upsert_feedback(
                conn,
                &feedback("fb-5", "2024-03-04", PAGE_OUTSIDE, "en", "Weather page is great"),
            )?;

            Ok::<(), rusqlite::Error>(())
        })
        .await
        .unwrap();
}
