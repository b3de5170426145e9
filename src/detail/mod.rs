//! Entity-level comparative summaries.

pub mod home;
pub mod types;

pub use home::{home_summary_as_of, tasks_home, HomeProject, HomeSummary, TaskVisits, TasksHome};
pub use types::{EntityDetail, EntityInfo};
pub use ux_tests::{LatestTestData, UxTestRow};

use std::future::Future;
use std::time::Instant;

use crate::change::{compare_by_key, percent_change, CompareOptions, Field};
use crate::error::Result;
use crate::feedback;
use crate::graph::{self, Entity, Resolved};
use crate::metrics::{self, EnquiryCalls, TopicCalls};
use crate::model::{Attachment, EntityKind, Project, Task, UxTest};
use crate::range::RangePair;
use crate::settings::Settings;
use crate::storage::Database;

const TOPIC_CALLS: &[Field<TopicCalls>] = &[("calls", |t| t.calls as f64)];
const ENQUIRY_CALLS: &[Field<EnquiryCalls>] = &[("calls", |e| e.calls as f64)];

/// Await `fut` and log how long it took.
async fn timed<T>(label: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let started = Instant::now();
    let out = fut.await;
    log::debug!("{label} took {:?}", started.elapsed());
    out
}

/// Build the detail of one entity. `Ok(None)` when the id is unknown.
pub async fn compute_entity_detail(
    db: &Database,
    settings: &Settings,
    kind: EntityKind,
    id: &str,
    ranges: &RangePair,
) -> Result<Option<EntityDetail>> {
    let started = Instant::now();
    let Some(resolved) = timed("scope", graph::resolve(db, kind, id)).await? else {
        log::debug!("{kind} {id} not found");
        return Ok(None);
    };
    let scope = &resolved.scope;
    let by_tasks = kind != EntityKind::Task;

    let (
        current,
        previous,
        search_terms,
        feedback_by_page,
        feedback_by_day,
        relevant,
        comparison_comments,
    ) = tokio::try_join!(
        timed(
            "primary rollup",
            metrics::compute_range_metrics(db, scope, &ranges.primary, by_tasks)
        ),
        timed(
            "comparison rollup",
            metrics::compute_range_metrics(db, scope, &ranges.comparison, by_tasks)
        ),
        timed(
            "search terms",
            metrics::top_search_terms(
                db,
                scope,
                &ranges.primary,
                &ranges.comparison,
                settings.search_terms_limit
            )
        ),
        timed(
            "feedback by page",
            feedback::comments_by_page(db, scope, &ranges.primary, &ranges.comparison)
        ),
        timed(
            "feedback by day",
            feedback::comments_by_day(db, scope, &ranges.primary)
        ),
        timed(
            "relevant comments",
            feedback::most_relevant_comments_and_words(
                db,
                scope,
                &ranges.primary,
                settings.relevant_words_limit
            )
        ),
        timed(
            "comparison comments",
            feedback::count_comments(db, scope, &ranges.comparison)
        ),
    )?;

    let hold = CompareOptions {
        hold_at_zero: true,
        ..CompareOptions::default()
    };
    let calls_by_topic = compare_by_key(
        current.calldrivers.calls_by_topic.clone(),
        &previous.calldrivers.calls_by_topic,
        |t| t.topic.clone(),
        TOPIC_CALLS,
        &hold,
        |t| TopicCalls {
            topic: t.topic.clone(),
            calls: 0,
        },
    );
    let calldrivers_enquiry = compare_by_key(
        current.calldrivers.calldrivers_enquiry.clone(),
        &previous.calldrivers.calldrivers_enquiry,
        |e| e.enquiry_line.clone(),
        ENQUIRY_CALLS,
        &hold,
        |e| EnquiryCalls {
            enquiry_line: e.enquiry_line.clone(),
            calls: 0,
        },
    );

    let num_comments = relevant.num_comments() as i64;
    let num_comments_percent_change =
        percent_change(num_comments as f64, comparison_comments as f64);

    let latest = ux_tests::latest_test_data(&resolved.ux_tests);
    let totals_change = types::totals_change(&current, &previous);

    let Resolved {
        entity,
        tasks,
        projects,
        ux_tests: tests,
        attachments,
        ..
    } = resolved;

    let detail = EntityDetail {
        kind,
        id: id.to_string(),
        title: entity.title().to_string(),
        date_range: ranges.primary_token.clone(),
        comparison_date_range: ranges.comparison_token.clone(),
        date_range_data: current,
        comparison_date_range_data: previous,
        totals_change,
        status: ux_tests::composite_status(&tests),
        cops: ux_tests::any_cops(&tests),
        avg_task_success_from_last_test: latest.avg_test_success,
        avg_success_value_change: latest.value_change,
        avg_success_percent_change: latest.percent_change,
        date_from_last_test: ux_tests::date_from_last_test(&tests),
        task_success_by_ux_test: tests.iter().map(UxTestRow::from).collect(),
        search_terms,
        feedback_by_page,
        feedback_by_day,
        most_relevant_comments_and_words: relevant,
        num_comments,
        num_comments_percent_change,
        calls_by_topic,
        calldrivers_enquiry,
        info: entity_info(entity, &tests, tasks, projects, attachments),
    };

    log::debug!(
        "{kind} {id} detail for {} vs {} built in {:?}",
        ranges.primary_token,
        ranges.comparison_token,
        started.elapsed()
    );
    Ok(Some(detail))
}

fn entity_info(
    entity: Entity,
    tests: &[UxTest],
    tasks: Vec<Task>,
    projects: Vec<Project>,
    attachments: Vec<Attachment>,
) -> EntityInfo {
    match entity {
        // Dates and lead come from the first test that has them.
        Entity::Project(project) => EntityInfo {
            description: project.description,
            start_date: tests.iter().find_map(|t| t.start_date.clone()),
            launch_date: tests.iter().find_map(|t| t.launch_date.clone()),
            members: tests.iter().find_map(|t| t.project_lead.clone()),
            tasks,
            attachments: attachments
                .into_iter()
                .map(|a| Attachment {
                    storage_url: a.display_url(),
                    ..a
                })
                .collect(),
            ..EntityInfo::default()
        },
        Entity::Task(task) => EntityInfo {
            group: task.group,
            topic: task.topic,
            subtopic: task.subtopic,
            projects,
            ..EntityInfo::default()
        },
        Entity::Page(page) => EntityInfo {
            url: Some(page.url),
            tasks,
            projects,
            ..EntityInfo::default()
        },
    }
}
