//! Entity graph traversal: entity -> tasks -> pages, entity -> UX tests.
//!
//! Everything an aggregation needs to know about "which rows belong to this
//! entity" is resolved here once per request, inside a single reader call.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Attachment, EntityKind, Page, Project, Ref, Task, UxTest};
use crate::storage::repository;
use crate::storage::Database;

/// Ids that bound every fact query for one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub task_ids: Vec<String>,
    pub page_ids: Vec<String>,
    pub tpc_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Project(Project),
    Task(Task),
    Page(Page),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Project(_) => EntityKind::Project,
            Entity::Task(_) => EntityKind::Task,
            Entity::Page(_) => EntityKind::Page,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Entity::Project(p) => &p.title,
            Entity::Task(t) => &t.title,
            Entity::Page(p) => &p.title,
        }
    }
}

/// An entity with its relations loaded.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub entity: Entity,
    pub scope: Scope,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    /// Linked UX tests with their task refs resolved.
    pub ux_tests: Vec<UxTest>,
    pub attachments: Vec<Attachment>,
}

/// Load an entity and its scope. `Ok(None)` when the id is unknown.
pub async fn resolve(db: &Database, kind: EntityKind, id: &str) -> Result<Option<Resolved>> {
    let id = id.to_string();
    let resolved = db
        .reader()
        .call(move |conn| resolve_sync(conn, kind, &id))
        .await?;
    Ok(resolved)
}

fn resolve_sync(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
) -> std::result::Result<Option<Resolved>, rusqlite::Error> {
    let (entity, tasks, projects, project_id) = match kind {
        EntityKind::Project => {
            let Some(project) = repository::get_project(conn, id)? else {
                return Ok(None);
            };
            let tasks = repository::tasks_for_project(conn, id)?;
            (Entity::Project(project), tasks, Vec::new(), Some(id))
        }
        EntityKind::Task => {
            let Some(task) = repository::get_task(conn, id)? else {
                return Ok(None);
            };
            let projects = repository::projects_for_task(conn, id)?;
            (Entity::Task(task.clone()), vec![task], projects, None)
        }
        EntityKind::Page => {
            let Some(page) = repository::get_page(conn, id)? else {
                return Ok(None);
            };
            let tasks = repository::tasks_for_page(conn, id)?;
            let projects = repository::projects_for_page(conn, id)?;
            (Entity::Page(page), tasks, projects, None)
        }
    };

    let mut task_ids: Vec<String> = tasks.iter().map(|t| t.task_id.clone()).collect();
    task_ids.sort();

    let page_ids = match kind {
        EntityKind::Page => vec![id.to_string()],
        _ => repository::page_ids_for_scope(conn, &task_ids, project_id)?,
    };
    let tpc_ids = repository::tpc_ids_for_tasks(conn, &task_ids)?;

    let (mut ux_tests, attachments) = match kind {
        EntityKind::Project => (
            repository::ux_tests_for_project(conn, id)?,
            repository::attachments_for_project(conn, id)?,
        ),
        _ => (repository::ux_tests_for_tasks(conn, &task_ids)?, Vec::new()),
    };
    resolve_test_tasks(conn, &mut ux_tests, &tasks)?;

    log::debug!(
        "resolved {kind} {id}: {} tasks, {} pages, {} topic ids, {} ux tests",
        task_ids.len(),
        page_ids.len(),
        tpc_ids.len(),
        ux_tests.len()
    );

    Ok(Some(Resolved {
        entity,
        scope: Scope {
            task_ids,
            page_ids,
            tpc_ids,
        },
        tasks,
        projects,
        ux_tests,
        attachments,
    }))
}

/// Replace `Ref::Unresolved` task ids with the loaded task, reusing the ones
/// already in scope. Dangling ids stay unresolved.
fn resolve_test_tasks(
    conn: &Connection,
    tests: &mut [UxTest],
    known: &[Task],
) -> std::result::Result<(), rusqlite::Error> {
    let mut cache: HashMap<String, Option<Task>> = known
        .iter()
        .map(|t| (t.task_id.clone(), Some(t.clone())))
        .collect();

    for test in tests.iter_mut() {
        for task_ref in test.tasks.iter_mut() {
            let Ref::Unresolved(task_id) = task_ref else {
                continue;
            };
            if !cache.contains_key(task_id.as_str()) {
                let loaded = repository::get_task(conn, task_id)?;
                cache.insert(task_id.clone(), loaded);
            }
            if let Some(Some(task)) = cache.get(task_id.as_str()) {
                *task_ref = Ref::Resolved(task.clone());
            }
        }
    }
    Ok(())
}
