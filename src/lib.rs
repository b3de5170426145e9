pub mod cache;
pub mod change;
pub mod date_util;
pub mod detail;
pub mod error;
pub mod feedback;
pub mod graph;
pub mod metrics;
pub mod model;
pub mod range;
pub mod settings;
pub mod status;
pub mod storage;

pub use cache::{Cache, MemoryCache, NoopCache};
pub use change::{percent_change, Compared, PercentChange};
pub use detail::{EntityDetail, HomeSummary, TasksHome};
pub use error::{Error, Result};
pub use model::EntityKind;
pub use range::{DateRange, Period, RangePair};
pub use settings::Settings;
pub use status::{reduce_status, ProjectStatus};
pub use storage::Database;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use storage::repository;

/// Main entry point: the warehouse plus the result cache in front of it.
pub struct Dashboard {
    db: Database,
    cache: Arc<dyn Cache>,
}

impl Dashboard {
    /// A dashboard with a process-wide in-memory cache.
    pub fn new(db: Database) -> Self {
        Self::with_cache(db, Arc::new(MemoryCache::new()))
    }

    pub fn with_cache(db: Database, cache: Arc<dyn Cache>) -> Self {
        Self { db, cache }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub async fn settings(&self) -> Result<Settings> {
        Settings::load(&self.db).await
    }

    // ── Entity details ─────────────────────────────────────────────

    /// Comparative detail of one entity.
    ///
    /// A missing id fails before the range tokens are looked at. An unknown
    /// id returns `Ok(None)` and is not cached.
    pub async fn entity_detail(
        &self,
        kind: EntityKind,
        id: Option<&str>,
        range: &str,
        comparison: &str,
    ) -> Result<Option<EntityDetail>> {
        let id = match id.map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => return Err(Error::MissingIdentifier(format!("no {kind} id provided"))),
        };
        let ranges = RangePair::parse(range, comparison)?;

        let key = cache::detail_key(kind, id, &ranges.primary_token, &ranges.comparison_token);
        if let Some(hit) = cache::get_json::<EntityDetail>(self.cache.as_ref(), &key)? {
            log::debug!("cache hit {key}");
            return Ok(Some(hit));
        }
        log::debug!("cache miss {key}");

        let settings = self.settings().await?;
        let detail = detail::compute_entity_detail(&self.db, &settings, kind, id, &ranges).await?;
        if let Some(ref d) = detail {
            cache::set_json(self.cache.as_ref(), &key, d)?;
        }
        Ok(detail)
    }

    pub async fn project_detail(
        &self,
        id: Option<&str>,
        range: &str,
        comparison: &str,
    ) -> Result<Option<EntityDetail>> {
        self.entity_detail(EntityKind::Project, id, range, comparison)
            .await
    }

    pub async fn task_detail(
        &self,
        id: Option<&str>,
        range: &str,
        comparison: &str,
    ) -> Result<Option<EntityDetail>> {
        self.entity_detail(EntityKind::Task, id, range, comparison)
            .await
    }

    pub async fn page_detail(
        &self,
        id: Option<&str>,
        range: &str,
        comparison: &str,
    ) -> Result<Option<EntityDetail>> {
        self.entity_detail(EntityKind::Page, id, range, comparison)
            .await
    }

    // ── Home summaries ─────────────────────────────────────────────

    /// Project counts by status as of today.
    pub async fn home_summary(&self) -> Result<HomeSummary> {
        self.home_summary_as_of(Utc::now().date_naive()).await
    }

    pub async fn home_summary_as_of(&self, as_of: NaiveDate) -> Result<HomeSummary> {
        if let Some(hit) = cache::get_json(self.cache.as_ref(), cache::PROJECTS_HOME_KEY)? {
            log::debug!("cache hit {}", cache::PROJECTS_HOME_KEY);
            return Ok(hit);
        }
        let settings = self.settings().await?;
        let summary =
            detail::home_summary_as_of(&self.db, as_of, settings.recent_completion_months)
                .await?;
        cache::set_json(self.cache.as_ref(), cache::PROJECTS_HOME_KEY, &summary)?;
        Ok(summary)
    }

    pub async fn tasks_home(&self, range: &str) -> Result<TasksHome> {
        let date_range = DateRange::parse(range)?;
        let key = cache::tasks_home_key(range);
        if let Some(hit) = cache::get_json(self.cache.as_ref(), &key)? {
            log::debug!("cache hit {key}");
            return Ok(hit);
        }
        let mut home = detail::tasks_home(&self.db, &date_range).await?;
        home.date_range = range.to_string();
        cache::set_json(self.cache.as_ref(), &key, &home)?;
        Ok(home)
    }

    // ── Config ─────────────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        let value = self
            .db
            .reader()
            .call(move |conn| repository::get_config(conn, &key))
            .await?;
        Ok(value)
    }

    /// Store a setting. Values for known keys are validated first.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        Settings::default().apply(key, value)?;
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .writer()
            .call(move |conn| repository::set_config(conn, &key, &value))
            .await?;
        Ok(())
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        let items = self
            .db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures;
    use crate::storage::repository::PageMetricsRow;

    async fn dashboard(cache: Arc<dyn Cache>) -> Dashboard {
        let db = Database::open_memory().await.unwrap();
        fixtures::seed_catalog(&db).await;
        Dashboard::with_cache(db, cache)
    }

    async fn bump_page_1(dw: &Dashboard) {
        dw.db()
            .writer()
            .call(|conn| {
                repository::upsert_page_metrics(
                    conn,
                    &PageMetricsRow {
                        page_id: fixtures::PAGE_1.into(),
                        date: "2024-03-21".into(),
                        url: "www.canada.ca/page-1".into(),
                        visits: 1000,
                        ..PageMetricsRow::default()
                    },
                )
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_noop_cache_recomputes_identically() {
        let dw = dashboard(Arc::new(NoopCache)).await;
        let first = dw
            .project_detail(Some(fixtures::PROJECT_ID), fixtures::PRIMARY, fixtures::COMPARISON)
            .await
            .unwrap()
            .unwrap();
        let second = dw
            .project_detail(Some(fixtures::PROJECT_ID), fixtures::PRIMARY, fixtures::COMPARISON)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_memory_cache_serves_stale_detail() {
        let cache = Arc::new(MemoryCache::new());
        let dw = dashboard(cache.clone()).await;

        let first = dw
            .page_detail(Some(fixtures::PAGE_1), fixtures::PRIMARY, fixtures::COMPARISON)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.date_range_data.totals.visits, 150);
        assert_eq!(cache.len(), 1);

        bump_page_1(&dw).await;

        let second = dw
            .page_detail(Some(fixtures::PAGE_1), fixtures::PRIMARY, fixtures::COMPARISON)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.date_range_data.totals.visits, 150);
        assert_eq!(second.num_comments, first.num_comments);

        // Any other token spelling is a different entry.
        let fresh = dw
            .page_detail(
                Some(fixtures::PAGE_1),
                "2024-03-01T00:00:00Z/2024-03-31",
                fixtures::COMPARISON,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.date_range_data.totals.visits, 1150);
        assert_eq!(fresh.date_range, "2024-03-01T00:00:00Z/2024-03-31");
    }

    #[tokio::test]
    async fn test_missing_id_checked_before_ranges() {
        let dw = dashboard(Arc::new(NoopCache)).await;
        for id in [None, Some(""), Some("  ")] {
            assert!(matches!(
                dw.project_detail(id, "garbage", "garbage").await,
                Err(Error::MissingIdentifier(_))
            ));
        }
        assert!(matches!(
            dw.project_detail(Some(fixtures::PROJECT_ID), "garbage", fixtures::COMPARISON)
                .await,
            Err(Error::MalformedRange(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_entity_is_not_cached() {
        let cache = Arc::new(MemoryCache::new());
        let dw = dashboard(cache.clone()).await;
        let detail = dw
            .task_detail(Some("missing"), fixtures::PRIMARY, fixtures::COMPARISON)
            .await
            .unwrap();
        assert!(detail.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_home_summary_is_cached() {
        let cache = Arc::new(MemoryCache::new());
        let dw = dashboard(cache.clone()).await;
        let as_of = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();

        let home = dw.home_summary_as_of(as_of).await.unwrap();
        assert_eq!(home.num_completed_recently, 1);
        assert!(cache.get(cache::PROJECTS_HOME_KEY).is_some());

        dw.config_set(settings::RECENT_COMPLETION_MONTHS, "36")
            .await
            .unwrap();
        let again = dw.home_summary_as_of(as_of).await.unwrap();
        assert_eq!(again.num_completed_recently, 1);
    }

    #[tokio::test]
    async fn test_recent_months_setting_applies() {
        let dw = dashboard(Arc::new(NoopCache)).await;
        dw.config_set(settings::RECENT_COMPLETION_MONTHS, "36")
            .await
            .unwrap();
        let home = dw
            .home_summary_as_of(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(home.num_completed_recently, 2);
    }

    #[tokio::test]
    async fn test_tasks_home_keeps_token() {
        let dw = dashboard(Arc::new(MemoryCache::new())).await;
        let token = "2024-03-01T00:00:00Z/2024-03-31T23:59:59Z";
        let home = dw.tasks_home(token).await.unwrap();
        assert_eq!(home.date_range, token);
        assert_eq!(home.total_visits, 180);
    }

    #[tokio::test]
    async fn test_config_set_validates_known_keys() {
        let dw = dashboard(Arc::new(NoopCache)).await;
        assert!(matches!(
            dw.config_set(settings::SEARCH_TERMS_LIMIT, "many").await,
            Err(Error::Config(_))
        ));
        assert_eq!(dw.config_get(settings::SEARCH_TERMS_LIMIT).await.unwrap(), None);

        dw.config_set(settings::SEARCH_TERMS_LIMIT, "1").await.unwrap();
        dw.config_set("theme", "dark").await.unwrap();
        assert_eq!(dw.config_list().await.unwrap().len(), 2);
        assert_eq!(dw.settings().await.unwrap().search_terms_limit, 1);

        let detail = dw
            .project_detail(Some(fixtures::PROJECT_ID), fixtures::PRIMARY, fixtures::COMPARISON)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.search_terms.len(), 1);
    }
}
