//! Typed view over the `app_config` table.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::repository;
use crate::storage::Database;

pub const SEARCH_TERMS_LIMIT: &str = "search_terms_limit";
pub const RECENT_COMPLETION_MONTHS: &str = "recent_completion_months";
pub const RELEVANT_WORDS_LIMIT: &str = "relevant_words_limit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// How many search terms the top-N query keeps.
    pub search_terms_limit: usize,
    /// Window for "completed recently" on the home summary.
    pub recent_completion_months: u32,
    /// How many words per language are kept and used to score comments.
    pub relevant_words_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_terms_limit: 10,
            recent_completion_months: 6,
            relevant_words_limit: 10,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults for absent keys.
    pub async fn load(db: &Database) -> Result<Self> {
        let entries = db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await?;
        let mut settings = Self::default();
        for (key, value) in entries {
            settings.apply(&key, &value)?;
        }
        Ok(settings)
    }

    /// Set one field from its stored string form.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || Error::Config(format!("invalid value for {key}: {value:?}"));
        match key {
            SEARCH_TERMS_LIMIT => {
                self.search_terms_limit = value.parse().map_err(|_| invalid())?;
            }
            RECENT_COMPLETION_MONTHS => {
                self.recent_completion_months = value.parse().map_err(|_| invalid())?;
            }
            RELEVANT_WORDS_LIMIT => {
                self.relevant_words_limit = value.parse().map_err(|_| invalid())?;
            }
            other => {
                log::debug!("ignoring unrelated config key {other}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_defaults() {
        let db = Database::open_memory().await.unwrap();
        let settings = Settings::load(&db).await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn test_load_overrides() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                repository::set_config(conn, SEARCH_TERMS_LIMIT, "3")?;
                repository::set_config(conn, RELEVANT_WORDS_LIMIT, "3")?;
                repository::set_config(conn, "theme", "dark")?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        let settings = Settings::load(&db).await.unwrap();
        assert_eq!(settings.search_terms_limit, 3);
        assert_eq!(settings.relevant_words_limit, 3);
        assert_eq!(settings.recent_completion_months, 6);
    }

    #[test]
    fn test_apply_rejects_garbage() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.apply(SEARCH_TERMS_LIMIT, "ten"),
            Err(Error::Config(_))
        ));
        assert!(settings.apply(RELEVANT_WORDS_LIMIT, "-1").is_err());
        assert_eq!(settings, Settings::default());
    }
}
