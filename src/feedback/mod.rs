//! Free-text feedback attached to the pages of an entity.

pub mod relevance;

use std::cmp::Ordering;
use std::collections::HashMap;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::change::{compare_by_key, CompareOptions, Compared, Field};
use crate::error::Result;
use crate::graph::Scope;
use crate::range::DateRange;
use crate::storage::repository::{id_values, placeholders};
use crate::storage::Database;

pub use relevance::WordScore;
use relevance::TermStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageComments {
    pub page_id: String,
    pub title: String,
    pub url: String,
    pub sum: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyComments {
    pub date: String,
    pub sum: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedComment {
    pub feedback_id: String,
    pub date: String,
    pub url: String,
    pub comment: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageRelevance {
    /// Every comment of the language, most relevant first.
    pub comments: Vec<RankedComment>,
    pub words: Vec<WordScore>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevantCommentsAndWords {
    pub en: LanguageRelevance,
    pub fr: LanguageRelevance,
}

impl RelevantCommentsAndWords {
    pub fn num_comments(&self) -> usize {
        self.en.comments.len() + self.fr.comments.len()
    }
}

const SUM: &[Field<PageComments>] = &[("sum", |p| p.sum as f64)];

fn scoped_values(page_ids: &[String], start: &str, end: &str) -> Vec<Value> {
    let mut values = id_values(page_ids);
    values.push(Value::Text(start.to_string()));
    values.push(Value::Text(end.to_string()));
    values
}

fn comments_by_page_sql(
    conn: &Connection,
    page_ids: &[String],
    start: &str,
    end: &str,
) -> std::result::Result<Vec<PageComments>, rusqlite::Error> {
    let sql = format!(
        "SELECT f.page_id, COALESCE(p.title, ''), COALESCE(p.url, MIN(f.url)), COUNT(*)
         FROM fact_feedback f
         LEFT JOIN dim_pages p ON p.page_id = f.page_id
         WHERE f.page_id IN ({})
           AND f.date_key >= ? AND f.date_key <= ?
         GROUP BY f.page_id
         ORDER BY f.page_id",
        placeholders(page_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(scoped_values(page_ids, start, end)), |row| {
        Ok(PageComments {
            page_id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            sum: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Comment count per page for `range`, compared with `comparison`. Pages
/// that only had comments in the comparison range are kept with a zero sum.
/// Sorted by sum, highest first.
pub async fn comments_by_page(
    db: &Database,
    scope: &Scope,
    range: &DateRange,
    comparison: &DateRange,
) -> Result<Vec<Compared<PageComments>>> {
    let (start, end) = range.keys();
    let (prev_start, prev_end) = comparison.keys();
    let page_ids = scope.page_ids.clone();

    let (current, previous) = db
        .reader()
        .call(move |conn| {
            let current = comments_by_page_sql(conn, &page_ids, &start, &end)?;
            let previous = comments_by_page_sql(conn, &page_ids, &prev_start, &prev_end)?;
            Ok::<_, rusqlite::Error>((current, previous))
        })
        .await?;

    let mut merged = compare_by_key(
        current,
        &previous,
        |p| p.page_id.clone(),
        SUM,
        &CompareOptions {
            hold_at_zero: true,
            ..CompareOptions::default()
        },
        |p| PageComments { sum: 0, ..p.clone() },
    );
    merged.sort_by(|a, b| {
        b.current
            .sum
            .cmp(&a.current.sum)
            .then_with(|| a.current.title.cmp(&b.current.title))
    });
    Ok(merged)
}

pub async fn comments_by_day(
    db: &Database,
    scope: &Scope,
    range: &DateRange,
) -> Result<Vec<DailyComments>> {
    let (start, end) = range.keys();
    let sql = format!(
        "SELECT f.date_key, COUNT(*) FROM fact_feedback f
         WHERE f.page_id IN ({})
           AND f.date_key >= ? AND f.date_key <= ?
         GROUP BY f.date_key
         ORDER BY f.date_key",
        placeholders(scope.page_ids.len())
    );
    let values = scoped_values(&scope.page_ids, &start, &end);

    let days = db
        .reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), |row| {
                Ok(DailyComments {
                    date: row.get(0)?,
                    sum: row.get(1)?,
                })
            })?;
            rows.collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        })
        .await?;
    Ok(days)
}

pub async fn count_comments(db: &Database, scope: &Scope, range: &DateRange) -> Result<i64> {
    let (start, end) = range.keys();
    let sql = format!(
        "SELECT COUNT(*) FROM fact_feedback f
         WHERE f.page_id IN ({})
           AND f.date_key >= ? AND f.date_key <= ?",
        placeholders(scope.page_ids.len())
    );
    let values = scoped_values(&scope.page_ids, &start, &end);

    let count = db
        .reader()
        .call(move |conn| {
            conn.query_row(&sql, params_from_iter(values), |row| row.get::<_, i64>(0))
        })
        .await?;
    Ok(count)
}

/// Comments are grouped as French or English by their `lang` column.
const LANG_GROUP_SQL: &str = "CASE WHEN lower(f.lang) = 'fr' THEN 'fr' ELSE 'en' END";

fn scoped_comments_sql(
    conn: &Connection,
    page_ids: &[String],
    start: &str,
    end: &str,
) -> std::result::Result<Vec<(RankedComment, String)>, rusqlite::Error> {
    let sql = format!(
        "SELECT f.feedback_id, f.date_key, f.url, f.comment, {LANG_GROUP_SQL}
         FROM fact_feedback f
         WHERE f.page_id IN ({})
           AND f.date_key >= ? AND f.date_key <= ?
         ORDER BY f.date_key, f.feedback_id",
        placeholders(page_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(scoped_values(page_ids, start, end)), |row| {
        Ok((
            RankedComment {
                feedback_id: row.get(0)?,
                date: row.get(1)?,
                url: row.get(2)?,
                comment: row.get(3)?,
                score: 0.0,
            },
            row.get::<_, String>(4)?,
        ))
    })?;
    rows.collect()
}

/// Term frequencies per language group, read from the `feedback_vocab`
/// instance table restricted to the scoped comments.
fn scoped_term_stats_sql(
    conn: &Connection,
    page_ids: &[String],
    start: &str,
    end: &str,
) -> std::result::Result<HashMap<String, Vec<TermStats>>, rusqlite::Error> {
    let sql = format!(
        "SELECT {LANG_GROUP_SQL} AS lang_group, v.term, COUNT(*), COUNT(DISTINCT v.doc)
         FROM feedback_vocab v
         JOIN fact_feedback f ON f.id = v.doc
         WHERE f.page_id IN ({})
           AND f.date_key >= ? AND f.date_key <= ?
         GROUP BY lang_group, v.term",
        placeholders(page_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(scoped_values(page_ids, start, end)), |row| {
        Ok((
            row.get::<_, String>(0)?,
            TermStats {
                term: row.get(1)?,
                occurrences: row.get(2)?,
                documents: row.get(3)?,
            },
        ))
    })?;
    let mut by_lang: HashMap<String, Vec<TermStats>> = HashMap::new();
    for row in rows {
        let (lang, stats) = row?;
        by_lang.entry(lang).or_default().push(stats);
    }
    Ok(by_lang)
}

/// `bm25()` relevance of the scoped comments of `lang` matching `query`,
/// negated so that higher is more relevant.
fn bm25_scores_sql(
    conn: &Connection,
    query: &str,
    page_ids: &[String],
    start: &str,
    end: &str,
    lang: &str,
) -> std::result::Result<HashMap<String, f64>, rusqlite::Error> {
    let sql = format!(
        "SELECT f.feedback_id, bm25(feedback_fts)
         FROM feedback_fts
         JOIN fact_feedback f ON f.id = feedback_fts.rowid
         WHERE feedback_fts MATCH ?
           AND f.page_id IN ({})
           AND f.date_key >= ? AND f.date_key <= ?
           AND {LANG_GROUP_SQL} = ?",
        placeholders(page_ids.len())
    );
    let mut values = vec![Value::Text(query.to_string())];
    values.extend(scoped_values(page_ids, start, end));
    values.push(Value::Text(lang.to_string()));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok((row.get::<_, String>(0)?, -row.get::<_, f64>(1)?))
    })?;
    rows.collect()
}

fn rank_language(
    conn: &Connection,
    mut comments: Vec<RankedComment>,
    stats: Vec<TermStats>,
    lang: &str,
    scope: (&[String], &str, &str),
    words_limit: usize,
) -> std::result::Result<LanguageRelevance, rusqlite::Error> {
    let (page_ids, start, end) = scope;
    let words = relevance::top_words(stats, comments.len(), words_limit);
    if let Some(query) = relevance::match_query(&words) {
        let scores = bm25_scores_sql(conn, &query, page_ids, start, end, lang)?;
        for comment in &mut comments {
            comment.score = scores.get(&comment.feedback_id).copied().unwrap_or(0.0);
        }
    }
    comments.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => b
            .date
            .cmp(&a.date)
            .then_with(|| a.feedback_id.cmp(&b.feedback_id)),
        other => other,
    });
    Ok(LanguageRelevance { comments, words })
}

/// Rank every comment of the range per language and extract the most
/// significant words.
///
/// Words come from the full-text index vocabulary of the scoped comments;
/// each comment is then scored with `bm25()` against those words. Comments
/// matching none of them score zero.
pub async fn most_relevant_comments_and_words(
    db: &Database,
    scope: &Scope,
    range: &DateRange,
    words_limit: usize,
) -> Result<RelevantCommentsAndWords> {
    let (start, end) = range.keys();
    let page_ids = scope.page_ids.clone();

    let relevant = db
        .reader()
        .call(move |conn| {
            let comments = scoped_comments_sql(conn, &page_ids, &start, &end)?;
            let mut stats = scoped_term_stats_sql(conn, &page_ids, &start, &end)?;

            let (fr, en): (Vec<_>, Vec<_>) =
                comments.into_iter().partition(|(_, lang)| lang == "fr");
            let strip = |v: Vec<(RankedComment, String)>| -> Vec<RankedComment> {
                v.into_iter().map(|(c, _)| c).collect()
            };
            let scope = (page_ids.as_slice(), start.as_str(), end.as_str());

            Ok::<_, rusqlite::Error>(RelevantCommentsAndWords {
                en: rank_language(
                    conn,
                    strip(en),
                    stats.remove("en").unwrap_or_default(),
                    "en",
                    scope,
                    words_limit,
                )?,
                fr: rank_language(
                    conn,
                    strip(fr),
                    stats.remove("fr").unwrap_or_default(),
                    "fr",
                    scope,
                    words_limit,
                )?,
            })
        })
        .await?;
    Ok(relevant)
}
