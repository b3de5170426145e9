//! Top-N search terms with a symmetric comparison.
//!
//! The comparison range is queried for exactly the terms that made the
//! primary top-N, so a term that ranked lower in the comparison range still
//! gets a real previous value instead of a missing one.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::types::SearchTerm;
use crate::change::{compare_by_key, CompareOptions, Compared, Field};
use crate::date_util::round_to;
use crate::error::Result;
use crate::graph::Scope;
use crate::range::DateRange;
use crate::storage::repository::{id_values, placeholders};
use crate::storage::Database;

const CLICKS: &[Field<SearchTerm>] = &[("clicks", |t| t.clicks as f64)];

/// Query one range. `terms` restricts the result to those (lower-cased)
/// terms and disables the limit.
fn search_terms_sql(
    conn: &Connection,
    page_ids: &[String],
    start: &str,
    end: &str,
    terms: Option<&[String]>,
    limit: usize,
) -> std::result::Result<Vec<SearchTerm>, rusqlite::Error> {
    let mut values = id_values(page_ids);
    values.push(Value::Text(start.to_string()));
    values.push(Value::Text(end.to_string()));

    let term_filter = match terms {
        Some(terms) => {
            values.extend(id_values(terms));
            format!("AND LOWER(s.term) IN ({})", placeholders(terms.len()))
        }
        None => String::new(),
    };
    let limit_clause = match terms {
        Some(_) => String::new(),
        None => format!("LIMIT {limit}"),
    };

    let sql = format!(
        "SELECT LOWER(s.term) AS term, SUM(s.clicks) AS clicks, AVG(s.position)
         FROM fact_search_terms s
         WHERE s.page_id IN ({})
           AND s.date_key >= ? AND s.date_key <= ?
           {term_filter}
         GROUP BY LOWER(s.term)
         ORDER BY clicks DESC, term
         {limit_clause}",
        placeholders(page_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(SearchTerm {
            term: row.get(0)?,
            clicks: row.get(1)?,
            position: round_to(row.get::<_, Option<f64>>(2)?.unwrap_or(0.0), 2),
        })
    })?;
    rows.collect()
}

/// Primary top-`limit` terms by clicks, each with `clicksChange` against the
/// comparison range.
pub async fn top_search_terms(
    db: &Database,
    scope: &Scope,
    range: &DateRange,
    comparison: &DateRange,
    limit: usize,
) -> Result<Vec<Compared<SearchTerm>>> {
    let (start, end) = range.keys();
    let page_ids = scope.page_ids.clone();
    let current = db
        .reader()
        .call(move |conn| search_terms_sql(conn, &page_ids, &start, &end, None, limit))
        .await?;

    if current.is_empty() {
        return Ok(Vec::new());
    }

    let (prev_start, prev_end) = comparison.keys();
    let page_ids = scope.page_ids.clone();
    let terms: Vec<String> = current.iter().map(|t| t.term.clone()).collect();
    let previous = db
        .reader()
        .call(move |conn| {
            search_terms_sql(conn, &page_ids, &prev_start, &prev_end, Some(terms.as_slice()), limit)
        })
        .await?;

    Ok(compare_by_key(
        current,
        &previous,
        |t| t.term.clone(),
        CLICKS,
        &CompareOptions {
            round: Some(2),
            ..CompareOptions::default()
        },
        |t| SearchTerm {
            term: t.term.clone(),
            clicks: 0,
            position: 0.0,
        },
    ))
}
