//! Period-over-period relative change.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::date_util::round_to;

/// Relative change between a current and a previous value.
///
/// Division by a zero base never produces `NaN` or infinity: both values at
/// zero is `NoChange`, a non-zero value over a zero base is `Undefined` and
/// the presentation layer renders it as "new" or "removed".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PercentChange {
    Ratio(f64),
    NoChange,
    Undefined,
}

impl PercentChange {
    pub fn ratio(&self) -> Option<f64> {
        match self {
            PercentChange::Ratio(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, PercentChange::Ratio(_))
    }
}

pub fn percent_change(current: f64, previous: f64) -> PercentChange {
    if previous == 0.0 {
        return if current == 0.0 {
            PercentChange::NoChange
        } else {
            PercentChange::Undefined
        };
    }
    if current == 0.0 {
        return PercentChange::Ratio(-1.0);
    }
    PercentChange::Ratio((current - previous) / previous)
}

pub fn percent_change_rounded(current: f64, previous: f64, decimals: u32) -> PercentChange {
    match percent_change(current, previous) {
        PercentChange::Ratio(r) => PercentChange::Ratio(round_to(r, decimals)),
        other => other,
    }
}

/// Options for [`compare_by_key`].
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Round every ratio to this many decimals.
    pub round: Option<u32>,
    /// Appended to the field name to form the change key (`clicks` -> `clicksChange`).
    pub suffix: &'static str,
    /// Emit rows for keys that only exist in the previous collection, with a
    /// zero current value.
    pub hold_at_zero: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            round: None,
            suffix: "Change",
            hold_at_zero: false,
        }
    }
}

/// A record from the current collection with its per-field changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compared<T> {
    #[serde(flatten)]
    pub current: T,
    #[serde(flatten)]
    pub changes: BTreeMap<String, PercentChange>,
}

impl<T> Compared<T> {
    pub fn change(&self, field: &str, suffix: &str) -> Option<PercentChange> {
        self.changes.get(&format!("{field}{suffix}")).copied()
    }
}

/// A numeric field extracted for comparison.
pub type Field<T> = (&'static str, fn(&T) -> f64);

/// Pair `current` and `previous` records by key and compute the change of
/// every requested field.
///
/// One row is emitted per record of `current`, in its order. Keys missing
/// from `previous` compare against zero. With `hold_at_zero`, records whose
/// key only exists in `previous` are appended (in `previous` order) using
/// `zeroed` to build their current-period value.
pub fn compare_by_key<T, K, Z>(
    current: Vec<T>,
    previous: &[T],
    key: K,
    fields: &[Field<T>],
    options: &CompareOptions,
    zeroed: Z,
) -> Vec<Compared<T>>
where
    K: Fn(&T) -> String,
    Z: Fn(&T) -> T,
{
    let previous_by_key: HashMap<String, &T> =
        previous.iter().map(|p| (key(p), p)).collect();
    let current_keys: HashSet<String> = current.iter().map(&key).collect();

    let changes_for = |cur: &T, prev: Option<&T>| -> BTreeMap<String, PercentChange> {
        fields
            .iter()
            .map(|(name, get)| {
                let c = get(cur);
                let p = prev.map(get).unwrap_or(0.0);
                let change = match options.round {
                    Some(decimals) => percent_change_rounded(c, p, decimals),
                    None => percent_change(c, p),
                };
                (format!("{name}{}", options.suffix), change)
            })
            .collect()
    };

    let mut out: Vec<Compared<T>> = current
        .into_iter()
        .map(|cur| {
            let prev = previous_by_key.get(&key(&cur)).copied();
            let changes = changes_for(&cur, prev);
            Compared {
                current: cur,
                changes,
            }
        })
        .collect();

    if options.hold_at_zero {
        let mut seen = HashSet::new();
        for prev in previous {
            let k = key(prev);
            if current_keys.contains(&k) || !seen.insert(k) {
                continue;
            }
            let held = zeroed(prev);
            let changes = changes_for(&held, Some(prev));
            out.push(Compared {
                current: held,
                changes,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        term: String,
        clicks: i64,
    }

    fn row(term: &str, clicks: i64) -> Row {
        Row {
            term: term.to_string(),
            clicks,
        }
    }

    const CLICKS: &[Field<Row>] = &[("clicks", |r| r.clicks as f64)];

    #[test]
    fn test_ratio_for_positive_base() {
        assert_eq!(percent_change(150.0, 120.0), PercentChange::Ratio(0.25));
        assert_eq!(percent_change(50.0, 100.0), PercentChange::Ratio(-0.5));
        for (c, p) in [(3.0, 7.0), (7.0, 3.0), (1e6, 1.0), (0.5, 0.25)] {
            assert_eq!(percent_change(c, p), PercentChange::Ratio((c - p) / p));
        }
    }

    #[test]
    fn test_zero_base_sentinels() {
        assert_eq!(percent_change(0.0, 0.0), PercentChange::NoChange);
        assert_eq!(percent_change(5.0, 0.0), PercentChange::Undefined);
        assert_eq!(percent_change(-5.0, 0.0), PercentChange::Undefined);
        assert!(!percent_change(5.0, 0.0).is_defined());
    }

    #[test]
    fn test_drop_to_zero_is_minus_one() {
        assert_eq!(percent_change(0.0, 42.0), PercentChange::Ratio(-1.0));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(
            percent_change_rounded(10.0, 3.0, 2),
            PercentChange::Ratio(2.33)
        );
        assert_eq!(percent_change_rounded(0.0, 0.0, 2), PercentChange::NoChange);
    }

    #[test]
    fn test_compare_pairs_by_key_not_position() {
        let current = vec![row("taxes", 10), row("benefits", 4)];
        let previous = vec![row("benefits", 2), row("taxes", 5)];
        let out = compare_by_key(
            current,
            &previous,
            |r| r.term.clone(),
            CLICKS,
            &CompareOptions::default(),
            |r| row(&r.term, 0),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].current.term, "taxes");
        assert_eq!(
            out[0].change("clicks", "Change"),
            Some(PercentChange::Ratio(1.0))
        );
        assert_eq!(
            out[1].change("clicks", "Change"),
            Some(PercentChange::Ratio(1.0))
        );
    }

    #[test]
    fn test_compare_ignores_previous_only_keys_by_default() {
        let out = compare_by_key(
            vec![row("taxes", 10)],
            &[row("taxes", 10), row("gone", 7)],
            |r| r.term.clone(),
            CLICKS,
            &CompareOptions::default(),
            |r| row(&r.term, 0),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].change("clicks", "Change"),
            Some(PercentChange::Ratio(0.0))
        );
    }

    #[test]
    fn test_compare_holds_previous_only_keys_at_zero() {
        let options = CompareOptions {
            hold_at_zero: true,
            ..CompareOptions::default()
        };
        let out = compare_by_key(
            vec![row("new", 3)],
            &[row("gone", 7)],
            |r| r.term.clone(),
            CLICKS,
            &options,
            |r| row(&r.term, 0),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].change("clicks", "Change"),
            Some(PercentChange::Undefined)
        );
        assert_eq!(out[1].current, row("gone", 0));
        assert_eq!(
            out[1].change("clicks", "Change"),
            Some(PercentChange::Ratio(-1.0))
        );
    }

    #[test]
    fn test_compared_serializes_flat() {
        let out = compare_by_key(
            vec![row("taxes", 10)],
            &[row("taxes", 3)],
            |r| r.term.clone(),
            CLICKS,
            &CompareOptions {
                round: Some(2),
                ..CompareOptions::default()
            },
            |r| row(&r.term, 0),
        );
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["term"], "taxes");
        assert_eq!(json["clicks"], 10);
        assert_eq!(json["clicksChange"]["kind"], "ratio");
        assert_eq!(json["clicksChange"]["value"], 2.33);

        let back: Compared<Row> = serde_json::from_value(json).unwrap();
        assert_eq!(back, out[0]);
    }
}
