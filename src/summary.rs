// 📊 Sidebar / Summary Aggregator
//
// Reduces the annotated row set into counts, totals and a bounded preview.
// Pure functions of the rows passed in; recomputing gives the same answer.

use crate::db::Row;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub label: String,
    pub count: usize,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SidebarSummary {
    pub row_count: usize,
    /// Named groupings, e.g. "lanes" or "teams"
    pub groups: BTreeMap<&'static str, Vec<GroupCount>>,
    pub totals: BTreeMap<&'static str, f64>,
    pub preview: Vec<Row>,
    pub selected: Option<Row>,
}

impl SidebarSummary {
    pub fn new(rows: &[Row]) -> Self {
        SidebarSummary {
            row_count: rows.len(),
            ..SidebarSummary::default()
        }
    }

    pub fn group(&mut self, name: &'static str, counts: Vec<GroupCount>) -> &mut Self {
        self.groups.insert(name, counts);
        self
    }

    pub fn total(&mut self, name: &'static str, value: f64) -> &mut Self {
        self.totals.insert(name, value);
        self
    }
}

/// Count rows per value of `column`, summing `sum_column` when given.
///
/// `known` lists `(key, label)` pairs that always appear, in that order, even
/// with a zero count. Keys outside `known` follow, alphabetically, labelled
/// with the key itself. Rows missing the column count under `"unknown"`.
pub fn group_counts(
    rows: &[Row],
    column: &str,
    sum_column: Option<&str>,
    known: &[(&str, &str)],
) -> Vec<GroupCount> {
    let mut tallies: BTreeMap<String, (usize, f64)> = BTreeMap::new();

    for row in rows {
        let key = row
            .get(column)
            .map(|value| match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            })
            .unwrap_or_else(|| "unknown".to_string());

        let amount = sum_column.and_then(|c| row.f64(c)).unwrap_or(0.0);
        let entry = tallies.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += amount;
    }

    let mut groups: Vec<GroupCount> = known
        .iter()
        .map(|(key, label)| {
            let (count, total) = tallies.remove(*key).unwrap_or((0, 0.0));
            GroupCount {
                key: key.to_string(),
                label: label.to_string(),
                count,
                total,
            }
        })
        .collect();

    groups.extend(tallies.into_iter().map(|(key, (count, total))| GroupCount {
        label: key.clone(),
        key,
        count,
        total,
    }));

    groups
}

pub fn sum(rows: &[Row], column: &str) -> f64 {
    rows.iter().filter_map(|row| row.f64(column)).sum()
}

pub fn count_where(rows: &[Row], predicate: impl Fn(&Row) -> bool) -> usize {
    rows.iter().filter(|row| predicate(row)).count()
}

pub fn find_by_id(rows: &[Row], id_column: &str, id: i64) -> Option<Row> {
    rows.iter().find(|row| row.i64(id_column) == Some(id)).cloned()
}

// ============================================================================
// PREVIEW
// ============================================================================

/// Preview ordering: `rank` ascending, then `secondary` descending, then `id`
/// ascending. Missing ranks sort last, missing secondaries lowest.
#[derive(Debug, Clone, Copy)]
pub struct PreviewOrder {
    pub rank: &'static str,
    pub secondary: &'static str,
    pub id: &'static str,
}

impl PreviewOrder {
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let rank = |row: &Row| row.i64(self.rank).unwrap_or(i64::MAX);
        let secondary = |row: &Row| row.f64(self.secondary).unwrap_or(f64::NEG_INFINITY);
        let id = |row: &Row| row.i64(self.id).unwrap_or(i64::MAX);

        rank(a)
            .cmp(&rank(b))
            .then_with(|| secondary(b).total_cmp(&secondary(a)))
            .then_with(|| id(a).cmp(&id(b)))
    }
}

/// The first `limit` rows under `order`.
///
/// When `pinned` names a row that exists but falls outside the cut, it takes
/// the last slot, so the result always contains it and never exceeds `limit`.
pub fn preview(rows: &[Row], limit: usize, order: &PreviewOrder, pinned: Option<i64>) -> Vec<Row> {
    if limit == 0 {
        return Vec::new();
    }

    let mut sorted: Vec<&Row> = rows.iter().collect();
    sorted.sort_by(|a, b| order.compare(a, b));

    let mut picked: Vec<&Row> = sorted.iter().take(limit).copied().collect();

    if let Some(pinned_id) = pinned {
        let in_cut = picked.iter().any(|row| row.i64(order.id) == Some(pinned_id));
        let pinned_row = sorted
            .iter()
            .find(|row| row.i64(order.id) == Some(pinned_id))
            .copied();

        if let (false, Some(row)) = (in_cut, pinned_row) {
            if picked.len() == limit {
                picked.pop();
            }
            picked.push(row);
        }
    }

    picked.into_iter().cloned().collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ORDER: PreviewOrder = PreviewOrder {
        rank: "urgency_rank",
        secondary: "cap_hit",
        id: "player_id",
    };

    fn row(id: i64, rank: i64, cap: f64, lane: &str) -> Row {
        [
            ("player_id", json!(id)),
            ("urgency_rank", json!(rank)),
            ("cap_hit", json!(cap)),
            ("urgency_key", json!(lane)),
        ]
        .into_iter()
        .collect()
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().filter_map(|r| r.i64("player_id")).collect()
    }

    fn sample() -> Vec<Row> {
        vec![
            row(5, 2, 10.0, "stable"),
            row(3, 0, 5.0, "urgent"),
            row(9, 0, 5.0, "urgent"),
            row(1, 1, 40.0, "upcoming"),
            row(7, 0, 20.0, "urgent"),
            row(2, 2, 1.0, "stable"),
        ]
    }

    #[test]
    fn test_preview_tie_break() {
        let rows = sample();
        let top = preview(&rows, 4, &ORDER, None);

        assert_eq!(ids(&top), vec![7, 3, 9, 1]);
    }

    #[test]
    fn test_preview_is_bounded_subset() {
        let rows = sample();

        for limit in 0..8 {
            let top = preview(&rows, limit, &ORDER, None);
            assert!(top.len() <= limit);
            assert!(top.iter().all(|r| rows.contains(r)));
        }
    }

    #[test]
    fn test_pinned_row_is_kept() {
        let rows = sample();
        let top = preview(&rows, 3, &ORDER, Some(2));

        assert_eq!(ids(&top), vec![7, 3, 2]);
    }

    #[test]
    fn test_pinned_row_already_in_cut() {
        let rows = sample();
        let top = preview(&rows, 3, &ORDER, Some(3));

        assert_eq!(ids(&top), vec![7, 3, 9]);
    }

    #[test]
    fn test_missing_pinned_row_is_ignored() {
        let rows = sample();
        let top = preview(&rows, 3, &ORDER, Some(404));

        assert_eq!(ids(&top), vec![7, 3, 9]);
    }

    #[test]
    fn test_preview_is_deterministic() {
        let rows = sample();
        let mut reversed = rows.clone();
        reversed.reverse();

        assert_eq!(
            preview(&rows, 14, &ORDER, Some(5)),
            preview(&reversed, 14, &ORDER, Some(5))
        );
    }

    #[test]
    fn test_group_counts_known_then_unseen() {
        let mut rows = sample();
        rows.push(row(11, 3, 2.0, "exotic"));

        let groups = group_counts(
            &rows,
            "urgency_key",
            Some("cap_hit"),
            &[
                ("urgent", "Urgent"),
                ("upcoming", "Upcoming"),
                ("stable", "Stable"),
                ("empty", "Empty"),
            ],
        );

        let summary: Vec<(&str, usize, f64)> = groups
            .iter()
            .map(|g| (g.key.as_str(), g.count, g.total))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("urgent", 3, 30.0),
                ("upcoming", 1, 40.0),
                ("stable", 2, 11.0),
                ("empty", 0, 0.0),
                ("exotic", 1, 2.0),
            ]
        );
        assert_eq!(groups[0].label, "Urgent");
        assert_eq!(groups[4].label, "exotic");
    }

    #[test]
    fn test_sum_and_find() {
        let rows = sample();

        assert_eq!(sum(&rows, "cap_hit"), 81.0);
        assert_eq!(count_where(&rows, |r| r.str("urgency_key") == Some("urgent")), 3);
        assert_eq!(find_by_id(&rows, "player_id", 9).and_then(|r| r.f64("cap_hit")), Some(5.0));
        assert!(find_by_id(&rows, "player_id", 404).is_none());
    }

    #[test]
    fn test_summary_builder() {
        let rows = sample();
        let mut summary = SidebarSummary::new(&rows);
        summary.total("cap_hit", sum(&rows, "cap_hit"));

        assert_eq!(summary.row_count, 6);
        assert_eq!(summary.totals.get("cap_hit"), Some(&81.0));
        assert!(summary.groups.is_empty());
    }
}
