// 🏷️ Classification Rules - Rules as Data
// Threshold tables and first-match precedence lists used by the row annotators

use crate::db::Row;
use serde::Serialize;

// ============================================================================
// THRESHOLD TABLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tier {
    pub key: &'static str,
    pub label: &'static str,
    /// Lower = more severe
    pub rank: i64,
    /// Inclusive lower bound
    pub min: f64,
}

/// Tiers ordered from highest `min` to lowest; values under every bound land
/// on `floor`
#[derive(Debug, Clone, Copy)]
pub struct ThresholdTable {
    pub tiers: &'static [Tier],
    pub floor: Tier,
}

impl ThresholdTable {
    pub fn classify(&self, value: f64) -> Tier {
        if value.is_nan() {
            return self.floor;
        }
        self.tiers
            .iter()
            .find(|tier| value >= tier.min)
            .copied()
            .unwrap_or(self.floor)
    }

    /// Every tier including the floor, most severe first
    pub fn all(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.iter().chain(std::iter::once(&self.floor))
    }

    pub fn by_key(&self, key: &str) -> Option<Tier> {
        self.all().find(|tier| tier.key == key).copied()
    }
}

// ============================================================================
// PRECEDENCE RULES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub lane: &'static str,
    /// Lower = more pressing
    pub rank: i64,
    pub reason: &'static str,
}

/// One precedence entry: the row predicate and the same predicate in SQL
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub outcome: Classification,
    pub sql: &'static str,
    pub applies: fn(&Row) -> bool,
}

/// Row column carrying the index of the rule matched in SQL
pub const RULE_COLUMN: &str = "urgency_rule";

/// SQL truth test for a flag column, accepting exactly what `Row::flag` does:
/// non-zero numbers and the text values `1`, `t`, `true` in any case
macro_rules! flag_sql {
    ($column:literal) => {
        concat!(
            "(CASE typeof(", $column, ")",
            " WHEN 'integer' THEN ", $column, " <> 0",
            " WHEN 'real' THEN ", $column, " <> 0",
            " WHEN 'text' THEN LOWER(TRIM(", $column, ")) IN ('1', 't', 'true')",
            " ELSE 0 END)"
        )
    };
}
pub(crate) use flag_sql;

/// Ordered rules; the first one that applies decides the classification
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    pub rules: &'static [Rule],
    pub fallback: Classification,
}

impl RuleSet {
    /// Classification of `row`. A row fetched with `rule_column` carries the
    /// index of the rule the warehouse matched, and that index decides; rows
    /// without it are matched against the predicates here.
    pub fn classify(&self, row: &Row) -> Classification {
        if let Some(index) = row.i64(RULE_COLUMN) {
            return self.outcome_at(index);
        }
        self.rules
            .iter()
            .find(|rule| (rule.applies)(row))
            .map(|rule| rule.outcome)
            .unwrap_or(self.fallback)
    }

    /// Outcome of the rule at `index`; anything out of range is the fallback
    pub fn outcome_at(&self, index: i64) -> Classification {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.rules.get(index))
            .map(|rule| rule.outcome)
            .unwrap_or(self.fallback)
    }

    /// The precedence as a SQL `CASE` yielding the lane rank
    pub fn rank_sql(&self) -> String {
        self.case_sql(|_, rule| rule.outcome.rank, self.fallback.rank)
    }

    /// The precedence as a SQL `CASE` yielding the matched rule's index,
    /// `rules.len()` when none matches
    pub fn rule_sql(&self) -> String {
        self.case_sql(|index, _| index as i64, self.rules.len() as i64)
    }

    /// Select-list entry exposing the matched rule as `RULE_COLUMN`
    pub fn rule_column(&self) -> String {
        format!("{} AS {RULE_COLUMN}", self.rule_sql())
    }

    pub fn rank_of(&self, lane: &str) -> Option<i64> {
        self.rules
            .iter()
            .map(|rule| &rule.outcome)
            .chain(std::iter::once(&self.fallback))
            .find(|outcome| outcome.lane == lane)
            .map(|outcome| outcome.rank)
    }

    fn case_sql(&self, value: impl Fn(usize, &Rule) -> i64, otherwise: i64) -> String {
        let mut sql = String::from("(CASE");
        for (index, rule) in self.rules.iter().enumerate() {
            sql.push_str(&format!(" WHEN {} THEN {}", rule.sql, value(index, rule)));
        }
        sql.push_str(&format!(" ELSE {otherwise} END)"));
        sql
    }
}

/// Write the standard urgency keys onto a row
pub fn apply_classification(row: &mut Row, outcome: &Classification) {
    row.set("urgency_key", outcome.lane);
    row.set("urgency_rank", outcome.rank);
    row.set("urgency_reason", outcome.reason);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::QueryExecutor;
    use crate::sql::SelectQuery;
    use rusqlite::Connection;
    use serde_json::json;

    const AMOUNT_TIERS: ThresholdTable = ThresholdTable {
        tiers: &[
            Tier {
                key: "major",
                label: "Major",
                rank: 0,
                min: 30_000_000.0,
            },
            Tier {
                key: "minor",
                label: "Minor",
                rank: 1,
                min: 1.0,
            },
        ],
        floor: Tier {
            key: "none",
            label: "None",
            rank: 2,
            min: f64::NEG_INFINITY,
        },
    };

    fn is_locked(row: &Row) -> bool {
        row.flag("locked")
    }

    fn is_soon(row: &Row) -> bool {
        row.flag("soon")
    }

    const RULES: RuleSet = RuleSet {
        rules: &[
            Rule {
                outcome: Classification {
                    lane: "urgent",
                    rank: 0,
                    reason: "Locked",
                },
                sql: "locked = 1",
                applies: is_locked,
            },
            Rule {
                outcome: Classification {
                    lane: "upcoming",
                    rank: 1,
                    reason: "Soon",
                },
                sql: "soon = 1",
                applies: is_soon,
            },
        ],
        fallback: Classification {
            lane: "stable",
            rank: 2,
            reason: "Nothing pending",
        },
    };

    fn row(locked: bool, soon: bool) -> Row {
        [("locked", json!(locked)), ("soon", json!(soon))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(AMOUNT_TIERS.classify(30_000_000.0).key, "major");
        assert_eq!(AMOUNT_TIERS.classify(29_999_999.0).key, "minor");
        assert_eq!(AMOUNT_TIERS.classify(1.0).key, "minor");
        assert_eq!(AMOUNT_TIERS.classify(0.0).key, "none");
        assert_eq!(AMOUNT_TIERS.classify(f64::NAN).key, "none");
        assert_eq!(AMOUNT_TIERS.by_key("minor").map(|t| t.rank), Some(1));
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(RULES.classify(&row(true, true)).lane, "urgent");
        assert_eq!(RULES.classify(&row(false, true)).lane, "upcoming");
        assert_eq!(RULES.classify(&row(false, false)).lane, "stable");
    }

    #[test]
    fn test_case_sql() {
        assert_eq!(
            RULES.rank_sql(),
            "(CASE WHEN locked = 1 THEN 0 WHEN soon = 1 THEN 1 ELSE 2 END)"
        );
        assert_eq!(
            RULES.rule_column(),
            "(CASE WHEN locked = 1 THEN 0 WHEN soon = 1 THEN 1 ELSE 2 END) AS urgency_rule"
        );
    }

    #[test]
    fn test_matched_rule_column_decides() {
        let mut r = row(false, false);
        r.set(RULE_COLUMN, 0);
        assert_eq!(RULES.classify(&r).reason, "Locked");

        r.set(RULE_COLUMN, 2);
        assert_eq!(RULES.classify(&r).lane, "stable");
        assert_eq!(RULES.outcome_at(-1).lane, "stable");
    }

    #[test]
    fn test_rank_of() {
        assert_eq!(RULES.rank_of("upcoming"), Some(1));
        assert_eq!(RULES.rank_of("stable"), Some(2));
        assert_eq!(RULES.rank_of("bogus"), None);
    }

    #[test]
    fn test_flag_sql_agrees_with_row_flag() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE flags (id INTEGER, v);
             INSERT INTO flags VALUES
                (1, 1), (2, 0), (3, 2), (4, 0.5), (5, 0.0), (6, 't'), (7, 'TRUE'),
                (8, ' 1 '), (9, 'f'), (10, 'false'), (11, 'yes'), (12, ''), (13, NULL);",
        )
        .unwrap();

        let query = SelectQuery::new(
            format!("SELECT id, v, {} AS sql_flag FROM flags ORDER BY id", flag_sql!("v")),
            vec![],
        );
        let rows = conn.select_rows(&query).unwrap();
        assert_eq!(rows.len(), 13);

        for r in &rows {
            assert_eq!(
                r.i64("sql_flag") == Some(1),
                r.flag("v"),
                "row {:?}",
                r.i64("id")
            );
        }
    }

    #[test]
    fn test_reclassifying_is_idempotent() {
        let mut r = row(true, false);
        let first = RULES.classify(&r);
        apply_classification(&mut r, &first);
        let second = RULES.classify(&r);

        assert_eq!(first, second);
        assert_eq!(r.str("urgency_reason"), Some("Locked"));
    }
}
