// 🔁 Transaction index
//
// League transaction log: signings, trades, waivers. Filters narrow by team,
// date window, type and size; the annotator grades each move by amount.

use crate::chips::{FilterChip, LabelCache};
use crate::db::Row;
use crate::params::{self, ParamEnum, RawParams};
use crate::rules::{ThresholdTable, Tier};
use crate::sql::{QueryBuilder, SelectQuery};
use crate::summary::{self, group_counts, PreviewOrder, SidebarSummary};
use crate::workspace::{RequestContext, Workspace};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

const VIEW: &str = "transaction_index";

const COLUMNS: &[&str] = &[
    "transaction_id",
    "transaction_date",
    "team_code",
    "from_team_code",
    "to_team_code",
    "player_id",
    "player_name",
    "transaction_type",
    "description",
    "amount",
];

/// Month the league year turns over
const SEASON_START_MONTH: u32 = 7;

// ============================================================================
// FILTER STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    #[default]
    Season,
    Last7,
    Last30,
    Last90,
    All,
}

impl ParamEnum for DateWindow {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("season", DateWindow::Season, "This season"),
        ("last_7", DateWindow::Last7, "Last 7 days"),
        ("last_30", DateWindow::Last30, "Last 30 days"),
        ("last_90", DateWindow::Last90, "Last 90 days"),
        ("all", DateWindow::All, "All dates"),
    ];
}

impl DateWindow {
    /// Inclusive date bounds relative to `today`
    pub fn bounds(self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let days_back = |n: u64| today.checked_sub_days(Days::new(n));

        match self {
            DateWindow::Season => (Some(season_start(today)), Some(today)),
            DateWindow::Last7 => (days_back(7), Some(today)),
            DateWindow::Last30 => (days_back(30), Some(today)),
            DateWindow::Last90 => (days_back(90), Some(today)),
            DateWindow::All => (None, None),
        }
    }
}

/// July 1st of the league year containing `today`
pub fn season_start(today: NaiveDate) -> NaiveDate {
    let year = if today.month() >= SEASON_START_MONTH {
        today.year()
    } else {
        today.year() - 1
    };
    NaiveDate::from_ymd_opt(year, SEASON_START_MONTH, 1).unwrap_or(today)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    All,
    Signing,
    Extension,
    Trade,
    Waiver,
    Release,
    TwoWay,
    Conversion,
}

impl ParamEnum for TransactionType {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("all", TransactionType::All, "All types"),
        ("signing", TransactionType::Signing, "Signings"),
        ("extension", TransactionType::Extension, "Extensions"),
        ("trade", TransactionType::Trade, "Trades"),
        ("waiver", TransactionType::Waiver, "Waivers"),
        ("release", TransactionType::Release, "Releases"),
        ("two_way", TransactionType::TwoWay, "Two-way deals"),
        ("conversion", TransactionType::Conversion, "Conversions"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLens {
    #[default]
    All,
    Significant,
    Major,
}

impl ParamEnum for SeverityLens {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("all", SeverityLens::All, "All sizes"),
        ("significant", SeverityLens::Significant, "Significant and up"),
        ("major", SeverityLens::Major, "Major only"),
    ];
}

impl SeverityLens {
    fn min_amount(self) -> Option<f64> {
        let key = match self {
            SeverityLens::All => return None,
            SeverityLens::Significant => "significant",
            SeverityLens::Major => "major",
        };
        SEVERITY.by_key(key).map(|tier| tier.min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSort {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
}

impl ParamEnum for TransactionSort {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("date_desc", TransactionSort::DateDesc, "Newest first"),
        ("date_asc", TransactionSort::DateAsc, "Oldest first"),
        ("amount_desc", TransactionSort::AmountDesc, "Largest first"),
    ];
}

impl TransactionSort {
    fn order_terms(self) -> &'static [&'static str] {
        match self {
            TransactionSort::DateDesc => &["transaction_date DESC", "transaction_id DESC"],
            TransactionSort::DateAsc => &["transaction_date ASC", "transaction_id ASC"],
            TransactionSort::AmountDesc => &[
                "ABS(COALESCE(amount, 0)) DESC",
                "transaction_date DESC",
                "transaction_id DESC",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionFilters {
    pub query: Option<String>,
    pub team: Option<String>,
    pub window: DateWindow,
    /// Effective inclusive bounds after the window or explicit dates
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// True when `from`/`to` replaced the window
    pub explicit_dates: bool,
    pub transaction_type: TransactionType,
    pub severity: SeverityLens,
    pub sort: TransactionSort,
    pub selected_id: Option<i64>,
}

// ============================================================================
// SEVERITY
// ============================================================================

pub const SEVERITY: ThresholdTable = ThresholdTable {
    tiers: &[
        Tier {
            key: "major",
            label: "Major",
            rank: 0,
            min: 30_000_000.0,
        },
        Tier {
            key: "significant",
            label: "Significant",
            rank: 1,
            min: 10_000_000.0,
        },
        Tier {
            key: "moderate",
            label: "Moderate",
            rank: 2,
            min: 2_000_000.0,
        },
        Tier {
            key: "minor",
            label: "Minor",
            rank: 3,
            min: f64::MIN_POSITIVE,
        },
    ],
    floor: Tier {
        key: "procedural",
        label: "Procedural",
        rank: 4,
        min: f64::NEG_INFINITY,
    },
};

const PREVIEW_ORDER: PreviewOrder = PreviewOrder {
    rank: "severity_rank",
    secondary: "amount_abs",
    id: "transaction_id",
};

// ============================================================================
// WORKSPACE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionIndex;

impl Workspace for TransactionIndex {
    type Filters = TransactionFilters;

    const NAME: &'static str = "transactions";
    const TITLE: &'static str = "Transactions";

    fn resolve(&self, params: &RawParams, ctx: &RequestContext) -> TransactionFilters {
        let window = DateWindow::from_param(params.get("window"));
        let from = params::date(params.get("from"));
        let to = params::date(params.get("to"));

        let explicit_dates = from.is_some() || to.is_some();
        let (start_date, end_date) = if explicit_dates {
            match (from, to) {
                (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
                bounds => bounds,
            }
        } else {
            window.bounds(ctx.today)
        };

        TransactionFilters {
            query: params::search_text(params.get("q")),
            team: params::team_code(params.get("team")),
            window,
            start_date,
            end_date,
            explicit_dates,
            transaction_type: TransactionType::from_param(params.get("type")),
            severity: SeverityLens::from_param(params.get("severity")),
            sort: TransactionSort::from_param(params.get("sort")),
            selected_id: params::positive_id(params.get("selected")),
        }
    }

    fn compose(&self, filters: &TransactionFilters, _ctx: &RequestContext) -> SelectQuery {
        let mut qb = QueryBuilder::select_from(VIEW).select(COLUMNS);

        if let Some(query) = &filters.query {
            qb.search(
                query,
                &["player_name", "description"],
                &["transaction_id", "player_id"],
            );
        }
        if let Some(team) = &filters.team {
            let p = qb.bind(team.as_str());
            qb.condition(format!(
                "(team_code = {p} OR from_team_code = {p} OR to_team_code = {p})"
            ));
        }
        if let Some(start) = filters.start_date {
            qb.on_or_after("transaction_date", start);
        }
        if let Some(end) = filters.end_date {
            qb.on_or_before("transaction_date", end);
        }
        if !filters.transaction_type.is_default() {
            qb.eq("transaction_type", filters.transaction_type.as_param());
        }
        if let Some(min) = filters.severity.min_amount() {
            qb.at_least("ABS(amount)", min);
        }

        qb.order_by(filters.sort.order_terms());

        qb.build()
    }

    fn annotate_row(&self, row: &mut Row, filters: &TransactionFilters) {
        let amount_abs = row.f64("amount").map(f64::abs).unwrap_or(0.0);
        let severity = SEVERITY.classify(amount_abs);

        row.set("amount_abs", amount_abs);
        row.set("severity_key", severity.key);
        row.set("severity_label", severity.label);
        row.set("severity_rank", severity.rank);

        if let Some(team) = &filters.team {
            row.set("direction", direction(row, team));
        }
    }

    fn summarize(
        &self,
        rows: &[Row],
        filters: &TransactionFilters,
        ctx: &RequestContext,
    ) -> SidebarSummary {
        let types: Vec<(&str, &str)> = TransactionType::VARIANTS
            .iter()
            .filter(|(_, variant, _)| !variant.is_default())
            .map(|(key, _, label)| (*key, *label))
            .collect();
        let severities: Vec<(&str, &str)> = SEVERITY.all().map(|t| (t.key, t.label)).collect();

        let mut sidebar = SidebarSummary::new(rows);
        sidebar
            .group("types", group_counts(rows, "transaction_type", Some("amount_abs"), &types))
            .group("severity", group_counts(rows, "severity_key", Some("amount_abs"), &severities))
            .total("amount", summary::sum(rows, "amount_abs"));

        if filters.team.is_some() {
            let directions = [
                ("incoming", "Incoming"),
                ("outgoing", "Outgoing"),
                ("internal", "Internal"),
            ];
            sidebar.group("directions", group_counts(rows, "direction", None, &directions));
        }

        sidebar.preview =
            summary::preview(rows, ctx.preview_limit, &PREVIEW_ORDER, filters.selected_id);
        sidebar.selected = filters
            .selected_id
            .and_then(|id| summary::find_by_id(rows, "transaction_id", id));
        sidebar
    }

    fn chips(&self, filters: &TransactionFilters, labels: &mut LabelCache<'_>) -> Vec<FilterChip> {
        let mut chips = Vec::new();

        chips.extend(FilterChip::for_search(filters.query.as_deref()));
        if let Some(team) = &filters.team {
            chips.push(FilterChip::new("team", team.as_str(), labels.team_label(team)));
        }
        if filters.explicit_dates {
            if let Some(start) = filters.start_date {
                chips.push(FilterChip::new("from", start.to_string(), format!("From {start}")));
            }
            if let Some(end) = filters.end_date {
                chips.push(FilterChip::new("to", end.to_string(), format!("Through {end}")));
            }
        } else {
            chips.extend(FilterChip::for_enum("window", filters.window));
        }
        chips.extend(FilterChip::for_enum("type", filters.transaction_type));
        chips.extend(FilterChip::for_enum("severity", filters.severity));
        if let Some(selected) = filters.selected_id {
            chips.push(FilterChip::new(
                "selected",
                selected.to_string(),
                format!("Transaction #{selected}"),
            ));
        }

        chips
    }
}

/// Movement relative to the filtered team
fn direction(row: &Row, team: &str) -> &'static str {
    if row.str("to_team_code") == Some(team) {
        "incoming"
    } else if row.str("from_team_code") == Some(team) {
        "outgoing"
    } else {
        "internal"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, today, warehouse};
    use crate::workspace::run;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> RawParams {
        pairs.iter().copied().collect()
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().filter_map(|r| r.i64("transaction_id")).collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_season_start() {
        assert_eq!(season_start(date("2025-01-15")), date("2024-07-01"));
        assert_eq!(season_start(date("2024-07-01")), date("2024-07-01"));
        assert_eq!(season_start(date("2024-06-30")), date("2023-07-01"));
    }

    #[test]
    fn test_window_bounds() {
        assert_eq!(
            DateWindow::Last7.bounds(today()),
            (Some(date("2025-01-08")), Some(today()))
        );
        assert_eq!(DateWindow::All.bounds(today()), (None, None));
    }

    #[test]
    fn test_severity_tiers() {
        assert_eq!(SEVERITY.classify(240_000_000.0).key, "major");
        assert_eq!(SEVERITY.classify(10_000_000.0).key, "significant");
        assert_eq!(SEVERITY.classify(2_100_000.0).key, "moderate");
        assert_eq!(SEVERITY.classify(1.0).key, "minor");
        assert_eq!(SEVERITY.classify(0.0).key, "procedural");
    }

    #[test]
    fn test_default_season_window() {
        let conn = warehouse();
        let payload = run(&TransactionIndex, &RawParams::new(), &ctx(), &conn).unwrap();

        assert_eq!(ids(&payload.rows), vec![5, 4, 7, 3, 2, 1]);
        assert_eq!(payload.filters.start_date, Some(date("2024-07-01")));
        assert!(payload.chips.is_empty());
    }

    #[test]
    fn test_team_matches_any_side_and_sets_direction() {
        let conn = warehouse();
        let payload = run(&TransactionIndex, &params(&[("team", "BOS")]), &ctx(), &conn).unwrap();

        assert_eq!(ids(&payload.rows), vec![3, 1]);
        assert_eq!(payload.rows[0].str("direction"), Some("outgoing"));
        assert_eq!(payload.rows[1].str("direction"), Some("incoming"));

        let directions: Vec<(&str, usize)> = payload.sidebar.groups["directions"]
            .iter()
            .map(|g| (g.key.as_str(), g.count))
            .collect();
        assert_eq!(directions, vec![("incoming", 1), ("outgoing", 1), ("internal", 0)]);
    }

    #[test]
    fn test_no_direction_without_team() {
        let conn = warehouse();
        let payload = run(&TransactionIndex, &RawParams::new(), &ctx(), &conn).unwrap();

        assert!(payload.rows.iter().all(|r| !r.contains("direction")));
    }

    #[test]
    fn test_search_text_and_identifiers() {
        let conn = warehouse();
        let payload = run(&TransactionIndex, &params(&[("q", "23")]), &ctx(), &conn).unwrap();

        assert_eq!(ids(&payload.rows), vec![4, 2]);
    }

    #[test]
    fn test_explicit_dates_override_window() {
        let conn = warehouse();
        let payload = run(
            &TransactionIndex,
            &params(&[("window", "last_7"), ("from", "2024-06-01"), ("to", "2024-07-31")]),
            &ctx(),
            &conn,
        )
        .unwrap();

        assert_eq!(ids(&payload.rows), vec![1, 6]);
        assert_eq!(
            payload.chips,
            vec![
                FilterChip::new("from", "2024-06-01", "From 2024-06-01"),
                FilterChip::new("to", "2024-07-31", "Through 2024-07-31"),
            ]
        );
    }

    #[test]
    fn test_reversed_dates_are_swapped() {
        let filters = TransactionIndex.resolve(
            &params(&[("from", "2025-01-10"), ("to", "2024-12-01")]),
            &ctx(),
        );
        assert_eq!(filters.start_date, Some(date("2024-12-01")));
        assert_eq!(filters.end_date, Some(date("2025-01-10")));
    }

    #[test]
    fn test_malformed_dates_fall_back_to_window() {
        let filters = TransactionIndex.resolve(
            &params(&[("from", "yesterday"), ("window", "last_30")]),
            &ctx(),
        );
        assert!(!filters.explicit_dates);
        assert_eq!(filters.window, DateWindow::Last30);
        assert_eq!(filters.start_date, Some(date("2024-12-16")));
    }

    #[test]
    fn test_type_severity_and_sort() {
        let conn = warehouse();

        let trades = run(
            &TransactionIndex,
            &params(&[("type", "trade"), ("window", "all"), ("sort", "date_asc")]),
            &ctx(),
            &conn,
        )
        .unwrap();
        assert_eq!(ids(&trades.rows), vec![6, 3, 7]);

        let major = run(
            &TransactionIndex,
            &params(&[("severity", "significant"), ("sort", "amount_desc")]),
            &ctx(),
            &conn,
        )
        .unwrap();
        assert_eq!(ids(&major.rows), vec![1, 7]);
    }

    #[test]
    fn test_bound_values_never_spliced() {
        let filters = TransactionIndex.resolve(
            &params(&[("q", "o'brien"), ("team", "NYK"), ("type", "trade")]),
            &ctx(),
        );
        let query = TransactionIndex.compose(&filters, &ctx());

        assert!(!query.sql.contains("o'brien"));
        assert!(!query.sql.contains("NYK"));
        assert!(query.sql.contains("(team_code = ?2 OR from_team_code = ?2 OR to_team_code = ?2)"));
    }

    #[test]
    fn test_sidebar_preview_by_severity() {
        let conn = warehouse();
        let payload = run(&TransactionIndex, &RawParams::new(), &ctx(), &conn).unwrap();
        let sidebar = &payload.sidebar;

        assert_eq!(ids(&sidebar.preview), vec![1, 7, 2, 4, 3, 5]);
        assert_eq!(sidebar.totals["amount"], 264_680_000.0);

        let trade = sidebar.groups["types"]
            .iter()
            .find(|g| g.key == "trade")
            .unwrap();
        assert_eq!((trade.count, trade.total), (2, 14_580_000.0));
    }
}
