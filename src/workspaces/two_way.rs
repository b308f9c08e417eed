// 🔄 Two-way utility
//
// Active-game usage for two-way contracts against the league limit.

use crate::chips::{FilterChip, LabelCache};
use crate::db::Row;
use crate::params::{self, ParamEnum, RawParams};
use crate::rules::{apply_classification, flag_sql, Classification, Rule, RuleSet};
use crate::sql::{QueryBuilder, SelectQuery};
use crate::summary::{self, group_counts, PreviewOrder, SidebarSummary};
use crate::workspace::{RequestContext, Workspace};
use serde::Serialize;

const VIEW: &str = "two_way_utility";

const COLUMNS: &[&str] = &[
    "player_id",
    "player_name",
    "team_code",
    "games_active",
    "active_limit",
    "games_remaining",
    "team_games_remaining",
    "is_conversion_candidate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilitySort {
    #[default]
    PressureDesc,
    RemainingAsc,
    NameAsc,
}

impl ParamEnum for UtilitySort {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("pressure_desc", UtilitySort::PressureDesc, "Most pressing"),
        ("remaining_asc", UtilitySort::RemainingAsc, "Fewest games left"),
        ("name_asc", UtilitySort::NameAsc, "Name"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneLens {
    #[default]
    All,
    Exhausted,
    Urgent,
    Watch,
    Comfortable,
}

impl ParamEnum for LaneLens {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("all", LaneLens::All, "All lanes"),
        ("exhausted", LaneLens::Exhausted, "Limit reached"),
        ("urgent", LaneLens::Urgent, "Urgent"),
        ("watch", LaneLens::Watch, "Watch"),
        ("comfortable", LaneLens::Comfortable, "Comfortable"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilityFilters {
    pub query: Option<String>,
    pub team: Option<String>,
    pub lane: LaneLens,
    pub sort: UtilitySort,
    pub selected_id: Option<i64>,
}

fn games_remaining(row: &Row) -> Option<f64> {
    row.f64("games_remaining")
}

fn limit_reached(row: &Row) -> bool {
    games_remaining(row).is_some_and(|left| left <= 0.0)
}

fn few_games_left(row: &Row) -> bool {
    games_remaining(row).is_some_and(|left| left <= 5.0)
}

fn ahead_of_schedule(row: &Row) -> bool {
    match (games_remaining(row), row.f64("team_games_remaining")) {
        (Some(left), Some(schedule)) => left < schedule,
        _ => false,
    }
}

fn conversion_candidate(row: &Row) -> bool {
    row.flag("is_conversion_candidate")
}

pub const UTILITY: RuleSet = RuleSet {
    rules: &[
        Rule {
            outcome: Classification {
                lane: "exhausted",
                rank: 0,
                reason: "Active limit reached",
            },
            sql: "games_remaining <= 0",
            applies: limit_reached,
        },
        Rule {
            outcome: Classification {
                lane: "urgent",
                rank: 1,
                reason: "Five or fewer games left",
            },
            sql: "games_remaining <= 5",
            applies: few_games_left,
        },
        Rule {
            outcome: Classification {
                lane: "watch",
                rank: 2,
                reason: "Limit ahead of schedule",
            },
            sql: "games_remaining < team_games_remaining",
            applies: ahead_of_schedule,
        },
        Rule {
            outcome: Classification {
                lane: "watch",
                rank: 2,
                reason: "Conversion candidate",
            },
            sql: flag_sql!("is_conversion_candidate"),
            applies: conversion_candidate,
        },
    ],
    fallback: Classification {
        lane: "comfortable",
        rank: 3,
        reason: "Within limit",
    },
};

const PREVIEW_ORDER: PreviewOrder = PreviewOrder {
    rank: "urgency_rank",
    secondary: "utilization_pct",
    id: "player_id",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TwoWayUtility;

impl Workspace for TwoWayUtility {
    type Filters = UtilityFilters;

    const NAME: &'static str = "two_way";
    const TITLE: &'static str = "Two-Way Utility";

    fn resolve(&self, params: &RawParams, _ctx: &RequestContext) -> UtilityFilters {
        UtilityFilters {
            query: params::search_text(params.get("q")),
            team: params::team_code(params.get("team")),
            lane: LaneLens::from_param(params.get("lane")),
            sort: UtilitySort::from_param(params.get("sort")),
            selected_id: params::positive_id(params.get("selected")),
        }
    }

    fn compose(&self, filters: &UtilityFilters, _ctx: &RequestContext) -> SelectQuery {
        let mut qb = QueryBuilder::select_from(VIEW)
            .select(COLUMNS)
            .column(UTILITY.rule_column());
        let rank_sql = UTILITY.rank_sql();

        if let Some(query) = &filters.query {
            qb.search(query, &["player_name"], &["player_id"]);
        }
        if let Some(team) = &filters.team {
            qb.eq("team_code", team.as_str());
        }
        if !filters.lane.is_default() {
            if let Some(rank) = UTILITY.rank_of(filters.lane.as_param()) {
                qb.eq(&rank_sql, rank);
            }
        }

        let pressure = format!("{rank_sql} ASC");
        let order: Vec<&str> = match filters.sort {
            UtilitySort::PressureDesc => {
                vec![pressure.as_str(), "games_remaining ASC", "player_id ASC"]
            }
            UtilitySort::RemainingAsc => vec!["games_remaining ASC", "player_id ASC"],
            UtilitySort::NameAsc => vec!["player_name ASC", "player_id ASC"],
        };
        qb.order_by(&order);

        qb.build()
    }

    fn annotate_row(&self, row: &mut Row, _filters: &UtilityFilters) {
        let outcome = UTILITY.classify(row);
        apply_classification(row, &outcome);

        let utilization = match (row.f64("games_active"), row.f64("active_limit")) {
            (Some(active), Some(limit)) if limit > 0.0 => Some(active / limit * 100.0),
            _ => None,
        };
        row.set("utilization_pct", utilization);
    }

    fn summarize(
        &self,
        rows: &[Row],
        filters: &UtilityFilters,
        ctx: &RequestContext,
    ) -> SidebarSummary {
        let lanes: Vec<(&str, &str)> = LaneLens::VARIANTS
            .iter()
            .filter(|(_, lens, _)| !lens.is_default())
            .map(|(key, _, label)| (*key, *label))
            .collect();

        let mut sidebar = SidebarSummary::new(rows);
        sidebar
            .group("lanes", group_counts(rows, "urgency_key", Some("games_remaining"), &lanes))
            .group("teams", group_counts(rows, "team_code", Some("games_remaining"), &[]))
            .total("games_active", summary::sum(rows, "games_active"))
            .total("games_remaining", summary::sum(rows, "games_remaining"));

        sidebar.preview =
            summary::preview(rows, ctx.preview_limit, &PREVIEW_ORDER, filters.selected_id);
        sidebar.selected = filters
            .selected_id
            .and_then(|id| summary::find_by_id(rows, "player_id", id));
        sidebar
    }

    fn chips(&self, filters: &UtilityFilters, labels: &mut LabelCache<'_>) -> Vec<FilterChip> {
        let mut chips = Vec::new();

        chips.extend(FilterChip::for_search(filters.query.as_deref()));
        if let Some(team) = &filters.team {
            chips.push(FilterChip::new("team", team.as_str(), labels.team_label(team)));
        }
        chips.extend(FilterChip::for_enum("lane", filters.lane));
        if let Some(selected) = filters.selected_id {
            chips.push(FilterChip::new(
                "selected",
                selected.to_string(),
                labels.player_label(selected),
            ));
        }

        chips
    }
}
