// 👤 Player directory
//
// Roster-wide contract view with an urgency lens: which contracts need a
// decision now, which soon, which not at all.

use crate::chips::{FilterChip, LabelCache};
use crate::db::{find_one, QueryExecutor, Row};
use crate::error::Result;
use crate::params::{self, ParamEnum, RawParams};
use crate::rules::{
    apply_classification, flag_sql, Classification, Rule, RuleSet, ThresholdTable, Tier,
};
use crate::sql::{QueryBuilder, SelectQuery};
use crate::summary::{self, group_counts, PreviewOrder, SidebarSummary};
use crate::workspace::{RequestContext, Workspace};
use serde::Serialize;

const VIEW: &str = "player_directory";

const COLUMNS: &[&str] = &[
    "player_id",
    "player_name",
    "team_code",
    "agent_id",
    "agent_name",
    "age",
    "position",
    "contract_type",
    "cap_hit",
    "years_remaining",
    "is_two_way",
    "has_lock_now",
    "is_trade_restricted_now",
    "has_option_upcoming",
    "is_non_guaranteed",
];

// ============================================================================
// FILTER STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSort {
    #[default]
    PressureDesc,
    CapDesc,
    CapAsc,
    NameAsc,
    AgeAsc,
    YearsDesc,
}

impl ParamEnum for PlayerSort {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("pressure_desc", PlayerSort::PressureDesc, "Most pressing"),
        ("cap_desc", PlayerSort::CapDesc, "Cap hit, high to low"),
        ("cap_asc", PlayerSort::CapAsc, "Cap hit, low to high"),
        ("name_asc", PlayerSort::NameAsc, "Name"),
        ("age_asc", PlayerSort::AgeAsc, "Youngest first"),
        ("years_desc", PlayerSort::YearsDesc, "Most years remaining"),
    ];
}

impl PlayerSort {
    fn order_terms(self) -> Vec<String> {
        let terms: &[&str] = match self {
            PlayerSort::PressureDesc => {
                return vec![
                    format!("{} ASC", URGENCY.rank_sql()),
                    "cap_hit DESC".to_string(),
                    "player_id ASC".to_string(),
                ];
            }
            PlayerSort::CapDesc => &["cap_hit DESC", "player_name ASC", "player_id ASC"],
            PlayerSort::CapAsc => &["cap_hit ASC", "player_name ASC", "player_id ASC"],
            PlayerSort::NameAsc => &["player_name ASC", "player_id ASC"],
            PlayerSort::AgeAsc => &["age ASC", "cap_hit DESC", "player_id ASC"],
            PlayerSort::YearsDesc => &["years_remaining DESC", "cap_hit DESC", "player_id ASC"],
        };
        terms.iter().map(|t| t.to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLens {
    #[default]
    All,
    Urgent,
    Upcoming,
    Stable,
}

impl ParamEnum for UrgencyLens {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("all", UrgencyLens::All, "All players"),
        ("urgent", UrgencyLens::Urgent, "Urgent"),
        ("upcoming", UrgencyLens::Upcoming, "Upcoming"),
        ("stable", UrgencyLens::Stable, "Stable"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    #[default]
    All,
    Standard,
    TwoWay,
    RookieScale,
    Minimum,
}

impl ParamEnum for Composition {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("all", Composition::All, "All contracts"),
        ("standard", Composition::Standard, "Standard contracts"),
        ("two_way", Composition::TwoWay, "Two-way contracts"),
        ("rookie_scale", Composition::RookieScale, "Rookie scale"),
        ("minimum", Composition::Minimum, "Minimum contracts"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerFilters {
    pub query: Option<String>,
    pub team: Option<String>,
    pub agent_id: Option<i64>,
    pub sort: PlayerSort,
    pub lens: UrgencyLens,
    pub composition: Composition,
    pub selected_id: Option<i64>,
}

// ============================================================================
// CLASSIFICATION TABLES
// ============================================================================

fn has_lock_now(row: &Row) -> bool {
    row.flag("has_lock_now")
}

fn is_trade_restricted_now(row: &Row) -> bool {
    row.flag("is_trade_restricted_now")
}

fn has_option_upcoming(row: &Row) -> bool {
    row.flag("has_option_upcoming")
}

fn is_non_guaranteed(row: &Row) -> bool {
    row.flag("is_non_guaranteed")
}

fn is_two_way(row: &Row) -> bool {
    row.flag("is_two_way")
}

fn is_expiring(row: &Row) -> bool {
    row.f64("years_remaining").is_some_and(|years| years <= 1.0)
}

const URGENT: &str = "urgent";
const UPCOMING: &str = "upcoming";
const STABLE: &str = "stable";

/// Order matters: the first rule that applies decides the lane
pub const URGENCY: RuleSet = RuleSet {
    rules: &[
        Rule {
            outcome: Classification {
                lane: URGENT,
                rank: 0,
                reason: "Lock now posture",
            },
            sql: flag_sql!("has_lock_now"),
            applies: has_lock_now,
        },
        Rule {
            outcome: Classification {
                lane: URGENT,
                rank: 0,
                reason: "Trade restriction active",
            },
            sql: flag_sql!("is_trade_restricted_now"),
            applies: is_trade_restricted_now,
        },
        Rule {
            outcome: Classification {
                lane: UPCOMING,
                rank: 1,
                reason: "Option decision ahead",
            },
            sql: flag_sql!("has_option_upcoming"),
            applies: has_option_upcoming,
        },
        Rule {
            outcome: Classification {
                lane: UPCOMING,
                rank: 1,
                reason: "Guarantee date ahead",
            },
            sql: flag_sql!("is_non_guaranteed"),
            applies: is_non_guaranteed,
        },
        Rule {
            outcome: Classification {
                lane: UPCOMING,
                rank: 1,
                reason: "Two-way conversion window",
            },
            sql: flag_sql!("is_two_way"),
            applies: is_two_way,
        },
        Rule {
            outcome: Classification {
                lane: UPCOMING,
                rank: 1,
                reason: "Expiring contract",
            },
            sql: "years_remaining <= 1",
            applies: is_expiring,
        },
    ],
    fallback: Classification {
        lane: STABLE,
        rank: 2,
        reason: "No immediate pressure",
    },
};

pub const CAP_TIERS: ThresholdTable = ThresholdTable {
    tiers: &[
        Tier {
            key: "max",
            label: "Max tier",
            rank: 0,
            min: 45_000_000.0,
        },
        Tier {
            key: "near_max",
            label: "Near max",
            rank: 1,
            min: 25_000_000.0,
        },
        Tier {
            key: "mid",
            label: "Mid-level",
            rank: 2,
            min: 12_000_000.0,
        },
        Tier {
            key: "rotation",
            label: "Rotation",
            rank: 3,
            min: 3_000_000.0,
        },
    ],
    floor: Tier {
        key: "minimum",
        label: "Minimum",
        rank: 4,
        min: f64::NEG_INFINITY,
    },
};

const PREVIEW_ORDER: PreviewOrder = PreviewOrder {
    rank: "urgency_rank",
    secondary: "cap_hit",
    id: "player_id",
};

// ============================================================================
// WORKSPACE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerDirectory;

impl Workspace for PlayerDirectory {
    type Filters = PlayerFilters;

    const NAME: &'static str = "players";
    const TITLE: &'static str = "Players";

    fn resolve(&self, params: &RawParams, _ctx: &RequestContext) -> PlayerFilters {
        PlayerFilters {
            query: params::search_text(params.get("q")),
            team: params::team_code(params.get("team")),
            agent_id: params::positive_id(params.get("agent")),
            sort: PlayerSort::from_param(params.get("sort")),
            lens: UrgencyLens::from_param(params.get("lens")),
            composition: Composition::from_param(params.get("composition")),
            selected_id: params::positive_id(params.get("selected")),
        }
    }

    fn compose(&self, filters: &PlayerFilters, _ctx: &RequestContext) -> SelectQuery {
        let mut qb = QueryBuilder::select_from(VIEW)
            .select(COLUMNS)
            .column(URGENCY.rule_column());

        if let Some(query) = &filters.query {
            qb.search(query, &["player_name", "agent_name"], &["player_id"]);
        }
        if let Some(team) = &filters.team {
            qb.eq("team_code", team.as_str());
        }
        if let Some(agent_id) = filters.agent_id {
            qb.eq("agent_id", agent_id);
        }

        let lane = match filters.lens {
            UrgencyLens::All => None,
            UrgencyLens::Urgent => Some(URGENT),
            UrgencyLens::Upcoming => Some(UPCOMING),
            UrgencyLens::Stable => Some(STABLE),
        };
        if let Some(rank) = lane.and_then(|lane| URGENCY.rank_of(lane)) {
            qb.eq(&URGENCY.rank_sql(), rank);
        }

        match filters.composition {
            Composition::All => {}
            Composition::TwoWay => {
                qb.condition(flag_sql!("is_two_way"));
            }
            Composition::Standard => {
                qb.eq("contract_type", "standard");
            }
            Composition::RookieScale => {
                qb.eq("contract_type", "rookie_scale");
            }
            Composition::Minimum => {
                qb.eq("contract_type", "minimum");
            }
        }

        let order = filters.sort.order_terms();
        let order: Vec<&str> = order.iter().map(String::as_str).collect();
        qb.order_by(&order);

        qb.build()
    }

    fn annotate_row(&self, row: &mut Row, _filters: &PlayerFilters) {
        annotate_player(row);
    }

    fn summarize(
        &self,
        rows: &[Row],
        filters: &PlayerFilters,
        ctx: &RequestContext,
    ) -> SidebarSummary {
        let lanes: Vec<(&str, &str)> = vec![
            (URGENT, "Urgent"),
            (UPCOMING, "Upcoming"),
            (STABLE, "Stable"),
        ];
        let tiers: Vec<(&str, &str)> = CAP_TIERS.all().map(|t| (t.key, t.label)).collect();

        let mut sidebar = SidebarSummary::new(rows);
        sidebar
            .group("lanes", group_counts(rows, "urgency_key", Some("cap_hit"), &lanes))
            .group("cap_tiers", group_counts(rows, "cap_tier_key", Some("cap_hit"), &tiers))
            .total("cap_hit", summary::sum(rows, "cap_hit"))
            .total(
                "two_way_count",
                summary::count_where(rows, |row| row.flag("is_two_way")) as f64,
            );

        if filters.team.is_none() {
            sidebar.group("teams", group_counts(rows, "team_code", Some("cap_hit"), &[]));
        }

        sidebar.preview =
            summary::preview(rows, ctx.preview_limit, &PREVIEW_ORDER, filters.selected_id);
        sidebar.selected = filters
            .selected_id
            .and_then(|id| summary::find_by_id(rows, "player_id", id));
        sidebar
    }

    fn chips(&self, filters: &PlayerFilters, labels: &mut LabelCache<'_>) -> Vec<FilterChip> {
        let mut chips = Vec::new();

        chips.extend(FilterChip::for_search(filters.query.as_deref()));
        if let Some(team) = &filters.team {
            chips.push(FilterChip::new("team", team.as_str(), labels.team_label(team)));
        }
        if let Some(agent_id) = filters.agent_id {
            chips.push(FilterChip::new(
                "agent",
                agent_id.to_string(),
                labels.agent_label(agent_id),
            ));
        }
        chips.extend(FilterChip::for_enum("lens", filters.lens));
        chips.extend(FilterChip::for_enum("composition", filters.composition));
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

/// Derived keys for one player row; reads only warehouse columns and the
/// matched-rule column when the query selected it
pub fn annotate_player(row: &mut Row) {
    let urgency = URGENCY.classify(row);
    apply_classification(row, &urgency);

    let tier = CAP_TIERS.classify(row.f64("cap_hit").unwrap_or(0.0));
    row.set("cap_tier_key", tier.key);
    row.set("cap_tier_label", tier.label);
}

/// Single player, annotated; not-found when the id is absent
pub fn find_player(executor: &dyn QueryExecutor, player_id: i64) -> Result<Row> {
    let mut qb = QueryBuilder::select_from(VIEW)
        .select(COLUMNS)
        .column(URGENCY.rule_column());
    qb.eq("player_id", player_id).limit(1);

    let mut row = find_one(executor, &qb.build(), "player", player_id)?;
    annotate_player(&mut row);
    Ok(row)
}

// ============================================================================
// TESTS
// ============================================================================
