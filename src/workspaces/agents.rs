// 🤝 Agent directory
//
// Agents ranked by the cap dollars they represent. Percentile bands are
// relative to the rows actually fetched, so they move with the filters.

use crate::chips::{FilterChip, LabelCache};
use crate::db::{find_one, QueryExecutor, Row};
use crate::error::Result;
use crate::params::{self, ParamEnum, RawParams};
use crate::rules::{ThresholdTable, Tier};
use crate::sql::{QueryBuilder, SelectQuery};
use crate::summary::{self, group_counts, PreviewOrder, SidebarSummary};
use crate::workspace::{RequestContext, Workspace};
use serde::Serialize;

const VIEW: &str = "agent_directory";

const COLUMNS: &[&str] = &[
    "agent_id",
    "agent_name",
    "agency_name",
    "client_count",
    "book_total",
    "max_contract_count",
    "expiring_count",
];

const MIN_CLIENTS_RANGE: (i64, i64) = (1, 200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSort {
    #[default]
    BookDesc,
    ClientsDesc,
    NameAsc,
    ExpiringDesc,
}

impl ParamEnum for AgentSort {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("book_desc", AgentSort::BookDesc, "Largest book"),
        ("clients_desc", AgentSort::ClientsDesc, "Most clients"),
        ("name_asc", AgentSort::NameAsc, "Name"),
        ("expiring_desc", AgentSort::ExpiringDesc, "Most expiring deals"),
    ];
}

impl AgentSort {
    fn order_terms(self) -> &'static [&'static str] {
        match self {
            AgentSort::BookDesc => &["book_total DESC", "agent_name ASC", "agent_id ASC"],
            AgentSort::ClientsDesc => &["client_count DESC", "book_total DESC", "agent_id ASC"],
            AgentSort::NameAsc => &["agent_name ASC", "agent_id ASC"],
            AgentSort::ExpiringDesc => &["expiring_count DESC", "book_total DESC", "agent_id ASC"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLens {
    #[default]
    All,
    MaxClients,
    Expiring,
}

impl ParamEnum for AgentLens {
    const VARIANTS: &'static [(&'static str, Self, &'static str)] = &[
        ("all", AgentLens::All, "All agents"),
        ("max_clients", AgentLens::MaxClients, "Represents a max player"),
        ("expiring", AgentLens::Expiring, "Has expiring deals"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFilters {
    pub query: Option<String>,
    pub sort: AgentSort,
    pub lens: AgentLens,
    pub min_clients: Option<i64>,
    pub selected_id: Option<i64>,
}

pub const BOOK_BANDS: ThresholdTable = ThresholdTable {
    tiers: &[
        Tier {
            key: "elite",
            label: "Elite",
            rank: 0,
            min: 90.0,
        },
        Tier {
            key: "upper",
            label: "Upper tier",
            rank: 1,
            min: 75.0,
        },
        Tier {
            key: "middle",
            label: "Middle",
            rank: 2,
            min: 50.0,
        },
    ],
    floor: Tier {
        key: "lower",
        label: "Lower",
        rank: 3,
        min: f64::NEG_INFINITY,
    },
};

const PREVIEW_ORDER: PreviewOrder = PreviewOrder {
    rank: "band_rank",
    secondary: "book_total",
    id: "agent_id",
};

/// Share of `total` rows whose book is not larger than this one, 0..=100
pub fn book_percentile(total: usize, strictly_greater: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (total.saturating_sub(strictly_greater)) as f64 * 100.0 / total as f64
}

/// Row-local derived keys; the band needs the whole set
fn annotate_agent(row: &mut Row) {
    let book = row.f64("book_total").unwrap_or(0.0);
    let average = match row.i64("client_count") {
        Some(clients) if clients > 0 => Some(book / clients as f64),
        _ => None,
    };
    row.set("average_client_book", average);
}

fn apply_band(row: &mut Row, percentile: f64) {
    let band = BOOK_BANDS.classify(percentile);
    row.set("book_percentile", percentile);
    row.set("band_key", band.key);
    row.set("band_label", band.label);
    row.set("band_rank", band.rank);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AgentDirectory;

impl Workspace for AgentDirectory {
    type Filters = AgentFilters;

    const NAME: &'static str = "agents";
    const TITLE: &'static str = "Agents";

    fn resolve(&self, params: &RawParams, _ctx: &RequestContext) -> AgentFilters {
        let (min, max) = MIN_CLIENTS_RANGE;
        AgentFilters {
            query: params::search_text(params.get("q")),
            sort: AgentSort::from_param(params.get("sort")),
            lens: AgentLens::from_param(params.get("lens")),
            min_clients: params::bounded_int(params.get("min_clients"), min, max),
            selected_id: params::positive_id(params.get("selected")),
        }
    }

    fn compose(&self, filters: &AgentFilters, _ctx: &RequestContext) -> SelectQuery {
        let mut qb = QueryBuilder::select_from(VIEW).select(COLUMNS);

        if let Some(query) = &filters.query {
            qb.search(query, &["agent_name", "agency_name"], &["agent_id"]);
        }
        match filters.lens {
            AgentLens::All => {}
            AgentLens::MaxClients => {
                qb.condition("max_contract_count > 0");
            }
            AgentLens::Expiring => {
                qb.condition("expiring_count > 0");
            }
        }
        if let Some(min_clients) = filters.min_clients {
            qb.at_least("client_count", min_clients);
        }

        qb.order_by(filters.sort.order_terms());

        qb.build()
    }

    fn annotate_row(&self, row: &mut Row, _filters: &AgentFilters) {
        annotate_agent(row);
    }

    fn annotate(&self, rows: &mut [Row], filters: &AgentFilters) {
        let books: Vec<f64> = rows
            .iter()
            .map(|row| row.f64("book_total").unwrap_or(0.0))
            .collect();

        for (row, book) in rows.iter_mut().zip(&books) {
            self.annotate_row(row, filters);
            let greater = books.iter().filter(|other| *other > book).count();
            apply_band(row, book_percentile(books.len(), greater));
        }
    }

    fn summarize(
        &self,
        rows: &[Row],
        filters: &AgentFilters,
        ctx: &RequestContext,
    ) -> SidebarSummary {
        let bands: Vec<(&str, &str)> = BOOK_BANDS.all().map(|t| (t.key, t.label)).collect();

        let mut sidebar = SidebarSummary::new(rows);
        sidebar
            .group("bands", group_counts(rows, "band_key", Some("book_total"), &bands))
            .total("book_total", summary::sum(rows, "book_total"))
            .total("client_count", summary::sum(rows, "client_count"));

        sidebar.preview =
            summary::preview(rows, ctx.preview_limit, &PREVIEW_ORDER, filters.selected_id);
        sidebar.selected = filters
            .selected_id
            .and_then(|id| summary::find_by_id(rows, "agent_id", id));
        sidebar
    }

    fn chips(&self, filters: &AgentFilters, labels: &mut LabelCache<'_>) -> Vec<FilterChip> {
        let mut chips = Vec::new();

        chips.extend(FilterChip::for_search(filters.query.as_deref()));
        chips.extend(FilterChip::for_enum("lens", filters.lens));
        if let Some(min_clients) = filters.min_clients {
            chips.push(FilterChip::new(
                "min_clients",
                min_clients.to_string(),
                format!("At least {min_clients} clients"),
            ));
        }
        if let Some(selected) = filters.selected_id {
            chips.push(FilterChip::new(
                "selected",
                selected.to_string(),
                labels.agent_label(selected),
            ));
        }

        chips
    }
}

/// Single agent; the band is computed against the whole directory
pub fn find_agent(executor: &dyn QueryExecutor, agent_id: i64) -> Result<Row> {
    let mut qb = QueryBuilder::select_from(VIEW).select(COLUMNS);
    qb.eq("agent_id", agent_id).limit(1);
    let mut row = find_one(executor, &qb.build(), "agent", agent_id)?;

    let book = row.f64("book_total").unwrap_or(0.0);
    let mut qb = QueryBuilder::select_from(VIEW).column("COUNT(*) AS total");
    let p = qb.bind(book);
    let qb = qb.column(format!(
        "COALESCE(SUM(CASE WHEN book_total > {p} THEN 1 ELSE 0 END), 0) AS greater"
    ));
    let counts = executor.select_rows(&qb.build())?;

    let count = |column: &str| {
        counts
            .first()
            .and_then(|r| r.i64(column))
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    };

    annotate_agent(&mut row);
    apply_band(&mut row, book_percentile(count("total"), count("greater")));
    Ok(row)
}

// ============================================================================
// TESTS
// ============================================================================
