// 🗂️ Workspace pipeline
//
// raw params → resolve → compose → execute → annotate → summarize → payload
//
// Each lens implements `Workspace`. The binaries never call a lens directly:
// they go through `WORKSPACES`, an explicit name → handler table.

use crate::chips::{FilterChip, LabelCache};
use crate::config::WorkspaceConfig;
use crate::db::{QueryExecutor, Row};
use crate::error::{Result, WorkspaceError};
use crate::params::RawParams;
use crate::sql::SelectQuery;
use crate::summary::SidebarSummary;
use crate::workspaces::{AgentDirectory, PlayerDirectory, TransactionIndex, TwoWayUtility};
use chrono::NaiveDate;
use serde::Serialize;

/// Per-request inputs that are not request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Anchor for relative date windows
    pub today: NaiveDate,
    pub preview_limit: usize,
    pub row_limit: usize,
}

impl RequestContext {
    pub fn new(today: NaiveDate) -> Self {
        RequestContext::from_config(&WorkspaceConfig::default(), today)
    }

    pub fn from_config(config: &WorkspaceConfig, today: NaiveDate) -> Self {
        RequestContext {
            today,
            preview_limit: config.preview_limit,
            row_limit: config.row_limit,
        }
    }
}

pub trait Workspace {
    type Filters: Serialize;

    /// Dispatch key, also the `workspace` field of the payload
    const NAME: &'static str;
    const TITLE: &'static str;

    fn resolve(&self, params: &RawParams, ctx: &RequestContext) -> Self::Filters;

    fn compose(&self, filters: &Self::Filters, ctx: &RequestContext) -> SelectQuery;

    fn annotate_row(&self, row: &mut Row, filters: &Self::Filters);

    /// Lenses whose derived fields depend on the whole set override this
    fn annotate(&self, rows: &mut [Row], filters: &Self::Filters) {
        for row in rows.iter_mut() {
            self.annotate_row(row, filters);
        }
    }

    fn summarize(
        &self,
        rows: &[Row],
        filters: &Self::Filters,
        ctx: &RequestContext,
    ) -> SidebarSummary;

    fn chips(&self, filters: &Self::Filters, labels: &mut LabelCache<'_>) -> Vec<FilterChip>;
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspacePayload<F> {
    pub workspace: &'static str,
    pub title: &'static str,
    pub filters: F,
    pub chips: Vec<FilterChip>,
    /// At most `row_limit` rows; the sidebar covers the whole result
    pub rows: Vec<Row>,
    pub truncated: bool,
    pub sidebar: SidebarSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the full pipeline. Warehouse errors propagate unchanged.
pub fn run<W: Workspace>(
    workspace: &W,
    params: &RawParams,
    ctx: &RequestContext,
    executor: &dyn QueryExecutor,
) -> Result<WorkspacePayload<W::Filters>> {
    let filters = workspace.resolve(params, ctx);
    let query = workspace.compose(&filters, ctx);
    let mut rows = executor.select_rows(&query)?;

    Ok(assemble(workspace, filters, &mut rows, ctx, executor, None))
}

/// Same pipeline, but a failed query yields an empty payload carrying the
/// error message instead of an error.
pub fn run_or_fallback<W: Workspace>(
    workspace: &W,
    params: &RawParams,
    ctx: &RequestContext,
    executor: &dyn QueryExecutor,
) -> WorkspacePayload<W::Filters> {
    let filters = workspace.resolve(params, ctx);
    let query = workspace.compose(&filters, ctx);

    match executor.select_rows(&query) {
        Ok(mut rows) => assemble(workspace, filters, &mut rows, ctx, executor, None),
        Err(err) => {
            tracing::warn!(
                workspace = W::NAME,
                error = %err,
                "workspace query failed, rendering empty result"
            );
            let message = format!("Unable to load {}: {err}", W::TITLE);
            assemble(workspace, filters, &mut Vec::new(), ctx, executor, Some(message))
        }
    }
}

fn assemble<W: Workspace>(
    workspace: &W,
    filters: W::Filters,
    rows: &mut Vec<Row>,
    ctx: &RequestContext,
    executor: &dyn QueryExecutor,
    error: Option<String>,
) -> WorkspacePayload<W::Filters> {
    workspace.annotate(rows, &filters);
    let sidebar = workspace.summarize(rows, &filters, ctx);

    let truncated = rows.len() > ctx.row_limit;
    rows.truncate(ctx.row_limit);

    let mut labels = LabelCache::new(executor);
    let chips = workspace.chips(&filters, &mut labels);

    tracing::debug!(
        workspace = W::NAME,
        rows = rows.len(),
        matched = sidebar.row_count,
        chips = chips.len(),
        label_lookups = labels.lookups(),
        "workspace assembled"
    );

    WorkspacePayload {
        workspace: W::NAME,
        title: W::TITLE,
        filters,
        chips,
        rows: std::mem::take(rows),
        truncated,
        sidebar,
        error,
    }
}

// ============================================================================
// DISPATCH TABLE
// ============================================================================

pub type RenderFn =
    fn(&RawParams, &RequestContext, &dyn QueryExecutor) -> Result<serde_json::Value>;

pub struct WorkspaceEntry {
    pub name: &'static str,
    pub title: &'static str,
    pub render: RenderFn,
}

fn render_with_fallback<W: Workspace + Default>(
    params: &RawParams,
    ctx: &RequestContext,
    executor: &dyn QueryExecutor,
) -> Result<serde_json::Value> {
    let payload = run_or_fallback(&W::default(), params, ctx, executor);
    Ok(serde_json::to_value(payload)?)
}

const fn entry<W: Workspace + Default>() -> WorkspaceEntry {
    WorkspaceEntry {
        name: W::NAME,
        title: W::TITLE,
        render: render_with_fallback::<W>,
    }
}

pub static WORKSPACES: &[WorkspaceEntry] = &[
    entry::<PlayerDirectory>(),
    entry::<TransactionIndex>(),
    entry::<AgentDirectory>(),
    entry::<TwoWayUtility>(),
];

pub fn lookup(name: &str) -> Option<&'static WorkspaceEntry> {
    WORKSPACES.iter().find(|entry| entry.name == name)
}

/// Render a workspace by name; query failures come back inside the payload
pub fn render(
    name: &str,
    params: &RawParams,
    ctx: &RequestContext,
    executor: &dyn QueryExecutor,
) -> Result<serde_json::Value> {
    let entry = lookup(name).ok_or_else(|| WorkspaceError::UnknownWorkspace(name.to_string()))?;
    (entry.render)(params, ctx, executor)
}

// ============================================================================
// TESTS
// ============================================================================
