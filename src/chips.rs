// 🔖 Filter chips + request-scoped label cache
//
// Every active, non-default filter becomes a chip. Chips that point at
// warehouse records (an agent, a selected player) need a display name; the
// cache resolves each id at most once per request. It lives and dies with
// the request, so there is nothing to lock.

use crate::db::QueryExecutor;
use crate::entities::TeamRegistry;
use crate::params::ParamEnum;
use crate::sql::QueryBuilder;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterChip {
    /// Request parameter the chip clears
    pub param: &'static str,
    pub value: String,
    pub label: String,
}

impl FilterChip {
    pub fn new(param: &'static str, value: impl Into<String>, label: impl Into<String>) -> Self {
        FilterChip {
            param,
            value: value.into(),
            label: label.into(),
        }
    }

    /// Chip for a whitelisted enum, or nothing when it sits on its default
    pub fn for_enum<E: ParamEnum>(param: &'static str, value: E) -> Option<Self> {
        if value.is_default() {
            return None;
        }
        Some(FilterChip::new(param, value.as_param(), value.label()))
    }

    pub fn for_search(query: Option<&str>) -> Option<Self> {
        query.map(|q| FilterChip::new("q", q, format!("Search: {q}")))
    }
}

/// Where a named record's display label lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LabelSource {
    Agent,
    Player,
}

impl LabelSource {
    fn view(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            LabelSource::Agent => ("agent_directory", "agent_id", "agent_name"),
            LabelSource::Player => ("player_directory", "player_id", "player_name"),
        }
    }

    fn fallback(&self, id: i64) -> String {
        match self {
            LabelSource::Agent => format!("Agent #{id}"),
            LabelSource::Player => format!("Player #{id}"),
        }
    }
}

pub struct LabelCache<'a> {
    executor: &'a dyn QueryExecutor,
    teams: TeamRegistry,
    resolved: HashMap<(LabelSource, i64), String>,
    lookups: usize,
}

impl<'a> LabelCache<'a> {
    pub fn new(executor: &'a dyn QueryExecutor) -> Self {
        LabelCache {
            executor,
            teams: TeamRegistry::new(),
            resolved: HashMap::new(),
            lookups: 0,
        }
    }

    pub fn team_label(&self, code: &str) -> String {
        self.teams.display_name(code)
    }

    pub fn agent_label(&mut self, agent_id: i64) -> String {
        self.resolve(LabelSource::Agent, agent_id)
    }

    pub fn player_label(&mut self, player_id: i64) -> String {
        self.resolve(LabelSource::Player, player_id)
    }

    /// Warehouse round trips made so far
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    fn resolve(&mut self, source: LabelSource, id: i64) -> String {
        if let Some(label) = self.resolved.get(&(source, id)) {
            return label.clone();
        }

        let (view, id_column, name_column) = source.view();
        let mut qb = QueryBuilder::select_from(view).select(&[name_column]);
        qb.eq(id_column, id).limit(1);

        self.lookups += 1;
        let label = match self.executor.select_rows(&qb.build()) {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.str(name_column))
                .map(str::to_string)
                .unwrap_or_else(|| source.fallback(id)),
            Err(err) => {
                tracing::warn!(view, id, error = %err, "chip label lookup failed");
                source.fallback(id)
            }
        };

        self.resolved.insert((source, id), label.clone());
        label
    }
}
