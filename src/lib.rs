// Salary Book - Core Library
// Read-only workspace lenses over the contract warehouse, shared by the CLI
// and the API server

pub mod chips;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod params;
pub mod rules;
pub mod sql;
pub mod summary;
pub mod workspace;
pub mod workspaces;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use chips::{FilterChip, LabelCache};
pub use config::{AppConfig, ConfigError, DatabaseConfig, ServerConfig, WorkspaceConfig};
pub use db::{find_one, open_warehouse, QueryExecutor, Row};
pub use entities::{Conference, Team, TeamRegistry};
pub use error::{Result, WorkspaceError};
pub use params::{ParamEnum, RawParams};
pub use rules::{Classification, Rule, RuleSet, ThresholdTable, Tier};
pub use sql::{QueryBuilder, SelectQuery, SqlFragments, SqlParam};
pub use summary::{GroupCount, PreviewOrder, SidebarSummary};
pub use workspace::{
    lookup, render, run, run_or_fallback, RequestContext, Workspace, WorkspaceEntry,
    WorkspacePayload, WORKSPACES,
};
pub use workspaces::{
    find_agent, find_player, AgentDirectory, PlayerDirectory, TransactionIndex, TwoWayUtility,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
