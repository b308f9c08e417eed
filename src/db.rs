use crate::config::DatabaseConfig;
use crate::error::{Result, WorkspaceError};
use crate::sql::{SelectQuery, SqlParam};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;

/// One row from a reporting view: column name -> scalar value.
/// Annotators add derived keys in place; rows are never written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Row(Map::new())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column).filter(|value| !value.is_null())
    }

    pub fn str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean columns arrive as 0/1 from SQLite and as `t`/`true` from
    /// text exports; both read as flags. Must agree with `rules::flag_sql!`.
    pub fn flag(&self, column: &str) -> bool {
        match self.get(column) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(
                s.trim_matches(' ').to_ascii_lowercase().as_str(),
                "t" | "true" | "1"
            ),
            _ => false,
        }
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_string(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// REAL values count as integers only when they have no fractional part
fn whole_number(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Row(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ============================================================================
// QUERY EXECUTOR
// ============================================================================

/// Runs a composed query once and returns rows in query order.
/// No retries, no timeouts: errors go straight back to the caller.
pub trait QueryExecutor {
    fn select_rows(&self, query: &SelectQuery) -> Result<Vec<Row>>;
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Null => ToSqlOutput::Owned(SqliteValue::Null),
            SqlParam::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlParam::Real(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlParam::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl QueryExecutor for Connection {
    fn select_rows(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        let started = Instant::now();
        let mut stmt = self.prepare(&query.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
        let mut out = Vec::new();

        while let Some(row) = rows.next()? {
            let mut mapped = Map::with_capacity(columns.len());
            for (index, name) in columns.iter().enumerate() {
                mapped.insert(name.clone(), json_value(row.get_ref(index)?));
            }
            out.push(Row(mapped));
        }

        tracing::debug!(
            sql = %query.sql,
            params = query.params.len(),
            rows = out.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "warehouse query"
        );

        Ok(out)
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        // reporting views never expose blobs
        ValueRef::Blob(_) => Value::Null,
    }
}

/// Open the warehouse file named in config (read-only unless told otherwise)
pub fn open_warehouse(config: &DatabaseConfig) -> Result<Connection> {
    let flags = if config.read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
    } else {
        OpenFlags::default()
    };

    let conn = Connection::open_with_flags(&config.path, flags)?;
    tracing::info!(path = %config.path.display(), read_only = config.read_only, "warehouse opened");
    Ok(conn)
}

/// First row of `query`, or a not-found error naming the entity
pub fn find_one(
    executor: &dyn QueryExecutor,
    query: &SelectQuery,
    entity: &'static str,
    id: impl ToString,
) -> Result<Row> {
    executor
        .select_rows(query)?
        .into_iter()
        .next()
        .ok_or_else(|| WorkspaceError::not_found(entity, id))
}
