// 🧱 SQL Fragment Composer
//
// Builds one SELECT against a reporting view, one predicate per active filter.
// Every value that came from a request is bound to a numbered placeholder;
// only column names and fixed sort tables are spliced into the text.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Integer(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Real(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlParam::Null, Into::into)
    }
}

/// A complete statement plus its bound values, in placeholder order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SelectQuery {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        SelectQuery {
            sql: sql.into(),
            params,
        }
    }
}

/// WHERE / ORDER BY text for a filter state, without the SELECT around it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFragments {
    pub where_sql: String,
    pub order_sql: String,
    pub params: Vec<SqlParam>,
}

// ============================================================================
// QUERY BUILDER
// ============================================================================

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    source: String,
    columns: Vec<String>,
    conditions: Vec<String>,
    order_terms: Vec<String>,
    limit: Option<String>,
    params: Vec<SqlParam>,
}

impl QueryBuilder {
    pub fn select_from(source: &str) -> Self {
        QueryBuilder {
            source: source.to_string(),
            columns: Vec::new(),
            conditions: Vec::new(),
            order_terms: Vec::new(),
            limit: None,
            params: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append a computed select-list entry, e.g. `expr AS name`
    pub fn column(mut self, expr: impl Into<String>) -> Self {
        self.columns.push(expr.into());
        self
    }

    /// Bind a value and return its placeholder (`?1`, `?2`, ...)
    pub fn bind(&mut self, value: impl Into<SqlParam>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    pub fn condition(&mut self, sql: impl Into<String>) -> &mut Self {
        self.conditions.push(sql.into());
        self
    }

    pub fn eq(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        let p = self.bind(value);
        self.condition(format!("{column} = {p}"))
    }

    pub fn at_least(&mut self, expr: &str, value: impl Into<SqlParam>) -> &mut Self {
        let p = self.bind(value);
        self.condition(format!("{expr} >= {p}"))
    }

    pub fn on_or_after(&mut self, column: &str, date: chrono::NaiveDate) -> &mut Self {
        let p = self.bind(date.format("%Y-%m-%d").to_string());
        self.condition(format!("{column} >= {p}"))
    }

    pub fn on_or_before(&mut self, column: &str, date: chrono::NaiveDate) -> &mut Self {
        let p = self.bind(date.format("%Y-%m-%d").to_string());
        self.condition(format!("{column} <= {p}"))
    }

    /// Case-insensitive substring match across `text_columns`, OR-ed.
    /// Folding is ASCII only, the same as SQLite's `LOWER()`.
    /// An all-digit term also matches each of `id_columns` by equality.
    pub fn search(&mut self, term: &str, text_columns: &[&str], id_columns: &[&str]) -> &mut Self {
        let term = term.trim();
        if term.is_empty() {
            return self;
        }

        let pattern = self.bind(format!("%{}%", escape_like(&term.to_ascii_lowercase())));
        let mut alternatives: Vec<String> = text_columns
            .iter()
            .map(|column| format!("LOWER({column}) LIKE {pattern} ESCAPE '\\'"))
            .collect();

        if term.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = term.parse::<i64>() {
                if !id_columns.is_empty() {
                    let p = self.bind(id);
                    alternatives.extend(id_columns.iter().map(|column| format!("{column} = {p}")));
                }
            }
        }

        if alternatives.is_empty() {
            return self;
        }
        self.condition(format!("({})", alternatives.join(" OR ")))
    }

    /// Terms come from fixed sort tables, never from request text
    pub fn order_by(&mut self, terms: &[&str]) -> &mut Self {
        self.order_terms.extend(terms.iter().map(|t| t.to_string()));
        self
    }

    pub fn limit(&mut self, rows: usize) -> &mut Self {
        let p = self.bind(i64::try_from(rows).unwrap_or(i64::MAX));
        self.limit = Some(p);
        self
    }

    pub fn where_sql(&self) -> String {
        self.conditions.join(" AND ")
    }

    pub fn order_sql(&self) -> String {
        self.order_terms.join(", ")
    }

    pub fn fragments(&self) -> SqlFragments {
        SqlFragments {
            where_sql: self.where_sql(),
            order_sql: self.order_sql(),
            params: self.params.clone(),
        }
    }

    pub fn build(self) -> SelectQuery {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut sql = format!("SELECT {columns} FROM {}", self.source);
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_sql());
        }
        if !self.order_terms.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_sql());
        }
        if let Some(limit) = &self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(limit);
        }

        SelectQuery::new(sql, self.params)
    }
}

/// Escape LIKE wildcards so user text matches literally (paired with `ESCAPE '\'`)
pub fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ============================================================================
// TESTS
// ============================================================================
