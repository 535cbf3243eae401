//! Filter-driven, paginated search.
//!
//! A [`Filter`] reports its non-empty fields as `(name, value)` pairs. For
//! each pair the [`Search`] either handles it in
//! [`Search::override_filter`] (which may add joins, predicates and ranking)
//! or applies plain equality on the column it declares for that name.
//! [`Search::results`] and [`Search::count`] are both rendered from the same
//! [`SearchQuery`], so a page and its total always agree.

pub mod announcement_search;
pub mod game_search;

pub use announcement_search::{AnnouncementFilter, AnnouncementSearch};
pub use game_search::{GameFilter, GameSearch};

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::config::SearchSettings;
use crate::error::{AppError, Result};

const MIN_QUERY_LENGTH: usize = 2;
const MAX_QUERY_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Uuid(Uuid),
}

impl FilterValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            FilterValue::Uuid(_) => None,
        }
    }
}

pub trait Filter {
    /// Non-empty fields in declaration order.
    fn values(&self) -> Vec<(&'static str, FilterValue)>;
}

enum Part {
    Sql(String),
    Bind(FilterValue),
}

/// A SQL fragment with its bound values kept in place.
pub struct Clause(Vec<Part>);

impl Clause {
    pub fn new(sql: impl Into<String>) -> Self {
        Clause(vec![Part::Sql(sql.into())])
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.0.push(Part::Sql(sql.into()));
        self
    }

    pub fn bind(mut self, value: FilterValue) -> Self {
        self.0.push(Part::Bind(value));
        self
    }

    fn write(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        for part in &self.0 {
            match part {
                Part::Sql(sql) => {
                    builder.push(sql);
                }
                Part::Bind(FilterValue::Text(s)) => {
                    builder.push_bind(s.clone());
                }
                Part::Bind(FilterValue::Uuid(id)) => {
                    builder.push_bind(id.to_string());
                }
            }
        }
    }
}

/// Joins, predicates and ranking produced by applying a filter.
#[derive(Default)]
pub struct SearchQuery {
    joins: Vec<&'static str>,
    conditions: Vec<Clause>,
    ranks: Vec<Clause>,
}

impl SearchQuery {
    pub fn join(&mut self, join: &'static str) {
        if !self.joins.contains(&join) {
            self.joins.push(join);
        }
    }

    pub fn filter(&mut self, clause: Clause) {
        self.conditions.push(clause);
    }

    /// Adds an ordering term evaluated before the search's default order.
    pub fn rank(&mut self, clause: Clause) {
        self.ranks.push(clause);
    }

    fn push_base(&self, builder: &mut QueryBuilder<'static, Sqlite>, columns: &str, source: &str) {
        builder.push("SELECT ");
        builder.push(columns);
        builder.push(" FROM ");
        builder.push(source);
        for join in &self.joins {
            builder.push(" ");
            builder.push(*join);
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            condition.write(builder);
        }
    }

    pub fn results_sql(
        &self,
        columns: &str,
        source: &str,
        default_order: &str,
        skip: i64,
        limit: i64,
    ) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("");
        self.push_base(&mut builder, columns, source);
        builder.push(" ORDER BY ");
        for rank in &self.ranks {
            rank.write(&mut builder);
            builder.push(", ");
        }
        builder.push(default_order);
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(skip);
        builder
    }

    pub fn count_sql(&self, columns: &str, source: &str) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM (");
        self.push_base(&mut builder, columns, source);
        builder.push(")");
        builder
    }
}

#[async_trait]
pub trait Search: Send + Sync {
    type Filter: Filter + Send + Sync;
    type Row: for<'r> FromRow<'r, SqliteRow> + Send + Unpin;
    type Item: Send;

    fn pool(&self) -> &SqlitePool;

    /// Table (with alias) the search selects from.
    fn source(&self) -> &'static str;

    fn columns(&self) -> &'static str;

    fn default_order(&self) -> &'static str;

    /// Column used for plain equality on `field`, if the search allows it.
    fn equality_column(&self, field: &str) -> Option<&'static str>;

    /// Custom handling for `field`. Returns `true` when the field was consumed.
    fn override_filter(&self, _field: &str, _value: &FilterValue, _query: &mut SearchQuery) -> Result<bool> {
        Ok(false)
    }

    fn into_item(row: Self::Row) -> Result<Self::Item>;

    fn apply_filters(&self, filter: &Self::Filter) -> Result<SearchQuery> {
        let mut query = SearchQuery::default();
        for (field, value) in filter.values() {
            if self.override_filter(field, &value, &mut query)? {
                continue;
            }
            let column = self.equality_column(field).ok_or_else(|| {
                AppError::Internal(format!("No filter defined for field '{}'", field))
            })?;
            query.filter(Clause::new(format!("{column} = ")).bind(value));
        }
        Ok(query)
    }

    async fn results(&self, filter: &Self::Filter, skip: i64, limit: i64) -> Result<Vec<Self::Item>> {
        let query = self.apply_filters(filter)?;
        let mut builder =
            query.results_sql(self.columns(), self.source(), self.default_order(), skip, limit);

        let rows = builder
            .build_query_as::<Self::Row>()
            .fetch_all(self.pool())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::into_item).collect()
    }

    async fn count(&self, filter: &Self::Filter) -> Result<i64> {
        let query = self.apply_filters(filter)?;
        let mut builder = query.count_sql(self.columns(), self.source());

        let (count,): (i64,) = builder
            .build_query_as()
            .fetch_one(self.pool())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }
}

/// `skip` / `limit` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Resolves to `(skip, limit)` with the limit clamped to `1..=max_limit`.
    pub fn resolve(&self, settings: &SearchSettings) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self
            .limit
            .unwrap_or(settings.default_limit)
            .clamp(1, settings.max_limit);
        (skip, limit)
    }
}

/// Normalizes a free-text query. Queries shorter than two characters after
/// trimming are ignored.
pub fn normalize_query(q: &str) -> Result<Option<String>> {
    let q = q.trim();
    if q.chars().count() > MAX_QUERY_LENGTH {
        return Err(AppError::Validation(format!(
            "Search query must be at most {} characters",
            MAX_QUERY_LENGTH
        )));
    }
    if q.chars().count() < MIN_QUERY_LENGTH {
        return Ok(None);
    }
    Ok(Some(fold_case(q)))
}

/// Unicode case folding shared by stored search columns and queries.
/// SQLite's `LOWER()` only folds ASCII, so text search compares values
/// folded here on both sides.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// `%q%` with LIKE wildcards escaped by `\`.
pub fn like_pattern(q: &str) -> String {
    let mut escaped = String::with_capacity(q.len() + 2);
    escaped.push('%');
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
