//! Query model: filters, ordering, paging, and the paginated response.
//!
//! Everything here is backend-agnostic. Column names must be plain
//! identifiers since they are spliced into SQL by name; filter values
//! always bind as parameters.

pub mod paged;
pub mod parse;

use std::fmt;

use anyhow::{Result, bail};

/// A validated column identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column(String);

impl Column {
    /// Accepts plain identifiers only: `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !head_ok || !tail_ok {
            bail!("invalid column name: {name:?}");
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a relational table or view, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef(Column);

impl TableRef {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self(Column::new(name)?))
    }

    pub fn name(&self) -> &str {
        self.0.as_str()
    }
}

/// A scalar value in a filter or a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Real(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Comparison operators a filter can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// IS NULL / IS NOT NULL take no right-hand side.
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

/// One conjunct of a filter list. Lists of filters always compose with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: Column,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: &str, op: FilterOp, value: Value) -> Result<Self> {
        Ok(Self {
            column: Column::new(column)?,
            op,
            value,
        })
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, FilterOp::Eq, value.into())
    }

    pub fn ne(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, FilterOp::Ne, value.into())
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, FilterOp::Gt, value.into())
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, FilterOp::Lt, value.into())
    }

    pub fn like(column: &str, pattern: impl Into<String>) -> Result<Self> {
        Self::new(column, FilterOp::Like, Value::Text(pattern.into()))
    }

    pub fn is_null(column: &str) -> Result<Self> {
        Self::new(column, FilterOp::IsNull, Value::Null)
    }

    pub fn is_not_null(column: &str) -> Result<Self> {
        Self::new(column, FilterOp::IsNotNull, Value::Null)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.takes_value() {
            write!(f, "{} {} {}", self.column, self.op.sql(), self.value)
        } else {
            write!(f, "{} {}", self.column, self.op.sql())
        }
    }
}

/// Ordering direction for sorted queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A single ordering expression applied before paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: Column,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: &str) -> Result<Self> {
        Ok(Self {
            column: Column::new(column)?,
            direction: Direction::Asc,
        })
    }

    pub fn desc(column: &str) -> Result<Self> {
        Ok(Self {
            column: Column::new(column)?,
            direction: Direction::Desc,
        })
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction.sql().to_lowercase())
    }
}

/// A computed column merged into the row projection, e.g.
/// `SelectExpr::new("length(data)", "size")`.
///
/// The expression is caller-constructed SQL and is trusted as such;
/// the alias goes through identifier validation like any column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectExpr {
    pub expr: String,
    pub alias: Column,
}

impl SelectExpr {
    pub fn new(expr: &str, alias: &str) -> Result<Self> {
        Ok(Self {
            expr: expr.to_string(),
            alias: Column::new(alias)?,
        })
    }
}

/// Everything a backend needs to materialize the filtered base relation
/// and derive a page or a count from it.
///
/// The base relation is `table`'s columns plus `additional_columns`,
/// restricted to `base_filters`. `filters`, `order_by`, `limit` and
/// `offset` apply on top of that relation, which is why filters may
/// reference computed aliases.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub table: TableRef,
    pub additional_columns: Vec<SelectExpr>,
    pub base_filters: Vec<Filter>,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    /// A bare scan of `table` with no filters and no paging.
    pub fn table(table: TableRef) -> Self {
        Self {
            table,
            additional_columns: Vec::new(),
            base_filters: Vec::new(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
        }
    }
}

/// One result row: column/value pairs in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One page of rows plus the counts the caller needs to render it.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    /// At most one page of rows, in query order.
    pub items: Vec<T>,
    /// Rows matching base filters plus additional filters.
    pub total_count: u64,
    /// True iff at least one row matches the base filters alone.
    /// Distinguishes "nothing matches these filters" from "the scope
    /// is empty".
    pub any_in_scope: bool,
}

impl<T> Paginated<T> {
    /// Number of pages the total spans at the given page size.
    pub fn total_pages(&self, page_size: u32) -> u64 {
        if page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(page_size))
    }
}

/// Counts from queries run in one shell session.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryStats {
    pub queries: u64,
    pub rows: u64,
}

impl QueryStats {
    /// Record one executed page query and the rows it returned.
    pub fn record(&mut self, rows: u64) {
        self.queries += 1;
        self.rows += rows;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_accepts_identifiers() {
        assert!(Column::new("created_at").is_ok());
        assert!(Column::new("_hidden").is_ok());
        assert!(Column::new("c0l").is_ok());
    }

    #[test]
    fn column_rejects_non_identifiers() {
        assert!(Column::new("").is_err());
        assert!(Column::new("1st").is_err());
        assert!(Column::new("name; DROP TABLE datasets").is_err());
        assert!(Column::new("a-b").is_err());
        assert!(Column::new("data->>'x'").is_err());
    }

    #[test]
    fn filter_display_with_and_without_value() {
        let f = Filter::gt("score", 3i64).unwrap();
        assert_eq!(f.to_string(), "score > 3");

        let f = Filter::is_null("target").unwrap();
        assert_eq!(f.to_string(), "target IS NULL");
    }

    #[test]
    fn select_expr_validates_alias_only() {
        assert!(SelectExpr::new("length(data)", "size").is_ok());
        assert!(SelectExpr::new("length(data)", "si ze").is_err());
    }

    #[test]
    fn row_get_by_name() {
        let mut row = Row::default();
        row.push("id", Value::text("abc"));
        row.push("n", Value::Integer(7));

        assert_eq!(row.get("n"), Some(&Value::Integer(7)));
        assert!(row.get("missing").is_none());
        assert_eq!(row.columns().len(), 2);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Paginated::<()> {
            items: vec![],
            total_count: 41,
            any_in_scope: true,
        };
        assert_eq!(page.total_pages(20), 3);
        assert_eq!(page.total_pages(41), 1);

        let empty = Paginated::<()> {
            items: vec![],
            total_count: 0,
            any_in_scope: false,
        };
        assert_eq!(empty.total_pages(20), 0);
    }

    #[test]
    fn stats_accumulate() {
        let mut stats = QueryStats::default();
        stats.record(10);
        stats.record(3);
        assert_eq!(stats.queries, 2);
        assert_eq!(stats.rows, 13);
    }
}
