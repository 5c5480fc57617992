use rusqlite::{
    types::{FromSql, ToSql, ToSqlOutput, ValueRef},
    Statement,
};
use std::{collections::HashMap, fmt, sync::Arc};

use crate::error::{Error, Result};

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    /// Borrow as the driver's value representation. Booleans become 0/1.
    pub fn as_value_ref(&self) -> ValueRef<'_> {
        match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
            Value::Boolean(b) => ValueRef::Integer(i64::from(*b)),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(self.as_value_ref()))
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Parameter bindings for SQL queries
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: HashMap<String, Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a named value. The name is given without its `:` prefix.
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// SQL Query with typed parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            params: Params::new(),
        }
    }
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

impl From<&str> for SqlQuery {
    fn from(statement: &str) -> Self {
        Self::new(statement)
    }
}

/// Bind every parameter the prepared statement declares from `params`.
///
/// Extra entries in `params` are ignored, the statement decides what is needed.
pub(crate) fn bind_params(stmt: &mut Statement<'_>, params: &Params) -> Result<()> {
    for index in 1..=stmt.parameter_count() {
        let name = stmt
            .parameter_name(index)
            .ok_or(Error::PositionalParameter(index))?;
        let key = name.trim_start_matches([':', '@', '$']);
        let value = params
            .get(key)
            .ok_or_else(|| Error::MissingParameter(key.to_string()))?;
        stmt.raw_bind_parameter(index, value)?;
    }
    Ok(())
}

/// Query operators for building advanced queries
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    /// `field = value`, or `field IS NULL` for [`Value::Null`]
    Equal(Value),
}

/// Query builder for composable, immutable queries.
///
/// Conditions are joined with `AND` in the order they were added.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pub conditions: Vec<(String, QueryOperator)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_condition(mut self, field: &str, op: QueryOperator) -> Self {
        self.conditions.push((field.to_string(), op));
        self
    }

    /// Render the `WHERE` clause body, adding bound values to `params`.
    /// Returns `None` when there are no conditions.
    fn render(&self, params: &mut Params) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self
            .conditions
            .iter()
            .map(|(field, op)| match op {
                QueryOperator::Equal(Value::Null) => format!("{field} IS NULL"),
                QueryOperator::Equal(value) => {
                    let name = unique_param_name(params, field);
                    params.values.insert(name.clone(), value.clone());
                    format!("{field} = :{name}")
                }
            })
            .collect();
        Some(clauses.join(" AND "))
    }
}

fn unique_param_name(params: &Params, field: &str) -> String {
    if !params.values.contains_key(field) {
        return field.to_string();
    }
    (1..)
        .map(|n| format!("{field}_{n}"))
        .find(|candidate| !params.values.contains_key(candidate))
        .unwrap_or_else(|| field.to_string())
}

/// Insert of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOperation {
    pub table: String,
    pub data: Vec<(String, Value)>,
}

impl CreateOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            data: Vec::new(),
        }
    }

    pub fn with_value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.data.push((column.to_string(), value.into()));
        self
    }

    pub fn to_sql_query(&self) -> SqlQuery {
        if self.data.is_empty() {
            return SqlQuery::new(&format!("INSERT INTO {} DEFAULT VALUES", self.table));
        }
        let columns: Vec<&str> = self.data.iter().map(|(c, _)| c.as_str()).collect();
        let placeholders: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
        let params = self.data.iter().cloned().collect();
        SqlQuery::new(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        ))
        .with_params(params)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOperation {
    pub table: String,
    pub query: Query,
    pub fields: Option<Vec<String>>,
    pub order_by: Option<Vec<(String, bool)>>, // (field, is_ascending)
}

impl ReadOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            query: Query::new(),
            fields: None,
            order_by: None,
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_order_by(mut self, field: &str, ascending: bool) -> Self {
        self.order_by
            .get_or_insert_with(Vec::new)
            .push((field.to_string(), ascending));
        self
    }

    pub fn to_sql_query(&self) -> SqlQuery {
        let mut params = Params::new();
        let fields = match &self.fields {
            Some(fields) if !fields.is_empty() => fields.join(", "),
            _ => "*".to_string(),
        };
        let mut sql = format!("SELECT {fields} FROM {}", self.table);
        if let Some(clause) = self.query.render(&mut params) {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
        if let Some(order_by) = self.order_by.as_ref().filter(|o| !o.is_empty()) {
            let terms: Vec<String> = order_by
                .iter()
                .map(|(field, asc)| format!("{field} {}", if *asc { "ASC" } else { "DESC" }))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        SqlQuery::new(&sql).with_params(params)
    }
}

/// One result row with access by column name or position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Convert the named column with the driver's own conversions.
    pub fn get<T: FromSql>(&self, column: &str) -> Result<T> {
        let value = self
            .value(column)
            .ok_or_else(|| Error::NoSuchColumn(column.to_string()))?;
        T::column_result(value.as_value_ref()).map_err(|source| Error::Conversion {
            column: column.to_string(),
            source,
        })
    }

    pub fn get_index<T: FromSql>(&self, index: usize) -> Result<T> {
        let value = self.values.get(index).ok_or(Error::NoSuchIndex(index))?;
        T::column_result(value.as_value_ref()).map_err(|source| Error::Conversion {
            column: self.columns[index].clone(),
            source,
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        if self.values.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows changed by an INSERT/UPDATE/DELETE, zero for queries
    pub rows_affected: usize,
    pub last_insert_rowid: i64,
}

impl ResultSet {
    pub fn all(self) -> Vec<Row> {
        self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Prepare, bind and run one statement on a raw driver connection.
pub(crate) fn run_statement(
    conn: &rusqlite::Connection,
    statement: &str,
    params: &Params,
) -> Result<ResultSet> {
    let mut stmt = conn.prepare_cached(statement)?;
    bind_params(&mut stmt, params)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    if columns.is_empty() {
        let rows_affected = stmt.raw_execute()?;
        return Ok(ResultSet {
            columns,
            rows: Vec::new(),
            rows_affected,
            last_insert_rowid: conn.last_insert_rowid(),
        });
    }

    let shared: Arc<[String]> = columns.clone().into();
    let mut rows = Vec::new();
    let mut cursor = stmt.raw_query();
    while let Some(row) = cursor.next()? {
        let values = (0..shared.len())
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.push(Row::new(Arc::clone(&shared), values));
    }
    Ok(ResultSet {
        columns,
        rows,
        rows_affected: 0,
        last_insert_rowid: conn.last_insert_rowid(),
    })
}

/// Run one prepared statement once per parameter set. Returns total rows changed.
pub(crate) fn run_batch(
    conn: &rusqlite::Connection,
    statement: &str,
    batch: &[Params],
) -> Result<usize> {
    let mut stmt = conn.prepare_cached(statement)?;
    let mut total = 0;
    for params in batch {
        bind_params(&mut stmt, params)?;
        total += stmt.raw_execute()?;
    }
    Ok(total)
}
