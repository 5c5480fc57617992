//! Table declarations, DDL rendering and catalog inspection.
//!
//! A [`Schema`] is plain data. [`Schema::create_all`] turns it into
//! `CREATE TABLE` statements and runs them in a single transaction,
//! skipping tables that already exist.

use std::{collections::HashSet, fmt};

use tracing::{debug, info};

use crate::{
    engine::{Connection, Engine},
    error::Result,
    sqlite::{Params, SqlQuery},
};

/// Schema definition for the SQLite database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }
    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Tables ordered so that every table comes after the tables its foreign
    /// keys reference. Declaration order is kept otherwise; references to
    /// tables outside the schema and reference cycles are ignored.
    pub fn sorted_tables(&self) -> Vec<&TableDefinition> {
        fn visit<'a>(
            schema: &'a Schema,
            table: &'a TableDefinition,
            seen: &mut HashSet<&'a str>,
            out: &mut Vec<&'a TableDefinition>,
        ) {
            if !seen.insert(table.name.as_str()) {
                return;
            }
            for fk in &table.foreign_keys {
                if let Some(parent) = schema.table(&fk.foreign_table) {
                    visit(schema, parent, seen, out);
                }
            }
            out.push(table);
        }

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            visit(self, table, &mut seen, &mut out);
        }
        out
    }

    /// Every DDL statement `create_all` would run on an empty store.
    pub fn create_statements(&self) -> Vec<String> {
        self.sorted_tables()
            .into_iter()
            .map(TableDefinition::create_sql)
            .collect()
    }

    /// Create every missing table in one transaction.
    pub fn create_all(&self, engine: &Engine) -> Result<()> {
        engine.begin(|conn| self.create_all_in(conn))
    }

    /// As [`Schema::create_all`], inside a scope the caller already holds.
    pub fn create_all_in(&self, conn: &mut Connection<'_>) -> Result<()> {
        for table in self.sorted_tables() {
            if table_exists(conn, &table.name)? {
                debug!(table = %table.name, "table exists, skipping");
                continue;
            }
            info!(table = %table.name, "creating table");
            conn.execute(&SqlQuery::new(&table.create_sql()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDefinition::to_sql).collect();
        if !self.primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", self.primary_key.join(", ")));
        }
        parts.extend(self.foreign_keys.iter().map(ForeignKey::to_sql));
        format!("CREATE TABLE {} (\n\t{}\n)", self.name, parts.join(", \n\t"))
    }

}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn not_null(self) -> Self {
        self.with_constraint(ColumnConstraint::NotNull)
    }

    pub fn is_nullable(&self) -> bool {
        !self.constraints.iter().any(|c| {
            matches!(c, ColumnConstraint::NotNull | ColumnConstraint::PrimaryKey)
        })
    }

    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.data_type);
        for constraint in &self.constraints {
            sql.push(' ');
            sql.push_str(match constraint {
                ColumnConstraint::PrimaryKey => "PRIMARY KEY",
                ColumnConstraint::NotNull => "NOT NULL",
                ColumnConstraint::Unique => "UNIQUE",
            });
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Integer,
    Text,
    /// Bounded text; SQLite stores the length but does not enforce it
    Varchar(Option<u32>),
    Real,
    Blob,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => f.write_str("INTEGER"),
            DataType::Text => f.write_str("TEXT"),
            DataType::Varchar(Some(len)) => write!(f, "VARCHAR({len})"),
            DataType::Varchar(None) => f.write_str("VARCHAR"),
            DataType::Real => f.write_str("REAL"),
            DataType::Blob => f.write_str("BLOB"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new(column: &str, foreign_table: &str, foreign_column: &str) -> Self {
        Self {
            column: column.to_string(),
            foreign_table: foreign_table.to_string(),
            foreign_column: foreign_column.to_string(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "FOREIGN KEY({}) REFERENCES {} ({})",
            self.column, self.foreign_table, self.foreign_column
        );
        if self.on_delete != ForeignKeyAction::NoAction {
            sql.push_str(&format!(" ON DELETE {}", self.on_delete));
        }
        if self.on_update != ForeignKeyAction::NoAction {
            sql.push_str(&format!(" ON UPDATE {}", self.on_update));
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForeignKeyAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
        })
    }
}

/// A column as the store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

/// A foreign key as the store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyInfo {
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

pub fn table_exists(conn: &mut Connection<'_>, table: &str) -> Result<bool> {
    let result = conn.execute(
        &SqlQuery::new("SELECT name FROM sqlite_master WHERE type = 'table' AND name = :name")
            .with_params(Params::new().with_value("name", table)),
    )?;
    Ok(!result.is_empty())
}

/// User tables in the store, sorted by name.
pub fn table_names(conn: &mut Connection<'_>) -> Result<Vec<String>> {
    let result = conn.execute(&SqlQuery::new(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    ))?;
    result.iter().map(|row| row.get("name")).collect()
}

/// Columns of `table` in declaration order. Empty if the table does not exist.
pub fn columns(conn: &mut Connection<'_>, table: &str) -> Result<Vec<ColumnInfo>> {
    let result = conn.execute(
        &SqlQuery::new(
            "SELECT name, type, \"notnull\", pk FROM pragma_table_info(:table) ORDER BY cid",
        )
        .with_params(Params::new().with_value("table", table)),
    )?;
    result
        .iter()
        .map(|row| {
            Ok(ColumnInfo {
                name: row.get("name")?,
                declared_type: row.get("type")?,
                not_null: row.get("notnull")?,
                primary_key: row.get::<i64>("pk")? != 0,
            })
        })
        .collect()
}

pub fn foreign_keys(conn: &mut Connection<'_>, table: &str) -> Result<Vec<ForeignKeyInfo>> {
    let result = conn.execute(
        &SqlQuery::new(
            "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(:table) \
             ORDER BY id, seq",
        )
        .with_params(Params::new().with_value("table", table)),
    )?;
    result
        .iter()
        .map(|row| {
            Ok(ForeignKeyInfo {
                column: row.get("from")?,
                foreign_table: row.get("table")?,
                foreign_column: row.get("to")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> TableDefinition {
        TableDefinition::new("parent")
            .with_column(ColumnDefinition::new("id", DataType::Integer).not_null())
            .with_primary_key(["id"])
    }

    fn child() -> TableDefinition {
        TableDefinition::new("child")
            .with_column(ColumnDefinition::new("id", DataType::Integer).not_null())
            .with_column(ColumnDefinition::new("parent_id", DataType::Integer))
            .with_column(ColumnDefinition::new("note", DataType::Text))
            .with_primary_key(["id"])
            .with_foreign_key(
                ForeignKey::new("parent_id", "parent", "id").on_delete(ForeignKeyAction::Cascade),
            )
    }

    #[test]
    fn children_sort_after_parents() {
        let schema = Schema::new().add_table(child()).add_table(parent());
        let names: Vec<&str> = schema
            .sorted_tables()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, ["parent", "child"]);
    }

    #[test]
    fn reference_cycles_do_not_loop() {
        let a = TableDefinition::new("a").with_foreign_key(ForeignKey::new("b_id", "b", "id"));
        let b = TableDefinition::new("b").with_foreign_key(ForeignKey::new("a_id", "a", "id"));
        let schema = Schema::new().add_table(a).add_table(b);
        assert_eq!(schema.sorted_tables().len(), 2);
    }

    #[test]
    fn create_sql_renders_table_constraints() {
        assert_eq!(
            child().create_sql(),
            "CREATE TABLE child (\n\
             \tid INTEGER NOT NULL, \n\
             \tparent_id INTEGER, \n\
             \tnote TEXT, \n\
             \tPRIMARY KEY (id), \n\
             \tFOREIGN KEY(parent_id) REFERENCES parent (id) ON DELETE CASCADE\n\
             )"
        );
    }

    #[test]
    fn create_statements_follow_dependency_order() {
        let schema = Schema::new().add_table(child()).add_table(parent());
        let statements = schema.create_statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE parent"));
        assert!(statements[1].starts_with("CREATE TABLE child"));
    }

    #[test]
    fn column_constraints_render_inline() {
        let column = ColumnDefinition::new("status", DataType::Varchar(Some(8)))
            .with_constraint(ColumnConstraint::Unique);
        assert_eq!(column.to_sql(), "status VARCHAR(8) UNIQUE");
        assert!(column.is_nullable());
        assert!(!ColumnDefinition::new("id", DataType::Integer)
            .with_constraint(ColumnConstraint::PrimaryKey)
            .is_nullable());
    }
}
