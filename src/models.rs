//! The `user_account`/`address` mapping.
//!
//! Each model is a plain struct whose table shape is declared by
//! [`Model::table_definition`]. The one-to-many association is stored on the
//! child as `Address::user_id`; the parent keeps its addresses in a `Vec`
//! that is filled by [`User::load_addresses`] or by [`User::add_address`].
//!
//! Writes never touch the struct. An id only exists once the enclosing scope
//! commits, so [`insert`] and [`User::save`] return the assigned ids and the
//! caller applies them after the commit succeeds.

use std::fmt;

use crate::{
    engine::Connection,
    error::Result,
    schema::{ColumnDefinition, DataType, ForeignKey, Schema, TableDefinition},
    sqlite::{CreateOperation, Query, QueryOperator, ReadOperation, Row, Value},
};

/// A struct mapped onto one table with an integer `id` primary key.
pub trait Model: Sized {
    const TABLE: &'static str;

    fn table_definition() -> TableDefinition;

    /// `None` until the row has been inserted.
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    fn from_row(row: &Row) -> Result<Self>;

    /// Column values to insert, without the primary key.
    fn column_values(&self) -> Vec<(String, Value)>;
}

/// Insert `model` and return the id the database assigned.
pub fn insert<M: Model>(conn: &mut Connection<'_>, model: &M) -> Result<i64> {
    let op = model
        .column_values()
        .into_iter()
        .fold(CreateOperation::new(M::TABLE), |op, (column, value)| {
            op.with_value(&column, value)
        });
    let result = conn.execute(&op.to_sql_query())?;
    Ok(result.last_insert_rowid)
}

/// Rows of `M` matching `query`, ordered by id.
pub fn select_where<M: Model>(conn: &mut Connection<'_>, query: Query) -> Result<Vec<M>> {
    let definition = M::table_definition();
    let op = ReadOperation::new(M::TABLE)
        .with_fields(definition.column_names())
        .with_query(query)
        .with_order_by("id", true);
    let result = conn.execute(&op.to_sql_query())?;
    result.iter().map(M::from_row).collect()
}

pub fn get<M: Model>(conn: &mut Connection<'_>, id: i64) -> Result<Option<M>> {
    let query = Query::new().with_condition("id", QueryOperator::Equal(Value::Integer(id)));
    Ok(select_where(conn, query)?.into_iter().next())
}

/// The schema holding every mapped table.
pub fn metadata() -> Schema {
    Schema::new()
        .add_table(User::table_definition())
        .add_table(Address::table_definition())
}

/// Ids assigned by [`User::save`], in the order of `User::addresses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedUser {
    pub user_id: i64,
    pub address_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub fullname: Option<String>,
    pub addresses: Vec<Address>,
}

impl User {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            fullname: None,
            addresses: Vec::new(),
        }
    }

    pub fn with_fullname(mut self, fullname: &str) -> Self {
        self.fullname = Some(fullname.to_string());
        self
    }

    /// Append to the collection, pointing the address at this user if it has an id.
    pub fn add_address(&mut self, mut address: Address) {
        if let Some(id) = self.id {
            address.user_id = Some(id);
        }
        self.addresses.push(address);
    }

    /// Insert the user if new, then every address not yet stored.
    ///
    /// Returns the ids to [`apply`](User::apply) once the scope has committed.
    pub fn save(&self, conn: &mut Connection<'_>) -> Result<SavedUser> {
        let user_id = match self.id() {
            Some(id) => id,
            None => insert(conn, self)?,
        };
        let mut address_ids = Vec::with_capacity(self.addresses.len());
        for address in &self.addresses {
            let id = match address.id() {
                Some(id) => id,
                None => {
                    let mut owned = address.clone();
                    owned.user_id = Some(user_id);
                    insert(conn, &owned)?
                }
            };
            address_ids.push(id);
        }
        Ok(SavedUser {
            user_id,
            address_ids,
        })
    }

    /// Record ids from a committed [`save`](User::save).
    pub fn apply(&mut self, saved: &SavedUser) {
        self.set_id(saved.user_id);
        for (address, id) in self.addresses.iter_mut().zip(&saved.address_ids) {
            address.set_id(*id);
            address.user_id = Some(saved.user_id);
        }
    }

    /// Replace the in-memory collection with what is stored.
    pub fn load_addresses(&mut self, conn: &mut Connection<'_>) -> Result<()> {
        self.addresses = match self.id {
            Some(id) => select_where(
                conn,
                Query::new().with_condition("user_id", QueryOperator::Equal(Value::Integer(id))),
            )?,
            None => Vec::new(),
        };
        Ok(())
    }
}

impl Model for User {
    const TABLE: &'static str = "user_account";

    fn table_definition() -> TableDefinition {
        TableDefinition::new(Self::TABLE)
            .with_column(ColumnDefinition::new("id", DataType::Integer).not_null())
            .with_column(ColumnDefinition::new("name", DataType::Varchar(Some(30))).not_null())
            .with_column(ColumnDefinition::new("fullname", DataType::Varchar(None)))
            .with_primary_key(["id"])
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            fullname: row.get("fullname")?,
            addresses: Vec::new(),
        })
    }

    fn column_values(&self) -> Vec<(String, Value)> {
        vec![
            ("name".to_string(), Value::from(self.name.as_str())),
            ("fullname".to_string(), Value::from(self.fullname.clone())),
        ]
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User(id={}, name={}, fullname={})",
            Value::from(self.id),
            Value::from(self.name.as_str()),
            Value::from(self.fullname.clone())
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: Option<i64>,
    pub email_address: String,
    pub user_id: Option<i64>,
}

impl Address {
    pub fn new(email_address: &str) -> Self {
        Self {
            id: None,
            email_address: email_address.to_string(),
            user_id: None,
        }
    }

    /// Load the owning user, if the address has one.
    pub fn user(&self, conn: &mut Connection<'_>) -> Result<Option<User>> {
        match self.user_id {
            Some(user_id) => get(conn, user_id),
            None => Ok(None),
        }
    }
}

impl Model for Address {
    const TABLE: &'static str = "address";

    fn table_definition() -> TableDefinition {
        TableDefinition::new(Self::TABLE)
            .with_column(ColumnDefinition::new("id", DataType::Integer).not_null())
            .with_column(ColumnDefinition::new("email_address", DataType::Varchar(None)).not_null())
            .with_column(ColumnDefinition::new("user_id", DataType::Integer))
            .with_primary_key(["id"])
            .with_foreign_key(ForeignKey::new("user_id", User::TABLE, "id"))
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            email_address: row.get("email_address")?,
            user_id: row.get("user_id")?,
        })
    }

    fn column_values(&self) -> Vec<(String, Value)> {
        vec![
            ("email_address".to_string(), Value::from(self.email_address.as_str())),
            ("user_id".to_string(), Value::from(self.user_id)),
        ]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Address(id={}, email_address={})",
            Value::from(self.id),
            Value::from(self.email_address.as_str())
        )
    }
}
