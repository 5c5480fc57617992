//! Declarative schema mapping and scoped statement execution over embedded SQLite.
//!
//! # Intention
//!
//! - Declare tables as plain Rust structs and create them in a fresh store.
//! - Run SQL through short-lived connection and transaction scopes with
//!   named parameters and rows addressed by column name.
//!
//! # Architectural Boundaries
//!
//! - Query planning, pooling, retries and migrations belong to SQLite and
//!   `rusqlite`, not here.
//! - Only SQLite/database code and the two walkthroughs belong here.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod tutorial;

pub use config::{LoggingConfig, SqliteConfig, TutorialConfig};
pub use engine::{Connection, Engine};
pub use error::{Error, Result};
pub use sqlite::{Params, ResultSet, Row, SqlQuery, Value};
