//! The engine and its connection scopes.
//!
//! An [`Engine`] owns a single SQLite connection. A `:memory:` database lives
//! and dies with that connection, so every scope handed out by the engine
//! borrows it rather than opening its own.
//!
//! Two scope styles exist:
//!
//! - [`Engine::connect`] returns a [`Connection`] that starts a transaction on
//!   its first statement. Work is kept only if [`Connection::commit`] is
//!   called; dropping the scope rolls back anything uncommitted.
//! - [`Engine::begin`] runs a closure inside a transaction, committing when it
//!   returns `Ok` and rolling back when it returns `Err` or panics.

use tracing::{debug, info, warn};

use crate::{
    config::SqliteConfig,
    error::Result,
    sqlite::{run_batch, run_statement, Params, ResultSet, SqlQuery},
};

const ECHO_TARGET: &str = "sqlite_tutorial::engine";

pub struct Engine {
    config: SqliteConfig,
    conn: rusqlite::Connection,
}

impl Engine {
    pub fn new(config: SqliteConfig) -> Result<Self> {
        let conn = if config.is_in_memory() {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(&config.db_path)?
        };
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        debug!(db_path = %config.db_path, echo = config.echo, "opened sqlite engine");
        Ok(Self { config, conn })
    }

    /// Fresh private in-memory store with default settings.
    pub fn in_memory() -> Result<Self> {
        Self::new(SqliteConfig::in_memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Open a commit-as-you-go scope.
    pub fn connect(&self) -> Connection<'_> {
        Connection {
            engine: self,
            in_transaction: false,
        }
    }

    /// Run `f` inside a transaction that commits on `Ok` and rolls back on `Err`.
    pub fn begin<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection<'_>) -> Result<T>,
    {
        let mut conn = self.connect();
        conn.autobegin()?;
        match f(&mut conn) {
            Ok(value) => {
                conn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = conn.rollback() {
                    warn!(%rollback_err, "rollback after failed scope also failed");
                }
                Err(err)
            }
        }
    }

    fn log_sql(&self, sql: &str) {
        if self.config.echo {
            info!(target: ECHO_TARGET, "{sql}");
        } else {
            debug!(target: ECHO_TARGET, "{sql}");
        }
    }

    fn log_params(&self, params: &Params) {
        if params.is_empty() {
            return;
        }
        let mut pairs: Vec<String> = params
            .values
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.sort();
        if self.config.echo {
            info!(target: ECHO_TARGET, "[{}]", pairs.join(", "));
        } else {
            debug!(target: ECHO_TARGET, "[{}]", pairs.join(", "));
        }
    }
}

/// A scope over the engine's connection.
///
/// Holds at most one open transaction. If it is still open when the scope
/// is dropped it is rolled back.
pub struct Connection<'e> {
    engine: &'e Engine,
    in_transaction: bool,
}

impl Connection<'_> {
    /// Execute one statement, binding its named parameters from `query.params`.
    pub fn execute(&mut self, query: &SqlQuery) -> Result<ResultSet> {
        self.autobegin()?;
        self.engine.log_sql(&query.statement);
        self.engine.log_params(&query.params);
        run_statement(&self.engine.conn, &query.statement, &query.params)
    }

    /// Execute one statement once per parameter set, returning the total rows changed.
    pub fn execute_many(&mut self, statement: &str, batch: &[Params]) -> Result<usize> {
        self.autobegin()?;
        self.engine.log_sql(statement);
        for params in batch {
            self.engine.log_params(params);
        }
        run_batch(&self.engine.conn, statement, batch)
    }

    pub fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.engine.log_sql("COMMIT");
            self.engine.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        if self.in_transaction {
            self.engine.log_sql("ROLLBACK");
            self.engine.conn.execute_batch("ROLLBACK")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn autobegin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Ok(());
        }
        self.engine.log_sql("BEGIN (implicit)");
        self.engine.conn.execute_batch("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.rollback() {
            warn!(%err, "failed to roll back on scope exit");
        }
    }
}
