//! The fixed statement-runner walkthrough against `some_table`.
//!
//! Each step opens its own scope, so what one step leaves behind is exactly
//! what it committed.

use std::io::Write;

use tracing::info;

use crate::{
    engine::Engine,
    error::Result,
    sqlite::{Params, Row, SqlQuery},
};

const INSERT_XY: &str = "INSERT INTO some_table (x, y) VALUES (:x, :y)";

fn xy(x: i64, y: i64) -> Params {
    Params::new().with_value("x", x).with_value("y", y)
}

fn write_xy<W: Write>(out: &mut W, row: &Row) -> Result<()> {
    writeln!(out, "x: {} y: {}", row.get::<i64>("x")?, row.get::<i64>("y")?)?;
    Ok(())
}

/// Run every step in order.
pub fn run<W: Write>(engine: &Engine, out: &mut W) -> Result<()> {
    getting_a_connection(engine, out)?;
    commit_as_you_go(engine)?;
    begin_once(engine)?;
    fetching_rows(engine, out)?;
    sending_parameters(engine, out)?;
    sending_multiple_parameters(engine)?;
    Ok(())
}

/// Nothing is written, so the scope simply rolls back on exit.
pub fn getting_a_connection<W: Write>(engine: &Engine, out: &mut W) -> Result<()> {
    info!("Getting a Connection");
    let mut conn = engine.connect();
    let rows = conn.execute(&SqlQuery::new("select 'hello world'"))?.all();
    let rendered: Vec<String> = rows.iter().map(Row::to_string).collect();
    writeln!(out, "[{}]", rendered.join(", "))?;
    Ok(())
}

pub fn commit_as_you_go(engine: &Engine) -> Result<()> {
    info!("Committing Changes: commit as you go");
    let mut conn = engine.connect();
    conn.execute(&SqlQuery::new("CREATE TABLE some_table (x int, y int)"))?;
    conn.execute_many(INSERT_XY, &[xy(1, 1), xy(2, 4)])?;
    conn.commit()
}

pub fn begin_once(engine: &Engine) -> Result<()> {
    info!("Committing Changes: begin once");
    engine.begin(|conn| {
        conn.execute_many(INSERT_XY, &[xy(6, 8), xy(9, 10)])?;
        Ok(())
    })
}

pub fn fetching_rows<W: Write>(engine: &Engine, out: &mut W) -> Result<()> {
    info!("Fetching Rows");
    let mut conn = engine.connect();
    let result = conn.execute(&SqlQuery::new("SELECT x, y FROM some_table"))?;
    for row in &result {
        write_xy(out, row)?;
    }
    Ok(())
}

pub fn sending_parameters<W: Write>(engine: &Engine, out: &mut W) -> Result<()> {
    info!("Sending Parameters");
    let mut conn = engine.connect();
    let result = conn.execute(
        &SqlQuery::new("SELECT x, y FROM some_table WHERE y > :y")
            .with_params(Params::new().with_value("y", 2)),
    )?;
    for row in &result {
        write_xy(out, row)?;
    }
    Ok(())
}

pub fn sending_multiple_parameters(engine: &Engine) -> Result<()> {
    info!("Sending Multiple Parameters");
    let mut conn = engine.connect();
    conn.execute_many(INSERT_XY, &[xy(11, 12), xy(13, 14)])?;
    conn.commit()
}
