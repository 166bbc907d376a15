//! Walks through every builder operation against a scratch database.
//!
//! ```text
//! RUST_LOG=debug cargo run --example walkthrough
//! ```

use anyhow::Result;
use rust_sqlite_builder::{DataType, Match, SqliteConfig, StatementBuilder, TableDefinition};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let config = SqliteConfig::new(dir.path().join("testing").to_string_lossy());

    let a = StatementBuilder::open(
        config.clone(),
        TableDefinition::new("testing")
            .add_column("a", DataType::Integer)
            .add_column("b", DataType::Text)
            .add_column("c", DataType::Text)
            .add_column("d", DataType::Text),
    )?;
    let b = StatementBuilder::open(
        config.clone(),
        TableDefinition::from_pairs("testing2", [("e", "text"), ("f", "text"), ("g", "text"), ("h", "text")])?,
    )?;
    for i in 0..100i64 {
        a.insert_row([1 + i, 2 + i, 3 + i, 4 + i])?;
        b.insert_row([1 + i, 2 + i, 3 + i, 4 + i])?;
    }
    let c = StatementBuilder::open_existing(config, "testing")?;
    println!("column names: {:?} {:?} {:?}", a.column_names(), b.column_names(), c.column_names());

    println!("select all: {} rows", a.select_all().fetch_all()?.len());

    let stmt = a.custom_sql("SELECT * FROM testing WHERE a < ?").bind(3);
    println!("{}", stmt.sql());
    println!("  {:?}", stmt.fetch_all()?);

    let stmt = a.select_where_equals("a", "c", 4)?;
    println!("{}", stmt.sql());
    println!("  {:?}", stmt.fetch_all()?);

    let stmt = a.select_where_like("a, b", "c", "%4%")?;
    println!("{}", stmt.sql());
    println!("  {} rows", stmt.fetch_all()?.len());

    let stmt = a.select_where("a, b", "c")?.between([2, 30], None)?;
    println!("{}", stmt.sql());
    println!("  {} rows", stmt.fetch_all()?.len());

    let stmt = a.select_where_like("a, b", "c", "%1%")?.between([2, 30], Some("d"))?;
    println!("{}", stmt.sql());
    println!("  {} rows", stmt.fetch_all()?.len());

    let stmt = a
        .select_where_equals("a, b, c", "c", 4)?
        .and_where([("d", 5), ("a", 2)], Match::Is)?;
    println!("{}", stmt.sql());
    println!("  {:?}", stmt.fetch_all()?);

    let stmt = a
        .select_where_like("a, b", "c", 4)?
        .and_where([("d", 5), ("a", 3)], Match::Like)?
        .or_where([("a", 5), ("b", 3)], Match::Like)?;
    println!("{}", stmt.sql());
    println!("  {:?}", stmt.fetch_all()?);

    let stmt = a
        .update([("a", "a"), ("b", "b"), ("c", "c"), ("d", "d")], [("a", 1)])?
        .and_where([("b", 2), ("c", 3), ("d", 4)], Match::Is)?;
    println!("{}", stmt.sql());
    println!("  {} changed", stmt.commit()?);

    Ok(())
}
