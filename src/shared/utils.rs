use std::collections::HashSet;

use serde_json::Value;

#[cfg(feature = "postgres")]
use anyhow::{Context, Result};
#[cfg(feature = "postgres")]
use diesel::{
    r2d2::{ConnectionManager, Pool},
    Connection, PgConnection,
};

#[cfg(feature = "postgres")]
use crate::config::AppConfig;

#[cfg(feature = "postgres")]
pub type DbPool = Pool<ConnectionManager<PgConnection>>;

#[cfg(feature = "postgres")]
pub fn establish_pg_connection(config: &AppConfig) -> Result<PgConnection> {
    let database_url = config.database_url();
    PgConnection::establish(&database_url)
        .with_context(|| format!("Failed to connect to database at {}", database_url))
}

#[cfg(feature = "postgres")]
pub fn create_conn(config: &AppConfig) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(config.database_url());
    Pool::builder()
        .build(manager)
        .context("Failed to build database connection pool")
}

/// Normalize a duck-typed organizational-unit membership column into a typed
/// id set. Legacy rows hold native JSON arrays, JSON-encoded array strings
/// (double-encoded), bare numbers, or comma-separated text; anything
/// unparseable contributes nothing.
pub fn parse_unit_ids(raw: &str) -> HashSet<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return HashSet::new();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items.iter().filter_map(value_to_id).collect(),
        Ok(Value::String(inner)) => parse_unit_ids(&inner),
        Ok(Value::Number(n)) => n.as_i64().map(|v| v as i32).into_iter().collect(),
        _ => trimmed
            .split(',')
            .filter_map(|part| part.trim().parse::<i32>().ok())
            .collect(),
    }
}

fn value_to_id(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().map(|v| v as i32),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}
