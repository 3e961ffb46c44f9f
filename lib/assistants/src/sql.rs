//! SQLite demo databases queried by generated SQL.
//!
//! A [`Dataset`] names the tables the model may see, how to create them and
//! the demo rows seeded into an empty database. [`SqlDatabase`] opens a
//! pool, seeds it once, describes the schema in the form handed to the model
//! and runs read-only statements.

use crate::error::AssistantError;
use rootcause::prelude::Report;
use serde_json::{Map, Value as JsonValue};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Schema and demo rows of one database.
#[derive(Debug)]
pub struct Dataset {
    /// Used in logs.
    pub name: &'static str,
    /// Tables described to the model, in order. The first one decides
    /// whether the database still needs seeding.
    pub tables: &'static [&'static str],
    pub create: &'static [&'static str],
    pub seed: &'static [&'static str],
    /// Sample rows shown per table.
    pub sample_rows: usize,
}

fn database_error(err: &sqlx::Error) -> AssistantError {
    AssistantError::Database {
        reason: err.to_string(),
    }
}

/// Trims model output down to the SQL statement.
///
/// Anything before the first `SELECT` is dropped, as are Markdown fences
/// and a stray `plaintext` language tag.
#[must_use]
pub fn clean_sql(raw: &str) -> String {
    let from_select = raw
        .to_ascii_uppercase()
        .find("SELECT")
        .map_or(raw, |pos| &raw[pos..]);
    from_select
        .replace("```sql", "")
        .replace("```", "")
        .replace("plaintext", "")
        .trim()
        .to_string()
}

/// Accepts exactly one `SELECT` statement, returned without its trailing
/// semicolon.
///
/// # Errors
///
/// Returns `UnsafeSql` for anything else.
pub fn ensure_single_select(sql: &str) -> Result<&str, AssistantError> {
    let statement = sql.trim().trim_end_matches(';').trim_end();
    let starts_with_select = statement
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"));
    if starts_with_select && !statement.contains(';') {
        Ok(statement)
    } else {
        Err(AssistantError::UnsafeSql {
            sql: sql.to_string(),
        })
    }
}

fn column_value(row: &SqliteRow, index: usize) -> JsonValue {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map_or(JsonValue::Null, JsonValue::from);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map_or(JsonValue::Null, JsonValue::from);
    }
    row.try_get::<Option<String>, _>(index)
        .ok()
        .flatten()
        .map_or(JsonValue::Null, JsonValue::from)
}

fn row_to_json(row: &SqliteRow) -> Map<String, JsonValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| (column.name().to_string(), column_value(row, i)))
        .collect()
}

fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A seeded SQLite database.
#[derive(Debug, Clone)]
pub struct SqlDatabase {
    pool: SqlitePool,
    dataset: &'static Dataset,
}

impl SqlDatabase {
    /// Opens `url`, creating the file if needed, and seeds an empty
    /// database with `dataset`.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the connection or seeding fails.
    pub async fn connect(
        url: &str,
        dataset: &'static Dataset,
    ) -> Result<Self, Report<AssistantError>> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| database_error(&e))?
            .create_if_missing(true);
        // Every connection to an in-memory database sees its own copy.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| database_error(&e))?;

        let db = Self { pool, dataset };
        db.seed_if_empty().await?;
        Ok(db)
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) async fn seed_if_empty(&self) -> Result<(), Report<AssistantError>> {
        for statement in self.dataset.create.iter().copied() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;
        }

        let Some(first) = self.dataset.tables.first() else {
            return Ok(());
        };
        let existing: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {first}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;
        if existing > 0 {
            debug!(dataset = self.dataset.name, existing, "database already populated");
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| database_error(&e))?;
        for statement in self.dataset.seed.iter().copied() {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| database_error(&e))?;
        }
        tx.commit().await.map_err(|e| database_error(&e))?;
        info!(dataset = self.dataset.name, "seeded database with demo rows");
        Ok(())
    }

    /// Table definitions followed by a few sample rows each, in the form
    /// handed to the model.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the catalog cannot be read.
    pub async fn schema_description(&self) -> Result<String, Report<AssistantError>> {
        let limit = self.dataset.sample_rows;
        let mut sections = Vec::with_capacity(self.dataset.tables.len());
        for table in self.dataset.tables.iter().copied() {
            let create: String = sqlx::query_scalar(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;

            let rows = sqlx::query(&format!("SELECT * FROM {table} LIMIT {limit}"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;

            let header = rows.first().map_or_else(String::new, |row| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect::<Vec<_>>()
                    .join("\t")
            });
            let samples = rows
                .iter()
                .map(|row| {
                    (0..row.columns().len())
                        .map(|i| display_value(&column_value(row, i)))
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect::<Vec<_>>()
                .join("\n");

            sections.push(format!(
                "{}\n\n/*\n{} rows from {table} table:\n{header}\n{samples}\n*/",
                create.trim(),
                rows.len()
            ));
        }
        Ok(sections.join("\n\n"))
    }

    /// Runs a single `SELECT` and returns its rows as JSON objects.
    ///
    /// # Errors
    ///
    /// Returns `UnsafeSql` for any other statement, or `Database` if
    /// execution fails.
    #[instrument(skip(self), fields(dataset = self.dataset.name))]
    pub async fn run_select(
        &self,
        sql: &str,
    ) -> Result<Vec<Map<String, JsonValue>>, Report<AssistantError>> {
        let statement = ensure_single_select(sql)?;
        let rows = sqlx::query(statement)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;
        info!(rows = rows.len(), "query executed");
        Ok(rows.iter().map(row_to_json).collect())
    }
}
