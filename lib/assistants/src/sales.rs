//! Free-form sales questions answered with generated SQL over the store
//! database of products and orders.

use crate::error::AssistantError;
use crate::sql::{Dataset, SqlDatabase, clean_sql};
use rootcause::prelude::{Report, ResultExt};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use switchboard_ai::{LlmBackend, LlmCall};
use switchboard_core::require_text;
use tracing::{info, instrument};

/// Row cap suggested to the model when the question names none.
pub const TOP_K: usize = 5;

const CREATE_TABLES: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS products (
        ProductID INTEGER PRIMARY KEY,
        ProductName TEXT NOT NULL,
        Category TEXT NOT NULL,
        Price INTEGER NOT NULL,
        StockQuantity INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS orders (
        OrderID INTEGER PRIMARY KEY,
        ProductID INTEGER NOT NULL REFERENCES products (ProductID),
        QuantityOrdered INTEGER NOT NULL,
        OrderDate TEXT NOT NULL
    )
    ",
];

const SEED_ROWS: &[&str] = &[
    r"
    INSERT INTO products (ProductID, ProductName, Category, Price, StockQuantity) VALUES
        (1, 'Laptop', 'Electronics', 1200, 50),
        (2, 'Mouse', 'Electronics', 25, 200),
        (3, 'Keyboard', 'Electronics', 75, 150),
        (4, 'Monitor', 'Electronics', 300, 80),
        (5, 'Webcam', 'Peripherals', 50, 300)
    ",
    r"
    INSERT INTO orders (OrderID, ProductID, QuantityOrdered, OrderDate) VALUES
        (101, 1, 1, '2023-01-15 00:00:00'),
        (102, 2, 2, '2023-01-17 00:00:00'),
        (103, 2, 1, '2023-02-05 00:00:00'),
        (104, 4, 1, '2023-02-20 00:00:00')
    ",
];

/// Store products and their orders.
pub static SALES: Dataset = Dataset {
    name: "sales",
    tables: &["products", "orders"],
    create: CREATE_TABLES,
    seed: SEED_ROWS,
    sample_rows: 2,
};

/// Result of one sales question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesAnswer {
    pub question: String,
    pub sql: String,
    pub rows: Vec<Map<String, JsonValue>>,
}

/// The sales text-to-SQL assistant.
#[derive(Clone)]
pub struct SalesAnalyst {
    backend: Arc<dyn LlmBackend>,
    database: SqlDatabase,
}

impl SalesAnalyst {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, database: SqlDatabase) -> Self {
        Self { backend, database }
    }

    async fn write_sql(&self, question: &str) -> Result<String, Report<AssistantError>> {
        let step = "sales SQL generation";
        let schema = self.database.schema_description().await?;
        let system = format!(
            "You are a SQLite expert. Given an input question, create a syntactically correct SQLite query to run. \
             Unless the question asks for a specific number of results, return at most {TOP_K} rows using the LIMIT clause. \
             Query only the columns needed to answer the question and wrap each column name in double quotes. \
             Use only the tables and columns listed below.\n\n{schema}"
        );
        let result = LlmCall::new(format!("Question: {question}\nSQLQuery:"))
            .with_system_prompt(system)
            .with_temperature(0.0)
            .run(self.backend.as_ref())
            .await
            .context(AssistantError::ModelCall { step })?;
        Ok(clean_sql(&result.content))
    }

    /// Turns `question` into SQL, runs it and returns the rows with the SQL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank question, `ModelCall` if the model
    /// fails, `UnsafeSql` if the model wrote anything but one `SELECT`, or
    /// `Database` if the query fails.
    #[instrument(skip_all)]
    pub async fn answer(&self, question: &str) -> Result<SalesAnswer, Report<AssistantError>> {
        let question = require_text("query", question).map_err(AssistantError::from)?;
        let sql = self.write_sql(question).await?;
        info!(%sql, "generated sales query");
        let rows = self.database.run_select(&sql).await?;
        Ok(SalesAnswer {
            question: question.to_string(),
            sql,
            rows,
        })
    }
}
