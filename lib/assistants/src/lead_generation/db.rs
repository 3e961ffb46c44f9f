//! SQLite customer store queried by generated SQL.

use crate::sql::Dataset;

/// Tables described to the model.
pub const TABLES: &[&str] = &["customer", "transaction_purchase", "product_name"];

const CREATE_TABLES: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS customer (
        customer_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        age INTEGER NOT NULL,
        email TEXT NOT NULL,
        wealth_status TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS product_name (
        product_id INTEGER PRIMARY KEY,
        product_name TEXT NOT NULL,
        category TEXT NOT NULL,
        price REAL NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS transaction_purchase (
        transaction_id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customer (customer_id),
        product_id INTEGER NOT NULL REFERENCES product_name (product_id),
        quantity INTEGER NOT NULL,
        purchase_date TEXT NOT NULL
    )
    ",
];

const SEED_ROWS: &[&str] = &[
    r"
    INSERT INTO customer (customer_id, name, age, email, wealth_status) VALUES
        (1, 'Anan Chaiyaporn', 34, 'anan@example.com', 'High'),
        (2, 'Busaba Srisuk', 27, 'busaba@example.com', 'Medium'),
        (3, 'Chatchai Wong', 45, 'chatchai@example.com', 'High'),
        (4, 'Darunee Kaew', 22, 'darunee@example.com', 'Low'),
        (5, 'Ekachai Thong', 38, 'ekachai@example.com', 'Medium'),
        (6, 'Fon Rattana', 51, 'fon@example.com', 'High')
    ",
    r"
    INSERT INTO product_name (product_id, product_name, category, price) VALUES
        (1, 'Laptop', 'Electronics', 1200.0),
        (2, 'Mouse', 'Peripherals', 25.0),
        (3, 'Keyboard', 'Peripherals', 75.0),
        (4, 'Monitor', 'Electronics', 300.0),
        (5, 'Webcam', 'Peripherals', 50.0),
        (6, 'USB Cable', 'Accessories', 10.0),
        (7, 'Headphones', 'Audio', 150.0),
        (8, 'Docking Station', 'Accessories', 220.0)
    ",
    r"
    INSERT INTO transaction_purchase (transaction_id, customer_id, product_id, quantity, purchase_date) VALUES
        (101, 1, 1, 1, '2024-01-15'),
        (102, 2, 2, 2, '2024-01-17'),
        (103, 3, 1, 1, '2024-02-05'),
        (104, 3, 4, 2, '2024-02-20'),
        (105, 4, 6, 3, '2024-03-02'),
        (106, 5, 7, 1, '2024-03-11'),
        (107, 6, 8, 1, '2024-04-08'),
        (108, 1, 3, 1, '2024-04-22')
    ",
];

/// Customers, products and purchases.
pub static LEADS: Dataset = Dataset {
    name: "leads",
    tables: TABLES,
    create: CREATE_TABLES,
    seed: SEED_ROWS,
    sample_rows: 3,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::sql::SqlDatabase;

    async fn memory_db() -> SqlDatabase {
        SqlDatabase::connect("sqlite::memory:", &LEADS).await.expect("connect")
    }

    #[tokio::test]
    async fn seeding_happens_once() {
        let db = memory_db().await;
        db.seed_if_empty().await.expect("reseed");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer")
            .fetch_one(db.pool())
            .await
            .expect("count");
        assert_eq!(count, 6);
    }

    #[tokio::test]
    async fn laptop_buyers_join_across_tables() {
        let db = memory_db().await;
        let rows = db
            .run_select(
                "SELECT c.name, c.age, p.price, NULL AS note FROM customer c \
                 JOIN transaction_purchase t ON t.customer_id = c.customer_id \
                 JOIN product_name p ON p.product_id = t.product_id \
                 WHERE p.product_name = 'Laptop' ORDER BY c.customer_id",
            )
            .await
            .expect("select");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Anan Chaiyaporn");
        assert_eq!(rows[0]["age"], 34);
        assert_eq!(rows[0]["price"], 1200.0);
        assert!(rows[0]["note"].is_null());
    }

    #[tokio::test]
    async fn write_statements_are_refused() {
        let db = memory_db().await;
        let err = db.run_select("DROP TABLE customer").await.unwrap_err();
        assert!(matches!(err.current_context(), AssistantError::UnsafeSql { .. }));
        assert_eq!(db.run_select("SELECT COUNT(*) AS n FROM customer").await.expect("count")[0]["n"], 6);
    }

    #[tokio::test]
    async fn schema_lists_tables_with_samples() {
        let schema = memory_db().await.schema_description().await.expect("schema");
        assert!(schema.contains("CREATE TABLE customer"));
        assert!(schema.contains("3 rows from product_name table:\nproduct_id\tproduct_name\tcategory\tprice\n1\tLaptop\tElectronics\t1200.0"));
        assert!(schema.contains("3 rows from transaction_purchase table:"));
    }
}
