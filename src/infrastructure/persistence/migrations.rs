use rusqlite::Connection;

/// Initialize the database schema, creating tables if they don't exist.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            captured_at TEXT    NOT NULL,
            data        TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS metric_samples (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            captured_at TEXT    NOT NULL,
            family      TEXT    NOT NULL,
            path        TEXT    NOT NULL,
            value       REAL    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS alerts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at  TEXT    NOT NULL,
            component   TEXT    NOT NULL,
            value       REAL    NOT NULL,
            threshold   REAL    NOT NULL,
            sent        INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS email_subscriptions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            email       TEXT    NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS mail_relay (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            sender      TEXT    NOT NULL,
            credential  TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_snapshots_captured_at ON snapshots(captured_at);
        CREATE INDEX IF NOT EXISTS idx_metric_samples_family ON metric_samples(family, captured_at);
        CREATE INDEX IF NOT EXISTS idx_alerts_unsent ON alerts(sent, created_at);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    const TABLES: [&str; 5] = [
        "snapshots",
        "metric_samples",
        "alerts",
        "email_subscriptions",
        "mail_relay",
    ];

    #[allow(clippy::expect_used)]
    #[test]
    fn test_initialize_schema_creates_all_tables() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let result = initialize_schema(&conn);
        assert!(result.is_ok());

        for table in &TABLES {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |row| row.get(0),
                )
                .expect("query sqlite_master");
            assert_eq!(count, 1, "table {table} should exist");
        }
    }

    #[allow(clippy::expect_used)]
    #[test]
    fn test_initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        assert!(initialize_schema(&conn).is_ok());
        assert!(initialize_schema(&conn).is_ok());
    }

    #[allow(clippy::expect_used)]
    #[test]
    fn test_alerts_default_to_unsent() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        initialize_schema(&conn).expect("schema");
        conn.execute(
            "INSERT INTO alerts (created_at, component, value, threshold) VALUES ('t', 'cpu', 1.0, 0.5)",
            [],
        )
        .expect("insert");
        let sent: i64 = conn
            .query_row("SELECT sent FROM alerts", [], |row| row.get(0))
            .expect("select");
        assert_eq!(sent, 0);
    }

    #[allow(clippy::expect_used)]
    #[test]
    fn test_mail_relay_holds_a_single_row() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        initialize_schema(&conn).expect("schema");
        conn.execute(
            "INSERT INTO mail_relay (id, sender, credential) VALUES (1, 'a', 'b')",
            [],
        )
        .expect("first row");
        let second = conn.execute(
            "INSERT INTO mail_relay (id, sender, credential) VALUES (2, 'c', 'd')",
            [],
        );
        assert!(second.is_err());
    }

    #[allow(clippy::expect_used)]
    #[test]
    fn test_tables_have_expected_columns() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        assert!(initialize_schema(&conn).is_ok());

        let check_column = |table: &str, column: &str| {
            let count: i64 = conn
                .query_row(
                    &format!(
                        "SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name='{column}'"
                    ),
                    [],
                    |row| row.get(0),
                )
                .expect("pragma_table_info");
            assert_eq!(count, 1, "column {column} should exist in {table}");
        };

        check_column("snapshots", "captured_at");
        check_column("snapshots", "data");

        check_column("metric_samples", "family");
        check_column("metric_samples", "path");
        check_column("metric_samples", "value");

        check_column("alerts", "created_at");
        check_column("alerts", "component");
        check_column("alerts", "value");
        check_column("alerts", "threshold");
        check_column("alerts", "sent");

        check_column("email_subscriptions", "email");
        check_column("mail_relay", "sender");
        check_column("mail_relay", "credential");
    }
}
