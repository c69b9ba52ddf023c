//! Database bootstrap for the kitchen inventory
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! The schema is created at startup; older database files are brought up to
//! date by an ordered list of additive column migrations, each checked
//! against the introspected schema and applied idempotently. Migrations are
//! never rolled back and never remove or rename columns.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Handle to the SQLite database file.
///
/// Deliberately not a shared connection: every operation opens its own
/// scoped connection via [`Database::open`] and releases it on drop, so
/// there is no process-wide handle to poison. SQLite's file locking
/// serializes concurrent writers.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection for a single operation.
    pub fn open(&self) -> DbResult<Connection> {
        let conn = Connection::open(&self.path)?;
        configure(&conn)?;
        Ok(conn)
    }

    /// Create tables and apply pending migrations. Called once at startup.
    pub fn initialize(&self) -> DbResult<()> {
        let conn = self.open()?;
        init_schema(&conn)?;
        apply_migrations(&conn)?;
        Ok(())
    }
}

fn configure(conn: &Connection) -> DbResult<()> {
    conn.busy_timeout(Duration::from_secs(10))?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(())
}

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `products`: the inventory itself
/// - `shopping_list`: manually added and auto-generated purchases
/// - `barcode_history`: per-barcode scan counter with last-seen metadata
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ean TEXT,
            name TEXT NOT NULL,
            expiry_date TEXT,
            purchase_date TEXT,
            location TEXT,
            quantity INTEGER DEFAULT 1,
            weight_volume TEXT,
            notes TEXT,
            is_vegetarian INTEGER DEFAULT 0,
            is_vegan INTEGER DEFAULT 0,
            price REAL DEFAULT 0.0,
            image_url TEXT,
            category TEXT,
            tags TEXT,
            scan_count INTEGER DEFAULT 0,
            last_scanned TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS shopping_list (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            quantity INTEGER DEFAULT 1,
            category TEXT,
            checked INTEGER DEFAULT 0,
            notes TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS barcode_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ean TEXT NOT NULL,
            name TEXT,
            category TEXT,
            weight_volume TEXT,
            tags TEXT,
            is_vegetarian INTEGER DEFAULT 0,
            is_vegan INTEGER DEFAULT 0,
            scan_count INTEGER DEFAULT 1,
            last_scanned TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_expiry_date ON products(expiry_date);
        CREATE INDEX IF NOT EXISTS idx_location ON products(location);
        CREATE INDEX IF NOT EXISTS idx_name ON products(name);
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// A single additive schema migration: add `column` to `table` if missing.
struct Migration {
    table: &'static str,
    column: &'static str,
    ddl: &'static str,
}

/// Ordered migration steps for database files created by older versions.
///
/// SQLite cannot ADD COLUMN with a non-constant default, so `created_at`
/// is added without one; rows predating the column keep NULL.
const MIGRATIONS: &[Migration] = &[
    Migration {
        table: "products",
        column: "weight_volume",
        ddl: "ALTER TABLE products ADD COLUMN weight_volume TEXT",
    },
    Migration {
        table: "products",
        column: "created_at",
        ddl: "ALTER TABLE products ADD COLUMN created_at TIMESTAMP",
    },
    Migration {
        table: "products",
        column: "price",
        ddl: "ALTER TABLE products ADD COLUMN price REAL DEFAULT 0.0",
    },
    Migration {
        table: "products",
        column: "image_url",
        ddl: "ALTER TABLE products ADD COLUMN image_url TEXT",
    },
    Migration {
        table: "products",
        column: "category",
        ddl: "ALTER TABLE products ADD COLUMN category TEXT",
    },
    Migration {
        table: "products",
        column: "tags",
        ddl: "ALTER TABLE products ADD COLUMN tags TEXT",
    },
    Migration {
        table: "products",
        column: "scan_count",
        ddl: "ALTER TABLE products ADD COLUMN scan_count INTEGER DEFAULT 0",
    },
    Migration {
        table: "products",
        column: "last_scanned",
        ddl: "ALTER TABLE products ADD COLUMN last_scanned TEXT",
    },
    Migration {
        table: "barcode_history",
        column: "category",
        ddl: "ALTER TABLE barcode_history ADD COLUMN category TEXT",
    },
    Migration {
        table: "barcode_history",
        column: "weight_volume",
        ddl: "ALTER TABLE barcode_history ADD COLUMN weight_volume TEXT",
    },
    Migration {
        table: "barcode_history",
        column: "tags",
        ddl: "ALTER TABLE barcode_history ADD COLUMN tags TEXT",
    },
    Migration {
        table: "barcode_history",
        column: "is_vegetarian",
        ddl: "ALTER TABLE barcode_history ADD COLUMN is_vegetarian INTEGER DEFAULT 0",
    },
    Migration {
        table: "barcode_history",
        column: "is_vegan",
        ddl: "ALTER TABLE barcode_history ADD COLUMN is_vegan INTEGER DEFAULT 0",
    },
];

/// Check whether a column exists via schema introspection.
fn column_exists(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        params![table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Apply all pending migrations in order. Safe to run at every startup.
pub fn apply_migrations(conn: &Connection) -> DbResult<()> {
    for migration in MIGRATIONS {
        if !column_exists(conn, migration.table, migration.column)? {
            log::info!(
                "Migrating database: adding {}.{}",
                migration.table,
                migration.column
            );
            conn.execute_batch(migration.ddl)?;
        }
    }
    Ok(())
}

/// Today's date as YYYY-MM-DD using local system time.
pub fn today_date() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// A local date `days` away from today as YYYY-MM-DD (negative = past).
pub fn date_days_from_now(days: i64) -> String {
    (chrono::Local::now() + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

/// Current local timestamp in ISO 8601 format (seconds precision).
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create an in-memory database for testing
    pub fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        apply_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn init_schema_creates_tables() {
        let conn = test_conn();
        for table in ["products", "shopping_list", "barcode_history"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} missing", table);
        }
    }

    #[test]
    fn column_exists_reflects_schema() {
        let conn = test_conn();
        assert!(column_exists(&conn, "products", "expiry_date").unwrap());
        assert!(!column_exists(&conn, "products", "no_such_column").unwrap());
        assert!(!column_exists(&conn, "no_such_table", "name").unwrap());
    }

    #[test]
    fn migrations_upgrade_a_legacy_schema() {
        let conn = Connection::open_in_memory().unwrap();
        // Schema as it looked before the metadata columns existed.
        conn.execute_batch(
            "CREATE TABLE products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ean TEXT,
                name TEXT NOT NULL,
                expiry_date TEXT,
                purchase_date TEXT,
                location TEXT,
                quantity INTEGER DEFAULT 1,
                notes TEXT,
                is_vegetarian INTEGER DEFAULT 0,
                is_vegan INTEGER DEFAULT 0
            );
            CREATE TABLE barcode_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ean TEXT NOT NULL,
                name TEXT,
                scan_count INTEGER DEFAULT 1,
                last_scanned TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );",
        )
        .unwrap();

        apply_migrations(&conn).unwrap();

        assert!(column_exists(&conn, "products", "weight_volume").unwrap());
        assert!(column_exists(&conn, "products", "price").unwrap());
        assert!(column_exists(&conn, "products", "image_url").unwrap());
        assert!(column_exists(&conn, "products", "tags").unwrap());
        assert!(column_exists(&conn, "barcode_history", "is_vegan").unwrap());
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_conn();
        apply_migrations(&conn).unwrap();
        apply_migrations(&conn).unwrap();
    }

    #[test]
    fn database_initialize_and_open() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::new(dir.path().join("inventory.db"));
        db.initialize().unwrap();

        let conn = db.open().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn date_helpers_format() {
        let today = today_date();
        assert_eq!(today.len(), 10);
        // YYYY-MM-DD strings order lexicographically by date.
        assert!(date_days_from_now(7) > today);
        assert!(date_days_from_now(-7) < today_date());
        assert!(now_timestamp().contains('T'));
    }
}
