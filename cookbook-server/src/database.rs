use anyhow::{Context, Result};
use r2d2_sqlite::SqliteConnectionManager;

const MIGRATIONS: [&str; 2] = [
    include_str!("migrations/01-initial.sql"),
    include_str!("migrations/02-add-indexes.sql"),
];

#[derive(Clone)]
pub struct Database {
    pub pool: r2d2::Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (or create) the database file at `path` and bring its schema up to date.
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Creating database directory for {}", path))?;
            }
        }
        let manager = Self::with_foreign_keys(SqliteConnectionManager::file(path));
        let pool = r2d2::Pool::new(manager)?;
        let me = Self { pool };
        me.migrate().await?;
        Ok(me)
    }

    /// A private, throwaway database. Every pooled sqlite memory connection is its own
    /// database, so the pool is pinned to a single connection that is never recycled.
    pub async fn connect_in_memory() -> Result<Self> {
        let manager = Self::with_foreign_keys(SqliteConnectionManager::memory());
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .build(manager)?;
        let me = Self { pool };
        me.migrate().await?;
        Ok(me)
    }

    /// SQLite leaves foreign keys off per connection unless asked, and ON DELETE SET NULL
    /// depends on them.
    fn with_foreign_keys(manager: SqliteConnectionManager) -> SqliteConnectionManager {
        manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
    }

    /// Migrate the database to the latest version.
    async fn migrate(&self) -> Result<()> {
        // Find the current migration version. If it fails, we need to run all the migrations.
        let conn = self.pool.get()?;
        let current_version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                rusqlite::params![],
                |row| row.get(0),
            )
            .unwrap_or("0".to_string());
        let current_version = current_version.parse::<usize>().unwrap_or(0);
        tracing::info!("Current schema version: {}", current_version);
        for (index, migration) in MIGRATIONS.iter().enumerate().skip(current_version) {
            tracing::warn!("Applying migration {}", index + 1);
            conn.execute_batch(migration)
                .with_context(|| format!("Applying migration {}", index + 1))?;
        }
        Ok(())
    }

    /// Convenience method to collect rows from a query into a Vec.
    pub fn collect_rows<T: FromRow, P: rusqlite::Params>(
        &self,
        sql: &str,
        parameters: P,
    ) -> Result<Vec<T>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query(parameters)?;
        rows.mapped(T::from_row)
            .map(|r| r.map_err(Into::into))
            .collect::<Result<_>>()
    }

    /// Run a single statement, returning the number of rows it touched.
    pub fn execute<P: rusqlite::Params>(&self, sql: &str, parameters: P) -> Result<usize> {
        let conn = self.pool.get()?;
        Ok(conn.execute(sql, parameters)?)
    }
}

pub trait FromRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self>
    where
        Self: Sized;
}
