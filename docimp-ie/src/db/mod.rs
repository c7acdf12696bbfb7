//! Database access for docimp-ie
//!
//! The engine only reads the document index; `documents` is created here so
//! a fresh database is usable for local runs and tests.

pub mod records;

pub use records::{insert_document, DocumentRecord, SqliteRecordIndex};

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the `documents` table and its lookup index if missing
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            size INTEGER NOT NULL,
            location_id TEXT NOT NULL,
            location_label TEXT NOT NULL DEFAULT '',
            owner_label TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_name_size ON documents (name, size)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (documents)");

    Ok(())
}
