//! SQLite-backed document record index
//!
//! Implements the duplicate detector's `RecordIndex` over the `documents`
//! table. Records with `status = 'obsolete'` are invisible to lookups that
//! ask for it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::ExistingRecord;
use crate::services::{IndexError, LocationScope, RecordIndex, RecordQuery};

/// Stored document row
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub guid: Uuid,
    pub name: String,
    pub size: u64,
    pub location_id: String,
    pub location_label: String,
    pub owner_label: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(name: impl Into<String>, size: u64, location_id: impl Into<String>) -> Self {
        let location_id = location_id.into();
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            size,
            location_label: location_id.clone(),
            location_id,
            owner_label: String::new(),
            status: "active".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Insert a document row
pub async fn insert_document(pool: &SqlitePool, record: &DocumentRecord) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (guid, name, size, location_id, location_label, owner_label, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.guid.to_string())
    .bind(&record.name)
    .bind(record.size as i64)
    .bind(&record.location_id)
    .bind(&record.location_label)
    .bind(&record.owner_label)
    .bind(&record.status)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Record index over the local `documents` table
#[derive(Clone)]
pub struct SqliteRecordIndex {
    pool: SqlitePool,
}

impl SqliteRecordIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordIndex for SqliteRecordIndex {
    async fn find(&self, query: &RecordQuery) -> Result<Vec<ExistingRecord>, IndexError> {
        let (location_clause, location) = match &query.scope {
            LocationScope::Within(location) => ("location_id = ?", location),
            LocationScope::Outside(location) => ("location_id != ?", location),
        };
        let status_clause = if query.exclude_obsolete {
            " AND status != 'obsolete'"
        } else {
            ""
        };
        let sql = format!(
            "SELECT guid, size, created_at, location_label, owner_label FROM documents \
             WHERE name = ? AND size = ? AND {}{} ORDER BY created_at LIMIT ?",
            location_clause, status_clause
        );

        // SQLite treats a negative LIMIT as unbounded
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);

        let rows = sqlx::query(&sql)
            .bind(&query.name)
            .bind(query.size as i64)
            .bind(location)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExistingRecord, IndexError> {
    let guid: String = row.get("guid");
    let id = Uuid::parse_str(&guid).map_err(|e| IndexError::Query(e.to_string()))?;

    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| IndexError::Query(e.to_string()))?
        .with_timezone(&Utc);

    let size: i64 = row.get("size");

    Ok(ExistingRecord {
        id,
        size: size as u64,
        created_at,
        location_label: row.get("location_label"),
        owner_label: row.get("owner_label"),
    })
}
