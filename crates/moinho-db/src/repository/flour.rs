//! # Flour Repository
//!
//! Database operations for flour types.
//!
//! Sales copy the flour's name into each line item, so nothing here ever
//! touches `sale_items`: renaming or deleting a flour leaves history alone.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::changes::{ChangeFeed, ChangeOp};
use crate::error::{DbError, DbResult};
use moinho_core::forms::FlourDraft;
use moinho_core::{EntityKind, Flour};

#[derive(Debug, Clone, sqlx::FromRow)]
struct FlourRecord {
    id: String,
    owner_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FlourRecord> for Flour {
    fn from(r: FlourRecord) -> Self {
        Flour {
            id: r.id,
            owner_id: r.owner_id,
            name: r.name,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Repository for flour database operations.
#[derive(Debug, Clone)]
pub struct FlourRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl FlourRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        FlourRepository { pool, changes }
    }

    /// Lists the owner's flours by name.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<Flour>> {
        let records = sqlx::query_as::<_, FlourRecord>(
            r#"
            SELECT id, owner_id, name, created_at, updated_at
            FROM flours
            WHERE owner_id = ?1
            ORDER BY name COLLATE NOCASE, created_at
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Flour::from).collect())
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Flour>> {
        let record = sqlx::query_as::<_, FlourRecord>(
            r#"
            SELECT id, owner_id, name, created_at, updated_at
            FROM flours
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Flour::from))
    }

    /// Creates a flour and returns its id.
    pub async fn create(&self, owner_id: &str, draft: &FlourDraft) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, name = %draft.name, "Creating flour");

        sqlx::query(
            r#"
            INSERT INTO flours (id, owner_id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&draft.name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.changes.emit(owner_id, EntityKind::Flour, &id, ChangeOp::Created);
        Ok(id)
    }

    pub async fn update(&self, owner_id: &str, id: &str, draft: &FlourDraft) -> DbResult<()> {
        debug!(id = %id, name = %draft.name, "Updating flour");

        let result = sqlx::query(
            r#"
            UPDATE flours SET name = ?3, updated_at = ?4
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&draft.name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Flour", id));
        }

        self.changes.emit(owner_id, EntityKind::Flour, id, ChangeOp::Updated);
        Ok(())
    }

    pub async fn delete(&self, owner_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting flour");

        let result = sqlx::query("DELETE FROM flours WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Flour", id));
        }

        self.changes.emit(owner_id, EntityKind::Flour, id, ChangeOp::Deleted);
        Ok(())
    }
}
