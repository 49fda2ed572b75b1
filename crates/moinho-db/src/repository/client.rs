//! # Client Repository
//!
//! Contact people at bakeries. The clients dashboard lists every client
//! next to its bakery's name, so the main listing is a join.
//!
//! A client always belongs to one of the owner's bakeries; writes check
//! that before touching the row.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::changes::{ChangeFeed, ChangeOp};
use crate::error::{DbError, DbResult};
use moinho_core::forms::ClientDraft;
use moinho_core::{Client, ClientWithBakery, EntityKind};

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ClientRecord {
    id: String,
    owner_id: String,
    bakery_id: String,
    name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRecord> for Client {
    fn from(r: ClientRecord) -> Self {
        Client {
            id: r.id,
            owner_id: r.owner_id,
            bakery_id: r.bakery_id,
            name: r.name,
            phone: r.phone,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ClientWithBakeryRecord {
    #[sqlx(flatten)]
    client: ClientRecord,
    bakery_name: String,
}

pub(crate) const CLIENT_COLUMNS: &str =
    "c.id, c.owner_id, c.bakery_id, c.name, c.phone, c.created_at, c.updated_at";

/// Checks that `bakery_id` is one of the owner's bakeries.
pub(crate) async fn ensure_bakery(
    tx: &mut Transaction<'_, Sqlite>,
    owner_id: &str,
    bakery_id: &str,
) -> DbResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM bakeries WHERE id = ?1 AND owner_id = ?2")
        .bind(bakery_id)
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Bakery", bakery_id)),
    }
}

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ClientRepository { pool, changes }
    }

    /// Lists the owner's clients by name.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.owner_id = ?1 ORDER BY c.name COLLATE NOCASE, c.created_at"
        );
        let records = sqlx::query_as::<_, ClientRecord>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(Client::from).collect())
    }

    /// Lists the owner's clients, each with its bakery's name.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let rows = db.clients().list_with_bakery(&owner).await?;
    /// let shown: Vec<_> = rows.into_iter().filter(|r| r.matches("pão")).collect();
    /// ```
    pub async fn list_with_bakery(&self, owner_id: &str) -> DbResult<Vec<ClientWithBakery>> {
        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS}, b.name AS bakery_name
            FROM clients c
            JOIN bakeries b ON b.id = c.bakery_id AND b.owner_id = c.owner_id
            WHERE c.owner_id = ?1
            ORDER BY c.name COLLATE NOCASE, c.created_at
            "#
        );
        let records = sqlx::query_as::<_, ClientWithBakeryRecord>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records
            .into_iter()
            .map(|r| ClientWithBakery {
                client: r.client.into(),
                bakery_name: r.bakery_name,
            })
            .collect())
    }

    /// Lists the clients of one bakery.
    pub async fn list_for_bakery(&self, owner_id: &str, bakery_id: &str) -> DbResult<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.owner_id = ?1 AND c.bakery_id = ?2 ORDER BY c.name COLLATE NOCASE"
        );
        let records = sqlx::query_as::<_, ClientRecord>(&sql)
            .bind(owner_id)
            .bind(bakery_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(Client::from).collect())
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.id = ?1 AND c.owner_id = ?2");
        let record = sqlx::query_as::<_, ClientRecord>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Client::from))
    }

    /// Creates a client under one of the owner's bakeries.
    pub async fn create(&self, owner_id: &str, draft: &ClientDraft) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, bakery_id = %draft.bakery_id, "Creating client");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        ensure_bakery(&mut tx, owner_id, &draft.bakery_id).await?;

        sqlx::query(
            r#"
            INSERT INTO clients (id, owner_id, bakery_id, name, phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&draft.bakery_id)
        .bind(&draft.name)
        .bind(&draft.phone)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        self.changes.emit(owner_id, EntityKind::Client, &id, ChangeOp::Created);
        Ok(id)
    }

    pub async fn update(&self, owner_id: &str, id: &str, draft: &ClientDraft) -> DbResult<()> {
        debug!(id = %id, bakery_id = %draft.bakery_id, "Updating client");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        ensure_bakery(&mut tx, owner_id, &draft.bakery_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE clients SET bakery_id = ?3, name = ?4, phone = ?5, updated_at = ?6
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&draft.bakery_id)
        .bind(&draft.name)
        .bind(&draft.phone)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        tx.commit().await.map_err(DbError::transaction)?;

        self.changes.emit(owner_id, EntityKind::Client, id, ChangeOp::Updated);
        Ok(())
    }

    pub async fn delete(&self, owner_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting client");

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        self.changes.emit(owner_id, EntityKind::Client, id, ChangeOp::Deleted);
        Ok(())
    }
}
