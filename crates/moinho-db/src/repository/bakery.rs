//! # Bakery Repository
//!
//! Database operations for bakeries and the clients embedded in the bakery
//! dialog.
//!
//! ## Grouped Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save_with_clients(owner, id?, draft)         ONE TRANSACTION           │
//! │     ├── INSERT or UPDATE bakeries                                       │
//! │     └── for each filled client row:                                     │
//! │           id?  → INSERT ... ON CONFLICT(id) DO UPDATE (same owner only) │
//! │           none → INSERT with a new id                                   │
//! │                                                                         │
//! │  delete(owner, id)                            ONE TRANSACTION           │
//! │     ├── DELETE clients WHERE bakery_id = id                             │
//! │     ├── DELETE bakeries WHERE id = id                                   │
//! │     └── sales.bakery_id → NULL (foreign key), buyer_name kept           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Client rows removed from the dialog are left alone; clients are deleted
//! from the clients dashboard or together with their bakery.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::changes::{ChangeFeed, ChangeOp};
use crate::error::{DbError, DbResult};
use crate::repository::client::{ClientRecord, CLIENT_COLUMNS};
use moinho_core::forms::BakeryDraft;
use moinho_core::{Bakery, BakeryWithClients, Client, EntityKind};

#[derive(Debug, Clone, sqlx::FromRow)]
struct BakeryRecord {
    id: String,
    owner_id: String,
    name: String,
    street: Option<String>,
    number: Option<String>,
    neighborhood: Option<String>,
    postal_code: Option<String>,
    cpf: Option<String>,
    cnpj: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BakeryRecord> for Bakery {
    fn from(r: BakeryRecord) -> Self {
        Bakery {
            id: r.id,
            owner_id: r.owner_id,
            name: r.name,
            street: r.street,
            number: r.number,
            neighborhood: r.neighborhood,
            postal_code: r.postal_code,
            cpf: r.cpf,
            cnpj: r.cnpj,
            phone: r.phone,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const BAKERY_COLUMNS: &str = "id, owner_id, name, street, number, neighborhood, postal_code, cpf, cnpj, phone, created_at, updated_at";

/// Repository for bakery database operations.
#[derive(Debug, Clone)]
pub struct BakeryRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl BakeryRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        BakeryRepository { pool, changes }
    }

    /// Lists the owner's bakeries by name.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<Bakery>> {
        let sql = format!(
            "SELECT {BAKERY_COLUMNS} FROM bakeries WHERE owner_id = ?1 ORDER BY name COLLATE NOCASE, created_at"
        );
        let records = sqlx::query_as::<_, BakeryRecord>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(Bakery::from).collect())
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Bakery>> {
        let sql = format!("SELECT {BAKERY_COLUMNS} FROM bakeries WHERE id = ?1 AND owner_id = ?2");
        let record = sqlx::query_as::<_, BakeryRecord>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Bakery::from))
    }

    /// Loads a bakery with its clients, as the edit dialog needs it.
    pub async fn get_with_clients(&self, owner_id: &str, id: &str) -> DbResult<Option<BakeryWithClients>> {
        let Some(bakery) = self.get(owner_id, id).await? else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.owner_id = ?1 AND c.bakery_id = ?2 ORDER BY c.created_at, c.name"
        );
        let clients = sqlx::query_as::<_, ClientRecord>(&sql)
            .bind(owner_id)
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Client::from)
            .collect();

        Ok(Some(BakeryWithClients { bakery, clients }))
    }

    /// Creates a bakery without touching clients.
    pub async fn create(&self, owner_id: &str, draft: &BakeryDraft) -> DbResult<String> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let id = insert_bakery(&mut tx, owner_id, draft).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        self.changes.emit(owner_id, EntityKind::Bakery, &id, ChangeOp::Created);
        Ok(id)
    }

    /// Updates a bakery's own fields without touching clients.
    pub async fn update(&self, owner_id: &str, id: &str, draft: &BakeryDraft) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        update_bakery(&mut tx, owner_id, id, draft).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        self.changes.emit(owner_id, EntityKind::Bakery, id, ChangeOp::Updated);
        Ok(())
    }

    /// Creates (`id = None`) or updates a bakery together with its client
    /// rows, in one transaction. Returns the bakery id.
    ///
    /// ## Errors
    /// - `NotFound` for a bakery id, or a client id, the owner doesn't have
    pub async fn save_with_clients(
        &self,
        owner_id: &str,
        id: Option<&str>,
        draft: &BakeryDraft,
    ) -> DbResult<String> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let (bakery_id, op) = match id {
            Some(id) => {
                update_bakery(&mut tx, owner_id, id, draft).await?;
                (id.to_string(), ChangeOp::Updated)
            }
            None => (insert_bakery(&mut tx, owner_id, draft).await?, ChangeOp::Created),
        };

        let now = Utc::now();
        let mut touched = Vec::with_capacity(draft.clients.len());
        for entry in &draft.clients {
            let (client_id, client_op) = match &entry.id {
                Some(existing) => (existing.clone(), ChangeOp::Updated),
                None => (Uuid::new_v4().to_string(), ChangeOp::Created),
            };

            let result = sqlx::query(
                r#"
                INSERT INTO clients (id, owner_id, bakery_id, name, phone, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                ON CONFLICT (id) DO UPDATE SET
                    bakery_id = excluded.bakery_id,
                    name = excluded.name,
                    phone = excluded.phone,
                    updated_at = excluded.updated_at
                WHERE clients.owner_id = excluded.owner_id
                "#,
            )
            .bind(&client_id)
            .bind(owner_id)
            .bind(&bakery_id)
            .bind(&entry.name)
            .bind(&entry.phone)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Client", client_id));
            }
            touched.push((client_id, client_op));
        }

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(id = %bakery_id, clients = touched.len(), "Saved bakery with clients");
        self.changes.emit(owner_id, EntityKind::Bakery, &bakery_id, op);
        for (client_id, client_op) in touched {
            self.changes.emit(owner_id, EntityKind::Client, &client_id, client_op);
        }
        Ok(bakery_id)
    }

    /// Deletes a bakery and its clients in one transaction.
    ///
    /// Sales that referenced the bakery keep their buyer name and lose the
    /// reference.
    pub async fn delete(&self, owner_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let client_ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM clients WHERE bakery_id = ?1 AND owner_id = ?2")
                .bind(id)
                .bind(owner_id)
                .fetch_all(&mut *tx)
                .await?;
        let sale_ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM sales WHERE bakery_id = ?1 AND owner_id = ?2")
                .bind(id)
                .bind(owner_id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM clients WHERE bakery_id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM bakeries WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bakery", id));
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            id = %id,
            clients = client_ids.len(),
            sales_detached = sale_ids.len(),
            "Deleted bakery"
        );

        self.changes.emit(owner_id, EntityKind::Bakery, id, ChangeOp::Deleted);
        for client_id in &client_ids {
            self.changes.emit(owner_id, EntityKind::Client, client_id, ChangeOp::Deleted);
        }
        for sale_id in &sale_ids {
            self.changes.emit(owner_id, EntityKind::Sale, sale_id, ChangeOp::Updated);
        }
        Ok(())
    }
}

async fn insert_bakery(
    tx: &mut Transaction<'_, Sqlite>,
    owner_id: &str,
    draft: &BakeryDraft,
) -> DbResult<String> {
    let id = Uuid::new_v4().to_string();
    debug!(id = %id, name = %draft.name, "Creating bakery");

    sqlx::query(
        r#"
        INSERT INTO bakeries (
            id, owner_id, name, street, number, neighborhood,
            postal_code, cpf, cnpj, phone, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
        "#,
    )
    .bind(&id)
    .bind(owner_id)
    .bind(&draft.name)
    .bind(&draft.street)
    .bind(&draft.number)
    .bind(&draft.neighborhood)
    .bind(&draft.postal_code)
    .bind(&draft.cpf)
    .bind(&draft.cnpj)
    .bind(&draft.phone)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(id)
}

async fn update_bakery(
    tx: &mut Transaction<'_, Sqlite>,
    owner_id: &str,
    id: &str,
    draft: &BakeryDraft,
) -> DbResult<()> {
    debug!(id = %id, name = %draft.name, "Updating bakery");

    let result = sqlx::query(
        r#"
        UPDATE bakeries SET
            name = ?3, street = ?4, number = ?5, neighborhood = ?6,
            postal_code = ?7, cpf = ?8, cnpj = ?9, phone = ?10, updated_at = ?11
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(&draft.name)
    .bind(&draft.street)
    .bind(&draft.number)
    .bind(&draft.neighborhood)
    .bind(&draft.postal_code)
    .bind(&draft.cpf)
    .bind(&draft.cnpj)
    .bind(&draft.phone)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Bakery", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{add_user, bakery, setup};
    use chrono::NaiveDate;
    use moinho_core::forms::{ClientEntry, SaleDraft};
    use moinho_core::{CommissionRate, LineItem, Money};

    #[tokio::test]
    async fn test_save_with_clients_creates_both() {
        let (db, owner) = setup().await;
        let bakeries = db.bakeries();

        let id = bakeries
            .save_with_clients(&owner, None, &bakery("Padaria Central", &["Maria", "João"]))
            .await
            .unwrap();

        let loaded = bakeries.get_with_clients(&owner, &id).await.unwrap().unwrap();
        assert_eq!(loaded.bakery.name, "Padaria Central");
        assert_eq!(loaded.clients.len(), 2);
    }

    #[tokio::test]
    async fn test_save_with_clients_upserts_by_id() {
        let (db, owner) = setup().await;
        let bakeries = db.bakeries();
        let id = bakeries
            .save_with_clients(&owner, None, &bakery("Padaria Central", &["Maria"]))
            .await
            .unwrap();
        let maria = db.clients().list_for_bakery(&owner, &id).await.unwrap()[0].id.clone();

        let mut edit = bakery("Padaria Central Ltda", &["Pedro"]);
        edit.clients.push(ClientEntry {
            id: Some(maria.clone()),
            name: "Maria Souza".to_string(),
            phone: Some("11 98888-0000".to_string()),
        });
        bakeries.save_with_clients(&owner, Some(&id), &edit).await.unwrap();

        let loaded = bakeries.get_with_clients(&owner, &id).await.unwrap().unwrap();
        assert_eq!(loaded.bakery.name, "Padaria Central Ltda");
        assert_eq!(loaded.clients.len(), 2);
        let renamed = loaded.clients.iter().find(|c| c.id == maria).unwrap();
        assert_eq!(renamed.name, "Maria Souza");
    }

    #[tokio::test]
    async fn test_save_with_foreign_client_id_rolls_back() {
        let (db, owner) = setup().await;
        let other = add_user(&db, "outra@moinho.app").await;
        let theirs = db
            .bakeries()
            .save_with_clients(&other, None, &bakery("Padaria Alheia", &["Ana"]))
            .await
            .unwrap();
        let ana = db.clients().list_for_bakery(&other, &theirs).await.unwrap()[0].id.clone();

        let mut draft = bakery("Minha Padaria", &[]);
        draft.clients.push(ClientEntry {
            id: Some(ana.clone()),
            name: "Ana Roubada".to_string(),
            phone: None,
        });
        let err = db.bakeries().save_with_clients(&owner, None, &draft).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        assert!(db.bakeries().list(&owner).await.unwrap().is_empty());
        assert_eq!(db.clients().get(&other, &ana).await.unwrap().unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn test_delete_removes_clients_and_detaches_sales() {
        let (db, owner) = setup().await;
        let id = db
            .bakeries()
            .save_with_clients(&owner, None, &bakery("Padaria Central", &["Maria", "João"]))
            .await
            .unwrap();
        let keep = db
            .bakeries()
            .save_with_clients(&owner, None, &bakery("Padaria Vizinha", &["Ana"]))
            .await
            .unwrap();

        let sale_id = db
            .sales()
            .create(
                &owner,
                &SaleDraft {
                    bakery_id: id.clone(),
                    date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                    items: vec![LineItem::new(
                        "Especial",
                        2,
                        Money::from_cents(1000),
                        CommissionRate::zero(),
                    )],
                },
            )
            .await
            .unwrap();

        db.bakeries().delete(&owner, &id).await.unwrap();

        assert!(db.bakeries().get(&owner, &id).await.unwrap().is_none());
        assert!(db.clients().list_for_bakery(&owner, &id).await.unwrap().is_empty());
        assert_eq!(db.clients().list_for_bakery(&owner, &keep).await.unwrap().len(), 1);

        let sale = db.sales().get(&owner, &sale_id).await.unwrap().unwrap();
        assert_eq!(sale.bakery_id, None);
        assert_eq!(sale.buyer_name, "Padaria Central");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (db, owner) = setup().await;
        assert!(matches!(
            db.bakeries().delete(&owner, "missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_clients() {
        let (db, owner) = setup().await;
        let id = db
            .bakeries()
            .save_with_clients(&owner, None, &bakery("Padaria Central", &["Maria"]))
            .await
            .unwrap();

        db.bakeries().update(&owner, &id, &bakery("Padaria Nova", &[])).await.unwrap();

        let loaded = db.bakeries().get_with_clients(&owner, &id).await.unwrap().unwrap();
        assert_eq!(loaded.bakery.name, "Padaria Nova");
        assert_eq!(loaded.clients.len(), 1);
    }
}
