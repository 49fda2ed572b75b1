//! # Sale Repository
//!
//! Sales and their line items.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create / update(owner, draft)                ONE TRANSACTION           │
//! │     ├── SELECT bakeries.name        (owner's bakery, else NotFound)     │
//! │     ├── totals = aggregate(draft.items)                                 │
//! │     ├── INSERT / UPDATE sales       (buyer_name snapshot, totals)       │
//! │     └── DELETE + INSERT sale_items  (positions 0..n)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are stored as decimal TEXT so they come back exactly as written.
//! Totals are always recomputed here from the items; nothing the client
//! sends as a total is stored.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::changes::{ChangeFeed, ChangeOp};
use crate::error::{DbError, DbResult};
use crate::repository::{parse_money, parse_rate};
use moinho_core::aggregation::SaleTotals;
use moinho_core::forms::SaleDraft;
use moinho_core::{EntityKind, LineItem, Sale};

#[derive(Debug, Clone, sqlx::FromRow)]
struct SaleRecord {
    id: String,
    owner_id: String,
    bakery_id: Option<String>,
    buyer_name: String,
    sale_date: NaiveDate,
    total_value: String,
    total_commission: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRecord {
    sale_id: String,
    flour_name: String,
    quantity: i64,
    unit_price: String,
    commission_percent: String,
}

impl ItemRecord {
    fn into_item(self) -> DbResult<LineItem> {
        Ok(LineItem {
            unit_price: parse_money("sale_items.unit_price", &self.unit_price)?,
            commission_percent: parse_rate("sale_items.commission_percent", &self.commission_percent)?,
            flour_name: self.flour_name,
            quantity: self.quantity,
        })
    }
}

impl SaleRecord {
    fn into_sale(self, items: Vec<LineItem>) -> DbResult<Sale> {
        let sale = Sale {
            total_value: parse_money("sales.total_value", &self.total_value)?,
            total_commission: parse_money("sales.total_commission", &self.total_commission)?,
            id: self.id,
            owner_id: self.owner_id,
            bakery_id: self.bakery_id,
            buyer_name: self.buyer_name,
            date: self.sale_date,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };

        if let Err(e) = sale.verify_totals() {
            warn!(id = %sale.id, error = %e, "Stored totals disagree with items");
        }
        Ok(sale)
    }
}

fn draft_totals(draft: &SaleDraft) -> DbResult<SaleTotals> {
    draft.totals().map_err(|e| DbError::Internal(e.to_string()))
}

const SALE_COLUMNS: &str = "s.id, s.owner_id, s.bakery_id, s.buyer_name, s.sale_date, s.total_value, s.total_commission, s.created_at, s.updated_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        SaleRepository { pool, changes }
    }

    /// Lists the owner's sales, newest date first, each with its items.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales s WHERE s.owner_id = ?1 ORDER BY s.sale_date DESC, s.created_at DESC"
        );
        let records = sqlx::query_as::<_, SaleRecord>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        let item_records = sqlx::query_as::<_, ItemRecord>(
            r#"
            SELECT i.sale_id, i.flour_name, i.quantity, i.unit_price, i.commission_percent
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            WHERE s.owner_id = ?1
            ORDER BY i.sale_id, i.position
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_sale: HashMap<String, Vec<LineItem>> = HashMap::new();
        for record in item_records {
            let sale_id = record.sale_id.clone();
            items_by_sale.entry(sale_id).or_default().push(record.into_item()?);
        }

        records
            .into_iter()
            .map(|r| {
                let items = items_by_sale.remove(&r.id).unwrap_or_default();
                r.into_sale(items)
            })
            .collect()
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales s WHERE s.id = ?1 AND s.owner_id = ?2");
        let Some(record) = sqlx::query_as::<_, SaleRecord>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ItemRecord>(
            r#"
            SELECT sale_id, flour_name, quantity, unit_price, commission_percent
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ItemRecord::into_item)
        .collect::<DbResult<Vec<_>>>()?;

        record.into_sale(items).map(Some)
    }

    /// Records a sale and returns its id.
    ///
    /// ## Errors
    /// - `NotFound` when the bakery isn't one of the owner's
    /// - `Internal` when the items cannot be totalled
    pub async fn create(&self, owner_id: &str, draft: &SaleDraft) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let totals = draft_totals(draft)?;
        let now = Utc::now();

        debug!(
            id = %id,
            items = draft.items.len(),
            total = %totals.total_value,
            "Creating sale"
        );

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let buyer_name = bakery_name(&mut tx, owner_id, &draft.bakery_id).await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, owner_id, bakery_id, buyer_name, sale_date,
                total_value, total_commission, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&draft.bakery_id)
        .bind(&buyer_name)
        .bind(draft.date)
        .bind(totals.total_value.amount().to_string())
        .bind(totals.total_commission.amount().to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, &id, &draft.items).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        self.changes.emit(owner_id, EntityKind::Sale, &id, ChangeOp::Created);
        Ok(id)
    }

    /// Replaces a sale's bakery, date, and items, recomputing its totals.
    ///
    /// The buyer name is taken again from the chosen bakery.
    pub async fn update(&self, owner_id: &str, id: &str, draft: &SaleDraft) -> DbResult<()> {
        let totals = draft_totals(draft)?;
        debug!(id = %id, items = draft.items.len(), total = %totals.total_value, "Updating sale");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let buyer_name = bakery_name(&mut tx, owner_id, &draft.bakery_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                bakery_id = ?3, buyer_name = ?4, sale_date = ?5,
                total_value = ?6, total_commission = ?7, updated_at = ?8
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&draft.bakery_id)
        .bind(&buyer_name)
        .bind(draft.date)
        .bind(totals.total_value.amount().to_string())
        .bind(totals.total_commission.amount().to_string())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, id, &draft.items).await?;

        tx.commit().await.map_err(DbError::transaction)?;

        self.changes.emit(owner_id, EntityKind::Sale, id, ChangeOp::Updated);
        Ok(())
    }

    /// Deletes a sale; its items go with it.
    pub async fn delete(&self, owner_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        self.changes.emit(owner_id, EntityKind::Sale, id, ChangeOp::Deleted);
        Ok(())
    }
}

async fn bakery_name(tx: &mut Transaction<'_, Sqlite>, owner_id: &str, bakery_id: &str) -> DbResult<String> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM bakeries WHERE id = ?1 AND owner_id = ?2")
        .bind(bakery_id)
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await?;

    name.ok_or_else(|| DbError::not_found("Bakery", bakery_id))
}

async fn insert_items(tx: &mut Transaction<'_, Sqlite>, sale_id: &str, items: &[LineItem]) -> DbResult<()> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (sale_id, position, flour_name, quantity, unit_price, commission_percent)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(sale_id)
        .bind(position as i64)
        .bind(&item.flour_name)
        .bind(item.quantity)
        .bind(item.unit_price.amount().to_string())
        .bind(item.commission_percent.percent().to_string())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
