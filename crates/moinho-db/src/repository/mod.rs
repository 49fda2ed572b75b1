//! # Repository Module
//!
//! Database repository implementations for Moinho.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.sales().create(&owner_id, &draft)                           │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── list(&self, owner)                                                │
//! │  ├── get(&self, owner, id)                                             │
//! │  ├── create(&self, owner, draft)   ── transaction ──► ChangeFeed       │
//! │  ├── update(&self, owner, id, draft)                                   │
//! │  └── delete(&self, owner, id)                                          │
//! │       │                                                                 │
//! │       │  SQL Query (always WHERE owner_id = ?)                          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`FlourRepository`](flour::FlourRepository) - Flour CRUD
//! - [`BakeryRepository`](bakery::BakeryRepository) - Bakeries, with client cascade
//! - [`ClientRepository`](client::ClientRepository) - Clients and the joined dashboard list
//! - [`SaleRepository`](sale::SaleRepository) - Sales and their line items
//! - [`UserRepository`](user::UserRepository) - Accounts and signed-out tokens

use std::str::FromStr;

use moinho_core::{CommissionRate, Money};

use crate::error::{DbError, DbResult};

pub mod bakery;
pub mod client;
pub mod flour;
pub mod sale;
pub mod user;

/// Parses a decimal TEXT column into Money.
pub(crate) fn parse_money(column: &str, value: &str) -> DbResult<Money> {
    Money::from_str(value)
        .map_err(|e| DbError::Internal(format!("{column} holds invalid amount '{value}': {e}")))
}

/// Parses a decimal TEXT column into a commission rate.
pub(crate) fn parse_rate(column: &str, value: &str) -> DbResult<CommissionRate> {
    CommissionRate::from_str(value)
        .map_err(|e| DbError::Internal(format!("{column} holds invalid percent '{value}': {e}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use moinho_core::forms::{BakeryDraft, ClientEntry};

    use crate::pool::{Database, DbConfig};

    /// Fresh in-memory database with one account; returns its id.
    pub async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = add_user(&db, "dona@moinho.app").await;
        (db, owner)
    }

    pub async fn add_user(db: &Database, email: &str) -> String {
        db.users()
            .create(email, "Dona Moinho", "segredo123")
            .await
            .unwrap()
            .id
    }

    pub fn bakery(name: &str, clients: &[&str]) -> BakeryDraft {
        BakeryDraft {
            name: name.to_string(),
            cnpj: Some("12.345.678/0001-90".to_string()),
            clients: clients
                .iter()
                .map(|c| ClientEntry {
                    id: None,
                    name: c.to_string(),
                    phone: None,
                })
                .collect(),
            ..BakeryDraft::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_columns() {
        assert_eq!(parse_money("total", "40.00").unwrap(), Money::from_cents(4000));
        assert!(matches!(parse_money("total", "abc"), Err(DbError::Internal(_))));
        assert!(parse_rate("pct", "7.5").is_ok());
    }
}
