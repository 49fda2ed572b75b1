//! # moinho-db: Database Layer for Moinho
//!
//! SQLite storage for flours, bakeries, clients, sales, and accounts,
//! using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moinho Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /api/sales)                                        │
//! │       │  SaleForm::validate() ──► SaleDraft        (moinho-core)        │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     moinho-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ flour, bakery │    │  (embedded)  │  │   │
//! │  │   │               │    │ client, sale  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ user          │    │ 001_init.sql │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ after commit                  │   │
//! │  │                                ▼                               │   │
//! │  │                        ┌───────────────┐                       │   │
//! │  │                        │  ChangeFeed   │──► live list streams  │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (MOINHO_DATABASE__PATH)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`changes`] - Broadcast of committed writes
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use moinho_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("moinho.db")).await?;
//!
//! let sales = db.sales().list(&owner_id).await?;
//! let id = db.sales().create(&owner_id, &draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod changes;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use changes::{ChangeEvent, ChangeFeed, ChangeOp};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bakery::BakeryRepository;
pub use repository::client::ClientRepository;
pub use repository::flour::FlourRepository;
pub use repository::sale::SaleRepository;
pub use repository::user::{StoredUser, UserRepository};
