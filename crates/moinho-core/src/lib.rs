//! # moinho-core: Pure Business Logic for Moinho
//!
//! Everything Moinho knows about flour sales lives here as pure functions
//! and plain data. No database, no network, no clock reads except where a
//! caller passes "today" in.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Moinho Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web client (dashboards)                      │   │
//! │  │   Sales ──► Flours ──► Bakeries ──► Clients ──► Plano PRO        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / SSE                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    moinho-api (axum)                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ moinho-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌─────────────┐ ┌──────────────┐   │   │
//! │  │   │  types   │ │  money   │ │ aggregation │ │  validation  │   │   │
//! │  │   │  Sale    │ │  Money   │ │ SaleTotals  │ │  forms       │   │   │
//! │  │   │  Bakery  │ │Commission│ │ Summary     │ │  FormErrors  │   │   │
//! │  │   └──────────┘ └──────────┘ └─────────────┘ └──────────────┘   │   │
//! │  │   ┌──────────────────────┐  ┌──────────────────────────────┐   │   │
//! │  │   │ dashboard (form FSM) │  │ auth (error code mapping)    │   │   │
//! │  │   └──────────────────────┘  └──────────────────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   data in, decisions out: callers pass rows and "today"         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    moinho-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, LineItem, Flour, Bakery, Client, ...)
//! - [`money`] - Exact decimal money and commission rates
//! - [`aggregation`] - Sale totals and dashboard summaries
//! - [`validation`] - Field validators and input coercion
//! - [`forms`] - Form input shapes and their validated drafts
//! - [`dashboard`] - Add/edit/submit state machine behind every dialog
//! - [`auth`] - Mapping of auth error codes to user-facing phrases
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use moinho_core::aggregation::aggregate;
//! use moinho_core::money::{CommissionRate, Money};
//! use moinho_core::types::LineItem;
//!
//! let items = vec![
//!     LineItem::new("Especial 0000", 2, Money::from_cents(1000), CommissionRate::from_percent_int(5)),
//!     LineItem::new("Integral", 1, Money::from_cents(2000), CommissionRate::zero()),
//! ];
//!
//! let totals = aggregate(&items).unwrap();
//! assert_eq!(totals.total_value, Money::from_cents(4000));
//! assert_eq!(totals.total_commission, Money::from_cents(100));
//! ```

pub mod aggregation;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod money;
pub mod types;
pub mod validation;

pub use error::{CoreError, DashboardError, FieldError, FormErrors, ValidationError};
pub use money::{CommissionRate, CurrencyFormat, Money};
pub use types::*;

/// Maximum number of line items in a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Flour is sold by the sack; anything above this is a typo.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Highest unit price accepted, in reais.
///
/// Together with the quantity and item limits this keeps every sale total
/// far inside what a decimal amount can hold.
pub const MAX_UNIT_PRICE: i64 = 1_000_000;

/// Minimum length for names of flours, bakeries, clients and users.
pub const MIN_NAME_LEN: usize = 3;

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_LEN: usize = 8;
