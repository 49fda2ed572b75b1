//! # Domain Types
//!
//! Core domain types used throughout Moinho.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Bakery      │◄──│     Client      │   │      Flour      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name, address  │   │  bakery_id (FK) │   │  name           │       │
//! │  │  cpf / cnpj     │   │  name, phone    │   └────────┬────────┘       │
//! │  └────────▲────────┘   └─────────────────┘            │ by name        │
//! │           │ bakery_id (nullable)                      │                │
//! │  ┌────────┴────────┐   ┌─────────────────┐            │                │
//! │  │      Sale       │──►│    LineItem     │◄───────────┘                │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  buyer_name     │   │  flour_name     │                             │
//! │  │  date           │   │  quantity       │                             │
//! │  │  total_value    │   │  unit_price     │                             │
//! │  │  total_commission│  │  commission %   │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! Every stored entity carries `owner_id`, the account that created it.
//! Reads and writes are always scoped to one owner.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::aggregation::{aggregate, SaleTotals};
use crate::error::CoreError;
use crate::money::{CommissionRate, Money};

// =============================================================================
// Flour
// =============================================================================

/// A flour type the user sells.
///
/// Line items copy the flour's name, so renaming a flour never rewrites
/// past sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Flour {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Bakery
// =============================================================================

/// A bakery that buys flour.
///
/// Address fields are optional; at least one of `cpf`/`cnpj` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Bakery {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    /// Eight digits, no hyphen.
    pub postal_code: Option<String>,
    /// Individual taxpayer number.
    pub cpf: Option<String>,
    /// Company taxpayer number.
    pub cnpj: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A bakery together with its clients, as the edit dialog loads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BakeryWithClients {
    #[serde(flatten)]
    #[ts(flatten)]
    pub bakery: Bakery,
    pub clients: Vec<Client>,
}

// =============================================================================
// Client
// =============================================================================

/// A contact person at a bakery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub owner_id: String,
    pub bakery_id: String,
    pub name: String,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A client row of the clients dashboard, joined with its bakery's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClientWithBakery {
    #[serde(flatten)]
    #[ts(flatten)]
    pub client: Client,
    pub bakery_name: String,
}

impl ClientWithBakery {
    /// Case-insensitive search over the client's and the bakery's name.
    ///
    /// A blank term matches everything.
    ///
    /// ## Example
    /// ```rust,ignore
    /// row.matches("pão")   // client "Pão Quente" or bakery "Padaria do Pão"
    /// ```
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.client.name.to_lowercase().contains(&term)
            || self.bakery_name.to_lowercase().contains(&term)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One line of a sale: a flour, how many sacks, at what price.
///
/// Items are owned by their sale; editing a sale replaces the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    /// Flour name at the time of the sale.
    pub flour_name: String,
    /// Whole units, at least 1.
    pub quantity: i64,
    pub unit_price: Money,
    /// 0–100, defaults to 0.
    pub commission_percent: CommissionRate,
}

impl LineItem {
    pub fn new(
        flour_name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
        commission_percent: CommissionRate,
    ) -> Self {
        LineItem {
            flour_name: flour_name.into(),
            quantity,
            unit_price,
            commission_percent,
        }
    }

    /// `quantity × unit_price`.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Commission earned on this line, unrounded.
    #[inline]
    pub fn commission(&self) -> Money {
        self.subtotal().commission(self.commission_percent)
    }
}

/// A recorded sale of flour to a bakery.
///
/// ## Totals
/// `total_value` and `total_commission` are derived from `items` whenever
/// the sale is written. They are stored so lists can be summed without
/// loading every item, and never taken from the client.
///
/// ## Buyer Snapshot
/// `buyer_name` is the bakery's name when the sale was last saved. It does
/// not follow later renames, and it survives the bakery's deletion (then
/// `bakery_id` becomes `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub owner_id: String,
    pub bakery_id: Option<String>,
    pub buyer_name: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub items: Vec<LineItem>,
    pub total_value: Money,
    pub total_commission: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Totals recomputed from the items.
    pub fn computed_totals(&self) -> Result<SaleTotals, CoreError> {
        aggregate(&self.items)
    }

    /// Checks that the stored totals match the items.
    pub fn verify_totals(&self) -> Result<(), CoreError> {
        let totals = self.computed_totals()?;
        if totals.total_value == self.total_value && totals.total_commission == self.total_commission
        {
            Ok(())
        } else {
            Err(CoreError::TotalsMismatch {
                sale_id: self.id.clone(),
            })
        }
    }
}

// =============================================================================
// Identity
// =============================================================================

/// A registered account, without its password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Who is signed in, as the session endpoints report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            user_id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

// =============================================================================
// Entity Kind & Refresh Policy
// =============================================================================

/// The four entities with a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EntityKind {
    Sale,
    Flour,
    Bakery,
    Client,
}

/// How a dashboard keeps its list current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RefreshPolicy {
    /// The server pushes a fresh snapshot after every change.
    Live,
    /// The client lists again after each of its own mutations.
    Refetch,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Sale => "sale",
            EntityKind::Flour => "flour",
            EntityKind::Bakery => "bakery",
            EntityKind::Client => "client",
        }
    }

    /// Sales and flours are live; bakeries and clients are refetched.
    pub fn refresh_policy(&self) -> RefreshPolicy {
        match self {
            EntityKind::Sale | EntityKind::Flour => RefreshPolicy::Live,
            EntityKind::Bakery | EntityKind::Client => RefreshPolicy::Refetch,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts singular and plural names, as they appear in routes.
impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" | "sales" => Ok(EntityKind::Sale),
            "flour" | "flours" => Ok(EntityKind::Flour),
            "bakery" | "bakeries" => Ok(EntityKind::Bakery),
            "client" | "clients" => Ok(EntityKind::Client),
            other => Err(CoreError::UnknownEntity(other.to_string())),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client_row(name: &str, bakery: &str) -> ClientWithBakery {
        let now = Utc::now();
        ClientWithBakery {
            client: Client {
                id: "c1".to_string(),
                owner_id: "u1".to_string(),
                bakery_id: "b1".to_string(),
                name: name.to_string(),
                phone: None,
                created_at: now,
                updated_at: now,
            },
            bakery_name: bakery.to_string(),
        }
    }

    #[test]
    fn test_line_item_math() {
        let item = LineItem::new(
            "Especial",
            3,
            Money::from_cents(500),
            CommissionRate::from_percent_int(10),
        );
        assert_eq!(item.subtotal(), Money::from_cents(1500));
        assert_eq!(item.commission().amount(), dec!(1.5));
    }

    #[test]
    fn test_client_matches_client_or_bakery_name() {
        let row = client_row("Maria Souza", "Padaria Pão Quente");
        assert!(row.matches("maria"));
        assert!(row.matches("PÃO"));
        assert!(row.matches("  quente "));
        assert!(row.matches(""));
        assert!(!row.matches("joão"));
    }

    #[test]
    fn test_sale_verify_totals() {
        let now = Utc::now();
        let items = vec![LineItem::new(
            "Integral",
            2,
            Money::from_cents(1000),
            CommissionRate::from_percent_int(5),
        )];
        let mut sale = Sale {
            id: "s1".to_string(),
            owner_id: "u1".to_string(),
            bakery_id: Some("b1".to_string()),
            buyer_name: "Padaria Central".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            items,
            total_value: Money::from_cents(2000),
            total_commission: Money::from_cents(100),
            created_at: now,
            updated_at: now,
        };
        assert!(sale.verify_totals().is_ok());

        sale.total_value = Money::from_cents(1999);
        assert!(matches!(
            sale.verify_totals(),
            Err(CoreError::TotalsMismatch { .. })
        ));
    }

    #[test]
    fn test_entity_kind_parsing_and_policy() {
        assert_eq!("sales".parse::<EntityKind>().unwrap(), EntityKind::Sale);
        assert_eq!("Flour".parse::<EntityKind>().unwrap(), EntityKind::Flour);
        assert_eq!("bakeries".parse::<EntityKind>().unwrap(), EntityKind::Bakery);
        assert!("products".parse::<EntityKind>().is_err());

        assert_eq!(EntityKind::Sale.refresh_policy(), RefreshPolicy::Live);
        assert_eq!(EntityKind::Flour.refresh_policy(), RefreshPolicy::Live);
        assert_eq!(EntityKind::Bakery.refresh_policy(), RefreshPolicy::Refetch);
        assert_eq!(EntityKind::Client.refresh_policy(), RefreshPolicy::Refetch);
    }

    #[test]
    fn test_sale_json_is_camel_case() {
        let item = LineItem::new("Integral", 1, Money::from_cents(2000), CommissionRate::zero());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["flourName"], "Integral");
        assert_eq!(json["unitPrice"], "20.00");
        assert_eq!(json["commissionPercent"], "0");
    }
}
