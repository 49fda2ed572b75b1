//! # Form Shapes
//!
//! What the add/edit dialogs send, and what survives validation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleForm (loose JSON)  ──validate()──►  SaleDraft (typed, checked)      │
//! │  FlourForm              ──validate()──►  FlourDraft                      │
//! │  BakeryForm (+clients)  ──validate()──►  BakeryDraft (+ClientEntry)      │
//! │  ClientForm             ──validate()──►  ClientDraft                     │
//! │  SignupForm             ──validate()──►  Signup                          │
//! │  LoginForm              ──validate()──►  Credentials                     │
//! │                                                                         │
//! │  Failure: FormErrors with one entry per failing field path,            │
//! │  e.g. "items[1].unitPrice" or "clients[0].name".                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every field is checked even after the first failure. Validation is pure:
//! it never reads the database, so "does this bakery exist" is the
//! repository's job.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregation::{aggregate, SaleTotals};
use crate::error::{CoreError, FormErrors, ValidationError};
use crate::money::{CommissionRate, Money};
use crate::types::{BakeryWithClients, Client, EntityKind, Flour, LineItem, Sale};
use crate::validation::{
    coerce_decimal, coerce_whole, optional_text, parse_date, validate_commission_percent,
    validate_email, validate_item_count, validate_name, validate_password, validate_postal_code,
    validate_quantity, validate_required, validate_unit_price, LooseNumber,
};
use crate::MIN_NAME_LEN;

/// Longest accepted name for any entity.
pub const MAX_NAME_LEN: usize = 120;

// =============================================================================
// Sale
// =============================================================================

/// One row of the sale dialog's item table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleItemForm {
    pub flour_name: String,
    pub quantity: Option<LooseNumber>,
    pub unit_price: Option<LooseNumber>,
    pub commission_percent: Option<LooseNumber>,
}

impl SaleItemForm {
    /// The row a new sale starts with: one unit, no price, no commission.
    ///
    /// The price is left empty so an untouched row reports it as required.
    pub fn blank() -> Self {
        SaleItemForm {
            flour_name: String::new(),
            quantity: Some(LooseNumber::from(1)),
            unit_price: None,
            commission_percent: Some(LooseNumber::from(0)),
        }
    }

    fn validate_at(&self, index: usize, errors: &mut FormErrors) -> Option<LineItem> {
        let path = |field: &str| format!("items[{index}].{field}");

        let flour_name = errors.check(path("flourName"), validate_required("flour", &self.flour_name));

        let quantity = errors
            .check(
                path("quantity"),
                coerce_whole("quantity", self.quantity.as_ref()).and_then(|q| {
                    let q = q.ok_or_else(|| ValidationError::Required {
                        field: "quantity".to_string(),
                    })?;
                    validate_quantity(q)?;
                    Ok(q)
                }),
            );

        let unit_price = errors.check(
            path("unitPrice"),
            coerce_decimal("unit price", self.unit_price.as_ref()).and_then(|p| {
                let p = p.ok_or_else(|| ValidationError::Required {
                    field: "unit price".to_string(),
                })?;
                validate_unit_price(p)?;
                Ok(p)
            }),
        );

        let commission = errors.check(
            path("commissionPercent"),
            coerce_decimal("commission", self.commission_percent.as_ref()).and_then(|c| {
                let c = c.unwrap_or(Decimal::ZERO);
                validate_commission_percent(c)?;
                Ok(c)
            }),
        );

        Some(LineItem::new(
            flour_name?,
            quantity?,
            Money::new(unit_price?),
            CommissionRate::from_percent(commission?),
        ))
    }
}

/// The sale dialog's values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleForm {
    pub bakery_id: String,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub date: String,
    pub items: Vec<SaleItemForm>,
}

/// A validated sale, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleDraft {
    pub bakery_id: String,
    pub date: NaiveDate,
    pub items: Vec<LineItem>,
}

impl SaleDraft {
    /// Drafts from [`SaleForm::validate`] always total; hand-built ones
    /// may not.
    pub fn totals(&self) -> Result<SaleTotals, CoreError> {
        aggregate(&self.items)
    }
}

impl SaleForm {
    /// A new sale dated `today` with one blank item row.
    pub fn blank(today: NaiveDate) -> Self {
        SaleForm {
            bakery_id: String::new(),
            date: today.format("%Y-%m-%d").to_string(),
            items: vec![SaleItemForm::blank()],
        }
    }

    /// Pre-fills the dialog from a stored sale.
    pub fn from_sale(sale: &Sale) -> Self {
        SaleForm {
            bakery_id: sale.bakery_id.clone().unwrap_or_default(),
            date: sale.date.format("%Y-%m-%d").to_string(),
            items: sale
                .items
                .iter()
                .map(|item| SaleItemForm {
                    flour_name: item.flour_name.clone(),
                    quantity: Some(LooseNumber::from(item.quantity)),
                    unit_price: Some(LooseNumber::from(item.unit_price.amount())),
                    commission_percent: Some(LooseNumber::from(item.commission_percent.percent())),
                })
                .collect(),
        }
    }

    /// Validates every field and item.
    ///
    /// ## Example
    /// ```rust
    /// use moinho_core::forms::SaleForm;
    ///
    /// let form: SaleForm = serde_json::from_str(r#"{
    ///     "bakeryId": "b-1",
    ///     "date": "2024-05-02",
    ///     "items": [{ "flourName": "Especial", "quantity": "2", "unitPrice": 10, "commissionPercent": "5" }]
    /// }"#).unwrap();
    ///
    /// let draft = form.validate().unwrap();
    /// assert_eq!(draft.items[0].quantity, 2);
    /// ```
    pub fn validate(&self) -> Result<SaleDraft, FormErrors> {
        let mut errors = FormErrors::new();

        let bakery_id = errors.check("bakeryId", validate_required("bakery", &self.bakery_id));
        let date = errors.check("date", parse_date("date", &self.date));
        errors.check("items", validate_item_count(self.items.len()));

        let items: Vec<LineItem> = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.validate_at(i, &mut errors))
            .collect();

        if errors.is_empty() && aggregate(&items).is_err() {
            errors.push(
                "items",
                ValidationError::TotalTooLarge {
                    field: "items".to_string(),
                },
            );
        }

        match (bakery_id, date) {
            (Some(bakery_id), Some(date)) if errors.is_empty() => Ok(SaleDraft {
                bakery_id,
                date,
                items,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Flour
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlourForm {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlourDraft {
    pub name: String,
}

impl FlourForm {
    pub fn from_flour(flour: &Flour) -> Self {
        FlourForm {
            name: flour.name.clone(),
        }
    }

    pub fn validate(&self) -> Result<FlourDraft, FormErrors> {
        let mut errors = FormErrors::new();
        let name = errors.check("name", validate_name("name", &self.name, MIN_NAME_LEN, MAX_NAME_LEN));
        match name {
            Some(name) if errors.is_empty() => Ok(FlourDraft { name }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Bakery
// =============================================================================

/// One client row embedded in the bakery dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BakeryClientForm {
    /// Present when the row edits an existing client.
    pub id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
}

impl BakeryClientForm {
    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && optional_text(self.phone.as_deref()).is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BakeryForm {
    pub name: String,
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub cpf: Option<String>,
    pub cnpj: Option<String>,
    pub phone: Option<String>,
    pub clients: Vec<BakeryClientForm>,
}

/// A validated client row of a bakery.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEntry {
    pub id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
}

/// A validated bakery with the client rows that were filled in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BakeryDraft {
    pub name: String,
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub cpf: Option<String>,
    pub cnpj: Option<String>,
    pub phone: Option<String>,
    pub clients: Vec<ClientEntry>,
}

impl BakeryForm {
    /// An empty bakery with one blank client row.
    pub fn blank() -> Self {
        BakeryForm {
            clients: vec![BakeryClientForm::default()],
            ..BakeryForm::default()
        }
    }

    pub fn from_bakery(bakery: &BakeryWithClients) -> Self {
        let b = &bakery.bakery;
        BakeryForm {
            name: b.name.clone(),
            street: b.street.clone(),
            number: b.number.clone(),
            neighborhood: b.neighborhood.clone(),
            postal_code: b.postal_code.clone(),
            cpf: b.cpf.clone(),
            cnpj: b.cnpj.clone(),
            phone: b.phone.clone(),
            clients: bakery
                .clients
                .iter()
                .map(|c| BakeryClientForm {
                    id: Some(c.id.clone()),
                    name: c.name.clone(),
                    phone: c.phone.clone(),
                })
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<BakeryDraft, FormErrors> {
        let mut errors = FormErrors::new();

        let name = errors.check("name", validate_name("name", &self.name, MIN_NAME_LEN, MAX_NAME_LEN));

        let cpf = optional_text(self.cpf.as_deref());
        let cnpj = optional_text(self.cnpj.as_deref());
        if cpf.is_none() && cnpj.is_none() {
            let missing = ValidationError::MissingOneOf {
                fields: vec!["cpf".to_string(), "cnpj".to_string()],
            };
            errors.push("cpf", missing.clone());
            errors.push("cnpj", missing);
        }

        let postal_code = match optional_text(self.postal_code.as_deref()) {
            Some(code) => errors.check("postalCode", validate_postal_code(&code)),
            None => None,
        };

        let mut clients = Vec::new();
        for (i, row) in self.clients.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            let client_name = errors.check(
                format!("clients[{i}].name"),
                validate_name("client name", &row.name, MIN_NAME_LEN, MAX_NAME_LEN),
            );
            if let Some(client_name) = client_name {
                clients.push(ClientEntry {
                    id: optional_text(row.id.as_deref()),
                    name: client_name,
                    phone: optional_text(row.phone.as_deref()),
                });
            }
        }

        match name {
            Some(name) if errors.is_empty() => Ok(BakeryDraft {
                name,
                street: optional_text(self.street.as_deref()),
                number: optional_text(self.number.as_deref()),
                neighborhood: optional_text(self.neighborhood.as_deref()),
                postal_code,
                cpf,
                cnpj,
                phone: optional_text(self.phone.as_deref()),
                clients,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientForm {
    pub name: String,
    pub phone: Option<String>,
    pub bakery_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientDraft {
    pub name: String,
    pub phone: Option<String>,
    pub bakery_id: String,
}

impl ClientForm {
    pub fn from_client(client: &Client) -> Self {
        ClientForm {
            name: client.name.clone(),
            phone: client.phone.clone(),
            bakery_id: client.bakery_id.clone(),
        }
    }

    pub fn validate(&self) -> Result<ClientDraft, FormErrors> {
        let mut errors = FormErrors::new();
        let name = errors.check("name", validate_name("name", &self.name, MIN_NAME_LEN, MAX_NAME_LEN));
        let bakery_id = errors.check("bakeryId", validate_required("bakery", &self.bakery_id));

        match (name, bakery_id) {
            (Some(name), Some(bakery_id)) => Ok(ClientDraft {
                name,
                phone: optional_text(self.phone.as_deref()),
                bakery_id,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// A validated signup. `email` is lowercased.
#[derive(Debug, Clone)]
pub struct Signup {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<Signup, FormErrors> {
        let mut errors = FormErrors::new();
        let full_name = errors.check(
            "fullName",
            validate_name("full name", &self.full_name, MIN_NAME_LEN, MAX_NAME_LEN),
        );
        let email = errors.check("email", validate_email(&self.email));
        errors.check("password", validate_password(&self.password));

        match (full_name, email) {
            (Some(full_name), Some(email)) if errors.is_empty() => Ok(Signup {
                full_name,
                email,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, FormErrors> {
        let mut errors = FormErrors::new();
        let email = errors.check("email", validate_required("email", &self.email));
        if self.password.is_empty() {
            errors.push(
                "password",
                ValidationError::Required {
                    field: "password".to_string(),
                },
            );
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Credentials {
                email: email.to_lowercase(),
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Entity Forms
// =============================================================================

/// The values of any dashboard dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityForm {
    Sale(SaleForm),
    Flour(FlourForm),
    Bakery(BakeryForm),
    Client(ClientForm),
}

/// The validated values of any dashboard dialog.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityDraft {
    Sale(SaleDraft),
    Flour(FlourDraft),
    Bakery(BakeryDraft),
    Client(ClientDraft),
}

impl EntityForm {
    /// The defaults an "add" dialog opens with.
    pub fn blank(kind: EntityKind, today: NaiveDate) -> Self {
        match kind {
            EntityKind::Sale => EntityForm::Sale(SaleForm::blank(today)),
            EntityKind::Flour => EntityForm::Flour(FlourForm::default()),
            EntityKind::Bakery => EntityForm::Bakery(BakeryForm::blank()),
            EntityKind::Client => EntityForm::Client(ClientForm::default()),
        }
    }

    /// Reads submitted JSON as the form of `kind`.
    pub fn parse(kind: EntityKind, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EntityKind::Sale => EntityForm::Sale(serde_json::from_value(value)?),
            EntityKind::Flour => EntityForm::Flour(serde_json::from_value(value)?),
            EntityKind::Bakery => EntityForm::Bakery(serde_json::from_value(value)?),
            EntityKind::Client => EntityForm::Client(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityForm::Sale(_) => EntityKind::Sale,
            EntityForm::Flour(_) => EntityKind::Flour,
            EntityForm::Bakery(_) => EntityKind::Bakery,
            EntityForm::Client(_) => EntityKind::Client,
        }
    }

    pub fn validate(&self) -> Result<EntityDraft, FormErrors> {
        match self {
            EntityForm::Sale(f) => f.validate().map(EntityDraft::Sale),
            EntityForm::Flour(f) => f.validate().map(EntityDraft::Flour),
            EntityForm::Bakery(f) => f.validate().map(EntityDraft::Bakery),
            EntityForm::Client(f) => f.validate().map(EntityDraft::Client),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
