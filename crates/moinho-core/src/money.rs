//! # Money Module
//!
//! Provides the `Money` type for monetary values and `CommissionRate` for
//! the salesperson's cut on each line item.
//!
//! ## Precision
//! ```text
//! 3 sacks × R$ 5,00 × 10% = R$ 1,50        f64 gives 1.5000000000000002
//! 1 sack  × R$ 10,50 × 2.5% = R$ 0,2625    not a whole number of centavos
//!
//! Sale.total_commission = Σ items, exact  ──►  "R$ 0,26" only on screen
//! ```
//!
//! Commission rates are free decimals, so amounts stay [`Decimal`] and are
//! rounded to two places only by [`Money::format`].
//!
//! ## Usage
//! ```rust
//! use moinho_core::money::{CommissionRate, Money};
//!
//! let price = Money::from_cents(1050); // R$ 10,50
//! let subtotal = price * 3;            // R$ 31,50
//! let commission = subtotal.commission(CommissionRate::from_percent_int(5));
//! assert_eq!(commission, Money::from_cents(1575) / 10); // 1.575, unrounded
//! assert_eq!(commission.to_string(), "R$ 1,58");
//! ```

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in reais, kept as an exact decimal.
///
/// ## Design Decisions
/// - **Decimal, not cents**: commissions produce fractions of a centavo and
///   the stored totals must equal the exact sum of the items
/// - **Single field tuple struct**: arithmetic stays on the newtype
/// - **Serialized as a string**: `"40.00"` survives JSON without float loss
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  LineItem.unit_price ──► × quantity ──► subtotal ──┬──► Sale.total_value │
/// │                                                    │                    │
/// │                         × commission % / 100 ──────┴──► Sale.total_commission
/// │                                                                         │
/// │  Sale totals ──► SalesSummary ──► "R$ 1.234,56" in the dashboard footer │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use moinho_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.amount(), Decimal::new(1099, 2));
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Returns the exact amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use moinho_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_cents(897));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * Decimal::from(qty))
    }

    /// Commission on this amount at `rate`, exact and unrounded.
    ///
    /// ## Example
    /// ```rust
    /// use moinho_core::money::{CommissionRate, Money};
    ///
    /// let subtotal = Money::from_cents(1500); // 15.00
    /// let commission = subtotal.commission(CommissionRate::from_percent_int(10));
    /// assert_eq!(commission, Money::from_cents(150)); // 1.50
    /// ```
    pub fn commission(&self, rate: CommissionRate) -> Money {
        Money(self.0 * rate.percent() / Decimal::ONE_HUNDRED)
    }

    /// `self + other`, or `None` when the sum does not fit.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// [`multiply_quantity`](Self::multiply_quantity) that reports overflow
    /// instead of panicking.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(Decimal::from(qty)).map(Money)
    }

    /// [`commission`](Self::commission) that reports overflow instead of
    /// panicking.
    pub fn checked_commission(&self, rate: CommissionRate) -> Option<Money> {
        self.0
            .checked_mul(rate.percent())
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .map(Money)
    }

    /// The amount rounded to centavos, half away from zero.
    ///
    /// Only for display. Stored totals keep full precision.
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Formats the amount for people.
    ///
    /// ## Example
    /// ```rust
    /// use moinho_core::money::{CurrencyFormat, Money};
    ///
    /// let total = Money::from_cents(123456);
    /// assert_eq!(total.format(&CurrencyFormat::brl()), "R$ 1.234,56");
    /// assert_eq!(total.format(&CurrencyFormat::usd()), "$1,234.56");
    /// ```
    pub fn format(&self, fmt: &CurrencyFormat) -> String {
        let rounded = self.rounded();
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let digits = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(fmt.thousands_separator);
            }
            grouped.push(ch);
        }

        let space = if fmt.space_after_symbol { " " } else { "" };
        format!(
            "{}{}{}{}{}{}",
            sign, fmt.symbol, space, grouped, fmt.decimal_separator, frac_part
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display uses the Brazilian real format: `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(&CurrencyFormat::brl()))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Div<i64> for Money {
    type Output = Self;

    #[inline]
    fn div(self, divisor: i64) -> Self {
        Money(self.0 / Decimal::from(divisor))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Commission Rate
// =============================================================================

/// Commission as a percentage of the line subtotal (`5` means 5%).
///
/// Validation keeps it within 0–100; this type only carries the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommissionRate(#[ts(type = "string")] Decimal);

impl CommissionRate {
    #[inline]
    pub const fn from_percent(percent: Decimal) -> Self {
        CommissionRate(percent)
    }

    #[inline]
    pub fn from_percent_int(percent: i64) -> Self {
        CommissionRate(Decimal::from(percent))
    }

    #[inline]
    pub const fn zero() -> Self {
        CommissionRate(Decimal::ZERO)
    }

    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl FromStr for CommissionRate {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(CommissionRate)
    }
}

// =============================================================================
// Currency Format
// =============================================================================

/// How money is rendered: symbol and separators. Always two decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CurrencyFormat {
    pub symbol: String,
    #[ts(type = "string")]
    pub thousands_separator: char,
    #[ts(type = "string")]
    pub decimal_separator: char,
    pub space_after_symbol: bool,
}

impl CurrencyFormat {
    /// Brazilian real: `R$ 1.234,56`.
    pub fn brl() -> Self {
        CurrencyFormat {
            symbol: "R$".to_string(),
            thousands_separator: '.',
            decimal_separator: ',',
            space_after_symbol: true,
        }
    }

    /// US dollar: `$1,234.56`.
    pub fn usd() -> Self {
        CurrencyFormat {
            symbol: "$".to_string(),
            thousands_separator: ',',
            decimal_separator: '.',
            space_after_symbol: false,
        }
    }
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        CurrencyFormat::brl()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
