//! Currency arithmetic for sales.
//!
//! Every function here is pure and total over well-formed input. Amounts are
//! `Decimal`; values headed for storage go through [`round_currency`], which
//! rounds half away from zero to two fractional digits.
//!
//! Draft edits cap unit prices and expense amounts at
//! [`MAX_AMOUNT`](crate::domain::validation::MAX_AMOUNT) and quantities at
//! [`MAX_QUANTITY`](crate::domain::validation::MAX_QUANTITY). A line is then at
//! most about 1e16, and a sum reaches `Decimal::MAX` (about 7.9e28) only after
//! some 1e12 lines, so the plain operators here cannot overflow.

use crate::models::{Expense, LineItem};
use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept for every stored amount.
pub const CURRENCY_SCALE: u32 = 2;

/// Anything with a unit price and a quantity.
pub trait Priced {
    fn unit_price(&self) -> Decimal;
    fn quantity(&self) -> u32;
}

/// Anything carrying a single cost amount.
pub trait Costed {
    fn amount(&self) -> Decimal;
}

impl<T: Priced + ?Sized> Priced for &T {
    fn unit_price(&self) -> Decimal {
        (**self).unit_price()
    }

    fn quantity(&self) -> u32 {
        (**self).quantity()
    }
}

impl<T: Costed + ?Sized> Costed for &T {
    fn amount(&self) -> Decimal {
        (**self).amount()
    }
}

impl Priced for LineItem {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        u32::try_from(self.quantity).unwrap_or(0)
    }
}

impl Costed for Expense {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `unit_price × quantity`, rounded to cents.
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    round_currency(unit_price * Decimal::from(quantity))
}

/// Sum of line totals; zero for no items.
pub fn sale_total<I>(items: I) -> Decimal
where
    I: IntoIterator,
    I::Item: Priced,
{
    items
        .into_iter()
        .map(|item| line_total(item.unit_price(), item.quantity()))
        .sum()
}

/// Sum of expense amounts; zero for no expenses.
pub fn expenses_total<I>(expenses: I) -> Decimal
where
    I: IntoIterator,
    I::Item: Costed,
{
    expenses.into_iter().map(|e| e.amount()).sum()
}

/// What the customer still owes. Callers reject `advance > total` before
/// this point, so the result is non-negative for accepted input.
pub fn balance_due(total: Decimal, advance: Decimal) -> Decimal {
    total - advance
}

/// Negative profit is a loss and is reported as such.
pub fn profit(total: Decimal, expenses_total: Decimal) -> Decimal {
    total - expenses_total
}
