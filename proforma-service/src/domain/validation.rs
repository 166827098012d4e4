//! Input validation for every write path.
//!
//! Each check appends to a [`ValidationErrors`] list instead of returning on the
//! first failure, so a caller sees every failed precondition at once and
//! nothing is persisted until the list comes back empty.

use crate::domain::draft::{ExpenseSlot, ItemSlot, SlotKind};
use crate::models::NewCustomer;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub const PHONE_DIGITS: usize = 9;
pub const NATIONAL_ID_DIGITS: usize = 8;
pub const TAX_ID_DIGITS: usize = 11;

/// Largest amount a `NUMERIC(12,2)` column holds.
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);
pub const MAX_QUANTITY: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown customer: {0}")]
    UnknownCustomer(Uuid),

    #[error("unknown sale: {0}")]
    UnknownSale(Uuid),

    #[error("unknown expense: {0}")]
    UnknownExpense(Uuid),

    #[error("no items")]
    NoItems,

    #[error("sale total must be greater than zero")]
    NonPositiveTotal,

    #[error("advance must not be negative (got {0})")]
    NegativeAdvance(Decimal),

    #[error("advance {advance} exceeds sale total {total}")]
    AdvanceExceedsTotal { advance: Decimal, total: Decimal },

    #[error("{field} {value} exceeds the maximum of {max}", max = MAX_AMOUNT)]
    AmountTooLarge { field: &'static str, value: Decimal },

    #[error("customer name is required")]
    EmptyName,

    #[error("phone must be exactly {n} digits", n = PHONE_DIGITS)]
    InvalidPhone,

    #[error("national id must be exactly {n} digits", n = NATIONAL_ID_DIGITS)]
    InvalidNationalId,

    #[error("tax id must be exactly {n} digits", n = TAX_ID_DIGITS)]
    InvalidTaxId,

    #[error("expense concept is required")]
    EmptyConcept,

    #[error("expense amount must be greater than zero (got {0})")]
    NonPositiveExpenseAmount(Decimal),

    #[error("{kind} amount must not be negative (got {value})")]
    NegativeAmount { kind: SlotKind, value: Decimal },

    #[error("{kind} amount {value} rounds to zero at two decimals")]
    RoundsToZero { kind: SlotKind, value: Decimal },

    #[error("quantity must be between 1 and {max} (got {0})", max = MAX_QUANTITY)]
    QuantityOutOfRange(u32),

    #[error("{kind} slot {index} is out of range (draft has {len})")]
    SlotOutOfRange {
        kind: SlotKind,
        index: usize,
        len: usize,
    },
}

/// Every failed precondition of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        Self(vec![err])
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    pub fn check(&mut self, ok: bool, err: ValidationError) {
        if !ok {
            self.push(err);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn contains(&self, err: &ValidationError) -> bool {
        self.0.contains(err)
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Expects input already passed through [`NewCustomer::normalized`].
pub fn validate_customer(input: &NewCustomer) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    errors.check(!input.name.trim().is_empty(), ValidationError::EmptyName);

    if let Some(phone) = &input.phone {
        errors.check(is_digits(phone, PHONE_DIGITS), ValidationError::InvalidPhone);
    }
    if let Some(national_id) = &input.national_id {
        errors.check(
            is_digits(national_id, NATIONAL_ID_DIGITS),
            ValidationError::InvalidNationalId,
        );
    }
    if let Some(tax_id) = &input.tax_id {
        errors.check(is_digits(tax_id, TAX_ID_DIGITS), ValidationError::InvalidTaxId);
    }

    errors.into_result()
}

/// Range check shared by commit and later advance updates.
pub fn check_advance(errors: &mut ValidationErrors, advance: Decimal, total: Decimal) {
    if advance < Decimal::ZERO {
        errors.push(ValidationError::NegativeAdvance(advance));
    } else if advance > total {
        errors.push(ValidationError::AdvanceExceedsTotal { advance, total });
    }
}

pub fn check_amount_limit(errors: &mut ValidationErrors, field: &'static str, value: Decimal) {
    errors.check(
        value <= MAX_AMOUNT,
        ValidationError::AmountTooLarge { field, value },
    );
}

pub fn validate_advance(advance: Decimal, total: Decimal) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_advance(&mut errors, advance, total);
    errors.into_result()
}

/// What a commit is about to write, already rounded to cents.
pub struct CommitCandidate<'a> {
    pub customer_id: Uuid,
    pub customer_exists: bool,
    pub items: &'a [ItemSlot],
    pub expenses: &'a [ExpenseSlot],
    pub total: Decimal,
    pub advance: Decimal,
}

/// The single pass run before any commit write.
pub fn validate_commit(candidate: &CommitCandidate<'_>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    errors.check(
        candidate.customer_exists,
        ValidationError::UnknownCustomer(candidate.customer_id),
    );

    if candidate.items.is_empty() {
        errors.push(ValidationError::NoItems);
    } else {
        errors.check(
            candidate.total > Decimal::ZERO,
            ValidationError::NonPositiveTotal,
        );
    }

    for item in candidate.items {
        errors.check(
            item.unit_price > Decimal::ZERO,
            ValidationError::RoundsToZero {
                kind: SlotKind::Item,
                value: item.unit_price,
            },
        );
    }
    for expense in candidate.expenses {
        errors.check(
            expense.amount > Decimal::ZERO,
            ValidationError::RoundsToZero {
                kind: SlotKind::Expense,
                value: expense.amount,
            },
        );
        check_amount_limit(&mut errors, "expense amount", expense.amount);
    }

    check_amount_limit(&mut errors, "sale total", candidate.total);
    check_advance(&mut errors, candidate.advance, candidate.total);

    errors.into_result()
}

pub fn validate_expense(concept: &str, amount: Decimal) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check(!concept.trim().is_empty(), ValidationError::EmptyConcept);
    errors.check(
        amount > Decimal::ZERO,
        ValidationError::NonPositiveExpenseAmount(amount),
    );
    check_amount_limit(&mut errors, "expense amount", amount);
    errors.into_result()
}
