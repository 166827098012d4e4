//! In-progress sale edited slot by slot before a single commit.
//!
//! A draft holds ordered, index-addressed item and expense slots. Slots may be
//! left blank or half-filled between edits; only the ones passing
//! [`ItemSlot::is_valid`] / [`ExpenseSlot::is_valid`] are carried into a
//! commit, and the rest are dropped without error.

use crate::domain::money::{self, Costed, Priced};
use crate::domain::validation::{
    check_amount_limit, ValidationError, ValidationErrors, MAX_QUANTITY,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Item,
    Expense,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Item => f.write_str("item"),
            SlotKind::Expense => f.write_str("expense"),
        }
    }
}

/// Candidate line item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSlot {
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl Default for ItemSlot {
    fn default() -> Self {
        Self {
            description: String::new(),
            unit_price: Decimal::ZERO,
            quantity: 1,
        }
    }
}

impl ItemSlot {
    pub fn is_valid(&self) -> bool {
        !self.description.trim().is_empty() && self.unit_price > Decimal::ZERO
    }

    pub fn line_total(&self) -> Decimal {
        money::line_total(self.unit_price, self.quantity)
    }
}

impl Priced for ItemSlot {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Candidate expense.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpenseSlot {
    pub concept: String,
    pub amount: Decimal,
}

impl ExpenseSlot {
    pub fn is_valid(&self) -> bool {
        !self.concept.trim().is_empty() && self.amount > Decimal::ZERO
    }
}

impl Costed for ExpenseSlot {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Figures shown alongside a draft while it is being edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftTotals {
    pub sale_total: Decimal,
    pub expenses_total: Decimal,
    pub profit: Decimal,
    pub valid_items: usize,
    pub valid_expenses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftBuilder {
    items: Vec<ItemSlot>,
    expenses: Vec<ExpenseSlot>,
}

impl Default for DraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftBuilder {
    /// One blank item slot, no expense slots.
    pub fn new() -> Self {
        Self {
            items: vec![ItemSlot::default()],
            expenses: Vec::new(),
        }
    }

    pub fn items(&self) -> &[ItemSlot] {
        &self.items
    }

    pub fn expenses(&self) -> &[ExpenseSlot] {
        &self.expenses
    }

    /// Appends a blank item slot and returns its index.
    pub fn add_item_slot(&mut self) -> usize {
        self.items.push(ItemSlot::default());
        self.items.len() - 1
    }

    /// Appends a blank expense slot and returns its index.
    pub fn add_expense_slot(&mut self) -> usize {
        self.expenses.push(ExpenseSlot::default());
        self.expenses.len() - 1
    }

    /// Overwrites the item slot at `index`. The slot is left untouched when any
    /// check fails.
    pub fn update_item(
        &mut self,
        index: usize,
        description: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_index(&mut errors, SlotKind::Item, index, self.items.len());
        if unit_price < Decimal::ZERO {
            errors.push(ValidationError::NegativeAmount {
                kind: SlotKind::Item,
                value: unit_price,
            });
        }
        check_amount_limit(&mut errors, "unit price", unit_price);
        errors.check(
            (1..=MAX_QUANTITY).contains(&quantity),
            ValidationError::QuantityOutOfRange(quantity),
        );
        errors.into_result()?;

        self.items[index] = ItemSlot {
            description: description.into(),
            unit_price,
            quantity,
        };
        Ok(())
    }

    pub fn update_expense(
        &mut self,
        index: usize,
        concept: impl Into<String>,
        amount: Decimal,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_index(&mut errors, SlotKind::Expense, index, self.expenses.len());
        if amount < Decimal::ZERO {
            errors.push(ValidationError::NegativeAmount {
                kind: SlotKind::Expense,
                value: amount,
            });
        }
        check_amount_limit(&mut errors, "expense amount", amount);
        errors.into_result()?;

        self.expenses[index] = ExpenseSlot {
            concept: concept.into(),
            amount,
        };
        Ok(())
    }

    /// Removes the item slot at `index`; later slots shift down by one.
    pub fn remove_item(&mut self, index: usize) -> Result<ItemSlot, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_index(&mut errors, SlotKind::Item, index, self.items.len());
        errors.into_result()?;
        Ok(self.items.remove(index))
    }

    pub fn remove_expense(&mut self, index: usize) -> Result<ExpenseSlot, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_index(&mut errors, SlotKind::Expense, index, self.expenses.len());
        errors.into_result()?;
        Ok(self.expenses.remove(index))
    }

    pub fn valid_items(&self) -> impl Iterator<Item = &ItemSlot> + '_ {
        self.items.iter().filter(|slot| slot.is_valid())
    }

    pub fn valid_expenses(&self) -> impl Iterator<Item = &ExpenseSlot> + '_ {
        self.expenses.iter().filter(|slot| slot.is_valid())
    }

    pub fn totals(&self) -> DraftTotals {
        let sale_total = money::sale_total(self.valid_items());
        let expenses_total = money::expenses_total(self.valid_expenses());
        DraftTotals {
            sale_total,
            expenses_total,
            profit: money::profit(sale_total, expenses_total),
            valid_items: self.valid_items().count(),
            valid_expenses: self.valid_expenses().count(),
        }
    }

    /// Back to the state of [`DraftBuilder::new`].
    pub fn reset(&mut self) {
        self.items.clear();
        self.items.push(ItemSlot::default());
        self.expenses.clear();
    }
}

fn check_index(errors: &mut ValidationErrors, kind: SlotKind, index: usize, len: usize) {
    errors.check(
        index < len,
        ValidationError::SlotOutOfRange { kind, index, len },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::MAX_AMOUNT;
    use rust_decimal_macros::dec;

    #[test]
    fn new_draft_has_one_blank_item_and_no_expenses() {
        let draft = DraftBuilder::new();
        assert_eq!(draft.items(), &[ItemSlot::default()]);
        assert!(draft.expenses().is_empty());
        assert_eq!(draft.items()[0].quantity, 1);
    }

    #[test]
    fn slots_grow_without_bound() {
        let mut draft = DraftBuilder::new();
        for expected in 1..50 {
            assert_eq!(draft.add_item_slot(), expected);
        }
        assert_eq!(draft.add_expense_slot(), 0);
        assert_eq!(draft.add_expense_slot(), 1);
        assert_eq!(draft.items().len(), 50);
        assert_eq!(draft.expenses().len(), 2);
    }

    #[test]
    fn update_out_of_range_is_rejected_and_changes_nothing() {
        let mut draft = DraftBuilder::new();
        let before = draft.clone();

        let errors = draft.update_item(3, "Grabado", dec!(15.50), 1).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::SlotOutOfRange {
                kind: SlotKind::Item,
                index: 3,
                len: 1
            }]
        );

        let errors = draft.update_expense(0, "Acrílico", dec!(10)).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::SlotOutOfRange {
                kind: SlotKind::Expense,
                index: 0,
                len: 0
            }]
        );
        assert_eq!(draft, before);
    }

    #[test]
    fn update_rejects_zero_quantity_and_negative_price() {
        let mut draft = DraftBuilder::new();
        let errors = draft.update_item(0, "Corte", dec!(-1), 0).unwrap_err();
        assert_eq!(errors.errors().len(), 2);
        assert_eq!(draft.items()[0], ItemSlot::default());
    }

    #[test]
    fn amounts_above_the_limit_are_rejected_and_change_nothing() {
        let mut draft = DraftBuilder::new();
        let e = draft.add_expense_slot();
        let before = draft.clone();

        let errors = draft.update_item(0, "Corte", Decimal::MAX, 2).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::AmountTooLarge {
                field: "unit price",
                value: Decimal::MAX
            }]
        );
        let errors = draft.update_expense(e, "Plancha", Decimal::MAX).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::AmountTooLarge {
                field: "expense amount",
                value: Decimal::MAX
            }]
        );

        assert_eq!(draft, before);
        assert_eq!(draft.totals().sale_total, Decimal::ZERO);
    }

    #[test]
    fn totals_at_the_limits_stay_in_range() {
        let mut draft = DraftBuilder::new();
        draft.update_item(0, "Corte", MAX_AMOUNT, MAX_QUANTITY).unwrap();
        for _ in 0..999 {
            let i = draft.add_item_slot();
            draft.update_item(i, "Corte", MAX_AMOUNT, MAX_QUANTITY).unwrap();
            let e = draft.add_expense_slot();
            draft.update_expense(e, "Plancha", MAX_AMOUNT).unwrap();
        }

        let totals = draft.totals();
        assert_eq!(
            totals.sale_total,
            MAX_AMOUNT * Decimal::from(MAX_QUANTITY) * Decimal::from(1000u32)
        );
        assert_eq!(totals.expenses_total, MAX_AMOUNT * Decimal::from(999u32));
    }

    #[test]
    fn invalid_slots_are_filtered_not_rejected() {
        let mut draft = DraftBuilder::new();
        draft.update_item(0, "Corte acrílico", dec!(50.00), 2).unwrap();
        let blank_desc = draft.add_item_slot();
        draft.update_item(blank_desc, "   ", dec!(10.00), 1).unwrap();
        let free = draft.add_item_slot();
        draft.update_item(free, "Diseño", Decimal::ZERO, 1).unwrap();

        let e = draft.add_expense_slot();
        draft.update_expense(e, "Plancha MDF", dec!(30.00)).unwrap();
        draft.add_expense_slot();

        let items: Vec<_> = draft.valid_items().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Corte acrílico");
        assert_eq!(draft.valid_expenses().count(), 1);
    }

    #[test]
    fn totals_follow_valid_slots() {
        let mut draft = DraftBuilder::new();
        draft.update_item(0, "Corte acrílico", dec!(50.00), 2).unwrap();
        let i = draft.add_item_slot();
        draft.update_item(i, "Grabado", dec!(15.50), 1).unwrap();
        let e = draft.add_expense_slot();
        draft.update_expense(e, "Plancha", dec!(40.00)).unwrap();

        let totals = draft.totals();
        assert_eq!(totals.sale_total, dec!(115.50));
        assert_eq!(totals.expenses_total, dec!(40.00));
        assert_eq!(totals.profit, dec!(75.50));
        assert_eq!(totals.valid_items, 2);
        assert_eq!(totals.valid_expenses, 1);
    }

    #[test]
    fn remove_shifts_later_slots() {
        let mut draft = DraftBuilder::new();
        draft.update_item(0, "A", dec!(1), 1).unwrap();
        let b = draft.add_item_slot();
        draft.update_item(b, "B", dec!(2), 1).unwrap();

        let removed = draft.remove_item(0).unwrap();
        assert_eq!(removed.description, "A");
        assert_eq!(draft.items()[0].description, "B");
        assert!(draft.remove_expense(0).is_err());
    }

    #[test]
    fn reset_restores_initial_shape() {
        let mut draft = DraftBuilder::new();
        draft.update_item(0, "Corte", dec!(5), 3).unwrap();
        draft.add_item_slot();
        draft.add_expense_slot();

        draft.reset();
        assert_eq!(draft, DraftBuilder::new());
    }
}
