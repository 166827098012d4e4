//! Pure domain logic: money arithmetic, the draft accumulator, and input validation.

pub mod draft;
pub mod money;
pub mod validation;

pub use draft::{DraftBuilder, DraftTotals, ExpenseSlot, ItemSlot, SlotKind};
pub use money::{
    balance_due, expenses_total, line_total, profit, round_currency, sale_total, Costed, Priced,
};
pub use validation::{ValidationError, ValidationErrors};
