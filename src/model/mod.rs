//! Types that represent the core data model, such as `Expense` and the rollup tables.
mod amount;
mod expense;
mod range;
mod totals;

pub use amount::{Amount, AmountError};
pub use expense::{parse_date, sort_by_date, Expense, DATE_FORMAT, HEADERS};
pub use range::{column_letters, CellRange, CellRef, GridRange, RangeError};
pub use totals::{MonthlyTotals, YearlyTotals};
