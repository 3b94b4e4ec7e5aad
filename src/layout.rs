//! Where things live in the sheet: the expense table in columns A-D, yearly totals in F-G and
//! monthly totals in I-J, each with a header in row 1.

use crate::model::{CellRange, CellRef, GridRange, HEADERS};

pub(crate) const DEFAULT_SHEET_NAME: &str = "Sheet1";
pub(crate) const DEFAULT_SHEET_ID: i64 = 0;

const DATA_FIRST_COL: usize = 0;
const CATEGORY_COL: usize = 1;
const YEARLY_FIRST_COL: usize = 5;
const MONTHLY_FIRST_COL: usize = 8;
const AGGREGATE_WIDTH: usize = 2;

/// Identifies the single sheet (tab) that holds the expense table and computes the A1 ranges and
/// grid ranges of each table on it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Layout {
    sheet_name: String,
    sheet_id: i64,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(DEFAULT_SHEET_NAME, DEFAULT_SHEET_ID)
    }
}

impl Layout {
    /// `sheet_name` is the tab name used in A1 notation, `sheet_id` is the numeric grid id used
    /// for formatting requests.
    pub fn new(sheet_name: impl Into<String>, sheet_id: i64) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            sheet_id,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn sheet_id(&self) -> i64 {
        self.sheet_id
    }

    /// `A1:D1`
    pub fn header_range(&self) -> String {
        self.range(DATA_FIRST_COL, Some(1), self.data_last_col(), Some(1))
    }

    /// `A2:D`
    pub fn data_range(&self) -> String {
        self.range(DATA_FIRST_COL, Some(2), self.data_last_col(), None)
    }

    /// `B2:B`
    pub fn category_range(&self) -> String {
        self.range(CATEGORY_COL, Some(2), CATEGORY_COL, None)
    }

    /// The range handed to the append call. The store finds the end of the table that starts here.
    pub fn append_range(&self) -> String {
        self.header_range()
    }

    /// `F1:G`
    pub fn yearly_range(&self) -> String {
        self.aggregate_range(YEARLY_FIRST_COL)
    }

    /// `I1:J`
    pub fn monthly_range(&self) -> String {
        self.aggregate_range(MONTHLY_FIRST_COL)
    }

    /// The first `row_count` rows of the yearly table, starting at its header.
    pub fn yearly_write_range(&self, row_count: usize) -> String {
        self.aggregate_write_range(YEARLY_FIRST_COL, row_count)
    }

    /// The first `row_count` rows of the monthly table, starting at its header.
    pub fn monthly_write_range(&self, row_count: usize) -> String {
        self.aggregate_write_range(MONTHLY_FIRST_COL, row_count)
    }

    /// The data rows `A2:D{row_count + 1}`.
    pub fn data_write_range(&self, row_count: usize) -> String {
        self.range(
            DATA_FIRST_COL,
            Some(2),
            self.data_last_col(),
            Some(row_count + 1),
        )
    }

    pub fn header_grid(&self) -> GridRange {
        GridRange::row(self.sheet_id, 0, DATA_FIRST_COL, HEADERS.len())
    }

    pub fn yearly_header_grid(&self) -> GridRange {
        GridRange::row(
            self.sheet_id,
            0,
            YEARLY_FIRST_COL,
            YEARLY_FIRST_COL + AGGREGATE_WIDTH,
        )
    }

    pub fn monthly_header_grid(&self) -> GridRange {
        GridRange::row(
            self.sheet_id,
            0,
            MONTHLY_FIRST_COL,
            MONTHLY_FIRST_COL + AGGREGATE_WIDTH,
        )
    }

    /// The expense-table cells of the one-based sheet row `row`.
    pub fn data_row_grid(&self, row: usize) -> GridRange {
        GridRange::row(
            self.sheet_id,
            row.saturating_sub(1),
            DATA_FIRST_COL,
            HEADERS.len(),
        )
    }

    fn data_last_col(&self) -> usize {
        DATA_FIRST_COL + HEADERS.len() - 1
    }

    fn aggregate_range(&self, first_col: usize) -> String {
        self.range(first_col, Some(1), first_col + AGGREGATE_WIDTH - 1, None)
    }

    fn aggregate_write_range(&self, first_col: usize, row_count: usize) -> String {
        self.range(
            first_col,
            Some(1),
            first_col + AGGREGATE_WIDTH - 1,
            Some(row_count.max(1)),
        )
    }

    fn range(
        &self,
        start_col: usize,
        start_row: Option<usize>,
        end_col: usize,
        end_row: Option<usize>,
    ) -> String {
        CellRange::new(
            Some(self.sheet_name.clone()),
            CellRef::new(start_col, start_row),
            Some(CellRef::new(end_col, end_row)),
        )
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ranges() {
        let layout = Layout::default();
        assert_eq!(layout.header_range(), "Sheet1!A1:D1");
        assert_eq!(layout.data_range(), "Sheet1!A2:D");
        assert_eq!(layout.category_range(), "Sheet1!B2:B");
        assert_eq!(layout.append_range(), "Sheet1!A1:D1");
        assert_eq!(layout.yearly_range(), "Sheet1!F1:G");
        assert_eq!(layout.monthly_range(), "Sheet1!I1:J");
        assert_eq!(layout.yearly_write_range(3), "Sheet1!F1:G3");
        assert_eq!(layout.monthly_write_range(1), "Sheet1!I1:J1");
        assert_eq!(layout.data_write_range(5), "Sheet1!A2:D6");
    }

    #[test]
    fn test_grids() {
        let layout = Layout::new("Expenses", 7);
        assert_eq!(layout.header_grid(), GridRange::row(7, 0, 0, 4));
        assert_eq!(layout.yearly_header_grid(), GridRange::row(7, 0, 5, 7));
        assert_eq!(layout.monthly_header_grid(), GridRange::row(7, 0, 8, 10));
        assert_eq!(layout.data_row_grid(5), GridRange::row(7, 4, 0, 4));
    }

    #[test]
    fn test_quoted_sheet_name() {
        let layout = Layout::new("My Expenses", 0);
        assert_eq!(layout.data_range(), "'My Expenses'!A2:D");
    }
}
