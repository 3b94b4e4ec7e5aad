//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.
//!
//! The data lives in a process-wide map keyed by spreadsheet id, so a test can seed a sheet, hand
//! its id to the code under test and inspect the result afterwards. Each operation is counted and
//! any operation can be made to fail.

use crate::api::Sheet;
use crate::model::{CellRange, CellRef, GridRange};
use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{LazyLock, Mutex, MutexGuard};

static SHEETS: LazyLock<Mutex<HashMap<String, TestSheetState>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn sheets() -> MutexGuard<'static, HashMap<String, TestSheetState>> {
    // A panicking test must not take every other test down with it.
    SHEETS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The primitive operations of the `Sheet` trait.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Operation {
    Read,
    Write,
    Append,
    Clear,
    Format,
}

serde_plain::derive_display_from_serialize!(Operation);

/// One cell of the in-memory grid.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub(crate) struct TestCell {
    value: String,
    bold: bool,
}

/// Everything the in-memory sheet knows: the grid of cells, which operations should fail and how
/// many times each operation was called.
#[derive(Debug, Default, Clone)]
pub(crate) struct TestSheetState {
    cells: Vec<Vec<TestCell>>,
    failures: BTreeSet<Operation>,
    calls: BTreeMap<Operation, usize>,
}

impl TestSheetState {
    /// Creates a sheet whose top-left cell is `A1`.
    #[cfg(test)]
    pub(crate) fn from_rows<R, C, S>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| TestCell {
                        value: value.into(),
                        bold: false,
                    })
                    .collect()
            })
            .collect();
        Self {
            cells,
            ..Self::default()
        }
    }

    /// The values in `range` without counting a read.
    #[cfg(test)]
    pub(crate) fn values(&self, range: &str) -> Vec<Vec<String>> {
        match range.parse::<CellRange>() {
            Ok(range) => self.read(&range),
            Err(_) => Vec::new(),
        }
    }

    /// Whether the zero-based cell is bold.
    #[cfg(test)]
    pub(crate) fn is_bold(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .map(|c| c.bold)
            .unwrap_or(false)
    }

    /// How many times `op` was called, including calls that failed.
    #[cfg(test)]
    pub(crate) fn calls(&self, op: Operation) -> usize {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    /// Makes every later call to `op` fail.
    #[cfg(test)]
    pub(crate) fn fail(&mut self, op: Operation) {
        self.failures.insert(op);
    }

    /// Counts the call and fails it if requested.
    fn begin(&mut self, op: Operation) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        if self.failures.contains(&op) {
            bail!("Injected {op} failure");
        }
        Ok(())
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> &mut TestCell {
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, TestCell::default);
        }
        &mut cells[col]
    }

    fn value(&self, row: usize, col: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .map(|c| c.value.as_str())
            .unwrap_or("")
    }

    /// Zero-based, inclusive row bounds of `range`, clipped to the grid.
    fn row_bounds(&self, range: &CellRange) -> (usize, usize) {
        let first = range.first_row() - 1;
        let last = match range.last_row() {
            Some(last) => last - 1,
            None => self.cells.len().saturating_sub(1),
        };
        (first, last)
    }

    fn read(&self, range: &CellRange) -> Vec<Vec<String>> {
        let (first_row, last_row) = self.row_bounds(range);
        let mut rows: Vec<Vec<String>> = Vec::new();
        for r in first_row..=last_row.min(self.cells.len().saturating_sub(1)) {
            if r >= self.cells.len() {
                break;
            }
            let mut row: Vec<String> = (range.first_col()..=range.last_col())
                .map(|c| self.value(r, c).to_string())
                .collect();
            while row.last().is_some_and(|v| v.is_empty()) {
                row.pop();
            }
            rows.push(row);
        }
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }

    fn write(&mut self, range: &CellRange, rows: &[Vec<String>]) {
        let top = range.first_row() - 1;
        let left = range.first_col();
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                self.cell_mut(top + i, left + j).value = value.clone();
            }
        }
    }

    fn clear(&mut self, range: &CellRange) {
        let (first_row, last_row) = self.row_bounds(range);
        for r in first_row..=last_row {
            let Some(row) = self.cells.get_mut(r) else {
                break;
            };
            for c in range.first_col()..=range.last_col() {
                if let Some(cell) = row.get_mut(c) {
                    cell.value.clear();
                }
            }
        }
    }

    /// Inserts `values` as a new row directly below the table that starts at `range`. Like Google
    /// Sheets, the inserted row takes the formatting of the row above it.
    fn append(&mut self, range: &CellRange, values: &[String]) -> String {
        let first_col = range.first_col();
        let last_col = range.last_col().max(first_col + values.len().saturating_sub(1));
        let mut target = range.first_row() - 1;
        while target < self.cells.len()
            && (first_col..=last_col).any(|c| !self.value(target, c).is_empty())
        {
            target += 1;
        }

        let inherited: Vec<bool> = (0..=last_col)
            .map(|c| target > 0 && self.is_bold_at(target - 1, c))
            .collect();
        if target < self.cells.len() {
            self.cells.insert(target, Vec::new());
        }
        for c in first_col..=last_col {
            let cell = self.cell_mut(target, c);
            cell.value = values.get(c - first_col).cloned().unwrap_or_default();
            cell.bold = inherited[c];
        }

        CellRange::new(
            range.sheet().map(|s| s.to_string()),
            CellRef::new(first_col, Some(target + 1)),
            Some(CellRef::new(last_col, Some(target + 1))),
        )
        .to_string()
    }

    fn is_bold_at(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .is_some_and(|c| c.bold)
    }

    fn format(&mut self, grid: GridRange, bold: bool) {
        for r in grid.start_row_index..grid.end_row_index {
            for c in grid.start_column_index..grid.end_column_index {
                self.cell_mut(r, c).bold = bold;
            }
        }
    }
}

/// An implementation of the `Sheet` trait that does not use Google sheets.
pub(crate) struct TestSheet {
    spreadsheet_id: String,
}

impl TestSheet {
    /// Uses the in-memory sheet registered under `spreadsheet_id`, creating an empty one if there
    /// is none.
    pub(crate) fn new(spreadsheet_id: impl Into<String>) -> Self {
        let spreadsheet_id = spreadsheet_id.into();
        sheets().entry(spreadsheet_id.clone()).or_default();
        Self { spreadsheet_id }
    }

    /// A copy of the current state of the sheet.
    #[cfg(test)]
    pub(crate) fn get_state(&self) -> TestSheetState {
        sheets()
            .get(&self.spreadsheet_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the state of the sheet.
    #[cfg(test)]
    pub(crate) fn set_state(&self, state: TestSheetState) {
        sheets().insert(self.spreadsheet_id.clone(), state);
    }

    fn with_state<T>(
        &self,
        op: Operation,
        range: &str,
        f: impl FnOnce(&mut TestSheetState, &CellRange) -> T,
    ) -> Result<T> {
        let range: CellRange = range
            .parse()
            .with_context(|| format!("Invalid range '{range}'"))?;
        let mut sheets = sheets();
        let state = sheets.entry(self.spreadsheet_id.clone()).or_default();
        state.begin(op)?;
        Ok(f(state, &range))
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn read_range(&mut self, range: &str) -> Result<Vec<Vec<String>>> {
        self.with_state(Operation::Read, range, |state, range| state.read(range))
    }

    async fn write_range(&mut self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        self.with_state(Operation::Write, range, |state, range| {
            state.write(range, rows)
        })
    }

    async fn append_row(&mut self, range: &str, row: &[String]) -> Result<String> {
        self.with_state(Operation::Append, range, |state, range| {
            state.append(range, row)
        })
    }

    async fn clear_range(&mut self, range: &str) -> Result<()> {
        self.with_state(Operation::Clear, range, |state, range| state.clear(range))
    }

    async fn set_bold(&mut self, range: GridRange, bold: bool) -> Result<()> {
        let mut sheets = sheets();
        let state = sheets.entry(self.spreadsheet_id.clone()).or_default();
        state.begin(Operation::Format)?;
        state.format(range, bold);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_read_trims_trailing_blanks() {
        let id = id();
        TestSheet::new(&id).set_state(
            TestSheetState::from_rows([
                vec!["Date", "Category", "Amount", "Description", "", "Year"],
                vec!["2024-01-01", "Food", "1", "", "", "2024"],
                vec!["", "", "", "", "", ""],
            ]),
        );
        let mut sheet = TestSheet::new(&id);
        let rows = sheet.read_range("Sheet1!A2:D").await.unwrap();
        assert_eq!(rows, vec![strings(&["2024-01-01", "Food", "1"])]);
        let rows = sheet.read_range("Sheet1!F1:G").await.unwrap();
        assert_eq!(rows, vec![strings(&["Year"]), strings(&["2024"])]);
        assert_eq!(TestSheet::new(&id).get_state().calls(Operation::Read), 2);
    }

    #[tokio::test]
    async fn test_append_inserts_below_table_and_inherits_bold() {
        let id = id();
        let mut state = TestSheetState::from_rows([
            vec!["Date", "Category", "Amount", "Description", "", "Year"],
            vec!["", "", "", "", "", "2024"],
        ]);
        state.format(GridRange::row(0, 0, 0, 4), true);
        TestSheet::new(&id).set_state(state);

        let mut sheet = TestSheet::new(&id);
        let updated = sheet
            .append_row("Sheet1!A1:D1", &strings(&["2024-01-01", "Food", "5", "x"]))
            .await
            .unwrap();
        assert_eq!(updated, "Sheet1!A2:D2");

        let state = TestSheet::new(&id).get_state();
        assert_eq!(
            state.values("Sheet1!A2:D2"),
            vec![strings(&["2024-01-01", "Food", "5", "x"])]
        );
        assert!(state.is_bold(1, 0));
        // The row that was there moved down.
        assert_eq!(state.values("Sheet1!F3:F3"), vec![strings(&["2024"])]);
    }

    #[tokio::test]
    async fn test_clear_keeps_formatting() {
        let id = id();
        let mut state = TestSheetState::from_rows([vec!["", "", "", "", "", "Year", "Total"]]);
        state.format(GridRange::row(0, 0, 5, 7), true);
        TestSheet::new(&id).set_state(state);

        let mut sheet = TestSheet::new(&id);
        sheet.clear_range("Sheet1!F1:G").await.unwrap();
        let state = TestSheet::new(&id).get_state();
        assert!(state.values("Sheet1!F1:G").is_empty());
        assert!(state.is_bold(0, 5));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let id = id();
        let mut state = TestSheetState::default();
        state.fail(Operation::Write);
        TestSheet::new(&id).set_state(state);

        let mut sheet = TestSheet::new(&id);
        let err = sheet
            .write_range("Sheet1!A1:B1", &[strings(&["a", "b"])])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("write"));
        let state = TestSheet::new(&id).get_state();
        assert_eq!(state.calls(Operation::Write), 1);
        assert!(state.values("Sheet1!A1:B1").is_empty());
    }
}
