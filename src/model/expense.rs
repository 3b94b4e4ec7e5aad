use crate::model::Amount;
use crate::Result;
use anyhow::ensure;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The header row of the expense table. Row 1 of the sheet must hold exactly these labels.
pub const HEADERS: [&str; 4] = [DATE_STR, CATEGORY_STR, AMOUNT_STR, DESCRIPTION_STR];

pub(crate) const DATE_STR: &str = "Date";
pub(crate) const CATEGORY_STR: &str = "Category";
pub(crate) const AMOUNT_STR: &str = "Amount";
pub(crate) const DESCRIPTION_STR: &str = "Description";

pub(crate) const DATE_IDX: usize = 0;
pub(crate) const AMOUNT_IDX: usize = 2;

/// The format dates are written in.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date formats that are accepted when reading rows back from the sheet. The sheet may render an
/// entered ISO date in the spreadsheet's locale, or a person may have typed a row by hand.
const READ_FORMATS: &[&str] = &[DATE_FORMAT, "%Y/%m/%d", "%m/%d/%Y", "%Y-%m-%d %H:%M:%S"];

/// A single expense, one row of the expense table.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Expense {
    date: NaiveDate,
    category: String,
    amount: Amount,
    description: String,
}

impl Expense {
    /// Creates a validated expense.
    ///
    /// # Errors
    /// - The category is blank.
    /// - The amount is zero or negative.
    pub fn new(
        date: NaiveDate,
        category: impl Into<String>,
        amount: Amount,
        description: impl Into<String>,
    ) -> Result<Self> {
        let category = category.into().trim().to_string();
        ensure!(!category.is_empty(), "The category must not be empty");
        ensure!(
            amount.is_positive(),
            "The amount must be greater than zero, got {amount}"
        );
        Ok(Self {
            date,
            category,
            amount,
            description: description.into(),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The four cell values, in header order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.format(DATE_FORMAT).to_string(),
            self.category.clone(),
            self.amount.to_string(),
            self.description.clone(),
        ]
    }
}

/// Parses a date cell. Returns `None` for anything that is not a recognizable date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    READ_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Sorts data rows by their date cell, ascending, and drops rows whose cells are all blank.
///
/// Rows whose date cannot be parsed, including rows with no date cell at all, are ordered as if
/// they carried the earliest possible date, so they collect at the top of the table. The sort is
/// stable, so rows with equal dates keep their relative order. A blank row would otherwise sort
/// first and leave a gap under the header.
pub fn sort_by_date(rows: &mut Vec<Vec<String>>) {
    rows.retain(|row| row.iter().any(|cell| !cell.trim().is_empty()));
    rows.sort_by_cached_key(|row| {
        row.get(DATE_IDX)
            .and_then(|d| parse_date(d))
            .unwrap_or(NaiveDate::MIN)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(date: &str, amount: &str) -> Vec<String> {
        vec![
            date.to_string(),
            "Food & Dining".to_string(),
            amount.to_string(),
            String::new(),
        ]
    }

    #[test]
    fn test_expense_to_row() {
        let expense = Expense::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Food & Dining",
            Amount::from_str("12.50").unwrap(),
            "lunch",
        )
        .unwrap();
        assert_eq!(
            expense.to_row(),
            vec!["2024-03-01", "Food & Dining", "12.5", "lunch"]
        );
    }

    #[test]
    fn test_expense_rejects_non_positive_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(Expense::new(date, "Travel", Amount::ZERO, "").is_err());
        let negative = Amount::from_str("-4").unwrap();
        let err = Expense::new(date, "Travel", negative, "").unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_expense_rejects_blank_category() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let amount = Amount::from_str("1").unwrap();
        assert!(Expense::new(date, "  ", amount, "x").is_err());
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2023, 6, 1);
        assert_eq!(parse_date("2023-06-01"), expected);
        assert_eq!(parse_date(" 2023-06-01 "), expected);
        assert_eq!(parse_date("6/1/2023"), expected);
        assert_eq!(parse_date("2023/06/01"), expected);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2023-13-01"), None);
    }

    #[test]
    fn test_sort_by_date() {
        let mut rows = vec![
            row("2024-05-05", "50"),
            row("2023-01-10", "100"),
            row("2023-06-01", "25"),
        ];
        sort_by_date(&mut rows);
        let dates: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(dates, vec!["2023-01-10", "2023-06-01", "2024-05-05"]);
    }

    #[test]
    fn test_sort_unparsable_dates_first_and_stable() {
        let mut rows = vec![
            row("2024-01-02", "1"),
            row("not a date", "2"),
            row("2024-01-01", "3"),
            row("", "4"),
            row("2024-01-01", "5"),
        ];
        sort_by_date(&mut rows);
        let amounts: Vec<String> = rows
            .iter()
            .map(|r| r.get(AMOUNT_IDX).cloned().unwrap_or_default())
            .collect();
        assert_eq!(amounts, vec!["2", "4", "3", "5", "1"]);
    }

    #[test]
    fn test_sort_drops_blank_rows() {
        let mut rows = vec![
            row("2024-05-01", "1"),
            vec![],
            vec![String::new(), " ".to_string()],
            row("2024-01-01", "2"),
        ];
        sort_by_date(&mut rows);
        assert_eq!(rows, vec![row("2024-01-01", "2"), row("2024-05-01", "1")]);
    }
}
