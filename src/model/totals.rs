//! The yearly and monthly rollup tables that live to the right of the expense rows.
//!
//! Both are recomputed from scratch from the full set of data rows every time; neither is ever
//! updated incrementally.

use crate::model::expense::{AMOUNT_IDX, DATE_IDX};
use crate::model::Amount;
use chrono::Month;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::debug;

pub(crate) const YEAR_STR: &str = "Year";
pub(crate) const MONTH_STR: &str = "Month";
pub(crate) const TOTAL_EXPENSES_STR: &str = "Total Expenses";

/// Rows must have at least this many cells (date, category, amount) to be counted.
const MIN_CELLS: usize = 3;

/// Total expenses per year, across all data rows.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct YearlyTotals {
    totals: Vec<(String, Amount)>,
}

impl YearlyTotals {
    /// Sums the amounts of `rows` by year. The year is whatever precedes the first `-` in the date
    /// cell. Years are ordered numerically; a year that is not a number sorts after all numeric
    /// years.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut sums: HashMap<String, Amount> = HashMap::new();
        for (date, amount) in countable(rows) {
            let year = year_segment(date);
            accumulate(sums.entry(year.to_string()).or_default(), amount, date);
        }
        let mut totals: Vec<(String, Amount)> = sums.into_iter().collect();
        totals.sort_by(|(a, _), (b, _)| compare_years(a, b));
        Self { totals }
    }

    pub fn totals(&self) -> &[(String, Amount)] {
        &self.totals
    }

    pub fn get(&self, year: &str) -> Option<Amount> {
        self.totals
            .iter()
            .find(|(y, _)| y == year)
            .map(|(_, amount)| *amount)
    }

    /// The header row followed by one row per year.
    pub fn to_sheet_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec![YEAR_STR.to_string(), TOTAL_EXPENSES_STR.to_string()]];
        rows.extend(
            self.totals
                .iter()
                .map(|(year, total)| vec![year.clone(), total.to_string()]),
        );
        rows
    }
}

/// Total expenses per month, for a single year.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MonthlyTotals {
    year: i32,
    /// Keyed by month number, 1 through 12, which gives calendar order.
    totals: BTreeMap<u32, Amount>,
}

impl MonthlyTotals {
    /// Sums the amounts of the rows dated in `year` by month. The month comes from the second
    /// `-`-separated segment of the date cell; rows where that is not a month number are skipped.
    pub fn from_rows(rows: &[Vec<String>], year: i32) -> Self {
        let year_str = year.to_string();
        let mut totals: BTreeMap<u32, Amount> = BTreeMap::new();
        for (date, amount) in countable(rows) {
            let mut segments = date.split('-');
            if segments.next().map(str::trim) != Some(year_str.as_str()) {
                continue;
            }
            let Some(month) = segments.next().and_then(|m| m.trim().parse::<u32>().ok()) else {
                continue;
            };
            if !(1..=12).contains(&month) {
                continue;
            }
            accumulate(totals.entry(month).or_default(), amount, date);
        }
        Self { year, totals }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn get(&self, month: Month) -> Option<Amount> {
        self.totals.get(&month.number_from_month()).copied()
    }

    /// The header row followed by one row per month that has expenses, in calendar order.
    pub fn to_sheet_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec![
            MONTH_STR.to_string(),
            format!("{TOTAL_EXPENSES_STR} ({})", self.year),
        ]];
        rows.extend(
            self.totals
                .iter()
                .map(|(month, total)| vec![month_name(*month).to_string(), total.to_string()]),
        );
        rows
    }
}

/// Yields the (date, amount) of every row that takes part in the rollups: at least three cells, a
/// non-empty date and an amount that parses.
fn countable(rows: &[Vec<String>]) -> impl Iterator<Item = (&str, Amount)> {
    rows.iter()
        .filter(|row| row.len() >= MIN_CELLS)
        .filter_map(|row| {
            let date = row[DATE_IDX].as_str();
            if date.trim().is_empty() {
                return None;
            }
            let amount = Amount::from_str(&row[AMOUNT_IDX]).ok()?;
            Some((date, amount))
        })
}

/// Adds `amount` to `total`. A row whose amount would overflow the total is skipped like a row
/// whose amount does not parse.
fn accumulate(total: &mut Amount, amount: Amount, date: &str) {
    match total.checked_add(amount) {
        Some(sum) => *total = sum,
        None => debug!("Skipping the amount {amount} dated '{date}', the total would overflow"),
    }
}

fn year_segment(date: &str) -> &str {
    date.split('-').next().unwrap_or(date).trim()
}

fn compare_years(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or_default()
}
