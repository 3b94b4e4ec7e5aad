//! A1-notation cell ranges, as used by the Sheets API to address values, and zero-based grid
//! ranges, as used by the Sheets API to address formatting.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// A single corner of an A1 range. The column is zero-based, the row is one-based as it is in A1
/// notation. A missing row means the range is open-ended in that direction (e.g. `A2:D`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CellRef {
    pub col: usize,
    pub row: Option<usize>,
}

impl CellRef {
    pub fn new(col: usize, row: Option<usize>) -> Self {
        Self { col, row }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", column_letters(self.col))?;
        if let Some(row) = self.row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

/// A range in A1 notation, e.g. `Sheet1!A2:D` or `'My Sheet'!F1:G1`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CellRange {
    sheet: Option<String>,
    start: CellRef,
    end: Option<CellRef>,
}

impl CellRange {
    pub fn new(sheet: Option<String>, start: CellRef, end: Option<CellRef>) -> Self {
        Self { sheet, start, end }
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn start(&self) -> CellRef {
        self.start
    }

    /// The last cell of the range. A single-cell range ends where it starts.
    pub fn end(&self) -> CellRef {
        self.end.unwrap_or(self.start)
    }

    /// The one-based row number the range starts on. A range like `A:D` starts on row 1.
    pub fn first_row(&self) -> usize {
        self.start.row.unwrap_or(1)
    }

    /// The one-based row number the range ends on, or `None` if the range has no lower bound.
    pub fn last_row(&self) -> Option<usize> {
        match self.end {
            Some(end) => end.row,
            None => self.start.row,
        }
    }

    pub fn first_col(&self) -> usize {
        self.start.col
    }

    pub fn last_col(&self) -> usize {
        self.end().col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{}!", quote_sheet_name(sheet))?;
        }
        write!(f, "{}", self.start)?;
        if let Some(end) = self.end {
            write!(f, ":{end}")?;
        }
        Ok(())
    }
}

/// An error that can occur when parsing A1 notation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RangeError(String);

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for RangeError {}

impl FromStr for CellRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sheet, cells) = match s.rfind('!') {
            Some(ix) => (Some(unquote_sheet_name(&s[..ix])), &s[ix + 1..]),
            None => (None, s),
        };
        if cells.is_empty() {
            return Err(RangeError(format!("The range '{s}' has no cells")));
        }
        let mut parts = cells.split(':');
        let start = parse_cell(parts.next().unwrap_or_default(), s)?;
        let end = match parts.next() {
            Some(p) => Some(parse_cell(p, s)?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(RangeError(format!("The range '{s}' has too many ':' separators")));
        }
        Ok(Self { sheet, start, end })
    }
}

impl Serialize for CellRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CellRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CellRange::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A zero-based, half-open rectangle on a specific sheet (by numeric sheet id). This is the shape
/// of the `GridRange` object used by `spreadsheets.batchUpdate`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    pub start_row_index: usize,
    pub end_row_index: usize,
    pub start_column_index: usize,
    pub end_column_index: usize,
}

impl GridRange {
    /// The cells `[start_col, end_col)` of the single zero-based row `row`.
    pub fn row(sheet_id: i64, row: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            sheet_id,
            start_row_index: row,
            end_row_index: row + 1,
            start_column_index: start_col,
            end_column_index: end_col,
        }
    }
}

/// Converts a zero-based column index into its letters, e.g. `0` -> `A`, `27` -> `AB`.
pub fn column_letters(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn parse_cell(cell: &str, whole: &str) -> Result<CellRef, RangeError> {
    let letters: String = cell
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let digits = &cell[letters.len()..];
    if letters.is_empty() {
        return Err(RangeError(format!(
            "The cell '{cell}' in range '{whole}' has no column letters"
        )));
    }
    let mut col = 0usize;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        col = col
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .ok_or_else(|| {
                RangeError(format!(
                    "The column '{letters}' in range '{whole}' is out of bounds"
                ))
            })?;
    }
    let row = if digits.is_empty() {
        None
    } else {
        let row = digits
            .parse::<usize>()
            .map_err(|e| RangeError(format!("Invalid row '{digits}' in range '{whole}': {e}")))?;
        if row == 0 {
            return Err(RangeError(format!("Rows start at 1, in range '{whole}'")));
        }
        Some(row)
    };
    Ok(CellRef { col: col - 1, row })
}

fn quote_sheet_name(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn unquote_sheet_name(name: &str) -> String {
    match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(3), "D");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
    }

    #[test]
    fn test_parse_appended_range() {
        let range: CellRange = "Sheet1!A7:D7".parse().unwrap();
        assert_eq!(range.sheet(), Some("Sheet1"));
        assert_eq!(range.first_row(), 7);
        assert_eq!(range.last_row(), Some(7));
        assert_eq!(range.first_col(), 0);
        assert_eq!(range.last_col(), 3);
    }

    #[test]
    fn test_parse_open_ended() {
        let range: CellRange = "Sheet1!A2:D".parse().unwrap();
        assert_eq!(range.first_row(), 2);
        assert_eq!(range.last_row(), None);
        assert_eq!(range.last_col(), 3);

        let range: CellRange = "F:G".parse().unwrap();
        assert_eq!(range.sheet(), None);
        assert_eq!(range.first_row(), 1);
        assert_eq!(range.last_row(), None);
        assert_eq!(range.first_col(), 5);
    }

    #[test]
    fn test_parse_single_cell() {
        let range: CellRange = "B3".parse().unwrap();
        assert_eq!(range.first_row(), 3);
        assert_eq!(range.last_row(), Some(3));
        assert_eq!(range.first_col(), 1);
        assert_eq!(range.last_col(), 1);
    }

    #[test]
    fn test_parse_quoted_sheet_name() {
        let range: CellRange = "'My ''Expenses'''!I1:J1".parse().unwrap();
        assert_eq!(range.sheet(), Some("My 'Expenses'"));
        assert_eq!(range.first_col(), 8);
        assert_eq!(range.to_string(), "'My ''Expenses'''!I1:J1");
    }

    #[test]
    fn test_display() {
        let range = CellRange::new(
            Some("Sheet1".to_string()),
            CellRef::new(0, Some(2)),
            Some(CellRef::new(3, None)),
        );
        assert_eq!(range.to_string(), "Sheet1!A2:D");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("Sheet1!".parse::<CellRange>().is_err());
        assert!("Sheet1!12".parse::<CellRange>().is_err());
        assert!("A0".parse::<CellRange>().is_err());
        assert!("A1:B2:C3".parse::<CellRange>().is_err());
    }

    #[test]
    fn test_parse_column_too_long() {
        let range = format!("Sheet1!{}1:D1", "Z".repeat(40));
        let err = range.parse::<CellRange>().unwrap_err();
        assert!(err.to_string().contains("out of bounds"), "{err}");
    }

    #[test]
    fn test_grid_range_json() {
        let grid = GridRange::row(0, 4, 0, 4);
        let json = serde_json::to_value(grid).unwrap();
        assert_eq!(json["sheetId"], 0);
        assert_eq!(json["startRowIndex"], 4);
        assert_eq!(json["endRowIndex"], 5);
        assert_eq!(json["startColumnIndex"], 0);
        assert_eq!(json["endColumnIndex"], 4);
    }
}
