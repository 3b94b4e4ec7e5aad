//! The `Synchronizer` records expenses into the sheet and keeps the derived tables next to them
//! up-to-date.
//!
//! Recording an expense is a sequence of independent calls to the store with no transaction
//! around them: append the row, clear the bold it inherits from the row above, re-sort the table
//! by date, then recompute the yearly and monthly totals. Only the append decides whether the
//! expense was recorded. Every later step is best-effort; a failure is logged, noted in the
//! `SyncReport` and the remaining steps still run.

use crate::api::{self, Mode, Sheet};
use crate::categories::CategoryRegistry;
use crate::model::{sort_by_date, CellRange, Expense, MonthlyTotals, YearlyTotals};
use crate::schema::{self, HeaderStatus};
use crate::{Config, Layout, Result};
use anyhow::Context;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

/// The steps of recording an expense, in the order they run.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    Append,
    Format,
    Sort,
    Yearly,
    Monthly,
}

serde_plain::derive_display_from_serialize!(SyncStep);
serde_plain::derive_fromstr_from_deserialize!(SyncStep);

/// Which steps of a sync succeeded.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub appended: bool,
    pub formatted: bool,
    pub sorted: bool,
    pub yearly_recomputed: bool,
    pub monthly_recomputed: bool,
}

impl SyncReport {
    /// The expense was recorded. The derived tables may still be stale, see `failed_steps`.
    pub fn is_success(&self) -> bool {
        self.appended
    }

    /// The table is sorted and both totals tables reflect it.
    pub fn is_recomputed(&self) -> bool {
        self.sorted && self.yearly_recomputed && self.monthly_recomputed
    }

    /// The steps that did not succeed, in the order they run.
    pub fn failed_steps(&self) -> Vec<SyncStep> {
        [
            (SyncStep::Append, self.appended),
            (SyncStep::Format, self.formatted),
            (SyncStep::Sort, self.sorted),
            (SyncStep::Yearly, self.yearly_recomputed),
            (SyncStep::Monthly, self.monthly_recomputed),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(step, _)| step)
        .collect()
    }
}

/// Owns the connection to the sheet and the category registry for the life of the process.
///
/// The sheet sits behind an async mutex that is held for a whole sync, so two expenses recorded
/// at the same time cannot interleave their read, clear and write calls. The registry has its own
/// lock so that autocomplete does not wait for a sync to finish.
pub struct Synchronizer {
    sheet: Mutex<Box<dyn Sheet + Send>>,
    layout: Layout,
    registry: RwLock<CategoryRegistry>,
}

impl Synchronizer {
    /// Connects to the configured sheet and runs the startup steps, see `start`.
    pub async fn connect(config: &Config, mode: Mode) -> Result<Self> {
        let sheet = api::sheet(config, mode)
            .await
            .context("Unable to connect to the sheet")?;
        Ok(Self::start(sheet, config.layout()).await)
    }

    /// Makes sure the header row is in place and loads the known categories from the sheet.
    /// Failures are logged and do not prevent startup; the registry then holds only the
    /// predefined categories.
    pub(crate) async fn start(mut sheet: Box<dyn Sheet + Send>, layout: Layout) -> Self {
        match schema::ensure_headers(sheet.as_mut(), &layout).await {
            Ok(HeaderStatus::Present) => debug!("The header row is in place"),
            Ok(HeaderStatus::Written) => info!("Created the header row"),
            Err(e) => error!("Unable to check the header row: {e:?}"),
        }
        let registry = match CategoryRegistry::load(sheet.as_mut(), &layout).await {
            Ok(registry) => registry,
            Err(e) => {
                error!("Unable to load categories from the sheet: {e:?}");
                CategoryRegistry::new()
            }
        };
        Self::new(sheet, layout, registry)
    }

    pub(crate) fn new(
        sheet: Box<dyn Sheet + Send>,
        layout: Layout,
        registry: CategoryRegistry,
    ) -> Self {
        Self {
            sheet: Mutex::new(sheet),
            layout,
            registry: RwLock::new(registry),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Records `expense`, using today's local date to decide which year the monthly totals show.
    pub async fn record_expense(&self, expense: &Expense) -> SyncReport {
        self.record_expense_on(expense, today()).await
    }

    /// Records `expense` with the monthly totals computed for the year of `today`.
    pub async fn record_expense_on(&self, expense: &Expense, today: NaiveDate) -> SyncReport {
        let mut sheet = self.sheet.lock().await;
        let sheet = sheet.as_mut();
        let mut report = SyncReport::default();

        let updated_range = match sheet
            .append_row(&self.layout.append_range(), &expense.to_row())
            .await
        {
            Ok(range) => range,
            Err(e) => {
                error!("Failed to add the expense to the sheet: {e:?}");
                return report;
            }
        };
        report.appended = true;
        info!("Appended {expense:?} at {updated_range}");

        report.formatted = finish(
            SyncStep::Format,
            self.clear_inherited_bold(sheet, &updated_range).await,
        );

        if self.registry.write().await.add(expense.category()) {
            info!("Added new category '{}'", expense.category());
        }

        self.recompute(sheet, today, &mut report).await;
        report
    }

    /// Re-sorts the table and recomputes both totals tables without recording anything. This
    /// repairs the derived tables after rows were edited by hand.
    pub async fn resync(&self) -> SyncReport {
        self.resync_on(today()).await
    }

    pub async fn resync_on(&self, today: NaiveDate) -> SyncReport {
        let mut sheet = self.sheet.lock().await;
        let mut report = SyncReport::default();
        self.recompute(sheet.as_mut(), today, &mut report).await;
        report
    }

    /// Up to 25 known categories containing `query`, ignoring case.
    pub async fn suggest_categories(&self, query: &str) -> Vec<String> {
        self.registry.read().await.suggest(query)
    }

    /// How many categories are known.
    pub async fn category_count(&self) -> usize {
        self.registry.read().await.len()
    }

    async fn recompute(&self, sheet: &mut dyn Sheet, today: NaiveDate, report: &mut SyncReport) {
        report.sorted = finish(SyncStep::Sort, self.sort(sheet).await);
        report.yearly_recomputed = finish(SyncStep::Yearly, self.yearly(sheet).await);
        report.monthly_recomputed =
            finish(SyncStep::Monthly, self.monthly(sheet, today.year()).await);
    }

    /// The appended row takes the formatting of the row above it, which is the bold header when
    /// the table was empty.
    async fn clear_inherited_bold(&self, sheet: &mut dyn Sheet, updated_range: &str) -> Result<()> {
        let range: CellRange = updated_range
            .parse()
            .with_context(|| format!("Unable to parse the appended range '{updated_range}'"))?;
        sheet
            .set_bold(self.layout.data_row_grid(range.first_row()), false)
            .await
    }

    async fn sort(&self, sheet: &mut dyn Sheet) -> Result<()> {
        let data_range = self.layout.data_range();
        let mut rows = sheet.read_range(&data_range).await?;
        sort_by_date(&mut rows);
        sheet.clear_range(&data_range).await?;
        if !rows.is_empty() {
            sheet
                .write_range(&self.layout.data_write_range(rows.len()), &rows)
                .await?;
        }
        debug!("Sorted {} rows by date", rows.len());
        Ok(())
    }

    async fn yearly(&self, sheet: &mut dyn Sheet) -> Result<()> {
        let rows = sheet.read_range(&self.layout.data_range()).await?;
        let totals = YearlyTotals::from_rows(&rows).to_sheet_rows();
        sheet.clear_range(&self.layout.yearly_range()).await?;
        sheet
            .write_range(&self.layout.yearly_write_range(totals.len()), &totals)
            .await?;
        sheet
            .set_bold(self.layout.yearly_header_grid(), true)
            .await?;
        debug!("Wrote {} yearly totals", totals.len() - 1);
        Ok(())
    }

    async fn monthly(&self, sheet: &mut dyn Sheet, year: i32) -> Result<()> {
        let rows = sheet.read_range(&self.layout.data_range()).await?;
        let totals = MonthlyTotals::from_rows(&rows, year).to_sheet_rows();
        sheet.clear_range(&self.layout.monthly_range()).await?;
        sheet
            .write_range(&self.layout.monthly_write_range(totals.len()), &totals)
            .await?;
        sheet
            .set_bold(self.layout.monthly_header_grid(), true)
            .await?;
        debug!("Wrote {} monthly totals for {year}", totals.len() - 1);
        Ok(())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Logs a failed step and reports whether it succeeded.
fn finish(step: SyncStep, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!("The {step} step failed: {e:?}");
            false
        }
    }
}
