//! Handlers for recording expenses, listing categories and repairing the derived tables.

use crate::args::AddArgs;
use crate::commands::Out;
use crate::model::{Expense, DATE_FORMAT};
use crate::{Result, SyncReport, SyncStep, Synchronizer};
use anyhow::bail;
use chrono::Local;
use tracing::warn;

/// What the user sees when the expense could not be added.
pub const FAILURE_MESSAGE: &str = "Failed to add expense to Google Sheet. Check logs.";

/// Records an expense and reports back what was written.
///
/// The expense counts as added once its row has been appended. If sorting or recomputing the
/// totals fails afterwards, the command still succeeds; the failed steps are logged and listed in
/// the returned `SyncReport`, and `resync` can repair them later.
pub async fn add_expense(sync: &Synchronizer, args: &AddArgs) -> Result<Out<SyncReport>> {
    let date = args.date().unwrap_or_else(|| Local::now().date_naive());
    let expense = Expense::new(date, args.category(), args.amount(), args.description())?;

    let report = sync.record_expense(&expense).await;
    if !report.is_success() {
        bail!(FAILURE_MESSAGE);
    }
    let failed = report.failed_steps();
    if !failed.is_empty() {
        warn!("The expense was added but some steps failed: {failed:?}");
    }
    Ok(Out::new(confirmation(&expense), report))
}

/// Lists up to 25 known categories that contain `query`.
pub async fn categories(sync: &Synchronizer, query: &str) -> Result<Out<Vec<String>>> {
    let names = sync.suggest_categories(query).await;
    let message = if names.is_empty() {
        format!("No categories match '{query}'")
    } else {
        names.join("\n")
    };
    Ok(Out::new(message, names))
}

/// Re-sorts the rows and recomputes both totals tables.
pub async fn resync(sync: &Synchronizer) -> Result<Out<SyncReport>> {
    let report = sync.resync().await;
    if !report.is_recomputed() {
        let failed: Vec<String> = report
            .failed_steps()
            .into_iter()
            .filter(|step| !matches!(step, SyncStep::Append | SyncStep::Format))
            .map(|step| step.to_string())
            .collect();
        bail!(
            "Unable to bring the sheet up-to-date, these steps failed: {}. Check logs.",
            failed.join(", ")
        );
    }
    Ok(Out::new(
        "Sorted the expenses and recomputed the yearly and monthly totals",
        report,
    ))
}

fn confirmation(expense: &Expense) -> String {
    format!(
        "Expense added to Google Sheet!\nDate: {}\nCategory: {}\nAmount: {}\nDescription: {}",
        expense.date().format(DATE_FORMAT),
        expense.category(),
        expense.amount(),
        expense.description()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Operation, TestSheet, TestSheetState};
    use crate::model::Amount;
    use crate::Layout;
    use chrono::NaiveDate;
    use std::str::FromStr;

    async fn synchronizer(id: &str) -> Synchronizer {
        Synchronizer::start(Box::new(TestSheet::new(id)), Layout::default()).await
    }

    fn add_args(amount: &str) -> AddArgs {
        AddArgs::new(
            "Food & Dining",
            Amount::from_str(amount).unwrap(),
            "lunch",
            NaiveDate::from_ymd_opt(2024, 3, 1),
        )
    }

    #[tokio::test]
    async fn test_add_expense_message() {
        let id = uuid::Uuid::new_v4().to_string();
        let sync = synchronizer(&id).await;
        let out = add_expense(&sync, &add_args("12.50")).await.unwrap();
        assert_eq!(
            out.message(),
            "Expense added to Google Sheet!\nDate: 2024-03-01\nCategory: Food & Dining\n\
            Amount: 12.5\nDescription: lunch"
        );
        assert!(out.structure().unwrap().appended);
        assert_eq!(
            TestSheet::new(&id).get_state().values("Sheet1!A2:D"),
            vec![vec!["2024-03-01", "Food & Dining", "12.5", "lunch"]]
        );
    }

    #[tokio::test]
    async fn test_add_expense_rejects_zero() {
        let id = uuid::Uuid::new_v4().to_string();
        let sync = synchronizer(&id).await;
        assert!(add_expense(&sync, &add_args("0")).await.is_err());
        assert_eq!(TestSheet::new(&id).get_state().calls(Operation::Append), 0);
    }

    #[tokio::test]
    async fn test_add_expense_failure_message() {
        let id = uuid::Uuid::new_v4().to_string();
        let sync = synchronizer(&id).await;
        let mut state = TestSheet::new(&id).get_state();
        state.fail(Operation::Append);
        TestSheet::new(&id).set_state(state);

        let err = add_expense(&sync, &add_args("4")).await.unwrap_err();
        assert_eq!(err.to_string(), FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_categories_message() {
        let id = uuid::Uuid::new_v4().to_string();
        let sync = synchronizer(&id).await;
        let out = categories(&sync, "foo").await.unwrap();
        assert_eq!(out.message(), "Food & Dining");
        let out = categories(&sync, "xyz").await.unwrap();
        assert_eq!(out.message(), "No categories match 'xyz'");
        assert!(out.structure().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resync_reports_failed_steps() {
        let id = uuid::Uuid::new_v4().to_string();
        let mut state = TestSheetState::from_rows([vec!["Date", "Category", "Amount", "Description"]]);
        state.fail(Operation::Format);
        TestSheet::new(&id).set_state(state);
        let sync = synchronizer(&id).await;

        let err = resync(&sync).await.unwrap_err().to_string();
        assert!(err.contains("yearly, monthly"), "{err}");
        assert!(!err.contains("append") && !err.contains("format"));
    }
}
