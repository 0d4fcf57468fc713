use chrono::NaiveDate;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;

use crate::domain::inventory::InventoryItem;
use crate::domain::worker::Worker;
use crate::errors::MillError;
use crate::services::inventory::InventoryService;
use crate::services::loans::{LoanService, LoanView};
use crate::services::workers::WorkerService;
use crate::store::TreeStore;

/// Rows written per sheet.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReportCounts {
    pub inventory: usize,
    pub loans: usize,
    pub workers: usize,
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), MillError> {
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *header)
            .map_err(|e| MillError::XlsxError(format!("Failed to write header '{}': {}", header, e)))?;
    }
    Ok(())
}

fn text(sheet: &mut Worksheet, row: u32, col: u16, value: &str) -> Result<(), MillError> {
    sheet
        .write_string(row, col, value)
        .map_err(|e| MillError::XlsxError(format!("Failed to write cell ({row}, {col}): {e}")))?;
    Ok(())
}

fn number(sheet: &mut Worksheet, row: u32, col: u16, value: f64) -> Result<(), MillError> {
    sheet
        .write_number(row, col, value)
        .map_err(|e| MillError::XlsxError(format!("Failed to write cell ({row}, {col}): {e}")))?;
    Ok(())
}

pub fn write_inventory_sheet(sheet: &mut Worksheet, items: &[InventoryItem]) -> Result<(), MillError> {
    sheet
        .set_name("Inventory")
        .map_err(|e| MillError::XlsxError(format!("Failed to name sheet: {}", e)))?;
    write_headers(
        sheet,
        &[
            "ID", "Name", "Rice Type", "Grade", "Bags", "Kg/Bag", "Current Stock (kg)",
            "Min Level (kg)", "Warehouse", "Price/kg", "Stock Value", "Status",
        ],
    )?;

    for (i, item) in items.iter().enumerate() {
        let r = (i + 1) as u32;
        text(sheet, r, 0, &item.id)?;
        text(sheet, r, 1, &item.name)?;
        text(sheet, r, 2, &item.rice_type)?;
        text(sheet, r, 3, item.grade.as_deref().unwrap_or(""))?;
        number(sheet, r, 4, item.bags)?;
        number(sheet, r, 5, item.kg_per_bag)?;
        number(sheet, r, 6, item.current_stock)?;
        number(sheet, r, 7, item.min_stock_level)?;
        text(sheet, r, 8, &item.warehouse)?;
        number(sheet, r, 9, item.price_per_kg)?;
        number(sheet, r, 10, item.stock_value())?;
        text(sheet, r, 11, item.status.as_str())?;
    }
    Ok(())
}

pub fn write_loans_sheet(sheet: &mut Worksheet, loans: &[LoanView]) -> Result<(), MillError> {
    sheet
        .set_name("Loans")
        .map_err(|e| MillError::XlsxError(format!("Failed to name sheet: {}", e)))?;
    write_headers(
        sheet,
        &[
            "Loan ID", "Customer", "Rice Type", "Quantity (kg)", "Amount", "Paid",
            "Outstanding", "Issue Date", "Due Date", "Status",
        ],
    )?;

    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    for (i, view) in loans.iter().enumerate() {
        let r = (i + 1) as u32;
        let loan = &view.loan;
        text(sheet, r, 0, &loan.id)?;
        text(sheet, r, 1, &loan.customer)?;
        text(sheet, r, 2, loan.rice_type.as_deref().unwrap_or(""))?;
        number(sheet, r, 3, loan.quantity.unwrap_or(0.0))?;
        number(sheet, r, 4, loan.amount)?;
        number(sheet, r, 5, loan.paid_amount)?;
        number(sheet, r, 6, view.outstanding)?;
        text(sheet, r, 7, &date(loan.issue_date))?;
        text(sheet, r, 8, &date(loan.due_date))?;
        text(sheet, r, 9, view.display_status.as_str())?;
    }
    Ok(())
}

pub fn write_workers_sheet(sheet: &mut Worksheet, workers: &[Worker]) -> Result<(), MillError> {
    sheet
        .set_name("Workers")
        .map_err(|e| MillError::XlsxError(format!("Failed to name sheet: {}", e)))?;
    write_headers(
        sheet,
        &["Worker ID", "Name", "Role", "Status", "Daily Wage", "Salary", "Present Days", "Absent Days"],
    )?;

    for (i, worker) in workers.iter().enumerate() {
        let r = (i + 1) as u32;
        text(sheet, r, 0, &worker.id)?;
        text(sheet, r, 1, worker.display_name())?;
        text(sheet, r, 2, worker.role.as_deref().unwrap_or(""))?;
        text(sheet, r, 3, worker.status.map(|s| s.as_str()).unwrap_or(""))?;
        number(sheet, r, 4, worker.daily_wage.unwrap_or(0.0))?;
        number(sheet, r, 5, worker.salary.amount().unwrap_or(0.0))?;
        number(sheet, r, 6, f64::from(worker.present_days))?;
        number(sheet, r, 7, f64::from(worker.absent_days))?;
    }
    Ok(())
}

/// Build the workbook in memory.
pub fn build_report(
    items: &[InventoryItem],
    loans: &[LoanView],
    workers: &[Worker],
) -> Result<Vec<u8>, MillError> {
    let mut workbook = Workbook::new();
    write_inventory_sheet(workbook.add_worksheet(), items)?;
    write_loans_sheet(workbook.add_worksheet(), loans)?;
    write_workers_sheet(workbook.add_worksheet(), workers)?;

    workbook
        .save_to_buffer()
        .map_err(|e| MillError::XlsxError(format!("Failed to save workbook: {}", e)))
}

/// Read inventory, loans and workers from the store and write the workbook
/// to `path`.
pub fn export_report(
    store: &dyn TreeStore,
    path: &Path,
    today: NaiveDate,
) -> Result<ReportCounts, MillError> {
    let items = InventoryService::new(store).list_all()?;
    let loans = LoanService::new(store).list(today)?;
    let workers = WorkerService::new(store).list()?;

    let buffer = build_report(&items, &loans, &workers)?;
    std::fs::write(path, buffer)?;
    log::info!("report written to {}", path.display());

    Ok(ReportCounts {
        inventory: items.len(),
        loans: loans.len(),
        workers: workers.len(),
    })
}
