// Review table export (xlsx)

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use dyetrack_recon::model::{MatchResult, Resolution};

const HEADERS: [&str; 11] = [
    "Row",
    "Dispatch",
    "Date sent",
    "Client",
    "Fabric",
    "Color",
    "Kg sent",
    "Kg received",
    "Machine",
    "Status",
    "Order",
];

/// Write the reconciliation review as a single-sheet workbook.
pub fn export_review(path: &Path, results: &[MatchResult]) -> Result<(), crate::IoError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Review")?;

    let bold = Format::new().set_bold();
    let kg = Format::new().set_num_format("0.00");

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, result) in results.iter().enumerate() {
        let row = (i + 1) as u32;
        let record = &result.record;
        // Spreadsheet row numbers are 1-based
        sheet.write_number(row, 0, (record.id.0 + 1) as f64)?;
        sheet.write_string(row, 1, &record.dispatch_number)?;
        sheet.write_string(row, 2, &record.date_sent)?;
        sheet.write_string(row, 3, &record.client)?;
        sheet.write_string(row, 4, &record.fabric)?;
        sheet.write_string(row, 5, &record.color)?;
        sheet.write_number_with_format(row, 6, record.quantity_sent, &kg)?;
        sheet.write_number_with_format(row, 7, record.quantity_received, &kg)?;
        sheet.write_string(row, 8, record.machine.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 9, result.resolution.status_name())?;
        if let Resolution::Matched { label, .. } = &result.resolution {
            sheet.write_string(row, 10, label)?;
        }
    }

    sheet.autofit();
    workbook.save(path)?;
    tracing::info!(path = %path.display(), rows = results.len(), "review exported");
    Ok(())
}
