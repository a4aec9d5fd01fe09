use chrono::{Duration, NaiveDate};

use crate::config::ImportConfig;
use crate::model::{format_number, Cell, DispatchRecord, RecordId};

static EMPTY: Cell = Cell::Empty;

/// Parse a dispatch sheet into records.
///
/// Rows before `layout.data_start_row` are header/metadata. A row whose
/// dispatch-number cell is blank is skipped. Quantity cells that do not
/// parse coerce to 0; nothing here fails.
pub fn parse_rows(rows: &[Vec<Cell>], config: &ImportConfig) -> Vec<DispatchRecord> {
    let layout = &config.layout;
    if rows.len() <= layout.data_start_row {
        return Vec::new();
    }

    let header = rows.get(layout.header_row).map(Vec::as_slice).unwrap_or(&[]);
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row_idx, row) in rows.iter().enumerate().skip(layout.data_start_row) {
        let cell = |col: usize| row.get(col).unwrap_or(&EMPTY);

        let dispatch = cell(layout.dispatch_number);
        if dispatch.is_blank() {
            skipped += 1;
            continue;
        }

        records.push(DispatchRecord {
            id: RecordId(row_idx),
            dispatch_number: dispatch.as_text().trim().to_string(),
            date_sent: date_text(cell(layout.date_sent)),
            formation_date: date_text(cell(layout.formation_date)),
            fabric: cell(layout.fabric).as_text(),
            color: cell(layout.color).as_text(),
            client: cell(layout.client).as_text(),
            quantity_sent: quantity(cell(layout.quantity_sent)),
            quantity_received: quantity(cell(layout.quantity_received)),
            remaining: quantity(cell(layout.remaining)),
            scrap_percentage: cell(layout.scrap_percentage).as_text(),
            machine: scan_machine(row, header, config),
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, "dropped rows with blank dispatch number");
    }

    records
}

/// Excel serial day → calendar date (1900 date system).
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = serial.floor() as i64;
    epoch.checked_add_signed(Duration::try_days(days)?)
}

/// Date cell as free text. Serial numbers become `YYYY-MM-DD`; text passes through.
fn date_text(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => serial_to_date(*n)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| format_number(*n)),
        other => other.as_text(),
    }
}

fn quantity(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Text(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// First marked capacity column wins; its header label is the machine.
fn scan_machine(row: &[Cell], header: &[Cell], config: &ImportConfig) -> Option<String> {
    let start = config.machines.scan_start;
    let hit = row
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, cell)| config.machines.is_marker(&cell.as_text()))
        .map(|(col, _)| col)?;

    let label = header.get(hit).map(Cell::as_text).unwrap_or_default();
    let label = label.trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn header_rows() -> Vec<Vec<Cell>> {
        let mut labels = vec![Cell::Empty; 12];
        labels.extend([t("M1"), t("M2"), t("M3")]);
        vec![vec![t("Dyehouse dispatch log")], labels]
    }

    fn data_row(dispatch: Cell, fabric: &str, color: &str) -> Vec<Cell> {
        vec![
            dispatch,
            Cell::Number(45658.0),
            t("2025-01-03"),
            t("Acme Textiles"),
            t(fabric),
            t(color),
            Cell::Number(120.5),
            t("100"),
            Cell::Number(20.5),
            t("3%"),
        ]
    }

    #[test]
    fn fewer_than_three_rows_is_empty() {
        let config = ImportConfig::default();
        assert!(parse_rows(&[], &config).is_empty());
        assert!(parse_rows(&header_rows(), &config).is_empty());
    }

    #[test]
    fn blank_dispatch_rows_are_dropped() {
        let mut rows = header_rows();
        rows.push(data_row(t("D-1"), "Jersey", "Red"));
        rows.push(data_row(Cell::Empty, "Jersey", "Blue"));
        rows.push(data_row(t("   "), "Jersey", "Green"));
        rows.push(data_row(Cell::Number(1002.0), "Rib", "Navy"));

        let records = parse_rows(&rows, &ImportConfig::default());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.dispatch_number.is_empty()));
        assert_eq!(records[0].dispatch_number, "D-1");
        assert_eq!(records[0].id, RecordId(2));
        assert_eq!(records[1].dispatch_number, "1002");
        assert_eq!(records[1].id, RecordId(5));
    }

    #[test]
    fn fields_follow_layout() {
        let mut rows = header_rows();
        rows.push(data_row(t("D-1"), "Cotton Jersey", "Red"));
        let r = &parse_rows(&rows, &ImportConfig::default())[0];
        assert_eq!(r.date_sent, "2025-01-01");
        assert_eq!(r.formation_date, "2025-01-03");
        assert_eq!(r.client, "Acme Textiles");
        assert_eq!(r.fabric, "Cotton Jersey");
        assert_eq!(r.color, "Red");
        assert_eq!(r.quantity_sent, 120.5);
        assert_eq!(r.quantity_received, 100.0);
        assert_eq!(r.remaining, 20.5);
        assert_eq!(r.scrap_percentage, "3%");
        assert_eq!(r.machine, None);
    }

    #[test]
    fn serial_date_conversion() {
        assert_eq!(serial_to_date(45658.0), NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(serial_to_date(45658.75), NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(serial_to_date(f64::NAN), None);
        assert_eq!(date_text(&t("2025-01-01")), "2025-01-01");
        assert_eq!(date_text(&t("01/02/2025")), "01/02/2025");
        assert_eq!(date_text(&Cell::Empty), "");
    }

    #[test]
    fn bad_quantities_coerce_to_zero() {
        assert_eq!(quantity(&t("abc")), 0.0);
        assert_eq!(quantity(&t("")), 0.0);
        assert_eq!(quantity(&Cell::Empty), 0.0);
        assert_eq!(quantity(&Cell::Bool(true)), 0.0);
        assert_eq!(quantity(&Cell::Number(f64::INFINITY)), 0.0);
        assert_eq!(quantity(&t(" 12,5 ")), 12.5);
    }

    #[test]
    fn machine_scan_first_match_wins() {
        let mut rows = header_rows();
        let mut row = data_row(t("D-1"), "Jersey", "Red");
        row.extend([Cell::Empty, Cell::Empty, t("1"), t("1")]);
        rows.push(row);

        let r = &parse_rows(&rows, &ImportConfig::default())[0];
        assert_eq!(r.machine.as_deref(), Some("M1"));
    }

    #[test]
    fn machine_scan_accepts_numeric_and_x() {
        let mut rows = header_rows();
        let mut row = data_row(t("D-1"), "Jersey", "Red");
        row.extend([Cell::Empty, Cell::Empty, Cell::Empty, Cell::Number(1.0)]);
        rows.push(row);
        let mut row = data_row(t("D-2"), "Jersey", "Red");
        row.extend([Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, t("X")]);
        rows.push(row);

        let records = parse_rows(&rows, &ImportConfig::default());
        assert_eq!(records[0].machine.as_deref(), Some("M2"));
        assert_eq!(records[1].machine.as_deref(), Some("M3"));
    }

    #[test]
    fn markers_before_window_are_ignored() {
        let mut rows = header_rows();
        let mut row = data_row(t("D-1"), "Jersey", "Red");
        // column 10 holds "x" but the window starts at 12
        row.extend([t("x"), Cell::Empty, Cell::Empty, t("2")]);
        rows.push(row);

        let r = &parse_rows(&rows, &ImportConfig::default())[0];
        assert_eq!(r.machine, None);
    }

    #[test]
    fn blank_header_label_yields_no_machine() {
        let mut rows = header_rows();
        let mut row = data_row(t("D-1"), "Jersey", "Red");
        row.extend([Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, t("1")]);
        rows.push(row);

        let r = &parse_rows(&rows, &ImportConfig::default())[0];
        assert_eq!(r.machine, None);
    }
}
