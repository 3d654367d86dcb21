use chrono::Datelike;

use crate::models::{CellValue, FieldValue, FinancialRecord, StatementTable};
use crate::normalize::normalize_label;

/// Turn a wide statement table (rows = line items, columns = reporting
/// periods) into one upsertable record per period, keyed by the owning
/// security and the period's fiscal year. Line-item labels become normalized
/// field names; `fiscal_quarter` is `None` for annual statements.
///
/// An empty table yields zero records. Output order follows the table's
/// period order but callers must not rely on it.
pub fn build_records(
    table: &StatementTable,
    security_id: &str,
    fiscal_quarter: Option<u8>,
) -> Vec<FinancialRecord> {
    let mut records = Vec::with_capacity(table.periods.len());

    for (idx, period) in table.periods.iter().enumerate() {
        let mut line_items = serde_json::Map::new();
        for item in &table.line_items {
            let cell = item.cells.get(idx).cloned().flatten();
            line_items.insert(normalize_label(&item.label), convert_cell(cell).into_json());
        }

        records.push(FinancialRecord {
            security_id: security_id.to_string(),
            report_date: *period,
            fiscal_year: period.year(),
            fiscal_quarter,
            line_items,
        });
    }

    records
}

/// Per-cell conversion: missing values become null, timestamps are reduced to
/// their date component, numbers and booleans pass through, anything else is
/// kept as text.
fn convert_cell(cell: Option<CellValue>) -> FieldValue {
    match cell {
        None => FieldValue::Null,
        Some(CellValue::Number(n)) => FieldValue::Number(n),
        Some(CellValue::Bool(b)) => FieldValue::Bool(b),
        Some(CellValue::Timestamp(ts)) => FieldValue::Date(ts.date()),
        Some(CellValue::Text(s)) => FieldValue::Text(s),
    }
}
