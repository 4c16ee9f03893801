//! CSV export for meter readings and generated bills.

use std::io::{self, Write};

use crate::domain::{UtilityBill, UtilityReading};

const READINGS_HEADER: [&str; 10] = [
    "id",
    "contract_id",
    "type",
    "reading_date",
    "previous_index",
    "current_index",
    "consumption",
    "price",
    "total",
    "note",
];

const BILLS_HEADER: [&str; 8] = [
    "id",
    "contract_id",
    "period",
    "type",
    "consumption",
    "pricing",
    "amount",
    "bill_total",
];

/// Writes readings as CSV, one row per reading in the given order.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_readings_csv<'a>(
    readings: impl IntoIterator<Item = &'a UtilityReading>,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(READINGS_HEADER)?;

    for r in readings {
        wtr.write_record([
            r.id.to_string(),
            r.contract_id.to_string(),
            r.utility_type.to_string(),
            r.reading_date.to_string(),
            r.previous_index.to_string(),
            r.current_index.to_string(),
            r.consumption.to_string(),
            r.price.to_string(),
            r.total.to_string(),
            r.note.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()
}

/// Writes bills as CSV with one row per bill line.
///
/// `bill_total` repeats the bill's total on each of its lines.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_bills_csv<'a>(
    bills: impl IntoIterator<Item = &'a UtilityBill>,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(BILLS_HEADER)?;

    for bill in bills {
        for line in &bill.lines {
            wtr.write_record([
                bill.id.to_string(),
                bill.contract_id.to_string(),
                bill.period.to_string(),
                line.utility_type.to_string(),
                line.consumption.to_string(),
                line.pricing.as_str().to_string(),
                line.amount.to_string(),
                bill.total.to_string(),
            ])?;
        }
    }

    wtr.flush()
}
