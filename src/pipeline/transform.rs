use chrono::DateTime;
use tracing::error;

use crate::error::{EtlError, EtlResult};
use crate::model::issue::{COL_WORKLOG_CREATED, COL_WORKLOG_STARTED, NOT_AVAILABLE};
use crate::model::table::RecordTable;

/// Only the worklog timestamps are rewritten; issue `Created`/`Updated`
/// stay in the source format.
pub const DATE_COLUMNS: [&str; 2] = [COL_WORKLOG_CREATED, COL_WORKLOG_STARTED];

const SOURCE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";
const TARGET_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Reformat `2024-03-05T14:30:00.000000+0000` as `05/03/2024 14:30:00`,
/// keeping the timestamp's own offset. Empty cells and `N/A` pass through.
pub fn reformat_date(value: &str) -> EtlResult<String> {
    if value.is_empty() || value == NOT_AVAILABLE {
        return Ok(value.to_string());
    }
    if let Err(reason) = check_fraction(value) {
        return Err(EtlError::Parse {
            value: value.to_string(),
            reason: reason.to_string(),
        });
    }
    DateTime::parse_from_str(value, SOURCE_FORMAT)
        .map(|dt| dt.format(TARGET_FORMAT).to_string())
        .map_err(|e| EtlError::Parse {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// `%.f` takes a missing fraction and any number of digits; the source
/// format wants one to six.
fn check_fraction(value: &str) -> Result<(), &'static str> {
    let Some((_, rest)) = value.split_once('.') else {
        return Err("missing fractional seconds");
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if (1..=6).contains(&digits) {
        Ok(())
    } else {
        Err("fractional seconds must have 1 to 6 digits")
    }
}

pub fn transform(mut table: RecordTable) -> EtlResult<RecordTable> {
    let mut indexes = Vec::with_capacity(DATE_COLUMNS.len());
    for column in DATE_COLUMNS {
        match table.column_index(column) {
            Some(i) => indexes.push(i),
            None => {
                let err = EtlError::Schema(column.to_string());
                error!("Value error: {err}");
                return Err(err);
            }
        }
    }

    for row in &mut table.rows {
        for &i in &indexes {
            if let Some(cell) = row.get_mut(i) {
                *cell = reformat_date(cell).inspect_err(|err| {
                    error!("Failed to transform extracted data: {err}");
                })?;
            }
        }
    }

    Ok(table)
}
