use super::columns::{self, CountColumn, DATE_COLUMN, DISTRICT_COLUMN, STATE_COLUMN};
use super::domain::{ActivityRecord, DatasetKind, NormalizedTable, UNKNOWN_LABEL};
use chrono::{Datelike, NaiveDate};
use std::io::Read;
use tracing::debug;

/// Day-first layouts seen in the extracts, with ISO dates as a fallback.
const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// `%Y` accepts short years; anything before this is a two-digit year misread.
const MIN_DATE_YEAR: i32 = 1000;

/// Parses one CSV batch into a normalized table.
///
/// Malformed dates become `None` and malformed counts become zero; the row is
/// kept either way. Only structural CSV failures are returned as errors.
pub fn normalize_batch<R: Read>(
    batch_id: &str,
    reader: R,
    kind: DatasetKind,
) -> Result<NormalizedTable, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let header: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    let date_at = columns::position_of(&header, DATE_COLUMN);
    let state_at = columns::position_of(&header, STATE_COLUMN);
    let district_at = columns::position_of(&header, DISTRICT_COLUMN);
    let count_columns = columns::infer_columns(&header, kind);

    let mut table = NormalizedTable::new(
        kind,
        count_columns.iter().map(|column| column.name.clone()).collect(),
    );
    let mut malformed_dates = 0usize;
    let mut malformed_counts = 0usize;

    for row in csv_reader.records() {
        let row = row?;
        let cell = |at: Option<usize>| at.and_then(|index| row.get(index));

        let date = match cell(date_at) {
            Some(raw) if !raw.is_empty() => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    malformed_dates += 1;
                }
                parsed
            }
            _ => None,
        };

        let counts = read_counts(&count_columns, |at| cell(at), &mut malformed_counts);
        table.push(ActivityRecord::new(
            date,
            normalize_label(cell(state_at)),
            normalize_label(cell(district_at)),
            counts,
        ));
    }

    debug!(
        batch = batch_id,
        kind = %kind,
        rows = table.len(),
        columns = ?table.columns(),
        malformed_dates,
        malformed_counts,
        "normalized batch"
    );

    Ok(table)
}

fn read_counts<'a>(
    columns: &[CountColumn],
    cell: impl Fn(Option<usize>) -> Option<&'a str>,
    malformed: &mut usize,
) -> Vec<u64> {
    columns
        .iter()
        .map(|column| match cell(column.position) {
            Some(raw) => parse_count(raw).unwrap_or_else(|| {
                *malformed += 1;
                0
            }),
            None => 0,
        })
        .collect()
}

/// Parses a day-first date, tolerating `-`, `/` and `.` separators and a
/// trailing time component. Years must have four digits.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.split_whitespace().next()?;

    DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .find(|date| date.year() >= MIN_DATE_YEAR)
}

/// Reads a count cell. Empty cells are zero; `None` means the cell held
/// something that is not a finite non-negative number.
pub fn parse_count(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(0);
    }

    if let Ok(count) = trimmed.parse::<u64>() {
        return Some(count);
    }

    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() && number >= 0.0 => Some(number.trunc() as u64),
        _ => None,
    }
}

/// Coerces a state or district cell, mapping blanks and textual null
/// spellings to [`UNKNOWN_LABEL`].
pub fn normalize_label(value: Option<&str>) -> String {
    let cleaned = value
        .map(|raw| raw.replace(['\u{feff}', '\u{200b}'], ""))
        .unwrap_or_default();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let is_null = collapsed.is_empty()
        || ["nan", "none", "null", "n/a"]
            .iter()
            .any(|marker| collapsed.eq_ignore_ascii_case(marker));
    if is_null {
        UNKNOWN_LABEL.to_string()
    } else {
        collapsed
    }
}
