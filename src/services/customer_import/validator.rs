//! Column check and row validation for customer uploads

use super::parser::{ParsedRow, ParsedSheet};
use super::ImportError;

pub const FULL_NAME: &str = "FULL NAME";
pub const CONTACT_NUMBER: &str = "CONTACT NUMBER";
pub const ADDRESS: &str = "ADDRESS";
pub const EMAIL: &str = "EMAIL";

/// Required columns in canonical order
pub const REQUIRED_COLUMNS: [&str; 4] = [FULL_NAME, CONTACT_NUMBER, ADDRESS, EMAIL];

/// Spreadsheet exports of empty numeric cells; treated as a missing value
pub const MISSING_VALUE_SENTINEL: &str = "nan";

/// A row that passed validation, values normalised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub row_number: u32,
    pub full_name: String,
    pub contact_number: String,
    pub address: String,
    pub email: String,
}

/// Required columns absent from `headers`, in canonical order
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect()
}

/// Validate a parsed sheet into import rows.
///
/// Fails with `Schema` when required columns are missing and with
/// `NoValidData` when no row survives.
pub fn validate(sheet: &ParsedSheet) -> Result<Vec<ImportRow>, ImportError> {
    let missing = missing_columns(&sheet.headers);
    if !missing.is_empty() {
        return Err(ImportError::Schema { missing });
    }

    let rows: Vec<ImportRow> = sheet.rows.iter().filter_map(validate_row).collect();

    if rows.is_empty() {
        return Err(ImportError::NoValidData);
    }
    Ok(rows)
}

fn validate_row(row: &ParsedRow) -> Option<ImportRow> {
    let values: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .map(|col| collapse_whitespace(row.get(col)))
        .collect();

    if values.iter().any(|v| is_missing(v)) {
        return None;
    }

    let mut values = values.into_iter();
    Some(ImportRow {
        row_number: row.row_number,
        full_name: values.next()?,
        contact_number: values.next()?,
        address: values.next()?,
        email: values.next()?.to_lowercase(),
    })
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case(MISSING_VALUE_SENTINEL)
}

/// Trim and collapse internal whitespace runs to one space
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
