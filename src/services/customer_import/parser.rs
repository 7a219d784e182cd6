//! Spreadsheet reading: workbook or CSV bytes into header-keyed rows

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::ImportError;

/// First worksheet of an upload, header row split off
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    /// Normalised header names in column order
    pub headers: Vec<String>,
    pub rows: Vec<ParsedRow>,
}

/// One data row, keyed by normalised header
#[derive(Debug, Clone)]
pub struct ParsedRow {
    /// 1-based sheet row; the header is row 1
    pub row_number: u32,
    pub cells: HashMap<String, String>,
}

impl ParsedRow {
    /// Cell text under `header`, empty when the column or cell is missing
    pub fn get(&self, header: &str) -> &str {
        self.cells.get(header).map(String::as_str).unwrap_or("")
    }
}

/// Trimmed, upper-cased header name
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Parse an uploaded file. A `.csv` filename selects the CSV reader,
/// everything else goes through calamine's format sniffing.
pub fn parse_upload(bytes: &[u8], filename: Option<&str>) -> Result<ParsedSheet, ImportError> {
    let is_csv = filename
        .map(|f| f.trim().to_lowercase().ends_with(".csv"))
        .unwrap_or(false);

    let (grid, first_row) = if is_csv {
        (read_csv(bytes)?, 0)
    } else {
        read_workbook(bytes)?
    };

    Ok(build_sheet(grid, first_row))
}

/// Cells of the first worksheet plus the 0-based sheet row the range starts at
fn read_workbook(bytes: &[u8]) -> Result<(Vec<Vec<String>>, u32), ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::MalformedFile(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::MalformedFile("Workbook contains no worksheets".to_string()))?
        .map_err(|e| ImportError::MalformedFile(e.to_string()))?;

    let first_row = range.start().map(|(row, _)| row).unwrap_or(0);
    let grid = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    Ok((grid, first_row))
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::MalformedFile(e.to_string()))?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

fn build_sheet(grid: Vec<Vec<String>>, first_row: u32) -> ParsedSheet {
    let mut rows_iter = grid.into_iter();

    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(|h| normalize_header(h)).collect(),
        None => return ParsedSheet::default(),
    };

    let rows = rows_iter
        .enumerate()
        .map(|(idx, values)| {
            let mut cells = HashMap::with_capacity(headers.len());
            for (col, header) in headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let value = values.get(col).cloned().unwrap_or_default();
                // first column wins when a header repeats
                cells.entry(header.clone()).or_insert(value);
            }
            ParsedRow {
                row_number: first_row + idx as u32 + 2,
                cells,
            }
        })
        .collect();

    ParsedSheet { headers, rows }
}

/// Text of a cell. Integral floats lose their `.0`, error cells read as empty.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
