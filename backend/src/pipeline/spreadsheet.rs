//! Reads an uploaded workbook into ordered rows.
//!
//! The first row of the first worksheet holds the column titles. Columns are
//! positional: `0` is the student name, `1` the roll number, `2` the class,
//! and every column from `subject_column_start` onward is a subject whose
//! cells must be numeric marks.

use crate::error::{PipelineError, Result};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, XlsError, Xlsx, XlsxError};
use std::fmt;
use std::io::Cursor;

/// Extensions accepted by [`SpreadsheetReader::parse`].
pub const SUPPORTED_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

/// A single cell value, reduced to what the pipeline distinguishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => f.write_str(&format_number(*n)),
            Cell::Text(s) => f.write_str(s),
            Cell::Empty => Ok(()),
        }
    }
}

/// Renders integral values without a fractional part (`90`, not `90.0`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One data row: column title to cell, in sheet column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub cells: Vec<(String, Cell)>,
}

impl RawRow {
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index).map(|(_, cell)| cell)
    }
}

/// Parses workbooks with a fixed subject column start.
#[derive(Debug, Clone)]
pub struct SpreadsheetReader {
    subject_column_start: usize,
}

impl Default for SpreadsheetReader {
    fn default() -> Self {
        Self::new(3)
    }
}

impl SpreadsheetReader {
    pub fn new(subject_column_start: usize) -> Self {
        Self {
            subject_column_start,
        }
    }

    pub fn subject_column_start(&self) -> usize {
        self.subject_column_start
    }

    /// Parses `bytes` as the workbook format implied by `filename`.
    ///
    /// # Errors
    /// - `UnsupportedFormat` for any extension other than `.xlsx`/`.xls`.
    /// - `Parse` when the bytes are not a readable workbook, the sheet is
    ///   empty, or a subject cell is not numeric.
    /// - `InputValidation` when the sheet has no subject columns.
    pub fn parse(&self, bytes: &[u8], filename: &str) -> Result<Vec<RawRow>> {
        let range = match extension_of(filename) {
            Some(".xlsx") => {
                let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
                    .map_err(|e: XlsxError| PipelineError::Parse(e.to_string()))?;
                first_sheet(&mut workbook)?
            }
            Some(".xls") => {
                let mut workbook: Xls<_> = open_workbook_from_rs(Cursor::new(bytes))
                    .map_err(|e: XlsError| PipelineError::Parse(e.to_string()))?;
                first_sheet(&mut workbook)?
            }
            _ => return Err(PipelineError::UnsupportedFormat(filename.to_string())),
        };
        self.rows_from_range(&range)
    }

    fn rows_from_range(&self, range: &Range<Data>) -> Result<Vec<RawRow>> {
        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .ok_or_else(|| PipelineError::Parse("the worksheet is empty".to_string()))?
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        if header.len() <= self.subject_column_start {
            return Err(PipelineError::InputValidation(format!(
                "The sheet has {} columns; expected Student Name, Roll Number, Class and at least one subject column from column {} onward",
                header.len(),
                self.subject_column_start + 1
            )));
        }

        let mut out = Vec::new();
        for (row_index, row) in rows.enumerate() {
            let cells: Vec<Cell> = row.iter().map(to_cell).collect();
            if cells.iter().all(|c| *c == Cell::Empty) {
                continue;
            }
            // +2: one for the header, one for 1-based numbering.
            let sheet_row = row_index + 2;
            let mut ordered = Vec::with_capacity(header.len());
            for (col, title) in header.iter().enumerate() {
                let cell = cells.get(col).cloned().unwrap_or(Cell::Empty);
                if col >= self.subject_column_start && cell.as_number().is_none() {
                    return Err(PipelineError::Parse(format!(
                        "row {}, column '{}': mark must be a number, found '{}'",
                        sheet_row, title, cell
                    )));
                }
                ordered.push((title.clone(), cell));
            }
            out.push(RawRow { cells: ordered });
        }
        Ok(out)
    }
}

fn first_sheet<'a, R>(workbook: &mut R) -> Result<Range<Data>>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: fmt::Display,
{
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::Parse("the workbook has no worksheets".to_string()))?
        .map_err(|e| PipelineError::Parse(e.to_string()))
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.trim().to_string()),
        other => Cell::Text(other.to_string()),
    }
}

fn extension_of(filename: &str) -> Option<&'static str> {
    let lower = filename.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .into_iter()
        .find(|ext| lower.ends_with(ext))
}
