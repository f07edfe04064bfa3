//! Spreadsheet-backed result store
//!
//! The store is a single `.xlsx` file whose first worksheet holds one turn
//! per row. Row 1 is the header; data starts at row 2.
//!
//! ```text
//! | A: question | B: expected answer | C: captured answer | D: verdict |
//! ```
//!
//! The whole workbook is loaded into memory, mutated, and written back to
//! the same path in one atomic replace at the end of a pass.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{Error, Result};
use crate::types::{CellValue, ChatTurn, Verdict};

/// Columns of the result sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Question = 1,
    Expected = 2,
    Captured = 3,
    Verdict = 4,
}

impl Column {
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Header written when a fresh workbook is created
    pub fn default_header(self) -> &'static str {
        match self {
            Column::Question => "Question",
            Column::Expected => "Expected",
            Column::Captured => "Response",
            Column::Verdict => "Validation",
        }
    }
}

/// First data row; row 1 is the header
pub const FIRST_DATA_ROW: u32 = 2;

/// One data row of the result sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    pub row: u32,
    pub question: CellValue,
    pub expected: CellValue,
    pub captured: CellValue,
}

impl SheetRow {
    /// Build the turn this row describes, or `None` for a row without question
    pub fn to_turn(&self) -> Option<ChatTurn> {
        let question = self.question.as_text()?;
        let mut turn = ChatTurn::new(self.row, question, self.expected.as_text());
        if let Some(answer) = self.captured.as_text() {
            turn.record_capture(answer);
        }
        Some(turn)
    }
}

/// In-memory handle on the result workbook
pub struct ResultWorkbook {
    path: PathBuf,
    book: Spreadsheet,
}

impl ResultWorkbook {
    /// Open an existing workbook
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::StoreNotFound { path });
        }

        let book = umya_spreadsheet::reader::xlsx::read(&path).map_err(|e| Error::Workbook {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if book.get_sheet(&0).is_none() {
            return Err(Error::NoWorksheet { path });
        }

        debug!("Loaded workbook {}", path.display());
        Ok(Self { path, book })
    }

    /// Create an empty workbook with the default header row. Nothing is
    /// written to disk until [`ResultWorkbook::save`].
    pub fn create(path: impl AsRef<Path>) -> Self {
        let mut workbook = Self {
            path: path.as_ref().to_path_buf(),
            book: umya_spreadsheet::new_file(),
        };
        for column in [Column::Question, Column::Expected] {
            workbook.ensure_header(column, column.default_header());
        }
        workbook
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sheet(&self) -> Result<&Worksheet> {
        self.book.get_sheet(&0).ok_or_else(|| Error::NoWorksheet {
            path: self.path.clone(),
        })
    }

    fn sheet_mut(&mut self) -> Result<&mut Worksheet> {
        let path = self.path.clone();
        self.book
            .get_sheet_mut(&0)
            .ok_or(Error::NoWorksheet { path })
    }

    /// Read one cell
    pub fn cell(&self, row: u32, column: Column) -> Result<CellValue> {
        let sheet = self.sheet()?;
        Ok(read_cell(sheet, row, column.index()))
    }

    /// All data rows, from row 2 to the highest used row
    pub fn rows(&self) -> Result<Vec<SheetRow>> {
        let sheet = self.sheet()?;
        let highest = sheet.get_highest_row();

        Ok((FIRST_DATA_ROW..=highest)
            .map(|row| SheetRow {
                row,
                question: read_cell(sheet, row, Column::Question.index()),
                expected: read_cell(sheet, row, Column::Expected.index()),
                captured: read_cell(sheet, row, Column::Captured.index()),
            })
            .collect())
    }

    /// Write a header cell unless one is already present
    pub fn ensure_header(&mut self, column: Column, title: &str) {
        if let Ok(sheet) = self.sheet_mut() {
            if read_cell(sheet, 1, column.index()).is_empty() {
                sheet
                    .get_cell_mut((column.index(), 1))
                    .set_value_string(title);
            }
        }
    }

    /// Write any value into a cell
    pub fn set_cell(&mut self, row: u32, column: Column, value: CellValue) -> Result<()> {
        let sheet = self.sheet_mut()?;
        let cell = sheet.get_cell_mut((column.index(), row));
        match value {
            CellValue::Empty => {
                cell.set_value_string("");
            }
            CellValue::Text(text) => {
                cell.set_value_string(text);
            }
            CellValue::Number(n) => {
                cell.set_value_number(n);
            }
        }
        Ok(())
    }

    pub fn write_captured(&mut self, row: u32, answer: &str) -> Result<()> {
        self.set_cell(row, Column::Captured, CellValue::Text(answer.to_string()))
    }

    pub fn write_verdict(&mut self, row: u32, verdict: Verdict) -> Result<()> {
        self.set_cell(row, Column::Verdict, CellValue::Text(verdict.to_string()))
    }

    /// Write the workbook back to its path via a temp file and rename, so a
    /// crash mid-write never leaves a truncated store behind.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let tmp = tempfile::Builder::new()
            .prefix(".chatprobe-")
            .suffix(".xlsx")
            .tempfile_in(&dir)?;

        umya_spreadsheet::writer::xlsx::write(&self.book, tmp.path()).map_err(|e| {
            Error::Workbook {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;

        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        info!("Results saved to {}", self.path.display());
        Ok(())
    }
}

fn read_cell(sheet: &Worksheet, row: u32, column: u32) -> CellValue {
    let Some(cell) = sheet.get_cell((column, row)) else {
        return CellValue::Empty;
    };

    if let Some(n) = cell.get_value_number() {
        return CellValue::Number(n);
    }

    let value = cell.get_value();
    if value.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(value.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dir: &Path) -> ResultWorkbook {
        let mut workbook = ResultWorkbook::create(dir.join("results.xlsx"));
        workbook.set_cell(2, Column::Question, "Capital of France?".into()).unwrap();
        workbook.set_cell(2, Column::Expected, "Paris".into()).unwrap();
        workbook.set_cell(3, Column::Question, "Six times seven?".into()).unwrap();
        workbook.set_cell(3, Column::Expected, CellValue::Number(42.0)).unwrap();
        workbook
    }

    #[test]
    fn test_open_missing_file_is_store_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        let err = ResultWorkbook::open(&path).err().unwrap();
        assert!(matches!(err, Error::StoreNotFound { .. }));
        assert!(err.is_store_error());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_and_reload_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = sample(dir.path());
        workbook.write_captured(2, "The capital of France is Paris.").unwrap();
        workbook.save().unwrap();

        let reloaded = ResultWorkbook::open(dir.path().join("results.xlsx")).unwrap();
        let rows = reloaded.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].expected.as_text().as_deref(), Some("Paris"));
        assert_eq!(
            rows[0].captured.as_text().as_deref(),
            Some("The capital of France is Paris.")
        );
        assert_eq!(rows[1].expected.as_text().as_deref(), Some("42"));
        assert!(rows[1].captured.is_empty());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path()).save().unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["results.xlsx".to_string()]);
    }

    #[test]
    fn test_ensure_header_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = sample(dir.path());

        workbook.ensure_header(Column::Captured, "Hugging Chat Responses");
        workbook.ensure_header(Column::Captured, "Something else");
        workbook.ensure_header(Column::Question, "Prompt");

        assert_eq!(
            workbook.cell(1, Column::Captured).unwrap(),
            CellValue::Text("Hugging Chat Responses".into())
        );
        assert_eq!(
            workbook.cell(1, Column::Question).unwrap(),
            CellValue::Text("Question".into())
        );
    }

    #[test]
    fn test_row_to_turn() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = sample(dir.path());
        workbook.set_cell(4, Column::Expected, "orphan".into()).unwrap();

        let turns: Vec<_> = workbook
            .rows()
            .unwrap()
            .iter()
            .filter_map(SheetRow::to_turn)
            .collect();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].expected_answer.as_deref(), Some("42"));
        assert_eq!(turns[1].captured_answer(), None);
    }
}
