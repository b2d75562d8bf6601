use std::collections::HashMap;
use std::path::Path;

use crate::error::BotError;

/// Read access to a spreadsheet grid. Coordinates are 1-based `(column, row)`.
pub trait SheetGrid {
    fn name(&self) -> &str;
    fn cell(&self, column: u32, row: u32) -> String;
}

impl SheetGrid for umya_spreadsheet::Worksheet {
    fn name(&self) -> &str {
        self.get_name()
    }

    fn cell(&self, column: u32, row: u32) -> String {
        self.get_value((column, row))
    }
}

/// Loads an `.xlsx` file with all of its worksheets.
pub fn read_workbook(path: &Path) -> Result<umya_spreadsheet::Spreadsheet, BotError> {
    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| BotError::Workbook {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// In-memory grid, handy for building timetables by hand.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    name: String,
    cells: HashMap<(u32, u32), String>,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: HashMap::new(),
        }
    }

    pub fn set(&mut self, column: u32, row: u32, text: impl Into<String>) -> &mut Self {
        self.cells.insert((column, row), text.into());
        self
    }
}

impl SheetGrid for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell(&self, column: u32, row: u32) -> String {
        self.cells.get(&(column, row)).cloned().unwrap_or_default()
    }
}
