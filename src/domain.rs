use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;

use crate::column::ColumnLayout;

#[derive(Debug)]
pub enum UTError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    EmptyTable,
}

impl fmt::Display for UTError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UTError::IoError(e) => write!(f, "io error: {e}"),
            UTError::PolarsError(e) => write!(f, "could not read table: {e}"),
            UTError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            UTError::FileNotFound => write!(f, "file not found"),
            UTError::PermissionDenied => write!(f, "permission denied"),
            UTError::UnknownFileType => write!(f, "unknown file type"),
            UTError::EmptyTable => write!(f, "table has no columns"),
        }
    }
}

impl std::error::Error for UTError {}

impl From<Error> for UTError {
    fn from(err: Error) -> Self {
        UTError::IoError(err)
    }
}

impl From<PolarsError> for UTError {
    fn from(err: PolarsError) -> Self {
        UTError::PolarsError(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    /// Activate the header of the selected column.
    Sort,
    SortColumn(usize),
    FocusFilters,
    ClearFilters,
    CopyRow,
    Help,
    Enter,
    Exit,
    Resize(usize, usize),
}

#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct UTConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub layout: ColumnLayout,
}

impl Default for UTConfig {
    fn default() -> Self {
        UTConfig {
            event_poll_time: 100,
            max_column_width: 24,
            layout: ColumnLayout::default(),
        }
    }
}

pub const HELP_TEXT: &str = "\
Table
  ↑/↓ j/k        move row
  ←/→ h/l        move column
  PgUp/PgDn      move page
  g/G            first/last row
  s, Enter       sort by selected column (again to reverse)
  1-9            sort by column number
  / or Tab       focus filters
  x              clear filters
  c              copy row
  ?              help
  q              quit

Filters
  ←/→            switch filter
  ↑/↓            change selection
  Enter          keep selection
  Esc            revert selection
";
