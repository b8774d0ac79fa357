use arboard::Clipboard;
use polars::prelude::*;
use ratatui::text::Span;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::{HELP_TEXT, Message, UTConfig, UTError};
use crate::selector::Selector;
use crate::table::{TableController, TableSource};
use crate::ui::{COLUMN_WIDTH_MARGIN, FILTERBAR_HEIGHT, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT};

const MISSING_CELL: &str = "∅";

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    QUITTING,
}

#[derive(Debug)]
pub struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

struct LoadedColumn {
    name: String,
    data: Vec<Option<String>>,
    numeric: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FILTER,
    POPUP,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterView {
    pub label: String,
    pub text: String,
    pub focused: bool,
    pub active: bool,
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub filters: Vec<FilterView>,
    pub filter_mode: bool,
    pub nrows: usize, // Rows currently shown after filtering
    pub total_rows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub sort_description: String,
    pub selected_label: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            filters: Vec::new(),
            filter_mode: false,
            nrows: 0,
            total_rows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            sort_description: String::new(),
            selected_label: String::new(),
            show_popup: false,
            popup_message: String::new(),
            status_message: String::new(),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_height: ui_height
                .saturating_sub(FILTERBAR_HEIGHT)
                .saturating_sub(STATUSLINE_HEIGHT)
                .saturating_sub(TABLE_HEADER_HEIGHT),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: UTConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    table: Option<TableController>,
    presented: Vec<usize>, // Row indices on screen order, filtered rows excluded
    column_widths: Vec<usize>,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    filter_focus: usize,
    selector: Selector,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    status_message: String,
}

impl Model {
    pub fn init(config: &UTConfig, ui_width: usize, ui_height: usize) -> Result<Self, UTError> {
        let mut model = Self {
            config: config.clone(),
            status: Status::EMPTY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            name: String::new(),
            table: None,
            presented: Vec::new(),
            column_widths: Vec::new(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            filter_focus: 0,
            selector: Selector::default(),
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            status_message: "Started ut!".to_string(),
        };
        model.update_table_data();
        Ok(model)
    }

    pub fn load_data_file(&mut self, path: PathBuf) -> Result<(), UTError> {
        let file_info = Model::get_file_info(path)?;
        let frame = match file_info.file_type {
            FileType::CSV => Model::load_csv(&file_info.path)?,
            FileType::PARQUET => Model::load_parquet(&file_info.path)?,
            FileType::ARROW => Model::load_arrow(&file_info.path)?,
        };

        let start_time = Instant::now();

        // Every column is converted to strings on its own rayon task
        let df = Arc::new(frame.collect()?);
        let c_: Result<Vec<LoadedColumn>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name))
            .collect();
        let columns = c_?;

        let source = Self::build_source(columns);
        info!(
            "Loading {} rows from {:?} ({} bytes) took {}ms",
            source.rows.len(),
            file_info.path,
            file_info.file_size,
            start_time.elapsed().as_millis()
        );

        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        self.attach_source(name, &source)
    }

    /// Attach the sort/filter controller to a loaded table.
    pub fn attach_source(&mut self, name: impl Into<String>, source: &TableSource) -> Result<(), UTError> {
        let table =
            TableController::attach(source, &self.config.layout).ok_or(UTError::EmptyTable)?;

        self.column_widths = Self::calculate_column_widths(source, self.config.max_column_width);
        self.name = name.into();
        self.presented = table.presented_rows();
        self.table = Some(table);
        self.curser_row = 0;
        self.offset_row = 0;
        self.curser_column = 0;
        self.filter_focus = 0;
        self.status = Status::READY;
        self.set_status_message(format!("Loaded {}", self.name));
        self.update_table_data();
        Ok(())
    }

    fn build_source(columns: Vec<LoadedColumn>) -> TableSource {
        let nrows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nrows)
            .map(|ridx| columns.iter().map(|c| c.data[ridx].clone()).collect())
            .collect();
        TableSource {
            headers: columns.iter().map(|c| c.name.clone()).collect(),
            numeric: columns.iter().map(|c| c.numeric).collect(),
            rows,
        }
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
        let numeric = Model::is_numeric_type(df.column(col_name)?.dtype());

        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let data = series
            .into_iter()
            .map(|value| value.map(|s| s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")))
            .collect();

        Ok(LoadedColumn {
            name: col_name.to_string(),
            data,
            numeric,
        })
    }

    fn is_numeric_type(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64
        )
    }

    fn detect_file_type(path: &Path) -> Result<FileType, UTError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(UTError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, UTError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => UTError::FileNotFound,
            ErrorKind::PermissionDenied => UTError::PermissionDenied,
            _ => UTError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(UTError::LoadingFailed("Not a file!".into()));
        }

        let file_size = metadata.len();
        let file_type = Model::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size,
            file_type,
        })
    }

    fn load_csv(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.as_path().into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(
            PlPath::Local(path.as_path().into()),
            ScanArgsParquet::default(),
        )
    }

    fn load_arrow(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.as_path().into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }

    // Display width of the widest cell, header plus indicator glyph included
    fn calculate_column_widths(source: &TableSource, max_column_width: usize) -> Vec<usize> {
        source
            .headers
            .iter()
            .enumerate()
            .map(|(cidx, name)| {
                let header = Span::raw(name.as_str()).width() + 2;
                let cells = source
                    .rows
                    .iter()
                    .map(|row| {
                        row.get(cidx)
                            .and_then(|c| c.as_deref())
                            .map(|c| Span::raw(c).width())
                            .unwrap_or(1)
                    })
                    .max()
                    .unwrap_or(0);
                std::cmp::min(std::cmp::max(header, cells) + COLUMN_WIDTH_MARGIN, max_column_width)
            })
            .collect()
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn is_filter_mode(&self) -> bool {
        self.modus == Modus::FILTER
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.clamp_cursor();
        self.update_table_data();
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), UTError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);

        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_table_selection_down(1),
                Message::MoveUp => self.move_table_selection_up(1),
                Message::MoveLeft => self.move_table_selection_left(),
                Message::MoveRight => self.move_table_selection_right(),
                Message::MovePageUp => self.move_table_selection_up(self.page_size()),
                Message::MovePageDown => self.move_table_selection_down(self.page_size()),
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(self.presented.len().saturating_sub(1)),
                Message::Sort | Message::Enter => self.sort_column(self.curser_column),
                Message::SortColumn(column) => self.sort_column(column),
                Message::FocusFilters => self.enter_filter_mode(),
                Message::ClearFilters => self.clear_filters(),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit => {}
            },
            Modus::FILTER => match msg {
                Message::Quit => self.quit(),
                Message::MoveLeft => self.focus_next_filter(-1),
                Message::MoveRight | Message::FocusFilters => self.focus_next_filter(1),
                Message::MoveUp | Message::MoveDown | Message::Enter | Message::Exit => {
                    self.handle_filter_input(&msg)
                }
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Enter | Message::Help => self.close_popup(),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn page_size(&self) -> usize {
        std::cmp::max(self.uilayout.table_height, 1)
    }

    fn sort_column(&mut self, column: usize) {
        let Some(table) = self.table.as_mut() else {
            return;
        };
        let column_name = table
            .columns()
            .get(column)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{column}"));

        if table.on_header_activate(column) {
            let glyph = table.indicator(column).glyph();
            self.curser_column = column;
            self.set_status_message(format!("Sorted by {column_name} {glyph}"));
            self.refresh_rows();
        } else {
            self.set_status_message(format!("Column {column_name} can not be sorted"));
            self.update_table_data();
        }
    }

    fn enter_filter_mode(&mut self) {
        let Some(control) = self
            .table
            .as_ref()
            .and_then(|t| t.filters().get(self.filter_focus))
        else {
            self.set_status_message("No filters available");
            self.update_table_data();
            return;
        };
        trace!("Entering filter mode on {}", control.name);
        self.selector.open(control);
        self.previous_modus = self.modus;
        self.modus = Modus::FILTER;
        self.update_table_data();
    }

    fn focus_next_filter(&mut self, step: i32) {
        let Some(table) = self.table.as_ref() else {
            return;
        };
        let n = table.filters().len();
        if n == 0 {
            return;
        }
        self.filter_focus = (self.filter_focus as i64 + step as i64).rem_euclid(n as i64) as usize;
        self.selector.open(&table.filters()[self.filter_focus]);
        self.update_table_data();
    }

    fn handle_filter_input(&mut self, msg: &Message) {
        let result = self.selector.read(msg);
        if result.changed {
            self.apply_filter(&result.name, &result.value);
        }
        if result.finished {
            trace!("Leaving filter mode, canceled: {}", result.canceled);
            self.previous_modus = Modus::FILTER;
            self.modus = Modus::TABLE;
        }
        self.update_table_data();
    }

    fn apply_filter(&mut self, name: &str, value: &str) {
        let applied = self
            .table
            .as_mut()
            .is_some_and(|t| t.on_filter_change(name, value));
        if applied {
            debug!("Filter {name} set to {value:?}");
            self.refresh_rows();
            self.set_status_message(format!("{} rows match", self.presented.len()));
        }
    }

    fn clear_filters(&mut self) {
        let Some(table) = self.table.as_mut() else {
            return;
        };
        table.clear_filters();
        self.refresh_rows();
        self.set_status_message("Filters cleared");
    }

    fn refresh_rows(&mut self) {
        if let Some(table) = &self.table {
            self.presented = table.presented_rows();
        }
        self.clamp_cursor();
        self.update_table_data();
    }

    fn clamp_cursor(&mut self) {
        let nrows = self.presented.len();
        if nrows == 0 {
            self.curser_row = 0;
            self.offset_row = 0;
            return;
        }
        let abs = std::cmp::min(self.offset_row + self.curser_row, nrows - 1);
        if self.offset_row >= nrows {
            self.offset_row = 0;
            self.curser_row = 0;
        }
        self.select_row(abs);
    }

    fn select_row(&mut self, abs: usize) {
        let height = self.page_size();
        if abs < self.offset_row {
            self.offset_row = abs;
            self.curser_row = 0;
        } else if abs >= self.offset_row + height {
            self.offset_row = abs + 1 - height;
            self.curser_row = height - 1;
        } else {
            self.curser_row = abs - self.offset_row;
        }
        self.update_table_data();
    }

    fn move_table_selection_up(&mut self, size: usize) {
        let abs = (self.offset_row + self.curser_row).saturating_sub(size);
        self.select_row(abs);
    }

    fn move_table_selection_down(&mut self, size: usize) {
        if self.presented.is_empty() {
            return;
        }
        let abs = std::cmp::min(
            self.offset_row + self.curser_row + size,
            self.presented.len() - 1,
        );
        self.select_row(abs);
    }

    fn move_table_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
        self.update_table_data();
    }

    fn move_table_selection_right(&mut self) {
        if self.curser_column + 1 < self.column_widths.len() {
            self.curser_column += 1;
        }
        self.update_table_data();
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.update_table_data();
    }

    fn selected_data_row(&self) -> Option<usize> {
        self.presented
            .get(self.offset_row + self.curser_row)
            .copied()
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn row_as_csv(&self, ridx: usize) -> Option<String> {
        let table = self.table.as_ref()?;
        let row = table.row(ridx)?;
        let content = (0..table.columns().len())
            .map(|cidx| Model::wrap_cell_content(row.cell(cidx).unwrap_or("")))
            .collect::<Vec<String>>();
        Some(content.join(","))
    }

    fn copy_table_row(&mut self) {
        let Some(row_content) = self.selected_data_row().and_then(|r| self.row_as_csv(r)) else {
            return;
        };

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard is not available: {:?}", e);
                    self.set_status_message("Clipboard is not available");
                    return;
                }
            }
        }

        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(row_content) {
                Ok(_) => {
                    trace!("Copied row content to clipboard.");
                    self.set_status_message("Copied row");
                }
                Err(e) => warn!("Error copying to clipboard: {:?}", e),
            }
        }
    }

    fn update_table_data(&mut self) {
        let Some(table) = &self.table else {
            self.uidata = UIData::empty();
            self.uidata.status_message = self.status_message.clone();
            return;
        };

        let rbegin = std::cmp::min(self.offset_row, self.presented.len());
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, self.presented.len());
        let window = &self.presented[rbegin..rend];

        let columns: Vec<ColumnView> = table
            .columns()
            .iter()
            .map(|column| {
                let glyph = table.indicator(column.idx).glyph();
                let name = if glyph.is_empty() {
                    column.name.clone()
                } else {
                    format!("{} {}", column.name, glyph)
                };
                let data = window
                    .iter()
                    .map(|&ridx| {
                        table
                            .row(ridx)
                            .and_then(|r| r.cell(column.idx))
                            .unwrap_or(MISSING_CELL)
                            .to_string()
                    })
                    .collect();
                ColumnView {
                    name,
                    width: self.column_widths.get(column.idx).copied().unwrap_or(0),
                    data,
                }
            })
            .collect();

        let filters = table
            .filters()
            .iter()
            .enumerate()
            .map(|(fidx, control)| FilterView {
                label: control.label.clone(),
                text: control.selected_text().to_string(),
                focused: self.modus == Modus::FILTER && fidx == self.filter_focus,
                active: control.is_active(),
            })
            .collect();

        let sort = table.sort_state();
        let sort_description = match sort.column {
            Some(cidx) => format!(
                "sorted by {} {}",
                table.columns()[cidx].name,
                table.indicator(cidx).glyph()
            ),
            None => "unsorted".to_string(),
        };

        let selected_label = self
            .selected_data_row()
            .and_then(|r| table.series_label(r))
            .unwrap_or("")
            .to_string();

        self.uidata = UIData {
            name: self.name.clone(),
            table: columns,
            filters,
            filter_mode: self.modus == Modus::FILTER,
            nrows: self.presented.len(),
            total_rows: table.rows().len(),
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            abs_selected_row: self.offset_row + self.curser_row,
            sort_description,
            selected_label,
            show_popup: self.modus == Modus::POPUP,
            popup_message: if self.modus == Modus::POPUP {
                HELP_TEXT.to_string()
            } else {
                String::new()
            },
            status_message: self.status_message.clone(),
        };
    }
}
