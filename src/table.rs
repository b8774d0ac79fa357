use tracing::{debug, trace, warn};

use crate::column::{ColumnDescriptor, ColumnKind, ColumnLayout, SortDirection, compare_keys};
use crate::filter::{FilterControl, RateBuckets};

/// One displayed record. Cells past the end of the row count as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Option<String>>,
}

impl Row {
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).and_then(|c| c.as_deref())
    }
}

/// The rendered table a controller attaches to: a header row and the body.
#[derive(Debug, Clone, Default)]
pub struct TableSource {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Columns whose source data was numeric.
    pub numeric: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: Option<usize>,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    None,
    Neutral,
    Ascending,
    Descending,
}

impl SortIndicator {
    pub fn glyph(self) -> &'static str {
        match self {
            SortIndicator::None => "",
            SortIndicator::Neutral => "⇅",
            SortIndicator::Ascending => "↑",
            SortIndicator::Descending => "↓",
        }
    }
}

/// Sort and filter state for one attached table.
///
/// `order` is the presented permutation of row indices and `visible` is
/// indexed by row index, so sorting and filtering never touch each other.
#[derive(Debug, Clone)]
pub struct TableController {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
    order: Vec<usize>,
    visible: Vec<bool>,
    sort: SortState,
    indicators: Vec<SortIndicator>,
    filters: Vec<FilterControl>,
    series_labels: Vec<Option<String>>,
}

impl TableController {
    /// Build the controller from a rendered table. Returns `None` when there
    /// is no table to attach to.
    pub fn attach(source: &TableSource, layout: &ColumnLayout) -> Option<Self> {
        if source.headers.is_empty() {
            debug!("No table header present, nothing to attach to");
            return None;
        }

        let columns: Vec<ColumnDescriptor> = source
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                ColumnDescriptor::new(idx, name.trim(), Self::resolve_kind(source, layout, idx, name))
            })
            .collect();

        let rows: Vec<Row> = source.rows.iter().cloned().map(Row::new).collect();
        let indicators = columns
            .iter()
            .map(|c| {
                if c.sortable {
                    SortIndicator::Neutral
                } else {
                    SortIndicator::None
                }
            })
            .collect();

        let mut filters = Vec::new();
        if let Some(col) = columns.iter().find(|c| c.name == layout.location_column) {
            filters.push(FilterControl::location(col.idx, col.name.clone(), &layout.locations));
        }
        if let Some(col) = columns.iter().find(|c| c.name == layout.rate_column)
            && let Some(buckets) = col.buckets()
        {
            filters.push(FilterControl::rate(col.idx, col.name.clone(), *buckets));
        }

        let mut controller = Self {
            order: (0..rows.len()).collect(),
            visible: vec![true; rows.len()],
            columns,
            rows,
            sort: SortState::default(),
            indicators,
            filters,
            series_labels: Vec::new(),
        };
        controller.series_labels = controller.build_series_labels(layout);

        debug!(
            "Attached table with {} columns, {} rows, {} filters",
            controller.columns.len(),
            controller.rows.len(),
            controller.filters.len()
        );
        Some(controller)
    }

    fn resolve_kind(source: &TableSource, layout: &ColumnLayout, idx: usize, name: &str) -> ColumnKind {
        let name = name.trim();
        if name == layout.rate_column {
            ColumnKind::Rate {
                qualifiers: layout.qualifiers.clone(),
                buckets: RateBuckets::default(),
            }
        } else if name == layout.rating_column {
            ColumnKind::Rating {
                marker: layout.rating_marker,
            }
        } else if source.numeric.get(idx).copied().unwrap_or(false) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }

    // Label per row index, e.g. "皖西学院: 45%". Names may repeat.
    fn build_series_labels(&self, layout: &ColumnLayout) -> Vec<Option<String>> {
        let Some(rate_col) = self.columns.iter().find(|c| c.name == layout.rate_column) else {
            return vec![None; self.rows.len()];
        };
        self.rows
            .iter()
            .map(|row| {
                let name = row.cell(0)?.trim();
                let rate = row.cell(rate_col.idx)?.trim();
                Some(format!("{name}: {rate}"))
            })
            .collect()
    }

    /// Handle activation of a column header. Returns `false` if the column
    /// can not be sorted.
    pub fn on_header_activate(&mut self, column: usize) -> bool {
        let Some(descriptor) = self.columns.get(column) else {
            warn!("Ignoring sort request for unknown column {column}");
            return false;
        };
        if !descriptor.sortable {
            trace!("Column {column} is not sortable");
            return false;
        }

        self.sort = if self.sort.column == Some(column) {
            SortState {
                column: Some(column),
                direction: self.sort.direction.flip(),
            }
        } else {
            SortState {
                column: Some(column),
                direction: SortDirection::Ascending,
            }
        };
        self.apply_sort();
        true
    }

    fn apply_sort(&mut self) {
        let Some(column) = self.sort.column else {
            return;
        };
        let direction = self.sort.direction;
        let descriptor = &self.columns[column];

        let keys: Vec<_> = self
            .rows
            .iter()
            .map(|row| descriptor.sort_key(row.cell(column)))
            .collect();

        // Stable, so ties keep the current presentation order
        self.order
            .sort_by(|&a, &b| compare_keys(&keys[a], &keys[b], direction));

        for (idx, indicator) in self.indicators.iter_mut().enumerate() {
            *indicator = if !self.columns[idx].sortable {
                SortIndicator::None
            } else if idx == column {
                match direction {
                    SortDirection::Ascending => SortIndicator::Ascending,
                    SortDirection::Descending => SortIndicator::Descending,
                }
            } else {
                SortIndicator::Neutral
            };
        }
        debug!("Sorted by column {column} ({direction:?})");
    }

    /// Set the selection of a named filter control and recompute visibility.
    /// Returns `false` for unknown controls or values.
    pub fn on_filter_change(&mut self, name: &str, value: &str) -> bool {
        let Some(control) = self.filters.iter_mut().find(|f| f.name == name) else {
            warn!("No filter control named {name}");
            return false;
        };
        if !control.has_option(value) {
            warn!("Filter {name} has no option {value:?}");
            return false;
        }
        control.selected = value.to_string();
        self.apply_filters();
        true
    }

    pub fn clear_filters(&mut self) {
        for control in self.filters.iter_mut() {
            control.selected.clear();
        }
        self.apply_filters();
    }

    fn apply_filters(&mut self) {
        let active: Vec<&FilterControl> = self.filters.iter().filter(|f| f.is_active()).collect();
        let columns = &self.columns;
        let rate_of = |row: &Row, column: usize| {
            columns
                .get(column)
                .map(|c| c.rate(row.cell(column)))
                .unwrap_or(f64::NAN)
        };

        for (visible, row) in self.visible.iter_mut().zip(self.rows.iter()) {
            *visible = active.iter().all(|f| f.keep(row, rate_of));
        }
        trace!(
            "Filters applied, {} of {} rows visible",
            self.visible_count(),
            self.rows.len()
        );
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    /// Row indices shown to the user, in presentation order.
    pub fn presented_rows(&self) -> Vec<usize> {
        self.order
            .iter()
            .copied()
            .filter(|&r| self.visible[r])
            .collect()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|&&v| v).count()
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn indicator(&self, column: usize) -> SortIndicator {
        self.indicators
            .get(column)
            .copied()
            .unwrap_or(SortIndicator::None)
    }

    pub fn filters(&self) -> &[FilterControl] {
        &self.filters
    }

    pub fn series_label(&self, row: usize) -> Option<&str> {
        self.series_labels.get(row)?.as_deref()
    }
}
