//! The rendered rating table, as seen by the rating core.
//!
//! Whatever draws the table (a browser DOM, a terminal) implements
//! [`TableView`]. The core reads labels and initial `data-score` attributes
//! once, then only ever writes: after every mutation the matrix pushes the
//! new attribute and icon count back through [`TableView::render_cell`].

/// Attribute name a cell exposes its score under.
pub const SCORE_ATTR: &str = "data-score";

/// The table contract: rows, each with an image label and positional rating cells.
pub trait TableView {
    /// Number of body rows.
    fn row_count(&self) -> usize;

    /// Alt text of the row's image, if the row has an image with alt text.
    fn row_label(&self, row: usize) -> Option<String>;

    /// Number of rating cells in `row`.
    fn cell_count(&self, row: usize) -> usize;

    /// Current `data-score` attribute of a cell, if set.
    fn score_attr(&self, row: usize, column: usize) -> Option<String>;

    /// Write the score attribute and redraw the cell as `units` icons.
    fn render_cell(&mut self, row: usize, column: usize, units: u8);
}

/// One cell of a [`MemoryTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCell {
    pub score_attr: Option<String>,
    /// Number of icons currently drawn.
    pub units: u8,
}

/// One row of a [`MemoryTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRow {
    pub label: Option<String>,
    pub cells: Vec<MemoryCell>,
}

/// In-process table used by the terminal front-end and by tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    pub rows: Vec<MemoryRow>,
}

impl MemoryTable {
    /// A table with one row per label and `columns` blank cells per row.
    pub fn with_labels<I, S>(labels: I, columns: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = labels
            .into_iter()
            .map(|l| MemoryRow {
                label: Some(l.into()),
                cells: vec![MemoryCell::default(); columns],
            })
            .collect();
        Self { rows }
    }

    /// Append a row, returning its index.
    pub fn push_row(&mut self, label: Option<&str>, cells: Vec<MemoryCell>) -> usize {
        self.rows.push(MemoryRow {
            label: label.map(str::to_string),
            cells,
        });
        self.rows.len() - 1
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&MemoryCell> {
        self.rows.get(row)?.cells.get(column)
    }

    /// Overwrite a raw attribute without going through the core, as a page
    /// template would before the core attaches.
    pub fn set_raw_attr(&mut self, row: usize, column: usize, value: Option<&str>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.cells.get_mut(column)) {
            cell.score_attr = value.map(str::to_string);
        }
    }
}

impl TableView for MemoryTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_label(&self, row: usize) -> Option<String> {
        self.rows.get(row)?.label.clone()
    }

    fn cell_count(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, |r| r.cells.len())
    }

    fn score_attr(&self, row: usize, column: usize) -> Option<String> {
        self.cell(row, column)?.score_attr.clone()
    }

    fn render_cell(&mut self, row: usize, column: usize, units: u8) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.cells.get_mut(column)) {
            cell.score_attr = Some(units.to_string());
            cell.units = units;
        }
    }
}
