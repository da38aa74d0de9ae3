//! The authoritative store of every rating on the page.
//!
//! [`RatingMatrix`] owns a [`RatingCell`] per (row, category) and the
//! [`TableView`] it projects onto. The view's `data-score` attributes are
//! read exactly once, in [`RatingMatrix::from_view`]; from then on every
//! mutation goes through the matrix, which redraws the affected cell.
//!
//! ## Row identity
//! Rows are addressed by position ([`RowId`]) for clicks and by pizza label
//! for hydration. Labels come from image alt text and are not unique, so a
//! label shared by several rows is reported in [`HydrateReport::ambiguous`]
//! and matched by occurrence order: the n-th record carrying a label goes to
//! the n-th row carrying it.

use std::collections::HashMap;

use crate::category::{Category, CategorySet, Rating, UNKNOWN_PIZZA};
use crate::cycler;
use crate::error::RatingError;
use crate::snapshot::{RatingRecord, RemoteSnapshot};
use crate::table::TableView;

/// Position of a row in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub usize);

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One (row, category) rating and where it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingCell {
    rating: Rating,
    /// View column, or `None` when the rendered row has no cell for this category.
    column: Option<usize>,
}

impl RatingCell {
    pub fn rating(&self) -> Rating {
        self.rating
    }

    /// Icons drawn for this cell: exactly the rating, none when unrated.
    pub fn units(&self) -> u8 {
        self.rating.value()
    }

    pub fn is_rendered(&self) -> bool {
        self.column.is_some()
    }

    fn render<V: TableView>(&self, view: &mut V, row: usize) {
        if let Some(column) = self.column {
            view.render_cell(row, column, self.units());
        }
    }
}

#[derive(Debug, Clone)]
struct MatrixRow {
    label: String,
    /// Indexed like `CategorySet::categories()`.
    cells: Vec<RatingCell>,
}

/// Outcome of [`RatingMatrix::hydrate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrateReport {
    /// Records written onto a table row.
    pub applied: usize,
    /// Records with no row to land on: unknown pizzas, or more records for a
    /// label than rows carrying it.
    pub unmatched: Vec<String>,
    /// One [`RatingError::AmbiguousRow`] per label shared by several rows.
    pub ambiguous: Vec<RatingError>,
}

impl HydrateReport {
    pub fn is_clean(&self) -> bool {
        self.unmatched.is_empty() && self.ambiguous.is_empty()
    }
}

/// All ratings for all rows, projected onto a [`TableView`].
pub struct RatingMatrix<V> {
    view: V,
    categories: CategorySet,
    rows: Vec<MatrixRow>,
}

impl<V: TableView> RatingMatrix<V> {
    /// Take over a rendered table.
    ///
    /// Each row's label is its image alt text ([`UNKNOWN_PIZZA`] when absent).
    /// Each cell's starting value is its `data-score` attribute, with missing,
    /// non-numeric, or out-of-range attributes read as `0`. Every cell is then
    /// redrawn so the view agrees with the matrix from the start.
    pub fn from_view(view: V, categories: CategorySet) -> Self {
        let rows = (0..view.row_count())
            .map(|row| {
                let label = view
                    .row_label(row)
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| UNKNOWN_PIZZA.to_string());
                let cell_count = view.cell_count(row);
                let cells = (0..categories.len())
                    .map(|column| {
                        if column < cell_count {
                            RatingCell {
                                rating: Rating::from_attr(view.score_attr(row, column).as_deref()),
                                column: Some(column),
                            }
                        } else {
                            RatingCell {
                                rating: Rating::ZERO,
                                column: None,
                            }
                        }
                    })
                    .collect();
                MatrixRow { label, cells }
            })
            .collect();

        let mut matrix = Self {
            view,
            categories,
            rows,
        };
        matrix.render_all();
        matrix
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn label(&self, row: RowId) -> Option<&str> {
        self.rows.get(row.0).map(|r| r.label.as_str())
    }

    /// Rows carrying `label`, in table order.
    pub fn rows_labeled(&self, label: &str) -> Vec<RowId> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.label == label)
            .map(|(i, _)| RowId(i))
            .collect()
    }

    /// First row carrying `label`.
    pub fn find_row(&self, label: &str) -> Option<RowId> {
        self.rows.iter().position(|r| r.label == label).map(RowId)
    }

    /// Labels carried by more than one row, with their counts, in first-seen order.
    pub fn duplicate_labels(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for r in &self.rows {
            *counts.entry(r.label.as_str()).or_insert(0) += 1;
        }
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .filter_map(|r| {
                let n = counts[r.label.as_str()];
                (n > 1 && seen.insert(r.label.as_str())).then(|| (r.label.clone(), n))
            })
            .collect()
    }

    /// # Errors
    /// [`RatingError::UnknownRow`] or [`RatingError::UnknownCell`] when the
    /// table has no such row, or the category is not rated by this table.
    pub fn cell(&self, row: RowId, category: Category) -> Result<&RatingCell, RatingError> {
        let column = self.column(row, category)?;
        Ok(&self.rows[row.0].cells[column])
    }

    /// Current rating; `0` for unset cells and for cells that do not exist.
    pub fn get_rating(&self, row: RowId, category: Category) -> Rating {
        self.cell(row, category).map(|c| c.rating).unwrap_or_default()
    }

    /// Validate and store a rating, then redraw the cell.
    ///
    /// # Errors
    /// [`RatingError::InvalidRating`] when `value` is outside `0..=5`; the
    /// cell is left unchanged. Addressing errors as for [`cell`](Self::cell).
    pub fn set_rating(&mut self, row: RowId, category: Category, value: i64) -> Result<Rating, RatingError> {
        let column = self.column(row, category)?;
        let rating = Rating::new(value)?;
        self.store(row.0, column, rating);
        Ok(rating)
    }

    /// Apply one click to the cell at view column `column` and return the new rating.
    ///
    /// # Errors
    /// [`RatingError::UnknownRow`] / [`RatingError::UnknownCell`] when no such
    /// rendered cell exists.
    pub fn click(&mut self, row: RowId, column: usize) -> Result<Rating, RatingError> {
        let unknown_cell = RatingError::UnknownCell { row: row.0, column };
        let category = self.categories.at(column).ok_or_else(|| unknown_cell.clone())?;
        let index = self.column(row, category)?;
        let cell = self.rows[row.0].cells[index];
        if !cell.is_rendered() {
            return Err(unknown_cell);
        }
        let next = cycler::next(cell.rating);
        self.store(row.0, index, next);
        Ok(next)
    }

    /// Every row in table order, every category in column order. Does not mutate.
    pub fn snapshot(&self) -> RemoteSnapshot {
        let rows = self
            .rows
            .iter()
            .map(|r| RatingRecord {
                pizza: r.label.clone(),
                scores: self
                    .categories
                    .categories()
                    .iter()
                    .zip(&r.cells)
                    .map(|(c, cell)| (*c, cell.rating))
                    .collect(),
            })
            .collect();
        RemoteSnapshot { rows }
    }

    /// Overwrite rows from a saved snapshot and redraw them.
    ///
    /// Records for pizzas not in the table are skipped, rows with no record
    /// keep their current ratings, and categories a record omits are left
    /// alone. Categories this table does not rate are ignored.
    pub fn hydrate(&mut self, snapshot: &RemoteSnapshot) -> HydrateReport {
        let mut report = HydrateReport::default();
        let mut occurrences: HashMap<&str, usize> = HashMap::new();

        for record in &snapshot.rows {
            let nth = occurrences.entry(record.pizza.as_str()).or_insert(0);
            let occurrence = *nth;
            *nth += 1;

            let matches = self.rows_labeled(&record.pizza);
            if matches.len() > 1 && occurrence == 0 {
                report.ambiguous.push(RatingError::AmbiguousRow {
                    label: record.pizza.clone(),
                    count: matches.len(),
                });
            }
            let Some(&row) = matches.get(occurrence) else {
                report.unmatched.push(record.pizza.clone());
                continue;
            };

            for (category, rating) in &record.scores {
                if let Some(index) = self.categories.column_of(*category) {
                    self.store(row.0, index, *rating);
                }
            }
            report.applied += 1;
        }
        report
    }

    fn column(&self, row: RowId, category: Category) -> Result<usize, RatingError> {
        if row.0 >= self.rows.len() {
            return Err(RatingError::UnknownRow {
                row: row.0,
                rows: self.rows.len(),
            });
        }
        self.categories
            .column_of(category)
            .ok_or(RatingError::UnknownCell {
                row: row.0,
                column: category as usize,
            })
    }

    fn store(&mut self, row: usize, index: usize, rating: Rating) {
        let cell = &mut self.rows[row].cells[index];
        cell.rating = rating;
        let cell = *cell;
        cell.render(&mut self.view, row);
    }

    fn render_all(&mut self) {
        for (i, r) in self.rows.iter().enumerate() {
            for cell in &r.cells {
                cell.render(&mut self.view, i);
            }
        }
    }
}

impl<V> std::fmt::Debug for RatingMatrix<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingMatrix")
            .field("categories", &self.categories)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}
