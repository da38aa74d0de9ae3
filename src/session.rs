//! Composition root: table + store + debounce timer for one page session.
//!
//! ## Startup order
//! 1. Build the [`RatingMatrix`] over the already-rendered table.
//! 2. Load saved ratings and hydrate the matrix. A failed load is logged and
//!    the table stays at its initial values.
//! 3. Hand back the [`Session`]. Clicks can only be applied through it, so no
//!    click can land before hydration finishes.
//!
//! ## Saving
//! Every accepted mutation restarts the debounce timer. When it fires, a save
//! is queued on the session's [`SaveQueue`], whose worker sends one save at a
//! time with a snapshot taken just before sending. A slow save therefore
//! never overwrites a newer one. Failures are logged and not retried; the
//! next accepted mutation schedules another full save.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::category::{Category, CategorySet, Rating};
use crate::config::Config;
use crate::error::RatingError;
use crate::matrix::{HydrateReport, RatingMatrix, RowId};
use crate::persister::DebouncedPersister;
use crate::remote::RatingStore;
use crate::saver::{SaveQueue, SaveResult};
use crate::snapshot::RemoteSnapshot;
use crate::table::TableView;

type SharedMatrix<V> = Arc<Mutex<RatingMatrix<V>>>;

/// What happened while the session attached to the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// Whether saved ratings were fetched. `false` means the table kept its initial values.
    pub loaded: bool,
    pub hydrate: HydrateReport,
}

/// A live rating table wired to its store.
pub struct Session<V, S> {
    matrix: SharedMatrix<V>,
    store: Arc<S>,
    persister: DebouncedPersister,
    saves: SaveQueue,
    startup: StartupReport,
}

impl<V, S> Session<V, S>
where
    V: TableView + Send + 'static,
    S: RatingStore,
{
    /// Attach to `view`, hydrate it from `store`, and arm saving.
    pub async fn start(view: V, store: S, categories: CategorySet, quiet_period: Duration) -> Self {
        let mut matrix = RatingMatrix::from_view(view, categories);

        let mut startup = StartupReport::default();
        match store.load().await {
            Ok(snapshot) => {
                startup.loaded = true;
                startup.hydrate = matrix.hydrate(&snapshot);
                let report = &startup.hydrate;
                for pizza in &report.unmatched {
                    debug!(pizza = %pizza, "saved ratings have no matching row");
                }
                for err in &report.ambiguous {
                    warn!(error = %err, "saved scores for a shared label are matched by row order");
                }
                info!(
                    records = snapshot.len(),
                    applied = report.applied,
                    unmatched = report.unmatched.len(),
                    "loaded saved ratings"
                );
            }
            Err(e) => {
                warn!(error = %e, "could not load saved ratings; starting from table defaults");
            }
        }

        let matrix = Arc::new(Mutex::new(matrix));
        let store = Arc::new(store);
        let snapshot_source = Arc::clone(&matrix);
        let saves = SaveQueue::spawn(Arc::clone(&store), move || lock(&snapshot_source).snapshot());
        let sender = saves.sender();
        let persister = DebouncedPersister::new(quiet_period, move || sender.request());

        Self {
            matrix,
            store,
            persister,
            saves,
            startup,
        }
    }

    /// [`start`](Self::start) with the categories and quiet period from `config`.
    pub async fn start_with_config(view: V, store: S, config: &Config) -> Self {
        Self::start(view, store, config.categories(), config.quiet_period()).await
    }

    pub fn startup(&self) -> &StartupReport {
        &self.startup
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply a click on the cell at (`row`, `column`) and schedule a save.
    ///
    /// # Errors
    /// Addressing errors from [`RatingMatrix::click`]; nothing is scheduled.
    pub fn click(&mut self, row: RowId, column: usize) -> Result<Rating, RatingError> {
        let next = lock(&self.matrix).click(row, column)?;
        debug!(row = %row, column, rating = %next, "cell clicked");
        self.persister.notify();
        Ok(next)
    }

    /// Set a rating directly and schedule a save.
    ///
    /// # Errors
    /// [`RatingError::InvalidRating`] and addressing errors; the matrix is
    /// unchanged and nothing is scheduled.
    pub fn set_rating(&mut self, row: RowId, category: Category, value: i64) -> Result<Rating, RatingError> {
        let rating = lock(&self.matrix).set_rating(row, category, value)?;
        self.persister.notify();
        Ok(rating)
    }

    pub fn rating(&self, row: RowId, category: Category) -> Rating {
        lock(&self.matrix).get_rating(row, category)
    }

    pub fn snapshot(&self) -> RemoteSnapshot {
        lock(&self.matrix).snapshot()
    }

    /// Read access to the matrix and its view.
    pub fn with_matrix<R>(&self, f: impl FnOnce(&RatingMatrix<V>) -> R) -> R {
        f(&lock(&self.matrix))
    }

    /// Whether edits are waiting for the quiet period to end.
    pub fn save_pending(&self) -> bool {
        self.persister.is_pending()
    }

    /// Skip the remaining quiet period and save now, waiting for the result.
    ///
    /// With no edits waiting, this still waits for a save already queued or
    /// in flight and returns its outcome. Returns `None` when neither exists.
    pub async fn save_now(&mut self) -> Option<SaveResult> {
        if self.persister.cancel() {
            return Some(self.saves.save().await);
        }
        if self.saves.is_busy() {
            return self.saves.wait().await;
        }
        None
    }

    /// End the session: send edits still inside the quiet period, wait for
    /// every save to land, and return the outcome of the last one.
    /// `None` when the session never saved.
    pub async fn shutdown(mut self) -> Option<SaveResult> {
        if self.persister.cancel() {
            self.saves.request();
        }
        self.saves.wait().await
    }
}

impl<V, S> std::fmt::Debug for Session<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("persister", &self.persister)
            .field("saves", &self.saves)
            .field("startup", &self.startup)
            .finish_non_exhaustive()
    }
}

fn lock<V>(matrix: &Mutex<RatingMatrix<V>>) -> MutexGuard<'_, RatingMatrix<V>> {
    // Matrix methods leave it consistent even if a caller panicked while holding it.
    matrix.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use crate::table::MemoryTable;
    use serde_json::json;
    use tokio::time::sleep;

    const QUIET: Duration = Duration::from_millis(1_000);

    async fn session(labels: &[&str], store: MemoryStore) -> Session<MemoryTable, MemoryStore> {
        let view = MemoryTable::with_labels(labels.iter().copied(), 7);
        Session::start(view, store, CategorySet::standard(), QUIET).await
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_falls_back_to_defaults() {
        let store = MemoryStore::new(CategorySet::standard());
        store.fail_loads(true);
        let mut s = session(&["Margherita"], store).await;
        assert!(!s.startup().loaded);
        assert_eq!(s.rating(RowId(0), Category::Sauce), Rating::ZERO);
        assert_eq!(s.click(RowId(0), 0).unwrap().value(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn startup_report_counts_unmatched() {
        let store = MemoryStore::with_flat(
            CategorySet::standard(),
            json!([{ "pizza": "Margherita", "sauce": 2 }, { "pizza": "Calzone", "sauce": 1 }]),
        );
        let s = session(&["Margherita"], store).await;
        assert!(s.startup().loaded);
        assert_eq!(s.startup().hydrate.applied, 1);
        assert_eq!(s.startup().hydrate.unmatched, vec!["Calzone".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_click_schedules_nothing() {
        let mut s = session(&["Margherita"], MemoryStore::new(CategorySet::standard())).await;
        assert!(s.click(RowId(3), 0).is_err());
        assert!(s.set_rating(RowId(0), Category::Sauce, 8).is_err());
        assert!(!s.save_pending());
        sleep(QUIET * 3).await;
        assert_eq!(s.store().save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn save_now_skips_quiet_period() {
        let mut s = session(&["Margherita"], MemoryStore::new(CategorySet::standard())).await;
        assert!(s.save_now().await.is_none());
        s.set_rating(RowId(0), Category::Crust, 3).unwrap();
        assert!(s.save_pending());
        assert!(matches!(s.save_now().await, Some(Ok(200))));
        assert!(!s.save_pending());
        sleep(QUIET * 3).await;
        assert_eq!(s.store().save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_not_retried() {
        let store = MemoryStore::new(CategorySet::standard());
        store.fail_saves(true);
        let mut s = session(&["Margherita"], store).await;
        s.click(RowId(0), 1).unwrap();
        sleep(QUIET * 5).await;
        assert_eq!(s.store().save_count(), 0);
        assert_eq!(s.rating(RowId(0), Category::Cheese).value(), 1);

        s.store().fail_saves(false);
        s.click(RowId(0), 1).unwrap();
        sleep(QUIET * 2).await;
        let saved = s.store().last_save().unwrap();
        assert_eq!(saved.rows[0].score(Category::Cheese).map(Rating::value), Some(2));
    }
}
