//! # pizza-ratings
//!
//! Click-to-rate pizza table. Each row is a pizza, each column a category,
//! and each click advances that cell's 0–5 rating. The whole matrix is saved
//! to a remote sheet once clicks stop for a quiet period, and saved ratings
//! are loaded back when the table attaches.
//!
//! ```rust,ignore
//! let view = MemoryTable::with_labels(["Margherita", "Hawaiian"], 7);
//! let store = RemoteSync::from_config(&config);
//! let mut session = Session::start_with_config(view, store, &config).await;
//! session.click(RowId(0), 0)?; // sauce: 0 -> 1, save scheduled
//! ```

pub mod category;
pub mod cli;
pub mod config;
pub mod cycler;
pub mod error;
pub mod matrix;
pub mod persister;
pub mod remote;
pub mod saver;
pub mod session;
pub mod snapshot;
pub mod table;

pub use category::{Category, CategorySet, Rating};
pub use config::Config;
pub use error::{ConfigError, RatingError, SyncError};
pub use matrix::{HydrateReport, RatingCell, RatingMatrix, RowId};
pub use persister::DebouncedPersister;
pub use remote::{MemoryStore, RatingStore, RemoteSync};
pub use saver::{SaveQueue, SaveResult};
pub use session::{Session, StartupReport};
pub use snapshot::{RatingRecord, RemoteSnapshot};
pub use table::{MemoryTable, TableView};
