//! Error types for the rating core, remote sync, and configuration.
//!
//! None of these are fatal to a session: rating errors reject a single
//! mutation, sync errors forfeit a single load or save, and configuration
//! errors are reported once at startup.

use thiserror::Error;

use crate::category::Category;

/// Errors raised by rating values and matrix addressing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    /// A numeric rating fell outside `0..=5`.
    #[error("rating {value} is outside 0..=5")]
    InvalidRating { value: i64 },

    /// A rating could not be read as an integer at all.
    #[error("rating value {raw:?} is not numeric")]
    NonNumeric { raw: String },

    /// A row index past the end of the table.
    #[error("row {row} does not exist (table has {rows} rows)")]
    UnknownRow { row: usize, rows: usize },

    /// A column index with no category, or a category the row has no cell for.
    #[error("row {row} has no rating cell at column {column}")]
    UnknownCell { row: usize, column: usize },

    /// Several table rows share one pizza label, so matching by label is a guess.
    #[error("pizza label {label:?} is shared by {count} rows")]
    AmbiguousRow { label: String, count: usize },
}

impl RatingError {
    /// Shorthand for a rejected value on a named category.
    pub(crate) fn for_category(self, pizza: &str, category: Category) -> RejectedScore {
        RejectedScore {
            pizza: pizza.to_string(),
            category,
            error: self,
        }
    }
}

/// A score the server sent that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedScore {
    pub pizza: String,
    pub category: Category,
    pub error: RatingError,
}

/// Errors from the read and save endpoints.
///
/// Each variant carries enough context to diagnose the failure without
/// needing to inspect the originating error directly.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The request never got a response (DNS, TCP, TLS, timeout).
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The server replied with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The response body was not the expected JSON shape.
    #[error("JSON parse error on {field}: {detail}")]
    Json { field: String, detail: String },

    /// The save worker exited before it could report an outcome.
    #[error("save worker stopped before reporting")]
    Stopped,
}

/// Errors from loading or validating a [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rating_display_mentions_value() {
        let err = RatingError::InvalidRating { value: 9 };
        assert_eq!(err.to_string(), "rating 9 is outside 0..=5");
    }

    #[test]
    fn ambiguous_row_display_mentions_label_and_count() {
        let err = RatingError::AmbiguousRow {
            label: "Margherita".into(),
            count: 2,
        };
        let s = err.to_string();
        assert!(s.contains("Margherita"), "label in display: {s}");
        assert!(s.contains('2'), "count in display: {s}");
    }

    #[test]
    fn sync_error_display_http() {
        let err = SyncError::Http {
            status: 503,
            url: "https://example.com/exec".into(),
        };
        let s = err.to_string();
        assert!(s.contains("503"), "status in display: {s}");
        assert!(s.contains("https://example.com/exec"), "url in display: {s}");
    }

    #[test]
    fn sync_error_display_connect() {
        let err = SyncError::Connect {
            url: "http://localhost:1".into(),
            detail: "connection refused".into(),
        };
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn errors_are_std_errors() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&RatingError::NonNumeric { raw: "x".into() });
        assert_error(&SyncError::Json {
            field: "rows".into(),
            detail: "eof".into(),
        });
        assert_error(&ConfigError::Invalid("quiet_period_ms".into()));
    }

    #[test]
    fn for_category_wraps_context() {
        let rejected = RatingError::InvalidRating { value: 7 }.for_category("Pepperoni", Category::Crust);
        assert_eq!(rejected.pizza, "Pepperoni");
        assert_eq!(rejected.category, Category::Crust);
        assert_eq!(rejected.error, RatingError::InvalidRating { value: 7 });
    }
}
