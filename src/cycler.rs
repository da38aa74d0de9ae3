//! Click transition: each click advances a rating one step, wrapping 5 → 0.

use crate::category::{Rating, MAX_RATING};

/// Next rating after a click: `0 → 1 → … → 5 → 0`.
pub fn next(current: Rating) -> Rating {
    let v = current.value();
    let n = if v == MAX_RATING { 0 } else { (v % MAX_RATING) + 1 };
    Rating::new(n as i64).unwrap_or_default()
}

/// Next rating from a raw cell attribute. Missing or non-numeric input counts as 0.
pub fn next_from_attr(raw: Option<&str>) -> Rating {
    next(Rating::from_attr(raw))
}
