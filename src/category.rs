//! Rating categories and the bounded rating value.
//!
//! Column order in the table is the only link between a cell and a remote
//! field, so [`Category`] derives `Ord` in declared order and
//! [`CategorySet`] hands out columns positionally.

use serde::{Deserialize, Serialize};

use crate::error::RatingError;

/// Highest rating a cell can hold.
pub const MAX_RATING: u8 = 5;

/// Label used for rows whose image carries no alt text.
pub const UNKNOWN_PIZZA: &str = "Unknown";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// One rated aspect of a pizza. Serialized names match the remote sheet columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Sauce,
    Cheese,
    Toppings,
    Crust,
    Value,
    Delivery,
    BoxDesign,
    DayAfter,
}

impl Category {
    /// Every category in column order, including the optional `dayAfter`.
    pub const ALL: [Category; 8] = [
        Category::Sauce,
        Category::Cheese,
        Category::Toppings,
        Category::Crust,
        Category::Value,
        Category::Delivery,
        Category::BoxDesign,
        Category::DayAfter,
    ];

    /// Wire name used by both the read and save endpoints.
    pub fn key(self) -> &'static str {
        match self {
            Category::Sauce => "sauce",
            Category::Cheese => "cheese",
            Category::Toppings => "toppings",
            Category::Crust => "crust",
            Category::Value => "value",
            Category::Delivery => "delivery",
            Category::BoxDesign => "boxDesign",
            Category::DayAfter => "dayAfter",
        }
    }

    /// Case-insensitive lookup by wire name (`boxdesign` and `box_design` also match).
    pub fn from_key(s: &str) -> Option<Self> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key().to_lowercase() == folded)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

// ---------------------------------------------------------------------------
// CategorySet
// ---------------------------------------------------------------------------

/// The ordered columns a table rates. Column `i` of every row is `categories()[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    categories: Vec<Category>,
}

impl CategorySet {
    /// The seven columns every table has.
    pub fn standard() -> Self {
        Self {
            categories: Category::ALL[..7].to_vec(),
        }
    }

    /// The standard columns plus `dayAfter` in column 7.
    pub fn with_day_after() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
        }
    }

    pub fn new(include_day_after: bool) -> Self {
        if include_day_after {
            Self::with_day_after()
        } else {
            Self::standard()
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category rated by table column `column`.
    pub fn at(&self, column: usize) -> Option<Category> {
        self.categories.get(column).copied()
    }

    /// Table column holding `category`, if this set rates it.
    pub fn column_of(&self, category: Category) -> Option<usize> {
        self.categories.iter().position(|c| *c == category)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.column_of(category).is_some()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

/// A score in `0..=5`; `0` means unrated. Construction enforces the range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const ZERO: Rating = Rating(0);
    pub const MAX: Rating = Rating(MAX_RATING);

    /// Validate an integer rating.
    ///
    /// # Errors
    /// [`RatingError::InvalidRating`] when `value` is outside `0..=5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        if (0..=MAX_RATING as i64).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(RatingError::InvalidRating { value })
        }
    }

    /// Parse a cell attribute such as `"3"`.
    ///
    /// # Errors
    /// [`RatingError::NonNumeric`] for text that is not an integer, and
    /// [`RatingError::InvalidRating`] for integers outside the range.
    pub fn parse(raw: &str) -> Result<Self, RatingError> {
        let trimmed = raw.trim();
        let value: i64 = trimmed.parse().map_err(|_| RatingError::NonNumeric {
            raw: raw.to_string(),
        })?;
        Rating::new(value)
    }

    /// Lenient read of a cell attribute: missing, non-numeric, or out-of-range
    /// values all become `0`.
    pub fn from_attr(raw: Option<&str>) -> Self {
        raw.and_then(|s| Rating::parse(s).ok()).unwrap_or_default()
    }

    /// Read a score from the remote sheet, which may send integers, integral
    /// floats, or numeric strings. `null` reads as unrated.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, RatingError> {
        match value {
            serde_json::Value::Null => Ok(Rating::ZERO),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Rating::new(i)
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.is_finite() => Rating::new(f as i64),
                        _ => Err(RatingError::NonNumeric { raw: n.to_string() }),
                    }
                }
            }
            serde_json::Value::String(s) if s.trim().is_empty() => Ok(Rating::ZERO),
            serde_json::Value::String(s) => Rating::parse(s),
            other => Err(RatingError::NonNumeric {
                raw: other.to_string(),
            }),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_unrated(self) -> bool {
        self.0 == 0
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Rating::from_json(&value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn standard_set_has_seven_columns_in_order() {
        let set = CategorySet::standard();
        assert_eq!(set.len(), 7);
        assert_eq!(set.at(0), Some(Category::Sauce));
        assert_eq!(set.at(6), Some(Category::BoxDesign));
        assert_eq!(set.at(7), None);
        assert!(!set.contains(Category::DayAfter));
    }

    #[test]
    fn day_after_gets_its_own_column() {
        let set = CategorySet::with_day_after();
        assert_eq!(set.column_of(Category::BoxDesign), Some(6));
        assert_eq!(set.column_of(Category::DayAfter), Some(7));
    }

    #[test]
    fn category_serializes_camel_case() {
        assert_eq!(serde_json::to_string(&Category::BoxDesign).unwrap(), "\"boxDesign\"");
        assert_eq!(serde_json::to_string(&Category::DayAfter).unwrap(), "\"dayAfter\"");
        for c in Category::ALL {
            assert_eq!(serde_json::to_value(c).unwrap(), json!(c.key()));
        }
    }

    #[rstest]
    #[case("sauce", Some(Category::Sauce))]
    #[case("boxDesign", Some(Category::BoxDesign))]
    #[case("box_design", Some(Category::BoxDesign))]
    #[case("DAYAFTER", Some(Category::DayAfter))]
    #[case("pineapple", None)]
    fn from_key_lookup(#[case] key: &str, #[case] expected: Option<Category>) {
        assert_eq!(Category::from_key(key), expected);
    }

    #[rstest]
    #[case(0, true)]
    #[case(5, true)]
    #[case(-1, false)]
    #[case(6, false)]
    fn rating_range(#[case] value: i64, #[case] ok: bool) {
        assert_eq!(Rating::new(value).is_ok(), ok);
    }

    #[rstest]
    #[case(None, 0)]
    #[case(Some(""), 0)]
    #[case(Some("abc"), 0)]
    #[case(Some("NaN"), 0)]
    #[case(Some("9"), 0)]
    #[case(Some(" 4 "), 4)]
    #[case(Some("2"), 2)]
    fn from_attr_is_lenient(#[case] raw: Option<&str>, #[case] expected: u8) {
        assert_eq!(Rating::from_attr(raw).value(), expected);
    }

    #[test]
    fn parse_distinguishes_non_numeric_from_out_of_range() {
        assert_eq!(
            Rating::parse("x"),
            Err(RatingError::NonNumeric { raw: "x".into() })
        );
        assert_eq!(Rating::parse("8"), Err(RatingError::InvalidRating { value: 8 }));
    }

    #[rstest]
    #[case(json!(3), Ok(3))]
    #[case(json!(4.0), Ok(4))]
    #[case(json!("2"), Ok(2))]
    #[case(json!(""), Ok(0))]
    #[case(json!(null), Ok(0))]
    #[case(json!(2.5), Err(()))]
    #[case(json!(11), Err(()))]
    #[case(json!(true), Err(()))]
    fn from_json_accepts_sheet_values(#[case] value: serde_json::Value, #[case] expected: Result<u8, ()>) {
        assert_eq!(Rating::from_json(&value).map(Rating::value).map_err(|_| ()), expected);
    }

    #[test]
    fn rating_serializes_as_bare_number() {
        assert_eq!(serde_json::to_string(&Rating::new(3).unwrap()).unwrap(), "3");
        let back: Rating = serde_json::from_str("5").unwrap();
        assert_eq!(back, Rating::MAX);
        assert!(serde_json::from_str::<Rating>("6").is_err());
    }
}
