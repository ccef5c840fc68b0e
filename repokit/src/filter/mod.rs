//! Structured filters and the query plans both filter kinds compile to
//!
//! # Features
//!
//! - **Descriptors**: [`FilterProperty`] carries one comparison as plain data
//! - **Structured filter**: [`QueryFilter`] ANDs descriptors and caller predicates
//! - **Plans**: [`QueryPlan`] is the validated form every filter compiles to
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::filter::{FilterOptions, FilterProperty, QueryFilter};
//!
//! let filter = QueryFilter::<Country>::new()
//!     .with_property(FilterProperty::ge("population", 1_000_000))
//!     .with_property(FilterProperty::starts_with("name", "F"))
//!     .include("cities")
//!     .order_by("name", false);
//!
//! let big_f_countries = filter.filter_list(&countries, &FilterOptions::default())?;
//! ```

mod descriptor;
mod error;
mod operator;
mod order;
mod plan;
mod predicate;
mod query_filter;

pub use descriptor::FilterProperty;
pub use error::FilterError;
pub use operator::{FilterOperator, TextCase};
pub use order::OrderDirection;
pub use plan::{QueryPlan, SortKey};
pub use predicate::{Comparison, CustomPredicate, Predicate};
pub use query_filter::QueryFilter;

pub(crate) use plan::{resolve_includes, resolve_order};

use serde::{Deserialize, Serialize};

/// Default maximum nesting depth of a serialized expression
pub const DEFAULT_MAX_EXPRESSION_DEPTH: usize = 32;

/// Whether a descriptor's `caseSensitive` flag affects text comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSensitivity {
    /// The flag is carried but ignored; text always compares ordinally
    #[default]
    Ignore,
    /// A descriptor with `caseSensitive: false` compares text ignoring case
    Honor,
}

/// Options applied when compiling filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub case_sensitivity: CaseSensitivity,

    /// Serialized expressions nesting deeper than this are rejected
    #[serde(default = "default_max_expression_depth")]
    pub max_expression_depth: usize,
}

fn default_max_expression_depth() -> usize {
    DEFAULT_MAX_EXPRESSION_DEPTH
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            case_sensitivity: CaseSensitivity::default(),
            max_expression_depth: DEFAULT_MAX_EXPRESSION_DEPTH,
        }
    }
}

impl FilterOptions {
    /// Text comparison mode for a descriptor with the given flag
    pub fn text_case(&self, case_sensitive: bool) -> TextCase {
        match (self.case_sensitivity, case_sensitive) {
            (CaseSensitivity::Honor, false) => TextCase::Insensitive,
            _ => TextCase::Sensitive,
        }
    }
}
