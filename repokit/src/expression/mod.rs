//! Serialized predicate expressions
//!
//! An [`Expr`] is a structured boolean predicate over entity fields that
//! survives serialization: [`Expr::to_text`] writes a versioned JSON
//! envelope and [`Expr::from_text`] reads it back. An [`ExpressionFilter`]
//! carries that text together with includes and ordering, and compiles it
//! against the entity schema into the same [`QueryPlan`](crate::filter::QueryPlan)
//! a structured filter produces.
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::expression::{Expr, ExpressionFilter};
//!
//! let expr = Expr::or(vec![
//!     Expr::field("population").gt(50_000_000),
//!     Expr::field("capital").is_null(),
//! ]);
//! let filter = ExpressionFilter::<Country>::new(&expr)?.order_by("name", false);
//! let countries = repository.get_by_expression(&filter).await?;
//! ```

mod ast;
mod compile;
mod filter;

pub use ast::{Expr, FieldRef, EXPRESSION_FORMAT_VERSION};
pub use compile::compile;
pub use filter::ExpressionFilter;
