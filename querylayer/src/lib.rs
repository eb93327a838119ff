//! Main querylayer crate for building backend request queries.
//!
//! This crate is the primary entry point for users of querylayer. It re-exports
//! the core types from `querylayer-core` and the JSON and date crates that
//! appear in its public API.
//!
//! # Features
//!
//! - **Typed conditions** - Conditions are a tagged union that compiles to the exact backend JSON
//! - **Filter algebra** - Add, replace and retract conditions from UI filter inputs
//! - **Composable queries** - Sorting, pagination, relations and child queries in one builder
//! - **Saved filters** - Filters, paginators and whole queries round-trip through JSON
//!
//! # Quick Start
//!
//! ```ignore
//! use querylayer::prelude::*;
//!
//! let mut qb = QueryBuilder::new();
//! qb.filter
//!     .by_equality("status", "confirmed", true)
//!     .by_range("age", &RangeValue::at_least(18), true);
//! qb.sort.by("name", SortDirection::Asc);
//! qb.paginator.set_page(PageEvent::new(20, 2), false);
//!
//! // {"where":{"and":[{"status":"confirmed"},{"age":{"gte":18}}]},"order":["name asc"],"limit":20,"skip":40}
//! let query = qb.build_query_string()?;
//! ```
//!
//! # Change Notification
//!
//! A list page usually refetches whenever its query changes. Register one
//! listener on the builder and every part of it reports into it:
//!
//! ```ignore
//! use querylayer::prelude::*;
//!
//! let mut qb = QueryBuilder::new();
//! qb.on_change(|source: ChangeSource| {
//!     println!("{source:?} changed, refetching");
//! });
//!
//! qb.filter.by_text("lastName", "smi", true);
//! qb.paginator.set_page(PageEvent::new(20, 0), false);
//! ```
//!
//! # Saved Filters
//!
//! ```ignore
//! use querylayer::prelude::*;
//!
//! let saved = serde_json::to_string(&qb.serialize())?;
//!
//! let mut restored = QueryBuilder::new();
//! restored.deserialize_json(&saved)?;
//! assert_eq!(restored.build_query(), qb.build_query());
//! ```

pub mod prelude;

pub use querylayer_core::{
    builder, condition, config, error, filter, generator, listener, paginator, path, relation,
    sort,
};

// Re-export the crates used in the public API
pub use chrono;
pub use serde_json;
