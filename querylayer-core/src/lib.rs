//! A client-side request query builder for LoopBack-style REST backends.
//!
//! This crate is the core of the querylayer project and provides:
//!
//! - **Conditions** ([`condition`]) - Typed conditions that compile to the backend's JSON grammar
//! - **Condition generator** ([`generator`]) - Pure helpers for text, range, date and existence conditions
//! - **Filters** ([`filter`]) - The filter algebra: add, replace, remove and compile conditions
//! - **Sorting** ([`sort`]) - Ordered sort criteria
//! - **Pagination** ([`paginator`]) - Page events to `limit` / `skip`
//! - **Relations** ([`relation`]) - Included relations with their own nested queries
//! - **Query builder** ([`builder`]) - The top-level request query and its compile step
//! - **Change notification** ([`listener`]) - Hooks told about every mutation
//! - **Configuration** ([`config`]) - Text match style, operator dialect, sentinel rows
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use querylayer::prelude::*;
//!
//! let mut qb = QueryBuilder::new();
//! qb.filter.by_text("lastName", "smi", true);
//! qb.include("contacts", false)
//!     .query
//!     .filter
//!     .by_equality("status", "confirmed", true);
//!
//! let query = qb.build_query_string()?;
//! ```

pub mod builder;
pub mod condition;
pub mod config;
pub mod error;
pub mod filter;
pub mod generator;
pub mod listener;
pub mod paginator;
pub mod path;
pub mod relation;
pub mod sort;
