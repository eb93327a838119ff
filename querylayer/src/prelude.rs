//! Convenient re-exports of commonly used types from querylayer.
//!
//! ```ignore
//! use querylayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - The query builder and its parts
//! - Conditions, the condition visitor and generator inputs
//! - Change listeners and configuration
//! - Error types

pub use querylayer_core::{
    builder::{QueryBuilder, SerializedQuery},
    condition::{Condition, ConditionVisitor, Dialect, Operation, Operator, Predicate},
    config::{QueryConfig, QueryConfigBuilder, TextMatch},
    error::{QueryError, QueryResult},
    filter::{FilterOperator, FilterSet, SerializedFilter},
    generator::{DateBound, DateRangeValue, RangeValue},
    listener::{ChangeListener, ChangeNotifier, ChangeSource},
    paginator::{PageEvent, Paginator, SerializedPaginator},
    relation::{RelationBuilder, SerializedRelation},
    sort::{SortCriteria, SortDirection},
};
