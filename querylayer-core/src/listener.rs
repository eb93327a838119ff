//! Change notification for query builders.
//!
//! A [`QueryBuilder`](crate::builder::QueryBuilder) owner can register one
//! [`ChangeListener`] to be told, synchronously, after every mutating call on
//! the builder or any of its parts (filter, sort, paginator, relations,
//! children). The usual reaction is to re-trigger a fetch.
//!
//! Listeners run inside the mutating call. A listener that mutates the same
//! builder again (through interior mutability of its own) re-enters the
//! notification and may recurse; guarding against that is the caller's job.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//! use querylayer::prelude::*;
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = hits.clone();
//!
//! let mut qb = QueryBuilder::new();
//! qb.on_change(move |_: ChangeSource| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! qb.filter.by_equality("status", "confirmed", true);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::{fmt, sync::Arc};

/// The part of a query builder that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Filter,
    Sort,
    Paginator,
    /// Fields, relations, children, limits or the deleted flag.
    Query,
}

/// Receives change notifications.
///
/// Implemented for every `Fn(ChangeSource) + Send + Sync` closure.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, source: ChangeSource);
}

impl<F> ChangeListener for F
where
    F: Fn(ChangeSource) + Send + Sync,
{
    fn on_change(&self, source: ChangeSource) {
        self(source)
    }
}

/// A cheap, cloneable handle to an optional listener.
///
/// Every part of a builder keeps a clone so that all of them report to the
/// same owner.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    listener: Option<Arc<dyn ChangeListener>>,
}

impl ChangeNotifier {
    /// Wraps `listener` so it can be shared by every part of a builder.
    pub fn new(listener: impl ChangeListener + 'static) -> Self {
        Self {
            listener: Some(Arc::new(listener)),
        }
    }

    /// A notifier that drops every notification.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Returns true if a listener is present.
    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    /// Forwards `source` to the listener, if any.
    pub fn notify(&self, source: ChangeSource) {
        if let Some(listener) = &self.listener {
            listener.on_change(source);
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("attached", &self.is_attached())
            .finish()
    }
}
