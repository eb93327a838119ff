//! Pagination state of a query.
//!
//! A [`Paginator`] translates page events coming from a list view
//! (`page_size`, zero-based `page_index`) into the backend's `limit` / `skip`
//! pair.
//!
//! # Example
//!
//! ```ignore
//! use querylayer::paginator::{PageEvent, Paginator};
//!
//! let mut paginator = Paginator::new();
//! paginator.set_page(PageEvent::new(20, 2), false);
//!
//! assert_eq!(paginator.limit(), Some(20));
//! assert_eq!(paginator.skip(), Some(40));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{QueryError, QueryResult},
    listener::{ChangeNotifier, ChangeSource},
};

/// A page selection, as emitted by a list view.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageEvent {
    /// Number of items per page.
    pub page_size: u64,
    /// The page number (0-indexed).
    pub page_index: u64,
}

impl PageEvent {
    /// A page of `page_size` rows at zero-based `page_index`.
    pub fn new(page_size: u64, page_index: u64) -> Self {
        Self {
            page_size,
            page_index,
        }
    }

    /// Number of items to skip to reach this page.
    pub fn offset(&self) -> u64 {
        self.page_size.saturating_mul(self.page_index)
    }
}

/// Persisted form of a [`Paginator`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerializedPaginator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

impl SerializedPaginator {
    /// Parses a serialized paginator from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError::Serialization`] if the text is not valid JSON
    /// or does not describe a paginator.
    pub fn from_json(text: &str) -> QueryResult<Self> {
        Self::try_from(serde_json::from_str::<Value>(text)?)
    }
}

impl TryFrom<Value> for SerializedPaginator {
    type Error = QueryError;

    fn try_from(value: Value) -> QueryResult<Self> {
        if !value.is_object() {
            return Err(QueryError::InvalidSerializedState(format!(
                "expected a serialized paginator object, found {value}"
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Limit and skip of a paginated query.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    limit: Option<u64>,
    skip: Option<u64>,
    retrieve_one_more: bool,
    notifier: ChangeNotifier,
}

impl Paginator {
    /// Creates a paginator with no limit and no skip.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_notifier(&mut self, notifier: ChangeNotifier) {
        self.notifier = notifier;
    }

    pub(crate) fn set_retrieve_one_more(&mut self, retrieve_one_more: bool) {
        self.retrieve_one_more = retrieve_one_more;
    }

    fn changed(&mut self) -> &mut Self {
        self.notifier.notify(ChangeSource::Paginator);
        self
    }

    /// Moves to the page described by `event`. With `silent`, the change
    /// listener is not told.
    pub fn set_page(&mut self, event: PageEvent, silent: bool) -> &mut Self {
        self.limit = Some(event.page_size);
        self.skip = Some(event.offset());

        if silent {
            return self;
        }
        self.changed()
    }

    /// Goes back to the first page, keeping the page size.
    pub fn reset(&mut self) -> &mut Self {
        self.skip = Some(0);
        self.changed()
    }

    /// Unsets both limit and skip.
    pub fn clear(&mut self) -> &mut Self {
        self.limit = None;
        self.skip = None;
        self.changed()
    }

    /// Returns true if neither limit nor skip is set.
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.skip.is_none()
    }

    /// Page size, without the sentinel row.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    /// Whether the compiled limit asks for one extra row.
    pub fn retrieves_one_more(&self) -> bool {
        self.retrieve_one_more
    }

    /// The limit sent to the backend: one more than the page size when an
    /// end-of-data sentinel row is requested.
    pub fn compiled_limit(&self) -> Option<u64> {
        match self.retrieve_one_more {
            true => self.limit.map(|limit| limit.saturating_add(1)),
            false => self.limit,
        }
    }

    /// Captures limit and skip.
    pub fn serialize(&self) -> SerializedPaginator {
        SerializedPaginator {
            limit: self.limit,
            skip: self.skip,
        }
    }

    /// Restores limit and skip from a saved state.
    pub fn deserialize(&mut self, serialized: SerializedPaginator) -> &mut Self {
        self.limit = serialized.limit;
        self.skip = serialized.skip;
        self.changed()
    }

    /// Restores state from serialized JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid serialized paginator.
    pub fn deserialize_json(&mut self, text: &str) -> QueryResult<&mut Self> {
        let serialized = SerializedPaginator::from_json(text)?;
        Ok(self.deserialize(serialized))
    }

    /// Restores state from an already parsed serialized paginator.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid serialized paginator.
    pub fn deserialize_value(&mut self, value: Value) -> QueryResult<&mut Self> {
        let serialized = SerializedPaginator::try_from(value)?;
        Ok(self.deserialize(serialized))
    }
}
