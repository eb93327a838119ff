//! Configuration shared by a query builder and everything it creates.
//!
//! [`QueryConfig`] decides how the high-level filter helpers spell their
//! conditions for a given backend endpoint: whether text searches use
//! `regexp` or `like` patterns, which operator vocabulary existence checks use,
//! and whether paginated requests ask for one extra row.
//!
//! # Example
//!
//! ```ignore
//! use querylayer::config::{QueryConfig, TextMatch};
//! use querylayer::condition::Dialect;
//!
//! let config = QueryConfig::builder()
//!     .with_text_match(TextMatch::Like)
//!     .with_dialect(Dialect::Mongo)
//!     .build();
//!
//! let from_json = QueryConfig::from_json(r#"{"textMatch": "like", "dialect": "mongo"}"#)?;
//! assert_eq!(config, from_json);
//! ```

use serde::{Deserialize, Serialize};

use crate::{condition::Dialect, error::QueryResult};

/// How text filters are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMatch {
    /// `{"regexp": "/^value/i"}`
    #[default]
    Regexp,
    /// `{"like": "^value", "options": "i"}`
    Like,
}

impl TextMatch {
    /// Whether text helpers emit `like` instead of `regexp`.
    pub fn use_like(self) -> bool {
        self == TextMatch::Like
    }
}

/// Settings for a query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryConfig {
    /// Pattern style of text filters.
    pub text_match: TextMatch,
    /// Operator vocabulary of existence checks.
    pub dialect: Dialect,
    /// Ask for one row more than the page size, as an end-of-data sentinel.
    pub retrieve_one_more: bool,
}

impl QueryConfig {
    /// Default configuration: `regexp` text, LoopBack keywords, no sentinel row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a [`QueryConfigBuilder`].
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::new()
    }

    /// Loads a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError::Serialization`](crate::error::QueryError::Serialization)
    /// if the text is not valid JSON or has the wrong shape.
    pub fn from_json(text: &str) -> QueryResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Builder for [`QueryConfig`].
pub struct QueryConfigBuilder {
    text_match: Option<TextMatch>,
    dialect: Option<Dialect>,
    retrieve_one_more: Option<bool>,
}

impl QueryConfigBuilder {
    pub fn new() -> Self {
        Self {
            text_match: None,
            dialect: None,
            retrieve_one_more: None,
        }
    }

    /// Sets the text match style.
    pub fn with_text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = Some(text_match);
        self
    }

    /// Sets the operator keyword set.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Requests one extra row per page as an end-of-data sentinel.
    pub fn with_retrieve_one_more(mut self, retrieve_one_more: bool) -> Self {
        self.retrieve_one_more = Some(retrieve_one_more);
        self
    }

    /// Builds the configuration, using defaults for unset values.
    pub fn build(self) -> QueryConfig {
        QueryConfig {
            text_match: self.text_match.unwrap_or_default(),
            dialect: self.dialect.unwrap_or_default(),
            retrieve_one_more: self.retrieve_one_more.unwrap_or(false),
        }
    }
}

impl Default for QueryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
