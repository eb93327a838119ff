//! Relations included in a query.
//!
//! A [`RelationBuilder`] pairs a relation name with a nested [`QueryBuilder`]
//! and compiles into one entry of the backend's `include` list:
//!
//! ```json
//! {"relation": "contacts", "scope": {"where": {...}, "filterParent": true, "justFilter": true}}
//! ```
//!
//! `filterParent` asks the backend to drop parent rows with no matching
//! related rows; `justFilter` asks it to use the relation for filtering only,
//! without returning the related data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    builder::{QueryBuilder, SerializedQuery},
    config::QueryConfig,
    error::QueryResult,
    listener::{ChangeNotifier, ChangeSource},
};

/// Persisted form of a [`RelationBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRelation {
    pub name: String,
    #[serde(default = "default_flag")]
    pub filter_parent: bool,
    #[serde(default = "default_flag")]
    pub just_filter: bool,
    #[serde(default)]
    pub query: SerializedQuery,
}

fn default_flag() -> bool {
    true
}

/// A named relation with its own nested query.
#[derive(Debug, Clone)]
pub struct RelationBuilder {
    name: String,
    /// Conditions, sorting and paging applied to the related rows.
    pub query: QueryBuilder,
    filter_parent: bool,
    just_filter: bool,
}

impl RelationBuilder {
    /// Creates a relation with an empty query, filtering parents and returning no data.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: QueryBuilder::new(),
            filter_parent: true,
            just_filter: true,
        }
    }

    pub(crate) fn with_context(
        name: impl Into<String>,
        config: QueryConfig,
        notifier: ChangeNotifier,
    ) -> Self {
        let mut relation = Self {
            name: name.into(),
            query: QueryBuilder::with_config(config),
            filter_parent: true,
            just_filter: true,
        };
        relation.attach(notifier);
        relation
    }

    pub(crate) fn apply_config(&mut self, config: QueryConfig) {
        self.query.apply_config(config);
    }

    pub(crate) fn attach(&mut self, notifier: ChangeNotifier) {
        self.query.attach(notifier);
    }

    fn changed(&mut self) -> &mut Self {
        self.query.notifier().notify(ChangeSource::Query);
        self
    }

    /// Relation name, as sent in the `include` entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored `filterParent` flag.
    pub fn filter_parent(&self) -> bool {
        self.filter_parent
    }

    pub fn just_filter(&self) -> bool {
        self.just_filter
    }

    /// Sets whether parent rows without matching related rows are dropped.
    pub fn set_filter_parent(&mut self, filter_parent: bool) -> &mut Self {
        self.filter_parent = filter_parent;
        self.changed()
    }

    /// Sets whether the relation only filters, without returning its rows.
    pub fn set_just_filter(&mut self, just_filter: bool) -> &mut Self {
        self.just_filter = just_filter;
        self.changed()
    }

    pub(crate) fn request_data(&mut self) {
        self.just_filter = false;
    }

    /// Compiles the `include` entry of this relation.
    ///
    /// `filterParent` is reported as `false` whenever the nested query has no
    /// conditions anywhere in its tree, whatever the stored flag says.
    pub fn build_scope(&self) -> Value {
        let mut scope = self.query.compile();
        let filter_parent =
            self.filter_parent && self.query.do_any_of_the_filters_have_conditions();
        scope.insert("filterParent".to_string(), Value::Bool(filter_parent));
        scope.insert("justFilter".to_string(), Value::Bool(self.just_filter));

        let mut entry = Map::new();
        entry.insert("relation".to_string(), Value::String(self.name.clone()));
        entry.insert("scope".to_string(), Value::Object(scope));
        Value::Object(entry)
    }

    /// Combines `other` into this relation.
    ///
    /// Data requests are sticky (`just_filter` only ever turns off) and so is
    /// parent filtering (`filter_parent` only ever turns on). The nested
    /// queries are merged with [`QueryBuilder::merge`].
    pub fn merge(&mut self, other: &RelationBuilder) -> &mut Self {
        self.just_filter = self.just_filter && other.just_filter;
        self.filter_parent = self.filter_parent || other.filter_parent;
        self.query.merge(&other.query);
        self.changed()
    }

    /// Captures name, flags and nested query.
    pub fn serialize(&self) -> SerializedRelation {
        SerializedRelation {
            name: self.name.clone(),
            filter_parent: self.filter_parent,
            just_filter: self.just_filter,
            query: self.query.serialize(),
        }
    }

    pub(crate) fn from_serialized(
        serialized: SerializedRelation,
        config: QueryConfig,
        notifier: ChangeNotifier,
    ) -> QueryResult<Self> {
        let mut relation = Self::with_context(serialized.name, config, notifier);
        relation.filter_parent = serialized.filter_parent;
        relation.just_filter = serialized.just_filter;
        relation.query.restore(serialized.query)?;
        Ok(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortDirection;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let relation = RelationBuilder::new("contacts");
        assert_eq!(relation.name(), "contacts");
        assert!(relation.filter_parent());
        assert!(relation.just_filter());
    }

    #[test]
    fn test_build_scope_with_conditions() {
        let mut relation = RelationBuilder::new("contacts");
        relation.query.filter.by_equality("active", true, true);
        relation.query.sort.by("name", SortDirection::Asc);

        assert_eq!(
            relation.build_scope(),
            json!({
                "relation": "contacts",
                "scope": {
                    "where": {"and": [{"active": true}]},
                    "order": ["name asc"],
                    "filterParent": true,
                    "justFilter": true
                }
            })
        );
    }

    #[test]
    fn test_filter_parent_suppressed_without_conditions() {
        let mut relation = RelationBuilder::new("contacts");
        relation.query.include("addresses", true);

        assert!(relation.filter_parent());
        assert_eq!(
            relation.build_scope()["scope"]["filterParent"],
            json!(false)
        );
    }

    #[test]
    fn test_filter_parent_kept_for_deep_conditions() {
        let mut relation = RelationBuilder::new("contacts");
        relation
            .query
            .include("addresses", false)
            .query
            .filter
            .by_equality("city", "Lyon", true);

        assert_eq!(relation.build_scope()["scope"]["filterParent"], json!(true));
    }

    #[test]
    fn test_flags_only_filter_does_not_count_as_conditions() {
        let mut relation = RelationBuilder::new("contacts");
        relation.query.filter.flag("countRelations", true);

        assert_eq!(relation.build_scope()["scope"]["filterParent"], json!(false));
    }

    #[test]
    fn test_merge_flags_are_sticky() {
        let mut relation = RelationBuilder::new("contacts");
        relation.set_filter_parent(false);

        let mut other = RelationBuilder::new("contacts");
        other.set_just_filter(false);

        relation.merge(&other);
        assert!(!relation.just_filter());
        assert!(relation.filter_parent());

        relation.merge(&RelationBuilder::new("contacts"));
        assert!(!relation.just_filter());
    }

    #[test]
    fn test_merge_nested_queries() {
        let mut relation = RelationBuilder::new("contacts");
        relation.query.filter.by_equality("a", 1, true);

        let mut other = RelationBuilder::new("contacts");
        other.query.filter.by_equality("b", 2, true);

        relation.merge(&other);
        assert_eq!(
            relation.build_scope()["scope"]["where"],
            json!({"and": [{"a": 1}, {"and": [{"b": 2}]}]})
        );
    }
}
