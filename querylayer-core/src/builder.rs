//! The top-level request query.
//!
//! A [`QueryBuilder`] aggregates everything one backend request needs: a
//! [`FilterSet`], [`SortCriteria`], a [`Paginator`], the selected fields, the
//! included relations, auxiliary "child" queries and a couple of coarse
//! switches. It is created per request, mutated through its parts and
//! compiled with [`QueryBuilder::build_query`]. Compiling does not consume or
//! freeze the builder.
//!
//! # Example
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
//! assert_eq!(
//!     qb.build_query(),
//!     serde_json::json!({
//!         "where": {"and": [{"status": "confirmed"}, {"age": {"gte": 18}}]},
//!         "order": ["name asc"],
//!         "limit": 20,
//!         "skip": 40
//!     }),
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    config::QueryConfig,
    error::QueryResult,
    filter::{FilterSet, SerializedFilter},
    listener::{ChangeListener, ChangeNotifier, ChangeSource},
    paginator::{Paginator, SerializedPaginator},
    path,
    relation::{RelationBuilder, SerializedRelation},
    sort::SortCriteria,
};

/// Persisted form of a child query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedChild {
    pub key: String,
    pub query: SerializedQuery,
}

/// Persisted form of a whole [`QueryBuilder`], as stored by saved filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializedQuery {
    pub filter: SerializedFilter,
    pub sort: Map<String, Value>,
    pub paginator: SerializedPaginator,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<SerializedRelation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SerializedChild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl SerializedQuery {
    /// Parses a serialized query from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError::Serialization`](crate::error::QueryError::Serialization)
    /// if the text is not a valid serialized query.
    pub fn from_json(text: &str) -> QueryResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Builds one backend request query.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub filter: FilterSet,
    pub sort: SortCriteria,
    pub paginator: Paginator,
    relations: Vec<RelationBuilder>,
    children: Vec<(String, QueryBuilder)>,
    fields: Vec<String>,
    result_limit: Option<u64>,
    deleted: Option<bool>,
    config: QueryConfig,
    notifier: ChangeNotifier,
}

impl QueryBuilder {
    /// Creates an empty query with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder. Relations and children created from it
    /// inherit `config`.
    pub fn with_config(config: QueryConfig) -> Self {
        let mut paginator = Paginator::new();
        paginator.set_retrieve_one_more(config.retrieve_one_more);

        Self {
            filter: FilterSet::with_config(config),
            paginator,
            config,
            ..Self::default()
        }
    }

    /// Configuration shared by every part of this query.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Applies `config` to this builder and everything it contains.
    pub fn set_config(&mut self, config: QueryConfig) -> &mut Self {
        self.apply_config(config);
        self.changed()
    }

    pub(crate) fn apply_config(&mut self, config: QueryConfig) {
        self.config = config;
        self.filter.set_config(config);
        self.paginator.set_retrieve_one_more(config.retrieve_one_more);
        for relation in &mut self.relations {
            relation.apply_config(config);
        }
        for (_, child) in &mut self.children {
            child.apply_config(config);
        }
    }

    /// Registers the listener told about every later change to this builder,
    /// its parts, its relations and its children. Replaces any previous one.
    ///
    /// The listener runs synchronously inside the mutating call. Mutating the
    /// same builder again from the listener re-enters it.
    pub fn on_change(&mut self, listener: impl ChangeListener + 'static) -> &mut Self {
        self.attach(ChangeNotifier::new(listener));
        self
    }

    pub(crate) fn attach(&mut self, notifier: ChangeNotifier) {
        self.filter.set_notifier(notifier.clone());
        self.sort.set_notifier(notifier.clone());
        self.paginator.set_notifier(notifier.clone());
        for relation in &mut self.relations {
            relation.attach(notifier.clone());
        }
        for (_, child) in &mut self.children {
            child.attach(notifier.clone());
        }
        self.notifier = notifier;
    }

    pub(crate) fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn changed(&mut self) -> &mut Self {
        self.notifier.notify(ChangeSource::Query);
        self
    }

    /// Adds fields to the selection. Duplicates are ignored.
    pub fn fields<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.fields.contains(&name) {
                self.fields.push(name);
            }
        }
        self.changed()
    }

    /// Fields listed in the compiled `fields` entry.
    pub fn selected_fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the relation called `name`, creating it if needed.
    ///
    /// With `needs_data`, the relation is asked to return its data as well.
    /// That request is sticky: later calls without `needs_data` keep it.
    pub fn include(&mut self, name: &str, needs_data: bool) -> &mut RelationBuilder {
        let index = match self.relations.iter().position(|relation| relation.name() == name) {
            Some(index) => index,
            None => {
                self.relations.push(RelationBuilder::with_context(
                    name,
                    self.config,
                    self.notifier.clone(),
                ));
                self.relations.len() - 1
            }
        };
        self.notifier.notify(ChangeSource::Query);

        let relation = &mut self.relations[index];
        if needs_data {
            relation.request_data();
        }
        relation
    }

    /// Looks up an included relation by name.
    pub fn relation(&self, name: &str) -> Option<&RelationBuilder> {
        self.relations.iter().find(|relation| relation.name() == name)
    }

    /// Mutable lookup of an included relation.
    pub fn relation_mut(&mut self, name: &str) -> Option<&mut RelationBuilder> {
        self.relations
            .iter_mut()
            .find(|relation| relation.name() == name)
    }

    pub fn relations(&self) -> &[RelationBuilder] {
        &self.relations
    }

    /// Drops the relation called `name`.
    pub fn remove_relation(&mut self, name: &str) -> &mut Self {
        self.relations.retain(|relation| relation.name() != name);
        self.changed()
    }

    /// Sets the top-level result cap. The paginator's limit takes precedence
    /// when both are set.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.result_limit = Some(limit);
        self.changed()
    }

    /// Cap on the total result count, if any.
    pub fn result_limit(&self) -> Option<u64> {
        self.result_limit
    }

    /// Asks the backend to return soft-deleted records too.
    pub fn include_deleted(&mut self) -> &mut Self {
        self.deleted = Some(true);
        self.changed()
    }

    /// Asks the backend to leave soft-deleted records out.
    pub fn exclude_deleted(&mut self) -> &mut Self {
        self.deleted = Some(false);
        self.changed()
    }

    /// Returns true after [`QueryBuilder::include_deleted`].
    pub fn includes_deleted(&self) -> bool {
        self.deleted == Some(true)
    }

    /// Returns the child query stored under `key`, creating it if needed.
    ///
    /// With `replace`, an existing child is discarded for a fresh one.
    /// Children compile to `where.<key>`; a dotted key nests further.
    pub fn add_child_query_builder(&mut self, key: &str, replace: bool) -> &mut QueryBuilder {
        let position = self.children.iter().position(|(stored, _)| stored == key);
        let index = match position {
            Some(index) if !replace => index,
            found => {
                let mut child = QueryBuilder::with_config(self.config);
                child.attach(self.notifier.clone());
                match found {
                    Some(index) => {
                        self.children[index].1 = child;
                        index
                    }
                    None => {
                        self.children.push((key.to_string(), child));
                        self.children.len() - 1
                    }
                }
            }
        };
        self.notifier.notify(ChangeSource::Query);
        &mut self.children[index].1
    }

    /// Drops the child query stored under `key`.
    pub fn remove_child_query_builder(&mut self, key: &str) -> &mut Self {
        self.children.retain(|(stored, _)| stored != key);
        self.changed()
    }

    /// Child query stored under `key`.
    pub fn child(&self, key: &str) -> Option<&QueryBuilder> {
        self.children
            .iter()
            .find(|(stored, _)| stored == key)
            .map(|(_, child)| child)
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut QueryBuilder> {
        self.children
            .iter_mut()
            .find(|(stored, _)| stored == key)
            .map(|(_, child)| child)
    }

    /// Returns true if no child query has anything to compile.
    pub fn all_child_query_builders_are_empty(&self) -> bool {
        self.children.iter().all(|(_, child)| child.is_empty())
    }

    /// Returns true if this query or any relation below it has a filter
    /// condition that constrains something.
    pub fn do_any_of_the_filters_have_conditions(&self) -> bool {
        self.filter.has_conditions()
            || self
                .relations
                .iter()
                .any(|relation| relation.query.do_any_of_the_filters_have_conditions())
    }

    /// Returns true if compiling this query would not constrain, shape or page
    /// the result in any way.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
            && self.filter.is_empty()
            && self.sort.is_empty()
            && self.result_limit.is_none()
            && self.paginator.is_empty()
            && self.fields.is_empty()
            && self.all_child_query_builders_are_empty()
    }

    /// Resets the filter, relations, sort, children and deleted switch.
    ///
    /// Selected fields and pagination are kept.
    pub fn clear(&mut self) -> &mut Self {
        self.filter.clear();
        self.sort.clear();
        self.relations.clear();
        self.children.clear();
        self.deleted = None;
        self.changed()
    }

    pub(crate) fn compile(&self) -> Map<String, Value> {
        let mut query = Map::new();

        let mut condition = match self.filter.generate_condition(false) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, child) in &self.children {
            if child.is_empty() {
                continue;
            }
            if let Value::Object(child_condition) = child.filter.generate_condition(false) {
                if !child_condition.is_empty() {
                    path::set_path(&mut condition, key, Value::Object(child_condition));
                }
            }
        }
        if !condition.is_empty() {
            query.insert("where".to_string(), Value::Object(condition));
        }

        if !self.relations.is_empty() {
            query.insert(
                "include".to_string(),
                Value::Array(self.relations.iter().map(RelationBuilder::build_scope).collect()),
            );
        }

        if !self.fields.is_empty() {
            query.insert(
                "fields".to_string(),
                Value::Array(self.fields.iter().cloned().map(Value::String).collect()),
            );
        }

        let order = self.sort.generate_criteria();
        if !order.is_empty() {
            query.insert(
                "order".to_string(),
                Value::Array(order.into_iter().map(Value::String).collect()),
            );
        }

        if let Some(limit) = self.paginator.compiled_limit().or(self.result_limit) {
            query.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(skip) = self.paginator.skip() {
            query.insert("skip".to_string(), Value::from(skip));
        }

        if self.includes_deleted() {
            query.insert("deleted".to_string(), Value::Bool(true));
        }

        query
    }

    /// Compiles the query into the backend filter object.
    pub fn build_query(&self) -> Value {
        let query = Value::Object(self.compile());
        tracing::debug!(query = %query, "Compiled request query");
        query
    }

    /// JSON text of [`QueryBuilder::build_query`].
    pub fn build_query_string(&self) -> QueryResult<String> {
        Ok(serde_json::to_string(&self.build_query())?)
    }

    /// Applies `other` on top of this query.
    ///
    /// Relations are merged by name and fields are unioned. Filters and sort
    /// criteria are merged with [`FilterSet::merge`] and [`SortCriteria::merge`].
    /// The result limit, pagination, deleted switch and children of `other`
    /// overwrite this query's only where `other` sets them.
    pub fn merge(&mut self, other: &QueryBuilder) -> &mut Self {
        tracing::debug!(
            relations = other.relations.len(),
            children = other.children.len(),
            "Merging request query"
        );

        for relation in &other.relations {
            match self.relation_mut(relation.name()) {
                Some(existing) => {
                    existing.merge(relation);
                }
                None => {
                    let mut adopted = relation.clone();
                    adopted.apply_config(self.config);
                    adopted.attach(self.notifier.clone());
                    self.relations.push(adopted);
                }
            }
        }

        for field in &other.fields {
            if !self.fields.contains(field) {
                self.fields.push(field.clone());
            }
        }

        self.filter.merge(&other.filter);
        if !other.sort.is_empty() {
            self.sort.merge(&other.sort);
        }

        if other.result_limit.is_some() {
            self.result_limit = other.result_limit;
        }
        if !other.paginator.is_empty() {
            self.paginator.deserialize(other.paginator.serialize());
        }
        if other.deleted.is_some() {
            self.deleted = other.deleted;
        }

        for (key, child) in &other.children {
            let mut adopted = child.clone();
            adopted.apply_config(self.config);
            adopted.attach(self.notifier.clone());
            match self.children.iter_mut().find(|(stored, _)| stored == key) {
                Some((_, existing)) => *existing = adopted,
                None => self.children.push((key.clone(), adopted)),
            }
        }

        self.changed()
    }

    /// Captures every part of the query, relations and children included.
    pub fn serialize(&self) -> SerializedQuery {
        SerializedQuery {
            filter: self.filter.serialize(),
            sort: self.sort.serialize(),
            paginator: self.paginator.serialize(),
            fields: self.fields.clone(),
            relations: self.relations.iter().map(RelationBuilder::serialize).collect(),
            children: self
                .children
                .iter()
                .map(|(key, child)| SerializedChild {
                    key: key.clone(),
                    query: child.serialize(),
                })
                .collect(),
            limit: self.result_limit,
            deleted: self.deleted,
        }
    }

    pub(crate) fn restore(&mut self, serialized: SerializedQuery) -> QueryResult<()> {
        let relations = serialized
            .relations
            .into_iter()
            .map(|relation| {
                RelationBuilder::from_serialized(relation, self.config, self.notifier.clone())
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let children = serialized
            .children
            .into_iter()
            .map(|child| {
                let mut query = QueryBuilder::with_config(self.config);
                query.attach(self.notifier.clone());
                query.restore(child.query).map(|()| (child.key, query))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        self.sort.deserialize(&serialized.sort)?;
        self.filter.deserialize(serialized.filter);
        self.paginator.deserialize(serialized.paginator);
        self.relations = relations;
        self.children = children;
        self.fields = serialized.fields;
        self.result_limit = serialized.limit;
        self.deleted = serialized.deleted;
        Ok(())
    }

    /// Replaces the whole state with one captured by [`QueryBuilder::serialize`].
    ///
    /// Configuration and listener are kept and handed down to the restored
    /// relations and children.
    ///
    /// # Errors
    ///
    /// Returns an error if a sort direction is invalid; the builder is left
    /// untouched in that case.
    pub fn deserialize(&mut self, serialized: SerializedQuery) -> QueryResult<&mut Self> {
        self.restore(serialized)?;
        Ok(self.changed())
    }

    /// Restores state from serialized JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid serialized query.
    pub fn deserialize_json(&mut self, text: &str) -> QueryResult<&mut Self> {
        let serialized = SerializedQuery::from_json(text)?;
        self.deserialize(serialized)
    }
}
