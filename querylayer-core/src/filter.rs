//! The filter algebra of a query.
//!
//! A [`FilterSet`] holds an ordered list of [`Condition`]s, the operator that
//! joins them (`and` / `or`), out-of-band flags, and an optional "include
//! deleted records" switch. UI code drives it through the `by_*` helpers, each
//! of which turns a filter input into a condition keyed by field name:
//!
//! - a non-empty input adds (or, with `replace`, replaces) the condition on that field;
//! - an empty input removes any condition on that field. Clearing an input must
//!   retract its condition, never leave a vacuous one behind.
//!
//! The filter compiles to a single backend condition with
//! [`FilterSet::generate_condition`], and round-trips through
//! [`FilterSet::serialize`] / [`FilterSet::deserialize`] for saved filters.
//!
//! # Example
//!
//! ```ignore
//! use querylayer::filter::FilterSet;
//! use querylayer::generator::RangeValue;
//!
//! let mut filter = FilterSet::new();
//! filter
//!     .by_equality("status", "confirmed", true)
//!     .by_range("age", &RangeValue::at_least(18), true);
//!
//! assert_eq!(
//!     filter.generate_condition(false),
//!     serde_json::json!({"and": [{"status": "confirmed"}, {"age": {"gte": 18}}]}),
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    condition::{Condition, Dialect, Operation, Operator},
    config::QueryConfig,
    error::{QueryError, QueryResult},
    generator::{self, DateRangeValue, RangeValue},
    listener::{ChangeNotifier, ChangeSource},
    path,
};

/// Condition stored by [`FilterSet::by_phone_number`] when the input has no
/// digits. It never matches a real phone number.
pub const INVALID_PHONE: &str = "INVALID PHONE";

const INCLUDE_DELETED_RECORDS: &str = "includeDeletedRecords";

/// How top-level conditions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    #[default]
    And,
    Or,
}

impl FilterOperator {
    /// `and` or `or`.
    pub fn keyword(self) -> &'static str {
        match self {
            FilterOperator::And => "and",
            FilterOperator::Or => "or",
        }
    }
}

/// Persisted form of a [`FilterSet`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedFilter {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub flags: Map<String, Value>,
    #[serde(default)]
    pub generate_conditions_on_first_level: bool,
    #[serde(rename = "_deleted", default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl SerializedFilter {
    /// Parses a serialized filter from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError::Serialization`] if the text is not valid JSON,
    /// or a conversion error if it does not describe a filter.
    pub fn from_json(text: &str) -> QueryResult<Self> {
        Self::try_from(serde_json::from_str::<Value>(text)?)
    }
}

impl TryFrom<Value> for SerializedFilter {
    type Error = QueryError;

    fn try_from(value: Value) -> QueryResult<Self> {
        if !value.is_object() {
            return Err(QueryError::InvalidSerializedState(format!(
                "expected a serialized filter object, found {value}"
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Filter conditions, flags and compile settings of one query.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    conditions: Vec<Condition>,
    operator: FilterOperator,
    flags: Map<String, Value>,
    first_level: bool,
    deleted: Option<bool>,
    config: QueryConfig,
    notifier: ChangeNotifier,
}

impl FilterSet {
    /// Creates an empty filter with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty filter using the given configuration.
    pub fn with_config(config: QueryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Configuration driving text matching and operator keywords.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: QueryConfig) {
        self.config = config;
    }

    pub(crate) fn set_notifier(&mut self, notifier: ChangeNotifier) {
        self.notifier = notifier;
    }

    fn changed(&mut self) -> &mut Self {
        self.notifier.notify(ChangeSource::Filter);
        self
    }

    fn use_like(&self) -> bool {
        self.config.text_match.use_like()
    }

    fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    // Internal edits below never notify; public methods notify once when done.

    fn drop_key(&mut self, property: &str) {
        self.conditions
            .retain(|condition| condition.key() != Some(property));
    }

    fn drop_condition(&mut self, condition: &Condition) {
        if condition.members().is_none() {
            if let Some(key) = condition.key() {
                self.drop_key(key);
            }
            return;
        }

        let kind = condition.key();
        let keys = sorted_keys(condition);
        self.conditions.retain(|stored| {
            !(stored.members().is_some() && stored.key() == kind && sorted_keys(stored) == keys)
        });
    }

    fn insert(&mut self, condition: Condition, replace: bool) {
        if replace {
            self.drop_condition(&condition);
        }
        self.conditions.push(condition);
    }

    fn set_or_drop(&mut self, property: &str, operation: Option<Operation>, replace: bool) {
        match operation {
            Some(operation) => self.insert(Condition::op(property, operation), replace),
            None => self.drop_key(property),
        }
    }

    /// Starts-with text search on `property`. An empty value removes the condition.
    pub fn by_text(&mut self, property: &str, value: &str, replace: bool) -> &mut Self {
        let operation = (!value.is_empty())
            .then(|| generator::text_start_with(value, self.use_like()));
        self.set_or_drop(property, operation, replace);
        self.changed()
    }

    /// Case-insensitive exact text match on `property`. An empty value removes the condition.
    pub fn by_text_exact(&mut self, property: &str, value: &str, replace: bool) -> &mut Self {
        let operation = (!value.is_empty()).then(|| generator::text_is(value, self.use_like()));
        self.set_or_drop(property, operation, replace);
        self.changed()
    }

    /// Starts-with text search matching any of `properties`, as one `or` condition.
    ///
    /// An empty value removes the `or` condition over exactly these properties.
    pub fn by_text_multiple_properties(
        &mut self,
        properties: &[&str],
        value: &str,
        replace: bool,
    ) -> &mut Self {
        if value.is_empty() {
            self.drop_operation(FilterOperator::Or, properties);
        } else {
            let operation = generator::text_start_with(value, self.use_like());
            let condition = Condition::or(
                properties
                    .iter()
                    .map(|property| Condition::op(*property, operation.clone())),
            );
            self.insert(condition, replace);
        }
        self.changed()
    }

    /// Contains text search on `property`. An empty value removes the condition.
    pub fn by_containing_text(&mut self, property: &str, value: &str, replace: bool) -> &mut Self {
        let operation =
            (!value.is_empty()).then(|| generator::text_contains(value, self.use_like()));
        self.set_or_drop(property, operation, replace);
        self.changed()
    }

    /// Phone number search that ignores separators between digits.
    ///
    /// An empty value removes the condition. A value without digits stores the
    /// [`INVALID_PHONE`] sentinel, which matches nothing.
    pub fn by_phone_number(&mut self, property: &str, value: &str, replace: bool) -> &mut Self {
        if value.is_empty() {
            self.drop_key(property);
        } else {
            let condition = match generator::phone_number_pattern(value) {
                Some(pattern) => {
                    Condition::op(property, Operation::new(Operator::Regexp, format!("/{pattern}/")))
                }
                None => Condition::eq(property, INVALID_PHONE),
            };
            self.insert(condition, replace);
        }
        self.changed()
    }

    /// Plain equality, `{property: value}`.
    ///
    /// Null, empty strings, empty arrays and empty objects remove the condition;
    /// numbers and booleans (including `0` and `false`) are always kept.
    pub fn by_equality(
        &mut self,
        property: &str,
        value: impl Into<Value>,
        replace: bool,
    ) -> &mut Self {
        let value = value.into();
        if is_blank(&value) {
            self.drop_key(property);
        } else {
            self.insert(Condition::eq(property, value), replace);
        }
        self.changed()
    }

    /// Boolean filter where `false` also matches unset values.
    ///
    /// `Some(true)` stores `{property: true}`, `Some(false)` stores
    /// `{or: [{property: false}, {property: {eq: null}}]}`, and `None` removes both.
    pub fn by_boolean(&mut self, property: &str, value: Option<bool>, replace: bool) -> &mut Self {
        let unset = Condition::or(vec![
            Condition::eq(property, false),
            Condition::op(property, Operation::new(Operator::Eq, Value::Null)),
        ]);

        if value.is_none() || replace {
            self.drop_key(property);
            self.drop_condition(&unset);
        }

        match value {
            Some(true) => self.conditions.push(Condition::eq(property, true)),
            Some(false) => self.conditions.push(unset),
            None => {}
        }
        self.changed()
    }

    /// Field presence filter, `{property: {exists: value}}`. `None` removes the condition.
    pub fn by_boolean_using_exist(
        &mut self,
        property: &str,
        value: Option<bool>,
        replace: bool,
    ) -> &mut Self {
        let dialect = self.dialect();
        let operation =
            value.map(|value| Operation::new(Operator::Exists, value).with_dialect(dialect));
        self.set_or_drop(property, operation, replace);
        self.changed()
    }

    /// Numeric range. A range without usable bounds removes the condition.
    pub fn by_range(&mut self, property: &str, range: &RangeValue, replace: bool) -> &mut Self {
        self.set_or_drop(property, generator::range_compare(range), replace);
        self.changed()
    }

    /// Age range, always compared in years.
    ///
    /// Writes `<property>.years` and drops any `<property>.months` condition so
    /// that months and years are never mixed in one comparison.
    pub fn by_age_range(&mut self, property: &str, range: &RangeValue, replace: bool) -> &mut Self {
        self.drop_key(&format!("{property}.months"));
        self.set_or_drop(
            &format!("{property}.years"),
            generator::range_compare(range),
            replace,
        );
        self.changed()
    }

    /// Date range with ISO-8601 UTC bounds. A range without usable bounds removes the condition.
    pub fn by_date_range(
        &mut self,
        property: &str,
        range: &DateRangeValue,
        replace: bool,
    ) -> &mut Self {
        self.set_or_drop(property, generator::date_range_compare(range), replace);
        self.changed()
    }

    /// Membership filter, `{property: {inq: [...]}}`. An empty list removes the condition.
    pub fn by_select<I, V>(&mut self, property: &str, values: I, replace: bool) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        let operation =
            (!values.is_empty()).then(|| Operation::new(Operator::Inq, Value::Array(values)));
        self.set_or_drop(property, operation, replace);
        self.changed()
    }

    /// Requires `property` to be present, not null and not empty.
    pub fn by_has_value(&mut self, property: &str, replace: bool) -> &mut Self {
        let condition = generator::has_value(property, self.dialect());
        self.insert(condition, replace);
        self.changed()
    }

    /// Requires `property` to be missing or null (or empty, with `check_empty_string`).
    pub fn by_not_having_value(
        &mut self,
        property: &str,
        check_empty_string: bool,
        replace: bool,
    ) -> &mut Self {
        let condition = generator::doesnt_have_value(property, check_empty_string, self.dialect());
        self.insert(condition, replace);
        self.changed()
    }

    /// Adds a condition.
    ///
    /// With `replace`, conditions on the same field (or, for `and` / `or`
    /// conditions, combinators over the same set of fields) are removed first.
    /// Without it, conditions accumulate.
    pub fn where_condition(&mut self, condition: Condition, replace: bool) -> &mut Self {
        self.insert(condition, replace);
        self.changed()
    }

    /// Removes every condition whose top-level key is `property`.
    pub fn remove(&mut self, property: &str) -> &mut Self {
        self.drop_key(property);
        self.changed()
    }

    /// Removes only the `operator` part of the conditions on `property`.
    ///
    /// `{age: {gte: 1, lte: 5}}` minus `gte` becomes `{age: {lte: 5}}`; a
    /// condition left without operators is dropped.
    pub fn remove_operator(&mut self, property: &str, operator: &str) -> &mut Self {
        let conditions = std::mem::take(&mut self.conditions);
        self.conditions = conditions
            .into_iter()
            .filter_map(|condition| {
                if condition.key() != Some(property) {
                    return Some(condition);
                }
                without_operator(condition, property, operator)
            })
            .collect();
        self.changed()
    }

    /// Removes the conditions `condition` would replace; see [`FilterSet::where_condition`].
    pub fn remove_condition(&mut self, condition: &Condition) -> &mut Self {
        self.drop_condition(condition);
        self.changed()
    }

    /// Removes conditions with the same top-level key and the same operator key
    /// as `condition`.
    pub fn remove_exact_condition(&mut self, condition: &Condition) -> &mut Self {
        let key = condition.key();
        let operator_key = condition.operator_key();
        self.conditions.retain(|stored| {
            !(stored.key() == key && stored.operator_key() == operator_key)
        });
        self.changed()
    }

    /// Removes whatever `path` points at inside every condition, pruning
    /// conditions that end up empty. See [`path::remove_path`].
    pub fn remove_path_condition(&mut self, path: &str) -> &mut Self {
        let conditions = std::mem::take(&mut self.conditions);
        self.conditions = conditions
            .into_iter()
            .filter_map(|condition| match path::remove_path(&condition.to_value(), path) {
                Some(Value::Object(map)) => Some(Condition::from_map(map)),
                _ => None,
            })
            .collect();
        self.changed()
    }

    fn drop_operation(&mut self, operator: FilterOperator, properties: &[&str]) {
        self.conditions.retain(|stored| {
            !(stored.members().is_some()
                && stored.key() == Some(operator.keyword())
                && stored.member_keys() == properties)
        });
    }

    /// Removes the `operator` combinator whose members are keyed, in order, by `properties`.
    pub fn remove_operation(&mut self, operator: FilterOperator, properties: &[&str]) -> &mut Self {
        self.drop_operation(operator, properties);
        self.changed()
    }

    /// Returns true if a condition is keyed by `property`.
    pub fn has(&self, property: &str) -> bool {
        self.get(property).is_some()
    }

    /// Returns the first condition keyed by `property`.
    pub fn get(&self, property: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|condition| condition.key() == Some(property))
    }

    /// Stored top-level conditions, in insertion order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns true if at least one stored condition constrains something.
    pub fn has_conditions(&self) -> bool {
        self.conditions
            .iter()
            .any(|condition| !condition.is_vacuous())
    }

    /// Sets an out-of-band directive sent next to the conditions.
    pub fn flag(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.flags.insert(key.into(), value.into());
        self.changed()
    }

    /// Drops the flag `key`.
    pub fn remove_flag(&mut self, key: &str) -> &mut Self {
        self.flags.retain(|stored, _| stored != key);
        self.changed()
    }

    /// Returns a copy of the flags.
    pub fn flags(&self) -> Map<String, Value> {
        self.flags.clone()
    }

    /// Asks the backend to also consider soft-deleted records when evaluating conditions.
    pub fn include_deleted_records_where_field(&mut self) -> &mut Self {
        self.deleted = Some(true);
        self.changed()
    }

    /// Sets how top-level conditions are joined.
    pub fn set_operator(&mut self, operator: FilterOperator) -> &mut Self {
        self.operator = operator;
        self.changed()
    }

    /// Operator joining the top-level conditions.
    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    /// Removes all conditions and flags. The operator and compile mode are kept.
    pub fn clear(&mut self) -> &mut Self {
        self.conditions.clear();
        self.flags.clear();
        self.changed()
    }

    /// Returns true if there are no conditions and no flags.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.flags.is_empty()
    }

    /// Compiles conditions into one flat object instead of an `and` / `or` list.
    ///
    /// For endpoints that cannot evaluate nested boolean trees. Conditions that
    /// share a key overwrite each other, the last one winning.
    pub fn first_level_conditions(&mut self) -> &mut Self {
        self.first_level = true;
        self.changed()
    }

    /// Restores the default `{and: [...]}` compile mode.
    pub fn multi_level_conditions(&mut self) -> &mut Self {
        self.first_level = false;
        self.changed()
    }

    /// Returns true if conditions compile flat, without the operator wrapper.
    pub fn is_first_level(&self) -> bool {
        self.first_level
    }

    /// Compiles the filter into one backend condition.
    ///
    /// Flags are merged last and win over condition keys of the same name,
    /// unless `ignore_flags` is set.
    pub fn generate_condition(&self, ignore_flags: bool) -> Value {
        let mut result = Map::new();

        if self.first_level {
            for condition in &self.conditions {
                if let Value::Object(map) = condition.to_value() {
                    result.extend(map);
                }
            }
        } else if !self.conditions.is_empty() {
            result.insert(
                self.operator.keyword().to_string(),
                Value::Array(self.conditions.iter().map(Condition::to_value).collect()),
            );
        }

        if let Some(deleted) = self.deleted {
            result.insert(INCLUDE_DELETED_RECORDS.to_string(), Value::Bool(deleted));
        }

        if !ignore_flags {
            result.extend(self.flags.clone());
        }

        Value::Object(result)
    }

    /// JSON text of [`FilterSet::generate_condition`].
    pub fn generate_condition_string(&self, ignore_flags: bool) -> QueryResult<String> {
        Ok(serde_json::to_string(&self.generate_condition(ignore_flags))?)
    }

    /// Returns the first condition (or `{}`), optionally wrapped as `{where: ...}`.
    pub fn generate_first_condition(&self, include_where: bool) -> Value {
        let condition = self
            .conditions
            .first()
            .map(Condition::to_value)
            .unwrap_or_else(|| Value::Object(Map::new()));

        if include_where {
            let mut wrapper = Map::new();
            wrapper.insert("where".to_string(), condition);
            Value::Object(wrapper)
        } else {
            condition
        }
    }

    /// JSON text of [`FilterSet::generate_first_condition`].
    pub fn generate_first_condition_string(&self, include_where: bool) -> QueryResult<String> {
        Ok(serde_json::to_string(&self.generate_first_condition(include_where))?)
    }

    /// Captures conditions, operator, flags, compile mode and the deleted tri-state.
    pub fn serialize(&self) -> SerializedFilter {
        SerializedFilter {
            conditions: self.conditions.clone(),
            operator: self.operator,
            flags: self.flags.clone(),
            generate_conditions_on_first_level: self.first_level,
            deleted: self.deleted,
        }
    }

    /// Restores the state captured by [`FilterSet::serialize`]. Configuration
    /// and listener are kept.
    pub fn deserialize(&mut self, serialized: SerializedFilter) -> &mut Self {
        self.conditions = serialized.conditions;
        self.operator = serialized.operator;
        self.flags = serialized.flags;
        self.first_level = serialized.generate_conditions_on_first_level;
        self.deleted = serialized.deleted;
        self.changed()
    }

    /// Restores state from serialized JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid serialized filter; the
    /// filter is left untouched in that case.
    pub fn deserialize_json(&mut self, text: &str) -> QueryResult<&mut Self> {
        let serialized = SerializedFilter::from_json(text)?;
        Ok(self.deserialize(serialized))
    }

    /// Restores state from an already parsed serialized filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid serialized filter.
    pub fn deserialize_value(&mut self, value: Value) -> QueryResult<&mut Self> {
        let serialized = SerializedFilter::try_from(value)?;
        Ok(self.deserialize(serialized))
    }

    /// Applies `other`'s constraints on top of this filter.
    ///
    /// An empty filter adopts `other` wholesale. Otherwise `other`'s compiled
    /// conditions are added as one more condition and its flags are copied over
    /// one by one.
    pub fn merge(&mut self, other: &FilterSet) -> &mut Self {
        if self.is_empty() {
            return self.deserialize(other.serialize());
        }
        if other.is_empty() {
            return self;
        }

        if let Value::Object(map) = other.generate_condition(true) {
            if !map.is_empty() {
                self.conditions.push(Condition::from_map(map));
            }
        }
        for (key, value) in &other.flags {
            self.flags.insert(key.clone(), value.clone());
        }
        self.changed()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn sorted_keys(condition: &Condition) -> Vec<&str> {
    let mut keys = condition.member_keys();
    keys.sort_unstable();
    keys.dedup();
    keys
}

fn without_operator(condition: Condition, property: &str, operator: &str) -> Option<Condition> {
    let Value::Object(mut map) = condition.to_value() else {
        return Some(condition);
    };

    let emptied = match map.get_mut(property) {
        Some(Value::Object(inner)) if inner.contains_key(operator) => {
            inner.retain(|key, _| key != operator);
            // `options` only qualifies a pattern operator
            if !inner.keys().any(|key| key != "options") {
                inner.clear();
            }
            inner.is_empty()
        }
        _ => return Some(condition),
    };

    if emptied {
        map.retain(|key, _| key != property);
    }
    (!map.is_empty()).then(|| Condition::from_map(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextMatch;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn compiled(filter: &FilterSet) -> Value {
        filter.generate_condition(false)
    }

    // ─── CLEARING ───

    #[test]
    fn test_empty_values_retract_conditions() {
        let mut filter = FilterSet::new();
        filter
            .by_text("name", "jo", true)
            .by_text_exact("code", "ab", true)
            .by_containing_text("notes", "x", true)
            .by_phone_number("phone", "555", true)
            .by_equality("status", "confirmed", true)
            .by_boolean("active", Some(true), true)
            .by_boolean_using_exist("deletedAt", Some(false), true)
            .by_range("score", &RangeValue::at_least(3), true)
            .by_date_range("dob", &DateRangeValue::since("2020-01-01"), true)
            .by_select("classification", vec!["a", "b"], true)
            .by_age_range("age", &RangeValue::between(1, 5), false)
            .by_range("age.months", &RangeValue::at_least(2), false);
        assert_eq!(filter.conditions().len(), 12);
        assert!(filter.has("age.years"));
        assert!(filter.has("age.months"));

        filter
            .by_text("name", "", true)
            .by_text_exact("code", "", true)
            .by_containing_text("notes", "", true)
            .by_phone_number("phone", "", true)
            .by_equality("status", "", true)
            .by_boolean("active", None, true)
            .by_boolean_using_exist("deletedAt", None, true)
            .by_range("score", &RangeValue::default(), true)
            .by_date_range("dob", &DateRangeValue::default(), true)
            .by_select("classification", Vec::<Value>::new(), true)
            .by_age_range("age", &RangeValue::default(), true);

        for field in [
            "name", "code", "notes", "phone", "status", "active", "deletedAt", "score", "dob",
            "classification", "age.years", "age.months",
        ] {
            assert!(!filter.has(field), "{field} should be cleared");
        }
        assert!(filter.is_empty());
    }

    #[test]
    fn test_by_equality_keeps_zero_and_false() {
        let mut filter = FilterSet::new();
        filter
            .by_equality("count", 0, true)
            .by_equality("flag", false, true)
            .by_equality("gone", Value::Null, true);

        assert!(filter.has("count"));
        assert!(filter.has("flag"));
        assert!(!filter.has("gone"));
    }

    // ─── REPLACE VS ACCUMULATE ───

    #[test]
    fn test_replace_keeps_one_condition_per_field() {
        let mut filter = FilterSet::new();
        filter.by_equality("x", 1, true).by_equality("x", 2, true);

        assert_eq!(filter.conditions(), &[Condition::eq("x", 2)]);
    }

    #[test]
    fn test_accumulate_keeps_both_conditions() {
        let mut filter = FilterSet::new();
        filter.by_equality("x", 1, false).by_equality("x", 2, false);

        assert_eq!(
            compiled(&filter),
            json!({"and": [{"x": 1}, {"x": 2}]})
        );
    }

    #[test]
    fn test_replace_combinator_by_member_set() {
        let mut filter = FilterSet::new();
        filter
            .by_text_multiple_properties(&["firstName", "lastName"], "jo", true)
            .by_text_multiple_properties(&["lastName", "firstName"], "an", true)
            .by_text_multiple_properties(&["email"], "x", true);

        assert_eq!(filter.conditions().len(), 2);
        assert_eq!(
            filter.conditions()[0].to_value(),
            json!({"or": [{"lastName": {"regexp": "/^an/i"}}, {"firstName": {"regexp": "/^an/i"}}]})
        );
    }

    #[test]
    fn test_multiple_properties_cleared_by_exact_member_list() {
        let mut filter = FilterSet::new();
        filter
            .by_text_multiple_properties(&["firstName", "lastName"], "jo", true)
            .by_text_multiple_properties(&["firstName", "lastName"], "", true);

        assert!(filter.is_empty());
    }

    // ─── TEXT ───

    #[test]
    fn test_text_helpers_follow_configured_match() {
        let mut filter = FilterSet::with_config(
            QueryConfig::builder().with_text_match(TextMatch::Like).build(),
        );
        filter.by_text("name", "Jo", true).by_containing_text("notes", "fever", true);

        assert_eq!(
            compiled(&filter),
            json!({"and": [
                {"name": {"like": "^Jo", "options": "i"}},
                {"notes": {"like": "fever", "options": "i"}}
            ]})
        );
    }

    #[test]
    fn test_by_text_exact() {
        let mut filter = FilterSet::new();
        filter.by_text_exact("name", "Jo", true);
        assert_eq!(
            filter.get("name").map(Condition::to_value),
            Some(json!({"name": {"regexp": "/^Jo$/i"}}))
        );
    }

    // ─── PHONE ───

    #[test]
    fn test_by_phone_number() {
        let mut filter = FilterSet::new();
        filter.by_phone_number("phone", "12-3", true);
        assert_eq!(
            filter.get("phone").map(Condition::to_value),
            Some(json!({"phone": {"regexp": "/^[^0-9]*1[^0-9]*2[^0-9]*3/"}}))
        );
    }

    #[test]
    fn test_by_phone_number_without_digits_matches_nothing() {
        let mut filter = FilterSet::new();
        filter.by_phone_number("phone", "unknown", true);
        assert_eq!(filter.get("phone"), Some(&Condition::eq("phone", INVALID_PHONE)));
    }

    // ─── BOOLEANS ───

    #[test]
    fn test_by_boolean() {
        let mut filter = FilterSet::new();
        filter.by_boolean("pregnant", Some(true), true);
        assert_eq!(compiled(&filter), json!({"and": [{"pregnant": true}]}));

        filter.by_boolean("pregnant", Some(false), true);
        assert_eq!(
            compiled(&filter),
            json!({"and": [{"or": [{"pregnant": false}, {"pregnant": {"eq": null}}]}]})
        );

        filter.by_boolean("pregnant", None, true);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_by_boolean_using_exist_uses_dialect() {
        let mut filter =
            FilterSet::with_config(QueryConfig::builder().with_dialect(Dialect::Mongo).build());
        filter.by_boolean_using_exist("dateOfOutcome", Some(true), true);
        assert_eq!(
            filter.get("dateOfOutcome").map(Condition::to_value),
            Some(json!({"dateOfOutcome": {"$exists": true}}))
        );
    }

    // ─── RANGES ───

    #[test]
    fn test_by_age_range_uses_years_only() {
        let mut filter = FilterSet::new();
        filter
            .by_range("age.months", &RangeValue::at_least(2), true)
            .by_age_range("age", &RangeValue::between(1, 5), true);

        assert!(!filter.has("age.months"));
        assert_eq!(
            filter.get("age.years").map(Condition::to_value),
            Some(json!({"age.years": {"between": [1, 5]}}))
        );
    }

    #[test]
    fn test_by_date_range_is_chainable_when_empty() {
        let mut filter = FilterSet::new();
        filter
            .by_date_range("dateOfReporting", &DateRangeValue::default(), true)
            .by_equality("status", "x", true);
        assert!(filter.has("status"));
    }

    #[test]
    fn test_by_select() {
        let mut filter = FilterSet::new();
        filter.by_select("classification", vec!["SUSPECT", "CONFIRMED"], true);
        assert_eq!(
            filter.get("classification").map(Condition::to_value),
            Some(json!({"classification": {"inq": ["SUSPECT", "CONFIRMED"]}}))
        );
    }

    // ─── EXISTENCE ───

    #[test]
    fn test_by_has_value_replaces_itself() {
        let mut filter = FilterSet::new();
        filter.by_has_value("email", true).by_has_value("email", true);
        assert_eq!(filter.conditions().len(), 1);
        assert_eq!(filter.conditions()[0].member_keys(), vec!["email"; 3]);
    }

    #[test]
    fn test_by_not_having_value() {
        let mut filter = FilterSet::new();
        filter.by_not_having_value("email", false, true);
        assert_eq!(
            compiled(&filter),
            json!({"and": [{"or": [{"email": {"exists": false}}, {"email": {"eq": null}}]}]})
        );
    }

    // ─── REMOVAL ───

    #[test]
    fn test_remove_operator_narrows_removal() {
        let mut filter = FilterSet::new();
        filter
            .where_condition(Condition::try_from(json!({"age": {"gte": 1, "lte": 5}})).unwrap(), false)
            .where_condition(Condition::eq("name", "x"), false);

        filter.remove_operator("age", "gte");
        assert_eq!(
            filter.get("age").map(Condition::to_value),
            Some(json!({"age": {"lte": 5}}))
        );

        filter.remove_operator("age", "lte");
        assert!(!filter.has("age"));
        assert!(filter.has("name"));
    }

    #[test]
    fn test_remove_operator_drops_pattern_with_its_options() {
        let mut filter = FilterSet::with_config(
            QueryConfig::builder().with_text_match(TextMatch::Like).build(),
        );
        filter.by_text("name", "jo", true).remove_operator("name", "like");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_remove_exact_condition_matches_operator() {
        let mut filter = FilterSet::new();
        filter
            .by_range("age", &RangeValue::at_least(1), false)
            .by_range("age", &RangeValue::at_most(9), false);

        filter.remove_exact_condition(&Condition::op("age", Operation::new(Operator::Lte, 0)));
        assert_eq!(
            compiled(&filter),
            json!({"and": [{"age": {"gte": 1}}]})
        );
    }

    #[test]
    fn test_remove_condition_for_combinators() {
        let mut filter = FilterSet::new();
        filter
            .by_has_value("email", false)
            .by_not_having_value("email", true, false)
            .by_equality("email", "a@b.c", false);

        filter.remove_condition(&generator::has_value("email", Dialect::Loopback));
        assert_eq!(filter.conditions().len(), 2);
        assert!(filter.has("or"));
        assert!(!filter.has("and"));
    }

    #[test]
    fn test_remove_operation_requires_ordered_members() {
        let mut filter = FilterSet::new();
        filter.by_text_multiple_properties(&["a", "b"], "x", true);

        filter.remove_operation(FilterOperator::Or, &["b", "a"]);
        assert!(filter.has("or"));

        filter.remove_operation(FilterOperator::And, &["a", "b"]);
        assert!(filter.has("or"));

        filter.remove_operation(FilterOperator::Or, &["a", "b"]);
        assert!(!filter.has("or"));
    }

    #[test]
    fn test_remove_path_condition() {
        let mut filter = FilterSet::new();
        filter
            .by_text_multiple_properties(&["firstName", "lastName"], "jo", true)
            .by_equality("status", "x", true);

        filter.remove_path_condition("or.0");
        assert_eq!(
            compiled(&filter),
            json!({"and": [{"or": [{"lastName": {"regexp": "/^jo/i"}}]}, {"status": "x"}]})
        );

        filter.remove_path_condition("or.lastName");
        filter.remove_path_condition("status");
        assert!(filter.is_empty());
    }

    // ─── FLAGS & COMPILATION ───

    #[test]
    fn test_generate_condition_empty() {
        assert_eq!(compiled(&FilterSet::new()), json!({}));
    }

    #[test]
    fn test_generate_condition_with_or_operator() {
        let mut filter = FilterSet::new();
        filter
            .by_equality("a", 1, true)
            .by_equality("b", 2, true)
            .set_operator(FilterOperator::Or);
        assert_eq!(compiled(&filter), json!({"or": [{"a": 1}, {"b": 2}]}));
    }

    #[test]
    fn test_first_level_last_write_wins() {
        let mut filter = FilterSet::new();
        filter
            .by_equality("a", 1, false)
            .by_equality("b", 2, false)
            .by_equality("a", 3, false)
            .first_level_conditions();
        assert_eq!(compiled(&filter), json!({"a": 3, "b": 2}));

        filter.multi_level_conditions();
        assert_eq!(
            compiled(&filter),
            json!({"and": [{"a": 1}, {"b": 2}, {"a": 3}]})
        );
    }

    #[test]
    fn test_flags_and_deleted_records() {
        let mut filter = FilterSet::new();
        filter
            .by_equality("a", 1, true)
            .flag("countRelations", true)
            .flag("a", "flag wins")
            .include_deleted_records_where_field()
            .first_level_conditions();

        assert_eq!(
            compiled(&filter),
            json!({"a": "flag wins", "includeDeletedRecords": true, "countRelations": true})
        );
        assert_eq!(
            filter.generate_condition(true),
            json!({"a": 1, "includeDeletedRecords": true})
        );

        filter.remove_flag("a");
        assert_eq!(filter.flags(), json!({"countRelations": true}).as_object().cloned().unwrap());
    }

    #[test]
    fn test_clear_keeps_operator_and_mode() {
        let mut filter = FilterSet::new();
        filter
            .by_equality("a", 1, true)
            .flag("x", 1)
            .set_operator(FilterOperator::Or)
            .first_level_conditions()
            .clear();

        assert!(filter.is_empty());
        assert_eq!(filter.operator(), FilterOperator::Or);
        assert!(filter.is_first_level());
    }

    #[test]
    fn test_generate_first_condition() {
        let mut filter = FilterSet::new();
        assert_eq!(filter.generate_first_condition(true), json!({"where": {}}));

        filter.by_equality("a", 1, true).by_equality("b", 2, true);
        assert_eq!(filter.generate_first_condition(false), json!({"a": 1}));
        assert_eq!(filter.generate_first_condition(true), json!({"where": {"a": 1}}));
        assert_eq!(
            filter.generate_first_condition_string(true).unwrap(),
            r#"{"where":{"a":1}}"#
        );
        assert_eq!(filter.generate_first_condition_string(false).unwrap(), r#"{"a":1}"#);
    }

    // ─── SERIALIZATION ───

    #[test]
    fn test_serialize_round_trip() {
        let mut filter = FilterSet::new();
        filter
            .by_text("name", "jo", true)
            .by_boolean("active", Some(false), true)
            .flag("countRelations", true)
            .include_deleted_records_where_field()
            .set_operator(FilterOperator::Or);

        let text = serde_json::to_string(&filter.serialize()).unwrap();
        let mut restored = FilterSet::new();
        restored.deserialize_json(&text).unwrap();

        assert_eq!(compiled(&restored), compiled(&filter));
        assert_eq!(restored.serialize(), filter.serialize());
    }

    #[test]
    fn test_serialized_shape() {
        let mut filter = FilterSet::new();
        filter.by_equality("a", 1, true).first_level_conditions();

        assert_eq!(
            serde_json::to_value(filter.serialize()).unwrap(),
            json!({
                "conditions": [{"a": 1}],
                "operator": "and",
                "flags": {},
                "generateConditionsOnFirstLevel": true
            })
        );
    }

    #[test]
    fn test_deserialize_value_and_errors() {
        let mut filter = FilterSet::new();
        filter
            .deserialize_value(json!({"conditions": [{"a": 1}], "operator": "or", "_deleted": false}))
            .unwrap();
        assert_eq!(compiled(&filter), json!({"or": [{"a": 1}], "includeDeletedRecords": false}));

        assert!(filter.deserialize_json("{not json").is_err());
        assert!(filter.deserialize_value(json!([1])).is_err());
        assert!(filter.has("a"));
    }

    // ─── MERGE ───

    #[test]
    fn test_merge_into_empty_adopts_other() {
        let mut other = FilterSet::new();
        other.by_equality("y", 2, true).flag("f", 1);

        let mut filter = FilterSet::new();
        filter.merge(&other);
        assert_eq!(compiled(&filter), compiled(&other));
    }

    #[test]
    fn test_merge_adds_other_conditions_as_one() {
        let mut filter = FilterSet::new();
        filter.by_equality("x", 1, true);

        let mut other = FilterSet::new();
        other.by_equality("y", 2, true).flag("f", 1);

        filter.merge(&other);
        assert_eq!(
            compiled(&filter),
            json!({"and": [{"x": 1}, {"and": [{"y": 2}]}], "f": 1})
        );

        filter.merge(&FilterSet::new());
        assert_eq!(filter.conditions().len(), 2);
    }

    #[test]
    fn test_merge_flags_only_adds_no_vacuous_condition() {
        let mut filter = FilterSet::new();
        filter.by_equality("x", 1, true);

        let mut other = FilterSet::new();
        other.flag("f", 1);

        filter.merge(&other);
        assert_eq!(filter.conditions().len(), 1);
        assert_eq!(compiled(&filter), json!({"and": [{"x": 1}], "f": 1}));
    }

    // ─── NOTIFICATION ───

    #[test]
    fn test_each_mutation_notifies_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        let mut filter = FilterSet::new();
        filter.set_notifier(ChangeNotifier::new(move |source: ChangeSource| {
            assert_eq!(source, ChangeSource::Filter);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        filter
            .by_age_range("age", &RangeValue::at_least(1), true)
            .by_equality("a", 1, true)
            .clear();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
