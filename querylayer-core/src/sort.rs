//! Sort criteria of a query.
//!
//! [`SortCriteria`] keeps an ordered, field-unique mapping of field to
//! [`SortDirection`] and compiles it to the backend's `order` list
//! (`["name asc", "createdAt desc"]`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{QueryError, QueryResult},
    listener::{ChangeNotifier, ChangeSource},
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// `asc` or `desc`.
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Ordered field to direction mapping.
#[derive(Debug, Clone, Default)]
pub struct SortCriteria {
    criteria: Vec<(String, SortDirection)>,
    notifier: ChangeNotifier,
}

impl SortCriteria {
    /// Creates empty sort criteria.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_notifier(&mut self, notifier: ChangeNotifier) {
        self.notifier = notifier;
    }

    fn changed(&mut self) -> &mut Self {
        self.notifier.notify(ChangeSource::Sort);
        self
    }

    fn upsert(&mut self, field: &str, direction: SortDirection) {
        match self.criteria.iter_mut().find(|(stored, _)| stored == field) {
            Some((_, stored)) => *stored = direction,
            None => self.criteria.push((field.to_string(), direction)),
        }
    }

    /// Sorts by `field`. A field that is already sorted keeps its position and
    /// takes the new direction.
    pub fn by(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        self.upsert(field, direction);
        self.changed()
    }

    /// Drops the criterion on `field`, if any.
    pub fn remove(&mut self, field: &str) -> &mut Self {
        self.criteria.retain(|(stored, _)| stored != field);
        self.changed()
    }

    /// Drops every criterion.
    pub fn clear(&mut self) -> &mut Self {
        self.criteria.clear();
        self.changed()
    }

    /// Returns true if nothing is sorted.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Direction currently applied to `field`.
    pub fn direction(&self, field: &str) -> Option<SortDirection> {
        self.criteria
            .iter()
            .find(|(stored, _)| stored == field)
            .map(|(_, direction)| *direction)
    }

    /// Compiles to `["field direction", ...]` in insertion order.
    pub fn generate_criteria(&self) -> Vec<String> {
        self.criteria
            .iter()
            .map(|(field, direction)| format!("{field} {}", direction.keyword()))
            .collect()
    }

    /// Applies `other`'s criteria on top of these, `other` winning per field.
    pub fn merge(&mut self, other: &SortCriteria) -> &mut Self {
        for (field, direction) in &other.criteria {
            self.upsert(field, *direction);
        }
        self.changed()
    }

    /// Returns the criteria as an ordered `{field: "asc" | "desc"}` object.
    pub fn serialize(&self) -> Map<String, Value> {
        self.criteria
            .iter()
            .map(|(field, direction)| {
                (field.clone(), Value::String(direction.keyword().to_string()))
            })
            .collect()
    }

    /// Replaces the criteria with a map produced by [`SortCriteria::serialize`].
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError::InvalidSerializedState`] if a direction is not
    /// `"asc"` or `"desc"`. The criteria are left untouched in that case.
    pub fn deserialize(&mut self, serialized: &Map<String, Value>) -> QueryResult<&mut Self> {
        let criteria = serialized
            .iter()
            .map(|(field, direction)| {
                serde_json::from_value::<SortDirection>(direction.clone())
                    .map(|direction| (field.clone(), direction))
                    .map_err(|_| {
                        QueryError::InvalidSerializedState(format!(
                            "invalid sort direction {direction} for field {field}"
                        ))
                    })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        self.criteria = criteria;
        Ok(self.changed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_criteria() {
        let sort = SortCriteria::new();
        assert!(sort.is_empty());
        assert!(sort.generate_criteria().is_empty());
    }

    #[test]
    fn test_by_upserts_in_place() {
        let mut sort = SortCriteria::new();
        sort.by("name", SortDirection::Asc)
            .by("createdAt", SortDirection::Desc)
            .by("name", SortDirection::Desc);

        assert_eq!(sort.generate_criteria(), vec!["name desc", "createdAt desc"]);
        assert_eq!(sort.direction("name"), Some(SortDirection::Desc));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut sort = SortCriteria::new();
        sort.by("a", SortDirection::Asc).by("b", SortDirection::Asc).remove("a");
        assert_eq!(sort.generate_criteria(), vec!["b asc"]);

        sort.clear();
        assert!(sort.is_empty());
    }

    #[test]
    fn test_merge_other_wins() {
        let mut sort = SortCriteria::new();
        sort.by("a", SortDirection::Asc).by("b", SortDirection::Asc);

        let mut other = SortCriteria::new();
        other.by("b", SortDirection::Desc).by("c", SortDirection::Asc);

        sort.merge(&other);
        assert_eq!(sort.generate_criteria(), vec!["a asc", "b desc", "c asc"]);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut sort = SortCriteria::new();
        sort.by("z", SortDirection::Desc).by("a", SortDirection::Asc);

        let serialized = sort.serialize();
        assert_eq!(Value::Object(serialized.clone()), json!({"z": "desc", "a": "asc"}));

        let mut restored = SortCriteria::new();
        restored.deserialize(&serialized).unwrap();
        assert_eq!(restored.generate_criteria(), sort.generate_criteria());
    }

    #[test]
    fn test_deserialize_rejects_unknown_direction() {
        let mut sort = SortCriteria::new();
        sort.by("a", SortDirection::Asc);

        let bad = json!({"b": "sideways"}).as_object().cloned().unwrap();
        assert!(sort.deserialize(&bad).is_err());
        assert_eq!(sort.generate_criteria(), vec!["a asc"]);
    }
}
