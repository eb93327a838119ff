//! Typed filter conditions and their backend JSON shape.
//!
//! A [`Condition`] is one constraint of a filter: a field predicate
//! (`{"age": {"gte": 18}}`), a combinator (`{"and": [...]}` / `{"or": [...]}`),
//! or any other JSON object kept verbatim. Conditions are immutable values;
//! filter sets replace or drop whole entries instead of editing them.
//!
//! # Wire format
//!
//! ```text
//! FilterCondition := {<field>: <op-object>} | {and: FilterCondition[]} | {or: FilterCondition[]}
//! op-object       := {eq|neq|gt|gte|lt|lte|between|inq|nin|like|nlike|regexp|exists: <value>}
//!                  | {like: string, options: "i"}
//! ```
//!
//! Every condition compiles to that JSON through [`Condition::to_value`], and
//! any JSON object parses back through [`Condition::try_from`] so that
//! `parse(compile(c))` compiles to exactly the same JSON as `c`.
//!
//! # Example
//!
//! ```ignore
//! use querylayer::condition::{Condition, Operation, Operator};
//!
//! let cond = Condition::and(vec![
//!     Condition::eq("status", "confirmed"),
//!     Condition::op("age", Operation::new(Operator::Gte, 18)),
//! ]);
//!
//! assert_eq!(
//!     cond.to_value(),
//!     serde_json::json!({"and": [{"status": "confirmed"}, {"age": {"gte": 18}}]}),
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};

/// Keyword vocabulary used to spell operators on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Plain keywords: `eq`, `neq`, `exists`, `inq`, ...
    #[default]
    Loopback,
    /// Dollar-prefixed keywords: `$eq`, `$ne`, `$exists`, `$in`, ...
    Mongo,
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal to.
    Eq,
    /// Not equal to.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Inclusive range, value is a `[from, to]` pair.
    Between,
    /// Value is one of a list.
    Inq,
    /// Value is none of a list.
    Nin,
    /// Pattern match.
    Like,
    /// Negated pattern match.
    Nlike,
    /// Regular expression match.
    Regexp,
    /// Field presence.
    Exists,
}

impl Operator {
    const ALL: [Operator; 13] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Between,
        Operator::Inq,
        Operator::Nin,
        Operator::Like,
        Operator::Nlike,
        Operator::Regexp,
        Operator::Exists,
    ];

    /// Returns the wire keyword of this operator in the given dialect.
    ///
    /// `between`, `like` and `nlike` have no dollar-prefixed spelling and render
    /// the same in both dialects.
    pub fn keyword(self, dialect: Dialect) -> &'static str {
        match (dialect, self) {
            (Dialect::Mongo, Operator::Eq) => "$eq",
            (Dialect::Mongo, Operator::Neq) => "$ne",
            (Dialect::Mongo, Operator::Gt) => "$gt",
            (Dialect::Mongo, Operator::Gte) => "$gte",
            (Dialect::Mongo, Operator::Lt) => "$lt",
            (Dialect::Mongo, Operator::Lte) => "$lte",
            (Dialect::Mongo, Operator::Inq) => "$in",
            (Dialect::Mongo, Operator::Nin) => "$nin",
            (Dialect::Mongo, Operator::Regexp) => "$regex",
            (Dialect::Mongo, Operator::Exists) => "$exists",
            (_, Operator::Eq) => "eq",
            (_, Operator::Neq) => "neq",
            (_, Operator::Gt) => "gt",
            (_, Operator::Gte) => "gte",
            (_, Operator::Lt) => "lt",
            (_, Operator::Lte) => "lte",
            (_, Operator::Between) => "between",
            (_, Operator::Inq) => "inq",
            (_, Operator::Nin) => "nin",
            (_, Operator::Like) => "like",
            (_, Operator::Nlike) => "nlike",
            (_, Operator::Regexp) => "regexp",
            (_, Operator::Exists) => "exists",
        }
    }

    /// Recognises a keyword from either vocabulary.
    pub fn parse(keyword: &str) -> Option<(Operator, Dialect)> {
        [Dialect::Loopback, Dialect::Mongo]
            .into_iter()
            .flat_map(|dialect| Self::ALL.into_iter().map(move |op| (op, dialect)))
            .find(|(op, dialect)| op.keyword(*dialect) == keyword)
    }

    fn accepts_options(self) -> bool {
        matches!(self, Operator::Like | Operator::Nlike | Operator::Regexp)
    }
}

/// A single operator applied to a field, e.g. `{"gte": 18}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: Operator,
    pub dialect: Dialect,
    pub value: Value,
    /// Pattern flags sent next to `like` (`"i"` for case-insensitive).
    pub options: Option<String>,
}

impl Operation {
    /// Creates an operation spelled in the default vocabulary.
    pub fn new(operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            operator,
            dialect: Dialect::Loopback,
            value: value.into(),
            options: None,
        }
    }

    /// Picks the keyword set used for the operator.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Adds an `options` string, e.g. `i` for case-insensitive text.
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// The wire key of this operation.
    pub fn keyword(&self) -> &'static str {
        self.operator.keyword(self.dialect)
    }

    /// Compiles to `{op: value}`, plus `options` when set.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert(self.keyword().to_string(), self.value.clone());
        if let Some(options) = &self.options {
            object.insert("options".to_string(), Value::String(options.clone()));
        }
        Value::Object(object)
    }

    /// Interprets an op-object, returning `None` when it is not exactly one
    /// known operator (optionally followed by `options` for pattern operators).
    fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let mut entries = map.iter();
        let (keyword, value) = entries.next()?;
        let (operator, dialect) = Operator::parse(keyword)?;

        let options = match entries.next() {
            None => None,
            Some((key, Value::String(options)))
                if key == "options" && operator.accepts_options() && dialect == Dialect::Loopback =>
            {
                Some(options.clone())
            }
            Some(_) => return None,
        };

        if entries.next().is_some() {
            return None;
        }

        Some(Self {
            operator,
            dialect,
            value: value.clone(),
            options,
        })
    }
}

/// What a single field is constrained by.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Plain equality, `{"status": "confirmed"}`.
    Value(Value),
    /// A recognised operator, `{"age": {"gte": 18}}`.
    Op(Operation),
    /// Any other object, kept verbatim (`{"age": {"gte": 1, "lte": 5}}`).
    Document(Map<String, Value>),
}

impl Predicate {
    /// Interprets the value found under a field key.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => match Operation::from_map(&map) {
                Some(operation) => Predicate::Op(operation),
                None => Predicate::Document(map),
            },
            other => Predicate::Value(other),
        }
    }

    /// Compiles the right-hand side of a field condition.
    pub fn to_value(&self) -> Value {
        match self {
            Predicate::Value(value) => value.clone(),
            Predicate::Op(operation) => operation.to_value(),
            Predicate::Document(map) => Value::Object(map.clone()),
        }
    }

    /// The first key of the op-object, if the predicate is an object.
    pub fn operator_key(&self) -> Option<&str> {
        match self {
            Predicate::Value(Value::Object(map)) | Predicate::Document(map) => {
                map.keys().next().map(String::as_str)
            }
            Predicate::Value(_) => None,
            Predicate::Op(operation) => Some(operation.keyword()),
        }
    }
}

impl From<Operation> for Predicate {
    fn from(operation: Operation) -> Self {
        Predicate::Op(operation)
    }
}

/// One filter condition.
///
/// See the [module documentation](self) for the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", try_from = "Value")]
pub enum Condition {
    /// A predicate on a single field.
    Field(String, Predicate),
    /// All members must match.
    And(Vec<Condition>),
    /// Any member must match.
    Or(Vec<Condition>),
    /// Any other object: several keys, or no keys at all.
    Document(Map<String, Value>),
}

impl Condition {
    /// Creates a field condition.
    pub fn field(field: impl Into<String>, predicate: impl Into<Predicate>) -> Self {
        Condition::Field(field.into(), predicate.into())
    }

    /// Creates a plain equality condition, `{field: value}`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Field(field.into(), Predicate::Value(value.into()))
    }

    /// Creates an operator condition, `{field: {op: value}}`.
    pub fn op(field: impl Into<String>, operation: Operation) -> Self {
        Condition::Field(field.into(), Predicate::Op(operation))
    }

    /// Creates `{and: [...]}` over the given conditions.
    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::And(conditions.into_iter().collect())
    }

    /// Creates `{or: [...]}` over the given conditions.
    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Or(conditions.into_iter().collect())
    }

    /// Interprets a JSON object as a condition. Never fails: single-key objects
    /// are fields or combinators, everything else becomes a [`Condition::Document`].
    pub fn from_map(map: Map<String, Value>) -> Self {
        if map.len() != 1 {
            return Condition::Document(map);
        }

        let combinator = match map.iter().next() {
            Some((key, Value::Array(items))) if key == "and" || key == "or" => items
                .iter()
                .map(|item| item.as_object().cloned().map(Condition::from_map))
                .collect::<Option<Vec<_>>>()
                .map(|members| (key == "and", members)),
            _ => None,
        };

        match combinator {
            Some((true, members)) => Condition::And(members),
            Some((false, members)) => Condition::Or(members),
            None => match map.into_iter().next() {
                Some((field, value)) => Condition::Field(field, Predicate::from_value(value)),
                None => Condition::Document(Map::new()),
            },
        }
    }

    /// Compiles the condition into its backend JSON shape.
    pub fn to_value(&self) -> Value {
        WireEncoder.visit_condition(self)
    }

    /// The top-level key: the field name, `and`, `or`, or the first key of a document.
    pub fn key(&self) -> Option<&str> {
        match self {
            Condition::Field(field, _) => Some(field),
            Condition::And(_) => Some("and"),
            Condition::Or(_) => Some("or"),
            Condition::Document(map) => map.keys().next().map(String::as_str),
        }
    }

    /// The first key under the field, e.g. `gte` for `{"age": {"gte": 18}}`.
    pub fn operator_key(&self) -> Option<&str> {
        match self {
            Condition::Field(_, predicate) => predicate.operator_key(),
            Condition::Document(map) => map
                .values()
                .next()
                .and_then(Value::as_object)
                .and_then(|inner| inner.keys().next())
                .map(String::as_str),
            Condition::And(_) | Condition::Or(_) => None,
        }
    }

    /// Members of an `and` / `or` combinator.
    pub fn members(&self) -> Option<&[Condition]> {
        match self {
            Condition::And(members) | Condition::Or(members) => Some(members),
            _ => None,
        }
    }

    /// Top-level keys of the combinator members, in order.
    pub fn member_keys(&self) -> Vec<&str> {
        self.members()
            .map(|members| members.iter().filter_map(Condition::key).collect())
            .unwrap_or_default()
    }

    /// True when the condition constrains nothing (`{}`, `{"and": []}`, or
    /// combinators made only of such conditions).
    pub fn is_vacuous(&self) -> bool {
        VacuityCheck.visit_condition(self)
    }
}

impl From<Condition> for Value {
    fn from(condition: Condition) -> Self {
        condition.to_value()
    }
}

impl TryFrom<Value> for Condition {
    type Error = QueryError;

    fn try_from(value: Value) -> QueryResult<Self> {
        match value {
            Value::Object(map) => Ok(Condition::from_map(map)),
            other => Err(QueryError::InvalidCondition(format!(
                "expected a JSON object, found {other}"
            ))),
        }
    }
}

/// Walks a condition tree.
///
/// Implementors supply one method per variant; [`ConditionVisitor::visit_condition`]
/// dispatches to them.
pub trait ConditionVisitor {
    type Output;

    fn visit_and(&mut self, conditions: &[Condition]) -> Self::Output;
    fn visit_or(&mut self, conditions: &[Condition]) -> Self::Output;
    fn visit_field(&mut self, field: &str, predicate: &Predicate) -> Self::Output;
    fn visit_document(&mut self, document: &Map<String, Value>) -> Self::Output;

    fn visit_condition(&mut self, condition: &Condition) -> Self::Output {
        match condition {
            Condition::And(conditions) => self.visit_and(conditions),
            Condition::Or(conditions) => self.visit_or(conditions),
            Condition::Field(field, predicate) => self.visit_field(field, predicate),
            Condition::Document(document) => self.visit_document(document),
        }
    }
}

/// Compiles conditions into backend JSON.
pub(crate) struct WireEncoder;

impl WireEncoder {
    fn combinator(&mut self, keyword: &str, conditions: &[Condition]) -> Value {
        let mut object = Map::new();
        object.insert(
            keyword.to_string(),
            Value::Array(
                conditions
                    .iter()
                    .map(|condition| self.visit_condition(condition))
                    .collect(),
            ),
        );
        Value::Object(object)
    }
}

impl ConditionVisitor for WireEncoder {
    type Output = Value;

    fn visit_and(&mut self, conditions: &[Condition]) -> Value {
        self.combinator("and", conditions)
    }

    fn visit_or(&mut self, conditions: &[Condition]) -> Value {
        self.combinator("or", conditions)
    }

    fn visit_field(&mut self, field: &str, predicate: &Predicate) -> Value {
        let mut object = Map::new();
        object.insert(field.to_string(), predicate.to_value());
        Value::Object(object)
    }

    fn visit_document(&mut self, document: &Map<String, Value>) -> Value {
        Value::Object(document.clone())
    }
}

struct VacuityCheck;

impl ConditionVisitor for VacuityCheck {
    type Output = bool;

    fn visit_and(&mut self, conditions: &[Condition]) -> bool {
        conditions.iter().all(|condition| self.visit_condition(condition))
    }

    fn visit_or(&mut self, conditions: &[Condition]) -> bool {
        conditions.iter().all(|condition| self.visit_condition(condition))
    }

    fn visit_field(&mut self, _field: &str, _predicate: &Predicate) -> bool {
        false
    }

    fn visit_document(&mut self, document: &Map<String, Value>) -> bool {
        document.is_empty()
    }
}
