//! Search and query objects.
//!
//! Every entity type enumerates the fields it can be filtered on. A request
//! (a JSON object for `search`, query-string parameters for `query`) is turned
//! into an [`EntityQuery`]: a conjunction of [`Condition`]s over those fields
//! that a storage backend translates into its own predicate language.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use strum::VariantNames;
use uuid::Uuid;

use crate::{
  Error, Result,
  entity::{Record, StatusType},
  identity::EntityType,
};

// ─── Fields ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
  String,
  Boolean,
  Long,
  Date,
  Uuid,
  /// One of a closed set of (snake_case) names.
  Enum(&'static [&'static str]),
}

/// Where a field lives in the persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
  /// A base column named after the field.
  Column,
  /// A key of the JSON payload named after the field.
  Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryField {
  pub name:      &'static str,
  pub data_type: DataType,
  pub source:    FieldSource,
}

impl QueryField {
  pub const fn column(name: &'static str, data_type: DataType) -> Self {
    Self {
      name,
      data_type,
      source: FieldSource::Column,
    }
  }

  pub const fn payload(name: &'static str, data_type: DataType) -> Self {
    Self {
      name,
      data_type,
      source: FieldSource::Payload,
    }
  }
}

/// Fields every entity type can be queried on.
pub const BASE_FIELDS: &[QueryField] = &[
  QueryField::column("id", DataType::Uuid),
  QueryField::column("name", DataType::String),
  QueryField::column("description", DataType::String),
  QueryField::column("reference", DataType::String),
  QueryField::column("tags", DataType::String),
  QueryField::column("status_type", DataType::Enum(StatusType::VARIANTS)),
  QueryField::column("since", DataType::Date),
  QueryField::column("created_by", DataType::String),
  QueryField::column("modified_by", DataType::String),
  QueryField::column("parent_id", DataType::Uuid),
];

/// Look up a queryable field of `E` by name.
pub fn field<E: Record>(name: &str) -> Option<QueryField> {
  BASE_FIELDS
    .iter()
    .chain(E::query_fields())
    .find(|f| f.name == name)
    .copied()
}

// ─── Conditions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  Equal,
  /// Case-insensitive substring match.
  Match,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
  Text(String),
  Boolean(bool),
  Long(i64),
  Date(NaiveDate),
  Uuid(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
  pub field:    QueryField,
  pub operator: Operator,
  pub value:    QueryValue,
}

/// A conjunction of conditions over a single entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
  pub entity_type: EntityType,
  pub conditions:  Vec<Condition>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

impl EntityQuery {
  pub fn new(entity_type: EntityType) -> Self {
    Self {
      entity_type,
      conditions: Vec::new(),
      limit: None,
      offset: None,
    }
  }

  /// Build from a JSON object of `field: value` pairs. `null` and empty
  /// string values are ignored; `limit` and `offset` are reserved keys.
  pub fn from_json<E: Record>(body: &Value) -> Result<Self> {
    let Value::Object(map) = body else {
      return Err(Error::InvalidQueryValue {
        field:   "<body>".into(),
        message: "expected a JSON object".into(),
      });
    };
    let mut query = Self::new(E::ENTITY_TYPE);
    for (key, value) in map {
      query.push::<E>(key, value)?;
    }
    Ok(query)
  }

  /// Build from query-string parameters.
  pub fn from_params<E: Record>(params: &BTreeMap<String, String>) -> Result<Self> {
    let mut query = Self::new(E::ENTITY_TYPE);
    for (key, value) in params {
      query.push::<E>(key, &Value::String(value.clone()))?;
    }
    Ok(query)
  }

  /// Reject queries that would match every entity.
  pub fn ensure_not_empty(self) -> Result<Self> {
    if self.conditions.is_empty() {
      return Err(Error::EmptyQuery);
    }
    Ok(self)
  }

  fn push<E: Record>(&mut self, key: &str, value: &Value) -> Result<()> {
    if is_blank(value) {
      return Ok(());
    }
    match key {
      "limit" => self.limit = Some(parse_count(key, value)?),
      "offset" => self.offset = Some(parse_count(key, value)?),
      _ => {
        let field = field::<E>(key).ok_or_else(|| Error::UnknownQueryField {
          entity_type: E::ENTITY_TYPE,
          field:       key.to_owned(),
        })?;
        self.conditions.push(condition(field, value)?);
      }
    }
    Ok(())
  }
}

fn is_blank(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.trim().is_empty(),
    _ => false,
  }
}

fn invalid(field: &str, message: impl Into<String>) -> Error {
  Error::InvalidQueryValue {
    field:   field.to_owned(),
    message: message.into(),
  }
}

fn parse_count(field: &str, value: &Value) -> Result<usize> {
  let count = match value {
    Value::Number(n) => n.as_u64().map(|n| n as usize),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  };
  count.ok_or_else(|| invalid(field, "expected a non-negative integer"))
}

fn condition(field: QueryField, value: &Value) -> Result<Condition> {
  let name = field.name;
  let text = match value {
    Value::String(s) => Some(s.trim().to_owned()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  };

  let (operator, value) = match field.data_type {
    DataType::String => {
      let text = text.ok_or_else(|| invalid(name, "expected a string"))?;
      (Operator::Match, QueryValue::Text(text))
    }
    DataType::Boolean => {
      let flag = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
      }
      .ok_or_else(|| invalid(name, "expected true or false"))?;
      (Operator::Equal, QueryValue::Boolean(flag))
    }
    DataType::Long => {
      let n = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
      }
      .ok_or_else(|| invalid(name, "expected an integer"))?;
      (Operator::Equal, QueryValue::Long(n))
    }
    DataType::Date => {
      let text = text.ok_or_else(|| invalid(name, "expected a date"))?;
      (Operator::Equal, QueryValue::Date(parse_date(name, &text)?))
    }
    DataType::Uuid => {
      let text = text.ok_or_else(|| invalid(name, "expected a UUID"))?;
      let id = Uuid::parse_str(&text).map_err(|e| invalid(name, e.to_string()))?;
      (Operator::Equal, QueryValue::Uuid(id))
    }
    DataType::Enum(variants) => {
      let text = text.ok_or_else(|| invalid(name, "expected a string"))?;
      let variant = variants
        .iter()
        .find(|v| v.eq_ignore_ascii_case(&text))
        .ok_or_else(|| {
          invalid(name, format!("possible values are: {}", variants.join(", ")))
        })?;
      (Operator::Equal, QueryValue::Text((*variant).to_owned()))
    }
  };

  Ok(Condition {
    field,
    operator,
    value,
  })
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date(field: &str, s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
    .map_err(|e| invalid(field, e.to_string()))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::email::EmailAddress;

  #[test]
  fn strings_match_and_enums_are_canonicalised() {
    let q = EntityQuery::from_json::<EmailAddress>(&json!({
      "email":       "Example.COM",
      "status_type": "INACTIVE",
    }))
    .unwrap();

    let email = q.conditions.iter().find(|c| c.field.name == "email").unwrap();
    assert_eq!(email.operator, Operator::Match);
    assert_eq!(email.field.source, FieldSource::Payload);

    let status = q
      .conditions
      .iter()
      .find(|c| c.field.name == "status_type")
      .unwrap();
    assert_eq!(status.value, QueryValue::Text("inactive".into()));
  }

  #[test]
  fn blank_values_are_skipped_and_empty_query_rejected() {
    let q = EntityQuery::from_json::<EmailAddress>(&json!({
      "email": "",
      "name":  null,
    }))
    .unwrap();
    assert!(q.conditions.is_empty());
    assert!(matches!(q.ensure_not_empty(), Err(Error::EmptyQuery)));
  }

  #[test]
  fn unknown_field_is_rejected() {
    let err =
      EntityQuery::from_json::<EmailAddress>(&json!({ "shoe_size": 42 }))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownQueryField { .. }));
  }

  #[test]
  fn params_parse_typed_values() {
    let params = BTreeMap::from([
      ("is_default".to_string(), "true".to_string()),
      ("since".to_string(), "2024-03-01T10:00:00Z".to_string()),
      ("limit".to_string(), "5".to_string()),
    ]);
    let q = EntityQuery::from_params::<EmailAddress>(&params).unwrap();
    assert_eq!(q.limit, Some(5));
    assert!(q.conditions.contains(&Condition {
      field:    field::<EmailAddress>("is_default").unwrap(),
      operator: Operator::Equal,
      value:    QueryValue::Boolean(true),
    }));
    assert!(q.conditions.iter().any(|c| c.value
      == QueryValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())));
  }

  #[test]
  fn bad_uuid_is_rejected() {
    let err = EntityQuery::from_json::<EmailAddress>(&json!({ "id": "nope" }))
      .unwrap_err();
    assert!(matches!(err, Error::InvalidQueryValue { .. }));
  }
}
