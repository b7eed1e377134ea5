//! Conversions between [`EntityRow`] and the plain-text columns of the
//! `entities` table.
//!
//! Timestamps are RFC 3339 strings, UUIDs are hyphenated lowercase strings,
//! tags and payloads are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cherry_core::{
  EntityIdentity, EntityType,
  entity::{Audit, EntityBase, EntityRow, Status, StatusType},
};
use uuid::Uuid;

use crate::{Error, Result};

/// Column list shared by every `SELECT`, in [`RawRow`] order.
pub const COLUMNS: &str = "id, entity_type, parent_id, parent_type, name, \
                           description, reference, tags, status_type, since, \
                           created_at, created_by, modified_at, modified_by, \
                           payload";

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_entity_type(column: &'static str, s: &str) -> Result<EntityType> {
  EntityType::from_str(s).map_err(|_| Error::UnknownValue {
    column,
    value: s.to_owned(),
  })
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// An `entities` row exactly as stored.
#[derive(Debug, Clone)]
pub struct RawRow {
  pub id:          String,
  pub entity_type: String,
  pub parent_id:   Option<String>,
  pub parent_type: Option<String>,
  pub name:        Option<String>,
  pub description: Option<String>,
  pub reference:   Option<String>,
  pub tags:        String,
  pub status_type: String,
  pub since:       Option<String>,
  pub created_at:  Option<String>,
  pub created_by:  Option<String>,
  pub modified_at: Option<String>,
  pub modified_by: Option<String>,
  pub payload:     String,
}

impl RawRow {
  /// Read a row selected with [`COLUMNS`].
  pub fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      entity_type: row.get(1)?,
      parent_id:   row.get(2)?,
      parent_type: row.get(3)?,
      name:        row.get(4)?,
      description: row.get(5)?,
      reference:   row.get(6)?,
      tags:        row.get(7)?,
      status_type: row.get(8)?,
      since:       row.get(9)?,
      created_at:  row.get(10)?,
      created_by:  row.get(11)?,
      modified_at: row.get(12)?,
      modified_by: row.get(13)?,
      payload:     row.get(14)?,
    })
  }

  pub fn encode(row: &EntityRow) -> Result<Self> {
    let base = &row.base;
    Ok(Self {
      id:          encode_uuid(base.id()),
      entity_type: base.entity_type().to_string(),
      parent_id:   base.parent.map(|p| encode_uuid(p.id())),
      parent_type: base.parent.map(|p| p.entity_type().to_string()),
      name:        base.name.clone(),
      description: base.description.clone(),
      reference:   base.reference.clone(),
      tags:        serde_json::to_string(&base.tags)?,
      status_type: base.status.status_type().to_string(),
      since:       base.status.since().map(encode_dt),
      created_at:  base.audit.created_at.map(encode_dt),
      created_by:  base.audit.created_by.clone(),
      modified_at: base.audit.modified_at.map(encode_dt),
      modified_by: base.audit.modified_by.clone(),
      payload:     row.payload.to_string(),
    })
  }

  pub fn into_row(self) -> Result<EntityRow> {
    let entity_type = decode_entity_type("entity_type", &self.entity_type)?;
    let mut base = EntityBase::with_id(entity_type, decode_uuid(&self.id)?);

    base.parent = match (self.parent_type, self.parent_id) {
      (Some(t), Some(id)) => Some(EntityIdentity::new(
        decode_entity_type("parent_type", &t)?,
        decode_uuid(&id)?,
      )),
      _ => None,
    };
    base.name = self.name;
    base.description = self.description;
    base.reference = self.reference;
    base.tags = serde_json::from_str(&self.tags)?;

    let status_type = StatusType::from_str(&self.status_type).map_err(|_| {
      Error::UnknownValue {
        column: "status_type",
        value:  self.status_type.clone(),
      }
    })?;
    let since = self.since.as_deref().map(decode_dt).transpose()?;
    base.status = Status::from_parts(status_type, since);

    base.audit = Audit {
      created_at:  self.created_at.as_deref().map(decode_dt).transpose()?,
      created_by:  self.created_by,
      modified_at: self.modified_at.as_deref().map(decode_dt).transpose()?,
      modified_by: self.modified_by,
    };

    Ok(EntityRow {
      base,
      payload: serde_json::from_str(&self.payload)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rows_survive_column_encoding() {
    let owner = EntityIdentity::new(EntityType::Person, Uuid::new_v4());
    let mut base = EntityBase::new(EntityType::EmailAddress);
    base.parent = Some(owner);
    base.tags = vec!["work".into()];
    base.status.set_inactive();
    base.audit.touch("tester", Utc::now());

    let row = EntityRow {
      base,
      payload: serde_json::json!({ "email": "a@b.org" }),
    };
    let raw = RawRow::encode(&row).unwrap();
    assert_eq!(raw.entity_type, "email_address");
    assert_eq!(raw.parent_type.as_deref(), Some("person"));

    let decoded = raw.into_row().unwrap();
    assert_eq!(decoded.base.identity(), row.base.identity());
    assert_eq!(decoded.base.parent, Some(owner));
    assert_eq!(decoded.base.tags, row.base.tags);
    assert_eq!(decoded.payload, row.payload);
    assert!(!decoded.base.is_active());
  }

  #[test]
  fn unknown_entity_type_is_rejected() {
    let row = EntityRow {
      base:    EntityBase::new(EntityType::Person),
      payload: serde_json::json!({}),
    };
    let mut raw = RawRow::encode(&row).unwrap();
    raw.entity_type = "invoice".into();
    assert!(matches!(
      raw.into_row(),
      Err(Error::UnknownValue { column: "entity_type", .. })
    ));
  }
}
