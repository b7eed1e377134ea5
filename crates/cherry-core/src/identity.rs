//! Entity identities: a `(type, id)` pair that stands in for a persisted
//! entity anywhere a full embedding would create a reference cycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use uuid::Uuid;

/// Every kind of entity the store knows how to persist.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
  VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityType {
  Person,
  EmailAddress,
  PhoneNumber,
  PostalAddress,
  Document,
}

/// A lightweight reference to a persisted entity.
///
/// Fields are private so an identity cannot be re-pointed once built; two
/// identities are equal when both the type and the id match.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct EntityIdentity {
  entity_type: EntityType,
  id:          Uuid,
}

impl EntityIdentity {
  pub fn new(entity_type: EntityType, id: Uuid) -> Self {
    Self { entity_type, id }
  }

  pub fn entity_type(&self) -> EntityType { self.entity_type }

  pub fn id(&self) -> Uuid { self.id }
}

impl fmt::Display for EntityIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.entity_type, self.id)
  }
}
