//! Email addresses owned by a person.

use serde::{Deserialize, Serialize};
use strum::VariantNames;

use crate::{
  Result,
  contact::{AddressType, Defaultable},
  document::Document,
  entity::{EntityBase, EntityRow, Record},
  identity::{EntityIdentity, EntityType},
  query::{DataType, QueryField},
};

#[derive(Debug, Clone, PartialEq)]
pub struct EmailAddress {
  pub base:         EntityBase,
  pub email:        String,
  pub is_default:   bool,
  pub address_type: AddressType,
  pub documents:    Vec<Document>,
}

#[derive(Serialize, Deserialize)]
struct Payload {
  email:        String,
  is_default:   bool,
  address_type: AddressType,
}

impl EmailAddress {
  pub fn new(owner: EntityIdentity, email: impl Into<String>) -> Self {
    let mut base = EntityBase::new(EntityType::EmailAddress);
    base.parent = Some(owner);
    Self {
      base,
      email: email.into(),
      is_default: false,
      address_type: AddressType::default(),
      documents: Vec::new(),
    }
  }

  pub fn owner(&self) -> Option<EntityIdentity> { self.base.parent }
}

const FIELDS: &[QueryField] = &[
  QueryField::payload("email", DataType::String),
  QueryField::payload("is_default", DataType::Boolean),
  QueryField::payload("address_type", DataType::Enum(AddressType::VARIANTS)),
];

impl Record for EmailAddress {
  const ENTITY_TYPE: EntityType = EntityType::EmailAddress;

  fn base(&self) -> &EntityBase { &self.base }

  fn base_mut(&mut self) -> &mut EntityBase { &mut self.base }

  fn payload(&self) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(Payload {
      email:        self.email.clone(),
      is_default:   self.is_default,
      address_type: self.address_type,
    })?)
  }

  fn from_row(row: EntityRow) -> Result<Self> {
    let p: Payload = serde_json::from_value(row.payload)?;
    Ok(Self {
      base:         row.base,
      email:        p.email,
      is_default:   p.is_default,
      address_type: p.address_type,
      documents:    Vec::new(),
    })
  }

  fn query_fields() -> &'static [QueryField] { FIELDS }

  fn documents(&self) -> &[Document] { &self.documents }

  fn documents_mut(&mut self) -> Option<&mut Vec<Document>> {
    Some(&mut self.documents)
  }
}

impl Defaultable for EmailAddress {
  fn is_default(&self) -> bool { self.is_default }
}
