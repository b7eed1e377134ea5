//! Phone numbers owned by a person.

use serde::{Deserialize, Serialize};
use strum::VariantNames;

use crate::{
  Result,
  contact::{Defaultable, PhoneNumberCategoryType, PhoneNumberType},
  document::Document,
  entity::{EntityBase, EntityRow, Record},
  identity::{EntityIdentity, EntityType},
  query::{DataType, QueryField},
};

pub const NUMBER_MAX_LEN: usize = 30;
pub const COUNTRY_CODE_MAX_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneNumber {
  pub base:          EntityBase,
  pub number:        String,
  pub country_code:  String,
  pub phone_type:    PhoneNumberType,
  pub category_type: PhoneNumberCategoryType,
  pub is_default:    bool,
  pub documents:     Vec<Document>,
}

#[derive(Serialize, Deserialize)]
struct Payload {
  number:        String,
  country_code:  String,
  phone_type:    PhoneNumberType,
  category_type: PhoneNumberCategoryType,
  is_default:    bool,
}

impl PhoneNumber {
  pub fn new(
    owner: EntityIdentity,
    number: impl Into<String>,
    country_code: impl Into<String>,
  ) -> Self {
    let mut base = EntityBase::new(EntityType::PhoneNumber);
    base.parent = Some(owner);
    Self {
      base,
      number: number.into(),
      country_code: country_code.into(),
      phone_type: PhoneNumberType::default(),
      category_type: PhoneNumberCategoryType::default(),
      is_default: false,
      documents: Vec::new(),
    }
  }

  pub fn owner(&self) -> Option<EntityIdentity> { self.base.parent }
}

const FIELDS: &[QueryField] = &[
  QueryField::payload("number", DataType::String),
  QueryField::payload("country_code", DataType::String),
  QueryField::payload("phone_type", DataType::Enum(PhoneNumberType::VARIANTS)),
  QueryField::payload(
    "category_type",
    DataType::Enum(PhoneNumberCategoryType::VARIANTS),
  ),
  QueryField::payload("is_default", DataType::Boolean),
];

impl Record for PhoneNumber {
  const ENTITY_TYPE: EntityType = EntityType::PhoneNumber;

  fn base(&self) -> &EntityBase { &self.base }

  fn base_mut(&mut self) -> &mut EntityBase { &mut self.base }

  fn payload(&self) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(Payload {
      number:        self.number.clone(),
      country_code:  self.country_code.clone(),
      phone_type:    self.phone_type,
      category_type: self.category_type,
      is_default:    self.is_default,
    })?)
  }

  fn from_row(row: EntityRow) -> Result<Self> {
    let p: Payload = serde_json::from_value(row.payload)?;
    Ok(Self {
      base:          row.base,
      number:        p.number,
      country_code:  p.country_code,
      phone_type:    p.phone_type,
      category_type: p.category_type,
      is_default:    p.is_default,
      documents:     Vec::new(),
    })
  }

  fn query_fields() -> &'static [QueryField] { FIELDS }

  fn documents(&self) -> &[Document] { &self.documents }

  fn documents_mut(&mut self) -> Option<&mut Vec<Document>> {
    Some(&mut self.documents)
  }
}

impl Defaultable for PhoneNumber {
  fn is_default(&self) -> bool { self.is_default }
}
