//! Postal addresses owned by a person.

use serde::{Deserialize, Serialize};
use strum::VariantNames;

use crate::{
  Result,
  contact::{AddressType, Defaultable, PostalAddressCategoryType},
  document::Document,
  entity::{EntityBase, EntityRow, Record},
  identity::{EntityIdentity, EntityType},
  query::{DataType, QueryField},
};

pub const COUNTRY_CODE_MAX_LEN: usize = 3;
pub const ZIP_CODE_MAX_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostalLines {
  pub street_name:   String,
  pub street_number: String,
  pub locality:      String,
  pub country_code:  String,
  pub zip_code:      String,
  pub area:          Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostalAddress {
  pub base:          EntityBase,
  pub street_name:   String,
  pub street_number: String,
  pub locality:      String,
  pub country_code:  String,
  pub zip_code:      String,
  pub area:          Option<String>,
  pub is_default:    bool,
  pub address_type:  AddressType,
  pub category_type: PostalAddressCategoryType,
  pub documents:     Vec<Document>,
}

#[derive(Serialize, Deserialize)]
struct Payload {
  street_name:   String,
  street_number: String,
  locality:      String,
  country_code:  String,
  zip_code:      String,
  area:          Option<String>,
  is_default:    bool,
  address_type:  AddressType,
  category_type: PostalAddressCategoryType,
}

impl PostalAddress {
  pub fn new(owner: EntityIdentity, lines: PostalLines) -> Self {
    let mut base = EntityBase::new(EntityType::PostalAddress);
    base.parent = Some(owner);
    Self {
      base,
      street_name: lines.street_name,
      street_number: lines.street_number,
      locality: lines.locality,
      country_code: lines.country_code,
      zip_code: lines.zip_code,
      area: lines.area,
      is_default: false,
      address_type: AddressType::default(),
      category_type: PostalAddressCategoryType::default(),
      documents: Vec::new(),
    }
  }

  pub fn owner(&self) -> Option<EntityIdentity> { self.base.parent }
}

const FIELDS: &[QueryField] = &[
  QueryField::payload("street_name", DataType::String),
  QueryField::payload("street_number", DataType::String),
  QueryField::payload("locality", DataType::String),
  QueryField::payload("country_code", DataType::String),
  QueryField::payload("zip_code", DataType::String),
  QueryField::payload("area", DataType::String),
  QueryField::payload("is_default", DataType::Boolean),
  QueryField::payload("address_type", DataType::Enum(AddressType::VARIANTS)),
  QueryField::payload(
    "category_type",
    DataType::Enum(PostalAddressCategoryType::VARIANTS),
  ),
];

impl Record for PostalAddress {
  const ENTITY_TYPE: EntityType = EntityType::PostalAddress;

  fn base(&self) -> &EntityBase { &self.base }

  fn base_mut(&mut self) -> &mut EntityBase { &mut self.base }

  fn payload(&self) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(Payload {
      street_name:   self.street_name.clone(),
      street_number: self.street_number.clone(),
      locality:      self.locality.clone(),
      country_code:  self.country_code.clone(),
      zip_code:      self.zip_code.clone(),
      area:          self.area.clone(),
      is_default:    self.is_default,
      address_type:  self.address_type,
      category_type: self.category_type,
    })?)
  }

  fn from_row(row: EntityRow) -> Result<Self> {
    let p: Payload = serde_json::from_value(row.payload)?;
    Ok(Self {
      base:          row.base,
      street_name:   p.street_name,
      street_number: p.street_number,
      locality:      p.locality,
      country_code:  p.country_code,
      zip_code:      p.zip_code,
      area:          p.area,
      is_default:    p.is_default,
      address_type:  p.address_type,
      category_type: p.category_type,
      documents:     Vec::new(),
    })
  }

  fn query_fields() -> &'static [QueryField] { FIELDS }

  fn documents(&self) -> &[Document] { &self.documents }

  fn documents_mut(&mut self) -> Option<&mut Vec<Document>> {
    Some(&mut self.documents)
  }
}

impl Defaultable for PostalAddress {
  fn is_default(&self) -> bool { self.is_default }
}
