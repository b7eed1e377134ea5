//! Persons and the contact entities they own.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use uuid::Uuid;

use crate::{
  Result,
  contact::AddressType,
  document::Document,
  email::EmailAddress,
  entity::{EntityBase, EntityRow, Record, StatusType, load_children},
  identity::EntityType,
  phone::PhoneNumber,
  postal::PostalAddress,
  query::{DataType, QueryField},
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum GenderType {
  #[default]
  Unknown,
  Male,
  Female,
  Other,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum PersonType {
  #[default]
  Unknown,
  Physical,
  Moral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
  pub base:             EntityBase,
  pub last_name:        String,
  pub first_name:       String,
  pub birth_date:       Option<NaiveDate>,
  pub gender_type:      GenderType,
  pub person_type:      PersonType,
  pub documents:        Vec<Document>,
  pub email_addresses:  Vec<EmailAddress>,
  pub phone_numbers:    Vec<PhoneNumber>,
  pub postal_addresses: Vec<PostalAddress>,
}

#[derive(Serialize, Deserialize)]
struct Payload {
  last_name:   String,
  first_name:  String,
  birth_date:  Option<NaiveDate>,
  gender_type: GenderType,
  person_type: PersonType,
}

impl Person {
  pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
    let mut person = Self {
      base:             EntityBase::new(EntityType::Person),
      last_name:        String::new(),
      first_name:       String::new(),
      birth_date:       None,
      gender_type:      GenderType::default(),
      person_type:      PersonType::default(),
      documents:        Vec::new(),
      email_addresses:  Vec::new(),
      phone_numbers:    Vec::new(),
      postal_addresses: Vec::new(),
    };
    person.set_names(last_name, first_name);
    person
  }

  /// Set both names; the entity name follows as `"last, first"`.
  pub fn set_names(
    &mut self,
    last_name: impl Into<String>,
    first_name: impl Into<String>,
  ) {
    self.last_name = last_name.into();
    self.first_name = first_name.into();
    self.base.name = Some(self.full_name());
  }

  pub fn full_name(&self) -> String {
    format!("{}, {}", self.last_name, self.first_name)
  }

  // ── Ownership ─────────────────────────────────────────────────────────

  pub fn add_email_address(&mut self, mut email: EmailAddress) {
    email.base.parent = Some(self.identity());
    self.email_addresses.push(email);
  }

  pub fn add_phone_number(&mut self, mut phone: PhoneNumber) {
    phone.base.parent = Some(self.identity());
    self.phone_numbers.push(phone);
  }

  pub fn add_postal_address(&mut self, mut postal: PostalAddress) {
    postal.base.parent = Some(self.identity());
    self.postal_addresses.push(postal);
  }

  // ── Email lookups ─────────────────────────────────────────────────────

  /// The active email address flagged as default, if any.
  pub fn default_email_address(&self) -> Option<&EmailAddress> {
    self
      .email_addresses
      .iter()
      .find(|e| e.is_default && e.base.is_active())
  }

  pub fn has_default_email_address(&self) -> bool {
    self.default_email_address().is_some()
  }

  pub fn exist_email(&self, email: &str) -> bool {
    self
      .email_addresses
      .iter()
      .any(|e| e.email.eq_ignore_ascii_case(email))
  }

  pub fn email_address_by_id(&self, id: Uuid) -> Option<&EmailAddress> {
    self.email_addresses.iter().find(|e| e.base.id() == id)
  }

  pub fn email_addresses_by_type(
    &self,
    address_type: AddressType,
  ) -> impl Iterator<Item = &EmailAddress> {
    self
      .email_addresses
      .iter()
      .filter(move |e| e.address_type == address_type)
  }

  pub fn email_addresses_by_status(
    &self,
    status_type: StatusType,
  ) -> impl Iterator<Item = &EmailAddress> {
    self
      .email_addresses
      .iter()
      .filter(move |e| e.base.status.status_type() == status_type)
  }

  // ── Postal lookups ────────────────────────────────────────────────────

  pub fn default_postal_address(&self) -> Option<&PostalAddress> {
    self
      .postal_addresses
      .iter()
      .find(|p| p.is_default && p.base.is_active())
  }

  pub fn postal_addresses_by_type(
    &self,
    address_type: AddressType,
  ) -> impl Iterator<Item = &PostalAddress> {
    self
      .postal_addresses
      .iter()
      .filter(move |p| p.address_type == address_type)
  }

  pub fn postal_addresses_by_status(
    &self,
    status_type: StatusType,
  ) -> impl Iterator<Item = &PostalAddress> {
    self
      .postal_addresses
      .iter()
      .filter(move |p| p.base.status.status_type() == status_type)
  }

  pub fn default_phone_number(&self) -> Option<&PhoneNumber> {
    self
      .phone_numbers
      .iter()
      .find(|p| p.is_default && p.base.is_active())
  }
}

const FIELDS: &[QueryField] = &[
  QueryField::payload("last_name", DataType::String),
  QueryField::payload("first_name", DataType::String),
  QueryField::payload("birth_date", DataType::Date),
  QueryField::payload("gender_type", DataType::Enum(GenderType::VARIANTS)),
  QueryField::payload("person_type", DataType::Enum(PersonType::VARIANTS)),
];

impl Record for Person {
  const ENTITY_TYPE: EntityType = EntityType::Person;

  fn base(&self) -> &EntityBase { &self.base }

  fn base_mut(&mut self) -> &mut EntityBase { &mut self.base }

  fn payload(&self) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(Payload {
      last_name:   self.last_name.clone(),
      first_name:  self.first_name.clone(),
      birth_date:  self.birth_date,
      gender_type: self.gender_type,
      person_type: self.person_type,
    })?)
  }

  fn from_row(row: EntityRow) -> Result<Self> {
    let p: Payload = serde_json::from_value(row.payload)?;
    Ok(Self {
      base:             row.base,
      last_name:        p.last_name,
      first_name:       p.first_name,
      birth_date:       p.birth_date,
      gender_type:      p.gender_type,
      person_type:      p.person_type,
      documents:        Vec::new(),
      email_addresses:  Vec::new(),
      phone_numbers:    Vec::new(),
      postal_addresses: Vec::new(),
    })
  }

  fn query_fields() -> &'static [QueryField] { FIELDS }

  fn documents(&self) -> &[Document] { &self.documents }

  fn documents_mut(&mut self) -> Option<&mut Vec<Document>> {
    Some(&mut self.documents)
  }

  fn all_documents_mut(&mut self) -> Vec<&mut Document> {
    let mut all: Vec<&mut Document> = self.documents.iter_mut().collect();
    for email in &mut self.email_addresses {
      all.extend(email.documents.iter_mut());
    }
    for phone in &mut self.phone_numbers {
      all.extend(phone.documents.iter_mut());
    }
    for postal in &mut self.postal_addresses {
      all.extend(postal.documents.iter_mut());
    }
    all
  }

  fn rows(&self) -> Result<Vec<EntityRow>> {
    let mut rows = vec![self.to_row()?];
    for document in &self.documents {
      rows.push(document.to_row()?);
    }
    for email in &self.email_addresses {
      rows.extend(email.rows()?);
    }
    for phone in &self.phone_numbers {
      rows.extend(phone.rows()?);
    }
    for postal in &self.postal_addresses {
      rows.extend(postal.rows()?);
    }
    Ok(rows)
  }

  fn attach(&mut self, descendants: &[EntityRow]) -> Result<()> {
    let identity = self.identity();
    self.documents = load_children(descendants, identity)?;
    self.email_addresses = load_children(descendants, identity)?;
    self.phone_numbers = load_children(descendants, identity)?;
    self.postal_addresses = load_children(descendants, identity)?;
    Ok(())
  }
}
