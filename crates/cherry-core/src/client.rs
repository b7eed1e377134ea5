//! Client-side representations exchanged over the API.
//!
//! Client objects never embed their owner or their documents: both travel as
//! [`EntityIdentity`] references, which keeps every payload acyclic. A
//! person embeds its contact entities, each of which points back to the
//! person by identity only.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  contact::{
    AddressType, PhoneNumberCategoryType, PhoneNumberType,
    PostalAddressCategoryType,
  },
  document::DocumentType,
  entity::StatusType,
  identity::{EntityIdentity, EntityType},
  person::{GenderType, PersonType},
};

/// Fields shared by every client object.
///
/// `id` is absent for objects that have not been created yet. Audit fields
/// are informational; the server ignores them on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientBase {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id:          Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub entity_type: Option<EntityType>,
  pub name:        Option<String>,
  pub description: Option<String>,
  pub reference:   Option<String>,
  pub tags:        Vec<String>,
  pub status_type: StatusType,
  pub since:       Option<DateTime<Utc>>,
  pub created_at:  Option<DateTime<Utc>>,
  pub created_by:  Option<String>,
  pub modified_at: Option<DateTime<Utc>>,
  pub modified_by: Option<String>,
  pub parent:      Option<EntityIdentity>,
  pub documents:   Vec<EntityIdentity>,
}

/// Access to the shared fields of any client object.
pub trait ClientObject {
  fn base(&self) -> &ClientBase;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonClient {
  #[serde(flatten)]
  pub base:             ClientBase,
  pub last_name:        String,
  pub first_name:       String,
  pub birth_date:       Option<NaiveDate>,
  pub gender_type:      GenderType,
  pub person_type:      PersonType,
  pub email_addresses:  Vec<EmailAddressClient>,
  pub phone_numbers:    Vec<PhoneNumberClient>,
  pub postal_addresses: Vec<PostalAddressClient>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailAddressClient {
  #[serde(flatten)]
  pub base:         ClientBase,
  pub email:        String,
  pub is_default:   bool,
  pub address_type: AddressType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneNumberClient {
  #[serde(flatten)]
  pub base:          ClientBase,
  pub number:        String,
  pub country_code:  String,
  pub phone_type:    PhoneNumberType,
  pub category_type: PhoneNumberCategoryType,
  pub is_default:    bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostalAddressClient {
  #[serde(flatten)]
  pub base:          ClientBase,
  pub street_name:   String,
  pub street_number: String,
  pub locality:      String,
  pub country_code:  String,
  pub zip_code:      String,
  pub area:          Option<String>,
  pub is_default:    bool,
  pub address_type:  AddressType,
  pub category_type: PostalAddressCategoryType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentClient {
  #[serde(flatten)]
  pub base:           ClientBase,
  pub document_type:  DocumentType,
  pub filename:       Option<String>,
  pub extension:      Option<String>,
  pub mime_type:      Option<String>,
  pub content_id:     Option<Uuid>,
  pub content_length: Option<u64>,
  pub content_path:   Option<String>,
}

macro_rules! client_object {
  ($($ty:ty),* $(,)?) => {
    $(
      impl ClientObject for $ty {
        fn base(&self) -> &ClientBase { &self.base }
      }
    )*
  };
}

client_object!(
  PersonClient,
  EmailAddressClient,
  PhoneNumberClient,
  PostalAddressClient,
  DocumentClient,
);
