//! Validation rules applied before an entity graph is saved.
//!
//! Rules that only need the entity itself are plain functions. Rules that
//! span siblings (the default flag, email uniqueness) compare the candidate
//! against what the owner already has in the store, with in-flight versions
//! replacing their stored counterparts.

use std::{future::Future, sync::LazyLock};

use chrono::{NaiveDate, Utc};
use regex::Regex;

use crate::{
  Error, Result,
  contact::Defaultable,
  email::EmailAddress,
  entity::Record,
  identity::{EntityIdentity, EntityType},
  person::Person,
  phone::{self, PhoneNumber},
  postal::{self, PostalAddress},
  store::EntityStore,
};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[A-Za-z0-9._%+'\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
    .expect("email pattern compiles")
});

/// Earliest accepted birth date.
pub fn min_birth_date() -> NaiveDate {
  NaiveDate::from_ymd_opt(1500, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Store-aware validation of an entity graph about to be saved.
pub trait Validate: Record {
  fn validate<S: EntityStore>(
    &self,
    store: &S,
  ) -> impl Future<Output = Result<()>> + Send;
}

// ─── Single-entity rules ─────────────────────────────────────────────────────

pub fn check_email_format(email: &str) -> Result<()> {
  if !EMAIL.is_match(email) {
    return Err(Error::InvalidEmail(email.to_owned()));
  }
  Ok(())
}

/// Contacts must hang off a person.
pub fn ensure_person_owner(
  entity_type: EntityType,
  owner: Option<EntityIdentity>,
) -> Result<EntityIdentity> {
  match owner {
    Some(owner) if owner.entity_type() == EntityType::Person => Ok(owner),
    other => Err(Error::InvalidOwner {
      entity: entity_type,
      found:  other.map(|o| o.entity_type()),
    }),
  }
}

fn required(
  entity_type: EntityType,
  field: &str,
  value: &str,
  max_len: Option<usize>,
) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(entity_type, format!("{field} is required")));
  }
  if let Some(max) = max_len
    && value.chars().count() > max
  {
    return Err(Error::validation(
      entity_type,
      format!("{field} must be at most {max} characters"),
    ));
  }
  Ok(())
}

pub fn check_person(person: &Person) -> Result<()> {
  required(EntityType::Person, "last_name", &person.last_name, None)?;
  required(EntityType::Person, "first_name", &person.first_name, None)?;
  if let Some(birth_date) = person.birth_date {
    let min = min_birth_date();
    if birth_date < min {
      return Err(Error::validation(
        EntityType::Person,
        format!("birth_date must not be before {min}"),
      ));
    }
    if birth_date > Utc::now().date_naive() {
      return Err(Error::validation(
        EntityType::Person,
        "birth_date must not be in the future",
      ));
    }
  }
  Ok(())
}

pub fn check_phone(entry: &PhoneNumber) -> Result<()> {
  let t = EntityType::PhoneNumber;
  required(t, "number", &entry.number, Some(phone::NUMBER_MAX_LEN))?;
  required(
    t,
    "country_code",
    &entry.country_code,
    Some(phone::COUNTRY_CODE_MAX_LEN),
  )
}

pub fn check_postal(entry: &PostalAddress) -> Result<()> {
  let t = EntityType::PostalAddress;
  required(t, "street_name", &entry.street_name, None)?;
  required(t, "street_number", &entry.street_number, None)?;
  required(t, "locality", &entry.locality, None)?;
  required(
    t,
    "country_code",
    &entry.country_code,
    Some(postal::COUNTRY_CODE_MAX_LEN),
  )?;
  required(t, "zip_code", &entry.zip_code, Some(postal::ZIP_CODE_MAX_LEN))
}

// ─── Sibling rules ───────────────────────────────────────────────────────────

/// At most one active entry may carry the default flag.
pub fn ensure_single_default<E: Defaultable>(
  owner: EntityIdentity,
  entries: &[E],
) -> Result<()> {
  let defaults = entries
    .iter()
    .filter(|e| e.is_default() && e.base().is_active())
    .count();
  if defaults > 1 {
    return Err(Error::DefaultAlreadySet {
      owner,
      entity_type: E::ENTITY_TYPE,
    });
  }
  Ok(())
}

/// Email addresses must be unique per owner, ignoring case.
pub fn ensure_unique_emails(entries: &[EmailAddress]) -> Result<()> {
  for (i, entry) in entries.iter().enumerate() {
    if entries[..i]
      .iter()
      .any(|other| other.email.eq_ignore_ascii_case(&entry.email))
    {
      return Err(Error::DuplicateEmail(entry.email.clone()));
    }
  }
  Ok(())
}

/// The owner's stored children of type `E`, with `candidates` replacing
/// stored rows of the same id and appended otherwise.
pub async fn siblings<E, S>(
  store: &S,
  owner: EntityIdentity,
  candidates: &[E],
) -> Result<Vec<E>>
where
  E: Record,
  S: EntityStore,
{
  let stored = store
    .children(owner, E::ENTITY_TYPE)
    .await
    .map_err(Error::store)?;
  let mut merged = stored
    .into_iter()
    .filter(|row| !candidates.iter().any(|c| c.base().id() == row.base.id()))
    .map(E::from_row)
    .collect::<Result<Vec<_>>>()?;
  merged.extend(candidates.iter().cloned());
  Ok(merged)
}

// ─── Validate impls ──────────────────────────────────────────────────────────

impl Validate for Person {
  async fn validate<S: EntityStore>(&self, store: &S) -> Result<()> {
    check_person(self)?;
    let owner = self.identity();

    for email in &self.email_addresses {
      check_email_format(&email.email)?;
    }
    let emails = siblings(store, owner, &self.email_addresses).await?;
    ensure_unique_emails(&emails)?;
    ensure_single_default(owner, &emails)?;

    for phone in &self.phone_numbers {
      check_phone(phone)?;
    }
    let phones = siblings(store, owner, &self.phone_numbers).await?;
    ensure_single_default(owner, &phones)?;

    for postal in &self.postal_addresses {
      check_postal(postal)?;
    }
    let postals = siblings(store, owner, &self.postal_addresses).await?;
    ensure_single_default(owner, &postals)
  }
}

impl Validate for EmailAddress {
  async fn validate<S: EntityStore>(&self, store: &S) -> Result<()> {
    check_email_format(&self.email)?;
    let owner = ensure_person_owner(EntityType::EmailAddress, self.owner())?;
    let emails = siblings(store, owner, std::slice::from_ref(self)).await?;
    ensure_unique_emails(&emails)?;
    ensure_single_default(owner, &emails)
  }
}

impl Validate for PhoneNumber {
  async fn validate<S: EntityStore>(&self, store: &S) -> Result<()> {
    check_phone(self)?;
    let owner = ensure_person_owner(EntityType::PhoneNumber, self.owner())?;
    let phones = siblings(store, owner, std::slice::from_ref(self)).await?;
    ensure_single_default(owner, &phones)
  }
}

impl Validate for PostalAddress {
  async fn validate<S: EntityStore>(&self, store: &S) -> Result<()> {
    check_postal(self)?;
    let owner = ensure_person_owner(EntityType::PostalAddress, self.owner())?;
    let postals = siblings(store, owner, std::slice::from_ref(self)).await?;
    ensure_single_default(owner, &postals)
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::{postal::PostalLines, testing::MemoryStore};

  fn stored_person(store: &MemoryStore) -> Person {
    let person = Person::new("Berners-Lee", "Tim");
    store.insert_all(person.rows().unwrap());
    person
  }

  fn email(owner: &Person, address: &str, is_default: bool) -> EmailAddress {
    let mut e = EmailAddress::new(owner.identity(), address);
    e.is_default = is_default;
    e
  }

  #[test]
  fn email_format() {
    assert!(check_email_format("tim@w3.org").is_ok());
    assert!(check_email_format("o'brien+tag@mail.example.co.uk").is_ok());
    assert!(check_email_format("tim@").is_err());
    assert!(check_email_format("no-at-sign.org").is_err());
    assert!(check_email_format("two@@w3.org").is_err());
  }

  #[test]
  fn birth_date_bounds() {
    let mut p = Person::new("Newton", "Isaac");
    p.birth_date = NaiveDate::from_ymd_opt(1643, 1, 4);
    assert!(check_person(&p).is_ok());

    p.birth_date = NaiveDate::from_ymd_opt(1499, 12, 31);
    assert!(check_person(&p).is_err());

    p.birth_date = Some(Utc::now().date_naive() + chrono::Days::new(2));
    assert!(check_person(&p).is_err());
  }

  #[test]
  fn postal_lengths() {
    let owner = EntityIdentity::new(EntityType::Person, Uuid::new_v4());
    let mut postal = PostalAddress::new(owner, PostalLines {
      street_name:   "Rue de Rivoli".into(),
      street_number: "99".into(),
      locality:      "Paris".into(),
      country_code:  "FR".into(),
      zip_code:      "75001".into(),
      area:          None,
    });
    assert!(check_postal(&postal).is_ok());

    postal.zip_code = "12345678901".into();
    assert!(check_postal(&postal).is_err());

    postal.zip_code = "75001".into();
    postal.locality = "  ".into();
    assert!(check_postal(&postal).is_err());
  }

  #[tokio::test]
  async fn second_active_default_email_is_rejected() {
    let store = MemoryStore::default();
    let person = stored_person(&store);
    store.insert_all(vec![email(&person, "tim@w3.org", true).to_row().unwrap()]);

    let err = email(&person, "tim@cern.ch", true)
      .validate(&store)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::DefaultAlreadySet { .. }));

    assert!(email(&person, "tim@cern.ch", false).validate(&store).await.is_ok());
  }

  #[tokio::test]
  async fn inactive_default_does_not_count() {
    let store = MemoryStore::default();
    let person = stored_person(&store);
    let mut old = email(&person, "old@w3.org", true);
    old.base.status.set_inactive();
    store.insert_all(vec![old.to_row().unwrap()]);

    assert!(email(&person, "tim@w3.org", true).validate(&store).await.is_ok());
  }

  #[tokio::test]
  async fn updating_the_default_itself_is_allowed() {
    let store = MemoryStore::default();
    let person = stored_person(&store);
    let mut current = email(&person, "tim@w3.org", true);
    store.insert_all(vec![current.to_row().unwrap()]);

    current.address_type = crate::contact::AddressType::Professional;
    assert!(current.validate(&store).await.is_ok());
  }

  #[tokio::test]
  async fn duplicate_email_is_rejected_case_insensitively() {
    let store = MemoryStore::default();
    let person = stored_person(&store);
    store.insert_all(vec![email(&person, "tim@w3.org", false).to_row().unwrap()]);

    let err = email(&person, "TIM@W3.ORG", false)
      .validate(&store)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::DuplicateEmail(_)));
  }

  #[tokio::test]
  async fn email_must_belong_to_a_person() {
    let store = MemoryStore::default();
    let owner = EntityIdentity::new(EntityType::Document, Uuid::new_v4());
    let err = EmailAddress::new(owner, "a@b.org")
      .validate(&store)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::InvalidOwner { .. }));
  }

  #[tokio::test]
  async fn person_graph_checks_defaults_across_nested_contacts() {
    let store = MemoryStore::default();
    let mut person = Person::new("Hopper", "Grace");
    person.add_email_address(email(&person, "a@navy.mil", true));
    person.add_email_address(email(&person, "b@navy.mil", true));

    let err = person.validate(&store).await.unwrap_err();
    assert!(matches!(err, Error::DefaultAlreadySet { .. }));
  }
}
