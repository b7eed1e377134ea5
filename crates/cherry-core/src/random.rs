//! Random entity generation backing the `random` endpoints.

use chrono::{Days, NaiveDate};
use fake::{
  Fake,
  faker::{
    address::en::{BuildingNumber, CityName, CountryCode, StateName, StreetName, ZipCode},
    internet::en::SafeEmail,
    lorem::en::{Sentence, Words},
    name::en::{FirstName, LastName},
    phone_number::en::PhoneNumber as FakePhoneNumber,
  },
};
use rand::{Rng, seq::IteratorRandom};
use strum::IntoEnumIterator;

use crate::{
  Result,
  email::EmailAddress,
  entity::{EntityBase, Record},
  identity::{EntityIdentity, EntityType},
  person::Person,
  phone::PhoneNumber,
  postal::{PostalAddress, PostalLines},
  validation::ensure_person_owner,
};

/// Generate a plausible, valid instance.
pub trait Randomize: Record {
  /// `owner` is required for owned types and ignored otherwise.
  fn random(owner: Option<EntityIdentity>) -> Result<Self>;
}

fn pick<T: IntoEnumIterator + Default>() -> T {
  T::iter()
    .choose(&mut rand::thread_rng())
    .unwrap_or_default()
}

fn populate(base: &mut EntityBase) {
  let mut rng = rand::thread_rng();
  base.description = Some(Sentence(3..8).fake());
  base.reference = Some(format!("REF-{:05}", rng.gen_range(0..100_000)));
  base.tags = Words(1..4).fake();
}

impl Randomize for Person {
  fn random(_owner: Option<EntityIdentity>) -> Result<Self> {
    let mut person = Person::new(
      LastName().fake::<String>(),
      FirstName().fake::<String>(),
    );
    populate(&mut person.base);

    let earliest = NaiveDate::from_ymd_opt(1930, 1, 1).unwrap_or_default();
    let offset = rand::thread_rng().gen_range(0..27_000);
    person.birth_date = earliest.checked_add_days(Days::new(offset));
    person.gender_type = pick();
    person.person_type = pick();

    let owner = Some(person.identity());
    let mut email = EmailAddress::random(owner)?;
    email.is_default = true;
    person.add_email_address(email);
    let mut phone = PhoneNumber::random(owner)?;
    phone.is_default = true;
    person.add_phone_number(phone);
    Ok(person)
  }
}

impl Randomize for EmailAddress {
  fn random(owner: Option<EntityIdentity>) -> Result<Self> {
    let owner = ensure_person_owner(EntityType::EmailAddress, owner)?;
    let mut email = EmailAddress::new(owner, SafeEmail().fake::<String>());
    populate(&mut email.base);
    email.address_type = pick();
    Ok(email)
  }
}

impl Randomize for PhoneNumber {
  fn random(owner: Option<EntityIdentity>) -> Result<Self> {
    let owner = ensure_person_owner(EntityType::PhoneNumber, owner)?;
    let country_code = rand::thread_rng().gen_range(1..=999).to_string();
    let mut phone =
      PhoneNumber::new(owner, FakePhoneNumber().fake::<String>(), country_code);
    populate(&mut phone.base);
    phone.phone_type = pick();
    phone.category_type = pick();
    Ok(phone)
  }
}

impl Randomize for PostalAddress {
  fn random(owner: Option<EntityIdentity>) -> Result<Self> {
    let owner = ensure_person_owner(EntityType::PostalAddress, owner)?;
    let zip_code: String = ZipCode().fake();
    let mut postal = PostalAddress::new(owner, PostalLines {
      street_name:   StreetName().fake(),
      street_number: BuildingNumber().fake(),
      locality:      CityName().fake(),
      country_code:  CountryCode().fake::<String>().to_uppercase(),
      zip_code:      zip_code.chars().take(7).collect(),
      area:          Some(StateName().fake()),
    });
    populate(&mut postal.base);
    postal.address_type = pick();
    postal.category_type = pick();
    Ok(postal)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::validation::{check_email_format, check_person, check_phone, check_postal};

  #[test]
  fn random_person_is_valid_and_owns_its_contacts() {
    let person = Person::random(None).unwrap();
    check_person(&person).unwrap();
    assert!(person.has_default_email_address());
    for email in &person.email_addresses {
      check_email_format(&email.email).unwrap();
      assert_eq!(email.owner(), Some(person.identity()));
    }
    for phone in &person.phone_numbers {
      check_phone(phone).unwrap();
    }
  }

  #[test]
  fn random_postal_address_is_valid() {
    let owner = Person::new("Doe", "Jane").identity();
    let postal = PostalAddress::random(Some(owner)).unwrap();
    check_postal(&postal).unwrap();
    assert_eq!(postal.owner(), Some(owner));
  }

  #[test]
  fn owned_types_need_a_person_owner() {
    assert!(EmailAddress::random(None).is_err());
    let doc = EntityIdentity::new(EntityType::Document, uuid::Uuid::new_v4());
    assert!(PhoneNumber::random(Some(doc)).is_err());
  }
}
