//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use cherry_core::{
  EntityIdentity, EntityType, Error as CoreError,
  client::{EmailAddressClient, PersonClient},
  document::{Document, DocumentType},
  email::EmailAddress,
  entity::Record,
  person::Person,
  query::EntityQuery,
  service::EntityService,
  store::{ContentStore, EntityStore},
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, FsContentStore, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person_with_email(last: &str, first: &str, email: &str) -> Person {
  let mut person = Person::new(last, first);
  let mut address = EmailAddress::new(person.identity(), email);
  address.is_default = true;
  person.add_email_address(address);
  person
}

async fn save(s: &SqliteStore, person: &Person) {
  s.save(person.rows().unwrap()).await.unwrap();
}

// ─── Rows ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_get_row() {
  let s = store().await;
  let person = person_with_email("Doe", "Jane", "jane@example.org");
  save(&s, &person).await;

  let row = s.get(person.identity()).await.unwrap().unwrap();
  assert_eq!(row.base.name.as_deref(), Some("Doe, Jane"));
  assert_eq!(row.payload["last_name"], "Doe");

  assert_eq!(s.count(EntityType::Person).await.unwrap(), 1);
  assert_eq!(s.count(EntityType::EmailAddress).await.unwrap(), 1);
  assert!(s.exists(person.identity()).await.unwrap());
}

#[tokio::test]
async fn get_with_wrong_type_is_absent() {
  let s = store().await;
  let person = Person::new("Doe", "Jane");
  save(&s, &person).await;

  let wrong = EntityIdentity::new(EntityType::Document, person.base.id());
  assert!(s.get(wrong).await.unwrap().is_none());
  assert!(!s.exists(wrong).await.unwrap());
}

#[tokio::test]
async fn upsert_preserves_creation_audit() {
  let s = store().await;
  let mut person = Person::new("Doe", "Jane");
  let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
  person.base.audit.touch("alice", created);
  save(&s, &person).await;

  // A fresh client-side copy never carries the original creation stamp.
  person.base.audit = Default::default();
  person.base.audit.touch("bob", Utc::now());
  person.set_names("Roe", "Jane");
  save(&s, &person).await;

  let row = s.get(person.identity()).await.unwrap().unwrap();
  assert_eq!(row.base.audit.created_at, Some(created));
  assert_eq!(row.base.audit.created_by.as_deref(), Some("alice"));
  assert_eq!(row.base.audit.modified_by.as_deref(), Some("bob"));
  assert_eq!(row.payload["last_name"], "Roe");
  assert_eq!(s.count(EntityType::Person).await.unwrap(), 1);
}

#[tokio::test]
async fn upsert_with_foreign_type_is_rejected() {
  let s = store().await;
  let person = Person::new("Doe", "Jane");
  save(&s, &person).await;

  let mut impostor = person.to_row().unwrap();
  impostor.base = cherry_core::entity::EntityBase::with_id(
    EntityType::Document,
    person.base.id(),
  );
  let err = s.save(vec![impostor]).await.unwrap_err();
  assert!(matches!(err, Error::EntityTypeConflict(id) if id == person.base.id()));
}

#[tokio::test]
async fn failed_save_is_atomic() {
  let s = store().await;
  let blocker = Person::new("Doe", "Jane");
  save(&s, &blocker).await;

  let fresh = Person::new("Roe", "John");
  let mut clash = blocker.to_row().unwrap();
  clash.base =
    cherry_core::entity::EntityBase::with_id(EntityType::Document, blocker.base.id());

  let mut rows = fresh.rows().unwrap();
  rows.push(clash);
  assert!(s.save(rows).await.is_err());
  assert!(!s.exists(fresh.identity()).await.unwrap());
}

// ─── Ownership ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn children_and_descendants() {
  let s = store().await;
  let mut person = person_with_email("Doe", "Jane", "jane@example.org");
  let email_identity = person.email_addresses[0].identity();
  let document =
    Document::new(email_identity, DocumentType::DocumentGeneric).unwrap();
  person.email_addresses[0].documents.push(document.clone());
  save(&s, &person).await;

  let emails = s
    .children(person.identity(), EntityType::EmailAddress)
    .await
    .unwrap();
  assert_eq!(emails.len(), 1);
  assert_eq!(emails[0].base.parent, Some(person.identity()));

  let all = s.descendants(person.identity()).await.unwrap();
  let ids: Vec<_> = all.iter().map(|r| r.base.identity()).collect();
  assert_eq!(all.len(), 2);
  assert!(ids.contains(&email_identity));
  assert!(ids.contains(&document.identity()));
}

#[tokio::test]
async fn delete_cascades_to_owned_rows() {
  let s = store().await;
  let person = person_with_email("Doe", "Jane", "jane@example.org");
  let other = person_with_email("Roe", "John", "john@example.org");
  save(&s, &person).await;
  save(&s, &other).await;

  assert!(s.delete(person.identity()).await.unwrap());
  assert!(!s.exists(person.identity()).await.unwrap());
  assert!(
    !s.exists(person.email_addresses[0].identity())
      .await
      .unwrap()
  );
  assert_eq!(s.count(EntityType::EmailAddress).await.unwrap(), 1);

  assert!(!s.delete(person.identity()).await.unwrap());
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_matches_payload_case_insensitively() {
  let s = store().await;
  save(&s, &Person::new("Duval", "Anne")).await;
  save(&s, &Person::new("duvalier", "Marc")).await;
  save(&s, &Person::new("Martin", "Paul")).await;

  let query =
    EntityQuery::from_json::<Person>(&json!({ "last_name": "DUVAL" })).unwrap();
  let rows = s.search(&query).await.unwrap();
  assert_eq!(rows.len(), 2);

  let query = EntityQuery::from_json::<Person>(&json!({
    "last_name": "duval",
    "first_name": "marc",
  }))
  .unwrap();
  assert_eq!(s.search(&query).await.unwrap().len(), 1);
}

#[tokio::test]
async fn search_by_boolean_and_enum() {
  let s = store().await;
  let mut person = person_with_email("Doe", "Jane", "jane@work.org");
  let mut spare = EmailAddress::new(person.identity(), "jane@home.org");
  spare.base.status.set_inactive();
  person.add_email_address(spare);
  save(&s, &person).await;

  let defaults =
    EntityQuery::from_json::<EmailAddress>(&json!({ "is_default": true }))
      .unwrap();
  let rows = s.search(&defaults).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].payload["email"], "jane@work.org");

  let inactive = EntityQuery::from_json::<EmailAddress>(&json!({
    "status_type": "INACTIVE",
  }))
  .unwrap();
  let rows = s.search(&inactive).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].payload["email"], "jane@home.org");
}

#[tokio::test]
async fn search_by_parent_and_date() {
  let s = store().await;
  let mut person = person_with_email("Doe", "Jane", "jane@example.org");
  person.birth_date = chrono::NaiveDate::from_ymd_opt(1980, 4, 2);
  save(&s, &person).await;
  save(&s, &person_with_email("Roe", "John", "john@example.org")).await;

  let by_parent = EntityQuery::from_json::<EmailAddress>(&json!({
    "parent_id": person.base.id().to_string(),
  }))
  .unwrap();
  assert_eq!(s.search(&by_parent).await.unwrap().len(), 1);

  let by_birth =
    EntityQuery::from_json::<Person>(&json!({ "birth_date": "1980-04-02" }))
      .unwrap();
  let rows = s.search(&by_birth).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].base.identity(), person.identity());
}

#[tokio::test]
async fn search_treats_like_wildcards_literally() {
  let s = store().await;
  save(&s, &Person::new("100%", "Pure")).await;
  save(&s, &Person::new("1000", "Plain")).await;

  let query =
    EntityQuery::from_json::<Person>(&json!({ "last_name": "0%" })).unwrap();
  assert_eq!(s.search(&query).await.unwrap().len(), 1);
}

#[tokio::test]
async fn search_honours_limit_and_offset() {
  let s = store().await;
  for first in ["A", "B", "C"] {
    save(&s, &Person::new("Same", first)).await;
  }

  let query = EntityQuery::from_json::<Person>(&json!({
    "last_name": "same",
    "limit": 2,
  }))
  .unwrap();
  assert_eq!(s.search(&query).await.unwrap().len(), 2);

  let query = EntityQuery::from_json::<Person>(&json!({
    "last_name": "same",
    "offset": "2",
  }))
  .unwrap();
  assert_eq!(s.search(&query).await.unwrap().len(), 1);
}

// ─── Content ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn content_put_get_remove() {
  let dir = tempfile::tempdir().unwrap();
  let content = FsContentStore::open(dir.path().join("content"))
    .await
    .unwrap();
  let id = Uuid::new_v4();

  let path = content.put(id, b"hello".to_vec()).await.unwrap();
  assert!(path.ends_with(&id.to_string()));
  assert_eq!(content.get(id).await.unwrap().as_deref(), Some(&b"hello"[..]));

  content.remove(id).await.unwrap();
  assert!(content.get(id).await.unwrap().is_none());
  content.remove(id).await.unwrap();
}

// ─── Service over SQLite ─────────────────────────────────────────────────────

async fn service(
  dir: &tempfile::TempDir,
) -> EntityService<SqliteStore, FsContentStore> {
  let content = FsContentStore::open(dir.path()).await.unwrap();
  EntityService::new(Arc::new(store().await), Arc::new(content), "tester")
}

#[tokio::test]
async fn service_create_resolves_full_graph() {
  let dir = tempfile::tempdir().unwrap();
  let svc = service(&dir).await;

  let client = PersonClient {
    last_name: "Doe".into(),
    first_name: "Jane".into(),
    email_addresses: vec![EmailAddressClient {
      email: "jane@example.org".into(),
      is_default: true,
      ..Default::default()
    }],
    ..Default::default()
  };
  let person: Person = svc.create(client).await.unwrap();
  assert_eq!(person.email_addresses.len(), 1);
  assert_eq!(
    person.base.audit.created_by.as_deref(),
    Some("tester")
  );

  let fetched: Person = svc.get(person.base.id()).await.unwrap();
  assert_eq!(fetched.email_addresses[0].email, "jane@example.org");
  assert_eq!(fetched.email_addresses[0].owner(), Some(person.identity()));
}

#[tokio::test]
async fn service_delete_removes_document_content() {
  let dir = tempfile::tempdir().unwrap();
  let svc = service(&dir).await;

  let person: Person = svc.random(None).await.unwrap();
  let document = svc
    .upload_document(
      person.identity(),
      DocumentType::DocumentPhoto,
      "portrait.png",
      vec![1, 2, 3],
    )
    .await
    .unwrap();
  let content_id = document.content_id.unwrap();

  let (_, bytes) = svc.document_content(document.base.id()).await.unwrap();
  assert_eq!(bytes, vec![1, 2, 3]);

  svc.delete::<Person>(person.base.id()).await.unwrap();
  assert!(!dir.path().join(content_id.to_string()).exists());
  assert!(matches!(
    svc.get::<Document>(document.base.id()).await,
    Err(CoreError::NotFound(_))
  ));
}
