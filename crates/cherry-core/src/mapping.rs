//! Conversion between server entities and client objects.
//!
//! Server to client is synchronous: documents collapse to identities and
//! nested contacts keep only their owner's identity. Client to server is
//! asynchronous because every identity a client object mentions must be
//! resolved against the store.
//!
//! A [`MappingContext`] is threaded through one whole conversion. It records
//! which entities are currently being mapped, so a nested child pointing back
//! at a not-yet-persisted parent is accepted without a store lookup, and it
//! memoises results so an entity reachable twice is only converted once.

use std::{
  any::Any,
  collections::{HashMap, HashSet},
  future::Future,
};

use serde::{Serialize, de::DeserializeOwned};
use strum::IntoEnumIterator;

use crate::{
  Error, Result,
  client::{
    ClientBase, ClientObject, DocumentClient, EmailAddressClient, PersonClient,
    PhoneNumberClient, PostalAddressClient,
  },
  document::Document,
  email::EmailAddress,
  entity::{EntityBase, Record, Status},
  identity::{EntityIdentity, EntityType},
  person::Person,
  phone::PhoneNumber,
  postal::PostalAddress,
  store::EntityStore,
};

// ─── Context ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MappingContext {
  in_progress: HashSet<EntityIdentity>,
  resolved:    HashSet<EntityIdentity>,
  mapped:      HashMap<EntityIdentity, Box<dyn Any + Send>>,
}

impl MappingContext {
  pub fn new() -> Self { Self::default() }

  /// Mark `identity` as being mapped. Returns `false` when it is already in
  /// progress or was already handled by this context.
  pub fn enter(&mut self, identity: EntityIdentity) -> bool {
    !self.resolved.contains(&identity) && self.in_progress.insert(identity)
  }

  /// Finish mapping `identity`; later references to it resolve locally.
  pub fn leave(&mut self, identity: EntityIdentity) {
    self.in_progress.remove(&identity);
    self.resolved.insert(identity);
  }

  /// A previously memoised conversion result for `identity`.
  pub fn mapped<T: Clone + 'static>(&self, identity: EntityIdentity) -> Option<T> {
    self.mapped.get(&identity)?.downcast_ref::<T>().cloned()
  }

  pub fn remember<T: Clone + Send + 'static>(
    &mut self,
    identity: EntityIdentity,
    value: &T,
  ) {
    self.mapped.insert(identity, Box::new(value.clone()));
  }

  /// Check that `identity` refers to an entity that exists, either in the
  /// store or in the graph being mapped.
  pub async fn resolve<S: EntityStore>(
    &mut self,
    store: &S,
    identity: EntityIdentity,
  ) -> Result<()> {
    if self.in_progress.contains(&identity) || self.resolved.contains(&identity) {
      return Ok(());
    }
    if !store.exists(identity).await.map_err(Error::store)? {
      return Err(Error::UnresolvedIdentity(identity));
    }
    self.resolved.insert(identity);
    Ok(())
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Server entity to client object.
pub trait ToClient: Record {
  type Client: ClientObject
    + Clone
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static;

  /// Convert this entity, mapping nested entities through `ctx`.
  fn map_to_client(&self, ctx: &mut MappingContext) -> Self::Client;

  /// Memoised conversion within an existing context.
  fn to_client_in(&self, ctx: &mut MappingContext) -> Self::Client {
    let identity = self.identity();
    if let Some(client) = ctx.mapped::<Self::Client>(identity) {
      return client;
    }
    let client = self.map_to_client(ctx);
    ctx.remember(identity, &client);
    client
  }

  fn to_client(&self) -> Self::Client {
    self.to_client_in(&mut MappingContext::new())
  }
}

/// Client object to server entity.
pub trait FromClient: ToClient {
  fn map_from_client<S: EntityStore>(
    client: Self::Client,
    ctx: &mut MappingContext,
    store: &S,
  ) -> impl Future<Output = Result<Self>> + Send;
}

/// Convert a client object in a fresh context.
pub async fn from_client<E, S>(client: E::Client, store: &S) -> Result<E>
where
  E: FromClient,
  S: EntityStore,
{
  E::map_from_client(client, &mut MappingContext::new(), store).await
}

/// Load the live entity behind `identity`, with everything it owns.
pub async fn resolve<E, S>(store: &S, identity: EntityIdentity) -> Result<E>
where
  E: Record,
  S: EntityStore,
{
  if identity.entity_type() != E::ENTITY_TYPE {
    return Err(Error::WrongEntityType {
      expected: E::ENTITY_TYPE,
      found:    identity.entity_type(),
    });
  }
  let row = store
    .get(identity)
    .await
    .map_err(Error::store)?
    .ok_or(Error::UnresolvedIdentity(identity))?;
  let descendants = store.descendants(identity).await.map_err(Error::store)?;
  let mut entity = E::from_row(row)?;
  entity.attach(&descendants)?;
  Ok(entity)
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

fn client_base(base: &EntityBase, documents: &[Document]) -> ClientBase {
  ClientBase {
    id:          Some(base.id()),
    entity_type: Some(base.entity_type()),
    name:        base.name.clone(),
    description: base.description.clone(),
    reference:   base.reference.clone(),
    tags:        base.tags.clone(),
    status_type: base.status.status_type(),
    since:       base.status.since(),
    created_at:  base.audit.created_at,
    created_by:  base.audit.created_by.clone(),
    modified_at: base.audit.modified_at,
    modified_by: base.audit.modified_by.clone(),
    parent:      base.parent,
    documents:   documents.iter().map(Record::identity).collect(),
  }
}

/// Build the server base. Audit fields are server-owned and left empty.
fn server_base(client: &ClientBase, entity_type: EntityType) -> Result<EntityBase> {
  if let Some(found) = client.entity_type
    && found != entity_type
  {
    return Err(Error::WrongEntityType {
      expected: entity_type,
      found,
    });
  }
  let mut base = match client.id {
    Some(id) => EntityBase::with_id(entity_type, id),
    None => EntityBase::new(entity_type),
  };
  base.name = client.name.clone();
  base.description = client.description.clone();
  base.reference = client.reference.clone();
  base.tags = client.tags.clone();
  base.status = Status::from_parts(client.status_type, client.since);
  base.parent = client.parent;
  Ok(base)
}

/// A client-supplied id must not already name an entity of another type,
/// and a stored entity keeps the owner it was created under.
async fn check_stored<S: EntityStore>(base: &EntityBase, store: &S) -> Result<()> {
  let expected = base.entity_type();
  for other in EntityType::iter().filter(|t| *t != expected) {
    let identity = EntityIdentity::new(other, base.id());
    if store.exists(identity).await.map_err(Error::store)? {
      return Err(Error::WrongEntityType {
        expected,
        found: other,
      });
    }
  }
  let stored = store.get(base.identity()).await.map_err(Error::store)?;
  if let Some(owner) = stored.and_then(|row| row.base.parent)
    && base.parent != Some(owner)
  {
    return Err(Error::OwnerChanged {
      entity: base.identity(),
      owner,
    });
  }
  Ok(())
}

fn enter(ctx: &mut MappingContext, identity: EntityIdentity) -> Result<()> {
  if !ctx.enter(identity) {
    return Err(Error::validation(
      identity.entity_type(),
      format!("{identity} appears more than once"),
    ));
  }
  Ok(())
}

/// Point a nested child at `owner`, rejecting a conflicting declaration.
fn adopt(
  child: &mut ClientBase,
  child_type: EntityType,
  owner: EntityIdentity,
) -> Result<()> {
  match child.parent {
    Some(declared) if declared != owner => Err(Error::ParentMismatch {
      child: child_type,
      declared,
      actual: owner,
    }),
    _ => {
      child.parent = Some(owner);
      Ok(())
    }
  }
}

/// Resolve document identities listed by `owner`. Each must already exist
/// and belong to `owner`.
async fn resolve_documents<S: EntityStore>(
  identities: &[EntityIdentity],
  owner: EntityIdentity,
  ctx: &mut MappingContext,
  store: &S,
) -> Result<Vec<Document>> {
  let mut documents = Vec::with_capacity(identities.len());
  for &identity in identities {
    let document: Document = resolve(store, identity).await?;
    if let Some(declared) = document.owner()
      && declared != owner
    {
      return Err(Error::ParentMismatch {
        child: EntityType::Document,
        declared,
        actual: owner,
      });
    }
    ctx.resolved.insert(identity);
    documents.push(document);
  }
  Ok(documents)
}

/// Base for an owned contact: the owner must resolve.
async fn contact_base<S: EntityStore>(
  client: &ClientBase,
  entity_type: EntityType,
  ctx: &mut MappingContext,
  store: &S,
) -> Result<EntityBase> {
  let base = server_base(client, entity_type)?;
  let owner = base.parent.ok_or(Error::InvalidOwner {
    entity: entity_type,
    found:  None,
  })?;
  ctx.resolve(store, owner).await?;
  if client.id.is_some() {
    check_stored(&base, store).await?;
  }
  Ok(base)
}

// ─── Person ──────────────────────────────────────────────────────────────────

impl ToClient for Person {
  type Client = PersonClient;

  fn map_to_client(&self, ctx: &mut MappingContext) -> PersonClient {
    PersonClient {
      base:             client_base(&self.base, &self.documents),
      last_name:        self.last_name.clone(),
      first_name:       self.first_name.clone(),
      birth_date:       self.birth_date,
      gender_type:      self.gender_type,
      person_type:      self.person_type,
      email_addresses:  self
        .email_addresses
        .iter()
        .map(|e| e.to_client_in(ctx))
        .collect(),
      phone_numbers:    self
        .phone_numbers
        .iter()
        .map(|p| p.to_client_in(ctx))
        .collect(),
      postal_addresses: self
        .postal_addresses
        .iter()
        .map(|p| p.to_client_in(ctx))
        .collect(),
    }
  }
}

impl FromClient for Person {
  async fn map_from_client<S: EntityStore>(
    client: PersonClient,
    ctx: &mut MappingContext,
    store: &S,
  ) -> Result<Self> {
    let base = server_base(&client.base, EntityType::Person)?;
    let identity = base.identity();
    if let Some(parent) = base.parent {
      ctx.resolve(store, parent).await?;
    }
    if client.base.id.is_some() {
      check_stored(&base, store).await?;
    }
    enter(ctx, identity)?;

    let mut person = Person::new(client.last_name, client.first_name);
    let name = person.base.name.take();
    person.base = base;
    person.base.name = name;
    person.birth_date = client.birth_date;
    person.gender_type = client.gender_type;
    person.person_type = client.person_type;
    person.documents =
      resolve_documents(&client.base.documents, identity, ctx, store).await?;

    for mut email in client.email_addresses {
      adopt(&mut email.base, EntityType::EmailAddress, identity)?;
      person
        .email_addresses
        .push(EmailAddress::map_from_client(email, ctx, store).await?);
    }
    for mut phone in client.phone_numbers {
      adopt(&mut phone.base, EntityType::PhoneNumber, identity)?;
      person
        .phone_numbers
        .push(PhoneNumber::map_from_client(phone, ctx, store).await?);
    }
    for mut postal in client.postal_addresses {
      adopt(&mut postal.base, EntityType::PostalAddress, identity)?;
      person
        .postal_addresses
        .push(PostalAddress::map_from_client(postal, ctx, store).await?);
    }

    ctx.leave(identity);
    Ok(person)
  }
}

// ─── Contacts ────────────────────────────────────────────────────────────────

impl ToClient for EmailAddress {
  type Client = EmailAddressClient;

  fn map_to_client(&self, _ctx: &mut MappingContext) -> EmailAddressClient {
    EmailAddressClient {
      base:         client_base(&self.base, &self.documents),
      email:        self.email.clone(),
      is_default:   self.is_default,
      address_type: self.address_type,
    }
  }
}

impl FromClient for EmailAddress {
  async fn map_from_client<S: EntityStore>(
    client: EmailAddressClient,
    ctx: &mut MappingContext,
    store: &S,
  ) -> Result<Self> {
    let base =
      contact_base(&client.base, EntityType::EmailAddress, ctx, store).await?;
    let identity = base.identity();
    enter(ctx, identity)?;
    let documents =
      resolve_documents(&client.base.documents, identity, ctx, store).await?;
    ctx.leave(identity);
    Ok(Self {
      base,
      email: client.email.trim().to_owned(),
      is_default: client.is_default,
      address_type: client.address_type,
      documents,
    })
  }
}

impl ToClient for PhoneNumber {
  type Client = PhoneNumberClient;

  fn map_to_client(&self, _ctx: &mut MappingContext) -> PhoneNumberClient {
    PhoneNumberClient {
      base:          client_base(&self.base, &self.documents),
      number:        self.number.clone(),
      country_code:  self.country_code.clone(),
      phone_type:    self.phone_type,
      category_type: self.category_type,
      is_default:    self.is_default,
    }
  }
}

impl FromClient for PhoneNumber {
  async fn map_from_client<S: EntityStore>(
    client: PhoneNumberClient,
    ctx: &mut MappingContext,
    store: &S,
  ) -> Result<Self> {
    let base =
      contact_base(&client.base, EntityType::PhoneNumber, ctx, store).await?;
    let identity = base.identity();
    enter(ctx, identity)?;
    let documents =
      resolve_documents(&client.base.documents, identity, ctx, store).await?;
    ctx.leave(identity);
    Ok(Self {
      base,
      number: client.number,
      country_code: client.country_code,
      phone_type: client.phone_type,
      category_type: client.category_type,
      is_default: client.is_default,
      documents,
    })
  }
}

impl ToClient for PostalAddress {
  type Client = PostalAddressClient;

  fn map_to_client(&self, _ctx: &mut MappingContext) -> PostalAddressClient {
    PostalAddressClient {
      base:          client_base(&self.base, &self.documents),
      street_name:   self.street_name.clone(),
      street_number: self.street_number.clone(),
      locality:      self.locality.clone(),
      country_code:  self.country_code.clone(),
      zip_code:      self.zip_code.clone(),
      area:          self.area.clone(),
      is_default:    self.is_default,
      address_type:  self.address_type,
      category_type: self.category_type,
    }
  }
}

impl FromClient for PostalAddress {
  async fn map_from_client<S: EntityStore>(
    client: PostalAddressClient,
    ctx: &mut MappingContext,
    store: &S,
  ) -> Result<Self> {
    let base =
      contact_base(&client.base, EntityType::PostalAddress, ctx, store).await?;
    let identity = base.identity();
    enter(ctx, identity)?;
    let documents =
      resolve_documents(&client.base.documents, identity, ctx, store).await?;
    ctx.leave(identity);
    Ok(Self {
      base,
      street_name: client.street_name,
      street_number: client.street_number,
      locality: client.locality,
      country_code: client.country_code,
      zip_code: client.zip_code,
      area: client.area,
      is_default: client.is_default,
      address_type: client.address_type,
      category_type: client.category_type,
      documents,
    })
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

impl ToClient for Document {
  type Client = DocumentClient;

  fn map_to_client(&self, _ctx: &mut MappingContext) -> DocumentClient {
    DocumentClient {
      base:           client_base(&self.base, &[]),
      document_type:  self.document_type,
      filename:       self.filename.clone(),
      extension:      self.extension.clone(),
      mime_type:      Some(self.mime_type.clone()),
      content_id:     self.content_id,
      content_length: self.content_length,
      content_path:   self.content_path.clone(),
    }
  }
}
