//! [`EntityService`]: the operations behind every endpoint.
//!
//! The service owns the rules that span storage and mapping: identifier
//! checks on create and update, validation, audit stamping, writing pending
//! document content before rows, and removing content after deletes.
//!
//! Validated writes are serialised through one lock per service so that
//! sibling rules such as the single default flag are checked against the
//! state they are saved into. A second process sharing the store is not
//! covered by the lock.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  client::ClientObject,
  document::{Document, DocumentType},
  entity::Record,
  identity::{EntityIdentity, EntityType},
  mapping::{self, FromClient},
  query::EntityQuery,
  random::Randomize,
  store::{ContentStore, EntityStore},
  validation::Validate,
};

/// Entity types that can be created, updated and randomised through the
/// service.
pub trait Managed: FromClient + Validate + Randomize {}

impl<T: FromClient + Validate + Randomize> Managed for T {}

pub struct EntityService<S, C> {
  store:   Arc<S>,
  content: Arc<C>,
  auditor: String,
  writes:  Arc<Mutex<()>>,
}

impl<S, C> Clone for EntityService<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      content: Arc::clone(&self.content),
      auditor: self.auditor.clone(),
      writes:  Arc::clone(&self.writes),
    }
  }
}

impl<S, C> EntityService<S, C>
where
  S: EntityStore,
  C: ContentStore,
{
  pub fn new(store: Arc<S>, content: Arc<C>, auditor: impl Into<String>) -> Self {
    Self {
      store,
      content,
      auditor: auditor.into(),
      writes: Arc::new(Mutex::new(())),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn count<E: Record>(&self) -> Result<u64> {
    self
      .store
      .count(E::ENTITY_TYPE)
      .await
      .map_err(Error::store)
  }

  /// The entity with `id` and everything it owns, if it exists.
  pub async fn find<E: Record>(&self, id: Uuid) -> Result<Option<E>> {
    let identity = EntityIdentity::new(E::ENTITY_TYPE, id);
    match mapping::resolve(self.store.as_ref(), identity).await {
      Ok(entity) => Ok(Some(entity)),
      Err(Error::UnresolvedIdentity(_)) => Ok(None),
      Err(e) => Err(e),
    }
  }

  pub async fn get<E: Record>(&self, id: Uuid) -> Result<E> {
    self
      .find(id)
      .await?
      .ok_or(Error::NotFound(EntityIdentity::new(E::ENTITY_TYPE, id)))
  }

  pub async fn search<E: Record>(&self, query: EntityQuery) -> Result<Vec<E>> {
    let query = query.ensure_not_empty()?;
    debug!(entity_type = %E::ENTITY_TYPE, conditions = query.conditions.len(), "search");
    let rows = self.store.search(&query).await.map_err(Error::store)?;
    let mut found = Vec::with_capacity(rows.len());
    for row in rows {
      found.push(mapping::resolve(self.store.as_ref(), row.base.identity()).await?);
    }
    Ok(found)
  }

  pub async fn query_ids<E: Record>(&self, query: EntityQuery) -> Result<Vec<Uuid>> {
    let query = query.ensure_not_empty()?;
    debug!(entity_type = %E::ENTITY_TYPE, conditions = query.conditions.len(), "query");
    let rows = self.store.search(&query).await.map_err(Error::store)?;
    Ok(rows.into_iter().map(|row| row.base.id()).collect())
  }

  // ── Writes ────────────────────────────────────────────────────────────

  pub async fn create<E: Managed>(&self, client: E::Client) -> Result<E> {
    if client.base().id.is_some() {
      return Err(Error::IdentifierNotAllowed(E::ENTITY_TYPE));
    }
    let _guard = self.writes.lock().await;
    let mut entity: E = mapping::from_client(client, self.store.as_ref()).await?;
    entity.validate(self.store.as_ref()).await?;
    self.persist(&mut entity).await?;
    info!(entity = %entity.identity(), "created");
    self.get(entity.base().id()).await
  }

  pub async fn update<E: Managed>(&self, client: E::Client) -> Result<E> {
    let base = client.base();
    let id = base.id.ok_or(Error::IdentifierRequired(E::ENTITY_TYPE))?;
    if let Some(found) = base.entity_type
      && found != E::ENTITY_TYPE
    {
      return Err(Error::WrongEntityType {
        expected: E::ENTITY_TYPE,
        found,
      });
    }
    let identity = EntityIdentity::new(E::ENTITY_TYPE, id);
    let _guard = self.writes.lock().await;
    if !self.store.exists(identity).await.map_err(Error::store)? {
      return Err(Error::NotFound(identity));
    }

    let mut entity: E = mapping::from_client(client, self.store.as_ref()).await?;
    entity.validate(self.store.as_ref()).await?;
    self.persist(&mut entity).await?;
    info!(entity = %identity, "updated");
    self.get(id).await
  }

  /// Create a random entity, owned by `owner` for owned types.
  pub async fn random<E: Managed>(&self, owner: Option<EntityIdentity>) -> Result<E> {
    if let Some(owner) = owner
      && !self.store.exists(owner).await.map_err(Error::store)?
    {
      return Err(Error::UnresolvedIdentity(owner));
    }
    let mut entity = E::random(owner)?;
    let _guard = self.writes.lock().await;
    entity.validate(self.store.as_ref()).await?;
    self.persist(&mut entity).await?;
    info!(entity = %entity.identity(), "created random");
    self.get(entity.base().id()).await
  }

  /// Hard-delete an entity, everything it owns and the content of every
  /// document among them.
  pub async fn delete<E: Record>(&self, id: Uuid) -> Result<()> {
    let identity = EntityIdentity::new(E::ENTITY_TYPE, id);
    let Some(row) = self.store.get(identity).await.map_err(Error::store)? else {
      return Err(Error::NotFound(identity));
    };
    let mut doomed = self
      .store
      .descendants(identity)
      .await
      .map_err(Error::store)?;
    doomed.push(row);

    if !self.store.delete(identity).await.map_err(Error::store)? {
      return Err(Error::NotFound(identity));
    }

    // The rows are gone; content that fails to go is only reported.
    for row in doomed
      .into_iter()
      .filter(|r| r.base.entity_type() == EntityType::Document)
    {
      let document = row.base.identity();
      let content_id = match Document::from_row(row) {
        Ok(doc) => doc.content_id,
        Err(e) => {
          warn!(%document, error = %e, "cannot decode deleted document");
          None
        }
      };
      if let Some(content_id) = content_id
        && let Err(e) = self.content.remove(content_id).await
      {
        warn!(%document, %content_id, error = %e, "orphaned document content");
      }
    }
    info!(entity = %identity, "deleted");
    Ok(())
  }

  // ── Documents ─────────────────────────────────────────────────────────

  pub async fn upload_document(
    &self,
    owner: EntityIdentity,
    document_type: DocumentType,
    filename: &str,
    content: Vec<u8>,
  ) -> Result<Document> {
    if !self.store.exists(owner).await.map_err(Error::store)? {
      return Err(Error::UnresolvedIdentity(owner));
    }
    let mut document =
      Document::from_upload(owner, document_type, filename, content)?;
    self.persist(&mut document).await?;
    info!(
      entity = %document.identity(),
      owner = %owner,
      bytes = document.content_length.unwrap_or_default(),
      "uploaded document"
    );
    self.get(document.base.id()).await
  }

  /// A document together with its stored bytes.
  pub async fn document_content(&self, id: Uuid) -> Result<(Document, Vec<u8>)> {
    let document: Document = self.get(id).await?;
    let identity = document.identity();
    let content_id = document
      .content_id
      .ok_or(Error::MissingContent(identity))?;
    let bytes = self
      .content
      .get(content_id)
      .await
      .map_err(Error::content)?
      .ok_or(Error::MissingContent(identity))?;
    Ok((document, bytes))
  }

  // ── Internals ─────────────────────────────────────────────────────────

  /// Write pending document content, stamp audit fields, and save the
  /// entity graph in one store transaction. Content written here is removed
  /// again when the save fails.
  async fn persist<E: Record>(&self, entity: &mut E) -> Result<()> {
    let mut written = Vec::new();
    let result = self.write_and_save(entity, &mut written).await;
    if result.is_err() {
      for content_id in written {
        if let Err(e) = self.content.remove(content_id).await {
          warn!(%content_id, error = %e, "orphaned document content");
        }
      }
    }
    result
  }

  async fn write_and_save<E: Record>(
    &self,
    entity: &mut E,
    written: &mut Vec<Uuid>,
  ) -> Result<()> {
    for document in entity.all_documents_mut() {
      if let Some(bytes) = document.content.take() {
        let content_id = Uuid::new_v4();
        let path = self
          .content
          .put(content_id, bytes)
          .await
          .map_err(Error::content)?;
        written.push(content_id);
        document.content_id = Some(content_id);
        document.content_path = Some(path);
      }
    }

    let now = Utc::now();
    let mut rows = entity.rows()?;
    for row in &mut rows {
      row.base.audit.touch(&self.auditor, now);
    }
    self.store.save(rows).await.map_err(Error::store)
  }
}
