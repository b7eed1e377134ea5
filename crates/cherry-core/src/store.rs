//! Storage traits.
//!
//! [`EntityStore`] persists [`EntityRow`]s of every entity type;
//! [`ContentStore`] holds the bytes behind documents. Backends live in
//! `cherry-store-sqlite`; everything above depends only on these traits.

use std::future::Future;

use uuid::Uuid;

use crate::{
  entity::EntityRow,
  identity::{EntityIdentity, EntityType},
  query::EntityQuery,
};

/// Abstraction over an entity store backend.
///
/// Lookups are keyed by [`EntityIdentity`], so a row of the wrong type is
/// reported as absent. All methods return `Send` futures so the trait can be
/// used behind `axum` handlers.
pub trait EntityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn exists(
    &self,
    identity: EntityIdentity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn count(
    &self,
    entity_type: EntityType,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// A single row, without its children.
  fn get(
    &self,
    identity: EntityIdentity,
  ) -> impl Future<Output = Result<Option<EntityRow>, Self::Error>> + Send + '_;

  /// Direct children of `parent` with type `entity_type`.
  fn children(
    &self,
    parent: EntityIdentity,
    entity_type: EntityType,
  ) -> impl Future<Output = Result<Vec<EntityRow>, Self::Error>> + Send + '_;

  /// Every row transitively owned by `root`, excluding `root` itself.
  fn descendants(
    &self,
    root: EntityIdentity,
  ) -> impl Future<Output = Result<Vec<EntityRow>, Self::Error>> + Send + '_;

  fn search<'a>(
    &'a self,
    query: &'a EntityQuery,
  ) -> impl Future<Output = Result<Vec<EntityRow>, Self::Error>> + Send + 'a;

  /// Insert or update `rows` atomically. Parents must precede their
  /// children. Creation audit fields of existing rows are preserved.
  fn save(
    &self,
    rows: Vec<EntityRow>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Hard-delete an entity and everything it owns. Returns `false` when
  /// nothing matched.
  fn delete(
    &self,
    identity: EntityIdentity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

/// Byte storage for document content, keyed by content id.
pub trait ContentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `data` and return the location it was written to.
  fn put(
    &self,
    content_id: Uuid,
    data: Vec<u8>,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  fn get(
    &self,
    content_id: Uuid,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + '_;

  /// Remove stored content; missing content is not an error.
  fn remove(
    &self,
    content_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
