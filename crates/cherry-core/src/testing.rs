//! In-memory stores for unit tests.

use std::{collections::HashMap, convert::Infallible, sync::Mutex};

use uuid::Uuid;

use crate::{
  entity::EntityRow,
  identity::{EntityIdentity, EntityType},
  query::EntityQuery,
  store::{ContentStore, EntityStore},
};

/// Rows kept in insertion order. `search` filters by entity type only.
#[derive(Default)]
pub struct MemoryStore {
  rows: Mutex<Vec<EntityRow>>,
}

impl MemoryStore {
  pub fn insert_all(&self, rows: Vec<EntityRow>) {
    let mut stored = self.rows.lock().unwrap();
    for row in rows {
      match stored.iter_mut().find(|r| r.base.id() == row.base.id()) {
        Some(existing) => {
          let audit = existing.base.audit.clone();
          *existing = row;
          existing.base.audit.created_at = audit.created_at;
          existing.base.audit.created_by = audit.created_by;
        }
        None => stored.push(row),
      }
    }
  }

  fn find(&self, identity: EntityIdentity) -> Option<EntityRow> {
    self
      .rows
      .lock()
      .unwrap()
      .iter()
      .find(|r| r.base.identity() == identity)
      .cloned()
  }

  fn descendant_rows(&self, root: EntityIdentity) -> Vec<EntityRow> {
    let rows = self.rows.lock().unwrap();
    let mut found: Vec<EntityRow> = Vec::new();
    let mut frontier = vec![root];
    while let Some(parent) = frontier.pop() {
      for row in rows.iter().filter(|r| r.base.parent == Some(parent)) {
        frontier.push(row.base.identity());
        found.push(row.clone());
      }
    }
    found
  }
}

impl EntityStore for MemoryStore {
  type Error = Infallible;

  async fn exists(&self, identity: EntityIdentity) -> Result<bool, Infallible> {
    Ok(self.find(identity).is_some())
  }

  async fn count(&self, entity_type: EntityType) -> Result<u64, Infallible> {
    let rows = self.rows.lock().unwrap();
    Ok(rows.iter().filter(|r| r.base.entity_type() == entity_type).count() as u64)
  }

  async fn get(
    &self,
    identity: EntityIdentity,
  ) -> Result<Option<EntityRow>, Infallible> {
    Ok(self.find(identity))
  }

  async fn children(
    &self,
    parent: EntityIdentity,
    entity_type: EntityType,
  ) -> Result<Vec<EntityRow>, Infallible> {
    let rows = self.rows.lock().unwrap();
    Ok(
      rows
        .iter()
        .filter(|r| {
          r.base.parent == Some(parent) && r.base.entity_type() == entity_type
        })
        .cloned()
        .collect(),
    )
  }

  async fn descendants(
    &self,
    root: EntityIdentity,
  ) -> Result<Vec<EntityRow>, Infallible> {
    Ok(self.descendant_rows(root))
  }

  async fn search<'a>(
    &'a self,
    query: &'a EntityQuery,
  ) -> Result<Vec<EntityRow>, Infallible> {
    let rows = self.rows.lock().unwrap();
    Ok(
      rows
        .iter()
        .filter(|r| r.base.entity_type() == query.entity_type)
        .cloned()
        .collect(),
    )
  }

  async fn save(&self, rows: Vec<EntityRow>) -> Result<(), Infallible> {
    self.insert_all(rows);
    Ok(())
  }

  async fn delete(&self, identity: EntityIdentity) -> Result<bool, Infallible> {
    if self.find(identity).is_none() {
      return Ok(false);
    }
    let mut doomed: Vec<Uuid> = self
      .descendant_rows(identity)
      .iter()
      .map(|r| r.base.id())
      .collect();
    doomed.push(identity.id());
    self
      .rows
      .lock()
      .unwrap()
      .retain(|r| !doomed.contains(&r.base.id()));
    Ok(true)
  }
}

#[derive(Default)]
pub struct MemoryContent {
  blobs: Mutex<HashMap<Uuid, Vec<u8>>>,
}

impl MemoryContent {
  pub fn len(&self) -> usize { self.blobs.lock().unwrap().len() }
}

impl ContentStore for MemoryContent {
  type Error = Infallible;

  async fn put(&self, content_id: Uuid, data: Vec<u8>) -> Result<String, Infallible> {
    self.blobs.lock().unwrap().insert(content_id, data);
    Ok(format!("memory://{content_id}"))
  }

  async fn get(&self, content_id: Uuid) -> Result<Option<Vec<u8>>, Infallible> {
    Ok(self.blobs.lock().unwrap().get(&content_id).cloned())
  }

  async fn remove(&self, content_id: Uuid) -> Result<(), Infallible> {
    self.blobs.lock().unwrap().remove(&content_id);
    Ok(())
  }
}
