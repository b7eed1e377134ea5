//! The base persisted entity: identity, descriptive fields, audit metadata,
//! status lifecycle and ownership.
//!
//! Every domain type embeds an [`EntityBase`] and implements [`Record`], which
//! converts it to and from the neutral [`EntityRow`] shape that storage
//! backends persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use uuid::Uuid;

use crate::{
  Result,
  document::Document,
  identity::{EntityIdentity, EntityType},
  query::QueryField,
};

// ─── Status ──────────────────────────────────────────────────────────────────

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
pub enum StatusType {
  #[default]
  Active,
  Inactive,
}

/// Status of an entity together with the moment it became inactive.
///
/// `since` is only ever set while the status is [`StatusType::Inactive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
  status_type: StatusType,
  since:       Option<DateTime<Utc>>,
}

impl Status {
  /// Rebuild a status from its parts. An active status never keeps a
  /// `since` timestamp; an inactive one without it becomes inactive now.
  pub fn from_parts(
    status_type: StatusType,
    since: Option<DateTime<Utc>>,
  ) -> Self {
    match status_type {
      StatusType::Active => Self::default(),
      StatusType::Inactive => Self {
        status_type,
        since: since.or_else(|| Some(Utc::now())),
      },
    }
  }

  pub fn status_type(&self) -> StatusType { self.status_type }

  pub fn since(&self) -> Option<DateTime<Utc>> { self.since }

  pub fn is_active(&self) -> bool { self.status_type == StatusType::Active }

  pub fn set_active(&mut self) {
    self.status_type = StatusType::Active;
    self.since = None;
  }

  pub fn set_inactive(&mut self) { self.set_inactive_at(Utc::now()); }

  pub fn set_inactive_at(&mut self, at: DateTime<Utc>) {
    self.status_type = StatusType::Inactive;
    self.since = Some(at);
  }

  /// Transition to `status_type`. Returns `false` (and leaves `since`
  /// untouched) when the status is already `status_type`.
  pub fn set_status_type(&mut self, status_type: StatusType) -> bool {
    if self.status_type == status_type {
      return false;
    }
    match status_type {
      StatusType::Active => self.set_active(),
      StatusType::Inactive => self.set_inactive(),
    }
    true
  }
}

// ─── Audit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audit {
  pub created_at:  Option<DateTime<Utc>>,
  pub created_by:  Option<String>,
  pub modified_at: Option<DateTime<Utc>>,
  pub modified_by: Option<String>,
}

impl Audit {
  /// Stamp a save by `auditor`. Creation fields are only set once.
  pub fn touch(&mut self, auditor: &str, now: DateTime<Utc>) {
    if self.created_at.is_none() {
      self.created_at = Some(now);
      self.created_by = Some(auditor.to_owned());
    }
    self.modified_at = Some(now);
    self.modified_by = Some(auditor.to_owned());
  }
}

// ─── Base ────────────────────────────────────────────────────────────────────

/// Fields shared by every persisted entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBase {
  id:              Uuid,
  entity_type:     EntityType,
  pub name:        Option<String>,
  pub description: Option<String>,
  pub reference:   Option<String>,
  pub tags:        Vec<String>,
  pub status:      Status,
  pub audit:       Audit,
  /// The owning entity, if any.
  pub parent:      Option<EntityIdentity>,
}

impl EntityBase {
  /// A fresh, not yet persisted entity with a random id.
  pub fn new(entity_type: EntityType) -> Self {
    Self::with_id(entity_type, Uuid::new_v4())
  }

  pub fn with_id(entity_type: EntityType, id: Uuid) -> Self {
    Self {
      id,
      entity_type,
      name: None,
      description: None,
      reference: None,
      tags: Vec::new(),
      status: Status::default(),
      audit: Audit::default(),
      parent: None,
    }
  }

  pub fn id(&self) -> Uuid { self.id }

  pub fn entity_type(&self) -> EntityType { self.entity_type }

  pub fn identity(&self) -> EntityIdentity {
    EntityIdentity::new(self.entity_type, self.id)
  }

  pub fn is_active(&self) -> bool { self.status.is_active() }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// Storage-neutral form of an entity: the base columns plus the
/// type-specific fields as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
  pub base:    EntityBase,
  pub payload: serde_json::Value,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A domain type that can be persisted as one or more [`EntityRow`]s.
pub trait Record: Clone + Send + Sync + Sized + 'static {
  const ENTITY_TYPE: EntityType;

  fn base(&self) -> &EntityBase;

  fn base_mut(&mut self) -> &mut EntityBase;

  /// Encode the type-specific fields.
  fn payload(&self) -> Result<serde_json::Value>;

  /// Decode a single row. Owned children are not loaded; see
  /// [`Record::attach`].
  fn from_row(row: EntityRow) -> Result<Self>;

  /// Queryable fields beyond [`crate::query::BASE_FIELDS`].
  fn query_fields() -> &'static [QueryField] { &[] }

  fn documents(&self) -> &[Document] { &[] }

  /// `None` for types that cannot own documents.
  fn documents_mut(&mut self) -> Option<&mut Vec<Document>> { None }

  /// Every document reachable from this entity, including those owned by
  /// nested children.
  fn all_documents_mut(&mut self) -> Vec<&mut Document> {
    match self.documents_mut() {
      Some(documents) => documents.iter_mut().collect(),
      None => Vec::new(),
    }
  }

  fn identity(&self) -> EntityIdentity { self.base().identity() }

  fn to_row(&self) -> Result<EntityRow> {
    Ok(EntityRow {
      base:    self.base().clone(),
      payload: self.payload()?,
    })
  }

  /// Rows for this entity and everything it owns, parents first.
  fn rows(&self) -> Result<Vec<EntityRow>> {
    let mut rows = vec![self.to_row()?];
    for document in self.documents() {
      rows.push(document.to_row()?);
    }
    Ok(rows)
  }

  /// Populate owned children from the rows of every descendant.
  fn attach(&mut self, descendants: &[EntityRow]) -> Result<()> {
    let identity = self.identity();
    if let Some(documents) = self.documents_mut() {
      for row in owned_by(descendants, identity, EntityType::Document) {
        documents.push(Document::from_row(row.clone())?);
      }
    }
    Ok(())
  }
}

/// Rows of `entity_type` whose parent is `owner`.
pub(crate) fn owned_by(
  rows: &[EntityRow],
  owner: EntityIdentity,
  entity_type: EntityType,
) -> impl Iterator<Item = &EntityRow> {
  rows.iter().filter(move |row| {
    row.base.entity_type() == entity_type && row.base.parent == Some(owner)
  })
}

/// Decode children of type `E` owned by `owner` and attach their own
/// descendants.
pub(crate) fn load_children<E: Record>(
  rows: &[EntityRow],
  owner: EntityIdentity,
) -> Result<Vec<E>> {
  owned_by(rows, owner, E::ENTITY_TYPE)
    .map(|row| {
      let mut child = E::from_row(row.clone())?;
      child.attach(rows)?;
      Ok(child)
    })
    .collect()
}
