//! Error types for `cherry-core`.

use thiserror::Error;

use crate::identity::{EntityIdentity, EntityType};

/// Coarse classification of an [`Error`], mirrored by HTTP status codes at
/// the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  BadRequest,
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  // ── Identity ──────────────────────────────────────────────────────────

  #[error("{0} not found")]
  NotFound(EntityIdentity),

  #[error("cannot resolve identity {0}: no such entity")]
  UnresolvedIdentity(EntityIdentity),

  #[error("wrong entity type: expected {expected}, found {found}")]
  WrongEntityType {
    expected: EntityType,
    found:    EntityType,
  },

  #[error("an identifier must not be supplied when creating a {0}")]
  IdentifierNotAllowed(EntityType),

  #[error("an identifier is required to update a {0}")]
  IdentifierRequired(EntityType),

  #[error("{entity} must be owned by a person, found {found:?}")]
  InvalidOwner {
    entity: EntityType,
    found:  Option<EntityType>,
  },

  #[error("{child} declares parent {declared} but is nested under {actual}")]
  ParentMismatch {
    child:    EntityType,
    declared: EntityIdentity,
    actual:   EntityIdentity,
  },

  #[error("{entity} belongs to {owner} and cannot move to another owner")]
  OwnerChanged {
    entity: EntityIdentity,
    owner:  EntityIdentity,
  },

  // ── Contacts ──────────────────────────────────────────────────────────

  #[error("{owner} already has an active default {entity_type}")]
  DefaultAlreadySet {
    owner:       EntityIdentity,
    entity_type: EntityType,
  },

  #[error("email address {0:?} already exists for this person")]
  DuplicateEmail(String),

  #[error("{0:?} is not a valid email address")]
  InvalidEmail(String),

  #[error("invalid {entity_type}: {message}")]
  Validation {
    entity_type: EntityType,
    message:     String,
  },

  // ── Documents ─────────────────────────────────────────────────────────

  #[error("invalid document type {value:?}, possible values are: {possible}")]
  InvalidDocumentType { value: String, possible: String },

  #[error("a document cannot own other documents")]
  DocumentOwner,

  #[error("document {0} has no stored content")]
  MissingContent(EntityIdentity),

  // ── Queries ───────────────────────────────────────────────────────────

  #[error("a search requires at least one value")]
  EmptyQuery,

  #[error("unknown field {field:?} for {entity_type}")]
  UnknownQueryField {
    entity_type: EntityType,
    field:       String,
  },

  #[error("invalid value for field {field:?}: {message}")]
  InvalidQueryValue { field: String, message: String },

  // ── Infrastructure ────────────────────────────────────────────────────

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("content store error: {0}")]
  Content(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::NotFound(_) | Error::MissingContent(_) => ErrorKind::NotFound,
      Error::Serialization(_) | Error::Store(_) | Error::Content(_) => {
        ErrorKind::Internal
      }
      _ => ErrorKind::BadRequest,
    }
  }

  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }

  pub(crate) fn content<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Content(Box::new(e))
  }

  pub(crate) fn validation(
    entity_type: EntityType,
    message: impl Into<String>,
  ) -> Self {
    Error::Validation {
      entity_type,
      message: message.into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
