//! Documents: uploaded files attached to exactly one owning entity.
//!
//! The bytes themselves live in a [`crate::store::ContentStore`]; a document
//! row only records where. Freshly uploaded bytes ride along in
//! [`Document::content`] until the service hands them to the content store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use uuid::Uuid;

use crate::{
  Error, Result,
  entity::{EntityBase, EntityRow, Record},
  identity::{EntityIdentity, EntityType},
  query::{DataType, QueryField},
};

/// Used when the filename gives no hint.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

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
pub enum DocumentType {
  #[default]
  Unknown,
  DocumentGeneric,
  DocumentPhoto,
  DocumentInvoice,
  DocumentIcon,
}

impl DocumentType {
  /// Case-insensitive lookup that reports the accepted names on failure.
  pub fn parse(value: &str) -> Result<Self> {
    value.trim().parse().map_err(|_| Error::InvalidDocumentType {
      value:    value.to_owned(),
      possible: Self::VARIANTS.join(", "),
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub base:           EntityBase,
  pub document_type:  DocumentType,
  pub filename:       Option<String>,
  pub extension:      Option<String>,
  pub mime_type:      String,
  pub content_id:     Option<Uuid>,
  pub content_length: Option<u64>,
  pub content_path:   Option<String>,
  /// Bytes not yet written to the content store. Never persisted.
  pub content:        Option<Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
struct Payload {
  document_type:  DocumentType,
  filename:       Option<String>,
  extension:      Option<String>,
  mime_type:      String,
  content_id:     Option<Uuid>,
  content_length: Option<u64>,
  content_path:   Option<String>,
}

impl Document {
  /// An empty document owned by `owner`.
  pub fn new(owner: EntityIdentity, document_type: DocumentType) -> Result<Self> {
    if owner.entity_type() == EntityType::Document {
      return Err(Error::DocumentOwner);
    }
    let mut base = EntityBase::new(EntityType::Document);
    base.parent = Some(owner);
    Ok(Self {
      base,
      document_type,
      filename: None,
      extension: None,
      mime_type: DEFAULT_MIME_TYPE.to_owned(),
      content_id: None,
      content_length: None,
      content_path: None,
      content: None,
    })
  }

  /// A document holding `content` uploaded as `filename`.
  pub fn from_upload(
    owner: EntityIdentity,
    document_type: DocumentType,
    filename: &str,
    content: Vec<u8>,
  ) -> Result<Self> {
    let mut document = Self::new(owner, document_type)?;
    document.set_content(filename, content);
    Ok(document)
  }

  /// Replace the pending content. The name, extension and MIME type follow
  /// `filename`; any previously stored location is forgotten.
  pub fn set_content(&mut self, filename: &str, content: Vec<u8>) {
    let path = Path::new(filename);
    self.base.name = path
      .file_stem()
      .map(|stem| stem.to_string_lossy().into_owned());
    self.extension = path
      .extension()
      .map(|ext| ext.to_string_lossy().into_owned());
    self.mime_type = mime_guess::from_path(path)
      .first_or_text_plain()
      .essence_str()
      .to_owned();
    self.filename = Some(filename.to_owned());
    self.content_length = Some(content.len() as u64);
    self.content_id = None;
    self.content_path = None;
    self.content = Some(content);
  }

  pub fn owner(&self) -> Option<EntityIdentity> { self.base.parent }

  /// `output_path` joined with `<name>.<extension>`.
  pub fn output_filename(&self, output_path: impl AsRef<Path>) -> PathBuf {
    let name = self.base.name.as_deref().unwrap_or_default();
    let file = match &self.extension {
      Some(ext) => format!("{name}.{ext}"),
      None => name.to_owned(),
    };
    output_path.as_ref().join(file)
  }
}

const FIELDS: &[QueryField] = &[
  QueryField::payload("document_type", DataType::Enum(DocumentType::VARIANTS)),
  QueryField::payload("filename", DataType::String),
  QueryField::payload("extension", DataType::String),
  QueryField::payload("mime_type", DataType::String),
  QueryField::payload("content_length", DataType::Long),
];

impl Record for Document {
  const ENTITY_TYPE: EntityType = EntityType::Document;

  fn base(&self) -> &EntityBase { &self.base }

  fn base_mut(&mut self) -> &mut EntityBase { &mut self.base }

  fn payload(&self) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(Payload {
      document_type:  self.document_type,
      filename:       self.filename.clone(),
      extension:      self.extension.clone(),
      mime_type:      self.mime_type.clone(),
      content_id:     self.content_id,
      content_length: self.content_length,
      content_path:   self.content_path.clone(),
    })?)
  }

  fn from_row(row: EntityRow) -> Result<Self> {
    let p: Payload = serde_json::from_value(row.payload)?;
    Ok(Self {
      base:           row.base,
      document_type:  p.document_type,
      filename:       p.filename,
      extension:      p.extension,
      mime_type:      p.mime_type,
      content_id:     p.content_id,
      content_length: p.content_length,
      content_path:   p.content_path,
      content:        None,
    })
  }

  fn query_fields() -> &'static [QueryField] { FIELDS }

  /// A document carries its own pending content.
  fn all_documents_mut(&mut self) -> Vec<&mut Document> { vec![self] }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn owner() -> EntityIdentity {
    EntityIdentity::new(EntityType::Person, Uuid::new_v4())
  }

  #[test]
  fn document_type_parse_is_case_insensitive() {
    assert_eq!(
      DocumentType::parse("DOCUMENT_PHOTO").unwrap(),
      DocumentType::DocumentPhoto
    );
    let err = DocumentType::parse("spreadsheet").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("document_invoice"), "{msg}");
  }

  #[test]
  fn documents_cannot_own_documents() {
    let parent = EntityIdentity::new(EntityType::Document, Uuid::new_v4());
    assert!(matches!(
      Document::new(parent, DocumentType::DocumentGeneric),
      Err(Error::DocumentOwner)
    ));
  }

  #[test]
  fn upload_derives_name_extension_and_mime() {
    let doc = Document::from_upload(
      owner(),
      DocumentType::DocumentPhoto,
      "holiday.png",
      vec![1, 2, 3],
    )
    .unwrap();
    assert_eq!(doc.base.name.as_deref(), Some("holiday"));
    assert_eq!(doc.extension.as_deref(), Some("png"));
    assert_eq!(doc.mime_type, "image/png");
    assert_eq!(doc.content_length, Some(3));
    assert!(doc.owner().is_some());
  }

  #[test]
  fn unknown_extension_defaults_to_text_plain() {
    let doc = Document::from_upload(
      owner(),
      DocumentType::Unknown,
      "notes.zzqx",
      Vec::new(),
    )
    .unwrap();
    assert_eq!(doc.mime_type, DEFAULT_MIME_TYPE);
  }

  #[test]
  fn output_filename_joins_path() {
    let doc = Document::from_upload(
      owner(),
      DocumentType::DocumentInvoice,
      "invoice-42.pdf",
      b"%PDF".to_vec(),
    )
    .unwrap();
    assert_eq!(
      doc.output_filename("/tmp/out"),
      PathBuf::from("/tmp/out/invoice-42.pdf")
    );
    assert_eq!(
      doc.output_filename("/tmp/out/"),
      PathBuf::from("/tmp/out/invoice-42.pdf")
    );
  }

  #[test]
  fn content_is_not_part_of_the_payload() {
    let doc = Document::from_upload(
      owner(),
      DocumentType::DocumentGeneric,
      "a.txt",
      b"secret".to_vec(),
    )
    .unwrap();
    let row = doc.to_row().unwrap();
    assert!(row.payload.get("content").is_none());
    let back = Document::from_row(row).unwrap();
    assert_eq!(back.content, None);
    assert_eq!(back.filename.as_deref(), Some("a.txt"));
  }

  #[test]
  fn pending_content_of_a_lone_document_is_reachable() {
    let mut doc = Document::from_upload(
      owner(),
      DocumentType::DocumentPhoto,
      "portrait.png",
      vec![0x89, 0x50],
    )
    .unwrap();
    let pending = doc.all_documents_mut();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].content.as_deref(), Some(&[0x89, 0x50][..]));
  }
}
