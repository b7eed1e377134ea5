//! Document-only handlers under `/document`.
//!
//! | Method | Path            | Notes |
//! |--------|-----------------|-------|
//! | `POST` | `/upload`       | Body: `{"owner":{...},"document_type":"...","filename":"...","content":"<base64>"}` |
//! | `GET`  | `/content/{id}` | Raw bytes with the stored MIME type |
//!
//! The remaining document routes reuse [`crate::entities`].

use axum::{
  Json,
  extract::{Path, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use cherry_core::{
  EntityIdentity,
  document::{Document, DocumentType},
  mapping::ToClient,
  service::EntityService,
  store::{ContentStore, EntityStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UploadBody {
  pub owner:         EntityIdentity,
  #[serde(default)]
  pub document_type: Option<String>,
  pub filename:      String,
  /// Base64 (standard alphabet, padded) file content.
  pub content:       String,
}

/// `POST /upload`
pub async fn upload<S, C>(
  State(service): State<EntityService<S, C>>,
  Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let document_type = match body.document_type.as_deref() {
    Some(value) => DocumentType::parse(value)?,
    None => DocumentType::default(),
  };
  let bytes = B64
    .decode(body.content.trim())
    .map_err(|e| ApiError::BadRequest(format!("invalid base64 content: {e}")))?;

  let document = service
    .upload_document(body.owner, document_type, &body.filename, bytes)
    .await?;
  Ok((StatusCode::CREATED, Json(document.to_client())))
}

/// A filename safe inside a quoted `Content-Disposition` parameter.
fn download_name(document: &Document) -> String {
  let name: String = document
    .filename
    .as_deref()
    .or(document.base.name.as_deref())
    .unwrap_or_default()
    .chars()
    .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
    .collect();
  if name.trim().is_empty() {
    document.base.id().to_string()
  } else {
    name
  }
}

/// `GET /content/{id}`
pub async fn content<S, C>(
  State(service): State<EntityService<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let (document, bytes) = service.document_content(id).await?;
  let disposition =
    format!("attachment; filename=\"{}\"", download_name(&document));
  Ok((
    [
      (header::CONTENT_TYPE, document.mime_type.clone()),
      (header::CONTENT_DISPOSITION, disposition),
    ],
    bytes,
  ))
}
