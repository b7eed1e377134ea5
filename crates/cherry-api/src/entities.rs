//! Handlers shared by every entity prefix (`/person`, `/person/email`,
//! `/person/phone`, `/person/postal` and the read side of `/document`).
//!
//! | Method   | Path           | Notes |
//! |----------|----------------|-------|
//! | `GET`    | `/count`       | Number of stored entities of the type |
//! | `GET`    | `/get/{id}`    | 404 if not found |
//! | `POST`   | `/create`      | Body: client object without `id` |
//! | `POST`   | `/random`      | Contacts: `?parent_type=person&parent_id=<uuid>` |
//! | `PUT`    | `/update`      | Body: client object with `id` |
//! | `DELETE` | `/delete/{id}` | Cascades to owned entities |
//! | `PATCH`  | `/search`      | Body: `{"field": value, ...}`; full objects |
//! | `GET`    | `/query`       | `?field=value&...`; identifiers only |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use cherry_core::{
  EntityIdentity, EntityType,
  mapping::ToClient,
  query::EntityQuery,
  service::{EntityService, Managed},
  store::{ContentStore, EntityStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Human label used in confirmation messages.
pub fn label(entity_type: EntityType) -> &'static str {
  match entity_type {
    EntityType::Person => "Person",
    EntityType::EmailAddress => "Email address",
    EntityType::PhoneNumber => "Phone number",
    EntityType::PostalAddress => "Postal address",
    EntityType::Document => "Document",
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /count`
pub async fn count<E, S, C>(
  State(service): State<EntityService<S, C>>,
) -> Result<Json<u64>, ApiError>
where
  E: ToClient,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  Ok(Json(service.count::<E>().await?))
}

/// `GET /get/{id}`
pub async fn get_one<E, S, C>(
  State(service): State<EntityService<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<E::Client>, ApiError>
where
  E: ToClient,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let entity: E = service.get(id).await?;
  Ok(Json(entity.to_client()))
}

/// `PATCH /search`: every entity matching all supplied fields.
pub async fn search<E, S, C>(
  State(service): State<EntityService<S, C>>,
  Json(body): Json<serde_json::Value>,
) -> Result<Json<Vec<E::Client>>, ApiError>
where
  E: ToClient,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let query = EntityQuery::from_json::<E>(&body)?;
  let found: Vec<E> = service.search(query).await?;
  Ok(Json(found.iter().map(ToClient::to_client).collect()))
}

/// `GET /query`: identifiers of every entity matching all parameters.
pub async fn query<E, S, C>(
  State(service): State<EntityService<S, C>>,
  Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<Uuid>>, ApiError>
where
  E: ToClient,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let query = EntityQuery::from_params::<E>(&params)?;
  Ok(Json(service.query_ids::<E>(query).await?))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// `POST /create`
pub async fn create<E, S, C>(
  State(service): State<EntityService<S, C>>,
  Json(client): Json<E::Client>,
) -> Result<impl IntoResponse, ApiError>
where
  E: Managed,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let entity: E = service.create(client).await?;
  Ok((StatusCode::CREATED, Json(entity.to_client())))
}

/// `PUT /update`
pub async fn update<E, S, C>(
  State(service): State<EntityService<S, C>>,
  Json(client): Json<E::Client>,
) -> Result<Json<E::Client>, ApiError>
where
  E: Managed,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let entity: E = service.update(client).await?;
  Ok(Json(entity.to_client()))
}

#[derive(Debug, Default, Deserialize)]
pub struct RandomParams {
  pub parent_type: Option<EntityType>,
  pub parent_id:   Option<Uuid>,
}

impl RandomParams {
  fn owner(&self) -> Result<Option<EntityIdentity>, ApiError> {
    match (self.parent_type, self.parent_id) {
      (Some(t), Some(id)) => Ok(Some(EntityIdentity::new(t, id))),
      (None, None) => Ok(None),
      _ => Err(ApiError::BadRequest(
        "parent_type and parent_id must be given together".into(),
      )),
    }
  }
}

/// `POST /random[?parent_type=<type>&parent_id=<uuid>]`
pub async fn random<E, S, C>(
  State(service): State<EntityService<S, C>>,
  Query(params): Query<RandomParams>,
) -> Result<impl IntoResponse, ApiError>
where
  E: Managed,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let entity: E = service.random(params.owner()?).await?;
  Ok((StatusCode::CREATED, Json(entity.to_client())))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
  pub message: String,
}

/// `DELETE /delete/{id}`
pub async fn delete_one<E, S, C>(
  State(service): State<EntityService<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Deleted>, ApiError>
where
  E: ToClient,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  service.delete::<E>(id).await?;
  Ok(Json(Deleted {
    message: format!(
      "{} id: '{id}' has been deleted successfully!",
      label(E::ENTITY_TYPE)
    ),
  }))
}
