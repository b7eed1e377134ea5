//! JSON REST API for Cherry.
//!
//! Exposes an axum [`Router`] over an [`EntityService`] backed by any
//! [`EntityStore`] and [`ContentStore`]. Transport concerns such as tracing
//! layers and listeners are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", cherry_api::api_router(service))
//! ```

pub mod documents;
pub mod entities;
pub mod error;

use axum::{
  Router,
  routing::{delete, get, patch, post, put},
};
use cherry_core::{
  document::Document,
  email::EmailAddress,
  mapping::ToClient,
  person::Person,
  phone::PhoneNumber,
  postal::PostalAddress,
  service::{EntityService, Managed},
  store::{ContentStore, EntityStore},
};

pub use error::ApiError;

/// Routes every entity type shares.
fn read_routes<E, S, C>() -> Router<EntityService<S, C>>
where
  E: ToClient,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  Router::new()
    .route("/count", get(entities::count::<E, S, C>))
    .route("/get/{id}", get(entities::get_one::<E, S, C>))
    .route("/delete/{id}", delete(entities::delete_one::<E, S, C>))
    .route("/search", patch(entities::search::<E, S, C>))
    .route("/query", get(entities::query::<E, S, C>))
}

/// Read routes plus create, update and random.
fn managed_routes<E, S, C>() -> Router<EntityService<S, C>>
where
  E: Managed,
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  read_routes::<E, S, C>()
    .route("/create", post(entities::create::<E, S, C>))
    .route("/update", put(entities::update::<E, S, C>))
    .route("/random", post(entities::random::<E, S, C>))
}

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(service: EntityService<S, C>) -> Router<()>
where
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  let documents = read_routes::<Document, S, C>()
    .route("/upload", post(documents::upload::<S, C>))
    .route("/content/{id}", get(documents::content::<S, C>));

  Router::new()
    .nest("/person", managed_routes::<Person, S, C>())
    .nest("/person/email", managed_routes::<EmailAddress, S, C>())
    .nest("/person/phone", managed_routes::<PhoneNumber, S, C>())
    .nest("/person/postal", managed_routes::<PostalAddress, S, C>())
    .nest("/document", documents)
    .with_state(service)
}
