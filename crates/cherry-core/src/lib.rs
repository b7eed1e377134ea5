//! Core types and trait definitions for the Cherry entity store.
//!
//! This crate is free of HTTP and database dependencies. It defines the
//! entity model (persons, their contact entities, documents), identities,
//! the client/server mapping layer, query objects, validation rules, and the
//! [`service::EntityService`] that ties them to any [`store::EntityStore`].

// Native `async fn` in traits; the traits spell out their `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod client;
pub mod contact;
pub mod document;
pub mod email;
pub mod entity;
pub mod error;
pub mod identity;
pub mod mapping;
pub mod person;
pub mod phone;
pub mod postal;
pub mod query;
pub mod random;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{Error, ErrorKind, Result};
pub use identity::{EntityIdentity, EntityType};
