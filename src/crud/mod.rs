//! Config-driven CRUD handlers.
//!
//! A [`ResourceConfig`] plus a [`DocumentStore`](crate::store::DocumentStore)
//! yields a [`Crud`] exposing create, read, find, update and delete with
//! access gating, payload validation, mutation defaults and field projection
//! applied uniformly.

pub mod access;
pub mod config;
pub mod error;
pub mod handler;
pub mod mutation;
pub mod projection;
pub mod reply;

pub use access::AccessDecision;
pub use config::{ConfigError, CreateConfig, DeleteConfig, ReadConfig, ResourceConfig, UpdateConfig};
pub use error::{CrudError, CrudResult};
pub use handler::Crud;
pub use projection::Projection;
pub use reply::Reply;
