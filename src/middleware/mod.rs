pub mod auth;

pub use auth::{optional_auth_middleware, RequestPrincipal};
