pub mod auth;
pub mod config;
pub mod crud;
pub mod database;
pub mod error;
pub mod handlers;
pub mod hashing;
pub mod middleware;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod testing;
