//! Lift Core: domain models, error types, and repository traits
//! shared by the storage and service crates.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;
