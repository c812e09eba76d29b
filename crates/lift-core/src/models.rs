//! Domain models for the lift access system.

pub mod access_log;
pub mod floor;
pub mod permission;
pub mod user;
pub mod visitor_access;
