//! Ephemeral webhook endpoints: capture inbound requests for a limited time
//! and replay them to any target later.

pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod replay;
