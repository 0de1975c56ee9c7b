//! Build-and-model-routing core for an AI coding assistant backend.
//!
//! Given a proposed change description for a file, drives one or more model
//! calls to produce the final merged file content: structured-output
//! parsing, bounded retries with jittered backoff, cooperative
//! cancellation, and token-budget-driven escalation across a registry of
//! model packs. Transport, persistence, and auth live behind the traits in
//! [`client`].

pub mod build;
pub mod client;
pub mod error;
pub mod models;
pub mod parsers;
pub mod prompts;
pub mod tokens;

pub use error::GaleError;
