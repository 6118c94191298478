//! Stilo: bootstrap sequencer and HTTP front door for the blog service.
//!
//! The library exposes the startup components (configuration loading and
//! validation, credential redaction, bounded store connection supervision,
//! request-pipeline assembly) as plain functions and types. The binary
//! wires them together and alone decides when the process exits.

pub mod config;
pub mod infra;
pub mod routes;
