//! Provisioning document loader
//!
//! Parse desired-state documents from JSON or YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `load_desired_state` - read, interpolate and validate a document on disk
//! - `load_desired_state_from_str` - the same for in-memory content
//! - `DocumentFormat` - format detection from the file extension

mod parser;

pub use parser::{load_desired_state, load_desired_state_from_str, DocumentFormat};

#[cfg(test)]
mod tests;
