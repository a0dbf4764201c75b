#![warn(missing_docs)]
//! # smart-leaf-contract-tests
//!
//! Loads the frozen JSON schemas and fixtures under the workspace
//! `contracts/` directory so integration tests can check both the documents
//! and the client types against them.

use std::path::PathBuf;

use jsonschema::JSONSchema;
use serde_json::Value;

/// Absolute path of a file under the workspace `contracts/` directory.
pub fn contract_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../contracts")
        .join(relative)
}

/// Reads a contract file as raw text.
///
/// # Errors
/// Returns the I/O error when the file cannot be read.
pub fn load_text(relative: &str) -> std::io::Result<String> {
    std::fs::read_to_string(contract_path(relative))
}

/// Reads and parses a contract JSON document.
///
/// # Errors
/// Returns a description when the file is missing or not valid JSON.
pub fn load_json(relative: &str) -> Result<Value, String> {
    let raw = load_text(relative).map_err(|error| format!("{relative}: {error}"))?;
    serde_json::from_str(&raw).map_err(|error| format!("{relative}: {error}"))
}

/// Compiles a contract schema into a validator.
///
/// # Errors
/// Returns a description when the schema cannot be loaded or compiled.
pub fn compile_validator(relative: &str) -> Result<JSONSchema, String> {
    let schema = load_json(relative)?;
    JSONSchema::compile(&schema).map_err(|error| format!("{relative}: {error}"))
}
