//! Schema module
//!
//! JSON schema types for stream catalogs and the record transformer that
//! coerces vendor rows into those schemas.
//!
//! # Features
//!
//! - **Nullable types**: `["null", "string"]` style unions
//! - **Date-time normalization**: vendor timestamps rewritten as RFC 3339 UTC
//! - **Selection filtering**: deselected and unknown fields are dropped

mod transform;
mod types;

pub use transform::Transformer;
pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};

#[cfg(test)]
mod tests;
