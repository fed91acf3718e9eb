//! Discovery module
//!
//! Builds the stream catalog from the vendor's bulk field metadata plus the
//! bundled REST schemas. Results are cached on the [`DiscoveryContext`], which
//! is owned by a single run.

mod context;

pub use context::{field_type, DiscoveryContext, FIELDS_PAGE_SIZE};

#[cfg(test)]
mod tests;
