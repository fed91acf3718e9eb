//! Catalog module
//!
//! Singer-style catalog documents, the fixed stream definitions, and the
//! resolver that turns a selected catalog entry into a `StreamDescriptor`.

pub mod resolver;
mod streams;
mod types;

pub use resolver::{resolve, StreamDescriptor, StreamKind};
pub use streams::{
    activity_stream, activity_type_for, camel_to_snake, custom_object_stream, rest_endpoint,
    RestEndpoint, ACTIVITY_TYPES, BUILT_IN_BULK_OBJECTS, REST_ENDPOINTS,
};
pub use types::{Catalog, CatalogEntry, MetadataEntry, STATEMENT_KEY, VENDOR_ID_KEY};
