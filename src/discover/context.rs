//! Discovery context

use crate::catalog::resolver::{default_updated_statement, stream_keys, system_fields};
use crate::catalog::{
    activity_stream, custom_object_stream, Catalog, CatalogEntry, MetadataEntry, StreamKind,
    ACTIVITY_TYPES, BUILT_IN_BULK_OBJECTS, REST_ENDPOINTS, STATEMENT_KEY, VENDOR_ID_KEY,
};
use crate::client::Transport;
use crate::error::{Error, Result};
use crate::schema::{JsonSchema, JsonType, SchemaProperty};
use crate::types::{JsonObject, JsonValue};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Page size for `/fields` and `/customObjects` listings
pub const FIELDS_PAGE_SIZE: u64 = 1000;

static FIELD_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r".*/fields/([0-9]+)").unwrap());
static CUSTOM_OBJECT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/customObjects/([0-9]+)").unwrap());

/// Map an Eloqua field data type to a nullable JSON schema property
pub fn field_type(data_type: &str) -> SchemaProperty {
    match data_type {
        "date" => SchemaProperty::date_time(),
        "number" => SchemaProperty::nullable(JsonType::Number),
        _ => SchemaProperty::nullable(JsonType::String),
    }
}

/// Per-run discovery state
pub struct DiscoveryContext {
    client: Arc<dyn Transport>,
    catalog: OnceCell<Catalog>,
}

impl DiscoveryContext {
    /// Create a context that talks to the vendor through `client`
    pub fn new(client: Arc<dyn Transport>) -> Self {
        Self {
            client,
            catalog: OnceCell::new(),
        }
    }

    /// Full catalog, discovered on first call
    pub async fn catalog(&self) -> Result<&Catalog> {
        self.catalog.get_or_try_init(|| self.discover()).await
    }

    async fn discover(&self) -> Result<Catalog> {
        let mut streams = Vec::new();

        for object in BUILT_IN_BULK_OBJECTS {
            let path = format!("/api/bulk/2.0/{object}/fields");
            let items = self.list(&path, &[], "bulk_fields").await?;
            let kind = StreamKind::BuiltIn {
                object: (*object).to_string(),
            };
            streams.push(bulk_entry(object, &kind, &items)?);
        }

        for activity_type in ACTIVITY_TYPES {
            let items = self
                .list(
                    "/api/bulk/2.0/activities/fields",
                    &[("activityType", (*activity_type).to_string())],
                    "bulk_fields",
                )
                .await?;
            let kind = StreamKind::Activity {
                activity_type: (*activity_type).to_string(),
            };
            streams.push(bulk_entry(&activity_stream(activity_type), &kind, &items)?);
        }

        let objects = self
            .list("/api/bulk/2.0/customObjects", &[], "custom_objects")
            .await?;
        for object in &objects {
            let uri = object.get("uri").and_then(JsonValue::as_str).unwrap_or("");
            let object_id = CUSTOM_OBJECT_ID
                .captures(uri)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| Error::discovery(format!("custom object uri '{uri}' has no id")))?;
            let name = object
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| Error::discovery(format!("custom object {object_id} has no name")))?;

            let path = format!("/api/bulk/2.0/customObjects/{object_id}/fields");
            let items = self.list(&path, &[], "bulk_fields").await?;
            let stream = custom_object_stream(name);
            debug!(stream = %stream, object_id = %object_id, "Discovered custom object");

            let kind = StreamKind::Custom { object_id };
            streams.push(bulk_entry(&stream, &kind, &items)?);
        }

        for endpoint in REST_ENDPOINTS {
            streams.push(rest_entry(endpoint.stream)?);
        }

        info!(streams = streams.len(), "Discovery complete");
        Ok(Catalog { streams })
    }

    /// Drain an offset-paginated listing
    async fn list(
        &self,
        path: &str,
        params: &[(&str, String)],
        endpoint: &str,
    ) -> Result<Vec<JsonValue>> {
        let mut items = Vec::new();
        let mut offset = 0;
        loop {
            let mut query = params.to_vec();
            query.push(("limit", FIELDS_PAGE_SIZE.to_string()));
            query.push(("offset", offset.to_string()));

            let page = self.client.get(path, &query, endpoint).await?;
            if let Some(page_items) = page.get("items").and_then(JsonValue::as_array) {
                items.extend(page_items.iter().cloned());
            }

            let has_more = page
                .get("hasMore")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            if !has_more {
                return Ok(items);
            }
            offset += FIELDS_PAGE_SIZE;
        }
    }
}

impl std::fmt::Debug for DiscoveryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryContext")
            .field("discovered", &self.catalog.initialized())
            .finish_non_exhaustive()
    }
}

fn root_metadata(key: &str, updated_at: &str, vendor_id: Option<&str>) -> JsonObject {
    let mut root = JsonObject::new();
    root.insert("table-key-properties".to_string(), json!([key]));
    root.insert("valid-replication-keys".to_string(), json!([updated_at]));
    root.insert("forced-replication-method".to_string(), json!("INCREMENTAL"));
    if let Some(id) = vendor_id {
        root.insert(VENDOR_ID_KEY.to_string(), json!(id));
    }
    root
}

fn field_metadata(inclusion: &str, statement: Option<&str>, field_id: Option<&str>) -> JsonObject {
    let mut meta = JsonObject::new();
    meta.insert("inclusion".to_string(), json!(inclusion));
    if let Some(statement) = statement {
        meta.insert(STATEMENT_KEY.to_string(), json!(statement));
    }
    if let Some(id) = field_id {
        meta.insert(VENDOR_ID_KEY.to_string(), json!(id));
    }
    meta
}

fn bulk_entry(stream: &str, kind: &StreamKind, items: &[JsonValue]) -> Result<CatalogEntry> {
    let (key, updated_at) = stream_keys(kind);
    let automatic = |name: &str| name == key || name == updated_at;

    let mut schema = JsonSchema::new();
    let mut fields = Vec::new();

    for item in items {
        let name = item
            .get("internalName")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::discovery(format!("{stream}: field without internalName")))?;
        let statement = item.get("statement").and_then(JsonValue::as_str);
        let data_type = item
            .get("dataType")
            .and_then(JsonValue::as_str)
            .unwrap_or("string");
        let field_id = item
            .get("uri")
            .and_then(JsonValue::as_str)
            .and_then(|uri| FIELD_ID.captures(uri))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        schema.add_property(name, field_type(data_type));
        let inclusion = if automatic(name) { "automatic" } else { "available" };
        fields.push(MetadataEntry::field(
            name,
            field_metadata(inclusion, statement, field_id),
        ));
    }

    let mut injected: Vec<(String, String)> = system_fields(kind)
        .into_iter()
        .map(|(name, statement)| (name.to_string(), statement))
        .collect();
    if let Some(statement) = default_updated_statement(kind, updated_at) {
        injected.push((updated_at.to_string(), statement));
    }
    for (name, statement) in injected {
        if schema.get_property(&name).is_some() {
            continue;
        }
        let prop = if name.ends_with("Id") {
            SchemaProperty::nullable(JsonType::String)
        } else {
            SchemaProperty::date_time()
        };
        schema.add_property(&name, prop);
        let inclusion = if automatic(&name) { "automatic" } else { "available" };
        fields.push(MetadataEntry::field(
            &name,
            field_metadata(inclusion, Some(&statement), None),
        ));
    }

    let vendor_id = match kind {
        StreamKind::Custom { object_id } => Some(object_id.as_str()),
        _ => None,
    };
    let mut metadata = vec![MetadataEntry::root(root_metadata(key, updated_at, vendor_id))];
    metadata.extend(fields);

    Ok(CatalogEntry {
        tap_stream_id: stream.to_string(),
        stream: stream.to_string(),
        key_properties: vec![key.to_string()],
        schema,
        metadata,
    })
}

fn rest_entry(stream: &str) -> Result<CatalogEntry> {
    let endpoint = crate::catalog::rest_endpoint(stream)
        .ok_or_else(|| Error::discovery(format!("no REST endpoint named {stream}")))?;
    let schema: JsonSchema = serde_json::from_str(endpoint.schema)
        .map_err(|e| Error::discovery(format!("bundled schema for {stream} is invalid: {e}")))?;

    let mut metadata = vec![MetadataEntry::root(root_metadata(
        endpoint.key,
        endpoint.order_by,
        None,
    ))];
    for name in schema.properties.keys() {
        let inclusion = if name == endpoint.key || name == endpoint.order_by {
            "automatic"
        } else {
            "available"
        };
        metadata.push(MetadataEntry::field(name, field_metadata(inclusion, None, None)));
    }

    Ok(CatalogEntry {
        tap_stream_id: stream.to_string(),
        stream: stream.to_string(),
        key_properties: vec![endpoint.key.to_string()],
        schema,
        metadata,
    })
}
