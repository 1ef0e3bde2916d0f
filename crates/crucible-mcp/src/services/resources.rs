//! Resource Service
//!
//! Catalog of readable resources with lazy reader closures. URIs are unique
//! per server and compared case-insensitively; listing returns descriptors
//! in insertion order. The service owns each reader exclusively, and clones
//! the descriptor at registration so callers cannot mutate it afterwards.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Layer 2: Third-party crate imports
use futures::future::BoxFuture;
use tracing::debug;

// Layer 3: Internal module imports
use crate::protocol::{McpError, McpResult, Resource, ResourceContent};

/// Boxed asynchronous resource reader
pub type ResourceReaderFn =
    Arc<dyn Fn() -> BoxFuture<'static, McpResult<Vec<ResourceContent>>> + Send + Sync>;

struct ResourceEntry {
    resource: Resource,
    reader: ResourceReaderFn,
}

#[derive(Default)]
struct ResourceRegistry {
    // Keys are lowercased URIs; order holds the original casing
    order: Vec<String>,
    entries: HashMap<String, Arc<ResourceEntry>>,
}

/// Resource catalog service
pub struct ResourceService {
    registry: Mutex<ResourceRegistry>,
}

impl ResourceService {
    /// Create an empty resource service
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(ResourceRegistry::default()),
        }
    }

    /// Register a resource descriptor with its reader
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the URI (case-insensitively) is taken.
    pub fn register(&self, resource: Resource, reader: ResourceReaderFn) -> McpResult<()> {
        let key = resource.uri.to_lowercase();
        let mut registry = self.lock();
        if registry.entries.contains_key(&key) {
            return Err(McpError::invalid_request(format!(
                "resource already registered: {}",
                resource.uri
            )));
        }
        registry.order.push(key.clone());
        // Descriptor is cloned into the entry; the caller's copy is inert
        registry.entries.insert(
            key,
            Arc::new(ResourceEntry {
                resource: resource.clone(),
                reader,
            }),
        );
        Ok(())
    }

    /// Register a resource with an async reader closure
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the URI is taken.
    pub fn register_fn<F, Fut>(&self, resource: Resource, reader: F) -> McpResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = McpResult<Vec<ResourceContent>>> + Send + 'static,
    {
        let wrapped: ResourceReaderFn = Arc::new(move || Box::pin(reader()));
        self.register(resource, wrapped)
    }

    /// Whether any resource is registered (drives capability advertisement)
    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    /// All descriptors in insertion order
    pub fn list_resources(&self) -> Vec<Resource> {
        let registry = self.lock();
        registry
            .order
            .iter()
            .filter_map(|key| {
                registry
                    .entries
                    .get(key)
                    .map(|entry| entry.resource.clone())
            })
            .collect()
    }

    /// Read a resource by URI
    ///
    /// # Errors
    ///
    /// * `InvalidParams` when the URI is empty
    /// * `ResourceNotFound` when no resource matches
    /// * `Internal` when the reader itself fails
    pub async fn read_resource(&self, uri: &str) -> McpResult<Vec<ResourceContent>> {
        if uri.is_empty() {
            return Err(McpError::invalid_params("uri must not be empty"));
        }

        let entry = {
            let registry = self.lock();
            registry.entries.get(&uri.to_lowercase()).cloned()
        }
        .ok_or_else(|| McpError::resource_not_found(uri))?;

        debug!(uri, "reading resource");
        (entry.reader)()
            .await
            .map_err(|error| McpError::internal(error.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResourceRegistry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ResourceService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceService")
            .field("resources", &self.lock().order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(uri: &str) -> Resource {
        Resource {
            uri: uri.to_string(),
            name: "Test".to_string(),
            description: None,
            mime_type: Some("text/plain".to_string()),
            annotations: None,
        }
    }

    #[tokio::test]
    async fn read_round_trip() {
        let service = ResourceService::new();
        service
            .register_fn(descriptor("mem://codex/intro"), || async {
                Ok(vec![ResourceContent::text("mem://codex/intro", "In the grim darkness...")])
            })
            .unwrap();

        let contents = service.read_resource("mem://codex/intro").await.unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].text.as_deref(), Some("In the grim darkness..."));
    }

    #[tokio::test]
    async fn uri_lookup_is_case_insensitive() {
        let service = ResourceService::new();
        service
            .register_fn(descriptor("mem://Codex/Intro"), || async {
                Ok(vec![ResourceContent::text("mem://Codex/Intro", "x")])
            })
            .unwrap();

        assert!(service.read_resource("MEM://CODEX/INTRO").await.is_ok());
        // And registration collides case-insensitively too
        assert!(service
            .register_fn(descriptor("mem://codex/intro"), || async { Ok(vec![]) })
            .is_err());
    }

    #[tokio::test]
    async fn unknown_uri_is_resource_not_found() {
        let service = ResourceService::new();
        let err = service.read_resource("mem://missing").await.unwrap_err();
        assert!(matches!(err, McpError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn empty_uri_is_invalid_params() {
        let service = ResourceService::new();
        let err = service.read_resource("").await.unwrap_err();
        assert_eq!(err.error_code(), -32602);
    }

    #[tokio::test]
    async fn reader_failure_is_internal_error() {
        let service = ResourceService::new();
        service
            .register_fn(descriptor("mem://broken"), || async {
                Err(McpError::invalid_request("disk melted"))
            })
            .unwrap();

        let err = service.read_resource("mem://broken").await.unwrap_err();
        assert_eq!(err.error_code(), -32603);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let service = ResourceService::new();
        for uri in ["mem://b", "mem://a", "mem://c"] {
            service
                .register_fn(descriptor(uri), || async { Ok(vec![]) })
                .unwrap();
        }
        let uris: Vec<String> = service
            .list_resources()
            .into_iter()
            .map(|r| r.uri)
            .collect();
        assert_eq!(uris, vec!["mem://b", "mem://a", "mem://c"]);
    }
}
