//! Prompt Service
//!
//! Catalog of prompt templates with message factories, mirroring the
//! resource service shape: case-insensitive unique names, insertion-order
//! listing, `PromptNotFound` on miss.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Layer 2: Third-party crate imports
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

// Layer 3: Internal module imports
use crate::protocol::{GetPromptResult, McpError, McpResult, Prompt, PromptMessage};

/// Boxed asynchronous prompt message factory
///
/// Receives the argument values supplied by the client (possibly absent).
pub type PromptFactoryFn =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, McpResult<Vec<PromptMessage>>> + Send + Sync>;

struct PromptEntry {
    prompt: Prompt,
    factory: PromptFactoryFn,
}

#[derive(Default)]
struct PromptRegistry {
    order: Vec<String>,
    entries: HashMap<String, Arc<PromptEntry>>,
}

/// Prompt catalog service
pub struct PromptService {
    registry: Mutex<PromptRegistry>,
}

impl PromptService {
    /// Create an empty prompt service
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(PromptRegistry::default()),
        }
    }

    /// Register a prompt descriptor with its message factory
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the name (case-insensitively) is taken.
    pub fn register(&self, prompt: Prompt, factory: PromptFactoryFn) -> McpResult<()> {
        let key = prompt.name.to_lowercase();
        let mut registry = self.lock();
        if registry.entries.contains_key(&key) {
            return Err(McpError::invalid_request(format!(
                "prompt already registered: {}",
                prompt.name
            )));
        }
        registry.order.push(key.clone());
        registry.entries.insert(
            key,
            Arc::new(PromptEntry {
                prompt: prompt.clone(),
                factory,
            }),
        );
        Ok(())
    }

    /// Register a prompt with an async factory closure
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the name is taken.
    pub fn register_fn<F, Fut>(&self, prompt: Prompt, factory: F) -> McpResult<()>
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = McpResult<Vec<PromptMessage>>> + Send + 'static,
    {
        let wrapped: PromptFactoryFn = Arc::new(move |arguments| Box::pin(factory(arguments)));
        self.register(prompt, wrapped)
    }

    /// Whether any prompt is registered (drives capability advertisement)
    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    /// All descriptors in insertion order
    pub fn list_prompts(&self) -> Vec<Prompt> {
        let registry = self.lock();
        registry
            .order
            .iter()
            .filter_map(|key| registry.entries.get(key).map(|entry| entry.prompt.clone()))
            .collect()
    }

    /// Render a prompt by name
    ///
    /// # Errors
    ///
    /// * `InvalidParams` when the name is empty
    /// * `PromptNotFound` when no prompt matches
    /// * `Internal` when the factory itself fails
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> McpResult<GetPromptResult> {
        if name.is_empty() {
            return Err(McpError::invalid_params("name must not be empty"));
        }

        let entry = {
            let registry = self.lock();
            registry.entries.get(&name.to_lowercase()).cloned()
        }
        .ok_or_else(|| McpError::prompt_not_found(name))?;

        debug!(prompt = name, "rendering prompt");
        let messages = (entry.factory)(arguments)
            .await
            .map_err(|error| McpError::internal(error.to_string()))?;

        Ok(GetPromptResult {
            description: entry.prompt.description.clone(),
            messages,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PromptRegistry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for PromptService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PromptService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptService")
            .field("prompts", &self.lock().order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Content;
    use serde_json::json;

    fn descriptor(name: &str) -> Prompt {
        Prompt {
            name: name.to_string(),
            title: None,
            description: Some("A test prompt".to_string()),
            arguments: vec![],
        }
    }

    #[tokio::test]
    async fn get_round_trip() {
        let service = PromptService::new();
        service
            .register_fn(descriptor("greet"), |arguments| async move {
                let who = arguments
                    .as_ref()
                    .and_then(|a| a.get("who"))
                    .and_then(Value::as_str)
                    .unwrap_or("stranger")
                    .to_string();
                Ok(vec![PromptMessage {
                    role: "user".to_string(),
                    content: Content::text(format!("Greet {who}")),
                }])
            })
            .unwrap();

        let result = service
            .get_prompt("greet", Some(json!({"who": "Rogue Trader"})))
            .await
            .unwrap();
        assert_eq!(result.description.as_deref(), Some("A test prompt"));
        assert_eq!(
            result.messages[0].content,
            Content::text("Greet Rogue Trader")
        );
    }

    #[tokio::test]
    async fn name_lookup_is_case_insensitive() {
        let service = PromptService::new();
        service
            .register_fn(descriptor("Greet"), |_| async { Ok(vec![]) })
            .unwrap();
        assert!(service.get_prompt("GREET", None).await.is_ok());
        assert!(service
            .register_fn(descriptor("greet"), |_| async { Ok(vec![]) })
            .is_err());
    }

    #[tokio::test]
    async fn unknown_name_is_prompt_not_found() {
        let service = PromptService::new();
        let err = service.get_prompt("missing", None).await.unwrap_err();
        assert!(matches!(err, McpError::PromptNotFound { .. }));
    }

    #[test]
    fn list_preserves_insertion_order() {
        let service = PromptService::new();
        for name in ["second", "first", "third"] {
            service
                .register_fn(descriptor(name), |_| async { Ok(vec![]) })
                .unwrap();
        }
        let names: Vec<String> = service.list_prompts().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["second", "first", "third"]);
    }
}
