//! Completion Service
//!
//! Handler table for `completion/complete`, keyed by
//! `(reference kind, identifier)` where the kind is `ref/prompt` or
//! `ref/resource` and the identifier is the prompt name or resource URI.
//! Registering any handler advertises the `completions` capability.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Layer 2: Third-party crate imports
use futures::future::BoxFuture;
use tracing::debug;

// Layer 3: Internal module imports
use crate::protocol::{defaults, CompleteResult, Completion, McpError, McpResult};

/// Reference kind a completion handler is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionRefKind {
    /// `ref/prompt`
    Prompt,
    /// `ref/resource`
    Resource,
}

impl CompletionRefKind {
    /// Parse and normalize a wire reference type
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` for anything but the two known kinds.
    pub fn parse(reference_type: &str) -> McpResult<Self> {
        match reference_type.trim().to_lowercase().as_str() {
            "ref/prompt" => Ok(Self::Prompt),
            "ref/resource" => Ok(Self::Resource),
            other => Err(McpError::invalid_params(format!(
                "unknown completion reference type: {other}"
            ))),
        }
    }
}

/// Boxed asynchronous completion handler
///
/// Receives the argument name and the partial value typed so far.
pub type CompletionHandlerFn =
    Arc<dyn Fn(String, String) -> BoxFuture<'static, McpResult<Completion>> + Send + Sync>;

/// Completion handler table
pub struct CompletionService {
    handlers: Mutex<HashMap<(CompletionRefKind, String), CompletionHandlerFn>>,
}

impl CompletionService {
    /// Create an empty completion service
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a handler for one reference
    ///
    /// The identifier is trimmed before keying so lookups tolerate client
    /// whitespace.
    pub fn register(
        &self,
        kind: CompletionRefKind,
        identifier: impl Into<String>,
        handler: CompletionHandlerFn,
    ) {
        let identifier = identifier.into().trim().to_string();
        self.lock().insert((kind, identifier), handler);
    }

    /// Register a handler from an async closure
    pub fn register_fn<F, Fut>(&self, kind: CompletionRefKind, identifier: impl Into<String>, f: F)
    where
        F: Fn(String, String) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = McpResult<Completion>> + Send + 'static,
    {
        let wrapped: CompletionHandlerFn =
            Arc::new(move |argument, value| Box::pin(f(argument, value)));
        self.register(kind, identifier, wrapped);
    }

    /// Whether any handler is registered (drives capability advertisement)
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Dispatch a completion request
    ///
    /// # Errors
    ///
    /// * `InvalidParams` when no handler matches the reference
    /// * `Internal` when the handler itself fails
    pub async fn complete(
        &self,
        kind: CompletionRefKind,
        identifier: &str,
        argument_name: &str,
        partial_value: &str,
    ) -> McpResult<CompleteResult> {
        let handler = self
            .lock()
            .get(&(kind, identifier.trim().to_string()))
            .cloned()
            .ok_or_else(|| {
                McpError::invalid_params(format!(
                    "no completion handler for {kind:?} '{identifier}'"
                ))
            })?;

        debug!(?kind, identifier, argument = argument_name, "dispatching completion");
        let mut completion = handler(argument_name.to_string(), partial_value.to_string())
            .await
            .map_err(|error| McpError::internal(error.to_string()))?;

        // At most 100 values per response by convention
        if completion.values.len() > defaults::MAX_COMPLETION_VALUES {
            completion.values.truncate(defaults::MAX_COMPLETION_VALUES);
            completion.has_more = Some(true);
        }

        Ok(CompleteResult { completion })
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<(CompletionRefKind, String), CompletionHandlerFn>> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CompletionService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompletionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionService")
            .field("handlers", &self.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_prompt_handler() -> CompletionService {
        let service = CompletionService::new();
        service.register_fn(CompletionRefKind::Prompt, "greet", |_argument, value| async move {
            let names = ["Calgar", "Cawl", "Celestine"];
            Ok(Completion {
                values: names
                    .iter()
                    .filter(|n| n.to_lowercase().starts_with(&value.to_lowercase()))
                    .map(|n| n.to_string())
                    .collect(),
                total: None,
                has_more: None,
            })
        });
        service
    }

    #[tokio::test]
    async fn prefix_completion() {
        let service = service_with_prompt_handler();
        let result = service
            .complete(CompletionRefKind::Prompt, "greet", "who", "Ca")
            .await
            .unwrap();
        assert_eq!(result.completion.values, vec!["Calgar", "Cawl"]);
    }

    #[tokio::test]
    async fn identifier_is_trimmed() {
        let service = service_with_prompt_handler();
        assert!(service
            .complete(CompletionRefKind::Prompt, "  greet  ", "who", "")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn missing_handler_is_invalid_params() {
        let service = service_with_prompt_handler();
        let err = service
            .complete(CompletionRefKind::Resource, "mem://x", "arg", "")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), -32602);
    }

    #[tokio::test]
    async fn values_are_capped_at_limit() {
        let service = CompletionService::new();
        service.register_fn(CompletionRefKind::Resource, "mem://big", |_a, _v| async {
            Ok(Completion {
                values: (0..250).map(|i| format!("value-{i}")).collect(),
                total: Some(250),
                has_more: None,
            })
        });

        let result = service
            .complete(CompletionRefKind::Resource, "mem://big", "arg", "")
            .await
            .unwrap();
        assert_eq!(result.completion.values.len(), 100);
        assert_eq!(result.completion.has_more, Some(true));
    }

    #[test]
    fn reference_kind_parsing() {
        assert_eq!(
            CompletionRefKind::parse("ref/prompt").unwrap(),
            CompletionRefKind::Prompt
        );
        assert_eq!(
            CompletionRefKind::parse(" REF/RESOURCE ").unwrap(),
            CompletionRefKind::Resource
        );
        assert!(CompletionRefKind::parse("ref/tool").is_err());
    }
}
