//! Tool registry for managing available tools.

use super::{ToolAdapter, ToolBinding, ToolInput, ToolResult};
use crate::error::UnsupportedToolError;
use std::collections::HashMap;
use std::time::Duration;

/// Per-call timeout applied to every tool unless overridden.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry of available tools, keyed by unique name.
///
/// Populated once at process start, then shared read-only behind an `Arc`.
/// Lookups are safe from concurrent runs.
///
/// # Example
///
/// ```no_run
/// use krishi_core::tool::ToolRegistry;
/// use std::time::Duration;
///
/// let mut registry = ToolRegistry::new().with_timeout(Duration::from_secs(10));
/// // registry.register(ToolBinding::text(Calculator));
/// // registry.register(ToolBinding::no_arg(LocationTool::default()));
///
/// for name in registry.list() {
///     println!("Available: {}", name);
/// }
/// println!("{}", registry.describe());
/// ```
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolAdapter>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Set the per-call timeout for tools registered after this call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    /// Returns `&mut Self` for chaining.
    pub fn register(&mut self, binding: ToolBinding) -> &mut Self {
        let name = binding.name().to_string();
        log::debug!("Registering tool '{}' ({})", name, binding.convention());
        if self
            .tools
            .insert(name.clone(), ToolAdapter::new(binding, self.timeout))
            .is_some()
        {
            log::warn!("Tool '{}' registered twice; keeping the latest", name);
        }
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolAdapter> {
        self.tools.get(name)
    }

    /// Invoke a tool by name with an optional parameter.
    ///
    /// Tool-level failures come back as [`ToolResult::Failure`].
    ///
    /// # Errors
    ///
    /// - `UnsupportedToolError::UnknownTool` if the name is not registered;
    ///   the message lists the available tools
    /// - `UnsupportedToolError::IncompatibleParameter` if the tool has no
    ///   form for the parameter kind
    pub async fn invoke(
        &self,
        name: &str,
        input: ToolInput,
    ) -> Result<ToolResult, UnsupportedToolError> {
        let adapter = self
            .tools
            .get(name)
            .ok_or_else(|| UnsupportedToolError::UnknownTool {
                name: name.to_string(),
                available: self.list().join(", "),
            })?;
        log::info!("Invoking tool '{}' with {} parameter", name, input.kind());
        adapter.invoke(input).await
    }

    /// List all registered tool names, sorted alphabetically.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Render `- name: description` lines, sorted by name.
    pub fn describe(&self) -> String {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check if a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
