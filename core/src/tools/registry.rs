use super::envelope::ResultEnvelope;
use super::error::ToolResult;
use super::params::Params;
use super::schema::ParameterSchema;
use super::traits::{FnTool, Tool};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable snapshot of a registered tool.
///
/// Name, description and schema are captured once at registration so
/// introspection never calls back into the tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
    tool: Arc<dyn Tool>,
}

impl ToolDescriptor {
    pub fn from_tool(tool: Arc<dyn Tool>) -> Self {
        Self {
            name: tool.name(),
            description: tool.description(),
            parameters: tool.parameters(),
            tool,
        }
    }

    /// The execution behavior behind this descriptor
    pub fn tool(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.tool)
    }

    pub async fn call(&self, params: Params) -> ToolResult<ResultEnvelope> {
        self.tool.call(params).await
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

struct Slot {
    // registration sequence; kept when a name is overwritten
    seq: u64,
    descriptor: ToolDescriptor,
}

/// A registry for managing available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, Slot>>,
    next_seq: Arc<AtomicU64>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later registration with the same name replaces it
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let descriptor = ToolDescriptor::from_tool(tool);
        let name = descriptor.name.clone();

        match self.tools.entry(name) {
            Entry::Occupied(mut slot) => {
                debug!(target: "tool_registry", tool = %slot.key(), "Replacing registered tool");
                slot.get_mut().descriptor = descriptor;
            }
            Entry::Vacant(slot) => {
                info!(target: "tool_registry", tool = %slot.key(), "Registering tool");
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Slot { seq, descriptor });
            }
        }
    }

    /// Register an async closure as a tool
    pub fn register_fn<F, Fut>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: F,
    ) where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<ResultEnvelope>> + Send + 'static,
    {
        self.register(Arc::new(FnTool::new(name, description, parameters, handler)));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<ToolDescriptor> {
        self.tools.get(name).map(|e| e.descriptor.clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all registered tools in registration order
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let mut entries: Vec<(u64, ToolDescriptor)> = self
            .tools
            .iter()
            .map(|e| (e.seq, e.descriptor.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, d)| d).collect()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.list_tools().into_iter().map(|d| d.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
