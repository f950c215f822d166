// Switchboard Core Library
// Tool registry, dispatcher and execution state for AI agents

pub mod config;
pub mod dispatcher;
pub mod state;
pub mod telemetry;
pub mod tools;

// Export core types
pub use config::SwitchboardConfig;
pub use dispatcher::{Capabilities, Dispatcher, ToolDefinition};
pub use state::{ExecutionSnapshot, ExecutionState, StateChange, SubscriptionId};
pub use tools::native::{register_builtin_tools, ModelSwitchHandler};
pub use tools::{
    Params, ParamType, ParameterSchema, ParameterSpec, ResultEnvelope, Tool, ToolDescriptor,
    ToolError, ToolRegistry, ToolResult,
};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwitchboardError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
pub type Result<T> = std::result::Result<T, SwitchboardError>;

/// Dispatcher with the built-in tools registered from `config`
pub fn build_dispatcher(config: &SwitchboardConfig) -> Dispatcher {
    let dispatcher = Dispatcher::new();
    register_builtin_tools(&dispatcher, config);
    tracing::info!(
        target: "switchboard",
        tools = dispatcher.registry().len(),
        "Dispatcher ready"
    );
    dispatcher
}
