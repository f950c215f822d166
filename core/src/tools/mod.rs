pub mod envelope;
pub mod error;
pub mod native;
pub mod params;
pub mod registry;
pub mod schema;
pub mod traits;

// Re-export common types
pub use envelope::ResultEnvelope;
pub use error::{ToolError, ToolResult};
pub use params::Params;
pub use registry::{ToolDescriptor, ToolRegistry};
pub use schema::{ParamType, ParameterSchema, ParameterSpec};
pub use traits::{FnTool, Tool};
