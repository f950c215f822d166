use super::envelope::ResultEnvelope;
use super::error::ToolResult;
use super::params::Params;
use super::schema::ParameterSchema;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;

/// The core trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of the tool (e.g., "fetch_ai_models")
    fn name(&self) -> String;

    /// A human-readable description of what the tool does
    fn description(&self) -> String;

    /// The parameters the tool accepts
    fn parameters(&self) -> ParameterSchema;

    /// Execute the tool with the given arguments.
    ///
    /// `Err` is reported by the dispatcher as a failed envelope; tools that
    /// need a specific failure shape return `Ok` with `success: false`.
    async fn call(&self, params: Params) -> ToolResult<ResultEnvelope>;
}

type Handler = Box<dyn Fn(Params) -> BoxFuture<'static, ToolResult<ResultEnvelope>> + Send + Sync>;

/// A tool built from a name, description, schema and an async closure
pub struct FnTool {
    name: String,
    description: String,
    parameters: ParameterSchema,
    handler: Handler,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<ResultEnvelope>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Box::new(move |params| Box::pin(handler(params))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn parameters(&self) -> ParameterSchema {
        self.parameters.clone()
    }

    async fn call(&self, params: Params) -> ToolResult<ResultEnvelope> {
        (self.handler)(params).await
    }
}
