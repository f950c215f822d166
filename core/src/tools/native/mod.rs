pub mod model_catalog;
pub mod model_switch;
pub mod screenshot;
pub mod web_search;

pub use model_catalog::{ModelCatalogConfig, ModelCatalogTool};
pub use model_switch::{ModelSwitchHandler, ModelSwitchSlot, ModelSwitchTool};
pub use screenshot::{ScreenshotConfig, ScreenshotTool};
pub use web_search::{SearchResult, WebSearchConfig, WebSearchTool};

use crate::config::SwitchboardConfig;
use crate::Dispatcher;
use std::sync::Arc;
use tracing::info;

pub const SCREENSHOT_TOOL: &str = "screenshot";
pub const MODEL_LIST_TOOL: &str = "fetch_ai_models";
pub const MODEL_SWITCH_TOOL: &str = "switch_ai_model";
pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Register the built-in tools on `dispatcher`.
///
/// `screenshot` is only registered when a screenshot API key is configured,
/// so `has_screenshot_capability` reflects the deployment.
pub fn register_builtin_tools(dispatcher: &Dispatcher, config: &SwitchboardConfig) {
    let models: Arc<ModelCatalogTool> =
        Arc::new(ModelCatalogTool::with_config(config.models.clone()));
    dispatcher.register(models.clone());
    dispatcher.register(Arc::new(ModelSwitchTool::new(
        models,
        dispatcher.model_switch_slot(),
    )));

    dispatcher.register(Arc::new(WebSearchTool::with_config(config.search.clone())));

    if config.screenshot.is_configured() {
        dispatcher.register(Arc::new(ScreenshotTool::with_config(config.screenshot.clone())));
    } else {
        info!(target: "builtin_tools", "No screenshot API key configured, skipping screenshot tool");
    }
}
