//! Shared application state

use crate::WebConfig;
use edgepass_applications::EdgepassApplication;
use std::sync::Arc;

/// State handed to every handler; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub application: Arc<EdgepassApplication>,
    web_config: Arc<WebConfig>,
}

impl AppState {
    pub fn new(application: EdgepassApplication, web_config: WebConfig) -> Self {
        Self {
            application: Arc::new(application),
            web_config: Arc::new(web_config),
        }
    }

    pub fn web_config(&self) -> &WebConfig {
        &self.web_config
    }
}
