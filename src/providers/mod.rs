//! Provider module for TownChat
//!
//! This module contains the hosted assistant abstraction and its OpenAI
//! Assistants implementation.

pub mod base;
pub mod openai;

pub use base::{
    Assistant, AssistantApi, AssistantSpec, MessageContent, MessageRole, Run, RunLastError,
    RunStatus, TextContent, Thread, ThreadMessage,
};
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a provider instance based on configuration
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn AssistantApi>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.openai.clone())?)),
        other => Err(crate::error::TownchatError::Provider(format!(
            "Unknown provider type: {}",
            other
        ))
        .into()),
    }
}
