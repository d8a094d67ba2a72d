//! OpenAI Assistants provider implementation for TownChat
//!
//! This module implements [`AssistantApi`] against the OpenAI Assistants v2
//! REST API: threads, messages, runs and assistant management.

use crate::config::OpenAiConfig;
use crate::error::{Result, TownchatError};
use crate::providers::{Assistant, AssistantApi, AssistantSpec, Run, Thread, ThreadMessage};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of messages fetched when extracting a reply
const MESSAGE_PAGE_SIZE: u32 = 20;

/// OpenAI Assistants API provider
///
/// # Examples
///
/// ```
/// use townchat::config::OpenAiConfig;
/// use townchat::providers::OpenAiProvider;
///
/// let config = OpenAiConfig {
///     api_key: Some("sk-test".to_string()),
///     ..Default::default()
/// };
/// let provider = OpenAiProvider::new(config);
/// assert!(provider.is_ok());
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

/// Body of `POST /threads/{id}/messages`
#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: &'a str,
    content: &'a str,
}

/// Body of `POST /threads/{id}/runs`
#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

/// Envelope of list endpoints
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider instance
    ///
    /// # Errors
    ///
    /// Returns `TownchatError::Config` when no API key is configured and
    /// `TownchatError::Provider` if the HTTP client cannot be built
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            TownchatError::Config(
                "Missing OpenAI API key (set TOWNCHAT_OPENAI_API_KEY or OPENAI_API_KEY)"
                    .to_string(),
            )
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| TownchatError::Config(format!("Invalid API key header: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            HeaderName::from_static("openai-beta"),
            HeaderValue::from_static("assistants=v2"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("townchat/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| TownchatError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(api_base = %config.api_base, "Initialized OpenAI assistants provider");

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Turn a non-success response into a provider error carrying the body
    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(%status, action, "OpenAI returned error: {}", body);
        Err(TownchatError::Provider(format!("{} failed with {}: {}", action, status, body)).into())
    }
}

#[async_trait]
impl AssistantApi for OpenAiProvider {
    fn thread_prefix(&self) -> &str {
        &self.config.thread_prefix
    }

    async fn create_thread(&self) -> Result<Thread> {
        let response = self
            .client
            .post(self.url("/threads"))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let response = Self::ensure_success(response, "create thread").await?;
        let thread: Thread = response.json().await?;
        tracing::debug!(thread_id = %thread.id, "Created thread");
        Ok(thread)
    }

    async fn post_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/threads/{}/messages", thread_id)))
            .json(&CreateMessageRequest {
                role: "user",
                content,
            })
            .send()
            .await?;
        Self::ensure_success(response, "create message").await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let response = self
            .client
            .post(self.url(&format!("/threads/{}/runs", thread_id)))
            .json(&CreateRunRequest { assistant_id })
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(assistant_id, "Assistant not found when starting run: {}", body);
            return Err(TownchatError::AssistantNotFound(assistant_id.to_string()).into());
        }

        let response = Self::ensure_success(response, "create run").await?;
        let run: Run = response.json().await?;
        tracing::debug!(run_id = %run.id, status = %run.status, "Started run");
        Ok(run)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let response = self
            .client
            .get(self.url(&format!("/threads/{}/runs/{}", thread_id, run_id)))
            .send()
            .await?;
        let response = Self::ensure_success(response, "retrieve run").await?;
        Ok(response.json().await?)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let response = self
            .client
            .get(self.url(&format!("/threads/{}/messages", thread_id)))
            .query(&[("order", "desc".to_string()), ("limit", MESSAGE_PAGE_SIZE.to_string())])
            .send()
            .await?;
        let response = Self::ensure_success(response, "list messages").await?;
        let list: ListResponse<ThreadMessage> = response.json().await?;
        Ok(list.data)
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant> {
        let response = self
            .client
            .post(self.url("/assistants"))
            .json(spec)
            .send()
            .await?;
        let response = Self::ensure_success(response, "create assistant").await?;
        let assistant: Assistant = response.json().await?;
        tracing::info!(assistant_id = %assistant.id, name = %spec.name, "Created assistant");
        Ok(assistant)
    }

    async fn update_assistant(
        &self,
        assistant_id: &str,
        spec: &AssistantSpec,
    ) -> Result<Assistant> {
        let response = self
            .client
            .post(self.url(&format!("/assistants/{}", assistant_id)))
            .json(spec)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(TownchatError::AssistantNotFound(assistant_id.to_string()).into());
        }
        let response = Self::ensure_success(response, "update assistant").await?;
        Ok(response.json().await?)
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/assistants/{}", assistant_id)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(assistant_id, "Assistant already deleted");
            return Ok(());
        }
        Self::ensure_success(response, "delete assistant").await?;
        tracing::info!(assistant_id, "Deleted assistant");
        Ok(())
    }
}
