//! Chatbot lifecycle
//!
//! Keeps each store's chatbot row and its remote assistant in step. Remote
//! calls are best-effort: the local row is the source of truth and a failed
//! provider call is logged rather than returned.

use crate::error::{Result, TownchatError};
use crate::providers::{AssistantApi, AssistantSpec};
use crate::storage::{Chatbot, ChatbotStore, ChatbotUpdate, NewChatbot};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Build the assistant instructions for a chatbot
pub fn build_instructions(name: &str, greeting: &str, knowledge_base: &str) -> String {
    let mut instructions = format!(
        "You are the customer assistant for \"{}\", a local store. \
         Answer customer questions politely and concisely, in the language the customer uses. \
         If you do not know an answer, say so and suggest contacting the store directly.",
        name
    );
    if !greeting.trim().is_empty() {
        instructions.push_str("\n\nGreeting message:\n");
        instructions.push_str(greeting.trim());
    }
    if !knowledge_base.trim().is_empty() {
        instructions.push_str("\n\nStore information:\n");
        instructions.push_str(knowledge_base.trim());
    }
    instructions
}

fn assistant_spec(chatbot: &Chatbot) -> AssistantSpec {
    AssistantSpec {
        name: chatbot.name.clone(),
        instructions: build_instructions(
            &chatbot.name,
            &chatbot.greeting_message,
            &chatbot.knowledge_base,
        ),
        model: chatbot.model.clone(),
    }
}

/// Provisions, updates and removes chatbots
pub struct ChatbotService {
    api: Arc<dyn AssistantApi>,
    store: Arc<dyn ChatbotStore>,
    default_model: String,
}

impl ChatbotService {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        store: Arc<dyn ChatbotStore>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            default_model: default_model.into(),
        }
    }

    /// Register a chatbot for a store and create its remote assistant
    ///
    /// # Errors
    ///
    /// Returns [`TownchatError::BadRequest`] for a blank store id or name and
    /// [`TownchatError::Conflict`] if the store already has a chatbot. A
    /// failed assistant creation is not an error; the chatbot is stored
    /// without an assistant id.
    pub async fn provision(&self, new: NewChatbot) -> Result<Chatbot> {
        if new.store_id.trim().is_empty() || new.name.trim().is_empty() {
            return Err(
                TownchatError::BadRequest("storeId and name are required".to_string()).into(),
            );
        }

        let model = new
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());

        let spec = AssistantSpec {
            name: new.name.clone(),
            instructions: build_instructions(
                &new.name,
                new.greeting_message.as_deref().unwrap_or_default(),
                new.knowledge_base.as_deref().unwrap_or_default(),
            ),
            model: model.clone(),
        };

        let assistant_id = match self.api.create_assistant(&spec).await {
            Ok(assistant) => Some(assistant.id),
            Err(e) => {
                error!(store_id = %new.store_id, error = %e, "Failed to create assistant; chatbot stored without one");
                None
            }
        };

        let store_id = new.store_id.clone();
        let chatbot = match self
            .store
            .insert_chatbot(new, model, assistant_id.clone())
            .await
        {
            Ok(chatbot) => chatbot,
            Err(e) => {
                if let Some(id) = assistant_id {
                    self.discard_assistant(&id).await;
                }
                return Err(e);
            }
        };

        info!(
            chatbot_id = chatbot.id,
            store_id = %store_id,
            assistant_id = chatbot.assistant_id.as_deref().unwrap_or("-"),
            "Provisioned chatbot"
        );
        Ok(chatbot)
    }

    /// Apply a partial update and push it to the remote assistant
    pub async fn update(&self, chatbot_id: i64, update: ChatbotUpdate) -> Result<Chatbot> {
        let pushes_assistant = update.changes_assistant();
        let mut chatbot = self
            .store
            .update_chatbot(chatbot_id, update)
            .await?
            .ok_or_else(|| TownchatError::NotFound(format!("chatbot {}", chatbot_id)))?;

        match chatbot.assistant_id.clone() {
            Some(assistant_id) if pushes_assistant => {
                if let Err(e) = self
                    .api
                    .update_assistant(&assistant_id, &assistant_spec(&chatbot))
                    .await
                {
                    warn!(chatbot_id, assistant_id = %assistant_id, error = %e, "Failed to update assistant");
                }
            }
            Some(_) => {}
            None => match self.api.create_assistant(&assistant_spec(&chatbot)).await {
                Ok(assistant) => {
                    self.store
                        .set_assistant_id(chatbot_id, Some(assistant.id.clone()))
                        .await?;
                    info!(chatbot_id, assistant_id = %assistant.id, "Attached assistant to chatbot");
                    chatbot.assistant_id = Some(assistant.id);
                }
                Err(e) => {
                    warn!(chatbot_id, error = %e, "Failed to create assistant");
                }
            },
        }

        Ok(chatbot)
    }

    /// Delete a chatbot, its chat logs and its remote assistant
    pub async fn delete(&self, chatbot_id: i64) -> Result<Chatbot> {
        let chatbot = self
            .store
            .delete_chatbot(chatbot_id)
            .await?
            .ok_or_else(|| TownchatError::NotFound(format!("chatbot {}", chatbot_id)))?;

        if let Some(assistant_id) = &chatbot.assistant_id {
            self.discard_assistant(assistant_id).await;
        }
        info!(chatbot_id, "Deleted chatbot");
        Ok(chatbot)
    }

    pub async fn get(&self, chatbot_id: i64) -> Result<Chatbot> {
        self.store
            .get_chatbot(chatbot_id)
            .await?
            .ok_or_else(|| TownchatError::NotFound(format!("chatbot {}", chatbot_id)).into())
    }

    pub async fn list(&self) -> Result<Vec<Chatbot>> {
        self.store.list_chatbots().await
    }

    async fn discard_assistant(&self, assistant_id: &str) {
        if let Err(e) = self.api.delete_assistant(assistant_id).await {
            warn!(assistant_id = %assistant_id, error = %e, "Failed to delete assistant");
        }
    }
}
