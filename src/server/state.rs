//! Shared application state injected into every handler

use crate::chat::ChatService;
use crate::chatbot::ChatbotService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub chatbots: Arc<ChatbotService>,
}

impl AppState {
    pub fn new(chat: ChatService, chatbots: ChatbotService) -> Self {
        Self {
            chat: Arc::new(chat),
            chatbots: Arc::new(chatbots),
        }
    }
}
