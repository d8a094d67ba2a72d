//! Test utilities for TownChat
//!
//! This module provides common test utilities: temporary storage, a
//! scripted in-memory assistant provider, and assertion helpers.

use crate::agent::{PollSettings, Sleeper};
use crate::config::Config;
use crate::error::{Result, TownchatError};
use crate::providers::{
    Assistant, AssistantApi, AssistantSpec, MessageContent, MessageRole, Run, RunStatus, Thread,
    ThreadMessage,
};
use crate::storage::{Chatbot, ChatbotStore, NewChatbot, SqliteStorage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a SQLite storage in a fresh temporary directory
///
/// The directory must be kept alive for as long as the storage is used.
pub fn temp_storage() -> (SqliteStorage, TempDir) {
    let dir = temp_dir();
    let storage =
        SqliteStorage::new_with_path(dir.path().join("townchat.db")).expect("create storage");
    (storage, dir)
}

/// Insert an active chatbot with an assistant attached
pub async fn seed_chatbot(storage: &SqliteStorage, store_id: &str, assistant_id: Option<&str>) -> Chatbot {
    storage
        .insert_chatbot(
            NewChatbot {
                store_id: store_id.to_string(),
                name: format!("{} bot", store_id),
                knowledge_base: Some("Open 9 to 6".to_string()),
                greeting_message: Some("Welcome!".to_string()),
                model: None,
            },
            "gpt-4o-mini".to_string(),
            assistant_id.map(str::to_string),
        )
        .await
        .expect("seed chatbot")
}

/// Polling settings that never wait long
pub fn fast_poll_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(1),
        max_attempts: 5,
    }
}

/// Sleeper that returns immediately
#[derive(Debug, Default)]
pub struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// In-memory assistant provider
///
/// Every run completes on the first poll (unless `run_status` is changed)
/// and the assistant echoes `"reply to <message>"` on the thread.
pub struct FakeAssistant {
    pub run_status: Mutex<RunStatus>,
    pub fail_assistant_calls: bool,
    threads: Mutex<HashMap<String, Vec<ThreadMessage>>>,
    assistants: Mutex<HashMap<String, AssistantSpec>>,
    counter: AtomicU32,
}

impl Default for FakeAssistant {
    fn default() -> Self {
        Self {
            run_status: Mutex::new(RunStatus::Completed),
            fail_assistant_calls: false,
            threads: Mutex::new(HashMap::new()),
            assistants: Mutex::new(HashMap::new()),
            counter: AtomicU32::new(0),
        }
    }
}

impl FakeAssistant {
    /// Provider whose assistant management calls all fail
    pub fn failing_management() -> Self {
        Self {
            fail_assistant_calls: true,
            ..Default::default()
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Number of threads created so far
    pub fn thread_count(&self) -> usize {
        self.threads.lock().unwrap().len()
    }

    /// User messages posted to a thread, oldest first
    pub fn user_messages(&self, thread_id: &str) -> Vec<String> {
        self.threads
            .lock()
            .unwrap()
            .get(thread_id)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| m.role == MessageRole::User)
                    .filter_map(|m| match m.content.first() {
                        Some(MessageContent::Text { text }) => text.value.clone(),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remote assistant settings by id
    pub fn assistant(&self, id: &str) -> Option<AssistantSpec> {
        self.assistants.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl AssistantApi for FakeAssistant {
    fn thread_prefix(&self) -> &str {
        "thread_"
    }

    async fn create_thread(&self) -> Result<Thread> {
        let id = self.next_id("thread_");
        self.threads.lock().unwrap().insert(id.clone(), Vec::new());
        Ok(Thread { id })
    }

    async fn post_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let mut threads = self.threads.lock().unwrap();
        let msgs = threads
            .get_mut(thread_id)
            .ok_or_else(|| TownchatError::Provider(format!("no thread {}", thread_id)))?;
        let created_at = msgs.len() as i64;
        msgs.push(ThreadMessage {
            id: format!("msg_{}", created_at),
            role: MessageRole::User,
            created_at,
            content: vec![MessageContent::text(content)],
        });
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        if assistant_id == "asst_missing" {
            return Err(TownchatError::AssistantNotFound(assistant_id.to_string()).into());
        }
        let mut threads = self.threads.lock().unwrap();
        if let Some(msgs) = threads.get_mut(thread_id) {
            let last = msgs
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::User)
                .and_then(|m| match m.content.first() {
                    Some(MessageContent::Text { text }) => text.value.clone(),
                    _ => None,
                })
                .unwrap_or_default();
            let created_at = msgs.len() as i64;
            msgs.push(ThreadMessage {
                id: format!("msg_{}", created_at),
                role: MessageRole::Assistant,
                created_at,
                content: vec![MessageContent::text(format!("reply to {}", last))],
            });
        }
        Ok(Run {
            id: self.next_id("run_"),
            status: RunStatus::Queued,
            thread_id: Some(thread_id.to_string()),
            last_error: None,
        })
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        Ok(Run {
            id: run_id.to_string(),
            status: *self.run_status.lock().unwrap(),
            thread_id: Some(thread_id.to_string()),
            last_error: None,
        })
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let mut msgs = self
            .threads
            .lock()
            .unwrap()
            .get(thread_id)
            .cloned()
            .unwrap_or_default();
        msgs.reverse();
        Ok(msgs)
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant> {
        if self.fail_assistant_calls {
            return Err(TownchatError::Provider("assistant API unavailable".to_string()).into());
        }
        let id = self.next_id("asst_");
        self.assistants
            .lock()
            .unwrap()
            .insert(id.clone(), spec.clone());
        Ok(Assistant {
            id,
            name: Some(spec.name.clone()),
            model: Some(spec.model.clone()),
        })
    }

    async fn update_assistant(&self, assistant_id: &str, spec: &AssistantSpec) -> Result<Assistant> {
        if self.fail_assistant_calls {
            return Err(TownchatError::Provider("assistant API unavailable".to_string()).into());
        }
        let mut assistants = self.assistants.lock().unwrap();
        match assistants.get_mut(assistant_id) {
            Some(existing) => {
                *existing = spec.clone();
                Ok(Assistant {
                    id: assistant_id.to_string(),
                    name: Some(spec.name.clone()),
                    model: Some(spec.model.clone()),
                })
            }
            None => Err(TownchatError::AssistantNotFound(assistant_id.to_string()).into()),
        }
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        if self.fail_assistant_calls {
            return Err(TownchatError::Provider("assistant API unavailable".to_string()).into());
        }
        self.assistants.lock().unwrap().remove(assistant_id);
        Ok(())
    }
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration with default values
pub fn test_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_storage_creates_database() {
        let (storage, _dir) = temp_storage();
        assert!(storage.db_path().exists());
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        let result: Result<()> = Ok(());
        assert_error_contains(result, "error");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(TownchatError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    fn test_test_config_validates() {
        assert!(test_config().validate().is_ok());
    }

    #[tokio::test]
    async fn test_fake_assistant_echoes_last_message() {
        let api = FakeAssistant::default();
        let thread = api.create_thread().await.unwrap();
        api.post_user_message(&thread.id, "hi").await.unwrap();
        api.start_run(&thread.id, "asst_1").await.unwrap();

        let msgs = api.list_messages(&thread.id).await.unwrap();
        assert_eq!(msgs[0].role, MessageRole::Assistant);
        assert_eq!(msgs[0].content[0], MessageContent::text("reply to hi"));
        assert_eq!(api.user_messages(&thread.id), vec!["hi".to_string()]);
    }
}
