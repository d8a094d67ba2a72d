use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use townchat::agent::PollSettings;
use townchat::config::{Config, OpenAiConfig};
use townchat::providers::OpenAiProvider;
use townchat::storage::{Chatbot, ChatbotStore, NewChatbot, SqliteStorage};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub fn create_temp_storage() -> (Arc<SqliteStorage>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("townchat.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (Arc::new(storage), tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config pointing the OpenAI provider at a mock server
#[allow(dead_code)]
pub fn mock_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.provider.openai = OpenAiConfig {
        api_base: server.uri(),
        api_key: Some("sk-test".to_string()),
        ..Default::default()
    };
    config.polling.interval_ms = 1;
    config.polling.max_attempts = 5;
    config
}

#[allow(dead_code)]
pub fn mock_provider(server: &MockServer) -> Arc<OpenAiProvider> {
    Arc::new(OpenAiProvider::new(mock_config(server).provider.openai).expect("provider"))
}

#[allow(dead_code)]
pub fn fast_polling() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(1),
        max_attempts: 5,
    }
}

#[allow(dead_code)]
pub async fn seed_chatbot(storage: &SqliteStorage, store_id: &str, assistant_id: &str) -> Chatbot {
    storage
        .insert_chatbot(
            NewChatbot {
                store_id: store_id.to_string(),
                name: "Corner Bakery".to_string(),
                ..Default::default()
            },
            "gpt-4o-mini".to_string(),
            Some(assistant_id.to_string()),
        )
        .await
        .expect("seed chatbot")
}

#[allow(dead_code)]
pub fn assistant_message(id: &str, created_at: i64, text: &str) -> Value {
    json!({
        "id": id,
        "object": "thread.message",
        "role": "assistant",
        "created_at": created_at,
        "content": [{"type": "text", "text": {"value": text, "annotations": []}}]
    })
}

/// Mount a complete, successful run on `thread_id`
///
/// The run reports `queued`, then `in_progress`, then `completed`, and the
/// thread then lists `reply` as the newest assistant message.
#[allow(dead_code)]
pub async fn mount_successful_run(server: &MockServer, thread_id: &str, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": thread_id, "object": "thread"})),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/threads/{}/messages", thread_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_user"})))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/threads/{}/runs", thread_id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "run_1", "status": "queued"})),
        )
        .mount(server)
        .await;

    let run_path = format!("/threads/{}/runs/run_1", thread_id);
    Mock::given(method("GET"))
        .and(path(run_path.clone()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "run_1", "status": "queued"})),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(run_path.clone()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "run_1", "status": "in_progress"})),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(run_path))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "run_1", "status": "completed"})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/threads/{}/messages", thread_id)))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                assistant_message("msg_2", 1_700_000_010, reply),
                {
                    "id": "msg_1",
                    "role": "user",
                    "created_at": 1_700_000_000,
                    "content": [{"type": "text", "text": {"value": "question", "annotations": []}}]
                }
            ]
        })))
        .mount(server)
        .await;
}
