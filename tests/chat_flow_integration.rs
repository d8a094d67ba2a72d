mod common;

use common::{create_temp_storage, fast_polling, mock_provider, mount_successful_run, seed_chatbot};
use serde_json::json;
use std::sync::Arc;
use townchat::agent::AssistantRunner;
use townchat::chat::{is_session_id, ChatOptions, ChatService};
use townchat::storage::{ChatLogStore, PageRequest};
use townchat::TownchatError;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_first_message_creates_session_and_single_history_entry() {
    let server = MockServer::start().await;
    mount_successful_run(&server, "thread_abc", "안녕하세요! 무엇을 도와드릴까요?").await;

    let (storage, _tmp) = create_temp_storage();
    let bot = seed_chatbot(&storage, "store-1", "asst_1").await;
    let service = ChatService::new(
        mock_provider(&server),
        storage.clone(),
        storage.clone(),
        fast_polling(),
    );

    let reply = service
        .chat(bot.id, "안녕", ChatOptions::default())
        .await
        .expect("chat turn");

    assert_eq!(reply.response, "안녕하세요! 무엇을 도와드릴까요?");
    assert!(is_session_id(&reply.session_id), "{}", reply.session_id);
    assert_eq!(reply.thread_id, "thread_abc");

    let history = service
        .get_history(bot.id, &reply.session_id, PageRequest::default())
        .await
        .expect("history");
    assert_eq!(history.entries.len(), 1);
    assert_eq!(history.entries[0].message, "안녕");
    assert_eq!(history.pagination.total, 1);
}

#[tokio::test]
async fn test_follow_up_reuses_recorded_thread() {
    let server = MockServer::start().await;
    mount_successful_run(&server, "thread_abc", "We open at 9.").await;

    let (storage, _tmp) = create_temp_storage();
    let bot = seed_chatbot(&storage, "store-1", "asst_1").await;
    let service = ChatService::new(
        mock_provider(&server),
        storage.clone(),
        storage.clone(),
        fast_polling(),
    );

    let first = service
        .chat(bot.id, "When do you open?", ChatOptions::default())
        .await
        .unwrap();
    let second = service
        .chat(
            bot.id,
            "And on Sunday?",
            ChatOptions {
                session_id: Some(first.session_id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(second.thread_id, first.thread_id);
    assert_eq!(
        storage
            .latest_thread_for_session(&first.session_id)
            .await
            .unwrap()
            .as_deref(),
        Some("thread_abc")
    );

    let thread_creations = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.to_string() == "POST" && r.url.path() == "/threads")
        .count();
    assert_eq!(thread_creations, 1);
}

#[tokio::test]
async fn test_run_timeout_is_reported_and_not_logged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_slow"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_slow/messages"))
        .and(body_json(json!({"role": "user", "content": "hello?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_slow/runs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "run_9", "status": "queued"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_slow/runs/run_9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "run_9", "status": "in_progress"})),
        )
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_slow/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let (storage, _tmp) = create_temp_storage();
    let bot = seed_chatbot(&storage, "store-1", "asst_1").await;
    let runner = AssistantRunner::new(mock_provider(&server), fast_polling());
    let service = ChatService::with_runner(runner, storage.clone(), storage.clone());

    let err = service
        .chat(
            bot.id,
            "hello?",
            ChatOptions {
                session_id: Some("session_1700000000000_abcdefghi".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    match err.downcast_ref::<TownchatError>() {
        Some(TownchatError::ResponseGeneration(msg)) => {
            assert!(msg.contains("after 5 status checks"), "{}", msg)
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let history = service
        .get_history(
            bot.id,
            "session_1700000000000_abcdefghi",
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert!(history.entries.is_empty());
}

#[tokio::test]
async fn test_failed_run_carries_provider_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_f"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_f/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_f/runs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "run_f", "status": "queued"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_f/runs/run_f"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_f",
            "status": "failed",
            "last_error": {"code": "rate_limit_exceeded", "message": "Rate limit reached"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let runner = AssistantRunner::new(mock_provider(&server), fast_polling());
    let err = runner
        .run_assistant("asst_1", "hi", "", None)
        .await
        .unwrap_err();

    match err.downcast_ref::<TownchatError>() {
        Some(TownchatError::RunFailed { run_id, reason }) => {
            assert_eq!(run_id, "run_f");
            assert_eq!(reason, "Rate limit reached");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_turns_in_one_session_share_a_thread() {
    let server = MockServer::start().await;
    mount_successful_run(&server, "thread_shared", "ok").await;

    let (storage, _tmp) = create_temp_storage();
    let bot = seed_chatbot(&storage, "store-1", "asst_1").await;
    let service = Arc::new(ChatService::new(
        mock_provider(&server),
        storage.clone(),
        storage.clone(),
        fast_polling(),
    ));

    let session = "session_1700000000000_zzzzzzzzz".to_string();
    let mut handles = Vec::new();
    for i in 0..3 {
        let service = Arc::clone(&service);
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            service
                .chat(
                    bot.id,
                    &format!("message {}", i),
                    ChatOptions {
                        session_id: Some(session),
                        ..Default::default()
                    },
                )
                .await
        }));
    }
    for handle in handles {
        tokio_test::assert_ok!(handle.await.unwrap());
    }

    let thread_creations = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.to_string() == "POST" && r.url.path() == "/threads")
        .count();
    assert_eq!(thread_creations, 1);
}
