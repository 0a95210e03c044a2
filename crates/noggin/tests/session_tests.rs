//! Session lifecycle tests against the stub engine.

#![cfg(not(feature = "real-engine"))]

use futures::StreamExt;
use pocketmind_core::protocol::InferenceEvent;
use pocketmind_core::{PocketError, SessionOptions};
use pocketmind_noggin::backend::{Engine, Parrot};
use pocketmind_noggin::SessionManager;

fn options_with_template(path: &str, template: &str) -> SessionOptions {
    let mut options = SessionOptions::for_model(path);
    options.prompt_template = template.to_string();
    options
}

#[async_std::test]
async fn generate_before_initialize_is_rejected() {
    let mut session = SessionManager::new().await;
    let err = session.generate("hi", None).await.unwrap_err();
    assert!(matches!(err, PocketError::NotInitialized));
}

#[async_std::test]
async fn empty_model_path_is_rejected() {
    let mut session = SessionManager::new().await;
    let err = session
        .initialize(SessionOptions::for_model(""))
        .await
        .unwrap_err();
    assert!(matches!(err, PocketError::EmptyModelPath));
    assert!(!session.is_ready());
}

#[async_std::test]
async fn generate_renders_the_template() {
    let mut session = SessionManager::new().await;
    session
        .initialize(options_with_template("/tmp/m.gguf", "<a>{prompt}<b>"))
        .await
        .unwrap();

    let reply = session.generate("hi", None).await.unwrap();
    assert_eq!(reply, "Parrot says: <a>hi<b>");
}

#[async_std::test]
async fn release_returns_the_session_to_uninitialized() {
    let mut session = SessionManager::new().await;
    session
        .initialize(SessionOptions::for_model("/tmp/m.gguf"))
        .await
        .unwrap();
    assert!(session.is_ready());

    session.release().await;
    assert!(!session.is_ready());
    assert_eq!(session.loaded_model(), None);

    let err = session.generate("hi", None).await.unwrap_err();
    assert!(matches!(err, PocketError::NotInitialized));
}

#[async_std::test]
async fn release_is_idempotent() {
    let mut session = SessionManager::new().await;
    session.release().await;
    session.release().await;
    assert!(!session.is_ready());
}

#[async_std::test]
async fn reinitialize_swaps_the_bound_model() {
    let mut session = SessionManager::new().await;
    session
        .initialize(SessionOptions::for_model("/tmp/first.gguf"))
        .await
        .unwrap();
    session
        .initialize(SessionOptions::for_model("/tmp/second.gguf"))
        .await
        .unwrap();

    assert_eq!(session.bound_model(), Some("/tmp/second.gguf"));
    assert_eq!(session.loaded_model(), Some("/tmp/second.gguf"));
}

#[async_std::test]
async fn stub_engine_follows_the_event_protocol() {
    let mut engine = Parrot::new();
    let options = SessionOptions::for_model("/tmp/m.gguf");
    engine.load_model("/tmp/m.gguf", &options).await.unwrap();

    let mut events = engine.infer("ping", &options).await.unwrap();

    assert!(matches!(
        events.next().await.unwrap().unwrap(),
        InferenceEvent::ProcessStart
    ));
    match events.next().await.unwrap().unwrap() {
        InferenceEvent::Content(text) => assert_eq!(text, "Parrot says: ping"),
        other => panic!("expected content, got {:?}", other),
    }
    assert!(matches!(
        events.next().await.unwrap().unwrap(),
        InferenceEvent::Complete
    ));
    assert!(events.next().await.is_none());
}

#[async_std::test]
async fn infer_without_a_model_is_an_error() {
    let mut engine = Parrot::new();
    let options = SessionOptions::for_model("/tmp/m.gguf");
    assert!(engine.infer("ping", &options).await.is_err());
}
