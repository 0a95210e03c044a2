use async_std::task;
use packrat::ModelStore;
use pocketmind_core::ModelDescriptor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
struct ServerState {
    body: Vec<u8>,
    hits: Arc<AtomicUsize>,
}

/// Serve `body` at /models/test.gguf on the given port, counting hits.
async fn start_server(port: u16, body: Vec<u8>) -> (Arc<AtomicUsize>, String) {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = ServerState {
        body,
        hits: hits.clone(),
    };

    let mut app = tide::with_state(state);
    app.at("/models/test.gguf")
        .get(|req: tide::Request<ServerState>| async move {
            let state = req.state();
            state.hits.fetch_add(1, Ordering::SeqCst);
            Ok(tide::Response::builder(200)
                .body(state.body.clone())
                .build())
        });

    let addr = format!("127.0.0.1:{}", port);
    let listen_addr = addr.clone();
    task::spawn(async move {
        let _ = app.listen(listen_addr).await;
    });

    // Wait until the server answers.
    let base_url = format!("http://{}", addr);
    for _ in 0..50 {
        task::sleep(Duration::from_millis(50)).await;
        if surf::get(format!("{}/models/test.gguf", base_url))
            .await
            .is_ok()
        {
            return (hits, base_url);
        }
    }
    panic!("test server failed to start on {}", addr);
}

fn descriptor(url: String) -> ModelDescriptor {
    ModelDescriptor {
        display_name: "Test Model".to_string(),
        human_size: "1GB".to_string(),
        source_url: url,
        local_file_name: "test.gguf".to_string(),
    }
}

#[test]
fn model_exists_tracks_the_file_system() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::with_root(dir.path());

    assert!(!store.model_exists("a.gguf"));

    store.ensure_models_dir().unwrap();
    assert!(!store.model_exists("a.gguf"));

    std::fs::write(store.model_path("a.gguf"), b"gguf").unwrap();
    assert!(store.model_exists("a.gguf"));

    std::fs::remove_file(store.model_path("a.gguf")).unwrap();
    assert!(!store.model_exists("a.gguf"));
}

#[test]
fn listing_filters_by_extension_and_fails_soft() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::with_root(dir.path());

    // Directory does not exist yet: empty, no error.
    assert!(store.list_local_models().is_empty());

    store.ensure_models_dir().unwrap();
    std::fs::write(store.model_path("b.gguf"), b"x").unwrap();
    std::fs::write(store.model_path("notes.txt"), b"x").unwrap();
    std::fs::write(store.model_path("a.gguf"), b"x").unwrap();
    std::fs::create_dir(store.model_path("sub.gguf.d")).unwrap();

    assert_eq!(store.list_local_models(), vec!["a.gguf", "b.gguf"]);
}

#[test]
fn ensure_models_dir_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::with_root(dir.path());
    store.ensure_models_dir().unwrap();
    store.ensure_models_dir().unwrap();
    assert!(store.models_dir().is_dir());
}

#[async_std::test]
async fn download_streams_and_reports_progress() {
    // Large enough for several whole-percent progress steps.
    let body: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let (hits, base_url) = start_server(18431, body.clone()).await;
    let probe_hits = hits.load(Ordering::SeqCst);

    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::with_root(dir.path());
    let desc = descriptor(format!("{}/models/test.gguf", base_url));

    let mut fractions = Vec::new();
    let path = store
        .download(&desc, |fraction| fractions.push(fraction))
        .await
        .unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert_eq!(hits.load(Ordering::SeqCst) - probe_hits, 1);

    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(*fractions.last().unwrap(), 1.0);

    // No partial file left behind.
    assert!(!store.model_path("test.gguf.part").exists());
}

#[async_std::test]
async fn download_is_idempotent() {
    let (hits, base_url) = start_server(18433, b"model-bytes".to_vec()).await;
    let probe_hits = hits.load(Ordering::SeqCst);

    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::with_root(dir.path());
    let desc = descriptor(format!("{}/models/test.gguf", base_url));

    let first = store.download(&desc, |_| {}).await.unwrap();
    let second = store.download(&desc, |_| {}).await.unwrap();

    assert_eq!(first, second);
    // The transfer happened exactly once.
    assert_eq!(hits.load(Ordering::SeqCst) - probe_hits, 1);
}

#[async_std::test]
async fn scenario_empty_store_then_download() {
    let (_hits, base_url) = start_server(18435, b"weights".to_vec()).await;

    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::with_root(dir.path());
    let desc = descriptor(format!("{}/models/test.gguf", base_url));

    assert!(store.list_local_models().is_empty());
    store.download(&desc, |_| {}).await.unwrap();
    assert_eq!(store.list_local_models(), vec!["test.gguf"]);
}

#[async_std::test]
async fn non_success_status_is_a_download_error() {
    let (_hits, base_url) = start_server(18437, b"irrelevant".to_vec()).await;

    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::with_root(dir.path());
    // Not a served route: tide answers 404.
    let desc = descriptor(format!("{}/models/missing.gguf", base_url));

    let err = store.download(&desc, |_| {}).await.unwrap_err();
    assert!(matches!(
        err,
        pocketmind_core::PocketError::DownloadFailed(_)
    ));
    assert!(!store.model_exists("test.gguf"));
    assert!(!store.model_path("missing.gguf.part").exists());
}

#[async_std::test]
async fn download_stream_emits_the_event_protocol() {
    use futures::StreamExt;
    use pocketmind_core::protocol::DownloadEvent;

    let body: Vec<u8> = (0..200_000u32).map(|i| (i % 241) as u8).collect();
    let (_hits, base_url) = start_server(18439, body).await;

    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::with_root(dir.path());
    let desc = descriptor(format!("{}/models/test.gguf", base_url));

    let mut events = store.download_stream(&desc);

    match events.next().await.unwrap() {
        DownloadEvent::Started(name) => assert_eq!(name, "test.gguf"),
        other => panic!("expected Started, got {:?}", other),
    }

    let mut completed = None;
    while let Some(event) = events.next().await {
        match event {
            DownloadEvent::Progress(fraction) => {
                assert!((0.0..=1.0).contains(&fraction));
            }
            DownloadEvent::Complete(path) => {
                completed = Some(path);
                break;
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    let path = completed.expect("no Complete event");
    assert!(path.ends_with("test.gguf"));
    assert!(store.model_exists("test.gguf"));
}
