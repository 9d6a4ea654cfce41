//! WebSocket progress stream against a live listener.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use linkweave_api::{parse_allowed_origins, router, AppState};
use linkweave_core::{AnalysisConfig, EventBus};
use linkweave_inference::MockEmbeddingBackend;
use linkweave_jobs::{AnalysisRunner, InputFiles, JobStore, RunnerConfig};

const CONTENT: &str = "Adresse,Segments,Extracteur 1 1\n\
/blog/a,blog,Premier article sur le trail\n\
/blog/b,blog,Second article sur la randonnee\n\
/produit/c,produit,Chaussure de trail\n";

async fn serve(runner: AnalysisRunner) -> std::net::SocketAddr {
    let app = router(AppState::new(runner), parse_allowed_origins(""));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn next_json<S>(stream: &mut S) -> Value
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("stream ended: {:?}", other),
            }
        }
    })
    .await
    .expect("no frame received")
}

#[tokio::test]
async fn test_snapshot_then_events_until_completion() {
    let dir = tempfile::tempdir().unwrap();
    let content = dir.path().join("content.csv");
    std::fs::write(&content, CONTENT).unwrap();

    let runner = AnalysisRunner::new(
        Arc::new(
            MockEmbeddingBackend::new()
                .with_dimension(16)
                .with_latency_ms(300),
        ),
        JobStore::new(Arc::new(EventBus::new(256))),
        RunnerConfig::new(dir.path()),
    );
    let job_id = runner
        .submit(InputFiles::content_only(&content), AnalysisConfig::default())
        .unwrap();
    let addr = serve(runner).await;

    let (mut ws, _) = connect_async(format!("ws://{}/ws/{}", addr, job_id))
        .await
        .unwrap();

    let snapshot = next_json(&mut ws).await;
    assert_eq!(snapshot["type"], "JobSnapshot");
    assert_eq!(snapshot["job"]["id"], job_id.to_string());

    let mut progress_frames = 0;
    loop {
        let frame = next_json(&mut ws).await;
        match frame["type"].as_str().unwrap() {
            "JobProgress" => progress_frames += 1,
            "JobCompleted" => {
                assert_eq!(frame["job_id"], job_id.to_string());
                break;
            }
            "JobFailed" | "JobStopped" => panic!("unexpected terminal frame: {}", frame),
            _ => {}
        }
    }
    assert!(progress_frames > 0);

    // Any client text frame yields a fresh snapshot.
    ws.send(Message::Text("refresh".into())).await.unwrap();
    let refreshed = next_json(&mut ws).await;
    assert_eq!(refreshed["type"], "JobSnapshot");
    assert_eq!(refreshed["job"]["status"], "completed");
}

#[tokio::test]
async fn test_unknown_job_refuses_upgrade() {
    let dir = tempfile::tempdir().unwrap();
    let runner = AnalysisRunner::new(
        Arc::new(MockEmbeddingBackend::new().with_dimension(16)),
        JobStore::default(),
        RunnerConfig::new(dir.path()),
    );
    let addr = serve(runner).await;

    let result = connect_async(format!("ws://{}/ws/{}", addr, uuid::Uuid::new_v4())).await;
    assert!(result.is_err());
}
