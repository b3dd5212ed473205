//! Shared test utilities for cadet-server integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use cadet_core::{
    BrokerClientFactory, FetchClient, LearnerConfig, LearnerService, RandomPolicyFactory,
};
use cadet_server::{AppState, CadetServer, ServerConfig, ServerError};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

/// Sort requests received by the stub broker, as (session id, body)
pub type SortLog = Arc<Mutex<Vec<(String, Value)>>>;

/// A running server plus the handles a test needs to drive it
pub struct TestServer {
    pub state: Arc<AppState>,
    pub addr: SocketAddr,
    pub shutdown: oneshot::Sender<()>,
    pub task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spawns a stub serving both the fetch service and the broker
///
/// `POST /fetch` echoes one communication per requested ID and
/// `POST /sessions/:id/sort` records the request body.
pub async fn spawn_stub_services() -> (SocketAddr, SortLog) {
    let sorts: SortLog = Arc::new(Mutex::new(Vec::new()));

    async fn fetch(Json(body): Json<Value>) -> Json<Value> {
        let communications: Vec<Value> = body["communication_ids"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|id| json!({ "id": id, "text": "stub text" }))
            .collect();
        Json(json!({ "communications": communications }))
    }

    async fn sort(
        State(sorts): State<SortLog>,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        sorts.lock().await.push((id, body));
        Json(json!({}))
    }

    let app = Router::new()
        .route("/fetch", post(fetch))
        .route("/sessions/:id/sort", post(sort))
        .with_state(sorts.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, sorts)
}

/// An address nothing is listening on
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Creates a server that fetches from `fetch_addr` and retrains every
/// `threshold` annotations
pub async fn create_test_server(fetch_addr: SocketAddr, threshold: usize) -> TestServer {
    let config = LearnerConfig {
        retrain_threshold: threshold,
        poll_interval: Duration::from_millis(10),
        ..LearnerConfig::default()
    };
    let learner = LearnerService::new(
        config,
        Arc::new(FetchClient::new(format!("http://{}", fetch_addr))),
        Arc::new(BrokerClientFactory::new()),
        Arc::new(RandomPolicyFactory::with_seed(7)),
    );
    let state = Arc::new(AppState::new(Arc::new(learner)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, signal) = oneshot::channel::<()>();

    let server = CadetServer::new(ServerConfig::new("127.0.0.1", addr.port()), Arc::clone(&state));
    let task = tokio::spawn(server.serve(listener, async move {
        let _ = signal.await;
    }));

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    TestServer {
        state,
        addr,
        shutdown,
        task,
    }
}

/// Wait until the stub broker has received at least `count` sort requests
pub async fn wait_for_sorts(sorts: &SortLog, count: usize) -> Vec<(String, Value)> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let received = sorts.lock().await;
                if received.len() >= count {
                    return received.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("broker did not receive enough sort requests")
}
