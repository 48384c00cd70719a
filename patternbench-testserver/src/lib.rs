//! Reference job backend for the five interaction patterns.
//!
//! Every submitted job runs a simulated unit of work in the background; the routes below
//! only differ in how a client learns about its progress.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures_util::Stream;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant, sleep};

pub const PATH_REQ_RESP_PROCESS: &str = "/api/req_resp/process";
pub const PATH_POLLING_PROCESS: &str = "/api/polling/process";
pub const PATH_POLLING_STATUS: &str = "/api/polling/status/{job_id}";
pub const PATH_POLLING_RESULT: &str = "/api/polling/result/{job_id}";
pub const PATH_SSE_STREAM: &str = "/api/sse/stream/{job_id}";
pub const PATH_WEBSOCKET: &str = "/api/websocket/ws/{job_id}";

#[derive(Debug, Clone)]
pub struct TestServerConfig {
    /// Number of progress increments per job.
    pub steps: u32,
    pub step_delay: Duration,
    /// How often a held long-poll request re-checks its job.
    pub result_check_interval: Duration,
    /// How often SSE and websocket sessions re-send job state.
    pub stream_interval: Duration,
    /// Upper bound for long-poll holds and push sessions.
    pub hold_timeout: Duration,
    /// Answer every job submission with a 500.
    pub fail_submissions: bool,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            step_delay: Duration::from_millis(100),
            result_check_interval: Duration::from_secs(1),
            stream_interval: Duration::from_millis(100),
            hold_timeout: Duration::from_secs(30),
            fail_submissions: false,
        }
    }
}

impl TestServerConfig {
    /// Jobs finish in about 100 ms.
    pub fn fast() -> Self {
        Self {
            steps: 5,
            step_delay: Duration::from_millis(20),
            result_check_interval: Duration::from_millis(10),
            stream_interval: Duration::from_millis(10),
            hold_timeout: Duration::from_secs(5),
            fail_submissions: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    submissions: Arc<AtomicU64>,
    status_checks: Arc<AtomicU64>,
    result_holds: Arc<AtomicU64>,
    stream_opens: Arc<AtomicU64>,
    messages_sent: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Every request the job routes answered.
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Jobs created through either process route.
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Relaxed)
    }

    pub fn status_checks(&self) -> u64 {
        self.status_checks.load(Ordering::Relaxed)
    }

    pub fn result_holds(&self) -> u64 {
        self.result_holds.load(Ordering::Relaxed)
    }

    /// SSE streams plus websocket sessions.
    pub fn stream_opens(&self) -> u64 {
        self.stream_opens.load(Ordering::Relaxed)
    }

    /// Job states pushed over SSE or websocket.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum JobStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
struct Job {
    status: JobStatus,
    progress: u32,
    started_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<f64>,
}

impl Job {
    fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"status":"error"}"#))
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
struct AppState {
    config: Arc<TestServerConfig>,
    stats: TestServerStats,
    jobs: Arc<Mutex<HashMap<String, Job>>>,
}

impl AppState {
    fn job(&self, id: &str) -> Option<Job> {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut Job)) {
        let mut jobs = self
            .jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(job) = jobs.get_mut(id) {
            f(job);
        }
    }

    /// Registers a fresh job, or `None` when submissions are switched off.
    fn submit(&self) -> Option<String> {
        TestServerStats::inc(&self.stats.requests_total);
        if self.config.fail_submissions {
            return None;
        }
        TestServerStats::inc(&self.stats.submissions);

        let id = uuid::Uuid::new_v4().to_string();
        let job = Job {
            status: JobStatus::InProgress,
            progress: 0,
            started_at: unix_now(),
            completed_at: None,
        };
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.clone(), job);
        tracing::debug!(job = %id, "job submitted");
        Some(id)
    }

    async fn work(self, id: String) -> Option<Job> {
        let steps = self.config.steps.max(1);
        for i in 0..self.config.steps {
            let progress = (i + 1) * 100 / steps;
            self.update(&id, |job| job.progress = progress);
            sleep(self.config.step_delay).await;
        }
        self.update(&id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.completed_at = Some(unix_now());
        });
        tracing::debug!(job = %id, "job completed");
        self.job(&id)
    }
}

fn special(status: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": status }))
}

async fn handle_req_resp(State(state): State<AppState>) -> Response {
    let Some(id) = state.submit() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "submissions disabled").into_response();
    };
    match state.work(id).await {
        Some(job) => Json(job).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "job vanished").into_response(),
    }
}

async fn handle_polling_process(State(state): State<AppState>) -> Response {
    let Some(id) = state.submit() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "submissions disabled").into_response();
    };
    tokio::spawn(state.clone().work(id.clone()));
    Json(id).into_response()
}

async fn handle_polling_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    TestServerStats::inc(&state.stats.requests_total);
    TestServerStats::inc(&state.stats.status_checks);
    match state.job(&job_id) {
        Some(job) => Json(job).into_response(),
        None => special("not_found").into_response(),
    }
}

async fn handle_polling_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    TestServerStats::inc(&state.stats.requests_total);
    TestServerStats::inc(&state.stats.result_holds);

    let deadline = Instant::now() + state.config.hold_timeout;
    while Instant::now() < deadline {
        if let Some(job) = state.job(&job_id).filter(Job::is_completed) {
            return Json(job).into_response();
        }
        sleep(state.config.result_check_interval).await;
    }
    special("timeout").into_response()
}

struct PushCursor {
    state: AppState,
    job_id: String,
    deadline: Instant,
    sent_any: bool,
    done: bool,
}

impl PushCursor {
    fn new(state: AppState, job_id: String) -> Self {
        let deadline = Instant::now() + state.config.hold_timeout;
        Self {
            state,
            job_id,
            deadline,
            sent_any: false,
            done: false,
        }
    }

    /// Next job state to push, or `None` once the job completed or the session timed out.
    async fn next(&mut self) -> Option<Job> {
        if self.done {
            return None;
        }
        if self.sent_any {
            sleep(self.state.config.stream_interval).await;
        }
        while Instant::now() < self.deadline {
            if let Some(job) = self.state.job(&self.job_id) {
                self.sent_any = true;
                self.done = job.is_completed();
                TestServerStats::inc(&self.state.stats.messages_sent);
                return Some(job);
            }
            sleep(self.state.config.stream_interval).await;
        }
        None
    }
}

async fn handle_sse(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    TestServerStats::inc(&state.stats.requests_total);
    TestServerStats::inc(&state.stats.stream_opens);

    let cursor = PushCursor::new(state, job_id);
    let stream = futures_util::stream::unfold(cursor, |mut cursor| async move {
        let job = cursor.next().await?;
        Some((Ok(Event::default().data(job.to_json())), cursor))
    });
    Sse::new(stream)
}

async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    TestServerStats::inc(&state.stats.requests_total);
    TestServerStats::inc(&state.stats.stream_opens);
    ws.on_upgrade(move |socket| websocket_session(socket, PushCursor::new(state, job_id)))
}

async fn websocket_session(mut socket: WebSocket, mut cursor: PushCursor) {
    while let Some(job) = cursor.next().await {
        if socket.send(Message::Text(job.to_json().into())).await.is_err() {
            tracing::debug!(job = %cursor.job_id, "websocket peer went away");
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

pub fn router(config: TestServerConfig, stats: TestServerStats) -> Router {
    let state = AppState {
        config: Arc::new(config),
        stats,
        jobs: Arc::new(Mutex::new(HashMap::new())),
    };
    Router::new()
        .route(PATH_REQ_RESP_PROCESS, post(handle_req_resp))
        .route(PATH_POLLING_PROCESS, post(handle_polling_process))
        .route(PATH_POLLING_STATUS, get(handle_polling_status))
        .route(PATH_POLLING_RESULT, get(handle_polling_result))
        .route(PATH_SSE_STREAM, get(handle_sse))
        .route(PATH_WEBSOCKET, get(handle_websocket))
        .with_state(state)
}

pub struct TestServer {
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerConfig::fast()).await
    }

    pub async fn start_with(config: TestServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(config, stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
