//! Fake scoring service on an ephemeral port

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// What the fake service answers
#[derive(Clone)]
pub enum FakeReply {
    /// 200 with this JSON body
    Json(Value),
    /// Given status with a plain-text body
    Status(u16, String),
    /// 200 with a body that is not JSON
    Garbage(String),
}

#[derive(Clone)]
struct FakeState {
    reply: FakeReply,
    received: Arc<Mutex<Vec<Value>>>,
}

pub struct FakeScorerHandle {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl FakeScorerHandle {
    pub fn analyze_url(&self) -> String {
        format!("http://{}/analyze_images", self.addr)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for FakeScorerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn analyze_images(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    state.received.lock().unwrap().push(body);
    match state.reply {
        FakeReply::Json(value) => Json(value).into_response(),
        FakeReply::Status(code, text) => {
            (StatusCode::from_u16(code).unwrap(), text).into_response()
        }
        FakeReply::Garbage(text) => (StatusCode::OK, text).into_response(),
    }
}

/// Start a fake `/analyze_images` service
pub async fn spawn_fake_scorer(reply: FakeReply) -> FakeScorerHandle {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = FakeState {
        reply,
        received: received.clone(),
    };
    let app = Router::new()
        .route("/analyze_images", post(analyze_images))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeScorerHandle {
        addr,
        received,
        task,
    }
}
