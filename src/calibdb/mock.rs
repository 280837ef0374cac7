use axum::{http::StatusCode, routing::post, Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Local stand-in for calibdb.net answering every query with a fixed reply
pub struct MockCalibDb {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl MockCalibDb {
    pub async fn start(status: StatusCode, reply: Value) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));

        let handler_hits = Arc::clone(&hits);
        let handler_bodies = Arc::clone(&bodies);
        let app = Router::new().route(
            "/query",
            post(move |Json(body): Json<Value>| {
                let hits = Arc::clone(&handler_hits);
                let bodies = Arc::clone(&handler_bodies);
                let reply = reply.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    bodies.lock().push(body);
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock calibdb");
        let addr = listener.local_addr().expect("mock calibdb address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock calibdb");
        });

        Self { addr, hits, bodies }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/query", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().clone()
    }
}
