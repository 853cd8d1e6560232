//! Shared helpers for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use reqwest::Url;
use tokio::net::TcpListener;

pub(crate) const ORDERS_PATH: &str = "/ios/orders";

/// Local HTTP server answering the orders path with a fixed response.
pub(crate) struct StubServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub(crate) async fn start(status: StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let app = Router::new().route(
            ORDERS_PATH,
            get(move || {
                let body = body.clone();
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, body)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    pub(crate) fn url(&self) -> Url {
        Url::parse(&format!("{}{}", self.base_url, ORDERS_PATH)).unwrap()
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Returns a URL on a port nothing listens on.
pub(crate) async fn unreachable_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}{}", addr, ORDERS_PATH)).unwrap()
}
