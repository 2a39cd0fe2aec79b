//! Test harness driving the real router in process over the in-memory store.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::api::{router, AppState};
use crate::config::ApiConfig;
use crate::database::MemoryDocumentStore;

pub struct TestContext {
    pub store: MemoryDocumentStore,
    pub state: AppState,
    router: Router,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Body as a string, for the bare-string error and id responses
    pub fn text(&self) -> &str {
        self.body.as_str().unwrap_or_default()
    }
}

impl TestContext {
    pub async fn new() -> Self {
        let store = MemoryDocumentStore::new();
        let state = AppState::init(Arc::new(store.clone()))
            .await
            .expect("in-memory store initialises");
        let config = ApiConfig {
            enable_request_logging: false,
            ..ApiConfig::default()
        };
        let router = router(state.clone(), &config);
        Self { store, state, router }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    /// POST a payload and return the created identifier
    pub async fn create(&self, uri: &str, body: Value) -> String {
        let response = self.post(uri, body).await;
        assert_eq!(response.status, StatusCode::CREATED, "create failed: {:?}", response.body);
        response.text().to_string()
    }
}
