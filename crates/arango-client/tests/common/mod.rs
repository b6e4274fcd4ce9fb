//! Shared test fixtures

#![allow(dead_code)]

use arango_client::{Connection, HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Transport that replays canned responses in order and records requests
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: Value) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body.to_string())));
        self
    }

    pub fn fail(&self, err: TransportError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// JSON body of the n-th request
    pub fn body(&self, n: usize) -> Value {
        let requests = self.requests.lock().unwrap();
        let body = requests[n].body.as_deref().expect("request has a body");
        serde_json::from_str(body).unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted response".to_string())))
    }
}

pub fn connection(transport: &Arc<ScriptedTransport>) -> Connection {
    Connection::with_endpoint(transport.clone(), "http://db.test:8529")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
