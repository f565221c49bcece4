//! Shared fixtures: an in-memory fake server speaking the transport contract.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use resource_state::{async_trait, Method, SyncError, SyncOptions, SyncTarget, Transport};
use serde_json::{Map, Value};
use tokio::sync::Barrier;

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub collection: bool,
    pub url: Option<String>,
    pub data: Option<Value>,
    pub attributes: Map<String, Value>,
}

/// Rows keyed by `id`. Reads return rows (nothing for a model without an
/// id), writes upsert them, creates assign ids from 100 upwards.
pub struct FakeServer {
    rows: Mutex<Vec<Map<String, Value>>>,
    requests: Mutex<Vec<Request>>,
    next_id: AtomicI64,
    gate: Option<Barrier>,
    failure: Mutex<Option<String>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Self::build(Value::Array(Vec::new()), None)
    }

    pub fn with_rows(rows: Value) -> Arc<Self> {
        Self::build(rows, None)
    }

    /// Every request waits until `parties` requests are in flight.
    pub fn gated(rows: Value, parties: usize) -> Arc<Self> {
        Self::build(rows, Some(Barrier::new(parties)))
    }

    fn build(rows: Value, gate: Option<Barrier>) -> Arc<Self> {
        let rows = match rows {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Arc::new(FakeServer {
            rows: Mutex::new(rows),
            requests: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            gate,
            failure: Mutex::new(None),
        })
    }

    /// Fail every following request with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, collection: bool) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.collection == collection)
            .count()
    }

    fn row(&self, id: &Value) -> Option<Map<String, Value>> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.get("id") == Some(id))
            .cloned()
    }

    fn upsert(&self, attributes: Map<String, Value>) {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|row| row.get("id").is_some() && row.get("id") == attributes.get("id"))
        {
            Some(row) => row.extend(attributes),
            None => rows.push(attributes),
        }
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn sync(
        &self,
        method: Method,
        target: SyncTarget<'_>,
        options: SyncOptions,
    ) -> Result<Option<Value>, SyncError> {
        let attributes = target
            .as_model()
            .map(|model| model.attributes())
            .unwrap_or_default();
        self.requests.lock().unwrap().push(Request {
            method,
            collection: target.as_collection().is_some(),
            url: options.url.clone(),
            data: options.data.clone(),
            attributes: attributes.clone(),
        });

        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(SyncError::Transport(message));
        }

        match (method, target) {
            (Method::Read, SyncTarget::Collection(_)) => Ok(Some(Value::Array(
                self.rows
                    .lock()
                    .unwrap()
                    .iter()
                    .cloned()
                    .map(Value::Object)
                    .collect(),
            ))),
            (Method::Read, SyncTarget::Model(model)) => {
                match model.get("id").filter(|id| !id.is_null()) {
                    None => Ok(None),
                    Some(id) => self
                        .row(&id)
                        .map(|row| Some(Value::Object(row)))
                        .ok_or_else(|| SyncError::Transport(format!("404 {}", id))),
                }
            }
            (Method::Create, SyncTarget::Model(_)) => {
                let mut attributes = attributes;
                if !attributes.contains_key("id") {
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    attributes.insert("id".into(), Value::from(id));
                }
                self.upsert(attributes.clone());
                Ok(Some(Value::Object(attributes)))
            }
            (Method::Update | Method::Patch, SyncTarget::Model(_)) => {
                self.upsert(attributes.clone());
                Ok(Some(Value::Object(attributes)))
            }
            _ => Ok(None),
        }
    }
}

pub fn attrs(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
