//! Mock Bedrock runtime for integration tests
//!
//! Replays a canned response body and headers, or a recorded event
//! transcript, and records every request it receives.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use axon_llm::transport::{BlockingEvents, EventEnvelope, InvokeOutput, InvokeRequest, Transport, TransportError};
use http::{HeaderMap, HeaderValue};
use serde_json::Value;

/// Blocking transport that returns predictable responses
#[derive(Default)]
pub struct MockBedrock {
    body: Value,
    headers: HeaderMap,
    events: Vec<Value>,
    /// Fail the stream with a transport error after this many events
    break_after: Option<usize>,
    fail: bool,
    requests: Mutex<Vec<InvokeRequest>>,
    events_read: Arc<AtomicUsize>,
}

impl MockBedrock {
    /// Answer invocations with this body
    pub fn responding(body: Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// Answer stream invocations with this transcript
    pub fn streaming(events: Vec<Value>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// Reject every request
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Attach token count headers to complete responses
    pub fn with_token_headers(mut self, input: u64, output: u64) -> Self {
        self.headers
            .insert("x-amzn-bedrock-input-token-count", HeaderValue::from(input));
        self.headers
            .insert("x-amzn-bedrock-output-token-count", HeaderValue::from(output));
        self
    }

    /// Break the stream after `n` events
    pub const fn breaking_after(mut self, n: usize) -> Self {
        self.break_after = Some(n);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Last request body, decoded
    pub fn last_body(&self) -> Value {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("no request was sent");
        serde_json::from_slice(&request.body).unwrap()
    }

    pub fn last_request(&self) -> InvokeRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request was sent")
    }

    /// Number of events handed to the caller so far
    pub fn events_read(&self) -> usize {
        self.events_read.load(Ordering::SeqCst)
    }

    fn record(&self, request: &InvokeRequest) -> Result<(), TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(TransportError::Request("ThrottlingException: rate exceeded".to_owned()));
        }
        Ok(())
    }
}

impl Transport for MockBedrock {
    fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeOutput, TransportError> {
        self.record(request)?;
        Ok(InvokeOutput {
            body: serde_json::to_vec(&self.body).unwrap(),
            headers: self.headers.clone(),
        })
    }

    fn invoke_model_stream(&self, request: &InvokeRequest) -> Result<BlockingEvents, TransportError> {
        self.record(request)?;

        let mut items: Vec<Result<EventEnvelope, TransportError>> = self
            .events
            .iter()
            .map(|event| Ok(EventEnvelope::chunk(serde_json::to_vec(event).unwrap())))
            .collect();
        if let Some(n) = self.break_after {
            items.truncate(n);
            items.push(Err(TransportError::Stream("connection reset".to_owned())));
        }

        let read = Arc::clone(&self.events_read);
        read.store(0, Ordering::SeqCst);
        Ok(Box::new(items.into_iter().inspect(move |_| {
            read.fetch_add(1, Ordering::SeqCst);
        })))
    }
}
