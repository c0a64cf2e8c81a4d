//! Mock workflow transport for testing.
//!
//! Returns scripted replies and captures every request so tests can exercise
//! retry and extraction logic without a running workflow engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::transport::{TransportError, TransportResult, WorkflowRequest, WorkflowResponse, WorkflowTransport};

/// A scripted reply.
pub type MockReply = TransportResult<WorkflowResponse>;

/// Mock transport.
///
/// Replies are served in order and cycle once exhausted. With no replies
/// scripted every call gets `200 {}`.
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<RwLock<Vec<MockReply>>>,
    reply_index: Arc<AtomicUsize>,
    captured: Arc<RwLock<Vec<WorkflowRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply with the given status and body.
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.replies.write().push(Ok(WorkflowResponse::new(status, body)));
        self
    }

    /// Queue a 200 reply with a JSON body.
    pub fn respond_json(self, body: &serde_json::Value) -> Self {
        self.respond(200, body.to_string())
    }

    /// Queue a transport-level failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.replies.write().push(Err(error));
        self
    }

    /// Get all captured requests.
    pub fn requests(&self) -> Vec<WorkflowRequest> {
        self.captured.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }

    /// Clear captured requests and rewind the script.
    pub fn reset(&self) {
        self.captured.write().clear();
        self.reply_index.store(0, Ordering::SeqCst);
    }

    fn next_reply(&self) -> MockReply {
        let replies = self.replies.read();
        if replies.is_empty() {
            return Ok(WorkflowResponse::ok("{}"));
        }
        let index = self.reply_index.fetch_add(1, Ordering::SeqCst);
        replies
            .get(index % replies.len())
            .cloned()
            .unwrap_or_else(|| Ok(WorkflowResponse::ok("{}")))
    }
}

#[async_trait]
impl WorkflowTransport for MockTransport {
    async fn post(&self, request: &WorkflowRequest) -> TransportResult<WorkflowResponse> {
        self.captured.write().push(request.clone());
        self.next_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn request() -> WorkflowRequest {
        WorkflowRequest {
            url: "http://mock".to_string(),
            body: json!({"input_value": "x"}),
            headers: Vec::new(),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_replies_in_order_then_cycle() {
        let mock = MockTransport::new().respond(504, "").respond(200, "[]");

        assert_eq!(mock.post(&request()).await.unwrap().status, 504);
        assert_eq!(mock.post(&request()).await.unwrap().status, 200);
        assert_eq!(mock.post(&request()).await.unwrap().status, 504);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_default_reply_and_capture() {
        let mock = MockTransport::new();
        let reply = mock.post(&request()).await.unwrap();
        assert_eq!(reply, WorkflowResponse::ok("{}"));
        assert_eq!(mock.requests()[0].body["input_value"], "x");

        mock.reset();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mock = MockTransport::new().fail(TransportError::Request("refused".to_string()));
        assert!(matches!(mock.post(&request()).await, Err(TransportError::Request(_))));
    }
}
