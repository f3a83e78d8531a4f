//! Scripted transport for tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::Value;

use super::transport::{HttpRequest, Transport, TransportError};

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct FakeTransport {
    responses: RefCell<VecDeque<Result<Value, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn respond(&self, body: Value) {
        self.responses.borrow_mut().push_back(Ok(body));
    }

    pub fn fail(&self, status: u16) {
        self.responses
            .borrow_mut()
            .push_back(Err(TransportError::Status {
                status,
                body: "scripted failure".to_string(),
            }));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.borrow().last().cloned()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: HttpRequest) -> Result<Value, TransportError> {
        self.requests.borrow_mut().push(request);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Status {
                    status: 501,
                    body: "no scripted response".to_string(),
                })
            })
    }
}
