//! In-process `Transport` for unit tests: records every request and plays
//! back queued outcomes in order.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client::EnfClient;
use crate::config::ClientConfig;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportError};

enum Step {
    Respond(HttpResponse),
    Fail(TransportError),
    Hang,
    CancelThenFail(CancellationToken),
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    requests: Vec<HttpRequest>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub(crate) fn respond(&self, status: u16, body: &str) {
        self.push(Step::Respond(HttpResponse::new(status, body)));
    }

    pub(crate) fn fail(&self, err: TransportError) {
        self.push(Step::Fail(err));
    }

    /// Never answers; the caller's context has to end the call.
    pub(crate) fn hang(&self) {
        self.push(Step::Hang);
    }

    /// Cancels `token`, then reports a connection failure.
    pub(crate) fn cancel_then_fail(&self, token: CancellationToken) {
        self.push(Step::CancelThenFail(token));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().requests.clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.inner
            .lock()
            .requests
            .last()
            .cloned()
            .expect("no request was sent")
    }

    fn push(&self, step: Step) {
        self.inner.lock().steps.push_back(step);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let step = {
            let mut script = self.inner.lock();
            script.requests.push(request);
            script.steps.pop_front()
        };
        match step.expect("no scripted response left") {
            Step::Respond(response) => Ok(response),
            Step::Fail(err) => Err(err),
            Step::Hang => std::future::pending().await,
            Step::CancelThenFail(token) => {
                token.cancel();
                Err(TransportError::Connection("connection reset".to_string()))
            }
        }
    }
}

pub(crate) fn client_with(transport: &ScriptedTransport) -> EnfClient {
    EnfClient::with_transport(ClientConfig::new("http://localhost"), transport.clone())
        .expect("valid test configuration")
}
