//! In-memory port fakes shared by the scenario tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use refsync_core::{
    BatchDispatcher, BatchTransport, CredentialStore, DeviceAuthenticator, DeviceFlowClient,
    HttpReply, PollOutcome, ResponseClassifier, RetryCoordinator, Sleeper, TokenGuard,
    VerificationPresenter,
};
use refsync_domain::{
    BatchRequestBody, Credential, DeviceCode, LogicalRequest, RefSyncError, Result, RetryConfig,
};
use serde_json::{json, Value};

pub fn credential(token: &str) -> Credential {
    Credential::from_token_response(json!({"access_token": token, "token_type": "Bearer"})).unwrap()
}

pub fn requests(n: usize) -> Vec<LogicalRequest> {
    (0..n).map(|i| LogicalRequest::get(format!("item-{i}"), format!("/items/{i}"))).collect()
}

#[derive(Default)]
pub struct MemoryStore {
    pub record: Mutex<Option<Credential>>,
    pub saves: Mutex<usize>,
    pub clears: Mutex<usize>,
}

impl MemoryStore {
    pub fn with(credential: Credential) -> Self {
        let store = Self::default();
        *store.record.lock().unwrap() = Some(credential);
        store
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.record.lock().unwrap().clone())
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        *self.saves.lock().unwrap() += 1;
        *self.record.lock().unwrap() = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.clears.lock().unwrap() += 1;
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

/// Grants `token-N` on the N-th device flow, or denies every flow.
#[derive(Default)]
pub struct ScriptedFlow {
    pub flows: Mutex<usize>,
    pub deny: bool,
}

impl ScriptedFlow {
    pub fn flows(&self) -> usize {
        *self.flows.lock().unwrap()
    }
}

#[async_trait]
impl DeviceFlowClient for ScriptedFlow {
    async fn request_device_code(&self, _scopes: &[String]) -> Result<DeviceCode> {
        *self.flows.lock().unwrap() += 1;
        Ok(DeviceCode {
            device_code: "device".into(),
            user_code: "USER-CODE".into(),
            verification_uri: "https://login.example.test/device".into(),
            message: "Enter USER-CODE".into(),
            expires_in: 900,
            interval: 5,
        })
    }

    async fn poll_token(&self, _code: &DeviceCode) -> Result<PollOutcome> {
        if self.deny {
            return Ok(PollOutcome::Denied("authorization_declined".into()));
        }
        Ok(PollOutcome::Granted(credential(&format!("token-{}", self.flows()))))
    }
}

pub struct NullPresenter;

impl VerificationPresenter for NullPresenter {
    fn present(&self, _code: &DeviceCode) {}
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// What the fake server answers for one sub-request.
pub struct SubReply {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl SubReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, headers: BTreeMap::new(), body }
    }

    pub fn error(status: u16, code: &str) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: json!({"error": {"code": code, "message": format!("{code} message")}}),
        }
    }

    pub fn throttled(retry_after_secs: u64) -> Self {
        let mut reply = Self::error(429, "TooManyRequests");
        reply.headers.insert("Retry-After".into(), retry_after_secs.to_string());
        reply
    }
}

/// Sub-request as seen by the fake server.
pub struct SubCall<'a> {
    pub authorization: &'a str,
    pub url: &'a str,
    /// 1-based count of times this URL has been received.
    pub attempt: usize,
}

type Responder = dyn Fn(&SubCall<'_>) -> SubReply + Send + Sync;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub authorization: String,
    pub urls: Vec<String>,
}

/// Fake batch endpoint answering each sub-request through a closure.
/// Replies are emitted in reverse order to exercise demultiplexing.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    attempts: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<RecordedCall>>,
    outer_replies: Mutex<VecDeque<Result<HttpReply>>>,
}

impl ScriptedTransport {
    pub fn new(responder: impl Fn(&SubCall<'_>) -> SubReply + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            attempts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            outer_replies: Mutex::new(VecDeque::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(|call| SubReply::ok(json!({"webUrl": format!("https://drive.test{}", call.url)})))
    }

    /// Queue a raw outer reply used instead of the responder for the next
    /// call.
    pub fn push_outer(&self, reply: Result<HttpReply>) {
        self.outer_replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls().iter().map(|c| c.urls.len()).collect()
    }
}

#[async_trait]
impl BatchTransport for ScriptedTransport {
    async fn post_batch(&self, authorization: &str, body: &BatchRequestBody) -> Result<HttpReply> {
        self.calls.lock().unwrap().push(RecordedCall {
            authorization: authorization.to_string(),
            urls: body.requests.iter().map(|r| r.url.clone()).collect(),
        });

        if let Some(reply) = self.outer_replies.lock().unwrap().pop_front() {
            return reply;
        }

        let mut responses = Vec::new();
        for sub in body.requests.iter().rev() {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let entry = attempts.entry(sub.url.clone()).or_insert(0);
                *entry += 1;
                *entry
            };
            let reply = (self.responder)(&SubCall { authorization, url: &sub.url, attempt });
            responses.push(json!({
                "id": sub.id,
                "status": reply.status,
                "headers": reply.headers,
                "body": reply.body,
            }));
        }

        Ok(HttpReply {
            status: 200,
            headers: BTreeMap::new(),
            body: json!({ "responses": responses }).to_string(),
        })
    }
}

pub fn network_error() -> Result<HttpReply> {
    Err(RefSyncError::Network("connection reset".into()))
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub flow: Arc<ScriptedFlow>,
    pub sleeper: Arc<RecordingSleeper>,
    pub transport: Arc<ScriptedTransport>,
    pub guard: Arc<TokenGuard>,
    pub coordinator: RetryCoordinator,
}

pub async fn harness(
    store: MemoryStore,
    flow: ScriptedFlow,
    transport: ScriptedTransport,
    batch_size: usize,
) -> Harness {
    let store = Arc::new(store);
    let flow = Arc::new(flow);
    let sleeper = Arc::new(RecordingSleeper::default());
    let transport = Arc::new(transport);
    let authenticator = Arc::new(DeviceAuthenticator::new(
        store.clone(),
        flow.clone(),
        Arc::new(NullPresenter),
        sleeper.clone(),
        vec!["Files.ReadWrite.All".into()],
    ));
    let guard = Arc::new(TokenGuard::initialize(authenticator).await);
    let dispatcher = BatchDispatcher::new(
        transport.clone(),
        guard.clone(),
        ResponseClassifier::from_config(&RetryConfig::default()),
        batch_size,
    );
    let coordinator = RetryCoordinator::new(dispatcher, sleeper.clone());
    Harness { store, flow, sleeper, transport, guard, coordinator }
}

/// Harness with a stored credential and an always-succeeding server.
pub async fn authorized(transport: ScriptedTransport, batch_size: usize) -> Harness {
    harness(MemoryStore::with(credential("stored")), ScriptedFlow::default(), transport, batch_size)
        .await
}
