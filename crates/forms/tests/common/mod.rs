#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use formbind_core::AppConfig;
use formbind_forms::{
    Collaborators, FormFactory, MemoryDocument, MemoryForm, Notification, Notifier, PendingRedirect,
};
use formbind_transport::{
    InMemoryTokenStore, RequestConfig, Response, TokenManager, TokenStore, Transport,
    TransportError,
};
use serde_json::Value;
use tokio::sync::Semaphore;

/// A canned transport answer.
pub enum Reply {
    Ok(u16, Value),
    Fail(u16, Value),
    RateLimited,
}

/// Transport that answers from a script and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RequestConfig>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// Hold every request until a permit is added to `gate`.
    pub fn gated(replies: Vec<Reply>, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(replies)
        }
    }

    pub fn requests(&self) -> Vec<RequestConfig> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, config: RequestConfig) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(config.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Ok(200, Value::Null));
        match reply {
            Reply::Ok(status, data) => Ok(Response::new(status, data, config)),
            Reply::Fail(status, data) => Err(TransportError::Http { status, data }),
            Reply::RateLimited => Err(TransportError::RateLimited),
        }
    }
}

/// Notifier that keeps everything it was asked to show.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

/// Everything a test needs to drive a pipeline and inspect its effects.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<PendingRedirect>,
    pub tokens: Arc<InMemoryTokenStore>,
    pub factory: FormFactory,
}

impl Harness {
    pub fn new(app: AppConfig, transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(PendingRedirect::new());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let collaborators = Collaborators {
            transport: transport.clone(),
            notifier: notifier.clone(),
            navigator: navigator.clone(),
            tokens: TokenManager::new(tokens.clone() as Arc<dyn TokenStore>, &app.api),
        };
        let factory = FormFactory::new(Arc::new(app), collaborators);
        Self {
            transport,
            notifier,
            navigator,
            tokens,
            factory,
        }
    }
}

/// A document containing `form` under `#form`.
pub fn document_with(form: Arc<MemoryForm>) -> Arc<MemoryDocument> {
    Arc::new(MemoryDocument::new().with_form("#form", form))
}
