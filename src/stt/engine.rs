use crate::error::{LongscribeError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Notify, Semaphore};

/// Trait for speech-to-text engines that transcribe one segment artifact.
///
/// This trait allows swapping implementations (external command vs mock).
/// Callers bound every call with their own wall-clock timeout and drop the
/// future on expiry, so implementations must be cancel-safe.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe a segment artifact to text.
    ///
    /// # Arguments
    /// * `artifact` - Mono 16 kHz 16-bit PCM WAV file
    /// * `model` - Model identifier passed through to the engine
    /// * `offset_secs` - Start of the segment within the original input,
    ///   so engine-side timestamps stay globally meaningful
    async fn transcribe(&self, artifact: &Path, model: &str, offset_secs: f64) -> Result<String>;

    /// Short engine name used in logs.
    fn name(&self) -> &str;
}

/// Implement TranscriptionEngine for Arc<T> to allow sharing across sessions.
#[async_trait]
impl<T: TranscriptionEngine + ?Sized> TranscriptionEngine for Arc<T> {
    async fn transcribe(&self, artifact: &Path, model: &str, offset_secs: f64) -> Result<String> {
        (**self).transcribe(artifact, model, offset_secs).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Scripted reply of the mock engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Succeed with this text.
    Text(String),
    /// Fail with an engine error carrying this message.
    Fail(String),
    /// Never return; only a caller-side timeout ends the attempt.
    Hang,
}

/// One recorded invocation of the mock engine.
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub artifact: PathBuf,
    pub model: String,
    pub offset_secs: f64,
    /// Whether the artifact file existed when the engine was invoked.
    pub artifact_existed: bool,
}

/// Mock engine for testing.
///
/// Replies are keyed by segment offset (whole seconds): one-shot replies are
/// consumed first, then a persistent per-offset reply, then the default.
#[derive(Debug)]
pub struct MockEngine {
    default_reply: MockReply,
    fixed: HashMap<u64, MockReply>,
    queued: Mutex<HashMap<u64, VecDeque<MockReply>>>,
    calls: Mutex<Vec<EngineCall>>,
    gate: Option<Arc<Semaphore>>,
    started: Arc<Notify>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine answering "mock transcription" everywhere.
    pub fn new() -> Self {
        Self {
            default_reply: MockReply::Text("mock transcription".to_string()),
            fixed: HashMap::new(),
            queued: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
            started: Arc::new(Notify::new()),
        }
    }

    /// Configure the default response text.
    pub fn with_response(mut self, text: &str) -> Self {
        self.default_reply = MockReply::Text(text.to_string());
        self
    }

    /// Always answer `reply` for the segment starting at `offset_secs`.
    pub fn with_reply_at(mut self, offset_secs: u64, reply: MockReply) -> Self {
        self.fixed.insert(offset_secs, reply);
        self
    }

    /// Queue one-shot replies for the segment starting at `offset_secs`.
    pub fn with_replies_at(self, offset_secs: u64, replies: Vec<MockReply>) -> Self {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(offset_secs)
            .or_default()
            .extend(replies);
        self
    }

    /// Block every call until a permit is available on `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Notified each time a call starts (before waiting on the gate).
    pub fn started(&self) -> Arc<Notify> {
        Arc::clone(&self.started)
    }

    /// All invocations so far, in call order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of invocations for the segment starting at `offset_secs`.
    pub fn calls_at(&self, offset_secs: u64) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.offset_secs.round() as u64 == offset_secs)
            .count()
    }

    fn next_reply(&self, key: u64) -> MockReply {
        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        queued
            .or_else(|| self.fixed.get(&key).cloned())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

#[async_trait]
impl TranscriptionEngine for MockEngine {
    async fn transcribe(&self, artifact: &Path, model: &str, offset_secs: f64) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EngineCall {
                artifact: artifact.to_path_buf(),
                model: model.to_string(),
                offset_secs,
                artifact_existed: artifact.exists(),
            });
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|e| LongscribeError::Engine {
                message: format!("mock gate closed: {}", e),
            })?;
            permit.forget();
        }

        match self.next_reply(offset_secs.round() as u64) {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(message) => Err(LongscribeError::Engine { message }),
            MockReply::Hang => {
                std::future::pending::<()>().await;
                Err(LongscribeError::Other("mock hang resumed".to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
