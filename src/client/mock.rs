//! Scripted [`TransformClient`] for tests and offline runs.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use super::TransformClient;
use crate::auth::Credential;
use crate::error::TransformError;
use crate::state::Axis;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub axis: Axis,
    pub chapter_id: String,
}

#[derive(Default)]
struct Script {
    personalize: VecDeque<Result<String, TransformError>>,
    translate: VecDeque<Result<String, TransformError>>,
    // Used once a queue is empty.
    personalize_fallback: Option<Result<String, TransformError>>,
    translate_fallback: Option<Result<String, TransformError>>,
    calls: Vec<Call>,
}

/// Replies come from per-axis queues, then from a sticky fallback, then
/// fail. While the gate is held every request waits for a `release`.
#[derive(Clone)]
pub struct MockClient {
    script: Arc<Mutex<Script>>,
    gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            gate: Arc::new(Mutex::new(None)),
        }
    }

    /// Every call on `axis` succeeds with `content`.
    pub fn always(self, axis: Axis, content: impl Into<String>) -> Self {
        self.set_fallback(axis, Ok(content.into()));
        self
    }

    /// Every call on `axis` fails with `message`.
    pub fn always_fail(self, axis: Axis, message: impl Into<String>) -> Self {
        self.set_fallback(axis, Err(TransformError::failed(message)));
        self
    }

    pub fn push(&self, axis: Axis, reply: Result<String, TransformError>) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        match axis {
            Axis::Personalization => script.personalize.push_back(reply),
            Axis::Translation => script.translate.push_back(reply),
        }
    }

    pub fn set_fallback(&self, axis: Axis, reply: Result<String, TransformError>) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        match axis {
            Axis::Personalization => script.personalize_fallback = Some(reply),
            Axis::Translation => script.translate_fallback = Some(reply),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self, axis: Axis) -> usize {
        self.calls().iter().filter(|c| c.axis == axis).count()
    }

    /// Holds subsequent requests in flight until released.
    pub fn hold(&self) {
        if let Ok(mut gate) = self.gate.lock() {
            *gate = Some(Arc::new(Semaphore::new(0)));
        }
    }

    /// Lets `n` held requests through.
    pub fn release(&self, n: usize) {
        if let Ok(gate) = self.gate.lock() {
            if let Some(sem) = gate.as_ref() {
                sem.add_permits(n);
            }
        }
    }

    fn record(&self, axis: Axis, chapter_id: &str) -> Result<String, TransformError> {
        let mut guard = self.script.lock().unwrap_or_else(|e| e.into_inner());
        let script = &mut *guard;
        script.calls.push(Call {
            axis,
            chapter_id: chapter_id.to_string(),
        });
        let (queue, fallback) = match axis {
            Axis::Personalization => (&mut script.personalize, &script.personalize_fallback),
            Axis::Translation => (&mut script.translate, &script.translate_fallback),
        };
        queue
            .pop_front()
            .or_else(|| fallback.clone())
            .unwrap_or_else(|| Err(TransformError::failed(format!("no scripted {} reply", axis))))
    }

    async fn reply(&self, axis: Axis, chapter_id: &str) -> Result<String, TransformError> {
        // Record before waiting so tests can observe that the call was issued.
        let reply = self.record(axis, chapter_id);
        let gate = self.gate.lock().ok().and_then(|g| g.clone());
        if let Some(sem) = gate {
            if let Ok(permit) = sem.acquire().await {
                permit.forget();
            }
        }
        reply
    }
}

impl TransformClient for MockClient {
    fn personalize(
        &self,
        chapter_id: &str,
        _token: &Credential,
    ) -> impl Future<Output = Result<String, TransformError>> + Send {
        self.reply(Axis::Personalization, chapter_id)
    }

    fn translate(
        &self,
        chapter_id: &str,
        _token: &Credential,
    ) -> impl Future<Output = Result<String, TransformError>> + Send {
        self.reply(Axis::Translation, chapter_id)
    }
}
