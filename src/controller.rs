//! Per-chapter coordination of the personalization and translation axes.
//!
//! Toggle methods do their bookkeeping (validation, moving an axis to
//! Pending) as soon as they are called; the returned future only performs
//! the remote call and applies its result. At most one axis is Pending at
//! any time, and a result is applied only if the chapter state it was
//! issued against is still current.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::auth::{AuthSnapshot, Credential, CredentialSource};
use crate::broadcast::{LanguageBroadcaster, Subscription};
use crate::client::TransformClient;
use crate::error::TransformError;
use crate::state::{Axis, AxisStatus, TransformState};
use crate::view::ChapterView;

#[cfg(test)]
mod tests;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// What a settled toggle did to the chapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Activated(Axis),
    /// `axis` went back to Idle; `restored` is the other axis when its
    /// content was fetched again and is now displayed.
    Reverted { axis: Axis, restored: Option<Axis> },
}

fn failure_message(axis: Axis) -> &'static str {
    match axis {
        Axis::Personalization => "Failed to personalize chapter. Please try again.",
        Axis::Translation => "Failed to translate chapter. Please try again.",
    }
}

struct Fetch {
    axis: Axis,
    ticket: u64,
    chapter_id: String,
    token: Credential,
    // Set when this fetch re-acquires content after `reverted` was turned off.
    reverted: Option<Axis>,
}

enum Step {
    Done(Transition),
    Fetch(Fetch),
}

struct Inner<C> {
    client: Arc<C>,
    state: Mutex<TransformState>,
    timeout: Duration,
    // Runtime seen at mount; used when a broadcast arrives off-runtime.
    runtime: Option<Handle>,
}

impl<C: TransformClient> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, TransformState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_toggle(&self, axis: Axis, token: Option<&Credential>) -> Result<Step, TransformError> {
        let mut state = self.lock();
        if let Some(busy) = state.pending_axis() {
            log::debug!("[{}] {} toggle rejected, {} in flight", state.chapter_id(), axis, busy);
            return Err(TransformError::InvalidState(busy));
        }
        let token = match token {
            Some(token) => token.clone(),
            None => {
                log::debug!("[{}] {} toggle without credential", state.chapter_id(), axis);
                return Err(TransformError::Unauthenticated);
            }
        };

        if state.is_active(axis) {
            state.deactivate(axis);
            let other = axis.other();
            if !state.is_active(other) {
                log::debug!("[{}] {} reverted", state.chapter_id(), axis);
                return Ok(Step::Done(Transition::Reverted { axis, restored: None }));
            }
            // The other axis is fetched again rather than served from cache.
            state.begin(other);
            log::debug!("[{}] {} reverted, re-fetching {}", state.chapter_id(), axis, other);
            return Ok(Step::Fetch(Fetch {
                axis: other,
                ticket: state.ticket(),
                chapter_id: state.chapter_id().to_string(),
                token,
                reverted: Some(axis),
            }));
        }

        state.begin(axis);
        log::debug!("[{}] {} requested", state.chapter_id(), axis);
        Ok(Step::Fetch(Fetch {
            axis,
            ticket: state.ticket(),
            chapter_id: state.chapter_id().to_string(),
            token,
            reverted: None,
        }))
    }

    fn complete(&self, fetch: &Fetch, result: Result<String, TransformError>) -> Result<Transition, TransformError> {
        let mut state = self.lock();
        if state.ticket() != fetch.ticket || state.status(fetch.axis) != AxisStatus::Pending {
            log::debug!("[{}] discarding stale {} response", fetch.chapter_id, fetch.axis);
            return Err(TransformError::Superseded);
        }
        match result {
            Ok(content) => {
                state.activate(fetch.axis, content);
                log::debug!("[{}] {} active", fetch.chapter_id, fetch.axis);
                Ok(match fetch.reverted {
                    Some(axis) => Transition::Reverted { axis, restored: Some(fetch.axis) },
                    None => Transition::Activated(fetch.axis),
                })
            }
            Err(e) => {
                log::warn!("[{}] {} failed: {}", fetch.chapter_id, fetch.axis, e);
                state.fail(fetch.axis, failure_message(fetch.axis).to_string());
                Err(e)
            }
        }
    }

    fn abandon_if_current(&self, fetch: &Fetch) {
        let mut state = self.lock();
        if state.ticket() == fetch.ticket && state.status(fetch.axis) == AxisStatus::Pending {
            log::debug!("[{}] {} request dropped before settling", fetch.chapter_id, fetch.axis);
            state.abandon(fetch.axis);
        }
    }

    fn language_changed(
        self: &Arc<Self>,
        is_urdu: bool,
        token: Option<&Credential>,
        runtime: Option<&Handle>,
    ) -> Option<JoinHandle<Result<Transition, TransformError>>> {
        if !is_urdu {
            let mut state = self.lock();
            match state.status(Axis::Translation) {
                AxisStatus::Active => state.deactivate(Axis::Translation),
                AxisStatus::Pending => state.abandon(Axis::Translation),
                _ => {}
            }
            return None;
        }

        if self.lock().is_active(Axis::Translation) {
            return None;
        }
        let fetch = match self.begin_toggle(Axis::Translation, token) {
            Ok(Step::Fetch(fetch)) => fetch,
            Ok(Step::Done(_)) => return None,
            Err(e) => {
                log::debug!("language change not applied: {}", e);
                return None;
            }
        };
        let flight = InFlight::new(Arc::clone(self), fetch);
        let handle = Handle::try_current()
            .ok()
            .or_else(|| runtime.cloned())
            .or_else(|| self.runtime.clone());
        match handle {
            Some(handle) => Some(handle.spawn(flight.run())),
            None => {
                log::warn!("[{}] no tokio runtime to run translation", flight.fetch.chapter_id);
                let _ = flight.settle(Err(TransformError::failed("no async runtime to run translation")));
                None
            }
        }
    }
}

/// A request that was started against a particular chapter state.
/// Dropping it unsettled returns its axis to Idle.
struct InFlight<C: TransformClient> {
    inner: Arc<Inner<C>>,
    fetch: Fetch,
    settled: bool,
}

impl<C: TransformClient> InFlight<C> {
    fn new(inner: Arc<Inner<C>>, fetch: Fetch) -> Self {
        Self { inner, fetch, settled: false }
    }

    async fn run(self) -> Result<Transition, TransformError> {
        let client = Arc::clone(&self.inner.client);
        let (id, token) = (&self.fetch.chapter_id, &self.fetch.token);
        let call = async {
            match self.fetch.axis {
                Axis::Personalization => client.personalize(id, token).await,
                Axis::Translation => client.translate(id, token).await,
            }
        };
        let result = match tokio::time::timeout(self.inner.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransformError::failed(format!(
                "no response within {}s",
                self.inner.timeout.as_secs_f32()
            ))),
        };
        self.settle(result)
    }

    fn settle(mut self, result: Result<String, TransformError>) -> Result<Transition, TransformError> {
        self.settled = true;
        self.inner.complete(&self.fetch, result)
    }
}

impl<C: TransformClient> Drop for InFlight<C> {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.abandon_if_current(&self.fetch);
        }
    }
}

/// Owns the transformation record of one mounted chapter.
pub struct ChapterController<C: TransformClient> {
    inner: Arc<Inner<C>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<C: TransformClient> ChapterController<C> {
    pub fn mount(client: Arc<C>, chapter_id: impl Into<String>, original: impl Into<String>) -> Self {
        Self::with_timeout(client, chapter_id, original, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        client: Arc<C>,
        chapter_id: impl Into<String>,
        original: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let state = TransformState::new(chapter_id, original);
        log::debug!("[{}] mounted", state.chapter_id());
        Self {
            inner: Arc::new(Inner {
                client,
                state: Mutex::new(state),
                timeout,
                runtime: Handle::try_current().ok(),
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Starts over when the chapter id or its original body changed.
    pub fn remount(&self, chapter_id: &str, original: &str) {
        let mut state = self.inner.lock();
        if state.chapter_id() == chapter_id && state.original() == original {
            return;
        }
        log::debug!("[{}] remounted as {}", state.chapter_id(), chapter_id);
        state.reset(chapter_id.to_string(), original.to_string());
    }

    /// Detaches from the broadcaster; responses still in flight are dropped.
    pub fn unmount(self) {}

    pub fn toggle_personalization(
        &self,
        token: Option<&Credential>,
    ) -> impl Future<Output = Result<Transition, TransformError>> + Send + 'static {
        self.toggle(Axis::Personalization, token)
    }

    pub fn toggle_translation(
        &self,
        token: Option<&Credential>,
    ) -> impl Future<Output = Result<Transition, TransformError>> + Send + 'static {
        self.toggle(Axis::Translation, token)
    }

    fn toggle(
        &self,
        axis: Axis,
        token: Option<&Credential>,
    ) -> impl Future<Output = Result<Transition, TransformError>> + Send + 'static {
        let started = self.inner.begin_toggle(axis, token).map(|step| match step {
            Step::Fetch(fetch) => Ok(InFlight::new(Arc::clone(&self.inner), fetch)),
            Step::Done(transition) => Err(transition),
        });
        async move {
            match started? {
                Ok(flight) => flight.run().await,
                Err(transition) => Ok(transition),
            }
        }
    }

    /// Back to the original content on both axes. Never touches the network.
    pub fn revert_all(&self) {
        let mut state = self.inner.lock();
        state.revert_all();
        log::debug!("[{}] reverted all", state.chapter_id());
    }

    pub fn dismiss_error(&self) {
        self.inner.lock().dismiss_error();
    }

    /// Reacts to the page-wide language toggle. Urdu starts a translation
    /// whose completion runs on the current tokio runtime, or on the one
    /// this chapter was mounted on when called from a plain thread. English
    /// drops the translation axis without any network call.
    pub fn on_external_language_change(
        &self,
        is_urdu: bool,
        token: Option<&Credential>,
    ) -> Option<JoinHandle<Result<Transition, TransformError>>> {
        self.inner.language_changed(is_urdu, token, None)
    }

    /// Follows `broadcaster` until unmounted or attached elsewhere. The
    /// runtime current at this call (if any) runs broadcast-started
    /// translations, so the broadcaster may be driven from a UI thread.
    pub fn attach(&self, broadcaster: &LanguageBroadcaster, auth: Arc<dyn CredentialSource>) {
        let weak = Arc::downgrade(&self.inner);
        let runtime = Handle::try_current().ok();
        let subscription = broadcaster.subscribe(move |is_urdu| {
            if let Some(inner) = weak.upgrade() {
                let token = auth.credential();
                inner.language_changed(is_urdu, token.as_ref(), runtime.as_ref());
            }
        });
        let mut slot = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(subscription);
    }

    pub fn detach(&self) {
        let mut slot = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        slot.take();
    }

    pub fn snapshot(&self) -> TransformState {
        self.inner.lock().clone()
    }

    pub fn status(&self, axis: Axis) -> AxisStatus {
        self.inner.lock().status(axis)
    }

    pub fn displayed_content(&self) -> String {
        self.inner.lock().displayed().to_string()
    }

    pub fn is_rtl(&self) -> bool {
        self.inner.lock().is_rtl()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error().map(str::to_string)
    }

    pub fn view(&self, auth: &AuthSnapshot) -> ChapterView {
        ChapterView::derive(&self.inner.lock(), auth)
    }
}

impl<C: TransformClient> Drop for ChapterController<C> {
    fn drop(&mut self) {
        self.detach();
        let mut state = self.inner.lock();
        state.retire();
        log::debug!("[{}] unmounted", state.chapter_id());
    }
}
