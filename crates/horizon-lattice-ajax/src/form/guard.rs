//! Guarded form submission.
//!
//! [`FormGuard`] intercepts a form's submit events and sends the form
//! through [`Ajax`] instead. While a submission is in flight the guard stops
//! listening; it starts again only once both the request has completed and
//! the cooldown interval has elapsed, whichever comes last.
//!
//! ```text
//!            submit                 confirmed + dispatched
//!  Armed ───────────► AwaitingConfirm ──────────────────► Locked
//!    ▲                      │ declined / rejected            │
//!    └──────────────────────┘                                │
//!    └──────────── request completed AND cooldown elapsed ───┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use super::source::FormSource;
use crate::ajax::{Ajax, AjaxResult, RequestId, RequestOptions};
use crate::error::AjaxError;

/// Decides whether a submission should go ahead.
#[derive(Clone, Default)]
pub enum Confirmation {
    /// Every submission is confirmed.
    #[default]
    Always,
    /// Asked inline, on the submitting thread.
    Sync(Arc<dyn Fn() -> bool + Send + Sync>),
    /// Asked asynchronously, e.g. through a dialog.
    Async(Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>),
}

impl Confirmation {
    /// An inline confirmation.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// An asynchronous confirmation.
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self::Async(Arc::new(move || -> BoxFuture<'static, bool> { Box::pin(f()) }))
    }
}

impl std::fmt::Debug for Confirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Sync(_) => f.write_str("Sync(..)"),
            Self::Async(_) => f.write_str("Async(..)"),
        }
    }
}

/// Options for [`FormGuard::bind`].
#[derive(Clone, Debug, Default)]
pub struct FormGuardOptions {
    confirmation: Option<Confirmation>,
    interval: Option<Duration>,
    request: RequestOptions,
}

impl FormGuardOptions {
    /// Create options that use the instance defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask before each submission.
    pub fn confirmation(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Set the cooldown after each submission.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the cooldown in milliseconds.
    ///
    /// Values that are not a finite, non-negative number leave the default
    /// in place. Values too large for a `Duration` saturate.
    pub fn interval_ms(mut self, ms: f64) -> Self {
        self.interval = (ms.is_finite() && ms >= 0.0)
            .then(|| Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX));
        self
    }

    /// Options applied to every submission request.
    pub fn request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }
}

/// A submit event as seen by the guard and its handler.
#[derive(Clone, Debug, Default)]
pub struct SubmitEvent {
    default_prevented: bool,
    response: Option<Arc<AjaxResult>>,
}

impl SubmitEvent {
    /// A fresh, native submit event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the native submission.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Whether the native submission was suppressed.
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// The result of the request this submission sent.
    pub fn response(&self) -> Option<&Arc<AjaxResult>> {
        self.response.as_ref()
    }
}

/// What a call to [`FormGuard::submit`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The guard was not listening or already handling a submission.
    Ignored,
    /// The confirmation declined; nothing was sent.
    Declined,
    /// An asynchronous confirmation is pending.
    AwaitingConfirmation,
    /// The request was dispatched.
    Dispatched(RequestId),
    /// The request options were rejected; nothing was sent.
    Failed(AjaxError),
}

/// The guard's phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardPhase {
    /// Ready to accept a submission.
    Armed,
    /// Waiting for the confirmation to answer.
    AwaitingConfirm,
    /// A submission is in flight or cooling down.
    Locked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RearmEvent {
    CooldownElapsed,
    RequestCompleted,
}

#[derive(Debug)]
enum Phase {
    Armed,
    AwaitingConfirm,
    /// `first_arrival` records which of the two re-arm events came first.
    Locked {
        first_arrival: Option<RearmEvent>,
    },
}

#[derive(Debug)]
struct GuardState {
    phase: Phase,
    listening: bool,
    bound: bool,
}

type SubmitHandler = Arc<dyn Fn(SubmitEvent) + Send + Sync>;

struct GuardInner {
    ajax: Ajax,
    form: Arc<dyn FormSource>,
    handler: SubmitHandler,
    confirmation: Confirmation,
    interval: Duration,
    request: RequestOptions,
    state: Mutex<GuardState>,
}

/// Binds a form to the pipeline.
///
/// Cheap to clone; clones share the same state.
///
/// # Example
///
/// ```ignore
/// let guard = FormGuard::bind(
///     ajax,
///     Arc::new(form),
///     |event| println!("saved: {:?}", event.response().map(|r| r.status())),
///     FormGuardOptions::new()
///         .interval_ms(500.0)
///         .confirmation(Confirmation::sync(|| true)),
/// );
///
/// let mut event = SubmitEvent::new();
/// guard.submit(&mut event);
/// ```
#[derive(Clone)]
pub struct FormGuard {
    inner: Arc<GuardInner>,
}

impl FormGuard {
    /// Bind `form`, armed and listening.
    ///
    /// `handler` is called with the submit event once each submission's
    /// request completes.
    pub fn bind<H>(ajax: Ajax, form: Arc<dyn FormSource>, handler: H, options: FormGuardOptions) -> Self
    where
        H: Fn(SubmitEvent) + Send + Sync + 'static,
    {
        let confirmation = options
            .confirmation
            .unwrap_or_else(|| ajax.settings().confirmation.clone());
        let interval = options
            .interval
            .unwrap_or_else(|| ajax.settings().interval());

        tracing::debug!(
            target: "horizon_lattice_ajax::form",
            action = %form.action(),
            ?interval,
            "Form guard bound"
        );

        Self {
            inner: Arc::new(GuardInner {
                ajax,
                form,
                handler: Arc::new(handler),
                confirmation,
                interval,
                request: options.request,
                state: Mutex::new(GuardState {
                    phase: Phase::Armed,
                    listening: true,
                    bound: true,
                }),
            }),
        }
    }

    /// Handle a native submit event.
    ///
    /// The event's default action is always prevented. Spawns the request
    /// and the cooldown timer on the Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if a submission is accepted outside a Tokio runtime.
    pub fn submit(&self, event: &mut SubmitEvent) -> SubmitOutcome {
        event.prevent_default();

        {
            let mut state = self.inner.state.lock();
            if !state.listening || !matches!(state.phase, Phase::Armed) {
                tracing::trace!(
                    target: "horizon_lattice_ajax::form",
                    phase = ?state.phase,
                    "Submit ignored"
                );
                return SubmitOutcome::Ignored;
            }
            // Claim the guard before running user code.
            state.phase = Phase::AwaitingConfirm;
        }

        match &self.inner.confirmation {
            Confirmation::Always => self.confirmed(true, event.clone()),
            Confirmation::Sync(ask) => {
                let answer = ask();
                self.confirmed(answer, event.clone())
            }
            Confirmation::Async(ask) => {
                let answer = ask();
                let guard = self.clone();
                let event = event.clone();
                tokio::spawn(async move {
                    let answer = answer.await;
                    guard.confirmed(answer, event);
                });
                SubmitOutcome::AwaitingConfirmation
            }
        }
    }

    /// The current phase.
    pub fn phase(&self) -> GuardPhase {
        match self.inner.state.lock().phase {
            Phase::Armed => GuardPhase::Armed,
            Phase::AwaitingConfirm => GuardPhase::AwaitingConfirm,
            Phase::Locked { .. } => GuardPhase::Locked,
        }
    }

    /// Whether submit events are currently handled.
    pub fn is_listening(&self) -> bool {
        self.inner.state.lock().listening
    }

    /// Stop handling submit events for good.
    ///
    /// A submission already in flight still completes and its handler still
    /// runs, but the guard does not start listening again. A confirmation
    /// still pending at this point sends nothing, even if it accepts.
    pub fn unbind(&self) {
        let mut state = self.inner.state.lock();
        state.bound = false;
        state.listening = false;
        tracing::debug!(target: "horizon_lattice_ajax::form", "Form guard unbound");
    }

    /// The form this guard submits.
    pub fn form(&self) -> &Arc<dyn FormSource> {
        &self.inner.form
    }

    fn confirmed(&self, answer: bool, mut event: SubmitEvent) -> SubmitOutcome {
        {
            let mut state = self.inner.state.lock();
            if !state.bound {
                state.phase = Phase::Armed;
                tracing::debug!(target: "horizon_lattice_ajax::form", "Confirmation arrived after unbind");
                return SubmitOutcome::Ignored;
            }
        }

        if !answer {
            self.inner.state.lock().phase = Phase::Armed;
            tracing::debug!(target: "horizon_lattice_ajax::form", "Submission declined");
            return SubmitOutcome::Declined;
        }

        let pending = match self
            .inner
            .ajax
            .dispatch_form(self.inner.form.clone(), self.inner.request.clone())
        {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(
                    target: "horizon_lattice_ajax::form",
                    error = %e,
                    "Form submission rejected"
                );
                self.inner.state.lock().phase = Phase::Armed;
                return SubmitOutcome::Failed(e);
            }
        };
        let id = pending.id();

        {
            let mut state = self.inner.state.lock();
            state.listening = false;
            state.phase = Phase::Locked {
                first_arrival: None,
            };
        }

        let guard = self.clone();
        let interval = self.inner.interval;
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            guard.rearm(RearmEvent::CooldownElapsed);
        });

        let guard = self.clone();
        tokio::spawn(async move {
            let result = Arc::new(pending.await);
            guard.rearm(RearmEvent::RequestCompleted);
            event.response = Some(result);
            (guard.inner.handler)(event);
        });

        SubmitOutcome::Dispatched(id)
    }

    fn rearm(&self, event: RearmEvent) {
        let mut state = self.inner.state.lock();
        match &mut state.phase {
            Phase::Locked { first_arrival } if first_arrival.is_none() => {
                *first_arrival = Some(event);
                tracing::trace!(
                    target: "horizon_lattice_ajax::form",
                    ?event,
                    "Waiting for the other re-arm event"
                );
                return;
            }
            Phase::Locked { .. } => {}
            _ => return,
        }

        state.phase = Phase::Armed;
        state.listening = state.bound;
        tracing::debug!(
            target: "horizon_lattice_ajax::form",
            listening = state.listening,
            "Form guard re-armed"
        );
    }
}

impl std::fmt::Debug for FormGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormGuard")
            .field("action", &self.inner.form.action())
            .field("interval", &self.inner.interval)
            .field("confirmation", &self.inner.confirmation)
            .field("state", &*self.inner.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_ms_rejects_invalid_values() {
        assert_eq!(FormGuardOptions::new().interval_ms(f64::NAN).interval, None);
        assert_eq!(FormGuardOptions::new().interval_ms(-1.0).interval, None);
        assert_eq!(FormGuardOptions::new().interval_ms(f64::INFINITY).interval, None);
        assert_eq!(
            FormGuardOptions::new().interval_ms(250.0).interval,
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            FormGuardOptions::new().interval_ms(0.0).interval,
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_interval_ms_saturates_huge_values() {
        assert_eq!(
            FormGuardOptions::new().interval_ms(1e300).interval,
            Some(Duration::MAX)
        );
        assert_eq!(
            FormGuardOptions::new().interval_ms(f64::MAX).interval,
            Some(Duration::MAX)
        );
    }

    #[test]
    fn test_submit_event_defaults() {
        let mut event = SubmitEvent::new();
        assert!(!event.is_default_prevented());
        assert!(event.response().is_none());
        event.prevent_default();
        assert!(event.is_default_prevented());
    }
}
