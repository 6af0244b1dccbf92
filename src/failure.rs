//! Turning a panic or an error into something that can be written into an issue.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Once};
use std::task::{Context, Poll};

/// A test failure: its message and the trace text that goes under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub message: String,
    pub trace: String,
}

impl Failure {
    pub fn new(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Failure {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Builds a failure from the payload of a caught panic.
    pub fn from_panic(payload: &(dyn Any + Send), trace: Option<String>) -> Self {
        Failure::new(panic_message(payload), trace.unwrap_or_default())
    }

    /// Builds a failure from an error returned by a test body.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Display + Debug + ?Sized,
    {
        Failure::new(error.to_string(), format!("{error:?}"))
    }
}

/// Extracts the message of a panic payload the way the default hook does.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

thread_local! {
    static ACTIVE_SLOT: RefCell<Option<TraceSlot>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Installs the backtrace-capturing panic hook once per process.
///
/// The previous hook keeps running after the capture.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = ACTIVE_SLOT.try_with(|active| {
                if let Ok(active) = active.try_borrow() {
                    if let Some(slot) = active.as_ref() {
                        slot.store(Backtrace::force_capture().to_string());
                    }
                }
            });
            previous(info);
        }));
    });
}

/// Receives the backtrace of a panic raised while the slot is entered.
#[derive(Debug, Clone, Default)]
pub struct TraceSlot {
    trace: Arc<Mutex<Option<String>>>,
}

impl TraceSlot {
    fn store(&self, trace: String) {
        let mut guard = self.trace.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(trace);
    }

    /// Takes the captured backtrace, if a guarded panic happened.
    pub fn take(&self) -> Option<String> {
        self.trace
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Makes this slot the capture target on the current thread until the scope drops.
    pub fn enter(&self) -> SlotScope {
        let previous = ACTIVE_SLOT.with(|active| active.replace(Some(self.clone())));
        SlotScope { previous }
    }
}

/// Restores the previously active slot on drop.
pub struct SlotScope {
    previous: Option<TraceSlot>,
}

impl Drop for SlotScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = ACTIVE_SLOT.try_with(|active| {
            if let Ok(mut active) = active.try_borrow_mut() {
                *active = previous;
            }
        });
    }
}

/// Future adapter that enters its slot for every poll of the inner future.
pub struct Traced<F> {
    inner: Pin<Box<F>>,
    slot: TraceSlot,
}

impl<F: Future> Traced<F> {
    pub fn new(inner: F, slot: TraceSlot) -> Self {
        Traced {
            inner: Box::pin(inner),
            slot,
        }
    }
}

impl<F: Future> Future for Traced<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let _scope = this.slot.enter();
        this.inner.as_mut().poll(cx)
    }
}
