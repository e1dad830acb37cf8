//! Runs closures on a control's affinity thread, on behalf of any thread.
//!
//! A call is queued on the *marshaling control*: the nearest control, going
//! up from the target, that currently owns a native handle. The first call
//! that lands in an empty queue posts the registered thread-callback message
//! to that handle; when the affinity thread dispatches the message it drains
//! the whole queue, in order.
//!
//! The queue outlives handle recreation. Calls still queued when the handle
//! is destroyed for good are completed with [`Error::Disposed`], so nobody
//! waits forever.
//!
//! ```text
//!  worker thread                       affinity thread
//!  -------------                       ---------------
//!  begin_invoke(f) --enqueue--> [queue] <--drain-- wnd_proc(thread callback)
//!        |                                 |
//!        +--post thread callback---------->+
//!  end_invoke(h) <-----completion signal---+
//! ```

use crate::app::{self, UnhandledPanic};
use crate::events::panic_message;
use crate::handle::NativeHandleOwner;
use crate::msg::{MessageId, RawMessage};
use crate::platform::MessagePoster;
use crate::{Control, ControlId, Error, Result, State2};
use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// What every control on one affinity thread shares with other threads.
pub(crate) struct ThreadLink {
    pub(crate) thread: ThreadId,
    pub(crate) poster: Arc<dyn MessagePoster>,
    pub(crate) thread_callback: MessageId,
    pub(crate) poll_interval: Duration,
    alive: AtomicBool,
}

impl ThreadLink {
    pub(crate) fn new(
        poster: Arc<dyn MessagePoster>,
        thread_callback: MessageId,
        poll_interval: Duration,
    ) -> Self {
        Self {
            thread: std::thread::current().id(),
            poster,
            thread_callback,
            poll_interval,
            alive: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) fn mark_exited(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub(crate) fn is_current_thread(&self) -> bool {
        std::thread::current().id() == self.thread
    }
}

/// The part of a control that other threads may touch.
pub(crate) struct ControlShared {
    pub(crate) id: ControlId,
    pub(crate) window: NativeHandleOwner,
    pub(crate) recreating: AtomicBool,
    pub(crate) disposed: AtomicBool,
    /// Set from the moment the handle starts dying for good until a new one
    /// is attached. The handle itself stays live until NC_DESTROY.
    pub(crate) closing: AtomicBool,
    pub(crate) parent: Mutex<Weak<ControlShared>>,
    pub(crate) link: Arc<ThreadLink>,
    queue: Mutex<Option<VecDeque<Box<dyn PendingCall>>>>,
}

impl ControlShared {
    pub(crate) fn new(id: ControlId, link: Arc<ThreadLink>) -> Self {
        Self {
            id,
            window: NativeHandleOwner::new(),
            recreating: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            parent: Mutex::new(Weak::new()),
            link,
            queue: Mutex::new(None),
        }
    }

    fn can_marshal(&self) -> bool {
        self.window.is_live() || self.recreating.load(Ordering::Acquire)
    }

    /// Whether a call queued now will still be drained.
    fn accepts_calls(&self) -> bool {
        self.recreating.load(Ordering::Acquire)
            || (self.window.is_live() && !self.closing.load(Ordering::SeqCst))
    }

    fn marshaling_control(self: &Arc<Self>) -> Result<Arc<ControlShared>> {
        let mut current = Some(Arc::clone(self));
        while let Some(c) = current {
            if c.can_marshal() {
                return Ok(c);
            }
            current = c.parent.lock().upgrade();
        }
        Err(Error::InvalidOperation(
            "invoke or begin_invoke cannot be called on a control until a window handle has been created",
        ))
    }

    /// Returns true if the queue was empty before this call.
    fn enqueue(&self, call: Box<dyn PendingCall>) -> bool {
        let mut queue = self.queue.lock();
        let queue = queue.get_or_insert_with(VecDeque::new);
        let was_empty = queue.is_empty();
        queue.push_back(call);
        was_empty
    }

    fn dequeue(&self) -> Option<Box<dyn PendingCall>> {
        self.queue.lock().as_mut()?.pop_front()
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.queue.lock().as_ref().map_or(false, |q| !q.is_empty())
    }

    /// Completes every queued call with an error. Returns how many there were.
    pub(crate) fn fail_pending(&self, error: impl Fn() -> Error) -> usize {
        let drained: Vec<Box<dyn PendingCall>> = match self.queue.lock().as_mut() {
            Some(queue) => queue.drain(..).collect(),
            None => return 0,
        };
        let n = drained.len();
        if n != 0 {
            debug!("control {}: failing {} pending invocation(s)", self.id, n);
        }
        for call in drained {
            call.fail(error());
        }
        n
    }

    /// Stops accepting calls, then fails the ones already queued. A caller
    /// that enqueues after the drain sees the flag and fails its own call.
    pub(crate) fn close_queue(&self, error: impl Fn() -> Error) -> usize {
        self.closing.store(true, Ordering::SeqCst);
        self.fail_pending(error)
    }

    /// Asks the affinity thread to drain the queue. Without a handle this
    /// does nothing; whoever creates the next handle posts instead.
    pub(crate) fn post_callback(&self) {
        match self.window.handle() {
            Some(handle) => {
                let msg = RawMessage::simple(self.link.thread_callback);
                if let Err(e) = self.link.poster.post(handle, msg) {
                    warn!("control {}: failed to post thread callback: {}", self.id, e);
                }
            }
            None => trace!("control {}: no handle, thread callback deferred", self.id),
        }
    }

    fn marshal<F, T>(
        self: &Arc<Self>,
        context: InvokeContext,
        func: F,
        synchronous: bool,
    ) -> Result<InvokeHandle<T>>
    where
        F: FnOnce(&Control, &InvokeContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::Disposed("control"));
        }
        let marshaler = self.marshaling_control()?;

        let completion = Arc::new(Completion::new());
        let call = Box::new(Call {
            target: self.id,
            func,
            context,
            synchronous,
            completion: Arc::clone(&completion),
        });

        let was_empty = marshaler.enqueue(call);
        trace!(
            "queued {} call for control {} on control {}",
            if synchronous { "synchronous" } else { "asynchronous" },
            self.id,
            marshaler.id
        );

        if synchronous && marshaler.link.is_current_thread() {
            drain_on_affinity_thread(&marshaler);
        } else if !marshaler.accepts_calls() {
            // The handle started going away for good after we chose this
            // control.
            marshaler.fail_pending(|| Error::Disposed("window handle was destroyed"));
        } else if was_empty {
            marshaler.post_callback();
        }

        Ok(InvokeHandle {
            completion,
            marshaler,
        })
    }
}

fn drain_on_affinity_thread(marshaler: &Arc<ControlShared>) {
    match app::current_control(marshaler.id) {
        Some(control) => control.invoke_marshaled_callbacks(),
        None => {
            marshaler.fail_pending(|| Error::Disposed("marshaling control"));
        }
    }
}

trait PendingCall: Send {
    fn target(&self) -> ControlId;

    fn run(self: Box<Self>, control: &Control, unhandled: &dyn Fn(&UnhandledPanic));

    fn fail(self: Box<Self>, error: Error);
}

struct Call<F, T> {
    target: ControlId,
    func: F,
    context: InvokeContext,
    synchronous: bool,
    completion: Arc<Completion<T>>,
}

impl<F, T> PendingCall for Call<F, T>
where
    F: FnOnce(&Control, &InvokeContext) -> T + Send + 'static,
    T: Send + 'static,
{
    fn target(&self) -> ControlId {
        self.target
    }

    fn run(self: Box<Self>, control: &Control, unhandled: &dyn Fn(&UnhandledPanic)) {
        let Call {
            target: _,
            func,
            context,
            synchronous,
            completion,
        } = *self;

        match catch_unwind(AssertUnwindSafe(|| func(control, &context))) {
            Ok(value) => completion.complete(Outcome::Returned(value)),
            Err(payload) => {
                if !synchronous {
                    unhandled(&UnhandledPanic {
                        control: control.id(),
                        message: panic_message(payload.as_ref()),
                        correlation_id: context.correlation_id,
                    });
                }
                completion.complete(Outcome::Panicked(payload));
            }
        }
    }

    fn fail(self: Box<Self>, error: Error) {
        self.completion.complete(Outcome::Failed(error));
    }
}

enum Outcome<T> {
    Returned(T),
    Panicked(Box<dyn Any + Send>),
    Failed(Error),
}

enum Slot<T> {
    Pending,
    Ready(Outcome<T>),
}

struct Completion<T> {
    slot: Mutex<Slot<T>>,
    done: Condvar,
}

impl<T> Completion<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            done: Condvar::new(),
        }
    }

    fn complete(&self, outcome: Outcome<T>) {
        let mut slot = self.slot.lock();
        *slot = Slot::Ready(outcome);
        drop(slot);
        self.done.notify_all();
    }

    fn is_completed(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Ready(_))
    }

    fn try_take(&self) -> Option<Outcome<T>> {
        let mut slot = self.slot.lock();
        match core::mem::replace(&mut *slot, Slot::Pending) {
            Slot::Ready(outcome) => Some(outcome),
            Slot::Pending => None,
        }
    }
}

/// A call that has been queued. Waiting on it returns the closure's result,
/// or re-raises its panic on the waiting thread.
#[must_use = "dropping an InvokeHandle does not cancel the call, but its result is lost"]
pub struct InvokeHandle<T> {
    completion: Arc<Completion<T>>,
    marshaler: Arc<ControlShared>,
}

impl<T> InvokeHandle<T> {
    pub fn is_completed(&self) -> bool {
        self.completion.is_completed()
    }

    /// Blocks until the call has run. On the affinity thread itself this
    /// drains the queue instead of blocking.
    pub fn wait(self) -> Result<T> {
        loop {
            if let Some(outcome) = self.completion.try_take() {
                return match outcome {
                    Outcome::Returned(value) => Ok(value),
                    Outcome::Failed(error) => Err(error),
                    Outcome::Panicked(payload) => resume_unwind(payload),
                };
            }

            let link = &self.marshaler.link;
            if link.is_current_thread() {
                drain_on_affinity_thread(&self.marshaler);
                if !self.completion.is_completed() {
                    return Err(Error::InvalidOperation(
                        "the invocation cannot complete while its own affinity thread waits for it",
                    ));
                }
                continue;
            }

            let mut slot = self.completion.slot.lock();
            if matches!(*slot, Slot::Pending) {
                let _ = self.completion.done.wait_for(&mut slot, link.poll_interval);
                if matches!(*slot, Slot::Pending) && !link.is_alive() {
                    warn!(
                        "control {}: affinity thread is gone, abandoning wait",
                        self.marshaler.id
                    );
                    return Err(Error::AffinityThreadExited);
                }
            }
        }
    }
}

/// A `Send + Sync` handle for scheduling work on a control's affinity thread.
#[derive(Clone)]
pub struct Invoker {
    shared: Arc<ControlShared>,
}

static_assertions::assert_impl_all!(Invoker: Send, Sync, Clone);

impl Invoker {
    pub(crate) fn new(shared: Arc<ControlShared>) -> Self {
        Self { shared }
    }

    pub fn control_id(&self) -> ControlId {
        self.shared.id
    }

    /// True when called from any thread other than the control's affinity
    /// thread.
    pub fn invoke_required(&self) -> bool {
        !self.shared.link.is_current_thread()
    }

    pub fn is_handle_created(&self) -> bool {
        self.shared.window.is_live()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Queues `func` and returns at once.
    pub fn begin_invoke<F, T>(&self, func: F) -> Result<InvokeHandle<T>>
    where
        F: FnOnce(&Control, &InvokeContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.begin_invoke_with(InvokeContext::default(), func)
    }

    pub fn begin_invoke_with<F, T>(&self, context: InvokeContext, func: F) -> Result<InvokeHandle<T>>
    where
        F: FnOnce(&Control, &InvokeContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.shared.marshal(context, func, false)
    }

    /// Runs `func` on the affinity thread and waits for its result.
    pub fn invoke<F, T>(&self, func: F) -> Result<T>
    where
        F: FnOnce(&Control, &InvokeContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.invoke_with(InvokeContext::default(), func)
    }

    pub fn invoke_with<F, T>(&self, context: InvokeContext, func: F) -> Result<T>
    where
        F: FnOnce(&Control, &InvokeContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.shared.marshal(context, func, true)?.wait()
    }

    pub fn end_invoke<T>(&self, handle: InvokeHandle<T>) -> Result<T> {
        handle.wait()
    }

    /// Fire-and-forget. A panic in `func` goes to the app's unhandled panic
    /// hook.
    pub fn post<F>(&self, func: F) -> Result<()>
    where
        F: FnOnce(&Control) + Send + 'static,
    {
        let _ = self.begin_invoke(move |control, _| func(control))?;
        Ok(())
    }
}

impl core::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Invoker")
            .field("control", &self.shared.id)
            .field("handle", &self.shared.window.handle())
            .finish()
    }
}

impl Control {
    pub fn invoker(&self) -> Invoker {
        Invoker::new(Arc::clone(&self.inner.shared))
    }

    pub fn begin_invoke<F, T>(&self, func: F) -> Result<InvokeHandle<T>>
    where
        F: FnOnce(&Control, &InvokeContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.invoker().begin_invoke(func)
    }

    pub fn invoke<F, T>(&self, func: F) -> Result<T>
    where
        F: FnOnce(&Control, &InvokeContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.invoker().invoke(func)
    }

    pub fn end_invoke<T>(&self, handle: InvokeHandle<T>) -> Result<T> {
        handle.wait()
    }

    /// Runs every queued call. Called on the affinity thread when the thread
    /// callback message arrives, or directly by a synchronous caller that is
    /// already on the affinity thread.
    pub(crate) fn invoke_marshaled_callbacks(&self) {
        let inner = &self.inner;
        inner.state.set_state2(State2::HAVE_INVOKED, true);
        let _sync = sync_context::install(self.invoker());

        // One at a time, with the queue unlocked while each call runs; a call
        // may queue more work or pump messages.
        while let Some(call) = inner.shared.dequeue() {
            let target_id = call.target();
            let target = if target_id == self.id() {
                Some(self.clone())
            } else {
                inner.app.control(target_id)
            };
            match target {
                Some(target) if !target.is_disposed() => {
                    call.run(&target, &|p: &UnhandledPanic| inner.app.report_unhandled(p))
                }
                _ => call.fail(Error::Disposed("invocation target")),
            }
        }
    }
}

/// An explicit execution context carried by each queued call.
#[derive(Clone, Debug, Default)]
pub struct InvokeContext {
    pub locale: Option<String>,
    pub correlation_id: Option<u64>,
    pub cancellation: CancellationToken,
}

impl InvokeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_correlation_id(mut self, id: u64) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// A flag a caller can raise to ask queued work to stop early. The control
/// machinery never looks at it; the closure decides.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The synchronization context of the current thread: while a queued call
/// runs, the invoker of the control that drained it, so continuations posted
/// from inside the call come back to the same thread.
pub mod sync_context {
    use super::Invoker;
    use std::cell::RefCell;

    thread_local! {
        static CURRENT: RefCell<Option<Invoker>> = const { RefCell::new(None) };
    }

    pub fn current() -> Option<Invoker> {
        CURRENT.with(|c| c.borrow().clone())
    }

    pub(crate) struct Installed {
        previous: Option<Invoker>,
    }

    pub(crate) fn install(invoker: Invoker) -> Installed {
        let previous = CURRENT.with(|c| c.replace(Some(invoker)));
        Installed { previous }
    }

    impl Drop for Installed {
        fn drop(&mut self) {
            let previous = self.previous.take();
            let replaced = CURRENT.with(|c| c.replace(previous));
            drop(replaced);
        }
    }
}
