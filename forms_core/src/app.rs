//! The per-thread context that owns the platform and runs the message loop.

use crate::control::ControlInner;
use crate::invoke::ThreadLink;
use crate::platform::{self, CreateParams, ExStyle, MessageTarget, Retrieved, WindowStyle};
use crate::property_store::{ControlSlots, SlotRegistry};
use crate::{
    Control, ControlId, Error, LayoutEngine, NativeHandle, NullLayout, Platform, RawMessage,
    Result,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

thread_local! {
    static CURRENT_APP: RefCell<Weak<AppState>> = const { RefCell::new(Weak::new()) };
}

#[derive(Clone, Debug)]
pub struct Settings {
    /// How often a thread blocked in `end_invoke` wakes up to check that the
    /// affinity thread is still running.
    pub invoke_poll_interval: Duration,
    /// How long `run_until` waits for a message before checking its
    /// condition again.
    pub idle_wait: Duration,
    pub thread_callback_message: String,
    pub control_class_name: String,
    pub parking_class_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            invoke_poll_interval: Duration::from_secs(1),
            idle_wait: Duration::from_millis(10),
            thread_callback_message: "FormsCore_ThreadCallbackMessage".to_string(),
            control_class_name: "FormsCore_Control".to_string(),
            parking_class_name: "FormsCore_Parking".to_string(),
        }
    }
}

/// Describes a panic raised by an asynchronous invocation that nobody was
/// waiting on.
#[derive(Clone, Debug)]
pub struct UnhandledPanic {
    pub control: ControlId,
    pub message: String,
    pub correlation_id: Option<u64>,
}

pub(crate) type UnhandledHook = Arc<dyn Fn(&UnhandledPanic) + Send + Sync>;

fn log_unhandled(p: &UnhandledPanic) {
    error!(
        "unhandled panic in asynchronous invocation on control {}: {}",
        p.control, p.message
    );
}

pub struct AppBuilder {
    platform: Option<Rc<dyn Platform>>,
    settings: Settings,
    slot_registry: Option<Arc<SlotRegistry>>,
    layout: Option<Rc<dyn LayoutEngine>>,
    unhandled: Option<UnhandledHook>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            platform: None,
            settings: Settings::default(),
            slot_registry: None,
            layout: None,
            unhandled: None,
        }
    }

    pub fn platform(&mut self, platform: Rc<dyn Platform>) -> &mut Self {
        self.platform = Some(platform);
        self
    }

    pub fn settings(&mut self, settings: Settings) -> &mut Self {
        self.settings = settings;
        self
    }

    pub fn invoke_poll_interval(&mut self, interval: Duration) -> &mut Self {
        self.settings.invoke_poll_interval = interval;
        self
    }

    /// Uses `registry` to allocate the base property slots instead of the
    /// process-wide one.
    pub fn slot_registry(&mut self, registry: Arc<SlotRegistry>) -> &mut Self {
        self.slot_registry = Some(registry);
        self
    }

    pub fn layout_engine(&mut self, layout: Rc<dyn LayoutEngine>) -> &mut Self {
        self.layout = Some(layout);
        self
    }

    pub fn on_unhandled_panic<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&UnhandledPanic) + Send + Sync + 'static,
    {
        self.unhandled = Some(Arc::new(hook));
        self
    }

    /// Creates the app and binds it to the calling thread. Only one app may
    /// be alive per thread.
    pub fn build(&mut self) -> Result<App> {
        if CURRENT_APP.with(|c| c.borrow().strong_count() != 0) {
            return Err(Error::InvalidOperation(
                "an App already exists on this thread",
            ));
        }

        let platform = match self.platform.take() {
            Some(p) => p,
            None => platform::default_platform()?,
        };
        let settings = self.settings.clone();
        let thread_callback = platform.register_message(&settings.thread_callback_message)?;
        debug!(
            "registered {:?} as {:?}",
            settings.thread_callback_message, thread_callback
        );

        let slot_registry = self
            .slot_registry
            .take()
            .unwrap_or_else(SlotRegistry::global);
        let slots = ControlSlots::allocate(&slot_registry);

        let link = Arc::new(ThreadLink::new(
            platform.poster(),
            thread_callback,
            settings.invoke_poll_interval,
        ));

        let state = Rc::new(AppState {
            platform,
            settings,
            slots,
            slot_registry,
            layout: self.layout.take().unwrap_or_else(|| Rc::new(NullLayout)),
            unhandled: self
                .unhandled
                .take()
                .unwrap_or_else(|| Arc::new(log_unhandled)),
            link,
            controls: RefCell::new(HashMap::new()),
            routes: RefCell::new(HashMap::new()),
            parking: Cell::new(None),
            loop_depth: Cell::new(0),
        });

        CURRENT_APP.with(|c| *c.borrow_mut() = Rc::downgrade(&state));
        Ok(App { state })
    }
}

/// Owns the platform for the calling thread. Controls created with this app
/// are bound to this thread.
///
/// Dropping the app tells every thread waiting on an invocation that the
/// affinity thread has gone away.
pub struct App {
    pub(crate) state: Rc<AppState>,
}

static_assertions::assert_not_impl_any!(App: Send, Sync);

pub(crate) struct AppState {
    pub(crate) platform: Rc<dyn Platform>,
    pub(crate) settings: Settings,
    pub(crate) slots: ControlSlots,
    pub(crate) slot_registry: Arc<SlotRegistry>,
    pub(crate) layout: Rc<dyn LayoutEngine>,
    pub(crate) link: Arc<ThreadLink>,
    unhandled: UnhandledHook,
    controls: RefCell<HashMap<ControlId, Weak<ControlInner>>>,
    routes: RefCell<HashMap<NativeHandle, ControlId>>,
    parking: Cell<Option<NativeHandle>>,
    loop_depth: Cell<u32>,
}

impl App {
    pub fn new() -> Result<App> {
        AppBuilder::new().build()
    }

    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn platform(&self) -> Rc<dyn Platform> {
        Rc::clone(&self.state.platform)
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn slot_registry(&self) -> &Arc<SlotRegistry> {
        &self.state.slot_registry
    }

    /// Finds a live control of this app by id.
    pub fn control(&self, id: ControlId) -> Option<Control> {
        self.state.control(id)
    }

    pub fn control_from_handle(&self, handle: NativeHandle) -> Option<Control> {
        self.state.control_from_handle(handle)
    }

    /// The hidden window that holds child handles whose parent has none.
    pub fn parking_window(&self) -> Option<NativeHandle> {
        self.state.parking.get()
    }

    /// Runs the message loop until [`App::quit`] is called, and returns the
    /// exit code.
    pub fn run(&self) -> i32 {
        let _depth = self.state.enter_loop();
        loop {
            match self.state.platform.next_message(None) {
                Retrieved::Message { handle, msg } => self.state.dispatch(handle, msg),
                Retrieved::Quit(code) => {
                    debug!("message loop: quit, exit code {}", code);
                    return code;
                }
                Retrieved::Empty => {}
            }
        }
    }

    /// Runs the message loop until `done` returns true. Returns the exit code
    /// if a quit request arrived first.
    pub fn run_until<F>(&self, mut done: F) -> Option<i32>
    where
        F: FnMut() -> bool,
    {
        let _depth = self.state.enter_loop();
        let wait = Some(self.state.settings.idle_wait);
        while !done() {
            match self.state.platform.next_message(wait) {
                Retrieved::Message { handle, msg } => self.state.dispatch(handle, msg),
                Retrieved::Quit(code) => {
                    debug!("message loop: quit, exit code {}", code);
                    return Some(code);
                }
                Retrieved::Empty => {}
            }
        }
        None
    }

    /// Dispatches whatever is queued right now, then returns.
    pub fn do_events(&self) {
        self.state.do_events();
    }

    pub fn quit(&self, exit_code: i32) {
        self.state.platform.post_quit(exit_code);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        debug!("app dropped, affinity thread is going away");
        self.state.link.mark_exited();
        if let Some(parking) = self.state.parking.take() {
            if self.state.platform.is_window(parking) {
                if let Err(e) = self.state.platform.destroy_window(parking) {
                    warn!("failed to destroy parking window: {}", e);
                }
            }
        }
        CURRENT_APP.with(|c| {
            let mut current = c.borrow_mut();
            if current.as_ptr() == Rc::as_ptr(&self.state) {
                *current = Weak::new();
            }
        });
    }
}

struct LoopDepth<'a>(&'a Cell<u32>);

impl Drop for LoopDepth<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Receives messages for the parking window. It never handles any.
struct ParkingTarget;

impl MessageTarget for ParkingTarget {
    fn wnd_proc(&self, _handle: NativeHandle, _msg: &RawMessage) -> Option<isize> {
        None
    }
}

impl AppState {
    fn enter_loop(&self) -> LoopDepth<'_> {
        let depth = self.loop_depth.get() + 1;
        self.loop_depth.set(depth);
        trace!("entering message loop, depth {}", depth);
        LoopDepth(&self.loop_depth)
    }

    fn dispatch(&self, handle: Option<NativeHandle>, msg: RawMessage) {
        trace!("dispatch {:?} to {:?}", msg.id, handle);
        self.platform.dispatch(handle, msg);
    }

    pub(crate) fn do_events(&self) {
        let _depth = self.enter_loop();
        loop {
            match self.platform.next_message(Some(Duration::ZERO)) {
                Retrieved::Message { handle, msg } => self.dispatch(handle, msg),
                Retrieved::Quit(code) => {
                    // Leave the request for the outer loop.
                    self.platform.post_quit(code);
                    break;
                }
                Retrieved::Empty => break,
            }
        }
    }

    pub(crate) fn register(&self, id: ControlId, control: Weak<ControlInner>) {
        self.controls.borrow_mut().insert(id, control);
    }

    pub(crate) fn unregister(&self, id: ControlId) {
        self.controls.borrow_mut().remove(&id);
    }

    pub(crate) fn control(&self, id: ControlId) -> Option<Control> {
        let inner = self.controls.borrow().get(&id).and_then(Weak::upgrade);
        inner.map(|inner| Control { inner })
    }

    pub(crate) fn add_route(&self, handle: NativeHandle, id: ControlId) {
        let previous = self.routes.borrow_mut().insert(handle, id);
        debug_assert!(
            previous.is_none(),
            "handle {:?} was already routed to control {:?}",
            handle,
            previous
        );
    }

    pub(crate) fn remove_route(&self, handle: NativeHandle) {
        self.routes.borrow_mut().remove(&handle);
    }

    pub(crate) fn control_from_handle(&self, handle: NativeHandle) -> Option<Control> {
        let id = self.routes.borrow().get(&handle).copied()?;
        self.control(id)
    }

    pub(crate) fn parking_window(&self) -> Result<NativeHandle> {
        if let Some(parking) = self.parking.get() {
            if self.platform.is_window(parking) {
                return Ok(parking);
            }
        }

        let params = CreateParams {
            class_name: self.settings.parking_class_name.clone(),
            caption: String::new(),
            style: WindowStyle::POPUP | WindowStyle::CLIP_CHILDREN,
            ex_style: ExStyle::TOOL_WINDOW,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            parent: None,
        };
        let parking = self
            .platform
            .create_window(&params, Rc::new(ParkingTarget))
            .map_err(Error::HandleCreation)?;
        debug!("created parking window {:?}", parking);
        self.parking.set(Some(parking));
        Ok(parking)
    }

    pub(crate) fn parking_window_if_any(&self) -> Option<NativeHandle> {
        self.parking.get()
    }

    pub(crate) fn report_unhandled(&self, panic: &UnhandledPanic) {
        if catch_unwind(AssertUnwindSafe(|| (self.unhandled)(panic))).is_err() {
            error!(
                "unhandled panic hook panicked while reporting control {}",
                panic.control
            );
        }
    }
}

/// Looks up a control of the app bound to the calling thread.
pub(crate) fn current_control(id: ControlId) -> Option<Control> {
    let app = CURRENT_APP.with(|c| c.borrow().upgrade())?;
    app.control(id)
}
