//! An in-memory windowing backend.
//!
//! Windows are records in a table owned by the affinity thread. Messages
//! posted from any thread go into a single queue that the affinity thread
//! drains through [`Platform::next_message`]. Sent messages are delivered
//! synchronously and may nest arbitrarily, like the real thing.
//!
//! The backend follows native conventions where they matter to controls:
//! destroying a window destroys its descendants (`DESTROY` top-down, then
//! `NC_DESTROY` bottom-up), creation delivers `CREATE`, `SIZE` and `MOVE`,
//! captions longer than [`HeadlessPlatform::max_creation_caption`] are cut at
//! creation, and registered message ids are shared by the whole process.

use super::*;
use crate::msg::{move_message, size_message};
use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, trace};

const DEFAULT_CAPTION_LIMIT: usize = 256;
const FIRST_REGISTERED_MESSAGE: u32 = 0xC000;

static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(0x1000);

fn registered_messages() -> &'static Mutex<HashMap<String, u32>> {
    static REGISTERED: OnceLock<Mutex<HashMap<String, u32>>> = OnceLock::new();
    REGISTERED.get_or_init(|| Mutex::new(HashMap::new()))
}

struct HeadlessWindow {
    class_name: String,
    parent: Option<NativeHandle>,
    children: Vec<NativeHandle>,
    text: String,
    style: WindowStyle,
    ex_style: ExStyle,
    rect: Rect,
    region: Option<Region>,
    font: Option<Font>,
    target: Rc<dyn MessageTarget>,
}

struct PostQueue {
    messages: Mutex<VecDeque<Retrieved>>,
    ready: Condvar,
    posted: AtomicU64,
}

impl PostQueue {
    fn push(&self, item: Retrieved) {
        let mut messages = self.messages.lock();
        messages.push_back(item);
        drop(messages);
        self.ready.notify_one();
    }

    fn pop(&self, timeout: Option<Duration>) -> Retrieved {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut messages = self.messages.lock();
        loop {
            if let Some(item) = messages.pop_front() {
                return item;
            }
            match deadline {
                None => self.ready.wait(&mut messages),
                Some(deadline) => {
                    if self.ready.wait_until(&mut messages, deadline).timed_out() {
                        return messages.pop_front().unwrap_or(Retrieved::Empty);
                    }
                }
            }
        }
    }
}

struct HeadlessPoster {
    queue: Arc<PostQueue>,
}

impl MessagePoster for HeadlessPoster {
    fn post(&self, handle: NativeHandle, msg: RawMessage) -> Result<(), NativeError> {
        trace!("post {:?} to {:#x}", msg.id, handle.as_raw());
        self.queue.posted.fetch_add(1, Ordering::Relaxed);
        self.queue.push(Retrieved::Message {
            handle: Some(handle),
            msg,
        });
        Ok(())
    }
}

pub struct HeadlessPlatform {
    windows: RefCell<HashMap<NativeHandle, HeadlessWindow>>,
    focus: Cell<Option<NativeHandle>>,
    queue: Arc<PostQueue>,
    injected_failures: RefCell<VecDeque<Option<NativeError>>>,
    caption_limit: Cell<usize>,
    windows_created: Cell<u64>,
}

static_assertions::assert_not_impl_any!(HeadlessPlatform: Send, Sync);

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self {
            windows: RefCell::new(HashMap::new()),
            focus: Cell::new(None),
            queue: Arc::new(PostQueue {
                messages: Mutex::new(VecDeque::new()),
                ready: Condvar::new(),
                posted: AtomicU64::new(0),
            }),
            injected_failures: RefCell::new(VecDeque::new()),
            caption_limit: Cell::new(DEFAULT_CAPTION_LIMIT),
            windows_created: Cell::new(0),
        }
    }

    /// Makes the next `create_window` call fail with `error`.
    pub fn fail_next_create(&self, error: NativeError) {
        self.fail_create_after(0, error);
    }

    /// Lets `successes` more `create_window` calls through, then fails the
    /// one after with `error`.
    pub fn fail_create_after(&self, successes: usize, error: NativeError) {
        let mut failures = self.injected_failures.borrow_mut();
        failures.extend(std::iter::repeat_with(|| None).take(successes));
        failures.push_back(Some(error));
    }

    pub fn set_max_creation_caption(&self, limit: usize) {
        self.caption_limit.set(limit);
    }

    /// Total number of messages posted through any poster of this platform.
    pub fn posted_count(&self) -> u64 {
        self.queue.posted.load(Ordering::Relaxed)
    }

    pub fn pending_messages(&self) -> usize {
        self.queue.messages.lock().len()
    }

    pub fn window_count(&self) -> usize {
        self.windows.borrow().len()
    }

    pub fn windows_created(&self) -> u64 {
        self.windows_created.get()
    }

    pub fn children(&self, handle: NativeHandle) -> Vec<NativeHandle> {
        self.windows
            .borrow()
            .get(&handle)
            .map(|w| w.children.clone())
            .unwrap_or_default()
    }

    pub fn class_name(&self, handle: NativeHandle) -> Option<String> {
        self.windows.borrow().get(&handle).map(|w| w.class_name.clone())
    }

    pub fn region(&self, handle: NativeHandle) -> Option<Region> {
        self.windows.borrow().get(&handle).and_then(|w| w.region.clone())
    }

    pub fn font(&self, handle: NativeHandle) -> Option<Font> {
        self.windows.borrow().get(&handle).and_then(|w| w.font.clone())
    }

    pub fn is_visible(&self, handle: NativeHandle) -> bool {
        self.style(handle).contains(WindowStyle::VISIBLE)
    }

    fn target(&self, handle: NativeHandle) -> Option<Rc<dyn MessageTarget>> {
        self.windows
            .borrow()
            .get(&handle)
            .map(|w| Rc::clone(&w.target))
    }

    /// `handle` and its descendants, parents before children.
    fn subtree(&self, handle: NativeHandle) -> Vec<NativeHandle> {
        let windows = self.windows.borrow();
        let mut order = Vec::new();
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            if let Some(w) = windows.get(&h) {
                order.push(h);
                stack.extend(w.children.iter().rev().copied());
            }
        }
        order
    }

    fn unlink(&self, handle: NativeHandle) {
        let mut windows = self.windows.borrow_mut();
        let parent = windows.get(&handle).and_then(|w| w.parent);
        if let Some(parent) = parent {
            if let Some(p) = windows.get_mut(&parent) {
                p.children.retain(|c| *c != handle);
            }
        }
    }

    fn with_window<R>(
        &self,
        handle: NativeHandle,
        f: impl FnOnce(&mut HeadlessWindow) -> R,
    ) -> Result<R, NativeError> {
        let mut windows = self.windows.borrow_mut();
        let window = windows
            .get_mut(&handle)
            .ok_or_else(|| NativeError::invalid_handle(handle))?;
        Ok(f(window))
    }
}

impl Platform for HeadlessPlatform {
    fn create_window(
        &self,
        params: &CreateParams,
        target: Rc<dyn MessageTarget>,
    ) -> Result<NativeHandle, NativeError> {
        if let Some(Some(error)) = self.injected_failures.borrow_mut().pop_front() {
            debug!("create_window: failing as requested: {}", error);
            return Err(error);
        }
        if params.class_name.is_empty() {
            return Err(NativeError::new(
                NativeError::CANNOT_FIND_WND_CLASS,
                "window class name is empty",
            ));
        }
        if let Some(parent) = params.parent {
            if !self.is_window(parent) {
                return Err(NativeError::invalid_handle(parent));
            }
        }

        let raw = NEXT_HANDLE.fetch_add(2, Ordering::Relaxed);
        let handle = NativeHandle::from_raw(raw)
            .ok_or_else(|| NativeError::new(NativeError::NOT_ENOUGH_MEMORY, "handle space exhausted"))?;

        let caption: String = params.caption.chars().take(self.caption_limit.get()).collect();
        let rect = params.bounds();

        {
            let mut windows = self.windows.borrow_mut();
            windows.insert(
                handle,
                HeadlessWindow {
                    class_name: params.class_name.clone(),
                    parent: params.parent,
                    children: Vec::new(),
                    text: caption,
                    style: params.style,
                    ex_style: params.ex_style,
                    rect,
                    region: None,
                    font: None,
                    target,
                },
            );
            if let Some(parent) = params.parent {
                if let Some(p) = windows.get_mut(&parent) {
                    p.children.push(handle);
                }
            }
        }
        self.windows_created.set(self.windows_created.get() + 1);
        trace!(
            "created {} window {:#x} under {:?}",
            params.class_name,
            raw,
            params.parent
        );

        if self.send_message(handle, RawMessage::simple(MessageId::CREATE)) == -1 {
            debug!("create_window: CREATE handler refused creation");
            let _ = self.destroy_window(handle);
            return Err(NativeError::new(
                NativeError::CANNOT_FIND_WND_CLASS,
                "window creation was refused by the window procedure",
            ));
        }
        self.send_message(handle, size_message(rect.size()));
        self.send_message(handle, move_message(rect.location()));

        Ok(handle)
    }

    fn destroy_window(&self, handle: NativeHandle) -> Result<(), NativeError> {
        if !self.is_window(handle) {
            return Err(NativeError::invalid_handle(handle));
        }

        let subtree = self.subtree(handle);
        trace!("destroying {:#x} ({} windows)", handle.as_raw(), subtree.len());

        for h in subtree.iter() {
            self.send_message(*h, RawMessage::simple(MessageId::DESTROY));
        }

        if let Some(focus) = self.focus.get() {
            if subtree.contains(&focus) {
                self.focus.set(None);
            }
        }

        for h in subtree.iter().rev() {
            if self.is_window(*h) {
                self.send_message(*h, RawMessage::simple(MessageId::NC_DESTROY));
                self.unlink(*h);
                self.windows.borrow_mut().remove(h);
            }
        }
        Ok(())
    }

    fn is_window(&self, handle: NativeHandle) -> bool {
        self.windows.borrow().contains_key(&handle)
    }

    fn set_parent(
        &self,
        child: NativeHandle,
        parent: Option<NativeHandle>,
    ) -> Result<(), NativeError> {
        if !self.is_window(child) {
            return Err(NativeError::invalid_handle(child));
        }
        if let Some(parent) = parent {
            if !self.is_window(parent) {
                return Err(NativeError::invalid_handle(parent));
            }
            if parent == child || self.is_child(child, parent) {
                return Err(NativeError::new(
                    NativeError::INVALID_WINDOW_HANDLE,
                    "a window cannot become a child of its own descendant",
                ));
            }
        }

        self.unlink(child);
        let mut windows = self.windows.borrow_mut();
        if let Some(w) = windows.get_mut(&child) {
            w.parent = parent;
        }
        if let Some(parent) = parent {
            if let Some(p) = windows.get_mut(&parent) {
                p.children.push(child);
            }
        }
        Ok(())
    }

    fn parent(&self, handle: NativeHandle) -> Option<NativeHandle> {
        self.windows.borrow().get(&handle).and_then(|w| w.parent)
    }

    fn is_child(&self, parent: NativeHandle, child: NativeHandle) -> bool {
        let mut current = self.parent(child);
        while let Some(h) = current {
            if h == parent {
                return true;
            }
            current = self.parent(h);
        }
        false
    }

    fn send_message(&self, handle: NativeHandle, msg: RawMessage) -> isize {
        match self.target(handle) {
            Some(target) => target
                .wnd_proc(handle, &msg)
                .unwrap_or_else(|| self.default_window_proc(handle, &msg)),
            None => 0,
        }
    }

    fn default_window_proc(&self, handle: NativeHandle, msg: &RawMessage) -> isize {
        if msg.id == MessageId::CLOSE {
            let _ = self.destroy_window(handle);
        }
        0
    }

    fn register_message(&self, name: &str) -> Result<MessageId, NativeError> {
        let mut registered = registered_messages().lock();
        let next = FIRST_REGISTERED_MESSAGE + registered.len() as u32;
        let id = *registered.entry(name.to_string()).or_insert(next);
        Ok(MessageId(id))
    }

    fn poster(&self) -> Arc<dyn MessagePoster> {
        Arc::new(HeadlessPoster {
            queue: Arc::clone(&self.queue),
        })
    }

    fn window_text(&self, handle: NativeHandle) -> String {
        self.windows
            .borrow()
            .get(&handle)
            .map(|w| w.text.clone())
            .unwrap_or_default()
    }

    fn set_window_text(&self, handle: NativeHandle, text: &str) -> Result<(), NativeError> {
        self.with_window(handle, |w| w.text = text.to_string())
    }

    fn max_creation_caption(&self) -> usize {
        self.caption_limit.get()
    }

    fn window_rect(&self, handle: NativeHandle) -> Option<Rect> {
        self.windows.borrow().get(&handle).map(|w| w.rect)
    }

    fn client_size(&self, handle: NativeHandle) -> Option<Size> {
        self.window_rect(handle).map(|r| r.size())
    }

    fn set_window_pos(&self, handle: NativeHandle, bounds: Rect) -> Result<(), NativeError> {
        let old = self.with_window(handle, |w| core::mem::replace(&mut w.rect, bounds))?;
        if old.location() != bounds.location() {
            self.send_message(handle, move_message(bounds.location()));
        }
        if old.size() != bounds.size() {
            self.send_message(handle, size_message(bounds.size()));
        }
        Ok(())
    }

    fn style(&self, handle: NativeHandle) -> WindowStyle {
        self.windows
            .borrow()
            .get(&handle)
            .map(|w| w.style)
            .unwrap_or_default()
    }

    fn set_style(&self, handle: NativeHandle, style: WindowStyle) -> Result<(), NativeError> {
        self.with_window(handle, |w| w.style = style)
    }

    fn extended_style(&self, handle: NativeHandle) -> ExStyle {
        self.windows
            .borrow()
            .get(&handle)
            .map(|w| w.ex_style)
            .unwrap_or_default()
    }

    fn set_extended_style(&self, handle: NativeHandle, style: ExStyle) -> Result<(), NativeError> {
        self.with_window(handle, |w| w.ex_style = style)
    }

    fn set_window_region(
        &self,
        handle: NativeHandle,
        region: Option<&Region>,
    ) -> Result<(), NativeError> {
        self.with_window(handle, |w| w.region = region.cloned())
    }

    fn set_window_font(&self, handle: NativeHandle, font: &Font) -> Result<(), NativeError> {
        self.with_window(handle, |w| w.font = Some(font.clone()))
    }

    fn show_window(&self, handle: NativeHandle, visible: bool) {
        let changed = self
            .with_window(handle, |w| {
                let was = w.style.contains(WindowStyle::VISIBLE);
                w.style.set(WindowStyle::VISIBLE, visible);
                was != visible
            })
            .unwrap_or(false);
        if changed {
            self.send_message(
                handle,
                RawMessage::new(MessageId::SHOW_WINDOW, visible as usize, 0),
            );
        }
    }

    fn enable_window(&self, handle: NativeHandle, enabled: bool) {
        let _ = self.with_window(handle, |w| w.style.set(WindowStyle::DISABLED, !enabled));
    }

    fn focused(&self) -> Option<NativeHandle> {
        self.focus.get()
    }

    fn set_focus(&self, handle: NativeHandle) -> Result<(), NativeError> {
        if !self.is_window(handle) {
            return Err(NativeError::invalid_handle(handle));
        }
        let old = self.focus.replace(Some(handle));
        if old == Some(handle) {
            return Ok(());
        }
        if let Some(old) = old {
            self.send_message(old, RawMessage::simple(MessageId::KILL_FOCUS));
        }
        self.send_message(handle, RawMessage::simple(MessageId::SET_FOCUS));
        Ok(())
    }

    fn next_message(&self, timeout: Option<Duration>) -> Retrieved {
        self.queue.pop(timeout)
    }

    fn dispatch(&self, handle: Option<NativeHandle>, msg: RawMessage) {
        match handle {
            Some(handle) if self.is_window(handle) => {
                self.send_message(handle, msg);
            }
            Some(handle) => {
                trace!(
                    "dropping {:?} posted to destroyed window {:#x}",
                    msg.id,
                    handle.as_raw()
                );
            }
            None => trace!("ignoring thread message {:?}", msg.id),
        }
    }

    fn post_quit(&self, exit_code: i32) {
        self.queue.push(Retrieved::Quit(exit_code));
    }
}
