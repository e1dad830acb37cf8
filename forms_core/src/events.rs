//! Typed control events.
//!
//! Each event is a field of [`ControlEvents`] with its own argument type, so
//! raising an event never needs to look at what a subscriber is.
//!
//! Handlers run on the affinity thread. A handler that panics is logged and
//! skipped; it cannot interrupt the lifecycle code that raised the event.

use crate::{AmbientProperty, Control, Rect};
use core::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use tracing::error;

/// Wraps a function that can handle an event of a given type.
pub struct EventHandler<E> {
    pub(crate) handler: Rc<dyn Fn(&Control, &E)>,
}

impl<E> EventHandler<E> {
    pub fn new<H>(handler: H) -> Self
    where
        H: Fn(&Control, &E) + 'static,
    {
        Self {
            handler: Rc::new(handler),
        }
    }
}

impl<E> Clone for EventHandler<E> {
    fn clone(&self) -> Self {
        Self {
            handler: Rc::clone(&self.handler),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Subscription(u64);

pub struct Event<E> {
    name: &'static str,
    handlers: RefCell<Vec<(Subscription, EventHandler<E>)>>,
    next_id: Cell<u64>,
}

impl<E> Event<E> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn subscribe<H>(&self, handler: H) -> Subscription
    where
        H: Fn(&Control, &E) + 'static,
    {
        self.add(EventHandler::new(handler))
    }

    pub fn add(&self, handler: EventHandler<E>) -> Subscription {
        let id = Subscription(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscription);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }

    pub(crate) fn raise(&self, control: &Control, arg: &E) {
        // Snapshot, so handlers may subscribe or unsubscribe while we run.
        let handlers: Vec<EventHandler<E>> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();

        for h in handlers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (h.handler)(control, arg))) {
                error!(
                    "{} handler on control {} panicked: {}",
                    self.name,
                    control.id(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

pub struct ControlEvents {
    pub handle_created: Event<()>,
    pub handle_destroyed: Event<()>,
    pub created: Event<()>,
    pub disposed: Event<()>,
    pub text_changed: Event<()>,
    pub bounds_changed: Event<Rect>,
    pub visible_changed: Event<bool>,
    pub got_focus: Event<()>,
    pub lost_focus: Event<()>,
    pub ambient_changed: Event<AmbientProperty>,
    pub right_to_left_changed: Event<()>,
    pub parent_changed: Event<()>,
}

impl Default for ControlEvents {
    fn default() -> Self {
        Self {
            handle_created: Event::new("handle_created"),
            handle_destroyed: Event::new("handle_destroyed"),
            created: Event::new("created"),
            disposed: Event::new("disposed"),
            text_changed: Event::new("text_changed"),
            bounds_changed: Event::new("bounds_changed"),
            visible_changed: Event::new("visible_changed"),
            got_focus: Event::new("got_focus"),
            lost_focus: Event::new("lost_focus"),
            ambient_changed: Event::new("ambient_changed"),
            right_to_left_changed: Event::new("right_to_left_changed"),
            parent_changed: Event::new("parent_changed"),
        }
    }
}

impl ControlEvents {
    pub(crate) fn clear(&self) {
        self.handle_created.clear();
        self.handle_destroyed.clear();
        self.created.clear();
        self.disposed.clear();
        self.text_changed.clear();
        self.bounds_changed.clear();
        self.visible_changed.clear();
        self.got_focus.clear();
        self.lost_focus.clear();
        self.ambient_changed.clear();
        self.right_to_left_changed.clear();
        self.parent_changed.clear();
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
